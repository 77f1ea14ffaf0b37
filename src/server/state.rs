// src/server/state.rs

//! Application state for the backend server.
//!
//! Holds the address of the room registry, shared by every WebSocket handler.

use actix::Addr;

use crate::server::room::server::RoomManager;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Registry creating and resolving rooms.
    pub manager: Addr<RoomManager>,
}

impl AppState {
    pub fn new(manager: Addr<RoomManager>) -> Self {
        AppState { manager }
    }
}
