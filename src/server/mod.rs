// src/server/mod.rs

//! Server layer root module.
//!
//! This module organizes the orchestration around the simulation:
//! - Application state and HTTP/WebSocket routing
//! - The gateway codec and error taxonomy
//! - Rooms (state machine, round clock, actors, registry) and player connections

pub mod anti_spam;
pub mod error;
pub mod protocol;
pub mod room;
pub mod router;
pub mod session_utils;
pub mod state;
pub mod ws_actor_utils;
pub mod ws_error;
