//! Rooms: the state machine, its round clock, its actor and the registry.

pub mod lobby;
pub mod messages;
pub mod room;
pub mod scheduler;
pub mod server;
pub mod session;
