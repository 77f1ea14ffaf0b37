//! Main configuration module.
//!
//! Re-exports submodules for game, room lifecycle, anti-spam and runtime server configuration.

pub mod anti_spam;
pub mod game;
pub mod room;
pub mod server;
