//! Room lifecycle configuration constants.
//!
//! This module defines how long rooms survive without players and how often
//! the janitor sweeps the registry.

pub const ROOM_IDLE_TIMEOUT_SECS: u64 = 120; // No online player for this long ends the room.

/// Ended rooms keep their final snapshot for late reads this long.
pub const ENDED_ROOM_RETENTION_SECS: u64 = 60;

/// An offline player keeps their place in a running game this long, then
/// forfeits as if they had surrendered.
pub const RECONNECT_TIMEOUT_SECS: u64 = 30;

/// Interval between janitor sweeps of the room registry.
pub const JANITOR_INTERVAL_SECS: u64 = 15;
