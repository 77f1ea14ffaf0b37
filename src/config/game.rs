//! Game configuration constants.
//!
//! This module defines the default gameplay parameters: turn duration,
//! generated map dimensions and the economy constants every game mode starts from.

pub const DEFAULT_TURN_DURATION_MS: u64 = 500; // Duration of a round in milliseconds.

/// Owned soldier tiles gain a troop every this many rounds.
pub const SOLDIER_GROWTH_INTERVAL: u32 = 25;

/// Owned castles and kings gain a troop every this many rounds.
pub const BUILDING_GROWTH_INTERVAL: u32 = 1;

/// Sight radius (Chebyshev) of a plain soldier tile.
pub const PLAIN_SIGHT: u16 = 1;

/// Sight radius (Chebyshev) of castles and kings.
pub const BUILDING_SIGHT: u16 = 1;

/// Number of columns of a generated map.
pub const GRID_COL: u16 = 12;

/// Number of rows of a generated map.
pub const GRID_ROW: u16 = 12;

/// Share of generated tiles that become mountains.
pub const MOUNTAIN_DENSITY: f64 = 0.18;

/// Share of generated tiles that become neutral castles.
pub const CASTLE_DENSITY: f64 = 0.04;

/// Moves each player may make per round in the 1v1 preset.
pub const DUEL_MOVES_PER_TURN: u16 = 2;

/// Troops a king starts the game with.
pub const KING_START_TROOPS: u16 = 1;

/// How many layouts the generator tries before giving up on connectivity.
pub const GENERATOR_ATTEMPTS: usize = 64;
