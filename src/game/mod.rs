//! Deterministic game simulation: no actors, no I/O.

pub mod entities;
pub mod grid;
pub mod mode;
pub mod state;
pub mod systems;
pub mod types;
