//! Game entities module.
//!
//! This module holds the block (tile) entity and its kind operation table.

pub mod block;

pub use block::*;
