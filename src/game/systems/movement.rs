//! Troop movement system.
//!
//! [`MoveResolver::apply`] is the only gameplay path that mutates the map. A
//! command is validated completely against the true (unfogged) map before
//! anything changes, so a rejected command leaves the map untouched no matter
//! how often it is replayed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::game::entities::{Block, BlockKind};
use crate::game::grid::Map;
use crate::game::mode::Rules;
use crate::game::types::{Direction, NEUTRAL, PlayerId, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCommand {
    pub player_id: PlayerId,
    pub from: Position,
    pub direction: Direction,
    pub troops: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("source ({}, {}) is outside the map", .0.x, .0.y)]
    SourceOutOfBounds(Position),
    #[error("source ({}, {}) is not owned by player {player}", .pos.x, .pos.y)]
    NotOwner { pos: Position, player: PlayerId },
    #[error("cannot move {direction:?} off the edge of the map")]
    DestinationOutOfBounds { direction: Direction },
    #[error("move from disallowed: {0}")]
    FromDisallowed(String),
    #[error("move to disallowed: {0}")]
    ToDisallowed(String),
    #[error("must move at least one troop")]
    NoTroops,
    #[error("cannot move {requested} troops, only {available} available")]
    InsufficientTroops { requested: u16, available: u16 },
    #[error("player {0} is not playing in this game")]
    NotParticipant(PlayerId),
    #[error("player {0} has been eliminated")]
    Eliminated(PlayerId),
    #[error("player {0} has no moves left this turn")]
    NoMovesLeft(PlayerId),
}

/// What an accepted move changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: Position,
    pub to: Position,
    pub moved: u16,
    /// Previous owner of the destination, when it changed hands from another player.
    pub captured_from: Option<PlayerId>,
    /// Owner of a king that was taken by this move.
    pub king_captured: Option<PlayerId>,
}

pub struct MoveResolver;

impl MoveResolver {
    /// Validate `cmd` against `map` and apply it.
    pub fn apply(map: &mut Map, rules: &Rules, cmd: &MoveCommand) -> Result<MoveOutcome, MoveError> {
        let source = map.block(cmd.from).map_err(|_| MoveError::SourceOutOfBounds(cmd.from))?;
        if source.owner() != cmd.player_id || cmd.player_id == NEUTRAL {
            return Err(MoveError::NotOwner { pos: cmd.from, player: cmd.player_id });
        }

        let to = cmd
            .from
            .step(cmd.direction)
            .filter(|p| map.size().contains(*p))
            .ok_or(MoveError::DestinationOutOfBounds { direction: cmd.direction })?;
        let target = map.block(to).map_err(|_| MoveError::DestinationOutOfBounds { direction: cmd.direction })?;

        let source_allow = source.allow_move();
        if !source_allow.from {
            return Err(MoveError::FromDisallowed(source_allow.reason));
        }
        let target_allow = target.allow_move();
        if !target_allow.to {
            return Err(MoveError::ToDisallowed(target_allow.reason));
        }

        if cmd.troops == 0 {
            return Err(MoveError::NoTroops);
        }
        let evacuate = rules.allow_evacuation && source.kind() != BlockKind::King;
        let available = if evacuate { source.num() } else { source.num().saturating_sub(1) };
        if cmd.troops > available {
            return Err(MoveError::InsufficientTroops { requested: cmd.troops, available });
        }

        let (moved, source_after) = source.move_from(cmd.troops, evacuate);
        let mut target_after = target.move_to(moved, cmd.player_id);

        let hostile = target.is_owned() && target.owner() != cmd.player_id;
        let captured_from = (hostile && target_after.owner() == cmd.player_id).then_some(target.owner());
        let king_captured = captured_from.filter(|_| target.kind() == BlockKind::King);
        if king_captured.is_some() {
            // The capital falls and becomes an ordinary city of the capturer.
            target_after = Block::castle(cmd.player_id, target_after.num());
        }

        // Both positions were read successfully above, so these writes cannot fail.
        map.set_block(cmd.from, source_after).map_err(|_| MoveError::SourceOutOfBounds(cmd.from))?;
        map.set_block(to, target_after).map_err(|_| MoveError::DestinationOutOfBounds { direction: cmd.direction })?;

        Ok(MoveOutcome { from: cmd.from, to, moved, captured_from, king_captured })
    }
}
