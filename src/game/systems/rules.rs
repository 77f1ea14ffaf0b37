//! Elimination and victory rules.

use std::collections::BTreeSet;

use crate::game::entities::{Block, BlockKind};
use crate::game::grid::Map;
use crate::game::mode::CaptureTransfer;
use crate::game::types::{NEUTRAL, PlayerId, TeamId};

/// A player taking part in a running game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: PlayerId,
    pub team: TeamId,
    pub alive: bool,
}

/// Hand every tile of `loser` to `heir` (or to nobody). The loser's kings are
/// demoted to castles. Returns the number of tiles that changed hands.
pub fn transfer_territory(map: &mut Map, loser: PlayerId, heir: Option<PlayerId>) -> usize {
    let heir = heir.unwrap_or(NEUTRAL);
    let mut changed = 0;
    map.update_all(|_, block| {
        if block.owner() != loser || loser == NEUTRAL {
            return *block;
        }
        changed += 1;
        match block.kind() {
            BlockKind::King => Block::castle(heir, block.num()),
            kind => Block::new(kind, heir, block.num()),
        }
    });
    changed
}

/// Eliminate `loser` after their king was captured by `capturer`.
pub fn apply_king_capture(map: &mut Map, loser: PlayerId, capturer: PlayerId, transfer: CaptureTransfer) -> usize {
    let heir = match transfer {
        CaptureTransfer::ToCapturer => Some(capturer),
        CaptureTransfer::Neutral => None,
    };
    transfer_territory(map, loser, heir)
}

/// Remove `player` from contention: their whole territory turns neutral.
pub fn surrender_territory(map: &mut Map, player: PlayerId) -> usize {
    transfer_territory(map, player, None)
}

/// Teams that still have at least one live participant.
pub fn live_teams(participants: &[Participant]) -> BTreeSet<TeamId> {
    participants.iter().filter(|p| p.alive).map(|p| p.team).collect()
}

/// Game over when at most one team remains. `Some(None)` is a game with no
/// survivors, `Some(Some(team))` a won game.
pub fn decide_winner(participants: &[Participant]) -> Option<Option<TeamId>> {
    let teams = live_teams(participants);
    match teams.len() {
        0 => Some(None),
        1 => Some(teams.into_iter().next()),
        _ => None,
    }
}
