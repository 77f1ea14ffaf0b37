//! Start vote tally for a waiting room.
//!
//! Counts online players, their teams and their forceStart votes against the
//! limits of the room's game mode and decides when the game may begin.

use std::collections::HashSet;

use crate::game::mode::GameMode;
use crate::server::room::room::{Player, PlayerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub online: usize,
    pub ready: usize,
    /// Distinct teams among online players.
    pub teams: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    Wait(Tally),
    Start(Tally),
}

/// Votes and capacity of a waiting roster.
pub struct Lobby<'a> {
    mode: &'a GameMode,
}

impl<'a> Lobby<'a> {
    pub fn new(mode: &'a GameMode) -> Self {
        Self { mode }
    }

    pub fn tally(&self, players: &[Player]) -> Tally {
        let online: Vec<&Player> = players.iter().filter(|p| p.status == PlayerStatus::Online).collect();
        let ready = online.iter().filter(|p| p.is_ready).count();
        let teams = online.iter().map(|p| p.team_id).collect::<HashSet<_>>().len();
        Tally { online: online.len(), ready, teams }
    }

    /// Start once enough players on at least two teams are online and either
    /// all of them voted or the room is at capacity.
    pub fn decide(&self, players: &[Player]) -> StartDecision {
        let tally = self.tally(players);
        let enough = tally.online >= self.mode.min_players.max(1) && tally.teams >= 2;
        let everyone_voted = tally.ready == tally.online;
        let full = tally.online >= self.mode.max_players;
        if enough && (everyone_voted || full) {
            StartDecision::Start(tally)
        } else {
            StartDecision::Wait(tally)
        }
    }

    pub fn is_full(&self, players: &[Player]) -> bool {
        players.len() >= self.mode.max_players
    }
}
