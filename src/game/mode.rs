//! Game mode configuration.
//!
//! A mode fixes the roster limits, the turn clock and every economy constant the
//! simulation relies on. Nothing in `game` hardcodes a production rate or sight
//! radius; it is all read from [`Rules`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::game::{
    BUILDING_GROWTH_INTERVAL, BUILDING_SIGHT, DEFAULT_TURN_DURATION_MS, DUEL_MOVES_PER_TURN, PLAIN_SIGHT,
    SOLDIER_GROWTH_INTERVAL,
};

/// Where the tiles of an eliminated player go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureTransfer {
    ToCapturer,
    Neutral,
}

/// Economy, vision and legality constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rules {
    /// Owned soldier tiles gain one troop every this many rounds.
    pub soldier_growth_interval: u32,
    /// Owned castles and kings gain one troop every this many rounds.
    pub building_growth_interval: u32,
    /// Chebyshev sight radius of soldier tiles.
    pub plain_sight: u16,
    /// Chebyshev sight radius of castles and kings.
    pub building_sight: u16,
    /// Whether a non-king tile may be emptied completely.
    pub allow_evacuation: bool,
    pub capture_transfer: CaptureTransfer,
    /// Rotate `currentPlayer` each round and restrict production to them.
    pub turn_priority: bool,
    /// Distinguish "seen before" (fog) from "never seen" (unknown) tiles.
    pub fog_memory: bool,
    /// Accepted moves per player per round. `0` means unlimited.
    pub moves_per_turn: u16,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            soldier_growth_interval: SOLDIER_GROWTH_INTERVAL,
            building_growth_interval: BUILDING_GROWTH_INTERVAL,
            plain_sight: PLAIN_SIGHT,
            building_sight: BUILDING_SIGHT,
            allow_evacuation: false,
            capture_transfer: CaptureTransfer::ToCapturer,
            turn_priority: false,
            fog_memory: true,
            moves_per_turn: 0,
        }
    }
}

/// A playable configuration, advertised to clients in `roomInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMode {
    pub name: String,
    pub max_players: usize,
    pub min_players: usize,
    /// Milliseconds between rounds at speed 1. `0` means the clock only advances on explicit ticks.
    pub turn_duration: u64,
    /// Clock multiplier: a speed of 2 plays rounds twice as fast.
    pub speed: f64,
    #[serde(skip)]
    pub rules: Rules,
}

impl GameMode {
    pub fn one_vs_one() -> Self {
        Self {
            name: "1v1".to_string(),
            max_players: 2,
            min_players: 2,
            turn_duration: DEFAULT_TURN_DURATION_MS,
            speed: 1.0,
            rules: Rules { moves_per_turn: DUEL_MOVES_PER_TURN, ..Rules::default() },
        }
    }

    pub fn free_for_all() -> Self {
        Self {
            name: "ffa".to_string(),
            max_players: 8,
            min_players: 2,
            turn_duration: DEFAULT_TURN_DURATION_MS,
            speed: 1.0,
            rules: Rules::default(),
        }
    }

    /// Round-robin production variant of free-for-all.
    pub fn priority() -> Self {
        Self {
            name: "priority".to_string(),
            rules: Rules {
                turn_priority: true,
                ..Rules::default()
            },
            ..Self::free_for_all()
        }
    }

    /// Look a preset up by name. A `-<n>x` suffix picks a speed variant,
    /// e.g. `1v1-2x`.
    pub fn by_name(name: &str) -> Option<Self> {
        if let Some(mode) = Self::preset(name) {
            return Some(mode);
        }
        let (base, factor) = name.rsplit_once('-')?;
        let speed: f64 = factor.strip_suffix('x')?.parse().ok()?;
        if !speed.is_finite() || speed <= 0.0 {
            return None;
        }
        let mut mode = Self::preset(base)?.with_speed(speed);
        mode.name = name.to_string();
        Some(mode)
    }

    fn preset(name: &str) -> Option<Self> {
        match name {
            "1v1" => Some(Self::one_vs_one()),
            "ffa" => Some(Self::free_for_all()),
            "priority" => Some(Self::priority()),
            _ => None,
        }
    }

    pub fn with_turn_duration(mut self, millis: u64) -> Self {
        self.turn_duration = millis;
        self
    }

    /// Ignored unless positive.
    pub fn with_speed(mut self, speed: f64) -> Self {
        if speed.is_finite() && speed > 0.0 {
            self.speed = speed;
        }
        self
    }

    /// Milliseconds between rounds once speed is applied.
    pub fn turn_interval_ms(&self) -> u64 {
        if self.turn_duration > 0 && self.speed > 0.0 {
            ((self.turn_duration as f64 / self.speed).round() as u64).max(1)
        } else {
            self.turn_duration
        }
    }

    /// Tick interval, `None` for event-driven rooms.
    pub fn tick_interval(&self) -> Option<Duration> {
        let millis = self.turn_interval_ms();
        (millis > 0).then(|| Duration::from_millis(millis))
    }
}

impl Default for GameMode {
    fn default() -> Self {
        Self::one_vs_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_resolve_by_name() {
        assert_eq!(GameMode::by_name("1v1").map(|m| m.max_players), Some(2));
        assert!(GameMode::by_name("priority").is_some_and(|m| m.rules.turn_priority));
        assert!(GameMode::by_name("battle-royale").is_none());
        assert_eq!(GameMode::by_name("1v1").map(|m| m.rules.moves_per_turn), Some(DUEL_MOVES_PER_TURN));
    }

    #[test]
    fn speed_variants_shorten_the_turn() {
        let fast = GameMode::by_name("1v1-2x").unwrap().with_turn_duration(500);
        assert_eq!(fast.name, "1v1-2x");
        assert_eq!(fast.max_players, 2);
        assert_eq!(fast.tick_interval(), Some(Duration::from_millis(250)));
        assert_eq!(GameMode::by_name("ffa-4x").map(|m| m.with_turn_duration(1000).turn_interval_ms()), Some(250));
        assert!(GameMode::by_name("1v1-0x").is_none());
        assert!(GameMode::by_name("1v1-fastx").is_none());
        assert!(GameMode::by_name("duel-2x").is_none());
        assert_eq!(GameMode::one_vs_one().with_speed(-1.0).speed, 1.0);
    }

    #[test]
    fn zero_duration_is_event_driven() {
        assert_eq!(GameMode::one_vs_one().with_turn_duration(0).tick_interval(), None);
        assert_eq!(
            GameMode::one_vs_one().with_turn_duration(250).tick_interval(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn mode_serializes_camel_case_without_rules() {
        let json = serde_json::to_value(GameMode::one_vs_one()).unwrap();
        assert_eq!(json["maxPlayers"], 2);
        assert_eq!(json["minPlayers"], 2);
        assert!(json.get("rules").is_none());
    }
}
