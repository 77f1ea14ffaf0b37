//! Fog-of-war system.
//!
//! Visibility is recomputed from scratch from current ownership every time it
//! is needed; only the "has ever been seen" memory persists between rounds.

use std::collections::HashMap;

use crate::game::grid::Map;
use crate::game::mode::Rules;
use crate::game::types::{MapSize, PlayerId};

/// Everything `Map::fog_view` needs to mask the map for one viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSight {
    /// Players whose tiles count as the viewer's own (the viewer and teammates).
    pub owners: Vec<PlayerId>,
    /// Row-major visibility matrix.
    pub visible: Vec<bool>,
    /// Row-major "seen at least once" matrix; `None` when the mode does not
    /// distinguish fog from unknown.
    pub seen: Option<Vec<bool>>,
}

impl PlayerSight {
    /// A sight that reveals the whole map.
    pub fn everything(size: MapSize) -> Self {
        Self { owners: Vec::new(), visible: vec![true; size.area()], seen: None }
    }
}

pub struct FogCalculator;

impl FogCalculator {
    /// Tiles visible to `owners`: every tile they own plus everything within
    /// the Chebyshev sight radius of an owned tile.
    pub fn visibility(map: &Map, owners: &[PlayerId], rules: &Rules) -> Vec<bool> {
        let size = map.size();
        let mut visible = vec![false; size.area()];
        for (pos, block) in map.iter() {
            if !block.is_owned() || !owners.contains(&block.owner()) {
                continue;
            }
            let radius = block.sight(rules);
            let min_y = pos.y.saturating_sub(radius).max(1);
            let max_y = pos.y.saturating_add(radius).min(size.height);
            let min_x = pos.x.saturating_sub(radius).max(1);
            let max_x = pos.x.saturating_add(radius).min(size.width);
            for y in min_y..=max_y {
                for x in min_x..=max_x {
                    let i = usize::from(y - 1) * usize::from(size.width) + usize::from(x - 1);
                    visible[i] = true;
                }
            }
        }
        visible
    }
}

/// Per-player record of tiles seen at least once.
#[derive(Debug, Clone, Default)]
pub struct FogMemory {
    seen: HashMap<PlayerId, Vec<bool>>,
}

impl FogMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the current sight of `viewer` (sharing vision with `owners`) and
    /// fold it into the memory.
    pub fn observe(&mut self, map: &Map, viewer: PlayerId, owners: &[PlayerId], rules: &Rules) -> PlayerSight {
        let visible = FogCalculator::visibility(map, owners, rules);
        let seen = self.seen.entry(viewer).or_insert_with(|| vec![false; visible.len()]);
        if seen.len() != visible.len() {
            *seen = vec![false; visible.len()];
        }
        for (memory, now) in seen.iter_mut().zip(&visible) {
            *memory |= *now;
        }
        PlayerSight {
            owners: owners.to_vec(),
            seen: rules.fog_memory.then(|| seen.clone()),
            visible,
        }
    }
}
