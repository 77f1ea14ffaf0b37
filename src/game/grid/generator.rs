//! Random map generation and king allocation.

use std::collections::{HashMap, VecDeque};

use log::{debug, warn};
use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::config::game::{CASTLE_DENSITY, GENERATOR_ATTEMPTS, GRID_COL, GRID_ROW, KING_START_TROOPS, MOUNTAIN_DENSITY};
use crate::game::entities::{Block, BlockKind};
use crate::game::grid::map::Map;
use crate::game::types::{Direction, MapInfo, MapSize, NEUTRAL, PlayerId, Position};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("no connected layout found for {players} players after {attempts} attempts")]
    NoLayout { players: usize, attempts: usize },
    #[error("no free tile left to place a king for player {0}")]
    NoKingSpot(PlayerId),
}

/// Parameters of a generated map.
#[derive(Debug, Clone)]
pub struct MapGenerator {
    pub size: MapSize,
    pub mountain_density: f64,
    pub castle_density: f64,
}

impl Default for MapGenerator {
    fn default() -> Self {
        Self {
            size: MapSize::new(GRID_COL, GRID_ROW),
            mountain_density: MOUNTAIN_DENSITY,
            castle_density: CASTLE_DENSITY,
        }
    }
}

impl MapGenerator {
    /// Generate a map with exactly `players` unowned kings, all reachable from
    /// one another over passable tiles.
    pub fn generate<R: Rng>(&self, players: usize, rng: &mut R) -> Result<Map, GenerateError> {
        for attempt in 1..=GENERATOR_ATTEMPTS {
            let mut map = self.scatter_terrain(rng);
            let kings = place_kings(&mut map, players, rng);
            if kings.len() == players && connected(&map, &kings) {
                debug!("[Generator] {}x{} map for {} players after {} attempt(s)", self.size.width, self.size.height, players, attempt);
                return Ok(map);
            }
        }
        warn!("[Generator] Giving up on a {}x{} map for {} players", self.size.width, self.size.height, players);
        Err(GenerateError::NoLayout { players, attempts: GENERATOR_ATTEMPTS })
    }

    fn scatter_terrain<R: Rng>(&self, rng: &mut R) -> Map {
        let info = MapInfo {
            id: "generated".to_string(),
            name: "Generated".to_string(),
            desc: format!("{}x{} random map", self.size.width, self.size.height),
        };
        let mut map = Map::filled(self.size, info, Block::blank());
        map.update_all(|_, _| {
            let roll: f64 = rng.random();
            if roll < self.mountain_density {
                Block::mountain()
            } else if roll < self.mountain_density + self.castle_density {
                Block::castle(NEUTRAL, 0)
            } else {
                Block::blank()
            }
        });
        map
    }
}

fn chebyshev(a: Position, b: Position) -> u16 {
    a.x.abs_diff(b.x).max(a.y.abs_diff(b.y))
}

/// Blank tiles at least two cells away from every tile in `taken`.
fn free_spots(map: &Map, taken: &[Position]) -> Vec<Position> {
    map.iter()
        .filter(|(pos, block)| block.kind() == BlockKind::Blank && taken.iter().all(|k| chebyshev(*k, *pos) >= 2))
        .map(|(pos, _)| pos)
        .collect()
}

fn place_kings<R: Rng>(map: &mut Map, count: usize, rng: &mut R) -> Vec<Position> {
    let mut kings: Vec<Position> = Vec::with_capacity(count);
    while kings.len() < count {
        let mut spots = free_spots(map, &kings);
        spots.shuffle(rng);
        let Some(pos) = spots.first().copied() else {
            break;
        };
        if map.set_block(pos, Block::king(NEUTRAL, KING_START_TROOPS)).is_err() {
            break;
        }
        kings.push(pos);
    }
    kings
}

/// Whether every king can reach the first one without crossing impassable tiles.
fn connected(map: &Map, kings: &[Position]) -> bool {
    let Some(&start) = kings.first() else {
        return true;
    };
    let size = map.size();
    let mut seen = vec![false; size.area()];
    let mut queue = VecDeque::from([start]);
    if let Some(i) = size.index(start) {
        seen[i] = true;
    }
    while let Some(pos) = queue.pop_front() {
        for direction in [Direction::Up, Direction::Down, Direction::Left, Direction::Right] {
            let Some(next) = pos.step(direction) else { continue };
            let Some(i) = size.index(next) else { continue };
            let passable = map.block(next).is_ok_and(|b| b.allow_move().to);
            if !seen[i] && passable {
                seen[i] = true;
                queue.push_back(next);
            }
        }
    }
    kings.iter().all(|k| size.index(*k).is_some_and(|i| seen[i]))
}

/// Hand a king to every player in `players`.
///
/// Kings already owned by a player keep their owner. Unowned kings (or kings of
/// players not in the game) are shuffled and handed out; surplus kings become
/// neutral castles. Players still without a king get one on a random blank tile.
/// Anything else still held by a player outside `players` turns neutral.
pub fn allocate_kings<R: Rng>(
    map: &mut Map,
    players: &[PlayerId],
    rng: &mut R,
) -> Result<HashMap<PlayerId, Position>, GenerateError> {
    let mut assigned: HashMap<PlayerId, Position> = HashMap::new();
    let mut free: Vec<Position> = Vec::new();
    for pos in map.positions_of(BlockKind::King) {
        let owner = map.block(pos).map(|b| b.owner()).unwrap_or(NEUTRAL);
        if players.contains(&owner) && !assigned.contains_key(&owner) {
            assigned.insert(owner, pos);
        } else {
            free.push(pos);
        }
    }
    free.shuffle(rng);

    let mut free = free.into_iter();
    for &player in players {
        if assigned.contains_key(&player) {
            continue;
        }
        let pos = match free.next() {
            Some(pos) => pos,
            None => {
                let taken: Vec<Position> = assigned.values().copied().collect();
                let mut spots = free_spots(map, &taken);
                spots.shuffle(rng);
                spots.first().copied().ok_or(GenerateError::NoKingSpot(player))?
            }
        };
        let troops = map.block(pos).map(|b| b.num()).unwrap_or(0).max(KING_START_TROOPS);
        map.set_block(pos, Block::king(player, troops)).map_err(|_| GenerateError::NoKingSpot(player))?;
        assigned.insert(player, pos);
    }
    for pos in free {
        // In range: the position came from the map itself.
        let _ = map.set_block(pos, Block::castle(NEUTRAL, 0));
    }
    let mut released = 0;
    map.update_all(|_, block| {
        if block.is_owned() && !players.contains(&block.owner()) {
            released += 1;
            Block::new(block.kind(), NEUTRAL, block.num())
        } else {
            *block
        }
    });
    if released > 0 {
        debug!("[Generator] {} tiles of absent players turned neutral", released);
    }
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn generates_one_unowned_king_per_player() {
        let mut rng = StdRng::seed_from_u64(7);
        let map = MapGenerator::default().generate(4, &mut rng).unwrap();
        let kings = map.positions_of(BlockKind::King);
        assert_eq!(kings.len(), 4);
        assert!(kings.iter().all(|k| map.block(*k).unwrap().owner() == NEUTRAL));
        assert!(connected(&map, &kings));
    }

    #[test]
    fn kings_are_never_adjacent() {
        let mut rng = StdRng::seed_from_u64(11);
        let map = MapGenerator::default().generate(6, &mut rng).unwrap();
        let kings = map.positions_of(BlockKind::King);
        for (i, a) in kings.iter().enumerate() {
            for b in &kings[i + 1..] {
                assert!(chebyshev(*a, *b) >= 2);
            }
        }
    }

    #[test]
    fn impossible_layout_is_an_error() {
        let generator = MapGenerator { size: MapSize::new(2, 1), ..MapGenerator::default() };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(generator.generate(3, &mut rng), Err(GenerateError::NoLayout { .. })));
    }

    #[test]
    fn connectivity_detects_walls() {
        let mut map = Map::filled(MapSize::new(3, 1), MapInfo::default(), Block::blank());
        map.set_block(Position::new(2, 1), Block::mountain()).unwrap();
        assert!(!connected(&map, &[Position::new(1, 1), Position::new(3, 1)]));
        map.set_block(Position::new(2, 1), Block::castle(NEUTRAL, 0)).unwrap();
        assert!(connected(&map, &[Position::new(1, 1), Position::new(3, 1)]));
    }

    #[test]
    fn allocation_keeps_owned_and_converts_surplus() {
        let mut map = Map::filled(MapSize::new(5, 1), MapInfo::default(), Block::blank());
        map.set_block(Position::new(1, 1), Block::king(2, 3)).unwrap();
        map.set_block(Position::new(3, 1), Block::king(NEUTRAL, 0)).unwrap();
        map.set_block(Position::new(5, 1), Block::king(NEUTRAL, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let kings = allocate_kings(&mut map, &[1, 2], &mut rng).unwrap();

        assert_eq!(kings[&2], Position::new(1, 1));
        assert_eq!(map.block(kings[&1]).unwrap().owner(), 1);
        assert_eq!(map.positions_of(BlockKind::King).len(), 2);
        assert_eq!(map.positions_of(BlockKind::Castle).len(), 1);
    }

    #[test]
    fn allocation_neutralises_tiles_of_absent_players() {
        let mut map = Map::filled(MapSize::new(5, 1), MapInfo::default(), Block::blank());
        map.set_block(Position::new(1, 1), Block::king(NEUTRAL, 0)).unwrap();
        map.set_block(Position::new(2, 1), Block::castle(9, 40)).unwrap();
        map.set_block(Position::new(3, 1), Block::soldier(9, 5)).unwrap();
        map.set_block(Position::new(4, 1), Block::soldier(1, 2)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        allocate_kings(&mut map, &[1], &mut rng).unwrap();

        assert!(map.owned_by(9).is_empty());
        assert_eq!(map.block(Position::new(2, 1)).unwrap(), Block::castle(NEUTRAL, 40));
        assert_eq!(map.block(Position::new(3, 1)).unwrap(), Block::soldier(NEUTRAL, 5));
        assert_eq!(map.block(Position::new(4, 1)).unwrap(), Block::soldier(1, 2));
    }

    #[test]
    fn allocation_places_missing_kings_on_blank_land() {
        let mut map = Map::filled(MapSize::new(5, 5), MapInfo::default(), Block::blank());
        let mut rng = StdRng::seed_from_u64(5);
        let kings = allocate_kings(&mut map, &[1, 2, 3], &mut rng).unwrap();
        assert_eq!(kings.len(), 3);
        for (player, pos) in &kings {
            let block = map.block(*pos).unwrap();
            assert_eq!((block.kind(), block.owner()), (BlockKind::King, *player));
        }
    }

    #[test]
    fn allocation_fails_without_room() {
        let mut map = Map::filled(MapSize::new(1, 1), MapInfo::default(), Block::mountain());
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(allocate_kings(&mut map, &[4], &mut rng), Err(GenerateError::NoKingSpot(4)));
    }
}
