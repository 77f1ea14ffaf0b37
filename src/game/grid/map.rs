//! The game map: a fixed-size, row-major arena of blocks.

use thiserror::Error;

use crate::game::entities::{Block, BlockKind, RoundContext};
use crate::game::systems::fog::PlayerSight;
use crate::game::types::{MapInfo, MapSize, PlayerId, Position};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("position ({}, {}) is outside the map", .0.x, .0.y)]
    OutOfBounds(Position),
    #[error("expected a {expected_width}x{expected_height} grid, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u16,
        expected_height: u16,
        width: usize,
        height: usize,
    },
    #[error("map has no blocks")]
    Empty,
    #[error("unknown block type '{0}'")]
    UnknownBlockType(String),
    #[error("invalid block at ({}, {}): {reason}", .pos.x, .pos.y)]
    InvalidBlock { pos: Position, reason: String },
    #[error("map is too large")]
    TooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    size: MapSize,
    info: MapInfo,
    blocks: Vec<Block>,
}

impl Map {
    /// An unpopulated map of the given size.
    pub fn new(size: MapSize, info: MapInfo) -> Self {
        Self { size, info, blocks: Vec::new() }
    }

    /// A map where every tile is `block`.
    pub fn filled(size: MapSize, info: MapInfo, block: Block) -> Self {
        Self { size, info, blocks: vec![block; size.area()] }
    }

    /// Build a map from rows; the size is taken from the rows themselves.
    pub fn from_rows(info: MapInfo, rows: Vec<Vec<Block>>) -> Result<Self, MapError> {
        let height = u16::try_from(rows.len()).map_err(|_| MapError::TooLarge)?;
        let width = rows.first().map_or(0, Vec::len);
        let width = u16::try_from(width).map_err(|_| MapError::TooLarge)?;
        let mut map = Map::new(MapSize::new(width, height), info);
        map.set_blocks(rows)?;
        Ok(map)
    }

    pub fn size(&self) -> MapSize {
        self.size
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    /// True until the grid has been populated.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, pos: Position) -> Result<Block, MapError> {
        self.size
            .index(pos)
            .and_then(|i| self.blocks.get(i))
            .copied()
            .ok_or(MapError::OutOfBounds(pos))
    }

    pub fn set_block(&mut self, pos: Position, block: Block) -> Result<(), MapError> {
        let slot = self
            .size
            .index(pos)
            .and_then(|i| self.blocks.get_mut(i))
            .ok_or(MapError::OutOfBounds(pos))?;
        *slot = block;
        Ok(())
    }

    /// Snapshot of the grid as rows.
    pub fn blocks(&self) -> Vec<Vec<Block>> {
        let width = usize::from(self.size.width.max(1));
        self.blocks.chunks(width).map(<[Block]>::to_vec).collect()
    }

    /// Replace the whole grid. Fails without touching the map unless the rows
    /// match the map size exactly.
    pub fn set_blocks(&mut self, rows: Vec<Vec<Block>>) -> Result<(), MapError> {
        if rows.is_empty() || rows.iter().all(Vec::is_empty) {
            return Err(MapError::Empty);
        }
        let width = usize::from(self.size.width);
        let mismatch = rows.len() != usize::from(self.size.height) || rows.iter().any(|r| r.len() != width);
        if mismatch {
            return Err(MapError::DimensionMismatch {
                expected_width: self.size.width,
                expected_height: self.size.height,
                width: rows.iter().map(Vec::len).max().unwrap_or(0),
                height: rows.len(),
            });
        }
        self.blocks = rows.into_iter().flatten().collect();
        Ok(())
    }

    /// Blocks with their positions, in raster order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Block)> {
        let size = self.size;
        self.blocks.iter().enumerate().map(move |(i, b)| (size.position(i), b))
    }

    pub fn positions_of(&self, kind: BlockKind) -> Vec<Position> {
        self.iter().filter(|(_, b)| b.kind() == kind).map(|(p, _)| p).collect()
    }

    pub fn owned_by(&self, owner: PlayerId) -> Vec<Position> {
        self.iter().filter(|(_, b)| b.owner() == owner).map(|(p, _)| p).collect()
    }

    /// Replace every block with `f(position, block)`.
    pub fn update_all(&mut self, mut f: impl FnMut(Position, &Block) -> Block) {
        let size = self.size;
        for (i, block) in self.blocks.iter_mut().enumerate() {
            *block = f(size.position(i), block);
        }
    }

    /// Round-start hooks. Every block is computed from the pre-round grid, then
    /// the new grid is committed at once.
    pub fn round_start(&mut self, ctx: &RoundContext<'_>) {
        let next: Vec<Block> = self.blocks.iter().map(|b| b.round_start(ctx)).collect();
        self.blocks = next;
    }

    pub fn round_end(&mut self, ctx: &RoundContext<'_>) {
        let next: Vec<Block> = self.blocks.iter().map(|b| b.round_end(ctx)).collect();
        self.blocks = next;
    }

    /// The map as seen by each of `sights`, in the same order.
    pub fn fog(&self, sights: &[PlayerSight]) -> Vec<Vec<Vec<Block>>> {
        sights.iter().map(|sight| self.fog_view(sight)).collect()
    }

    /// The map as seen through one player's sight.
    pub fn fog_view(&self, sight: &PlayerSight) -> Vec<Vec<Block>> {
        let masked: Vec<Block> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, block)| {
                let is_owner = sight.owners.contains(&block.owner()) && block.is_owned();
                let is_sight = sight.visible.get(i).copied().unwrap_or(false);
                let view = block.fog(is_owner, is_sight);
                match &sight.seen {
                    Some(seen) if view.kind() == BlockKind::Fog && !seen.get(i).copied().unwrap_or(false) => {
                        Block::unknown()
                    }
                    _ => view,
                }
            })
            .collect();
        let width = usize::from(self.size.width.max(1));
        masked.chunks(width).map(<[Block]>::to_vec).collect()
    }
}
