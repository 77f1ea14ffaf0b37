//! Plain, fog-free map file format used for authoring and testing maps.

use serde::{Deserialize, Serialize};

use crate::game::entities::{Block, BlockKind};
use crate::game::grid::map::{Map, MapError};
use crate::game::types::{MapInfo, MapSize, NEUTRAL, Position};

/// One tile as it travels over the wire or sits in a map file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub troops: Option<u16>,
    /// Remembered terrain of a fog tile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terrain: Option<String>,
}

impl From<&Block> for BlockInfo {
    fn from(block: &Block) -> Self {
        let occupied = matches!(block.kind(), BlockKind::Soldier | BlockKind::Castle | BlockKind::King);
        BlockInfo {
            kind: block.kind().name().to_string(),
            owner: occupied.then_some(block.owner()),
            troops: occupied.then_some(block.num()),
            terrain: block.remembered().map(|k| k.name().to_string()),
        }
    }
}

impl BlockInfo {
    /// Convert a file tile into a real block at `pos`.
    pub fn to_block(&self, pos: Position) -> Result<Block, MapError> {
        let kind = BlockKind::from_name(&self.kind).ok_or_else(|| MapError::UnknownBlockType(self.kind.clone()))?;
        let owner = self.owner.unwrap_or(NEUTRAL);
        let troops = self.troops.unwrap_or(0);
        match kind {
            BlockKind::Fog | BlockKind::Unknown => Err(MapError::InvalidBlock {
                pos,
                reason: format!("'{}' is a view-only type", kind.name()),
            }),
            BlockKind::Blank | BlockKind::Mountain if owner != NEUTRAL || troops != 0 => Err(MapError::InvalidBlock {
                pos,
                reason: format!("{} cannot have an owner or troops", kind.name()),
            }),
            _ => Ok(Block::new(kind, owner, troops)),
        }
    }
}

/// A whole map in file form. `blocks` is row-major, `blocks[y - 1][x - 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMap {
    pub size: MapSize,
    pub info: MapInfo,
    pub blocks: Vec<Vec<BlockInfo>>,
}

impl ExportedMap {
    pub fn from_map(map: &Map) -> Self {
        ExportedMap {
            size: map.size(),
            info: map.info().clone(),
            blocks: map
                .blocks()
                .iter()
                .map(|row| row.iter().map(BlockInfo::from).collect())
                .collect(),
        }
    }

    /// Validate and build a map. `blocks` must be non-empty and exactly
    /// `size.height` rows of `size.width` tiles.
    pub fn into_map(self) -> Result<Map, MapError> {
        if self.blocks.is_empty() || self.size.area() == 0 {
            return Err(MapError::Empty);
        }
        let width = usize::from(self.size.width);
        if self.blocks.len() != usize::from(self.size.height) || self.blocks.iter().any(|row| row.len() != width) {
            return Err(MapError::DimensionMismatch {
                expected_width: self.size.width,
                expected_height: self.size.height,
                width: self.blocks.iter().map(Vec::len).max().unwrap_or(0),
                height: self.blocks.len(),
            });
        }
        let rows = self
            .blocks
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, info)| info.to_block(Position::new(x as u16 + 1, y as u16 + 1)))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut map = Map::new(self.size, self.info);
        map.set_blocks(rows)?;
        Ok(map)
    }

    pub fn from_json(json: &str) -> Result<Map, ImportError> {
        let exported: ExportedMap = serde_json::from_str(json)?;
        Ok(exported.into_map()?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("malformed map file: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Map(#[from] MapError),
}
