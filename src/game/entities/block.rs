//! Block (tile) entity.
//!
//! A block is a small value: kind, owner and troop count. Every kind-specific
//! behaviour (move legality, production, fog fallback) is read from a static
//! operation table indexed by [`BlockKind`]. Operations never mutate a block in
//! place; they return the block that replaces it.

use serde::{Deserialize, Serialize};

use crate::game::mode::Rules;
use crate::game::types::{NEUTRAL, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Blank,
    Mountain,
    Soldier,
    Castle,
    King,
    Fog,
    Unknown,
}

/// Static description of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Copy)]
struct KindOps {
    meta: BlockMeta,
    allow_from: bool,
    allow_to: bool,
    /// What a player who cannot see the tile is shown instead.
    fog_fallback: BlockKind,
    /// Can hold an owner and troops.
    occupiable: bool,
    building: bool,
}

const fn ops(
    name: &'static str,
    description: &'static str,
    allow_from: bool,
    allow_to: bool,
    fog_fallback: BlockKind,
    occupiable: bool,
    building: bool,
) -> KindOps {
    KindOps {
        meta: BlockMeta { name, description },
        allow_from,
        allow_to,
        fog_fallback,
        occupiable,
        building,
    }
}

// Indexed by `BlockKind as usize`; keep in declaration order.
const KIND_TABLE: [KindOps; 7] = [
    ops("blank", "Empty land", false, true, BlockKind::Blank, false, false),
    ops("mountain", "Impassable terrain", false, false, BlockKind::Mountain, false, false),
    ops("soldier", "Land held by troops", true, true, BlockKind::Blank, true, false),
    ops("castle", "A city producing troops every round", true, true, BlockKind::Castle, true, true),
    ops("king", "A general; losing it eliminates the player", true, true, BlockKind::Castle, true, true),
    ops("fog", "A tile hidden by fog of war", false, false, BlockKind::Fog, false, false),
    ops("unknown", "A tile never seen", false, false, BlockKind::Unknown, false, false),
];

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Blank,
        BlockKind::Mountain,
        BlockKind::Soldier,
        BlockKind::Castle,
        BlockKind::King,
        BlockKind::Fog,
        BlockKind::Unknown,
    ];

    fn ops(self) -> &'static KindOps {
        &KIND_TABLE[self as usize]
    }

    pub fn meta(self) -> BlockMeta {
        self.ops().meta
    }

    pub fn name(self) -> &'static str {
        self.ops().meta.name
    }

    pub fn is_building(self) -> bool {
        self.ops().building
    }

    pub fn fog_fallback(self) -> BlockKind {
        self.ops().fog_fallback
    }

    /// Parse a kind name, accepting the usual aliases (troop, city, general).
    pub fn from_name(name: &str) -> Option<BlockKind> {
        match name.to_ascii_lowercase().as_str() {
            "blank" | "plain" | "empty" => Some(BlockKind::Blank),
            "mountain" => Some(BlockKind::Mountain),
            "soldier" | "troop" => Some(BlockKind::Soldier),
            "castle" | "city" => Some(BlockKind::Castle),
            "king" | "general" => Some(BlockKind::King),
            "fog" => Some(BlockKind::Fog),
            "unknown" => Some(BlockKind::Unknown),
            _ => None,
        }
    }
}

/// Whether troops may leave or enter a block. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowMove {
    pub from: bool,
    pub to: bool,
    /// Diagnostic only.
    pub reason: String,
}

/// Inputs of a round hook.
#[derive(Debug, Clone, Copy)]
pub struct RoundContext<'a> {
    pub round: u32,
    pub rules: &'a Rules,
    /// When set, only this player's tiles produce this round.
    pub producer: Option<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    kind: BlockKind,
    owner: PlayerId,
    num: u16,
    /// Terrain remembered under a fog tile.
    remembered: Option<BlockKind>,
}

impl Block {
    /// Build a block, forcing terrain kinds to stay neutral and empty.
    pub fn new(kind: BlockKind, owner: PlayerId, num: u16) -> Self {
        if kind.ops().occupiable {
            Self { kind, owner, num, remembered: None }
        } else {
            Self { kind, owner: NEUTRAL, num: 0, remembered: None }
        }
    }

    pub fn blank() -> Self {
        Self::new(BlockKind::Blank, NEUTRAL, 0)
    }

    pub fn mountain() -> Self {
        Self::new(BlockKind::Mountain, NEUTRAL, 0)
    }

    pub fn soldier(owner: PlayerId, num: u16) -> Self {
        Self::new(BlockKind::Soldier, owner, num)
    }

    pub fn castle(owner: PlayerId, num: u16) -> Self {
        Self::new(BlockKind::Castle, owner, num)
    }

    pub fn king(owner: PlayerId, num: u16) -> Self {
        Self::new(BlockKind::King, owner, num)
    }

    /// A hidden tile that remembers the terrain underneath.
    pub fn fogged(remembered: BlockKind) -> Self {
        Self { remembered: Some(remembered), ..Self::new(BlockKind::Fog, NEUTRAL, 0) }
    }

    pub fn unknown() -> Self {
        Self::new(BlockKind::Unknown, NEUTRAL, 0)
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn meta(&self) -> BlockMeta {
        self.kind.meta()
    }

    pub fn num(&self) -> u16 {
        self.num
    }

    pub fn owner(&self) -> PlayerId {
        self.owner
    }

    pub fn remembered(&self) -> Option<BlockKind> {
        self.remembered
    }

    pub fn is_owned(&self) -> bool {
        self.owner != NEUTRAL
    }

    /// Chebyshev sight radius this tile grants its owner.
    pub fn sight(&self, rules: &Rules) -> u16 {
        if !self.is_owned() {
            0
        } else if self.kind.is_building() {
            rules.building_sight
        } else {
            rules.plain_sight
        }
    }

    pub fn allow_move(&self) -> AllowMove {
        let ops = self.kind.ops();
        let reason = match (ops.allow_from, ops.allow_to) {
            (true, true) => String::new(),
            (false, true) => format!("{} holds no troops to move", ops.meta.name),
            (true, false) => format!("{} cannot be entered", ops.meta.name),
            (false, false) => format!("{} can neither be left nor entered", ops.meta.name),
        };
        AllowMove { from: ops.allow_from, to: ops.allow_to, reason }
    }

    /// Production applied at the start of a round.
    pub fn round_start(&self, ctx: &RoundContext<'_>) -> Block {
        if !self.is_owned() || ctx.producer.is_some_and(|p| p != self.owner) {
            return *self;
        }
        let interval = match self.kind {
            BlockKind::Soldier => ctx.rules.soldier_growth_interval,
            BlockKind::Castle | BlockKind::King => ctx.rules.building_growth_interval,
            _ => return *self,
        };
        if interval == 0 || ctx.round % interval != 0 {
            return *self;
        }
        Block { num: self.num.saturating_add(1), ..*self }
    }

    /// Cleanup at the end of a round: abandoned empty land reverts to blank.
    pub fn round_end(&self, _ctx: &RoundContext<'_>) -> Block {
        if self.kind == BlockKind::Soldier && !self.is_owned() && self.num == 0 {
            return Block::blank();
        }
        *self
    }

    /// Take up to `n` troops off this tile.
    ///
    /// Returns the departing count and the block left behind. At least one troop
    /// stays unless `evacuate` is set and the tile is not a king, in which case the
    /// tile may be emptied and becomes neutral.
    pub fn move_from(&self, n: u16, evacuate: bool) -> (u16, Block) {
        if !self.kind.ops().allow_from {
            return (0, *self);
        }
        let full_exit = evacuate && self.kind != BlockKind::King;
        let keep = if full_exit { 0 } else { 1 };
        let departing = n.min(self.num.saturating_sub(keep));
        let left = self.num - departing;
        let source = if left == 0 {
            match self.kind {
                BlockKind::Soldier => Block::blank(),
                _ => Block::new(self.kind, NEUTRAL, 0),
            }
        } else {
            Block { num: left, ..*self }
        };
        (departing, source)
    }

    /// The block that results from `n` troops of `owner` arriving here.
    ///
    /// Friendly or neutral arrivals merge; hostile arrivals fight and capture
    /// only with a strict majority. Blank land turns into a soldier tile; every
    /// other kind keeps its kind.
    pub fn move_to(&self, n: u16, owner: PlayerId) -> Block {
        let kind = match self.kind {
            BlockKind::Blank => BlockKind::Soldier,
            kind => kind,
        };
        if self.owner == NEUTRAL || self.owner == owner {
            return Block::new(kind, owner, self.num.saturating_add(n));
        }
        if n > self.num {
            Block::new(kind, owner, n - self.num)
        } else {
            Block::new(kind, self.owner, self.num - n)
        }
    }

    /// What a player sees of this block.
    pub fn fog(&self, is_owner: bool, is_sight: bool) -> Block {
        if is_owner || is_sight {
            *self
        } else {
            Block::fogged(self.kind.fog_fallback())
        }
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::blank()
    }
}
