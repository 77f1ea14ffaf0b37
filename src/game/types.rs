use serde::{Deserialize, Serialize};

/// Player identifier. `0` is reserved for "no owner" (neutral).
pub type PlayerId = u16;

/// Team identifier. Victory and vision are shared within a team.
pub type TeamId = u8;

/// Owner id of neutral tiles.
pub const NEUTRAL: PlayerId = 0;

/// A 1-indexed grid coordinate, `x` is the column and `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// The neighbouring position one cell towards `direction`.
    /// Returns `None` when the step would leave the positive quadrant.
    pub fn step(self, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.offset();
        let x = i32::from(self.x) + dx;
        let y = i32::from(self.y) + dy;
        let x = u16::try_from(x).ok()?;
        let y = u16::try_from(y).ok()?;
        Some(Position { x, y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Column/row offset, rows grow downwards.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u16,
    pub height: u16,
}

impl MapSize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, pos: Position) -> bool {
        (1..=self.width).contains(&pos.x) && (1..=self.height).contains(&pos.y)
    }

    pub fn area(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Row-major arena index of an in-range position.
    pub fn index(&self, pos: Position) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        Some(usize::from(pos.y - 1) * usize::from(self.width) + usize::from(pos.x - 1))
    }

    /// Inverse of [`MapSize::index`].
    pub fn position(&self, index: usize) -> Position {
        let width = usize::from(self.width.max(1));
        // Both quotients are bounded by width/height, which are u16.
        Position {
            x: (index % width) as u16 + 1,
            y: (index / width) as u16 + 1,
        }
    }
}

/// Identity of the map template a session was built from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapInfo {
    pub id: String,
    pub name: String,
    pub desc: String,
}
