// ============================================================================
// Cell: an immutable board coordinate
//
// Coordinates are u32 so they can never be negative; bounds are relative to
// the session's board size and checked with `in_bounds()` by placement and
// targeting logic.
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Deserialize, Eq, PartialEq, Ord, PartialOrd, Serialize, Hash)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    pub fn in_bounds(&self, board_size: u32) -> bool {
        self.x < board_size && self.y < board_size
    }

    /// Every cell of a `board_size` square board in row-major order.
    pub fn all(board_size: u32) -> impl Iterator<Item = Cell> {
        (0..board_size).flat_map(move |y| (0..board_size).map(move |x| Cell::new(x, y)))
    }
}

impl From<(u32, u32)> for Cell {
    fn from(value: (u32, u32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
