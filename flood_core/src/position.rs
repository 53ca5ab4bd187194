use std::fmt;

use bevy::math::IVec2;
use serde::{Deserialize, Serialize};

/// Integer grid coordinate.
///
/// Signed so that long-range jump targets can land outside the grid and be
/// rejected by the bounds check instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

/// Cardinal offsets in N, S, W, E order.
pub const CARDINAL_OFFSETS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the `i32` limits; such positions are never in a grid.
    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Von Neumann neighbourhood, used for spread adjacency and edge tests.
    #[inline]
    pub fn neighbors4(self) -> [Position; 4] {
        CARDINAL_OFFSETS.map(|(dx, dy)| self.offset(dx, dy))
    }

    /// Position `distance` steps away along cardinal `direction` (0..4).
    pub fn step(self, direction: usize, distance: i32) -> Self {
        let (dx, dy) = CARDINAL_OFFSETS[direction % CARDINAL_OFFSETS.len()];
        self.offset(dx.saturating_mul(distance), dy.saturating_mul(distance))
    }

    pub fn chebyshev_distance(self, other: Position) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl From<IVec2> for Position {
    fn from(value: IVec2) -> Self {
        Self::new(value.x, value.y)
    }
}

impl From<Position> for IVec2 {
    fn from(value: Position) -> Self {
        IVec2::new(value.x, value.y)
    }
}
