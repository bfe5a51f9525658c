//! Grid positions
//!
//! Coordinates are signed so that targets outside the maze (a lift-throw
//! past the edge) stay representable; bounds are checked against the
//! topology, not the type.

use serde::{Deserialize, Serialize};

use super::direction::Direction;

/// A cell coordinate on the maze grid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct CellPos {
    pub x: i32,
    pub y: i32,
}

impl CellPos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The cell one step away in `direction`.
    pub fn step(&self, direction: Direction) -> CellPos {
        let (dx, dy) = direction.delta();
        CellPos::new(self.x + dx, self.y + dy)
    }

    /// The cell `distance` steps away in `direction`.
    pub fn step_by(&self, direction: Direction, distance: i32) -> CellPos {
        let (dx, dy) = direction.delta();
        CellPos::new(self.x + dx * distance, self.y + dy * distance)
    }

    pub fn manhattan(&self, other: CellPos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Straight-line distance if the two cells share a row or column.
    pub fn straight_line_distance(&self, other: CellPos) -> Option<i32> {
        if self.x == other.x || self.y == other.y {
            Some(self.manhattan(other))
        } else {
            None
        }
    }
}

impl std::fmt::Display for CellPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Sub-cell offset used by the rendering client for animation timing.
/// The engine resets it on every authoritative relocation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SubCell {
    pub dx: f32,
    pub dy: f32,
}

impl SubCell {
    pub const CENTERED: SubCell = SubCell { dx: 0.0, dy: 0.0 };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step() {
        let pos = CellPos::new(3, 3);
        assert_eq!(pos.step(Direction::North), CellPos::new(3, 2));
        assert_eq!(pos.step_by(Direction::East, 2), CellPos::new(5, 3));
    }

    #[test]
    fn test_straight_line_distance() {
        let pos = CellPos::new(2, 2);
        assert_eq!(pos.straight_line_distance(CellPos::new(2, 5)), Some(3));
        assert_eq!(pos.straight_line_distance(CellPos::new(4, 2)), Some(2));
        assert_eq!(pos.straight_line_distance(CellPos::new(3, 3)), None);
    }
}
