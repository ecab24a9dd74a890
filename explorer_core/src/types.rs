// types.rs - Shared value types for maze cells, positions and directions
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer grid coordinate. Negative values are valid positions, they are
/// simply never walkable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Saturates at the `i32` limits, which lie far outside any grid.
    #[inline]
    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    #[inline]
    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// True when `other` is exactly one orthogonal step away.
    #[inline]
    pub fn is_adjacent(self, other: Position) -> bool {
        self.manhattan(other) == 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    #[inline]
    fn from((x, y): (i32, i32)) -> Self {
        Position::new(x, y)
    }
}

/// One of the four unit moves. Screen coordinates: `Up` decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Scan order used for every availability query.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    #[inline]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cell classification. The numeric codes are the persisted representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Cell {
    #[default]
    Wall = 0,
    Path = 1,
    Start = 2,
    Goal = 3,
}

impl Cell {
    #[inline]
    pub fn is_walkable(self) -> bool {
        !matches!(self, Cell::Wall)
    }

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Cell> {
        match code {
            0 => Some(Cell::Wall),
            1 => Some(Cell::Path),
            2 => Some(Cell::Start),
            3 => Some(Cell::Goal),
            _ => None,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Cell::Wall => '#',
            Cell::Path => ' ',
            Cell::Start => 'S',
            Cell::Goal => 'G',
        }
    }
}

/// A walkable, unvisited neighbor reported by a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableMove {
    pub direction: Direction,
    pub target_position: Position,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_follows_screen_axes() {
        let p = Position::new(3, 3);
        assert_eq!(p.step(Direction::Up), Position::new(3, 2));
        assert_eq!(p.step(Direction::Down), Position::new(3, 4));
        assert_eq!(p.step(Direction::Left), Position::new(2, 3));
        assert_eq!(p.step(Direction::Right), Position::new(4, 3));
    }

    #[test]
    fn test_manhattan_and_adjacency() {
        let a = Position::new(1, 1);
        assert_eq!(a.manhattan(Position::new(4, -2)), 6);
        assert!(a.is_adjacent(Position::new(1, 2)));
        assert!(!a.is_adjacent(Position::new(2, 2)));
        assert!(!a.is_adjacent(a));
    }

    #[test]
    fn test_extreme_coordinates_do_not_overflow() {
        let low = Position::new(i32::MIN, i32::MIN);
        let high = Position::new(i32::MAX, i32::MAX);
        assert_eq!(low.manhattan(high), u32::MAX);
        assert!(!low.is_adjacent(Position::new(1, 1)));
        assert_eq!(high.step(Direction::Right), high);
        assert_eq!(low.step(Direction::Up), low);
    }

    #[test]
    fn test_cell_codes() {
        for cell in [Cell::Wall, Cell::Path, Cell::Start, Cell::Goal] {
            assert_eq!(Cell::from_code(cell.code()), Some(cell));
        }
        assert_eq!(Cell::from_code(4), None);
        assert!(!Cell::Wall.is_walkable());
        assert!(Cell::Goal.is_walkable());
    }
}
