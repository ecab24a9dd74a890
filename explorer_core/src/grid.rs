// grid.rs - Immutable cell grid produced by the generator

use crate::error_handling::{ExplorerError, Result};
use crate::types::{Cell, Position};
use std::fmt;

/// Row-major `width * height` array of cells plus the two special positions.
///
/// A grid never changes after generation (or after being restored from a
/// snapshot); the engine shares it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    start: Position,
    goal: Position,
}

impl Grid {
    /// Build a grid from rows of cells, validating the structural invariants:
    /// rectangular, exactly one start and exactly one goal.
    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 || height == 0 {
            return Err(ExplorerError::invalid_snapshot("grid is empty"));
        }
        if rows.iter().any(|row| row.len() != width) {
            return Err(ExplorerError::invalid_snapshot("grid rows differ in length"));
        }

        let mut start = None;
        let mut goal = None;
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let pos = Position::new(x as i32, y as i32);
                let slot = match cell {
                    Cell::Start => &mut start,
                    Cell::Goal => &mut goal,
                    _ => continue,
                };
                if slot.replace(pos).is_some() {
                    return Err(ExplorerError::invalid_snapshot(format!(
                        "more than one {:?} cell",
                        cell
                    )));
                }
            }
        }

        let start = start.ok_or_else(|| ExplorerError::invalid_snapshot("grid has no start cell"))?;
        let goal = goal.ok_or_else(|| ExplorerError::invalid_snapshot("grid has no goal cell"))?;

        Ok(Self {
            width,
            height,
            cells: rows.into_iter().flatten().collect(),
            start,
            goal,
        })
    }

    pub(crate) fn from_parts(width: usize, height: usize, cells: Vec<Cell>, start: Position, goal: Position) -> Self {
        debug_assert_eq!(cells.len(), width * height);
        Self {
            width,
            height,
            cells,
            start,
            goal,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 {
            return None;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// Cell at `pos`, `None` when out of bounds.
    pub fn cell(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// In bounds and not a wall.
    #[inline]
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.cell(pos).is_some_and(Cell::is_walkable)
    }

    #[inline]
    pub fn is_goal(&self, pos: Position) -> bool {
        pos == self.goal
    }

    /// Rows of cell codes, the persisted form.
    pub fn to_codes(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect()
    }

    pub fn from_codes(codes: &[Vec<u8>]) -> Result<Self> {
        let rows = codes
            .iter()
            .enumerate()
            .map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(|(x, &code)| {
                        Cell::from_code(code).ok_or_else(|| {
                            ExplorerError::invalid_snapshot(format!("unknown cell code {code} at ({x}, {y})"))
                        })
                    })
                    .collect::<Result<Vec<Cell>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_rows(rows)
    }

    /// Parse an ASCII maze: '#' wall, 'S' start, 'G' goal, anything else path.
    #[cfg(test)]
    pub(crate) fn parse_ascii(rows: &[&str]) -> Result<Self> {
        Self::from_rows(
            rows.iter()
                .map(|r| {
                    r.chars()
                        .map(|ch| match ch {
                            '#' => Cell::Wall,
                            'S' => Cell::Start,
                            'G' => Cell::Goal,
                            _ => Cell::Path,
                        })
                        .collect()
                })
                .collect(),
        )
    }

    /// Number of walkable cells, start and goal included.
    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_walkable()).count()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width) {
            let line: String = row.iter().map(|c| c.glyph()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(rows: &[&str]) -> Result<Grid> {
        Grid::parse_ascii(rows)
    }

    #[test]
    fn test_from_rows_locates_start_and_goal() {
        let grid = parse(&["#####", "#S  #", "### #", "#G  #", "#####"]).unwrap();
        assert_eq!(grid.start(), Position::new(1, 1));
        assert_eq!(grid.goal(), Position::new(1, 3));
        assert_eq!(grid.walkable_count(), 7);
        assert!(grid.is_walkable(Position::new(3, 2)));
        assert!(!grid.is_walkable(Position::new(0, 0)));
        assert!(!grid.is_walkable(Position::new(-1, 1)));
        assert!(!grid.is_walkable(Position::new(5, 1)));
    }

    #[test]
    fn test_from_rows_rejects_malformed_grids() {
        assert!(parse(&["###", "#S#", "###"]).is_err());
        assert!(parse(&["#####", "#SSG#", "#####"]).is_err());
        assert!(parse(&["#####", "#S G#", "####"]).is_err());
        assert!(Grid::from_rows(vec![]).is_err());
    }

    #[test]
    fn test_codes_round_trip_and_display() {
        let grid = parse(&["#####", "#S G#", "#####"]).unwrap();
        let codes = grid.to_codes();
        assert_eq!(codes[1], vec![0, 2, 1, 3, 0]);
        assert_eq!(Grid::from_codes(&codes).unwrap(), grid);
        assert_eq!(grid.to_string(), "#####\n#S G#\n#####\n");

        let mut bad = codes.clone();
        bad[0][0] = 9;
        assert!(matches!(
            Grid::from_codes(&bad),
            Err(ExplorerError::InvalidSnapshot { .. })
        ));
    }
}
