// generator.rs - Seeded recursive-backtracker maze carving
//
// Output for a given (width, height, seed) is bit-identical across runs: the
// only source of randomness is the RNG handed in by the caller, and every
// random draw happens in a fixed order.

use crate::error_handling::{ExplorerError, Result};
use crate::grid::Grid;
use crate::types::{Cell, Position};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const MIN_DIMENSION: usize = 5;
pub const MAX_DIMENSION: usize = 1001;

/// Lattice jumps used while carving, in draw order.
const CARVE_JUMPS: [(isize, isize); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];
const NEIGHBORS: [(isize, isize); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Generate a maze from a seed using the crate's reference RNG (ChaCha8).
pub fn generate(width: usize, height: usize, seed: u64) -> Result<Grid> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    generate_with_rng(width, height, &mut rng)
}

/// Generate a maze drawing from an explicit RNG.
///
/// Even dimensions are rounded up to the next odd number. Start is always
/// `(1, 1)`; goal is the lattice path cell farthest (Manhattan) from start,
/// earliest in row-major order on ties.
pub fn generate_with_rng<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Result<Grid> {
    let width = round_up_odd(width);
    let height = round_up_odd(height);
    validate_dimensions(width, height)?;

    let mut cells = vec![Cell::Wall; width * height];
    let idx = |x: usize, y: usize| y * width + x;

    for y in (1..height - 1).step_by(2) {
        for x in (1..width - 1).step_by(2) {
            cells[idx(x, y)] = Cell::Path;
        }
    }

    carve(&mut cells, width, height, rng);
    let opened = open_loops(&mut cells, width, height, rng);

    let start = Position::new(1, 1);
    cells[idx(1, 1)] = Cell::Start;

    let goal = select_goal(&cells, width, height);
    cells[idx(goal.x as usize, goal.y as usize)] = Cell::Goal;

    log::info!(
        "Generated {}x{} maze: start {}, goal {} (distance {}), {} loop openings",
        width,
        height,
        start,
        goal,
        start.manhattan(goal),
        opened
    );

    Ok(Grid::from_parts(width, height, cells, start, goal))
}

#[inline]
fn round_up_odd(n: usize) -> usize {
    if n % 2 == 0 {
        n + 1
    } else {
        n
    }
}

fn validate_dimensions(width: usize, height: usize) -> Result<()> {
    for n in [width, height] {
        if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&n) {
            return Err(ExplorerError::InvalidDimensions {
                width,
                height,
                reason: format!("each side must be within {MIN_DIMENSION}..={MAX_DIMENSION} after odd rounding"),
            });
        }
    }
    Ok(())
}

/// Depth-first carving over the odd lattice. Produces a spanning tree: every
/// lattice cell is reachable from (1, 1) by exactly one route.
fn carve<R: Rng + ?Sized>(cells: &mut [Cell], width: usize, height: usize, rng: &mut R) {
    let (w, h) = (width as isize, height as isize);
    let mut visited = vec![false; width * height];
    let mut stack: Vec<(isize, isize)> = vec![(1, 1)];
    visited[width + 1] = true;

    let mut neighbors: Vec<(isize, isize)> = Vec::with_capacity(4);
    while let Some(&(cx, cy)) = stack.last() {
        neighbors.clear();
        for (dx, dy) in CARVE_JUMPS {
            let (nx, ny) = (cx + dx, cy + dy);
            if nx >= 1 && nx < w - 1 && ny >= 1 && ny < h - 1 && !visited[(ny * w + nx) as usize] {
                neighbors.push((nx, ny));
            }
        }

        if neighbors.is_empty() {
            stack.pop();
            continue;
        }

        let (nx, ny) = neighbors[rng.gen_range(0..neighbors.len())];
        visited[(ny * w + nx) as usize] = true;
        let (wx, wy) = (cx + (nx - cx) / 2, cy + (ny - cy) / 2);
        cells[(wy * w + wx) as usize] = Cell::Path;
        stack.push((nx, ny));
    }
}

/// Open extra cells so the maze has cycles and therefore junctions worth
/// branching at. Picks even-coordinate interior cells and opens them when they
/// touch an existing path. Returns how many cells were opened.
fn open_loops<R: Rng + ?Sized>(cells: &mut [Cell], width: usize, height: usize, rng: &mut R) -> usize {
    let (span_x, span_y) = ((width - 4) / 2, (height - 4) / 2);
    if span_x == 0 || span_y == 0 {
        return 0;
    }

    let (w, h) = (width as isize, height as isize);
    let mut opened = 0;
    for _ in 0..(width * height / 30) {
        let x = 2 + rng.gen_range(0..span_x) as isize * 2;
        let y = 2 + rng.gen_range(0..span_y) as isize * 2;

        let touches_path = NEIGHBORS.iter().any(|&(dx, dy)| {
            let (nx, ny) = (x + dx, y + dy);
            nx >= 0 && nx < w && ny >= 0 && ny < h && cells[(ny * w + nx) as usize] == Cell::Path
        });
        let cell = &mut cells[(y * w + x) as usize];
        if touches_path && *cell != Cell::Path {
            *cell = Cell::Path;
            opened += 1;
        }
    }
    opened
}

/// Row-major scan of lattice path cells keeping the first strict maximum of
/// the Manhattan distance to (1, 1).
pub(crate) fn select_goal(cells: &[Cell], width: usize, height: usize) -> Position {
    let origin = Position::new(1, 1);
    let mut best = Position::new(width as i32 - 2, height as i32 - 2);
    let mut max_dist = 0;

    for y in (1..height - 1).step_by(2) {
        for x in (1..width - 1).step_by(2) {
            if cells[y * width + x] != Cell::Path {
                continue;
            }
            let candidate = Position::new(x as i32, y as i32);
            let dist = origin.manhattan(candidate);
            if dist > max_dist {
                max_dist = dist;
                best = candidate;
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn reachable_from_start(grid: &Grid) -> usize {
        let mut seen = vec![false; grid.width() * grid.height()];
        let mut queue = VecDeque::from([grid.start()]);
        seen[grid.width() + 1] = true;
        let mut count = 0;
        while let Some(pos) = queue.pop_front() {
            count += 1;
            for dir in crate::types::Direction::ALL {
                let next = pos.step(dir);
                if grid.is_walkable(next) {
                    let i = next.y as usize * grid.width() + next.x as usize;
                    if !seen[i] {
                        seen[i] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        count
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(31, 31, 42).unwrap();
        let b = generate(31, 31, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.start(), Position::new(1, 1));
        assert_eq!(a.cell(a.goal()), Some(Cell::Goal));
    }

    #[test]
    fn test_even_dimensions_round_up() {
        let grid = generate(20, 10, 7).unwrap();
        assert_eq!((grid.width(), grid.height()), (21, 11));
    }

    #[test]
    fn test_rejects_degenerate_dimensions() {
        assert!(matches!(generate(2, 31, 1), Err(ExplorerError::InvalidDimensions { .. })));
        assert!(matches!(generate(31, 5000, 1), Err(ExplorerError::InvalidDimensions { .. })));
        assert!(generate(4, 4, 1).is_ok());
    }

    #[test]
    fn test_border_is_wall_and_everything_connects() {
        let grid = generate(41, 25, 1234).unwrap();
        let (w, h) = (grid.width() as i32, grid.height() as i32);
        for x in 0..w {
            assert_eq!(grid.cell(Position::new(x, 0)), Some(Cell::Wall));
            assert_eq!(grid.cell(Position::new(x, h - 1)), Some(Cell::Wall));
        }
        for y in 0..h {
            assert_eq!(grid.cell(Position::new(0, y)), Some(Cell::Wall));
            assert_eq!(grid.cell(Position::new(w - 1, y)), Some(Cell::Wall));
        }
        assert_eq!(reachable_from_start(&grid), grid.walkable_count());
    }

    #[test]
    fn test_goal_tie_break_keeps_earliest_scanned_cell() {
        // 7x7 with every lattice cell open except the far corner (5, 5):
        // (5, 3) and (3, 5) tie at distance 6; row-major scan meets (5, 3) first.
        let (w, h) = (7, 7);
        let mut cells = vec![Cell::Wall; w * h];
        for y in (1..h - 1).step_by(2) {
            for x in (1..w - 1).step_by(2) {
                cells[y * w + x] = Cell::Path;
            }
        }
        cells[5 * w + 5] = Cell::Wall;
        cells[w + 1] = Cell::Start;
        assert_eq!(select_goal(&cells, w, h), Position::new(5, 3));

        cells[3 * w + 5] = Cell::Wall;
        assert_eq!(select_goal(&cells, w, h), Position::new(3, 5));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_generation_is_reproducible(width in 5usize..45, height in 5usize..45, seed in any::<u64>()) {
            let a = generate(width, height, seed).unwrap();
            let b = generate(width, height, seed).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.start(), Position::new(1, 1));
            prop_assert_eq!(a.cell(a.start()), Some(Cell::Start));
        }

        #[test]
        fn prop_goal_is_farthest_lattice_cell(width in 5usize..45, height in 5usize..45, seed in any::<u64>()) {
            let grid = generate(width, height, seed).unwrap();
            let goal_dist = grid.start().manhattan(grid.goal());
            prop_assert_eq!(grid.goal().x % 2, 1);
            prop_assert_eq!(grid.goal().y % 2, 1);
            for y in (1..grid.height() as i32 - 1).step_by(2) {
                for x in (1..grid.width() as i32 - 1).step_by(2) {
                    let pos = Position::new(x, y);
                    if grid.is_walkable(pos) {
                        prop_assert!(grid.start().manhattan(pos) <= goal_dist);
                    }
                }
            }
        }
    }
}
