//! Board generation: seeded mine placement, adjacency counts, and the
//! safe-first-click relocation.
//!
//! Placement is a Fisher–Yates shuffle of a fixed mine multiset driven by
//! a PRNG seeded from the board's token, so the same `(rows, cols, mines,
//! seed)` quadruple always reproduces the same layout. The module also
//! hosts the no-guess retry loop, which regenerates until the solver
//! certifies a layout as deducible from the chosen start.

use tracing::{debug, trace};

use crate::error::EngineError;
use crate::grid::Grid;
use crate::rng::EngineRng;
use crate::solver;

/// Generate a fresh board.
///
/// Exactly `mine_count` mines are scattered by an unbiased shuffle seeded
/// from `seed`; when no seed is given a random printable token of length
/// `ceil(rows*cols/5)` is derived and stored on the grid for later
/// reproduction. Every cell's `adjacent_mines` is the count of mines in
/// its clipped Moore neighborhood.
pub fn generate(
    rows: usize,
    cols: usize,
    mine_count: usize,
    seed: Option<String>,
) -> Result<Grid, EngineError> {
    if rows == 0 || cols == 0 || mine_count >= rows * cols {
        return Err(EngineError::InvalidConfiguration {
            rows,
            cols,
            mines: mine_count,
        });
    }

    let total = rows * cols;
    let seed = seed.unwrap_or_else(|| EngineRng::from_entropy().token(total.div_ceil(5)));
    let mut grid = Grid::blank(rows, cols, mine_count, seed);

    // Mine multiset: the first `mine_count` cells in row-major order...
    for index in 0..mine_count {
        grid.cell_mut_at(index).is_mine = true;
    }

    // ...scattered by a seeded Fisher–Yates shuffle of the mine flags.
    let mut rng = EngineRng::from_token(grid.seed());
    for i in (1..total).rev() {
        let j = rng.pick(i + 1);
        let mine_i = grid.cell_at(i).is_mine;
        let mine_j = grid.cell_at(j).is_mine;
        grid.cell_mut_at(i).is_mine = mine_j;
        grid.cell_mut_at(j).is_mine = mine_i;
    }

    count_adjacency(&mut grid);

    debug!(
        rows,
        cols,
        mines = mine_count,
        seed = grid.seed(),
        "board generated"
    );
    Ok(grid)
}

/// Recompute `adjacent_mines` for the whole grid from scratch.
fn count_adjacency(grid: &mut Grid) {
    let total = grid.cell_count();
    for index in 0..total {
        grid.cell_mut_at(index).adjacent_mines = 0;
    }
    for index in 0..total {
        if !grid.cell_at(index).is_mine {
            continue;
        }
        let (row, col) = grid.position_of(index);
        let neighbors: Vec<usize> = grid.neighbors(row, col).collect();
        for neighbor in neighbors {
            grid.cell_mut_at(neighbor).adjacent_mines += 1;
        }
    }
}

/// Move the mine at `(row, col)`, if any, to the first non-mine cell in
/// row-major scan order, patching `adjacent_mines` incrementally around
/// both neighborhoods (at most 16 cells touched). `mine_count` is
/// unchanged.
///
/// Invoked at most once per board, when the very first reveal of a fresh
/// board would otherwise hit a mine. Returns the flat index the mine
/// moved to.
pub fn relocate_mine_away_from(grid: &mut Grid, row: usize, col: usize) -> Option<usize> {
    let source = grid.index_of(row, col);
    if !grid.cell_at(source).is_mine {
        return None;
    }

    // mine_count < rows*cols, so a free cell always exists.
    let target = (0..grid.cell_count()).find(|&index| !grid.cell_at(index).is_mine)?;

    grid.cell_mut_at(target).is_mine = true;
    grid.cell_mut_at(source).is_mine = false;

    let (target_row, target_col) = grid.position_of(target);
    let gained: Vec<usize> = grid.neighbors(target_row, target_col).collect();
    for neighbor in gained {
        grid.cell_mut_at(neighbor).adjacent_mines += 1;
    }
    let lost: Vec<usize> = grid.neighbors(row, col).collect();
    for neighbor in lost {
        grid.cell_mut_at(neighbor).adjacent_mines -= 1;
    }

    trace!(from = source, to = target, "first-move mine relocated");
    Some(target)
}

/// Result of a no-guess generation run.
pub struct NoGuessBoard {
    /// The last board generated. Certified when `solvable` is true.
    pub grid: Grid,
    /// How many layouts were tried.
    pub attempts: u32,
    /// Whether a fully deducible layout was found within `max_attempts`.
    pub solvable: bool,
}

/// Regenerate boards until one is certified solvable by pure deduction
/// from `(start_row, start_col)`, or `max_attempts` is exhausted.
///
/// Each attempt uses a fresh random seed. On exhaustion the last attempt
/// is returned as a best effort with `solvable == false`. This is the
/// performance-sensitive path: solver cost scales with grid area, and
/// sparse boards can take many rounds to produce a zero opening at the
/// start cell.
pub fn generate_no_guess(
    rows: usize,
    cols: usize,
    mine_count: usize,
    start_row: usize,
    start_col: usize,
    max_attempts: u32,
) -> Result<NoGuessBoard, EngineError> {
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let mut grid = generate(rows, cols, mine_count, None)?;
        grid.check_bounds(start_row, start_col)?;

        if solver::is_solvable_from(&mut grid, start_row, start_col, true)? {
            debug!(attempts, "no-guess board found");
            return Ok(NoGuessBoard {
                grid,
                attempts,
                solvable: true,
            });
        }
        if attempts >= max_attempts {
            debug!(attempts, "no-guess generation gave up");
            return Ok(NoGuessBoard {
                grid,
                attempts,
                solvable: false,
            });
        }
    }
}

/// Test-only constructor: a grid with mines at exactly the given flat
/// indices and adjacency counts to match.
#[cfg(test)]
pub(crate) fn grid_from_layout(rows: usize, cols: usize, mine_indices: &[usize]) -> Grid {
    let mut grid = Grid::blank(rows, cols, mine_indices.len(), "layout".into());
    for &index in mine_indices {
        grid.cell_mut_at(index).is_mine = true;
    }
    count_adjacency(&mut grid);
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_adjacency_invariant(grid: &Grid) {
        for cell in grid.cells() {
            let expected = grid
                .neighbors(cell.row, cell.col)
                .filter(|&n| grid.cell_at(n).is_mine)
                .count();
            assert_eq!(
                cell.adjacent_mines as usize, expected,
                "adjacency mismatch at ({}, {})",
                cell.row, cell.col
            );
        }
    }

    #[test]
    fn test_generate_mine_count() {
        let grid = generate(16, 30, 99, Some("fixed".into())).unwrap();
        assert_eq!(grid.cells().filter(|c| c.is_mine).count(), 99);
    }

    #[test]
    fn test_generate_adjacency_invariant() {
        let grid = generate(9, 9, 10, Some("adjacency".into())).unwrap();
        assert_adjacency_invariant(&grid);
    }

    #[test]
    fn test_generate_seeded_reproducible() {
        let a = generate(8, 8, 10, Some("replay".into())).unwrap();
        let b = generate(8, 8, 10, Some("replay".into())).unwrap();
        let mines_a: Vec<usize> = a.cells().filter(|c| c.is_mine).map(|c| c.index).collect();
        let mines_b: Vec<usize> = b.cells().filter(|c| c.is_mine).map(|c| c.index).collect();
        assert_eq!(mines_a, mines_b);
    }

    #[test]
    fn test_generate_derives_seed_token() {
        let grid = generate(5, 5, 3, None).unwrap();
        // ceil(25 / 5) printable characters.
        assert_eq!(grid.seed().len(), 5);
        assert!(grid.seed().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_rejects_bad_configuration() {
        assert!(matches!(
            generate(0, 5, 1, None),
            Err(EngineError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            generate(5, 0, 1, None),
            Err(EngineError::InvalidConfiguration { .. })
        ));
        assert!(matches!(
            generate(3, 3, 9, None),
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_generate_zero_mines_allowed() {
        let grid = generate(4, 4, 0, Some("calm".into())).unwrap();
        assert!(grid.cells().all(|c| !c.is_mine && c.adjacent_mines == 0));
    }

    #[test]
    fn test_relocate_moves_to_first_free_cell() {
        let mut grid = grid_from_layout(3, 3, &[4]);
        let target = relocate_mine_away_from(&mut grid, 1, 1);
        assert_eq!(target, Some(0));
        assert!(!grid.cell(1, 1).is_mine);
        assert!(grid.cell(0, 0).is_mine);
        assert_eq!(grid.cells().filter(|c| c.is_mine).count(), 1);
        assert_adjacency_invariant(&grid);
    }

    #[test]
    fn test_relocate_noop_on_non_mine() {
        let mut grid = grid_from_layout(3, 3, &[4]);
        let before = grid.clone();
        assert_eq!(relocate_mine_away_from(&mut grid, 0, 0), None);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_relocate_adjacent_source_and_target() {
        // Mine at (0, 1) relocates to (0, 0): the two neighborhoods
        // overlap, which is where incremental patching goes wrong first.
        let mut grid = grid_from_layout(3, 3, &[1]);
        assert_eq!(relocate_mine_away_from(&mut grid, 0, 1), Some(0));
        assert_adjacency_invariant(&grid);
    }

    #[test]
    fn test_no_guess_trivial_board_first_try() {
        // No mines: any start floods the whole board.
        let result = generate_no_guess(4, 4, 0, 2, 2, 10).unwrap();
        assert!(result.solvable);
        assert_eq!(result.attempts, 1);
    }

    #[test]
    fn test_no_guess_gives_up_when_no_zero_start_exists() {
        // 2x2 with one mine: every cell touches the mine, so no layout
        // has a zero opening and certification always fails.
        let result = generate_no_guess(2, 2, 1, 0, 0, 7).unwrap();
        assert!(!result.solvable);
        assert_eq!(result.attempts, 7);
    }
}
