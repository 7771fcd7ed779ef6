//! Reveal mechanics: opening cells, zero-region flooding, chord
//! open/flag, dry-run probing, and the game-state queries.
//!
//! The board moves through New (nothing open), Playing (something open,
//! no mine open, safe cells remain) and Over, which is either Cleared
//! (every safe cell open, no mine open) or Lost (an open mine).
//! Transitions happen only through [`open`].

use std::collections::VecDeque;

use crate::board::relocate_mine_away_from;
use crate::error::EngineError;
use crate::grid::Grid;

/// Caller-chosen behavior switches, passed explicitly instead of living
/// in shared process state.
///
/// `no_guess` is consumed by board setup (regenerate until certified
/// solvable); `auto_open`/`auto_flag` drive the chord branches of
/// [`open`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GameOptions {
    pub auto_open: bool,
    pub auto_flag: bool,
    pub no_guess: bool,
}

/// Closed/flagged/unflagged split of a cell's neighborhood.
pub(crate) struct NeighborSplit {
    pub closed: usize,
    pub flagged: usize,
    pub unflagged: Vec<usize>,
}

pub(crate) fn split_neighbors(grid: &Grid, index: usize) -> NeighborSplit {
    let (row, col) = grid.position_of(index);
    let mut split = NeighborSplit {
        closed: 0,
        flagged: 0,
        unflagged: Vec::new(),
    };
    for neighbor in grid.neighbors(row, col) {
        let cell = grid.cell_at(neighbor);
        if cell.is_open {
            continue;
        }
        split.closed += 1;
        if cell.is_flag {
            split.flagged += 1;
        } else {
            split.unflagged.push(neighbor);
        }
    }
    split
}

/// Collect the zero-region anchored at `(row, col)`: breadth-first over
/// neighbors, expanding only through cells with no adjacent mines.
///
/// Non-zero cells on the rim are included but not expanded; flagged
/// cells are skipped unless `include_flagged`. The anchor is always part
/// of the result. Idempotent: the same anchor on the same board state
/// always yields the same set.
pub fn flood_zero_region(
    grid: &Grid,
    row: usize,
    col: usize,
    include_flagged: bool,
) -> Vec<usize> {
    let anchor = grid.index_of(row, col);
    let mut visited = vec![false; grid.cell_count()];
    let mut region = Vec::new();
    let mut frontier = VecDeque::from([anchor]);
    visited[anchor] = true;

    while let Some(index) = frontier.pop_front() {
        region.push(index);

        let cell = grid.cell_at(index);
        // A mined anchor never spreads, even when nothing surrounds it.
        if cell.adjacent_mines != 0 || cell.is_mine {
            continue;
        }
        for neighbor in grid.neighbors(cell.row, cell.col) {
            if visited[neighbor] {
                continue;
            }
            if include_flagged || !grid.cell_at(neighbor).is_flag {
                visited[neighbor] = true;
                frontier.push_back(neighbor);
            }
        }
    }

    region
}

/// Open every still-closed cell of the zero-region anchored at the given
/// cell, appending the newly opened indices to `affected`.
pub(crate) fn open_zone(grid: &mut Grid, row: usize, col: usize, affected: &mut Vec<usize>) {
    for index in flood_zero_region(grid, row, col, false) {
        if !grid.cell_at(index).is_open {
            grid.cell_mut_at(index).is_open = true;
            affected.push(index);
        }
    }
}

/// Reveal a cell, or chord an already-open numbered cell.
///
/// A closed target is flood-opened; if this is the qualifying first move
/// of a fresh board and the target hides a mine, the mine is relocated
/// first so the opening is always safe (`first_move_check` is downgraded
/// to "board is new"). An open numbered target is chorded when enabled:
/// `auto_open` flood-opens the unflagged neighbors once the flagged
/// neighbors account for the full count, `auto_flag` flags them once the
/// closed neighbors do.
///
/// Returns the indices that changed (opened and/or flagged), possibly
/// empty.
pub fn open(
    grid: &mut Grid,
    row: usize,
    col: usize,
    first_move_check: bool,
    options: &GameOptions,
) -> Result<Vec<usize>, EngineError> {
    grid.check_bounds(row, col)?;
    let first_move = first_move_check && grid.is_new();
    let index = grid.index_of(row, col);
    let mut affected = Vec::new();

    if !grid.cell_at(index).is_open {
        if grid.cell_at(index).is_mine && first_move {
            relocate_mine_away_from(grid, row, col);
        }
        open_zone(grid, row, col, &mut affected);
    } else if grid.cell_at(index).adjacent_mines != 0 && (options.auto_open || options.auto_flag) {
        let split = split_neighbors(grid, index);
        let mines = grid.cell_at(index).adjacent_mines as usize;

        if options.auto_open && mines == split.flagged {
            for &neighbor in &split.unflagged {
                let (nr, nc) = grid.position_of(neighbor);
                open_zone(grid, nr, nc, &mut affected);
            }
        }
        if options.auto_flag && mines == split.closed {
            for &neighbor in &split.unflagged {
                grid.cell_mut_at(neighbor).is_flag = true;
                affected.push(neighbor);
            }
        }
    }

    Ok(affected)
}

/// Dry-run counterpart of [`open`]: would it change anything here?
///
/// Pure on both branches. Closed cells are always actionable; an open
/// numbered cell is actionable only when an enabled chord rule fires
/// with at least one unflagged closed neighbor.
pub fn probe(
    grid: &Grid,
    row: usize,
    col: usize,
    options: &GameOptions,
) -> Result<bool, EngineError> {
    grid.check_bounds(row, col)?;
    let cell = grid.cell(row, col);

    if !cell.is_open {
        return Ok(true);
    }
    if cell.adjacent_mines == 0 || !(options.auto_open || options.auto_flag) {
        return Ok(false);
    }

    let split = split_neighbors(grid, cell.index);
    if split.unflagged.is_empty() {
        return Ok(false);
    }
    let mines = cell.adjacent_mines as usize;
    Ok((options.auto_open && mines == split.flagged)
        || (options.auto_flag && mines == split.closed))
}

/// Toggle the flag on a closed cell.
///
/// Open cells are never flagged; setting a new flag is refused once the
/// flag budget (one per mine) is spent. Returns whether anything
/// changed.
pub fn toggle_flag(grid: &mut Grid, row: usize, col: usize) -> Result<bool, EngineError> {
    grid.check_bounds(row, col)?;
    let index = grid.index_of(row, col);
    if grid.cell_at(index).is_open {
        return Ok(false);
    }
    if grid.cell_at(index).is_flag {
        grid.cell_mut_at(index).is_flag = false;
        Ok(true)
    } else if grid.flagged_count() < grid.mine_count() {
        grid.cell_mut_at(index).is_flag = true;
        Ok(true)
    } else {
        Ok(false)
    }
}

// ─── Game-state queries ─────────────────────────────────────────────────────

impl Grid {
    /// No cell has been opened yet.
    pub fn is_new(&self) -> bool {
        self.cells().all(|cell| !cell.is_open)
    }

    /// At least one safe cell is open, no mine is open, and at least one
    /// safe cell remains closed.
    pub fn is_playing(&self) -> bool {
        let mut found_open = false;
        let mut found_closed_safe = false;
        for cell in self.cells() {
            if cell.is_open {
                if cell.is_mine {
                    return false;
                }
                found_open = true;
            } else if !cell.is_mine {
                found_closed_safe = true;
            }
        }
        found_open && found_closed_safe
    }

    /// A mine is open, or no closed safe cell remains.
    pub fn is_over(&self) -> bool {
        let mut found_closed_safe = false;
        for cell in self.cells() {
            if cell.is_open && cell.is_mine {
                return true;
            }
            if !cell.is_open && !cell.is_mine {
                found_closed_safe = true;
            }
        }
        !found_closed_safe
    }

    /// Every safe cell is open and every mine is closed.
    pub fn is_cleared(&self) -> bool {
        self.cells().all(|cell| cell.is_open != cell.is_mine)
    }

    /// At least one mine is open.
    pub fn is_lost(&self) -> bool {
        self.cells().any(|cell| cell.is_open && cell.is_mine)
    }

    /// Mines not yet accounted for by flags.
    pub fn remaining_mines(&self) -> usize {
        self.mine_count().saturating_sub(self.flagged_count())
    }
}
