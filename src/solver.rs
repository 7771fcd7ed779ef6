//! Constraint solver: no-guess solvability certification and hints.
//!
//! Both entry points share one deduction core, run in rounds until a
//! fixed point:
//! 1. trivial flood of interrupted zero-regions,
//! 2. direct chord deductions on each numbered frontier cell,
//! 3. linked-group propagation (subset "shift" and disjoint "add"
//!    derivations, then exact-count accounting per frontier cell),
//! 4. global mine-count closure as a last resort.
//!
//! [`is_solvable_from`] applies deductions to the grid and reports
//! whether the frontier fully resolves; [`get_hint`] runs one pass of the
//! same rules against the live board and returns the first move a rule
//! would make, without mutating anything. Scan order is ascending flat
//! index everywhere and derived groups are appended in derivation order,
//! so both results are deterministic for a given board state.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::error::EngineError;
use crate::grid::Grid;
use crate::reveal::{open, open_zone, split_neighbors, GameOptions};

/// What a hint asks the player to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintAction {
    Open,
    Flag,
}

/// A single deducible move on the live board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hint {
    pub row: usize,
    pub col: usize,
    pub action: HintAction,
}

/// An exact-count constraint: exactly `mines` mines lie among `indices`.
///
/// Value-typed and deduplicated by set+count equality; instances live
/// only for the duration of one solver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LinkedGroup {
    indices: BTreeSet<usize>,
    mines: usize,
}

// ─── Deduction core ─────────────────────────────────────────────────────────

/// Open numbered cells that still border at least one unknown
/// (closed, unflagged) cell, in ascending flat order.
fn active_cells(grid: &Grid) -> Vec<usize> {
    (0..grid.cell_count())
        .filter(|&index| {
            let cell = grid.cell_at(index);
            cell.is_open
                && cell.adjacent_mines != 0
                && !split_neighbors(grid, index).unflagged.is_empty()
        })
        .collect()
}

/// Re-flood zero-regions whose spread was interrupted (a since-removed
/// flag, a deduced opening next to an old region). Every closed neighbor
/// of an open zero cell is safe by definition.
fn flood_step(grid: &mut Grid) -> bool {
    let mut affected = Vec::new();
    for index in 0..grid.cell_count() {
        let cell = *grid.cell_at(index);
        if !cell.is_open || cell.adjacent_mines != 0 || cell.is_mine {
            continue;
        }
        let interrupted = grid.neighbors(cell.row, cell.col).any(|n| {
            let neighbor = grid.cell_at(n);
            !neighbor.is_open && !neighbor.is_flag
        });
        if interrupted {
            open_zone(grid, cell.row, cell.col, &mut affected);
        }
    }
    !affected.is_empty()
}

/// Direct chord deductions, collecting a [`LinkedGroup`] for every
/// frontier cell that resolves neither way.
fn chord_step(grid: &mut Grid, active: &[usize]) -> (bool, Vec<LinkedGroup>) {
    let mut progress = false;
    let mut groups: Vec<LinkedGroup> = Vec::new();

    for &index in active {
        let split = split_neighbors(grid, index);
        if split.unflagged.is_empty() {
            // Resolved by an earlier deduction in this same pass.
            continue;
        }
        let mines = grid.cell_at(index).adjacent_mines as usize;

        if mines == split.flagged {
            // Flags already account for everything: the rest is safe.
            let mut opened = Vec::new();
            for &neighbor in &split.unflagged {
                let (row, col) = grid.position_of(neighbor);
                open_zone(grid, row, col, &mut opened);
            }
            progress |= !opened.is_empty();
        } else if mines == split.closed {
            // Every closed neighbor must be a mine.
            for &neighbor in &split.unflagged {
                grid.cell_mut_at(neighbor).is_flag = true;
            }
            progress = true;
        } else if mines > split.flagged {
            let group = LinkedGroup {
                indices: split.unflagged.iter().copied().collect(),
                mines: mines - split.flagged,
            };
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
    }

    (progress, groups)
}

/// Grow the group list to its fixed point.
///
/// "Shift": when a known group sits strictly inside a frontier cell's
/// unknown set, the remainder forms a group with the leftover count.
/// "Add": two groups over disjoint cells sum into a combined group.
/// Derived groups append in derivation order and are deduplicated by
/// exact set+count equality, so the list order is reproducible.
fn expand_groups(grid: &Grid, active: &[usize], groups: &mut Vec<LinkedGroup>) {
    loop {
        let mut appended = false;

        for &index in active {
            let split = split_neighbors(grid, index);
            let unknown: BTreeSet<usize> = split.unflagged.iter().copied().collect();
            if unknown.is_empty() {
                continue;
            }
            let mines = grid.cell_at(index).adjacent_mines as usize;

            let mut derived = Vec::new();
            for group in groups.iter() {
                if group.indices.len() >= unknown.len() || !group.indices.is_subset(&unknown) {
                    continue;
                }
                if mines <= split.flagged + group.mines {
                    continue;
                }
                derived.push(LinkedGroup {
                    indices: unknown.difference(&group.indices).copied().collect(),
                    mines: mines - split.flagged - group.mines,
                });
            }
            for group in derived {
                if !groups.contains(&group) {
                    groups.push(group);
                    appended = true;
                }
            }
        }

        let known = groups.len();
        let mut sums = Vec::new();
        for a in 0..known {
            for b in (a + 1)..known {
                if groups[a].indices.is_disjoint(&groups[b].indices) {
                    sums.push(LinkedGroup {
                        indices: groups[a].indices.union(&groups[b].indices).copied().collect(),
                        mines: groups[a].mines + groups[b].mines,
                    });
                }
            }
        }
        for group in sums {
            if !groups.contains(&group) {
                groups.push(group);
                appended = true;
            }
        }

        if !appended {
            break;
        }
    }
}

/// Exact-count accounting of each frontier cell against each group: when
/// a contained group plus the flags pins the remainder to all-safe or
/// all-mines, apply it. First firing deduction wins; the caller loops.
fn group_step(grid: &mut Grid, active: &[usize], groups: &[LinkedGroup]) -> bool {
    for &index in active {
        let split = split_neighbors(grid, index);
        let unknown: BTreeSet<usize> = split.unflagged.iter().copied().collect();
        if unknown.is_empty() {
            continue;
        }
        let mines = grid.cell_at(index).adjacent_mines as usize;

        for group in groups {
            if !group.indices.is_subset(&unknown) {
                continue;
            }
            let rest: Vec<usize> = unknown.difference(&group.indices).copied().collect();
            if rest.is_empty() {
                continue;
            }
            if mines == split.flagged + group.mines {
                let mut affected = Vec::new();
                for &neighbor in &rest {
                    let (row, col) = grid.position_of(neighbor);
                    open_zone(grid, row, col, &mut affected);
                }
                trace!(cell = index, safe = rest.len(), "linked group opened remainder");
                return true;
            }
            if mines == split.flagged + group.mines + rest.len() {
                for &neighbor in &rest {
                    grid.cell_mut_at(neighbor).is_flag = true;
                }
                trace!(cell = index, mined = rest.len(), "linked group flagged remainder");
                return true;
            }
        }
    }
    false
}

/// Whole-board mine arithmetic, tried only when nothing local fires.
fn global_step(grid: &mut Grid, groups: &[LinkedGroup]) -> bool {
    let flagged = grid.flagged_count();
    let closed_unflagged: Vec<usize> = grid
        .cells()
        .filter(|cell| !cell.is_open && !cell.is_flag)
        .map(|cell| cell.index)
        .collect();
    if closed_unflagged.is_empty() {
        return false;
    }

    if flagged == grid.mine_count() {
        // Every mine is flagged: the rest of the board is safe.
        let mut affected = Vec::new();
        for &index in &closed_unflagged {
            let (row, col) = grid.position_of(index);
            open_zone(grid, row, col, &mut affected);
        }
        debug!(opened = affected.len(), "global closure: all mines flagged");
        return true;
    }

    let remaining = grid.mine_count().saturating_sub(flagged);
    for group in groups {
        if group.mines != remaining {
            continue;
        }
        // This group holds every unflagged mine, so everything outside
        // its cells is safe.
        let outside: Vec<usize> = closed_unflagged
            .iter()
            .copied()
            .filter(|index| !group.indices.contains(index))
            .collect();
        if outside.is_empty() {
            continue;
        }
        let mut affected = Vec::new();
        for &index in &outside {
            let (row, col) = grid.position_of(index);
            open_zone(grid, row, col, &mut affected);
        }
        debug!(
            opened = affected.len(),
            pinned = group.indices.len(),
            "global closure: group pins remaining mines"
        );
        return true;
    }
    false
}

/// One full deduction round. Returns whether anything changed.
fn deduce_round(grid: &mut Grid) -> bool {
    if flood_step(grid) {
        return true;
    }
    let active = active_cells(grid);
    let (progress, mut groups) = chord_step(grid, &active);
    if progress {
        return true;
    }
    expand_groups(grid, &active, &mut groups);
    if group_step(grid, &active, &groups) {
        return true;
    }
    global_step(grid, &groups)
}

// ─── Solvability certification ──────────────────────────────────────────────

/// Decide whether the whole safe region is deducible without guessing
/// when play starts at `(row, col)`.
///
/// The start is opened as a first move, with the usual safe-first-click
/// relocation on a fresh board. A mined start on a board already in play
/// fails immediately without touching the grid; a nonzero start fails
/// too, since the canonical no-guess opening is a zero cell. Otherwise
/// the deduction core runs to a fixed point and the board is solvable iff
/// no numbered frontier cell is left with an unknown neighbor.
///
/// With `restore`, every open/flag performed by the simulation is
/// reverted; a first-move mine relocation is deliberately left applied,
/// so a later real first click at the same cell replays identically.
pub fn is_solvable_from(
    grid: &mut Grid,
    row: usize,
    col: usize,
    restore: bool,
) -> Result<bool, EngineError> {
    grid.check_bounds(row, col)?;

    if grid.cell(row, col).is_mine && !grid.is_new() {
        return Ok(false);
    }

    let snapshot: Vec<(bool, bool)> = grid
        .cells()
        .map(|cell| (cell.is_open, cell.is_flag))
        .collect();

    open(grid, row, col, true, &GameOptions::default())?;

    if grid.cell(row, col).adjacent_mines != 0 {
        if restore {
            restore_snapshot(grid, &snapshot);
        }
        return Ok(false);
    }

    let mut rounds = 0u32;
    while deduce_round(grid) {
        rounds += 1;
    }
    let solvable = active_cells(grid).is_empty();
    debug!(rounds, solvable, "deduction fixed point reached");

    if restore {
        restore_snapshot(grid, &snapshot);
    }
    Ok(solvable)
}

fn restore_snapshot(grid: &mut Grid, snapshot: &[(bool, bool)]) {
    for (index, &(is_open, is_flag)) in snapshot.iter().enumerate() {
        let cell = grid.cell_mut_at(index);
        cell.is_open = is_open;
        cell.is_flag = is_flag;
    }
}

// ─── Hints ──────────────────────────────────────────────────────────────────

/// Run one pass of the deduction core against the live board and return
/// the first move it would make, without mutating anything.
///
/// `None` when the board is untouched or no rule currently fires.
pub fn get_hint(grid: &Grid) -> Option<Hint> {
    if grid.is_new() {
        return None;
    }

    // Interrupted zero-regions: any closed neighbor of an open zero cell
    // is safe.
    for index in 0..grid.cell_count() {
        let cell = grid.cell_at(index);
        if !cell.is_open || cell.adjacent_mines != 0 || cell.is_mine {
            continue;
        }
        for neighbor in grid.neighbors(cell.row, cell.col) {
            let candidate = grid.cell_at(neighbor);
            if !candidate.is_open && !candidate.is_flag {
                return Some(hint_at(grid, neighbor, HintAction::Open));
            }
        }
    }

    let active = active_cells(grid);
    let mut groups: Vec<LinkedGroup> = Vec::new();

    // Direct chord deductions.
    for &index in &active {
        let split = split_neighbors(grid, index);
        let mines = grid.cell_at(index).adjacent_mines as usize;
        if mines == split.flagged {
            return Some(hint_at(grid, split.unflagged[0], HintAction::Open));
        }
        if mines == split.closed {
            return Some(hint_at(grid, split.unflagged[0], HintAction::Flag));
        }
        if mines > split.flagged {
            let group = LinkedGroup {
                indices: split.unflagged.iter().copied().collect(),
                mines: mines - split.flagged,
            };
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
    }

    // Linked-group accounting.
    expand_groups(grid, &active, &mut groups);
    for &index in &active {
        let split = split_neighbors(grid, index);
        let unknown: BTreeSet<usize> = split.unflagged.iter().copied().collect();
        let mines = grid.cell_at(index).adjacent_mines as usize;
        for group in &groups {
            if !group.indices.is_subset(&unknown) {
                continue;
            }
            let rest: Vec<usize> = unknown.difference(&group.indices).copied().collect();
            if rest.is_empty() {
                continue;
            }
            if mines == split.flagged + group.mines {
                return Some(hint_at(grid, rest[0], HintAction::Open));
            }
            if mines == split.flagged + group.mines + rest.len() {
                return Some(hint_at(grid, rest[0], HintAction::Flag));
            }
        }
    }

    // Global closure.
    let flagged = grid.flagged_count();
    let closed_unflagged: Vec<usize> = grid
        .cells()
        .filter(|cell| !cell.is_open && !cell.is_flag)
        .map(|cell| cell.index)
        .collect();
    if !closed_unflagged.is_empty() {
        if flagged == grid.mine_count() {
            return Some(hint_at(grid, closed_unflagged[0], HintAction::Open));
        }
        let remaining = grid.mine_count().saturating_sub(flagged);
        for group in &groups {
            if group.mines != remaining {
                continue;
            }
            if let Some(&outside) = closed_unflagged
                .iter()
                .find(|index| !group.indices.contains(index))
            {
                return Some(hint_at(grid, outside, HintAction::Open));
            }
        }
    }

    None
}

fn hint_at(grid: &Grid, index: usize, action: HintAction) -> Hint {
    let (row, col) = grid.position_of(index);
    Hint { row, col, action }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{generate_no_guess, grid_from_layout};
    use crate::reveal::toggle_flag;

    #[test]
    fn test_solvable_single_corner_mine() {
        let mut grid = grid_from_layout(5, 5, &[24]);
        assert!(is_solvable_from(&mut grid, 0, 0, false).unwrap());
        // Without restore the solved position is left on the board.
        assert!(grid.is_cleared());
        assert!(grid.cell(4, 4).is_flag);
    }

    #[test]
    fn test_solvable_restores_board() {
        let mut grid = grid_from_layout(5, 5, &[24]);
        let before = grid.clone();
        assert!(is_solvable_from(&mut grid, 0, 0, true).unwrap());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_mined_start_on_played_board_fails_without_mutation() {
        let mut grid = grid_from_layout(3, 3, &[0]);
        open(&mut grid, 2, 2, true, &GameOptions::default()).unwrap();
        let before = grid.clone();
        assert!(!is_solvable_from(&mut grid, 0, 0, true).unwrap());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_nonzero_start_fails() {
        let mut grid = grid_from_layout(3, 3, &[4]);
        let before = grid.clone();
        // Every cell borders the center mine; no zero opening exists.
        assert!(!is_solvable_from(&mut grid, 0, 0, true).unwrap());
        assert_eq!(grid, before);
    }

    #[test]
    fn test_first_move_relocation_survives_restore() {
        let mut grid = grid_from_layout(3, 3, &[0]);
        // Fresh board, mined start: the first-move relocation fires and
        // stays applied even though opens are restored.
        let solvable = is_solvable_from(&mut grid, 0, 0, true).unwrap();
        assert!(!grid.cell(0, 0).is_mine);
        assert!(grid.cell(0, 1).is_mine);
        assert!(grid.is_new());
        // (0, 0) now borders the relocated mine, so the start is nonzero.
        assert!(!solvable);
    }

    #[test]
    fn test_global_closure_opens_sealed_cells() {
        // 1x5 line, mine in the middle: chording flags the mine, then
        // only the global count can prove the far side safe.
        let mut grid = grid_from_layout(1, 5, &[2]);
        assert!(is_solvable_from(&mut grid, 0, 0, false).unwrap());
        assert!(grid.is_cleared());
        assert!(grid.cell(0, 2).is_flag);
        assert!(grid.cell(0, 4).is_open);
    }

    #[test]
    fn test_hint_none_on_new_board() {
        let grid = grid_from_layout(3, 3, &[0]);
        assert!(get_hint(&grid).is_none());
    }

    #[test]
    fn test_hint_direct_chord_flag() {
        let mut grid = grid_from_layout(3, 3, &[0]);
        open(&mut grid, 2, 2, true, &GameOptions::default()).unwrap();
        let hint = get_hint(&grid).unwrap();
        assert_eq!(
            hint,
            Hint {
                row: 0,
                col: 0,
                action: HintAction::Flag
            }
        );
    }

    #[test]
    fn test_hint_none_when_stuck() {
        let mut grid = grid_from_layout(2, 2, &[3]);
        open(&mut grid, 0, 0, false, &GameOptions::default()).unwrap();
        // One mine among three unknowns: nothing is deducible.
        assert!(get_hint(&grid).is_none());
    }

    #[test]
    fn test_hint_is_pure_and_deterministic() {
        let mut grid = grid_from_layout(3, 3, &[0]);
        open(&mut grid, 2, 2, true, &GameOptions::default()).unwrap();
        let before = grid.clone();
        let first = get_hint(&grid);
        let second = get_hint(&grid);
        assert_eq!(first, second);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_hint_links_groups_in_one_two_one() {
        // Classic 1-2-1 along the top row; the mines sit under the 1s.
        let mut grid = grid_from_layout(2, 3, &[3, 5]);
        for index in 0..3 {
            grid.cell_mut_at(index).is_open = true;
        }
        // Direct chording is stuck, but subtracting the side groups from
        // the middle "2" proves the cell under it safe.
        let hint = get_hint(&grid).unwrap();
        assert_eq!(
            hint,
            Hint {
                row: 1,
                col: 1,
                action: HintAction::Open
            }
        );
    }

    #[test]
    fn test_hint_reflows_interrupted_zero_region() {
        let mut grid = grid_from_layout(5, 5, &[24]);
        toggle_flag(&mut grid, 2, 2).unwrap();
        open(&mut grid, 0, 0, true, &GameOptions::default()).unwrap();
        // The flag blocked the flood around (2, 2); dropping it leaves a
        // closed safe cell inside an open zero-region.
        toggle_flag(&mut grid, 2, 2).unwrap();
        let hint = get_hint(&grid).unwrap();
        assert_eq!(
            hint,
            Hint {
                row: 2,
                col: 2,
                action: HintAction::Open
            }
        );
    }

    #[test]
    fn test_hint_global_closure_from_pinning_group() {
        // Mine at (0, 1); the open "1"s at (0, 2) and (1, 2) see the
        // unknown pair {(0, 1), (1, 1)}, which accounts for the only
        // mine, so the sealed cells (0, 0) and (1, 0) must be safe.
        let mut grid = grid_from_layout(2, 5, &[1]);
        for index in [2, 3, 4, 7, 8, 9] {
            grid.cell_mut_at(index).is_open = true;
        }
        let hint = get_hint(&grid).unwrap();
        assert_eq!(
            hint,
            Hint {
                row: 0,
                col: 0,
                action: HintAction::Open
            }
        );
    }

    #[test]
    fn test_certified_board_replays_by_hints_alone() {
        let result = generate_no_guess(9, 9, 10, 4, 4, 500).unwrap();
        assert!(result.solvable, "no solvable 9x9 layout in 500 attempts");

        let mut grid = result.grid;
        let options = GameOptions::default();
        open(&mut grid, 4, 4, true, &options).unwrap();

        for _ in 0..200 {
            if grid.is_cleared() {
                break;
            }
            let hint = get_hint(&grid).expect("certified board ran out of deductions");
            match hint.action {
                HintAction::Open => {
                    open(&mut grid, hint.row, hint.col, false, &options).unwrap();
                }
                HintAction::Flag => {
                    toggle_flag(&mut grid, hint.row, hint.col).unwrap();
                }
            }
            assert!(!grid.is_lost());
        }
        assert!(grid.is_cleared());
    }
}
