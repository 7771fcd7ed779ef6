//! Save/load codec.
//!
//! The persisted shape is deliberately tiny: dimensions, mine count, the
//! seed token, and the sorted open/flag index lists. Loading re-runs
//! generation from the seed (same shuffle, same layout) and replays the
//! index lists on top.

use serde::{Deserialize, Serialize};

use crate::board::generate;
use crate::error::EngineError;
use crate::grid::Grid;

/// The one externally persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveState {
    pub rows: usize,
    pub cols: usize,
    pub mines: usize,
    pub seed: String,
    /// Flat row-major indices of open cells, ascending.
    pub open: Vec<usize>,
    /// Flat row-major indices of flagged cells, ascending.
    pub flags: Vec<usize>,
}

impl SaveState {
    /// Snapshot a grid into its persistable form.
    pub fn capture(grid: &Grid) -> Self {
        Self {
            rows: grid.rows(),
            cols: grid.cols(),
            mines: grid.mine_count(),
            seed: grid.seed().to_string(),
            open: grid
                .cells()
                .filter(|cell| cell.is_open)
                .map(|cell| cell.index)
                .collect(),
            flags: grid
                .cells()
                .filter(|cell| cell.is_flag)
                .map(|cell| cell.index)
                .collect(),
        }
    }

    /// Rebuild the grid this state was captured from.
    ///
    /// The mine layout comes out identical because generation re-runs the
    /// same seeded shuffle. Unusable dimensions or an index outside the
    /// board are a [`EngineError::CorruptSave`].
    pub fn restore(&self) -> Result<Grid, EngineError> {
        let mut grid = generate(self.rows, self.cols, self.mines, Some(self.seed.clone()))
            .map_err(|_| EngineError::CorruptSave {
                reason: format!(
                    "unusable dimensions: {}x{} with {} mines",
                    self.rows, self.cols, self.mines
                ),
            })?;

        let total = grid.cell_count();
        for &index in self.open.iter().chain(self.flags.iter()) {
            if index >= total {
                return Err(EngineError::CorruptSave {
                    reason: format!("index {index} outside {}x{} board", self.rows, self.cols),
                });
            }
        }
        for &index in &self.open {
            grid.cell_mut_at(index).is_open = true;
        }
        for &index in &self.flags {
            grid.cell_mut_at(index).is_flag = true;
        }
        Ok(grid)
    }

    /// Encode as the compact textual blob.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("save state serializes to JSON")
    }

    /// Decode the textual blob.
    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        serde_json::from_str(text).map_err(|err| EngineError::CorruptSave {
            reason: err.to_string(),
        })
    }
}
