//! Engine error types.

use thiserror::Error;

/// Everything that can go wrong inside the engine.
///
/// Queries and predicates are total and never return these; only
/// construction, moves with explicit coordinates, and save decoding fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Rejected board parameters at construction time.
    #[error("invalid configuration: {rows}x{cols} board with {mines} mines")]
    InvalidConfiguration {
        rows: usize,
        cols: usize,
        mines: usize,
    },

    /// A caller passed coordinates outside the grid.
    #[error("position ({row}, {col}) is outside the {rows}x{cols} board")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A save blob is unusable: malformed text, impossible dimensions, or
    /// indices outside the board they claim to belong to.
    #[error("corrupt save state: {reason}")]
    CorruptSave { reason: String },
}
