//! No-guess Minesweeper board engine.
//!
//! The crate owns everything between the random seed and the rendered
//! pixels: deterministic seeded board generation with a safe first
//! click, flood-reveal and chord mechanics, a constraint solver that
//! certifies a board as winnable by pure deduction (and produces hints
//! from the same rules), and a compact save/load codec. Rendering,
//! input wiring and storage backends live with the caller; the engine
//! only hands out cell values and a serializable state blob.
//!
//! Typical flow:
//!
//! ```
//! use sweeper_engine::{generate, open, GameOptions, SaveState};
//!
//! let mut grid = generate(9, 9, 10, None).unwrap();
//! let options = GameOptions { auto_open: true, auto_flag: true, no_guess: false };
//! open(&mut grid, 4, 4, true, &options).unwrap();
//! let blob = SaveState::capture(&grid).to_json();
//! # let _ = blob;
//! ```

pub mod board;
pub mod error;
pub mod grid;
pub mod reveal;
pub mod rng;
pub mod solver;
pub mod state;

pub use board::{generate, generate_no_guess, relocate_mine_away_from, NoGuessBoard};
pub use error::EngineError;
pub use grid::{Cell, Grid};
pub use reveal::{flood_zero_region, open, probe, toggle_flag, GameOptions};
pub use solver::{get_hint, is_solvable_from, Hint, HintAction};
pub use state::SaveState;
