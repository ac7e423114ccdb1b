//! quoridor-mcts: a concurrent Monte Carlo Tree Search engine for a
//! Quoridor-family two-player pathfinding-with-walls board game.
//!
//! The crate is layered leaves-first, the same shape the original Go engine
//! this project's structure is adapted from uses (position → search tree →
//! protocol front-end):
//!
//! - [`board`] — the game position: tokens, walls, legality, terminal
//!   detection, and action-string encoding. A pure value type.
//! - [`tree`] — the search tree: node statistics, selection, expansion,
//!   leaf evaluation, backup, and action ranking. Depends on [`board`].
//! - [`controller`] — a background worker thread wrapped around one tree
//!   root, plus the synchronous control surface a caller uses to query
//!   statistics, commit moves, reroot, and bound search effort. Depends on
//!   [`tree`].
//! - [`error`] — the crate's single public error type, returned by every
//!   fallible operation across the three layers above.
//!
//! ## Example
//!
//! ```
//! use quoridor_mcts::board::Board;
//! use quoridor_mcts::controller::{Controller, ControllerConfig};
//!
//! let controller = Controller::new(Board::new(9), ControllerConfig::default())
//!     .expect("sim_increment defaults to a nonzero value");
//! controller.ensure_sims(100);
//! let action = controller.choose_best_action(0.0).expect("root has legal moves");
//! controller.make_move(&action, false).expect("choose_best_action only returns legal actions");
//! ```

pub mod board;
pub mod controller;
pub mod error;
pub mod tree;
