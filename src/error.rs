//! The crate's single public error type.
//!
//! Every fallible public operation on [`crate::board::Board`],
//! [`crate::tree::TreeNode`], and [`crate::controller::Controller`] returns
//! `Result<_, EngineError>`.

use thiserror::Error;

/// Errors produced by the board, tree, and controller layers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The action is not legal in the position it was attempted against.
    #[error("illegal move: {0}")]
    IllegalMove(String),

    /// An action was requested (e.g. [`crate::tree::TreeNode::choose_best_action`])
    /// in a position with no legal moves.
    #[error("no legal moves available")]
    NoLegalMoves,

    /// An equity value was requested on a node that has never been visited.
    #[error("node has not been evaluated")]
    NotEvaluated,

    /// The engine was constructed with an invalid configuration.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}
