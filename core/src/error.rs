// Error taxonomy for the engine.
//
// Every error is produced before any state is mutated, so a caller can
// always retry with different input or abandon the session.

use thiserror::Error;

use crate::cell::Cell;
use crate::piece::PieceKind;

/// A piece could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("cell {cell} is outside the {board_size}x{board_size} board")]
    OutOfBounds { cell: Cell, board_size: u32 },
    #[error("a dual-location piece needs two distinct cells, got {cell} twice")]
    DuplicateCell { cell: Cell },
    #[error("cell {cell} is already occupied by an active piece")]
    Occupied { cell: Cell },
    #[error("no {kind} pieces left in the inventory")]
    InventoryExhausted { kind: PieceKind },
    #[error("placement is closed once the first target has been committed")]
    PlacementClosed,
    #[error("not enough free cells left to place a {kind} piece")]
    BoardFull { kind: PieceKind },
}

/// A collapse weight outside the open interval (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BiasError {
    #[error("bias {0} must lie strictly between 0 and 1")]
    OutOfRange(f64),
}

/// The oracle could not produce a collapse outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
    #[error("oracle call was cancelled")]
    Cancelled,
    #[error("oracle did not answer within {0:?}")]
    Timeout(std::time::Duration),
    #[error("oracle protocol error: {0}")]
    Protocol(String),
}

/// Invalid session configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("board size must be at least 1")]
    EmptyBoard,
    #[error("round limit must be at least 1")]
    NoRounds,
    #[error("default bias is invalid: {0}")]
    DefaultBias(#[from] BiasError),
    #[error("inventory needs {needed} cells but the board only has {available}")]
    InventoryTooLarge { needed: u64, available: u64 },
}

/// Errors surfaced by [`crate::Session`] operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Bias(#[from] BiasError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error("cell {0} has already been targeted")]
    AlreadyTargeted(Cell),
    #[error("target {0} is outside the board")]
    OutOfBounds(Cell),
    #[error("target {pending} is still waiting to be resolved")]
    PendingTarget { pending: Cell },
    #[error("there is no pending target")]
    NoPendingTarget,
    #[error("the session is over")]
    SessionOver,
}

impl SessionError {
    /// True when the error came from the oracle backend; the pending target
    /// is kept so the caller may retry or forfeit it.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, SessionError::Oracle(_))
    }
}
