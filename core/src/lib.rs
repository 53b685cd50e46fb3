// core: engine for a grid-guessing game with dual-location pieces.
//
// Classical pieces sit on one cell. Ghost and biased pieces sit on two cells
// at once and collapse to one of them, through a `RandomOracle`, the first
// time a shot lands on either. `Session` is the canonical authority for
// placement, targeting, shot resolution and win/loss; everything else in the
// workspace (rendering, input, remote transport) sits outside it and talks to
// it through plain synchronous calls.

pub mod board;
pub mod cell;
pub mod config;
pub mod error;
pub mod fleet;
pub mod oracle;
pub mod piece;
pub mod session;

pub use board::Board;
pub use cell::Cell;
pub use config::{GameConfig, Inventory};
pub use error::{BiasError, ConfigError, OracleError, PlacementError, SessionError};
pub use fleet::Fleet;
pub use oracle::{LocalOracle, Outcome, RandomOracle, ReplayOracle};
pub use piece::{Bias, DualKind, Piece, PieceId, PieceKind, PieceState, PieceStatus};
pub use session::{Session, SessionPhase, SessionSnapshot, SessionStats, ShotOutcome, ShotRecord};
