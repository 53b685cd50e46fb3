// Pieces and their placement state.
//
// A piece is either classical (one fixed cell) or dual-location (two cells
// plus a collapse bias). The dual state is a tagged variant that degrades to
// `Classical` exactly once, when the piece is hit: it is either destroyed at
// the collapsed cell or escapes and stays classical there for good.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::BiasError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Classical,
    Ghost,
    Biased,
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PieceKind::Classical => "classical",
            PieceKind::Ghost => "ghost",
            PieceKind::Biased => "biased",
        })
    }
}

/// The kinds that occupy two cells until collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DualKind {
    Ghost,
    Biased,
}

impl From<DualKind> for PieceKind {
    fn from(value: DualKind) -> Self {
        match value {
            DualKind::Ghost => PieceKind::Ghost,
            DualKind::Biased => PieceKind::Biased,
        }
    }
}

/// Probability that a dual-location piece collapses to its first cell.
///
/// Always strictly inside (0, 1); construct with [`Bias::new`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Bias(f64);

impl Bias {
    /// The fair coin used by ghost pieces.
    pub const BALANCED: Bias = Bias(0.5);

    pub fn new(p: f64) -> Result<Self, BiasError> {
        // NaN fails both comparisons
        if p > 0.0 && p < 1.0 {
            Ok(Self(p))
        } else {
            Err(BiasError::OutOfRange(p))
        }
    }

    pub fn probability(self) -> f64 {
        self.0
    }

    /// Rotation angle `θ = 2·acos(√p)` that prepares a two-outcome process
    /// measuring outcome 0 with probability `p`. Remote backends receive this
    /// alongside the raw probability.
    pub fn rotation_angle(self) -> f64 {
        2.0 * self.0.sqrt().acos()
    }
}

impl TryFrom<f64> for Bias {
    type Error = BiasError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Bias::new(value)
    }
}

impl From<Bias> for f64 {
    fn from(value: Bias) -> Self {
        value.0
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PieceId(pub u32);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PieceState {
    Classical { cell: Cell },
    Dual { kind: DualKind, cells: [Cell; 2], bias: Bias },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceStatus {
    Active,
    Destroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    /// Kind the piece was placed as; unlike [`Piece::kind`] this never changes.
    pub placed_as: PieceKind,
    pub state: PieceState,
    pub status: PieceStatus,
}

impl Piece {
    pub(crate) fn classical(id: PieceId, cell: Cell) -> Self {
        Self {
            id,
            placed_as: PieceKind::Classical,
            state: PieceState::Classical { cell },
            status: PieceStatus::Active,
        }
    }

    pub(crate) fn dual(id: PieceId, kind: DualKind, cells: [Cell; 2], bias: Bias) -> Self {
        Self {
            id,
            placed_as: kind.into(),
            state: PieceState::Dual { kind, cells, bias },
            status: PieceStatus::Active,
        }
    }

    /// Current kind. A dual piece that escaped a hit reports `Classical`.
    pub fn kind(&self) -> PieceKind {
        match self.state {
            PieceState::Classical { .. } => PieceKind::Classical,
            PieceState::Dual { kind, .. } => kind.into(),
        }
    }

    /// Occupied cells: one for classical pieces, two (in collapse order) for
    /// dual-location pieces.
    pub fn cells(&self) -> &[Cell] {
        match &self.state {
            PieceState::Classical { cell } => std::slice::from_ref(cell),
            PieceState::Dual { cells, .. } => cells,
        }
    }

    pub fn occupies(&self, cell: Cell) -> bool {
        self.cells().contains(&cell)
    }

    /// Collapse bias, only present while the piece is still dual-location.
    pub fn bias(&self) -> Option<Bias> {
        match self.state {
            PieceState::Classical { .. } => None,
            PieceState::Dual { bias, .. } => Some(bias),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PieceStatus::Active
    }

    /// Pin the piece to `cell` and mark it destroyed.
    pub(crate) fn destroy_at(&mut self, cell: Cell) {
        self.state = PieceState::Classical { cell };
        self.status = PieceStatus::Destroyed;
    }

    /// Pin the piece to `cell` and keep it active. Irreversible.
    pub(crate) fn settle_at(&mut self, cell: Cell) {
        self.state = PieceState::Classical { cell };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bias_bounds() {
        assert!(Bias::new(0.0).is_err());
        assert!(Bias::new(1.0).is_err());
        assert!(Bias::new(f64::NAN).is_err());
        assert!(Bias::new(-0.2).is_err());
        assert_eq!(Bias::new(0.9).map(Bias::probability), Ok(0.9));
    }

    #[test]
    fn test_rotation_angle() {
        // a fair coin is a quarter turn, certainty of outcome 0 would be no turn
        let half = Bias::BALANCED.rotation_angle();
        assert!((half - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        let strong = Bias::new(0.999_999).unwrap().rotation_angle();
        assert!(strong < 0.01);
    }

    #[test]
    fn test_bias_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Bias>("0.25").is_ok());
        assert!(serde_json::from_str::<Bias>("1.5").is_err());
    }

    #[test]
    fn test_dual_piece_settles_to_classical() {
        let mut piece = Piece::dual(PieceId(1), DualKind::Ghost, [Cell::new(0, 0), Cell::new(1, 1)], Bias::BALANCED);
        assert_eq!(piece.kind(), PieceKind::Ghost);
        assert_eq!(piece.cells().len(), 2);

        piece.settle_at(Cell::new(1, 1));
        assert_eq!(piece.kind(), PieceKind::Classical);
        assert_eq!(piece.placed_as, PieceKind::Ghost);
        assert_eq!(piece.cells(), &[Cell::new(1, 1)]);
        assert!(piece.bias().is_none());
        assert!(piece.is_active());
    }
}
