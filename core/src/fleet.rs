// Fleet: the arena of pieces for one session.
//
// Pieces are keyed by a stable `PieceId` handed out in placement order.
// Lookups are by id or by cell; there are no back-references. The fleet
// enforces that no two active pieces ever claim the same cell.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::PlacementError;
use crate::piece::{Bias, DualKind, Piece, PieceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fleet {
    board_size: u32,
    pieces: BTreeMap<PieceId, Piece>,
    next_id: u32,
}

impl Fleet {
    pub fn new(board_size: u32) -> Self {
        Self { board_size, pieces: BTreeMap::new(), next_id: 1 }
    }

    /// Place a classical piece on `cell`.
    pub fn place_classical(&mut self, cell: Cell) -> Result<PieceId, PlacementError> {
        self.check_free(cell)?;
        let id = self.allocate_id();
        self.pieces.insert(id, Piece::classical(id, cell));
        tracing::debug!(%id, %cell, "placed classical piece");
        Ok(id)
    }

    /// Place a dual-location piece over `cell_a` and `cell_b`. `bias` is the
    /// probability of collapsing to `cell_a`; ghosts are always balanced and
    /// ignore it.
    pub fn place_dual(&mut self, kind: DualKind, cell_a: Cell, cell_b: Cell, bias: Bias) -> Result<PieceId, PlacementError> {
        // Bounds first so an out-of-range pair reports OutOfBounds rather than a duplicate.
        for cell in [cell_a, cell_b] {
            if !cell.in_bounds(self.board_size) {
                return Err(PlacementError::OutOfBounds { cell, board_size: self.board_size });
            }
        }
        if cell_a == cell_b {
            return Err(PlacementError::DuplicateCell { cell: cell_a });
        }
        self.check_free(cell_a)?;
        self.check_free(cell_b)?;

        let bias = match kind {
            DualKind::Ghost => Bias::BALANCED,
            DualKind::Biased => bias,
        };
        let id = self.allocate_id();
        self.pieces.insert(id, Piece::dual(id, kind, [cell_a, cell_b], bias));
        tracing::debug!(%id, ?kind, %cell_a, %cell_b, %bias, "placed dual-location piece");
        Ok(id)
    }

    /// The active piece whose current cells include `cell`, if any.
    pub fn piece_at(&self, cell: Cell) -> Option<PieceId> {
        self.pieces.values().find(|p| p.is_active() && p.occupies(cell)).map(|p| p.id)
    }

    pub fn get(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(&id)
    }

    /// All pieces in placement order.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> {
        self.pieces.values()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.pieces.values().filter(|p| p.is_active()).count()
    }

    pub fn destroyed_count(&self) -> usize {
        self.len() - self.active_count()
    }

    /// True once at least one piece was placed and every piece is destroyed.
    pub fn is_wiped_out(&self) -> bool {
        !self.is_empty() && self.active_count() == 0
    }

    fn check_free(&self, cell: Cell) -> Result<(), PlacementError> {
        if !cell.in_bounds(self.board_size) {
            return Err(PlacementError::OutOfBounds { cell, board_size: self.board_size });
        }
        if self.piece_at(cell).is_some() {
            return Err(PlacementError::Occupied { cell });
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> PieceId {
        let id = PieceId(self.next_id);
        self.next_id += 1;
        id
    }
}
