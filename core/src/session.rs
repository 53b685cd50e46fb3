// Session: one play-through from placement to win or loss.
//
// The session exclusively owns its Board and Fleet and borrows a shared
// oracle. Every operation validates before it mutates: a rejected call leaves
// the session exactly as it was. The only exception by design of the rules is
// the committed target, which is spent as soon as it is picked (or aimed) even
// if the oracle later fails to resolve it.

use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::board::Board;
use crate::cell::Cell;
use crate::config::{GameConfig, Inventory};
use crate::error::{ConfigError, PlacementError, SessionError};
use crate::fleet::Fleet;
use crate::oracle::RandomOracle;
use crate::piece::{Bias, DualKind, Piece, PieceId, PieceKind, PieceState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for placements or for the next target.
    Placing,
    /// A target is committed and waiting to be resolved.
    Resolving { target: Cell },
    /// Every piece was destroyed.
    Won,
    /// The round budget or the board ran out with pieces still afloat.
    Lost,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Won | SessionPhase::Lost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShotOutcome {
    Miss,
    HitClassicalDestroyed,
    HitCollapsedDestroyed,
    HitCollapsedSurvived,
}

impl fmt::Display for ShotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShotOutcome::Miss => "miss",
            ShotOutcome::HitClassicalDestroyed => "classical piece destroyed",
            ShotOutcome::HitCollapsedDestroyed => "collapsed and destroyed",
            ShotOutcome::HitCollapsedSurvived => "collapsed and escaped",
        })
    }
}

/// One resolved shot, kept in order for rendering and replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotRecord {
    pub target: Cell,
    pub outcome: ShotOutcome,
    pub piece: Option<PieceId>,
    /// Cell a dual-location piece collapsed to, if the shot caused a collapse.
    pub collapsed_to: Option<Cell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub active_pieces: usize,
    pub destroyed_pieces: usize,
    pub collapses: u32,
    pub rounds_used: u32,
    pub rounds_remaining: u32,
}

pub struct Session {
    id: Uuid,
    config: GameConfig,
    default_bias: Bias,
    board: Board,
    fleet: Fleet,
    remaining: Inventory,
    phase: SessionPhase,
    history: Vec<ShotRecord>,
    collapses: u32,
    oracle: Arc<dyn RandomOracle>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("oracle", &self.oracle.name())
            .field("phase", &self.phase)
            .field("rounds_used", &self.rounds_used())
            .field("fleet", &self.fleet)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: GameConfig, oracle: Arc<dyn RandomOracle>) -> Result<Self, ConfigError> {
        let default_bias = config.validate()?;
        let id = Uuid::new_v4();
        tracing::info!(
            session = %id,
            board_size = config.board_size,
            round_limit = config.round_limit,
            oracle = oracle.name(),
            "session created"
        );
        Ok(Self {
            id,
            board: Board::new(config.board_size),
            fleet: Fleet::new(config.board_size),
            remaining: config.inventory.clone(),
            default_bias,
            config,
            phase: SessionPhase::Placing,
            history: Vec::new(),
            collapses: 0,
            oracle,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn history(&self) -> &[ShotRecord] {
        &self.history
    }

    pub fn oracle_name(&self) -> &str {
        self.oracle.name()
    }

    /// Pieces still available to place, per kind.
    pub fn remaining_inventory(&self) -> &Inventory {
        &self.remaining
    }

    pub fn rounds_used(&self) -> u32 {
        // bounded by board_size², which fits a u32 for any board a u32 can index
        u32::try_from(self.board.targeted_count()).unwrap_or(u32::MAX)
    }

    pub fn rounds_remaining(&self) -> u32 {
        self.config.round_limit.saturating_sub(self.rounds_used())
    }

    pub fn pending_target(&self) -> Option<Cell> {
        match self.phase {
            SessionPhase::Resolving { target } => Some(target),
            _ => None,
        }
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            active_pieces: self.fleet.active_count(),
            destroyed_pieces: self.fleet.destroyed_count(),
            collapses: self.collapses,
            rounds_used: self.rounds_used(),
            rounds_remaining: self.rounds_remaining(),
        }
    }

    // ------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------

    pub fn place_classical(&mut self, cell: impl Into<Cell>) -> Result<PieceId, SessionError> {
        self.check_placement_open(PieceKind::Classical)?;
        let id = self.fleet.place_classical(cell.into())?;
        *self.remaining.count_mut(PieceKind::Classical) -= 1;
        Ok(id)
    }

    /// Place a ghost or biased piece. `bias` is the weight toward `cell_a`;
    /// it is ignored for ghosts and falls back to the configured default for
    /// biased pieces.
    pub fn place_dual(
        &mut self,
        kind: DualKind,
        cell_a: impl Into<Cell>,
        cell_b: impl Into<Cell>,
        bias: Option<f64>,
    ) -> Result<PieceId, SessionError> {
        let bias = match (kind, bias) {
            (DualKind::Ghost, _) => Bias::BALANCED,
            (DualKind::Biased, Some(p)) => Bias::new(p)?,
            (DualKind::Biased, None) => self.default_bias,
        };
        self.check_placement_open(kind.into())?;
        let id = self.fleet.place_dual(kind, cell_a.into(), cell_b.into(), bias)?;
        *self.remaining.count_mut(kind.into()) -= 1;
        Ok(id)
    }

    /// Place whatever is left of the inventory on random free cells.
    pub fn place_remaining_randomly<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<PieceId>, SessionError> {
        let mut placed = Vec::new();
        while self.remaining.classical > 0 {
            let cell = self.free_cells().choose(rng).copied().ok_or(PlacementError::BoardFull { kind: PieceKind::Classical })?;
            placed.push(self.place_classical(cell)?);
        }
        for kind in [DualKind::Ghost, DualKind::Biased] {
            while self.remaining.count(kind.into()) > 0 {
                let pair: Vec<Cell> = self.free_cells().choose_multiple(rng, 2).copied().collect();
                let [a, b] = pair[..] else {
                    return Err(PlacementError::BoardFull { kind: kind.into() }.into());
                };
                placed.push(self.place_dual(kind, a, b, None)?);
            }
        }
        Ok(placed)
    }

    fn free_cells(&self) -> Vec<Cell> {
        Cell::all(self.config.board_size).filter(|&c| self.fleet.piece_at(c).is_none()).collect()
    }

    fn check_placement_open(&self, kind: PieceKind) -> Result<(), SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::SessionOver);
        }
        if self.phase != SessionPhase::Placing || self.board.targeted_count() > 0 {
            return Err(PlacementError::PlacementClosed.into());
        }
        if self.remaining.count(kind) == 0 {
            return Err(PlacementError::InventoryExhausted { kind }.into());
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Targeting and resolution
    // ------------------------------------------------------------------

    /// Uniformly pick an untargeted cell and commit it as the pending target.
    /// Returns `Ok(None)` when no cell is left.
    pub fn pick_target<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<Cell>, SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::SessionOver);
        }
        if let Some(pending) = self.pending_target() {
            return Err(SessionError::PendingTarget { pending });
        }
        let target = self.board.pick_target(rng);
        if let Some(target) = target {
            tracing::debug!(session = %self.id, %target, round = self.rounds_used(), "target selected");
            self.phase = SessionPhase::Resolving { target };
        }
        Ok(target)
    }

    /// Resolve a shot at `target`.
    ///
    /// `target` must be the pending target from [`Session::pick_target`], or,
    /// when nothing is pending, an untargeted cell chosen by the caller; the
    /// latter is committed to the board before resolution. If the oracle
    /// fails, nothing but the commitment changes and the target stays
    /// pending: call `resolve` again to retry or
    /// [`Session::forfeit_pending`] to give it up.
    pub fn resolve(&mut self, target: impl Into<Cell>) -> Result<ShotOutcome, SessionError> {
        let target = target.into();
        match self.phase {
            SessionPhase::Won | SessionPhase::Lost => return Err(SessionError::SessionOver),
            SessionPhase::Resolving { target: pending } if pending != target => {
                return Err(SessionError::PendingTarget { pending });
            }
            SessionPhase::Resolving { .. } => {}
            SessionPhase::Placing => {
                if !target.in_bounds(self.config.board_size) {
                    return Err(SessionError::OutOfBounds(target));
                }
                if !self.board.commit(target) {
                    return Err(SessionError::AlreadyTargeted(target));
                }
                self.phase = SessionPhase::Resolving { target };
            }
        }

        let record = match self.fire(target) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(session = %self.id, %target, error = %err, "shot left unresolved");
                return Err(err);
            }
        };
        tracing::info!(
            session = %self.id,
            %target,
            outcome = %record.outcome,
            piece = ?record.piece,
            "shot resolved"
        );
        self.history.push(record);
        self.advance_phase();
        Ok(record.outcome)
    }

    /// Give up on the pending target. The round stays spent.
    pub fn forfeit_pending(&mut self) -> Result<Cell, SessionError> {
        let target = self.pending_target().ok_or(SessionError::NoPendingTarget)?;
        tracing::info!(session = %self.id, %target, "pending target forfeited");
        self.advance_phase();
        Ok(target)
    }

    /// Resolve `target` against the fleet. Pieces are only mutated after the
    /// oracle has answered.
    fn fire(&mut self, target: Cell) -> Result<ShotRecord, SessionError> {
        let miss = ShotRecord { target, outcome: ShotOutcome::Miss, piece: None, collapsed_to: None };
        let Some(id) = self.fleet.piece_at(target) else {
            return Ok(miss);
        };
        let Some(state) = self.fleet.get(id).map(|p| p.state) else {
            return Ok(miss);
        };

        let (outcome, collapsed_to) = match state {
            PieceState::Classical { .. } => {
                self.with_piece(id, |p| p.destroy_at(target));
                (ShotOutcome::HitClassicalDestroyed, None)
            }
            PieceState::Dual { cells, bias, .. } => {
                let drawn = self.oracle.collapse(bias)?;
                self.collapses += 1;
                let resolved = cells[drawn.index()];
                tracing::debug!(session = %self.id, %id, %bias, ?drawn, %resolved, "piece collapsed");
                if resolved == target {
                    self.with_piece(id, |p| p.destroy_at(resolved));
                    (ShotOutcome::HitCollapsedDestroyed, Some(resolved))
                } else {
                    self.with_piece(id, |p| p.settle_at(resolved));
                    (ShotOutcome::HitCollapsedSurvived, Some(resolved))
                }
            }
        };
        Ok(ShotRecord { target, outcome, piece: Some(id), collapsed_to })
    }

    fn with_piece(&mut self, id: PieceId, f: impl FnOnce(&mut Piece)) {
        if let Some(piece) = self.fleet.get_mut(id) {
            f(piece);
        }
    }

    fn advance_phase(&mut self) {
        let next = if self.fleet.is_wiped_out() {
            SessionPhase::Won
        } else if self.rounds_used() >= self.config.round_limit || !self.board.has_unvisited() {
            SessionPhase::Lost
        } else {
            SessionPhase::Placing
        };
        if next.is_terminal() {
            tracing::info!(session = %self.id, phase = ?next, rounds_used = self.rounds_used(), "session finished");
        }
        self.phase = next;
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            config: self.config.clone(),
            phase: self.phase,
            oracle: self.oracle.name().to_string(),
            targeted: self.board.targeted().collect(),
            pieces: self.fleet.pieces().cloned().collect(),
            history: self.history.clone(),
            stats: self.stats(),
        }
    }
}

/// Owned, serialisable view of a session for rendering and replay checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub config: GameConfig,
    pub phase: SessionPhase,
    pub oracle: String,
    pub targeted: Vec<Cell>,
    pub pieces: Vec<Piece>,
    pub history: Vec<ShotRecord>,
    pub stats: SessionStats,
}

impl SessionSnapshot {
    /// SHA-256 over the bincode encoding. Two snapshots of the same game
    /// state always produce the same digest.
    pub fn commit(&self) -> Result<[u8; 32], bincode::Error> {
        let bytes = bincode::serialize(self)?;
        Ok(Sha256::digest(&bytes).into())
    }

    pub fn piece_at(&self, cell: Cell) -> Option<&Piece> {
        self.pieces
            .iter()
            .find(|p| p.occupies(cell) && p.is_active())
            .or_else(|| self.pieces.iter().find(|p| p.occupies(cell)))
    }
}
