// Session configuration: board dimension, round budget and the piece
// inventory available during placement.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::piece::{Bias, PieceKind};

pub const DEFAULT_BOARD_SIZE: u32 = 8;
pub const DEFAULT_ROUND_LIMIT: u32 = 30;
pub const DEFAULT_BIASED_WEIGHT: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub classical: u32,
    pub ghost: u32,
    pub biased: u32,
    /// Weight toward the first cell used when a biased piece is placed
    /// without an explicit one.
    pub default_bias: f64,
}

impl Inventory {
    pub fn empty() -> Self {
        Self { classical: 0, ghost: 0, biased: 0, default_bias: DEFAULT_BIASED_WEIGHT }
    }

    pub fn count(&self, kind: PieceKind) -> u32 {
        match kind {
            PieceKind::Classical => self.classical,
            PieceKind::Ghost => self.ghost,
            PieceKind::Biased => self.biased,
        }
    }

    pub(crate) fn count_mut(&mut self, kind: PieceKind) -> &mut u32 {
        match kind {
            PieceKind::Classical => &mut self.classical,
            PieceKind::Ghost => &mut self.ghost,
            PieceKind::Biased => &mut self.biased,
        }
    }

    /// Pieces left to place. Widened so any accepted inventory fits.
    pub fn total(&self) -> u64 {
        u64::from(self.classical) + u64::from(self.ghost) + u64::from(self.biased)
    }

    /// Cells needed to place the whole inventory at once.
    pub fn cells_needed(&self) -> u64 {
        u64::from(self.classical) + 2 * (u64::from(self.ghost) + u64::from(self.biased))
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self { classical: 3, ghost: 2, biased: 1, default_bias: DEFAULT_BIASED_WEIGHT }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub board_size: u32,
    pub round_limit: u32,
    pub inventory: Inventory,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self { board_size: DEFAULT_BOARD_SIZE, round_limit: DEFAULT_ROUND_LIMIT, inventory: Inventory::default() }
    }
}

impl GameConfig {
    pub fn new(board_size: u32, round_limit: u32, inventory: Inventory) -> Self {
        Self { board_size, round_limit, inventory }
    }

    /// Check the configuration and return the validated default bias.
    pub fn validate(&self) -> Result<Bias, ConfigError> {
        if self.board_size == 0 {
            return Err(ConfigError::EmptyBoard);
        }
        if self.round_limit == 0 {
            return Err(ConfigError::NoRounds);
        }
        let bias = Bias::new(self.inventory.default_bias)?;
        let available = u64::from(self.board_size) * u64::from(self.board_size);
        let needed = self.inventory.cells_needed();
        if needed > available {
            return Err(ConfigError::InventoryTooLarge { needed, available });
        }
        Ok(bias)
    }
}
