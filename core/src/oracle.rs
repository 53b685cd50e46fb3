// Random oracles: the source of collapse outcomes.
//
// The engine only needs "given a two-outcome process biased toward outcome 0,
// return 0 or 1". Oracles are shared between sessions behind an `Arc`, so
// every implementation must be safe to call concurrently; the local
// generator serialises access to its RNG with a mutex.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::piece::Bias;

/// Result of a single collapse draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The piece resolves to its first cell.
    Zero,
    /// The piece resolves to its second cell.
    One,
}

impl Outcome {
    pub fn index(self) -> usize {
        match self {
            Outcome::Zero => 0,
            Outcome::One => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Option<Self> {
        match bit {
            0 => Some(Outcome::Zero),
            1 => Some(Outcome::One),
            _ => None,
        }
    }
}

pub trait RandomOracle: Send + Sync {
    /// Draw exactly once from a two-outcome process that yields
    /// [`Outcome::Zero`] with probability `bias`.
    fn collapse(&self, bias: Bias) -> Result<Outcome, OracleError>;

    /// Short backend label for logs and status displays.
    fn name(&self) -> &str;
}

/// Pseudo-random oracle backed by a seedable `StdRng`. Never fails.
#[derive(Debug)]
pub struct LocalOracle {
    rng: Mutex<StdRng>,
}

impl LocalOracle {
    pub fn from_entropy() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomOracle for LocalOracle {
    fn collapse(&self, bias: Bias) -> Result<Outcome, OracleError> {
        // A panic elsewhere cannot leave an RNG in a broken state.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        if rng.gen_bool(bias.probability()) {
            Ok(Outcome::Zero)
        } else {
            Ok(Outcome::One)
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Oracle that plays back a fixed script of outcomes, e.g. to force a
/// collapse in tests or to replay a recorded game. Fails with
/// `Unavailable` once the script runs out.
#[derive(Debug, Default)]
pub struct ReplayOracle {
    script: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
}

impl ReplayOracle {
    pub fn new(script: impl IntoIterator<Item = Outcome>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), calls: AtomicUsize::new(0) }
    }

    /// Number of times `collapse` has been invoked, including failed calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl RandomOracle for ReplayOracle {
    fn collapse(&self, _bias: Bias) -> Result<Outcome, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| OracleError::Unavailable("replay script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn zero_frequency(oracle: &dyn RandomOracle, p: f64, n: usize) -> f64 {
        let bias = Bias::new(p).unwrap();
        let zeros = (0..n).filter(|_| oracle.collapse(bias).unwrap() == Outcome::Zero).count();
        zeros as f64 / n as f64
    }

    #[test]
    fn test_local_bias_convergence() {
        let oracle = LocalOracle::seeded(2024);
        let n = 20_000;
        for p in [0.5, 0.75, 0.9, 0.1] {
            let observed = zero_frequency(&oracle, p, n);
            let std_err = (p * (1.0 - p) / n as f64).sqrt();
            assert!((observed - p).abs() < 4.0 * std_err, "p={p} observed={observed}");
        }
    }

    #[test]
    fn test_local_oracle_shared_between_threads() {
        let oracle = Arc::new(LocalOracle::seeded(5));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let oracle = Arc::clone(&oracle);
                std::thread::spawn(move || (0..1000).filter(|_| oracle.collapse(Bias::BALANCED).is_ok()).count())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 4000);
    }

    #[test]
    fn test_replay_script_and_exhaustion() {
        let oracle = ReplayOracle::new([Outcome::One, Outcome::Zero]);
        assert_eq!(oracle.collapse(Bias::BALANCED), Ok(Outcome::One));
        assert_eq!(oracle.collapse(Bias::BALANCED), Ok(Outcome::Zero));
        assert!(matches!(oracle.collapse(Bias::BALANCED), Err(OracleError::Unavailable(_))));
        assert_eq!(oracle.calls(), 3);
        assert_eq!(oracle.remaining(), 0);
    }

    #[test]
    fn test_outcome_bits() {
        assert_eq!(Outcome::from_bit(0), Some(Outcome::Zero));
        assert_eq!(Outcome::from_bit(1).map(Outcome::index), Some(1));
        assert_eq!(Outcome::from_bit(2), None);
    }
}
