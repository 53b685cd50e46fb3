// Board: the set of cells targeted so far in a session.
//
// The set only ever grows. Untargeted cells are enumerated in row-major order
// so that target selection is reproducible from a seeded RNG.

use std::collections::BTreeSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::cell::Cell;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: u32,
    targeted: BTreeSet<Cell>,
}

impl Board {
    pub fn new(size: u32) -> Self {
        Self { size, targeted: BTreeSet::new() }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// All in-bounds cells not yet targeted, row-major.
    pub fn unvisited_cells(&self) -> Vec<Cell> {
        Cell::all(self.size).filter(|c| !self.targeted.contains(c)).collect()
    }

    pub fn has_unvisited(&self) -> bool {
        (self.targeted.len() as u64) < u64::from(self.size) * u64::from(self.size)
    }

    /// Uniformly pick an untargeted cell and mark it targeted.
    /// Returns `None` once every cell has been targeted.
    pub fn pick_target<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Cell> {
        let total = u64::from(self.size) * u64::from(self.size);
        let left = total.checked_sub(self.targeted.len() as u64).filter(|&n| n > 0)?;
        let nth = usize::try_from(rng.gen_range(0..left)).ok()?;
        let target = Cell::all(self.size).filter(|c| !self.targeted.contains(c)).nth(nth)?;
        self.targeted.insert(target);
        Some(target)
    }

    /// Mark a caller-chosen cell as targeted. Returns false if it was out of
    /// bounds or already targeted, in which case nothing changes.
    pub(crate) fn commit(&mut self, cell: Cell) -> bool {
        cell.in_bounds(self.size) && self.targeted.insert(cell)
    }

    pub fn is_targeted(&self, cell: Cell) -> bool {
        self.targeted.contains(&cell)
    }

    pub fn targeted(&self) -> impl Iterator<Item = Cell> + '_ {
        self.targeted.iter().copied()
    }

    pub fn targeted_count(&self) -> usize {
        self.targeted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_pick_target_exhausts_board() {
        let mut board = Board::new(8);
        let mut rng = StdRng::seed_from_u64(7);
        for n in 1..=64 {
            let target = board.pick_target(&mut rng);
            assert!(target.is_some());
            assert_eq!(board.targeted_count(), n);
        }
        assert!(!board.has_unvisited());
        assert_eq!(board.pick_target(&mut rng), None);
        assert_eq!(board.targeted_count(), 64);
    }

    #[test]
    fn test_pick_target_is_reproducible() {
        let picks = |seed| {
            let mut board = Board::new(5);
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10).filter_map(|_| board.pick_target(&mut rng)).collect::<Vec<_>>()
        };
        assert_eq!(picks(3), picks(3));
    }

    #[test]
    fn test_pick_target_is_uniform_over_unvisited() {
        let mut rng = StdRng::seed_from_u64(19);
        let mut counts = [0u32; 4];
        for _ in 0..4000 {
            let mut board = Board::new(2);
            board.commit(Cell::new(0, 0));
            let cell = board.pick_target(&mut rng).unwrap();
            counts[(cell.y * 2 + cell.x) as usize] += 1;
        }
        assert_eq!(counts[0], 0);
        for count in &counts[1..] {
            assert!((1183..=1483).contains(count), "{counts:?}");
        }

        let mut board = Board::new(2);
        for cell in [Cell::new(0, 0), Cell::new(1, 0), Cell::new(0, 1)] {
            board.commit(cell);
        }
        assert_eq!(board.pick_target(&mut rng), Some(Cell::new(1, 1)));
        assert_eq!(board.pick_target(&mut rng), None);
    }

    #[test]
    fn test_never_repeats_a_cell() {
        let mut board = Board::new(3);
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = BTreeSet::new();
        while let Some(cell) = board.pick_target(&mut rng) {
            assert!(seen.insert(cell), "cell {cell} picked twice");
        }
        assert_eq!(seen.len(), 9);
    }

    #[test]
    fn test_commit_rejects_repeat_and_out_of_bounds() {
        let mut board = Board::new(2);
        assert!(board.commit(Cell::new(1, 1)));
        assert!(!board.commit(Cell::new(1, 1)));
        assert!(!board.commit(Cell::new(2, 0)));
        assert_eq!(board.unvisited_cells().len(), 3);
    }
}
