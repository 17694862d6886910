//! Deterministic per-cell random service
//!
//! Random draws are keyed by a cell's position and a caller-supplied offset,
//! so a pass that advances its offset in a fixed order is reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::cell::GridCell;

/// Source of reproducible random numbers keyed by cell and offset
pub trait CellRandom {
    /// Uniform integer in `0..max`; returns 0 when `max` is 0
    fn next_random_int(&self, cell: &GridCell, offset: u32, max: u32) -> u32;

    /// Uniform float in `[0, 1)`
    fn next_random_float(&self, cell: &GridCell, offset: u32) -> f32;
}

/// Default random service: one ChaCha8 stream per `(seed, cell, offset)` key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededCellRandom {
    seed: u64,
}

impl SeededCellRandom {
    /// Create a service from a world seed
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The world seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn stream(&self, cell: &GridCell, offset: u32) -> ChaCha8Rng {
        let mut key = self.seed ^ 0x9E37_79B9_7F4A_7C15;
        for part in [cell.longitude as u64, cell.latitude as u64, offset as u64] {
            key = key.rotate_left(23) ^ part;
            key = key.wrapping_mul(0xBF58_476D_1CE4_E5B9);
        }
        ChaCha8Rng::seed_from_u64(key)
    }
}

impl CellRandom for SeededCellRandom {
    fn next_random_int(&self, cell: &GridCell, offset: u32, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.stream(cell, offset).gen_range(0..max)
    }

    fn next_random_float(&self, cell: &GridCell, offset: u32) -> f32 {
        self.stream(cell, offset).gen::<f32>()
    }
}
