//! Seeded random number generation for request scripts.
//!
//! Every random draw in a campaign goes through a [`SimRandom`], so a seed
//! pins down the whole stream. The campaign owns one instance seeded from
//! the configured seed and derives a fresh per-trial seed from it; each
//! request script is then generated from its own trial-seeded instance.

use std::ops::{Range, RangeInclusive};

use rand::distr::uniform::SampleUniform;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic random source backed by ChaCha8.
#[derive(Clone)]
pub struct SimRandom {
    rng: ChaCha8Rng,
    seed: u64,
}

impl SimRandom {
    /// Create a random source from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// The seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform value in `start..end`. The range must not be empty.
    pub fn random_range<T>(&mut self, range: Range<T>) -> T
    where
        T: SampleUniform + PartialOrd,
    {
        self.rng.random_range(range)
    }

    /// Uniform value in `start..=end`.
    pub fn random_inclusive<T>(&mut self, range: RangeInclusive<T>) -> T
    where
        T: SampleUniform + PartialOrd,
    {
        self.rng.random_range(range)
    }

    /// Draw a seed for a derived random source.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.random::<u64>()
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Returns `None` when every weight is zero.
    pub fn pick_weighted(&mut self, weights: &[u32]) -> Option<usize> {
        let total: u32 = weights.iter().sum();
        if total == 0 {
            return None;
        }
        let roll = self.random_range(0..total);

        let mut cumulative = 0;
        for (index, weight) in weights.iter().enumerate() {
            cumulative += weight;
            if roll < cumulative {
                return Some(index);
            }
        }
        None
    }
}
