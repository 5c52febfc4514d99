//! Seedable random source for agent decisions.
//!
//! Every random choice an agent makes (heal target tie-breaks, loadout
//! picks, movement jitter) draws from its own `BotRng`, so a whole party can
//! be replayed exactly from one seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct BotRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl BotRng {
    /// Create a new BotRng with a specific seed for deterministic behavior
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new BotRng with random entropy (non-deterministic)
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn random_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    pub fn random_bool(&mut self) -> bool {
        self.rng.gen()
    }
}

impl Default for BotRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = BotRng::from_seed(42);
        let mut b = BotRng::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.random_f32(), b.random_f32());
        }
    }

    #[test]
    fn test_random_range_bounds() {
        let mut rng = BotRng::from_seed(7);
        for _ in 0..200 {
            let value = rng.random_range(2.0, 4.0);
            assert!((2.0..4.0).contains(&value), "{} out of range", value);
        }
    }
}
