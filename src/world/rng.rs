use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded random number generator for deterministic simulation.
///
/// When a seed is provided (e.g., via scenario config), the same seed will
/// always produce the same crit and evasion rolls. Without a seed, uses system
/// entropy.
#[derive(Resource, Debug)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Random f32 in [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Roll against a probability. Never rolls (and never succeeds) for `p <= 0`.
    pub fn roll(&mut self, probability: f32) -> bool {
        probability > 0.0 && self.random_f32() < probability
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
