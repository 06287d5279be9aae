//! Production RNG backed by `rand`.

use chronicle_core::rng::DeterministicRng;
use rand::Rng;

/// `DeterministicRng` implementation over the thread-local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRng;

impl DeterministicRng for ThreadRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        rand::rng().random_range(min..=max)
    }
}
