//! Random number generator abstraction for determinism.
//!
//! The template narrator picks its prose fragments at random. In
//! production that randomness comes from a real RNG; tests inject a
//! scripted implementation so narrative output is reproducible.

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;
}
