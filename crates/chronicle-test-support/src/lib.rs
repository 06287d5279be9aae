//! Shared test doubles for the Chronicle engine.

mod clock;
mod narrator;
mod rng;
mod store;

pub use clock::FixedClock;
pub use narrator::{FailingNarrator, ScriptedNarrator};
pub use rng::{MockRng, SequenceRng};
pub use store::ConflictingSessionStore;
