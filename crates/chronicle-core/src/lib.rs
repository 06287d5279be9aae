//! Chronicle Core — shared domain types and abstractions.
//!
//! This crate defines the session/turn data model, the ports the engine
//! talks through (`SessionStore`, `NarratorService`), and the determinism
//! abstractions (`Clock`, `DeterministicRng`). It contains no
//! infrastructure code.

pub mod clock;
pub mod error;
pub mod narrator;
pub mod rng;
pub mod session;
pub mod store;
pub mod turn;
