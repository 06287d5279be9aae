//! Chronicle Engine — Session & Turn bounded context.
//!
//! Coordinates a turn-based storytelling session: the lifecycle manager
//! owns session state transitions, the turn barrier collects exactly one
//! action per participant and releases exactly once when the roster is
//! complete, and the classifier routes inbound text by session mode.

pub mod application;
pub mod domain;
