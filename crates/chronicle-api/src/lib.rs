//! Chronicle Engine — HTTP API library surface.
//!
//! Exposed so integration tests can build the exact router the binary
//! serves.

pub mod error;
pub mod routes;
pub mod state;
