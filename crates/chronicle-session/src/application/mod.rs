//! Application services for the Session & Turn context.

pub mod barrier;
pub mod lifecycle;
pub mod retry;
