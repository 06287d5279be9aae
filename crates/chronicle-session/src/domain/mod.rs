//! Domain logic for the Session & Turn context.

pub mod classify;
