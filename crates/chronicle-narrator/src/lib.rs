//! Chronicle Engine — template-bank narrator.
//!
//! A `NarratorService` that composes serviceable prose from small banks
//! of hooks, ambient details, and consequence lines. It never calls out
//! of process, so it doubles as the fallback narrator that keeps the
//! turn barrier moving when a richer collaborator is down.

mod rng;
mod template;

pub use rng::ThreadRng;
pub use template::TemplateNarrator;
