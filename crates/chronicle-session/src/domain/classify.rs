//! Mode & command classification for inbound text.
//!
//! A pure function of `(mode, text)`: no lookups, no side effects. The
//! HTTP layer and the tests both route through it, so mode enforcement
//! cannot drift between the two.

use serde::Serialize;

use chronicle_core::session::Mode;

/// How a piece of inbound text should be routed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    /// A slash command issued during configuration, e.g. `/npc Mirela`.
    ConfigCommand {
        /// Command name, lowercased, without the slash.
        name: String,
        /// Everything after the command name, trimmed.
        args: String,
    },
    /// Free-form preparation text during configuration; routed to the
    /// configuration assistant.
    ConfigQuestion {
        /// The question text.
        text: String,
    },
    /// An in-character action during play; forwarded to the turn barrier.
    GameAction {
        /// The action text.
        text: String,
    },
    /// Input that is not acceptable in the current mode.
    Rejected {
        /// Why the input was rejected.
        reason: String,
    },
}

/// Classifies inbound text against the session's current mode.
#[must_use]
pub fn classify(mode: Mode, text: &str) -> Classification {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Classification::Rejected {
            reason: "empty input".to_owned(),
        };
    }

    if let Some(command) = trimmed.strip_prefix('/') {
        return match mode {
            Mode::Configuration => {
                let mut parts = command.splitn(2, char::is_whitespace);
                let name = parts.next().unwrap_or_default();
                if name.is_empty() {
                    return Classification::Rejected {
                        reason: "slash command is missing a name".to_owned(),
                    };
                }
                Classification::ConfigCommand {
                    name: name.to_lowercase(),
                    args: parts.next().unwrap_or_default().trim().to_owned(),
                }
            }
            Mode::Game => Classification::Rejected {
                reason: "configuration commands are unavailable during play; \
                         pause the session to return to configuration"
                    .to_owned(),
            },
        };
    }

    match mode {
        Mode::Configuration => Classification::ConfigQuestion {
            text: trimmed.to_owned(),
        },
        Mode::Game => Classification::GameAction {
            text: trimmed.to_owned(),
        },
    }
}
