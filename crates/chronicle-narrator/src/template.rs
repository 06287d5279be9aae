//! Template-bank narrative composition.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use chronicle_core::error::DomainError;
use chronicle_core::narrator::{NarratorService, SessionContext};
use chronicle_core::rng::DeterministicRng;
use chronicle_core::turn::Action;

/// Concrete, sensory opening hooks. Each completes "Suddenly, ...".
const HOOKS: &[&str] = &[
    "a strange golden mist thins ahead of you, revealing an alley that was not there before.",
    "hoofbeats close in fast along the dusty road.",
    "a breathless messenger presses a sealed letter into your hands.",
    "a rumor drifts across the taproom about a freshly uncovered ruin in the nearby forest.",
    "the sky darkens without warning as something vast passes overhead, blotting out the sun for a heartbeat.",
];

/// Ambient detail lines engaging the senses.
const AMBIENT_DETAILS: &[&str] = &[
    "The air carries the smell of recent rain and spices from a nearby market.",
    "A cold breeze sweeps the street, setting dry leaves dancing.",
    "The setting sun paints the clouds orange and violet.",
    "Torches crackle along the walls, throwing restless shadows across the stone.",
    "Somewhere below, a river murmurs its promise of fresh water.",
];

/// Transitions that keep consequence prose focused on the immediate.
const TRANSITIONS: &[&str] = &[
    "As the group moves, the world around it answers.",
    "Your coordinated actions take immediate effect.",
    "The sound of your efforts draws attention.",
    "The dust settles and the immediate consequences become clear.",
];

/// Concrete consequence lines.
const CONSEQUENCE_NOTES: &[&str] = &[
    "A heavy crash echoes in the distance, like stone sliding over stone.",
    "The air turns suddenly colder, and a shadow slips along the edge of your vision.",
    "A door that was locked a moment ago creaks slowly open.",
    "The ground trembles briefly, shaking loose objects from a nearby shelf.",
];

/// Closing lines that hand the scene back to the participants.
const CONTINUATIONS: &[&str] = &[
    "A watchful silence falls over the group.",
    "The scene has changed, and a new set of choices presents itself.",
    "The immediate result of your actions leaves a question hanging in the air.",
];

/// A narrator composing prose from fixed template banks.
///
/// Randomness is injected through `DeterministicRng` so tests can pin the
/// chosen lines. The `Mutex` is locked only around the synchronous pick,
/// never across an await point.
pub struct TemplateNarrator {
    rng: Mutex<Box<dyn DeterministicRng>>,
}

impl TemplateNarrator {
    /// Creates a template narrator drawing from the given RNG.
    #[must_use]
    pub fn new(rng: Box<dyn DeterministicRng>) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn pick(&self, options: &[&'static str]) -> Result<&'static str, DomainError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
        let index = rng.next_u32_range(0, (options.len() - 1) as u32) as usize;
        Ok(options[index])
    }
}

#[async_trait]
impl NarratorService for TemplateNarrator {
    async fn open_situation(&self, context: &SessionContext) -> Result<String, DomainError> {
        let roster = context.roster.join(", ");
        let ambient = self.pick(AMBIENT_DETAILS)?;

        if context.turn_number <= 1 {
            let hook = self.pick(HOOKS)?;
            return Ok(format!(
                "**{roster}**, you are together when you notice something: {ambient}\n\n\
                 Suddenly, {hook}\n\nWhat do you do?"
            ));
        }

        Ok(format!(
            "**Turn {}**\n\n{ambient}\n\n**{roster}**, what do you do now?",
            context.turn_number
        ))
    }

    async fn resolve_consequences(
        &self,
        context: &SessionContext,
        actions: &BTreeMap<String, Action>,
    ) -> Result<String, DomainError> {
        let transition = self.pick(TRANSITIONS)?;
        let note = self.pick(CONSEQUENCE_NOTES)?;
        let continuation = self.pick(CONTINUATIONS)?;

        let action_lines: Vec<String> = actions
            .values()
            .map(|action| format!("  - **{}**: {}", action.participant, action.text))
            .collect();

        Ok(format!(
            "**Turn {} — Consequences**\n\n{transition}\n{}\n\n{note} {continuation}\n\nWhat do you do?",
            context.turn_number,
            action_lines.join("\n")
        ))
    }
}
