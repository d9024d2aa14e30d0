//! Operator-facing summary of a controller's state.
//!
//! Used for inspection commands, never for automated control.

use std::fmt;

use serde::Serialize;

use crate::engine::EventAi;
use crate::error::{EventAiError, Result};
use crate::types::{EventId, TemplateId};

/// Snapshot returned by [`EventAi::information`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiInformation {
    /// Template the controller runs.
    pub template: TemplateId,
    /// Current phase.
    pub phase: u8,
    /// Combat movement on.
    pub combat_movement: bool,
    /// Melee swings on.
    pub melee: bool,
    /// Per-event listing; `None` in restricted mode.
    pub events: Option<Vec<EventSummary>>,
}

/// One line of the event listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    /// Event id.
    pub id: EventId,
    /// Event type code.
    pub kind: u32,
    /// Whether the runtime may fire.
    pub enabled: bool,
    /// Remaining cooldown, whole seconds.
    pub cooldown_secs: u32,
    /// `type(param)` for every filled action slot.
    pub actions: Vec<String>,
}

impl AiInformation {
    /// Render as JSON.
    ///
    /// # Errors
    /// Returns `EventAiError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EventAiError::Serialization(e.to_string()))
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

impl fmt::Display for AiInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Template {}", self.template)?;
        writeln!(f, "Phase: {}", self.phase)?;
        writeln!(f, "Combat movement: {}", on_off(self.combat_movement))?;
        writeln!(f, "Melee: {}", on_off(self.melee))?;
        let Some(events) = &self.events else {
            return Ok(());
        };
        writeln!(f, "Current events:")?;
        for event in events {
            writeln!(
                f,
                "{} Type{:3} ({}) Timer({:3}s) actions[type(param1)]: {}",
                event.id,
                event.kind,
                if event.enabled { "On" } else { "Off" },
                event.cooldown_secs,
                event.actions.join("  --  ")
            )?;
        }
        Ok(())
    }
}

impl EventAi {
    /// Summarise the controller for an operator.
    #[must_use]
    pub fn information(&self) -> AiInformation {
        let events = (!self.config.diagnostics.restricted).then(|| {
            self.runtimes
                .iter()
                .map(|runtime| {
                    let def = runtime.definition();
                    EventSummary {
                        id: def.id,
                        kind: def.condition.type_code(),
                        enabled: runtime.is_enabled(),
                        cooldown_secs: runtime.time_remaining() / 1000,
                        actions: def.filled_actions().map(ToString::to_string).collect(),
                    }
                })
                .collect()
        });
        AiInformation {
            template: self.template,
            phase: self.phase.value(),
            combat_movement: self.combat_movement.is_enabled(),
            melee: self.melee_enabled,
            events,
        }
    }
}
