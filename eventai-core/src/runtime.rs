//! Per-actor runtime state for each event definition.
//!
//! An [`EventRuntime`] moves between three states:
//!
//! ```text
//!   Disabled ── lifecycle re-enable ──▶ Armed (enabled, time == 0)
//!      ▲                                  │ fires, arms cooldown
//!      │ non-repeatable fired             ▼
//!      └──────────────────────────── Cooling (enabled, time > 0)
//!                                         │ countdown reaches 0
//!                                         └──▶ Armed
//! ```
//!
//! A runtime whose configuration is broken (inverted bounds, zero chance,
//! unsupported type) is latched as *faulted*: it stays disabled through
//! every lifecycle reset, so the fault is reported once.

use std::sync::Arc;

use rand::Rng;
use tracing::debug;

use crate::error::Fault;
use crate::event::{EventCondition, EventDefinition, EventFlags, RepeatBounds};
use crate::store::EventStore;
use crate::types::{Difficulty, TemplateId};

/// Mutable state pairing one definition with its enable flag and countdown.
#[derive(Debug, Clone)]
pub struct EventRuntime {
    definition: Arc<EventDefinition>,
    pub(crate) enabled: bool,
    pub(crate) time_remaining: u32,
    pub(crate) faulted: bool,
}

impl EventRuntime {
    /// A fresh, armed runtime.
    #[must_use]
    pub fn new(definition: Arc<EventDefinition>) -> Self {
        Self {
            definition,
            enabled: true,
            time_remaining: 0,
            faulted: false,
        }
    }

    /// The shared definition.
    #[must_use]
    pub fn definition(&self) -> &EventDefinition {
        &self.definition
    }

    /// A new handle to the shared definition.
    #[must_use]
    pub fn shared_definition(&self) -> Arc<EventDefinition> {
        Arc::clone(&self.definition)
    }

    /// Whether the runtime may fire at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Remaining cooldown (ms). Only meaningful while enabled.
    #[must_use]
    pub const fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Whether a configuration fault disabled this runtime for good.
    #[must_use]
    pub const fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Enabled with no cooldown left.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.enabled && self.time_remaining == 0
    }

    /// Enabled and counting down.
    #[must_use]
    pub const fn is_cooling(&self) -> bool {
        self.enabled && self.time_remaining > 0
    }

    /// Re-enable unless faulted.
    pub(crate) fn enable(&mut self) {
        if !self.faulted {
            self.enabled = true;
        }
    }

    /// Disable after a non-repeatable firing.
    pub(crate) fn disable(&mut self) {
        self.enabled = false;
    }

    /// Latch a configuration fault.
    pub(crate) fn latch_fault(&mut self) {
        self.enabled = false;
        self.faulted = true;
    }

    /// Draw a countdown from `bounds`. Inverted bounds latch a fault and
    /// return it for reporting; the timer is left untouched.
    pub(crate) fn arm<R: Rng + ?Sized>(
        &mut self,
        bounds: RepeatBounds,
        rng: &mut R,
    ) -> Result<(), Fault> {
        if bounds.min == bounds.max {
            self.time_remaining = bounds.min;
            Ok(())
        } else if bounds.max > bounds.min {
            self.time_remaining = rng.gen_range(bounds.min..=bounds.max);
            Ok(())
        } else {
            self.latch_fault();
            Err(Fault::InvertedTimerBounds {
                event: self.definition.id,
                min: bounds.min,
                max: bounds.max,
            })
        }
    }

    /// Count down by `elapsed`, clamping at zero.
    pub(crate) fn advance(&mut self, elapsed: u32) {
        self.time_remaining = self.time_remaining.saturating_sub(elapsed);
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// What the current world configuration admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildContext {
    /// Admit debug-only definitions.
    pub debug_build: bool,
    /// Instance difficulty; `None` outside instances.
    pub difficulty: Option<Difficulty>,
}

impl BuildContext {
    /// Whether a definition may be loaded under this context.
    #[must_use]
    pub fn admits(&self, def: &EventDefinition) -> bool {
        if def.flags.contains(EventFlags::DEBUG_ONLY) && !self.debug_build {
            return false;
        }
        let difficulty_flags = EventFlags::NORMAL | EventFlags::HEROIC;
        match self.difficulty {
            Some(_) if !def.flags.intersects(difficulty_flags) => true,
            Some(Difficulty::Normal) => def.flags.contains(EventFlags::NORMAL),
            Some(Difficulty::Heroic) => def.flags.contains(EventFlags::HEROIC),
            None => true,
        }
    }
}

/// The runtime list for one actor, plus anything noticed while building it.
#[derive(Debug, Default)]
pub struct RuntimeList {
    /// Runtimes in definition order.
    pub entries: Vec<EventRuntime>,
    /// Whether any out-of-combat line-of-sight event survived filtering.
    pub has_ooc_los_event: bool,
    /// Configuration faults to report.
    pub faults: Vec<Fault>,
}

/// Build the runtime list for an actor of `template`.
#[must_use]
pub fn build(template: TemplateId, store: &dyn EventStore, ctx: &BuildContext) -> RuntimeList {
    let Some(defs) = store.definitions(template) else {
        return RuntimeList {
            faults: vec![Fault::NoEventsForTemplate { template }],
            ..RuntimeList::default()
        };
    };

    let mut list = RuntimeList::default();
    for def in defs.iter().filter(|d| ctx.admits(d)) {
        let mut runtime = EventRuntime::new(Arc::clone(def));

        if def.chance == 0 || def.chance > 100 {
            list.faults.push(Fault::ChanceOutOfRange {
                event: def.id,
                chance: def.chance,
            });
            // Above 100 behaves like 100; zero would never run.
            if def.chance == 0 {
                runtime.latch_fault();
            }
        }
        if let EventCondition::Unsupported { raw_type } = def.condition {
            list.faults.push(Fault::UnsupportedEventType {
                event: def.id,
                raw_type,
            });
            runtime.latch_fault();
        }
        if matches!(def.condition, EventCondition::OutOfCombatLos { .. }) {
            list.has_ooc_los_event = true;
        }
        list.entries.push(runtime);
    }

    if list.entries.is_empty() && !defs.is_empty() {
        list.faults.push(Fault::NoEventsAfterFilter { template });
    }
    debug!(
        template = %template,
        loaded = list.entries.len(),
        stored = defs.len(),
        "built event runtime list"
    );
    list
}
