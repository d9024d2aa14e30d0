//! Event store — the source of immutable event definitions.
//!
//! The engine never loads or validates scripts itself. A store is handed to
//! each actor at construction and queried for the actor's template. Stores
//! must be side-effect free: asking twice returns the same definitions.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::event::EventDefinition;
use crate::types::{Location, TemplateId};

/// A stored summon position, used by the summon-by-id actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummonSpawn {
    /// Where the summon appears.
    pub position: Location,
    /// Facing, in radians.
    pub orientation: f32,
    /// Despawn delay once out of combat or dead (seconds); 0 despawns
    /// only when leaving combat.
    pub despawn_secs: u32,
}

/// Read-only access to published event definitions.
pub trait EventStore: Send + Sync {
    /// Definitions for a template in declaration order, or `None` when the
    /// store has no entry for it at all.
    fn definitions(&self, template: TemplateId) -> Option<&[Arc<EventDefinition>]>;

    /// Look up a stored summon position.
    fn summon_spawn(&self, id: u32) -> Option<SummonSpawn>;
}

/// A store that holds everything in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    events: HashMap<TemplateId, Vec<Arc<EventDefinition>>>,
    summons: HashMap<u32, SummonSpawn>,
}

impl InMemoryEventStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from definitions, grouping by template and keeping
    /// the order they were given in.
    #[must_use]
    pub fn from_definitions(defs: impl IntoIterator<Item = EventDefinition>) -> Self {
        let mut store = Self::new();
        for def in defs {
            store.insert(def);
        }
        store
    }

    /// Append one definition to its template's list.
    pub fn insert(&mut self, def: EventDefinition) {
        self.events.entry(def.template).or_default().push(Arc::new(def));
    }

    /// Register a summon position.
    pub fn insert_summon(&mut self, id: u32, spawn: SummonSpawn) {
        self.summons.insert(id, spawn);
    }

    /// Number of templates with at least one definition.
    #[must_use]
    pub fn template_count(&self) -> usize {
        self.events.len()
    }
}

impl EventStore for InMemoryEventStore {
    fn definitions(&self, template: TemplateId) -> Option<&[Arc<EventDefinition>]> {
        self.events.get(&template).map(Vec::as_slice)
    }

    fn summon_spawn(&self, id: u32) -> Option<SummonSpawn> {
        self.summons.get(&id).copied()
    }
}
