//! Error types for the event engine.
//!
//! Two families live here. [`EventAiError`] is returned by fallible setup
//! operations (loading configuration). [`Fault`] describes conditions the
//! engine reports and recovers from while running: it is never returned
//! to callers, only logged and counted.

use thiserror::Error;

use crate::action::TargetSelector;
use crate::types::{EntityId, EventId, TemplateId};

/// Top-level error type for fallible engine setup.
#[derive(Error, Debug)]
pub enum EventAiError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, EventAiError>;

/// A reported, locally recovered runtime condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    /// The store has no entry at all for a template that asked for scripts.
    #[error("event map for template {template} is empty")]
    NoEventsForTemplate {
        /// The template.
        template: TemplateId,
    },

    /// The store had events but every one was filtered out.
    #[error("template {template} has events but none apply to this build or difficulty")]
    NoEventsAfterFilter {
        /// The template.
        template: TemplateId,
    },

    /// Repeat bounds with `max < min`; the event is disabled for good.
    #[error("event {event} has inverted timer bounds ({min}ms > {max}ms), event disabled")]
    InvertedTimerBounds {
        /// The event.
        event: EventId,
        /// Configured minimum.
        min: u32,
        /// Configured maximum.
        max: u32,
    },

    /// Chance of 0 (never runs) or above 100.
    #[error("event {event} has invalid chance {chance}")]
    ChanceOutOfRange {
        /// The event.
        event: EventId,
        /// Configured chance.
        chance: u8,
    },

    /// The loader handed over a placeholder for an unknown event tag.
    #[error("event {event} has unsupported event type {raw_type}")]
    UnsupportedEventType {
        /// The event.
        event: EventId,
        /// The stored tag.
        raw_type: u32,
    },

    /// A phase change asked for a value outside `0..32`; it was clamped.
    #[error("event {event} requested phase {requested}, clamped to {applied}")]
    PhaseOutOfRange {
        /// The event.
        event: EventId,
        /// Requested phase.
        requested: i64,
        /// Phase actually applied.
        applied: u8,
    },

    /// Random phase range with `max <= min`.
    #[error("event {event} random phase range {min}..{max} is empty")]
    EmptyPhaseRange {
        /// The event.
        event: EventId,
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },

    /// A target selector that must resolve did not.
    #[error("event {event} action {action}: no target for selector {selector:?}")]
    TargetUnresolved {
        /// The event.
        event: EventId,
        /// Action type code.
        action: u32,
        /// The selector.
        selector: TargetSelector,
    },

    /// The world refused to display a text.
    #[error("event {event} failed to display text {text}")]
    TextNotDisplayed {
        /// The event.
        event: EventId,
        /// Text id.
        text: i32,
    },

    /// An instance write without instance context.
    #[error("event {event} wrote instance data outside an instance")]
    NoInstanceContext {
        /// The event.
        event: EventId,
    },

    /// A summon referenced a spawn position the store doesn't have.
    #[error("event {event} references unknown summon position {spawn}")]
    UnknownSummonSpawn {
        /// The event.
        event: EventId,
        /// Spawn key.
        spawn: u32,
    },

    /// The world failed to create a summon.
    #[error("event {event} failed to summon template {template}")]
    SummonFailed {
        /// The event.
        event: EventId,
        /// Template summoned.
        template: TemplateId,
    },

    /// A template reference the world doesn't know.
    #[error("event {event} references unknown template {template}")]
    UnknownTemplate {
        /// The event.
        event: EventId,
        /// Template.
        template: TemplateId,
    },

    /// Update-template to the actor's current template.
    #[error("event {event} updates template to the current template {template}")]
    TemplateUnchanged {
        /// The event.
        event: EventId,
        /// Template.
        template: TemplateId,
    },

    /// Die action on an already dead actor.
    #[error("event {event} kills an actor that is already dead")]
    AlreadyDead {
        /// The event.
        event: EventId,
    },

    /// A creature referenced by identity could not be found.
    #[error("event {event} cannot find creature {entity}")]
    UnknownCreature {
        /// The event.
        event: EventId,
        /// The missing creature.
        entity: EntityId,
    },
}

impl Fault {
    /// Whether this fault is a target resolution failure rather than a
    /// configuration or context problem.
    #[must_use]
    pub const fn is_target_failure(&self) -> bool {
        matches!(self, Self::TargetUnresolved { .. })
    }
}
