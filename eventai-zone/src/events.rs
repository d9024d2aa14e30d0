//! World events a zone routes into controller hooks.
//!
//! The host turns its own combat log, chat and movement notifications
//! into [`ZoneEvent`]s; [`crate::zone::Zone::handle`] does the rest.

use eventai_core::types::{EntityId, QuestId, SchoolMask, SpellId};
use eventai_core::world::CastOutcome;

/// Something that happened in the zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoneEvent {
    /// `dealer` hit `target` for `amount`.
    Damage {
        /// Attacker.
        dealer: EntityId,
        /// Unit hit.
        target: EntityId,
        /// Damage before invincibility clamping.
        amount: u32,
    },
    /// `healer` restored `amount` health to `target`.
    Heal {
        /// Healer.
        healer: EntityId,
        /// Unit healed.
        target: EntityId,
        /// Health restored.
        amount: u32,
    },
    /// `unit` died.
    Died {
        /// The dead unit.
        unit: EntityId,
        /// Killer, if any.
        killer: Option<EntityId>,
    },
    /// `actor` was pulled into combat by `enemy`.
    CombatStarted {
        /// The creature.
        actor: EntityId,
        /// Who started it.
        enemy: EntityId,
    },
    /// `actor` gave up the fight.
    Evade {
        /// The creature.
        actor: EntityId,
    },
    /// `unit` came back to life.
    Respawned {
        /// The creature.
        unit: EntityId,
    },
    /// A spell hit `target`.
    SpellHit {
        /// Caster.
        caster: EntityId,
        /// Unit hit.
        target: EntityId,
        /// Spell.
        spell: SpellId,
        /// Spell school.
        school: SchoolMask,
    },
    /// A cast started by `caster` ended.
    CastFinished {
        /// Caster.
        caster: EntityId,
        /// Spell.
        spell: SpellId,
        /// How it ended.
        outcome: CastOutcome,
    },
    /// `player` emoted at `target`.
    Emote {
        /// Player.
        player: EntityId,
        /// Creature emoted at.
        target: EntityId,
        /// Emote id.
        emote: u32,
    },
    /// `observer` noticed `who` moving nearby.
    Sighted {
        /// The creature.
        observer: EntityId,
        /// The unit it saw.
        who: EntityId,
    },
    /// `actor` reached a waypoint.
    ReachedWaypoint {
        /// The creature.
        actor: EntityId,
    },
    /// `actor` is back home after evading.
    ReachedHome {
        /// The creature.
        actor: EntityId,
    },
    /// `player` took `quest` from `giver`.
    QuestAccepted {
        /// Player.
        player: EntityId,
        /// Quest giver.
        giver: EntityId,
        /// Quest.
        quest: QuestId,
    },
    /// `player` turned in `quest` at `giver`.
    QuestCompleted {
        /// Player.
        player: EntityId,
        /// Quest giver.
        giver: EntityId,
        /// Quest.
        quest: QuestId,
    },
}

impl ZoneEvent {
    /// The unit whose controller handles the event first.
    #[must_use]
    pub const fn subject(&self) -> EntityId {
        match *self {
            Self::Damage { target, .. }
            | Self::Heal { target, .. }
            | Self::SpellHit { target, .. }
            | Self::Emote { target, .. } => target,
            Self::Died { unit, .. } | Self::Respawned { unit } => unit,
            Self::CombatStarted { actor, .. }
            | Self::Evade { actor }
            | Self::ReachedWaypoint { actor }
            | Self::ReachedHome { actor } => actor,
            Self::CastFinished { caster, .. } => caster,
            Self::Sighted { observer, .. } => observer,
            Self::QuestAccepted { giver, .. } | Self::QuestCompleted { giver, .. } => giver,
        }
    }
}
