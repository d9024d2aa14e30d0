//! Action effects and target selectors.
//!
//! Every action slot on an event holds one [`ActionEffect`]. Actions that
//! act on another unit carry a [`TargetSelector`], resolved only when the
//! action runs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::{SignalKind, SignalMask};
use crate::types::{EntityId, QuestId, SpellId, TemplateId};

// ---------------------------------------------------------------------------
// Target selectors
// ---------------------------------------------------------------------------

/// Symbolic reference to a unit, resolved when the action runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSelector {
    /// The actor itself.
    SelfActor,
    /// Current victim (top of the threat list).
    Victim,
    /// Second entry of the threat list.
    SecondAggro,
    /// Last entry of the threat list.
    LastAggro,
    /// Any threat-list entry.
    RandomHostile,
    /// Any threat-list entry except the top one.
    RandomHostileNotTop,
    /// The unit that caused the event.
    Invoker,
    /// The invoker's charmer or owner, falling back to the invoker.
    InvokerOwner,
    /// Any player on the threat list.
    RandomPlayer,
    /// Any player on the threat list except the top entry.
    RandomPlayerNotTop,
    /// The actor that threw the received signal.
    Sender,
}

impl TargetSelector {
    /// Numeric code, as stored by the loader.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::SelfActor => 0,
            Self::Victim => 1,
            Self::SecondAggro => 2,
            Self::LastAggro => 3,
            Self::RandomHostile => 4,
            Self::RandomHostileNotTop => 5,
            Self::Invoker => 6,
            Self::InvokerOwner => 7,
            Self::RandomPlayer => 8,
            Self::RandomPlayerNotTop => 9,
            Self::Sender => 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// Flags modifying how a cast action behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CastFlags(u32);

impl CastFlags {
    /// Interrupt any spell currently being cast.
    pub const INTERRUPT_PREVIOUS: Self = Self(0x01);
    /// Cast without cost or cast time.
    pub const TRIGGERED: Self = Self(0x02);
    /// Ignore range, line-of-sight and power checks.
    pub const FORCE_CAST: Self = Self(0x04);
    /// Do not fall back to melee chasing when the cast cannot happen.
    pub const NO_MELEE_IF_OOM: Self = Self(0x08);
    /// The resolved target casts the spell on itself.
    pub const FORCE_TARGET_SELF: Self = Self(0x10);
    /// Only cast when the target lacks the spell's aura.
    pub const AURA_NOT_PRESENT: Self = Self(0x20);

    /// No flags.
    pub const NONE: Self = Self(0);

    /// Build from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Whether any bit of `other` is set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for CastFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Display model source for morph and mount actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelRef {
    /// Restore the default (demorph / dismount).
    Reset,
    /// Use a display chosen from another creature template.
    Template(TemplateId),
    /// Use this model id directly.
    Model(u32),
}

/// How an invincibility floor is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvincibilityLevel {
    /// Absolute health value.
    Flat(u32),
    /// Percent of maximum health.
    PercentOfMax(u32),
}

/// Movement generator selected by the change-movement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    /// Stand still.
    Idle,
    /// Wander around the current position.
    Random,
    /// Follow the creature's waypoint path.
    Waypoint,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// One side-effecting action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEffect {
    /// Say one of up to three texts. Zero entries are empty.
    Text {
        /// Text ids.
        texts: [i32; 3],
    },
    /// Apply a temporary faction; faction 0 restores the default.
    SetFaction {
        /// Faction id.
        faction: u32,
        /// Temporary-faction flags.
        flags: u32,
    },
    /// Change the display model.
    Morph(ModelRef),
    /// Play a sound.
    Sound {
        /// Sound id.
        sound: u32,
    },
    /// Play an emote.
    Emote {
        /// Emote id.
        emote: u32,
    },
    /// Play one of three sounds; a negative entry plays nothing.
    RandomSound {
        /// Candidate sound ids.
        sounds: [i32; 3],
    },
    /// Play one of three emotes; a negative entry plays nothing.
    RandomEmote {
        /// Candidate emote ids.
        emotes: [i32; 3],
    },
    /// Cast a spell.
    Cast {
        /// Spell to cast.
        spell: SpellId,
        /// Who to cast it on.
        target: TargetSelector,
        /// Cast modifiers.
        flags: CastFlags,
    },
    /// Summon a creature at the actor's position.
    Summon {
        /// Creature template.
        template: TemplateId,
        /// Unit the summon attacks (ignored for self).
        target: TargetSelector,
        /// Lifetime in ms; 0 means until out of combat.
        duration_ms: u32,
    },
    /// Scale one unit's threat by a percentage.
    ThreatSinglePct {
        /// Percent change.
        percent: i32,
        /// Whose threat.
        target: TargetSelector,
    },
    /// Scale every threat-list entry by a percentage.
    ThreatAllPct {
        /// Percent change.
        percent: i32,
    },
    /// Credit a quest objective to a player.
    QuestEvent {
        /// Quest to credit.
        quest: QuestId,
        /// The player.
        target: TargetSelector,
    },
    /// Credit a spell-cast objective to a player.
    CastEvent {
        /// Creature credited.
        creature: TemplateId,
        /// Spell credited.
        spell: SpellId,
        /// The player.
        target: TargetSelector,
    },
    /// Write a raw unit field.
    SetUnitField {
        /// Field index.
        field: u32,
        /// Value.
        value: u32,
        /// Unit written.
        target: TargetSelector,
    },
    /// Set unit flags.
    SetUnitFlag {
        /// Flags to set.
        flags: u32,
        /// Unit affected.
        target: TargetSelector,
    },
    /// Clear unit flags.
    RemoveUnitFlag {
        /// Flags to clear.
        flags: u32,
        /// Unit affected.
        target: TargetSelector,
    },
    /// Toggle melee swings.
    AutoAttack {
        /// Whether melee is allowed.
        enabled: bool,
    },
    /// Toggle script-requested combat movement.
    CombatMovement {
        /// Whether the actor should chase its victim.
        enabled: bool,
        /// Also start or stop the melee swing animation.
        toggle_melee: bool,
    },
    /// Set the phase.
    SetPhase {
        /// New phase; values at or above 32 are clamped.
        phase: u32,
    },
    /// Add to the phase; may be negative.
    IncPhase {
        /// Amount to add.
        delta: i32,
    },
    /// Leave combat and return home.
    Evade,
    /// Run to nearby allies for help.
    FleeForAssist,
    /// Credit a quest to the invoking player's group.
    QuestEventAll {
        /// Quest credited.
        quest: QuestId,
    },
    /// Credit a spell-cast objective to every player on the threat list.
    CastEventAll {
        /// Creature credited.
        creature: TemplateId,
        /// Spell credited.
        spell: SpellId,
    },
    /// Strip all auras of one spell.
    RemoveAurasFromSpell {
        /// Unit affected.
        target: TargetSelector,
        /// Spell whose auras are removed.
        spell: SpellId,
    },
    /// Keep the given distance and angle while chasing.
    RangedMovement {
        /// Chase distance.
        distance: f32,
        /// Chase angle in degrees.
        angle_degrees: f32,
    },
    /// Set the phase to one of three values.
    RandomPhase {
        /// Candidate phases.
        phases: [u32; 3],
    },
    /// Set the phase to a value in `min..max`.
    RandomPhaseRange {
        /// Lowest phase.
        min: u32,
        /// One past the highest phase.
        max: u32,
    },
    /// Summon a creature at a stored spawn position.
    SummonId {
        /// Creature template.
        template: TemplateId,
        /// Unit the summon attacks (ignored for self).
        target: TargetSelector,
        /// Key into the store's summon positions.
        spawn: u32,
    },
    /// Give kill credit for a creature.
    KilledMonster {
        /// Creature credited.
        creature: TemplateId,
        /// Player credited when no loot recipient exists.
        target: TargetSelector,
    },
    /// Write an instance data field.
    SetInstanceData {
        /// Field index.
        field: u32,
        /// Value.
        value: u32,
    },
    /// Store a unit's identity in an instance data field.
    SetInstanceGuid {
        /// Field index.
        field: u32,
        /// Unit stored.
        target: TargetSelector,
    },
    /// Turn the actor into another creature template.
    UpdateTemplate {
        /// New template.
        template: TemplateId,
        /// Use the horde-side faction of the template.
        horde: bool,
    },
    /// Kill the actor.
    Die,
    /// Put every player in the zone into combat with the actor.
    ZoneCombatPulse,
    /// Pull nearby allies into combat.
    CallForHelp {
        /// Search radius.
        radius: f32,
    },
    /// Change the weapon sheath state.
    SetSheath {
        /// Sheath state.
        sheath: u32,
    },
    /// Despawn the actor.
    ForceDespawn {
        /// Delay before despawning (ms).
        delay_ms: u32,
    },
    /// Set the health floor damage can't push past.
    SetInvincibilityHpLevel(InvincibilityLevel),
    /// Mount or dismount.
    Mount(ModelRef),
    /// Say a text with a chance.
    ChancedText {
        /// Percent chance.
        chance: u32,
        /// Text ids; the second may be zero.
        texts: [i32; 2],
    },
    /// Throw a signal to nearby creatures.
    ThrowSignal {
        /// Signal thrown.
        kind: SignalKind,
        /// Radius; 0 uses the configured default.
        radius: f32,
    },
    /// Choose which signals are thrown automatically.
    SetThrowMask {
        /// New mask.
        mask: SignalMask,
    },
    /// Change the stand state (sit, kneel, ...).
    SetStandState {
        /// Stand state.
        state: u32,
    },
    /// Replace the movement generator.
    ChangeMovement {
        /// New movement.
        kind: MovementKind,
        /// Wander radius for random movement.
        wander_distance: f32,
    },
    /// Summon a creature unless one already lives nearby.
    SummonUnique {
        /// Creature template.
        template: TemplateId,
        /// Unit the summon attacks (ignored for self).
        target: TargetSelector,
        /// Key into the store's summon positions.
        spawn: u32,
    },
    /// Face a specific creature and emote at it.
    EmoteTarget {
        /// Emote id.
        emote: u32,
        /// The creature.
        target: EntityId,
    },
}

impl ActionEffect {
    /// Numeric action type code, as stored by the loader.
    #[must_use]
    pub const fn type_code(&self) -> u32 {
        match self {
            Self::Text { .. } => 1,
            Self::SetFaction { .. } => 2,
            Self::Morph(_) => 3,
            Self::Sound { .. } => 4,
            Self::Emote { .. } => 5,
            Self::RandomSound { .. } => 9,
            Self::RandomEmote { .. } => 10,
            Self::Cast { .. } => 11,
            Self::Summon { .. } => 12,
            Self::ThreatSinglePct { .. } => 13,
            Self::ThreatAllPct { .. } => 14,
            Self::QuestEvent { .. } => 15,
            Self::CastEvent { .. } => 16,
            Self::SetUnitField { .. } => 17,
            Self::SetUnitFlag { .. } => 18,
            Self::RemoveUnitFlag { .. } => 19,
            Self::AutoAttack { .. } => 20,
            Self::CombatMovement { .. } => 21,
            Self::SetPhase { .. } => 22,
            Self::IncPhase { .. } => 23,
            Self::Evade => 24,
            Self::FleeForAssist => 25,
            Self::QuestEventAll { .. } => 26,
            Self::CastEventAll { .. } => 27,
            Self::RemoveAurasFromSpell { .. } => 28,
            Self::RangedMovement { .. } => 29,
            Self::RandomPhase { .. } => 30,
            Self::RandomPhaseRange { .. } => 31,
            Self::SummonId { .. } => 32,
            Self::KilledMonster { .. } => 33,
            Self::SetInstanceData { .. } => 34,
            Self::SetInstanceGuid { .. } => 35,
            Self::UpdateTemplate { .. } => 36,
            Self::Die => 37,
            Self::ZoneCombatPulse => 38,
            Self::CallForHelp { .. } => 39,
            Self::SetSheath { .. } => 40,
            Self::ForceDespawn { .. } => 41,
            Self::SetInvincibilityHpLevel(_) => 42,
            Self::Mount(_) => 43,
            Self::ChancedText { .. } => 44,
            Self::ThrowSignal { .. } => 45,
            Self::SetThrowMask { .. } => 46,
            Self::SetStandState { .. } => 47,
            Self::ChangeMovement { .. } => 48,
            Self::SummonUnique { .. } => 49,
            Self::EmoteTarget { .. } => 50,
        }
    }

    /// The action's first parameter, for diagnostics listings.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn primary_param(&self) -> i64 {
        match self {
            Self::Text { texts } => i64::from(texts[0]),
            Self::ChancedText { chance, .. } => i64::from(*chance),
            Self::SetFaction { faction, .. } => i64::from(*faction),
            Self::Morph(model) | Self::Mount(model) => match model {
                ModelRef::Reset => 0,
                ModelRef::Template(t) => i64::from(t.0),
                ModelRef::Model(m) => i64::from(*m),
            },
            Self::Sound { sound } => i64::from(*sound),
            Self::Emote { emote } | Self::EmoteTarget { emote, .. } => i64::from(*emote),
            Self::RandomSound { sounds: v } | Self::RandomEmote { emotes: v } => i64::from(v[0]),
            Self::Cast { spell, .. } | Self::RemoveAurasFromSpell { spell, .. } => {
                i64::from(spell.0)
            }
            Self::Summon { template, .. }
            | Self::SummonId { template, .. }
            | Self::SummonUnique { template, .. }
            | Self::UpdateTemplate { template, .. } => i64::from(template.0),
            Self::ThreatSinglePct { percent, .. } | Self::ThreatAllPct { percent } => {
                i64::from(*percent)
            }
            Self::QuestEvent { quest, .. } | Self::QuestEventAll { quest } => i64::from(quest.0),
            Self::CastEvent { creature, .. }
            | Self::CastEventAll { creature, .. }
            | Self::KilledMonster { creature, .. } => i64::from(creature.0),
            Self::SetUnitField { field, .. }
            | Self::SetInstanceData { field, .. }
            | Self::SetInstanceGuid { field, .. } => i64::from(*field),
            Self::SetUnitFlag { flags, .. } | Self::RemoveUnitFlag { flags, .. } => {
                i64::from(*flags)
            }
            Self::AutoAttack { enabled } | Self::CombatMovement { enabled, .. } => {
                i64::from(*enabled)
            }
            Self::SetPhase { phase } => i64::from(*phase),
            Self::IncPhase { delta } => i64::from(*delta),
            Self::RandomPhase { phases } => i64::from(phases[0]),
            Self::RandomPhaseRange { min, .. } => i64::from(*min),
            Self::SetSheath { sheath } => i64::from(*sheath),
            Self::ForceDespawn { delay_ms } => i64::from(*delay_ms),
            Self::SetInvincibilityHpLevel(level) => match level {
                InvincibilityLevel::Flat(v) | InvincibilityLevel::PercentOfMax(v) => i64::from(*v),
            },
            Self::ThrowSignal { kind, .. } => i64::from(kind.code()),
            Self::SetThrowMask { mask } => i64::from(mask.bits()),
            Self::SetStandState { state } => i64::from(*state),
            Self::ChangeMovement { kind, .. } => match kind {
                MovementKind::Idle => 0,
                MovementKind::Random => 1,
                MovementKind::Waypoint => 2,
            },
            Self::RangedMovement { distance, .. } | Self::CallForHelp { radius: distance } => {
                *distance as i64
            }
            Self::Evade | Self::FleeForAssist | Self::Die | Self::ZoneCombatPulse => 0,
        }
    }
}

impl fmt::Display for ActionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_code(), self.primary_param())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_type_and_first_param() {
        let cast = ActionEffect::Cast {
            spell: SpellId(133),
            target: TargetSelector::Victim,
            flags: CastFlags::NONE,
        };
        assert_eq!(cast.to_string(), "11(133)");
        assert_eq!(ActionEffect::Evade.to_string(), "24(0)");
        assert_eq!(ActionEffect::IncPhase { delta: -2 }.to_string(), "23(-2)");
    }

    #[test]
    fn cast_flags_intersect() {
        let flags = CastFlags::TRIGGERED | CastFlags::NO_MELEE_IF_OOM;
        assert!(flags.intersects(CastFlags::TRIGGERED | CastFlags::FORCE_CAST));
        assert!(!flags.intersects(CastFlags::FORCE_TARGET_SELF));
    }

    #[test]
    fn selector_codes_are_distinct() {
        let all = [
            TargetSelector::SelfActor,
            TargetSelector::Victim,
            TargetSelector::SecondAggro,
            TargetSelector::LastAggro,
            TargetSelector::RandomHostile,
            TargetSelector::RandomHostileNotTop,
            TargetSelector::Invoker,
            TargetSelector::InvokerOwner,
            TargetSelector::RandomPlayer,
            TargetSelector::RandomPlayerNotTop,
            TargetSelector::Sender,
        ];
        let mut codes: Vec<u32> = all.iter().map(|s| s.code()).collect();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
