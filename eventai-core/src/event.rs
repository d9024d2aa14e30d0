//! Event definitions — the immutable, template-wide half of every script row.
//!
//! An [`EventDefinition`] pairs a trigger ([`EventCondition`]) with up to
//! three action slots. Definitions are published once by the event store
//! and shared by reference across every actor of the same template.

use serde::{Deserialize, Serialize};

use crate::action::ActionEffect;
use crate::signal::SignalKind;
use crate::types::{EventId, PhaseMask, QuestId, SchoolMask, SpellId, TemplateId};

/// Number of action slots on each definition.
pub const MAX_ACTIONS: usize = 3;

// ---------------------------------------------------------------------------
// Flags
// ---------------------------------------------------------------------------

/// Per-definition behaviour flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EventFlags(u32);

impl EventFlags {
    /// Event may fire more than once.
    pub const REPEATABLE: Self = Self(0x01);
    /// Only active in normal-difficulty instances.
    pub const NORMAL: Self = Self(0x02);
    /// Only active in heroic-difficulty instances.
    pub const HEROIC: Self = Self(0x04);
    /// Run exactly one randomly chosen action slot instead of all of them.
    pub const RANDOM_ACTION: Self = Self(0x20);
    /// Only loaded in debug builds.
    pub const DEBUG_ONLY: Self = Self(0x80);

    /// No flags set.
    pub const NONE: Self = Self(0);

    /// Build from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
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

impl std::ops::BitOr for EventFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Inclusive millisecond bounds for a (re)arming timer. `min == max`
/// means a fixed delay; `max < min` is a configuration fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepeatBounds {
    /// Lower bound (ms).
    pub min: u32,
    /// Upper bound (ms).
    pub max: u32,
}

impl RepeatBounds {
    /// Bounds drawing uniformly from `min..=max`.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// A fixed delay.
    #[must_use]
    pub const fn fixed(ms: u32) -> Self {
        Self { min: ms, max: ms }
    }

    /// Whether the bounds are inverted.
    #[must_use]
    pub const fn is_inverted(self) -> bool {
        self.max < self.min
    }
}

/// Initial and repeat bounds of a timer-kind event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimerSpec {
    /// Delay before the first firing after (re)arming.
    pub initial: RepeatBounds,
    /// Delay between subsequent firings.
    pub repeat: RepeatBounds,
}

/// Inclusive percent band for health / power checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentBand {
    /// Upper bound (inclusive).
    pub max_percent: u32,
    /// Lower bound (inclusive).
    pub min_percent: u32,
    /// Cooldown after a firing.
    pub repeat: RepeatBounds,
}

impl PercentBand {
    /// Whether `percent` lies within the band.
    #[must_use]
    pub const fn contains(&self, percent: u32) -> bool {
        percent >= self.min_percent && percent <= self.max_percent
    }
}

/// Aura stack requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuraCheck {
    /// The aura's spell.
    pub spell: SpellId,
    /// Minimum stack count.
    pub amount: u32,
    /// Cooldown after a firing.
    pub repeat: RepeatBounds,
}

/// Template filter for summon lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummonFilter {
    /// Template the summoned creature must have.
    pub template: TemplateId,
    /// Cooldown after a firing.
    pub repeat: RepeatBounds,
}

/// Static world condition for spawn events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnCondition {
    /// Always fires.
    Always,
    /// Fires only on this map.
    Map(u32),
    /// Fires only in this zone or area.
    ZoneOrArea(u32),
}

/// A generic world-state predicate evaluated against a player (quest
/// state, reputation, item ownership, ...). Kind 0 always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerCondition {
    /// Condition type understood by the world.
    pub kind: u32,
    /// First operand.
    pub value1: u32,
    /// Second operand.
    pub value2: u32,
}

impl PlayerCondition {
    /// The condition that always holds.
    pub const NONE: Self = Self {
        kind: 0,
        value1: 0,
        value2: 0,
    };
}

/// Integer waypoint with a per-axis tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaypointBox {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
    /// Half-width of the box on every axis.
    pub tolerance: u32,
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Trigger condition of an event, one variant per event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventCondition {
    /// Timer running only in combat.
    TimerInCombat(TimerSpec),
    /// Timer running only out of combat.
    TimerOutOfCombat(TimerSpec),
    /// Timer running regardless of combat state.
    TimerGeneric(TimerSpec),
    /// Own health percent in band (combat only).
    Health(PercentBand),
    /// Own mana percent in band (combat only).
    Mana(PercentBand),
    /// Own energy percent in band (combat only).
    Energy(PercentBand),
    /// Victim's health percent in band.
    TargetHealth(PercentBand),
    /// Victim's mana percent in band.
    TargetMana(PercentBand),
    /// Combat started.
    Aggro,
    /// The actor killed a player.
    Kill {
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// The actor died.
    Death,
    /// The actor started evading.
    Evade,
    /// A spell hit the actor.
    SpellHit {
        /// Required spell; `None` accepts any spell of a matching school.
        spell: Option<SpellId>,
        /// Schools that qualify.
        school: SchoolMask,
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// Victim within distance band.
    Range {
        /// Minimum distance.
        min_distance: f32,
        /// Maximum distance.
        max_distance: f32,
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// Someone came into line of sight while out of combat.
    OutOfCombatLos {
        /// Fire for non-hostile units instead of hostile ones.
        no_hostile: bool,
        /// Maximum sight range.
        max_range: f32,
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// The actor spawned or respawned.
    Spawned(SpawnCondition),
    /// The victim is casting.
    TargetCasting {
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// A friendly unit within radius is missing at least `min_deficit` health.
    FriendlyHealth {
        /// Minimum missing health.
        min_deficit: u32,
        /// Search radius.
        radius: f32,
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// A friendly unit within radius is crowd-controlled.
    FriendlyIsCc {
        /// Dispel type of the control effect; 0 matches any.
        dispel_type: u32,
        /// Search radius.
        radius: f32,
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// A friendly unit within radius lacks a buff.
    FriendlyMissingBuff {
        /// The buff.
        spell: SpellId,
        /// Search radius.
        radius: f32,
        /// Cooldown after a firing.
        repeat: RepeatBounds,
    },
    /// The actor summoned a creature.
    SummonedUnit(SummonFilter),
    /// A creature the actor summoned died.
    SummonedJustDied(SummonFilter),
    /// A creature the actor summoned despawned.
    SummonedJustDespawned(SummonFilter),
    /// A player accepted a quest from the actor.
    QuestAccept {
        /// The quest.
        quest: QuestId,
    },
    /// A player completed a quest at the actor.
    QuestComplete {
        /// The quest.
        quest: QuestId,
    },
    /// The actor returned to its home position after evading.
    ReachedHome,
    /// A player emoted at the actor.
    ReceiveEmote {
        /// Emote id.
        emote: u32,
        /// Condition the emoting player must satisfy.
        condition: PlayerCondition,
    },
    /// Aura on self stacked at least `amount` times (combat only).
    Aura(AuraCheck),
    /// Aura on victim stacked at least `amount` times.
    TargetAura(AuraCheck),
    /// Aura on self stacked fewer than `amount` times (combat only).
    MissingAura(AuraCheck),
    /// Aura on victim stacked fewer than `amount` times.
    TargetMissingAura(AuraCheck),
    /// Another actor threw a signal.
    ReceiveSignal {
        /// Signal kind to react to.
        kind: SignalKind,
        /// Required sender template, if any.
        sender: Option<TemplateId>,
    },
    /// The actor arrived at a waypoint.
    ReachedWaypoint(WaypointBox),
    /// Placeholder the loader substitutes for unknown event tags.
    Unsupported {
        /// The tag as stored.
        raw_type: u32,
    },
}

impl EventCondition {
    /// Numeric event type code, as stored by the loader.
    #[must_use]
    pub const fn type_code(&self) -> u32 {
        match self {
            Self::TimerInCombat(_) => 0,
            Self::TimerOutOfCombat(_) => 1,
            Self::Health(_) => 2,
            Self::Mana(_) => 3,
            Self::Aggro => 4,
            Self::Kill { .. } => 5,
            Self::Death => 6,
            Self::Evade => 7,
            Self::SpellHit { .. } => 8,
            Self::Range { .. } => 9,
            Self::OutOfCombatLos { .. } => 10,
            Self::Spawned(_) => 11,
            Self::TargetHealth(_) => 12,
            Self::TargetCasting { .. } => 13,
            Self::FriendlyHealth { .. } => 14,
            Self::FriendlyIsCc { .. } => 15,
            Self::FriendlyMissingBuff { .. } => 16,
            Self::SummonedUnit(_) => 17,
            Self::TargetMana(_) => 18,
            Self::QuestAccept { .. } => 19,
            Self::QuestComplete { .. } => 20,
            Self::ReachedHome => 21,
            Self::ReceiveEmote { .. } => 22,
            Self::Aura(_) => 23,
            Self::TargetAura(_) => 24,
            Self::SummonedJustDied(_) => 25,
            Self::SummonedJustDespawned(_) => 26,
            Self::MissingAura(_) => 27,
            Self::TargetMissingAura(_) => 28,
            Self::TimerGeneric(_) => 29,
            Self::ReceiveSignal { .. } => 30,
            Self::ReachedWaypoint(_) => 31,
            Self::Energy(_) => 32,
            Self::Unsupported { raw_type } => *raw_type,
        }
    }

    /// Whether the periodic tick evaluates this kind. Every other kind is
    /// driven by a lifecycle hook.
    #[must_use]
    pub const fn is_timer_based(&self) -> bool {
        matches!(
            self,
            Self::TimerInCombat(_)
                | Self::TimerOutOfCombat(_)
                | Self::TimerGeneric(_)
                | Self::Health(_)
                | Self::Mana(_)
                | Self::Energy(_)
                | Self::TargetHealth(_)
                | Self::TargetCasting { .. }
                | Self::FriendlyHealth { .. }
                | Self::FriendlyIsCc { .. }
                | Self::Aura(_)
                | Self::TargetAura(_)
                | Self::MissingAura(_)
                | Self::TargetMissingAura(_)
                | Self::Range { .. }
        )
    }

    /// Cooldown bounds armed after a successful check. `None` for kinds
    /// that never cool down.
    #[must_use]
    pub const fn repeat_bounds(&self) -> Option<RepeatBounds> {
        match self {
            Self::TimerInCombat(t) | Self::TimerOutOfCombat(t) | Self::TimerGeneric(t) => {
                Some(t.repeat)
            }
            Self::Health(b)
            | Self::Mana(b)
            | Self::Energy(b)
            | Self::TargetHealth(b)
            | Self::TargetMana(b) => Some(b.repeat),
            Self::Aura(a) | Self::TargetAura(a) | Self::MissingAura(a) | Self::TargetMissingAura(a) => {
                Some(a.repeat)
            }
            Self::SummonedUnit(s) | Self::SummonedJustDied(s) | Self::SummonedJustDespawned(s) => {
                Some(s.repeat)
            }
            Self::Kill { repeat }
            | Self::SpellHit { repeat, .. }
            | Self::Range { repeat, .. }
            | Self::OutOfCombatLos { repeat, .. }
            | Self::TargetCasting { repeat }
            | Self::FriendlyHealth { repeat, .. }
            | Self::FriendlyIsCc { repeat, .. }
            | Self::FriendlyMissingBuff { repeat, .. } => Some(*repeat),
            Self::Aggro
            | Self::Death
            | Self::Evade
            | Self::Spawned(_)
            | Self::QuestAccept { .. }
            | Self::QuestComplete { .. }
            | Self::ReachedHome
            | Self::ReceiveEmote { .. }
            | Self::ReceiveSignal { .. }
            | Self::ReachedWaypoint(_)
            | Self::Unsupported { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// One scripted event: a trigger, gating parameters and its action slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// Store-wide identifier.
    pub id: EventId,
    /// Owning creature template.
    pub template: TemplateId,
    /// Trigger condition.
    pub condition: EventCondition,
    /// Phases during which the event is suppressed.
    pub inverse_phase_mask: PhaseMask,
    /// Percent chance (1–100) that a firing runs its actions.
    pub chance: u8,
    /// Behaviour flags.
    pub flags: EventFlags,
    /// Action slots; empty slots are `None`.
    pub actions: [Option<ActionEffect>; MAX_ACTIONS],
}

impl EventDefinition {
    /// A non-repeatable definition that always runs, with no actions yet.
    #[must_use]
    pub fn new(id: u32, template: u32, condition: EventCondition) -> Self {
        Self {
            id: EventId(id),
            template: TemplateId(template),
            condition,
            inverse_phase_mask: PhaseMask::EMPTY,
            chance: 100,
            flags: EventFlags::NONE,
            actions: [None, None, None],
        }
    }

    /// Set the chance.
    #[must_use]
    pub fn with_chance(mut self, chance: u8) -> Self {
        self.chance = chance;
        self
    }

    /// Add flags.
    #[must_use]
    pub fn with_flags(mut self, flags: EventFlags) -> Self {
        self.flags = self.flags | flags;
        self
    }

    /// Set the inverse phase mask.
    #[must_use]
    pub fn with_phase_mask(mut self, mask: PhaseMask) -> Self {
        self.inverse_phase_mask = mask;
        self
    }

    /// Fill an action slot. Slots past [`MAX_ACTIONS`] are ignored.
    #[must_use]
    pub fn with_action(mut self, slot: usize, action: ActionEffect) -> Self {
        if let Some(s) = self.actions.get_mut(slot) {
            *s = Some(action);
        }
        self
    }

    /// Whether the event stays enabled after firing.
    #[must_use]
    pub const fn is_repeatable(&self) -> bool {
        self.flags.contains(EventFlags::REPEATABLE)
    }

    /// Non-empty action slots in declaration order.
    pub fn filled_actions(&self) -> impl Iterator<Item = &ActionEffect> {
        self.actions.iter().flatten()
    }
}
