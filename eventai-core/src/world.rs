//! The world seen from one actor.
//!
//! The engine decides *what* should happen; the world simulation makes it
//! happen. It is split in two traits so read paths (condition checks,
//! target resolution) only need shared access:
//!
//! - [`WorldView`]: queries about units, threat, space and conditions.
//! - [`WorldCommands`]: effects (casts, summons, texts, movement, ...).
//!
//! Both are scoped to the controlled actor: "the victim" or "in combat"
//! always mean the actor's own. [`World`] is implemented for anything
//! providing both halves.

use crate::action::{CastFlags, MovementKind};
use crate::event::PlayerCondition;
use crate::signal::SignalKind;
use crate::types::{EntityId, Location, PowerKind, QuestId, SpellId, TemplateId, Vitals};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Immediate answer to a cast request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastResult {
    /// The cast started.
    Ok,
    /// Already casting something.
    IsCasting,
    /// Refused for another reason.
    Other,
    /// Target out of range.
    TooFar,
    /// Target too close.
    TooClose,
    /// Not enough power.
    NoPower,
    /// Caster state forbids casting.
    State,
    /// Target already has the aura.
    TargetAura,
    /// Target not in line of sight.
    NoLineOfSight,
    /// Caster is silenced.
    Silenced,
}

impl CastResult {
    /// Whether the actor should close in on its victim and keep meleeing
    /// after this result.
    #[must_use]
    pub const fn wants_chase(self) -> bool {
        matches!(
            self,
            Self::TooFar | Self::NoLineOfSight | Self::NoPower | Self::Silenced
        )
    }
}

/// Final outcome of a previously started cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    /// The spell went off.
    Succeeded,
    /// Target moved out of range.
    OutOfRange,
    /// Target left line of sight.
    NoLineOfSight,
    /// Ran out of power.
    NoPower,
    /// Cast was interrupted.
    Interrupted,
    /// Caster was silenced.
    Silenced,
    /// Failed for another reason.
    Failed,
}

impl CastOutcome {
    /// Whether this outcome should switch the actor back to chasing.
    #[must_use]
    pub const fn wants_chase(self) -> bool {
        matches!(
            self,
            Self::OutOfRange
                | Self::NoLineOfSight
                | Self::NoPower
                | Self::Interrupted
                | Self::Silenced
        )
    }
}

/// Restrictions applied when picking a unit from the threat list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectFilter {
    /// Only units this spell can reach.
    pub spell: Option<SpellId>,
    /// Only players.
    pub players_only: bool,
    /// Only units in line of sight.
    pub in_line_of_sight: bool,
}

impl SelectFilter {
    /// No restriction.
    pub const NONE: Self = Self {
        spell: None,
        players_only: false,
        in_line_of_sight: false,
    };

    /// Players only.
    pub const PLAYERS: Self = Self {
        spell: None,
        players_only: true,
        in_line_of_sight: false,
    };

    /// Whether the filter restricts anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.spell.is_none() && !self.players_only && !self.in_line_of_sight
    }
}

/// How long a summon lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummonLifetime {
    /// Despawn this many ms after leaving combat or dying.
    TimedOutOfCombatOrDead(u32),
    /// Despawn as soon as it leaves combat.
    OutOfCombat,
}

/// A request to spawn a creature on behalf of the actor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummonRequest {
    /// Template to spawn.
    pub template: TemplateId,
    /// Explicit position and facing; `None` spawns at the actor.
    pub placement: Option<(Location, f32)>,
    /// Lifetime.
    pub lifetime: SummonLifetime,
}

/// Instance-scoped key/value storage (boss states, door guids, ...).
pub trait InstanceData {
    /// Store a numeric value.
    fn set_data(&mut self, field: u32, value: u32);

    /// Store a unit's identity.
    fn set_guid(&mut self, field: u32, unit: EntityId);
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Read-only queries, answered from the controlled actor's perspective.
pub trait WorldView {
    /// The controlled actor.
    fn actor(&self) -> EntityId;

    /// Template of a creature; `None` for players and unknown units.
    fn template_of(&self, unit: EntityId) -> Option<TemplateId>;

    /// Whether the unit is directly player-controlled.
    fn is_player(&self, unit: EntityId) -> bool;

    /// Charmer or owner of a unit.
    fn owner_of(&self, unit: EntityId) -> Option<EntityId>;

    /// Whether the unit exists and is alive.
    fn is_alive(&self, unit: EntityId) -> bool;

    /// Whether the actor is in combat.
    fn in_combat(&self) -> bool;

    /// Whether the actor is evading: combat dropped, not home yet.
    fn is_evading(&self) -> bool;

    /// The actor's current victim.
    fn victim(&self) -> Option<EntityId>;

    /// The actor's threat list, highest threat first.
    fn threat_list(&self) -> Vec<EntityId>;

    /// Health pool of a unit.
    fn health(&self, unit: EntityId) -> Option<Vitals>;

    /// Power pool of a unit.
    fn power(&self, unit: EntityId, kind: PowerKind) -> Option<Vitals>;

    /// Position of a unit.
    fn position(&self, unit: EntityId) -> Option<Location>;

    /// Distance between two units.
    fn distance(&self, a: EntityId, b: EntityId) -> Option<f32> {
        Some(self.position(a)?.distance(&self.position(b)?))
    }

    /// Map the actor is on.
    fn map_id(&self) -> u32;

    /// Zone and area the actor is in.
    fn zone_and_area(&self) -> (u32, u32);

    /// Whether two units share a map.
    fn same_map(&self, a: EntityId, b: EntityId) -> bool;

    /// Whether `to` is visible from `from`.
    fn in_line_of_sight(&self, from: EntityId, to: EntityId) -> bool;

    /// Whether `a` considers `b` an enemy.
    fn is_hostile(&self, a: EntityId, b: EntityId) -> bool;

    /// Whether the unit is casting.
    fn is_casting(&self, unit: EntityId) -> bool;

    /// Stack count of a spell's aura on a unit (0 when absent).
    fn aura_stacks(&self, unit: EntityId, spell: SpellId) -> u32;

    /// First friendly unit within `radius` missing at least `min_deficit` health.
    fn find_friendly_injured(&self, radius: f32, min_deficit: u32) -> Option<EntityId>;

    /// First friendly unit within `radius` under crowd control of the given
    /// dispel type (0 matches any).
    fn find_friendly_crowd_controlled(&self, radius: f32, dispel_type: u32) -> Option<EntityId>;

    /// First friendly unit within `radius` lacking the buff.
    fn find_friendly_missing_buff(&self, radius: f32, spell: SpellId) -> Option<EntityId>;

    /// Whether the actor could target `unit` with `spell` (range, validity).
    fn spell_can_reach(&self, unit: EntityId, spell: SpellId) -> bool;

    /// Display model picked for a creature template.
    fn display_for_template(&self, template: TemplateId) -> Option<u32>;

    /// Player (or group leader) who tapped the actor.
    fn loot_recipient(&self) -> Option<EntityId>;

    /// A live creature of `template` within `radius` of the actor.
    fn find_live_creature(&self, template: TemplateId, radius: f32) -> Option<EntityId>;

    /// Whether a creature with this identity exists on the actor's map.
    fn creature_exists(&self, unit: EntityId) -> bool;

    /// Evaluate a generic world-state condition for a player.
    fn condition_holds(&self, condition: &PlayerCondition, player: EntityId) -> bool;

    /// Whether the actor would start attacking `who` on sight.
    fn can_start_attack(&self, who: EntityId) -> bool;

    /// Whether the actor's current movement is a chase.
    fn is_chasing(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Effects performed by, or on behalf of, the controlled actor.
pub trait WorldCommands {
    /// Say a localized text to an optional audience. `false` if the text
    /// does not exist.
    fn display_text(&mut self, text: i32, audience: Option<EntityId>) -> bool;

    /// Apply a temporary faction.
    fn set_temporary_faction(&mut self, faction: u32, flags: u32);

    /// Restore the template faction.
    fn clear_temporary_faction(&mut self);

    /// Change the display model.
    fn set_display(&mut self, model: u32);

    /// Restore the native display model.
    fn demorph(&mut self);

    /// Mount a model.
    fn mount(&mut self, model: u32);

    /// Dismount.
    fn dismount(&mut self);

    /// Play a sound.
    fn play_sound(&mut self, sound: u32);

    /// Play an emote.
    fn play_emote(&mut self, emote: u32);

    /// Turn to face a unit.
    fn face(&mut self, unit: EntityId);

    /// Have `caster` (normally the actor) try to cast a spell on `target`.
    fn cast_as(
        &mut self,
        caster: EntityId,
        target: EntityId,
        spell: SpellId,
        flags: CastFlags,
    ) -> CastResult;

    /// Stop the cast `caster` is channelling.
    fn interrupt_cast(&mut self, caster: EntityId);

    /// Spawn a creature; `None` if the spawn failed.
    fn summon(&mut self, request: &SummonRequest) -> Option<EntityId>;

    /// Make `attacker` start attacking `target`.
    fn order_attack(&mut self, attacker: EntityId, target: EntityId);

    /// Scale a unit's threat on the actor by `percent`.
    fn modify_threat_percent(&mut self, unit: EntityId, percent: i32);

    /// Complete an explore/event quest objective for a player.
    fn credit_quest_event(&mut self, player: EntityId, quest: QuestId);

    /// Complete an explore/event quest objective for a player's group.
    fn credit_group_quest_event(&mut self, player: EntityId, quest: QuestId);

    /// Credit a "cast spell on creature" objective.
    fn credit_spell_cast(&mut self, player: EntityId, creature: TemplateId, spell: SpellId);

    /// Credit a kill objective to a player and their group.
    fn credit_kill(&mut self, player: EntityId, creature: TemplateId);

    /// Write a raw unit field. The world refuses protected fields.
    fn set_unit_field(&mut self, unit: EntityId, field: u32, value: u32) -> bool;

    /// Set unit flags.
    fn set_unit_flags(&mut self, unit: EntityId, flags: u32);

    /// Clear unit flags.
    fn remove_unit_flags(&mut self, unit: EntityId, flags: u32);

    /// Remove every aura of a spell from a unit.
    fn remove_auras(&mut self, unit: EntityId, spell: SpellId);

    /// Chase a unit at the given distance and angle (radians).
    fn chase(&mut self, target: EntityId, distance: f32, angle: f32);

    /// Stop chasing and hold position.
    fn stop_chase(&mut self);

    /// Start or stop the melee swing against the victim.
    fn send_melee_state(&mut self, victim: EntityId, swinging: bool);

    /// Run towards nearby allies.
    fn flee_for_assistance(&mut self);

    /// Instance storage, when the actor is inside an instance.
    fn instance_data(&mut self) -> Option<&mut dyn InstanceData>;

    /// Turn into another template. `false` if the template is unknown.
    fn update_template(&mut self, template: TemplateId, horde: bool) -> bool;

    /// Kill the actor.
    fn kill_self(&mut self);

    /// Put every player in the zone into combat with the actor.
    fn zone_combat_pulse(&mut self);

    /// Pull allies within `radius` into the fight.
    fn call_for_help(&mut self, radius: f32);

    /// Change sheath state.
    fn set_sheath(&mut self, sheath: u32);

    /// Despawn after `delay_ms`.
    fn despawn(&mut self, delay_ms: u32);

    /// Throw a signal to creatures within `radius`.
    fn throw_signal(&mut self, kind: SignalKind, invoker: Option<EntityId>, radius: f32);

    /// Change stand state.
    fn set_stand_state(&mut self, state: u32);

    /// Replace the movement generator.
    fn change_movement(&mut self, kind: MovementKind, wander_distance: f32);

    /// First half of evading: drop auras, threat and combat, head home if
    /// alive, forget the loot recipient.
    fn begin_evade(&mut self);

    /// Last half of evading: reset damage bookkeeping. The actor stays in
    /// evade mode until [`WorldCommands::leave_evade`].
    fn finish_evade(&mut self);

    /// Evade mode is over (home reached, reset or death).
    fn leave_evade(&mut self);

    /// Start attacking `who`, adding threat and entering combat.
    /// Returns `false` if the attack could not start.
    fn start_attack(&mut self, who: EntityId, melee: bool) -> bool;

    /// Refresh the victim from the threat list. `false` when the actor has
    /// nobody left to fight.
    fn select_hostile_target(&mut self) -> bool;

    /// Swing at the victim if the swing timer allows.
    fn melee_attack_if_ready(&mut self);
}

/// Everything the engine needs from the world.
pub trait World: WorldView + WorldCommands {}

impl<T: WorldView + WorldCommands + ?Sized> World for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chase_fallback_results() {
        assert!(CastResult::TooFar.wants_chase());
        assert!(CastResult::Silenced.wants_chase());
        assert!(!CastResult::Ok.wants_chase());
        assert!(!CastResult::IsCasting.wants_chase());
        assert!(CastOutcome::Interrupted.wants_chase());
        assert!(!CastOutcome::Failed.wants_chase());
    }

    #[test]
    fn filter_emptiness() {
        assert!(SelectFilter::NONE.is_empty());
        assert!(!SelectFilter::PLAYERS.is_empty());
        let spell_only = SelectFilter {
            spell: Some(SpellId(1)),
            ..SelectFilter::NONE
        };
        assert!(!spell_only.is_empty());
    }
}
