//! Action execution.
//!
//! Every action is fire-and-forget. Anything that goes wrong (a target
//! that doesn't resolve, a missing instance, an unknown spawn position) is
//! reported and the action is skipped; the remaining slots still run.

use tracing::debug;

use crate::action::{ActionEffect, CastFlags, InvincibilityLevel, ModelRef, TargetSelector};
use crate::engine::EventAi;
use crate::error::Fault;
use crate::event::{EventDefinition, EventFlags};
use crate::metrics::EventAiCounters;
use crate::target::{self, InvocationContext};
use crate::types::{EntityId, Phase, TemplateId};
use crate::world::{SelectFilter, SummonLifetime, SummonRequest, World};

impl EventAi {
    /// Run the definition's action slots with the firing's shared roll.
    ///
    /// In random-action mode the roll picks one non-empty slot, counting
    /// only non-empty slots; otherwise every non-empty slot runs in order.
    pub(crate) fn run_actions<W: World + ?Sized>(
        &mut self,
        def: &EventDefinition,
        roll: u32,
        ctx: InvocationContext,
        world: &mut W,
    ) {
        if def.flags.contains(EventFlags::RANDOM_ACTION) {
            let filled: Vec<&ActionEffect> = def.filled_actions().collect();
            if let Some(effect) = pick(roll, &filled) {
                self.run_action(def, effect, roll, ctx, world);
            }
        } else {
            for effect in def.filled_actions() {
                self.run_action(def, effect, roll, ctx, world);
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn run_action<W: World + ?Sized>(
        &mut self,
        def: &EventDefinition,
        effect: &ActionEffect,
        roll: u32,
        ctx: InvocationContext,
        world: &mut W,
    ) {
        EventAiCounters::bump(&self.counters.actions_executed);
        debug!(
            template = %self.template,
            event = %def.id,
            action = %effect,
            invoker = ?ctx.invoker,
            "processing action"
        );

        match effect {
            ActionEffect::Text { texts } => {
                if let Some(text) = text_variant(roll, texts) {
                    self.say(def, text, ctx, world);
                }
            }
            ActionEffect::ChancedText { chance, texts } => {
                if let Some(text) = chanced_text_variant(roll, *chance, texts) {
                    self.say(def, text, ctx, world);
                }
            }
            ActionEffect::SetFaction { faction, flags } => {
                if *faction == 0 {
                    world.clear_temporary_faction();
                } else {
                    world.set_temporary_faction(*faction, *flags);
                }
            }
            ActionEffect::Morph(model) => match self.model_for(def, *model, &*world) {
                Some(Some(display)) => world.set_display(display),
                Some(None) => world.demorph(),
                None => {}
            },
            ActionEffect::Mount(model) => match self.model_for(def, *model, &*world) {
                Some(Some(display)) => world.mount(display),
                Some(None) => world.dismount(),
                None => {}
            },
            ActionEffect::Sound { sound } => world.play_sound(*sound),
            ActionEffect::Emote { emote } => world.play_emote(*emote),
            ActionEffect::RandomSound { sounds } => {
                if let Some(sound) = pick(roll, sounds).and_then(|s| u32::try_from(*s).ok()) {
                    world.play_sound(sound);
                }
            }
            ActionEffect::RandomEmote { emotes } => {
                if let Some(emote) = pick(roll, emotes).and_then(|e| u32::try_from(*e).ok()) {
                    world.play_emote(emote);
                }
            }
            ActionEffect::Cast {
                spell,
                target,
                flags,
            } => {
                let unrestricted =
                    CastFlags::TRIGGERED | CastFlags::FORCE_CAST | CastFlags::FORCE_TARGET_SELF;
                let filter = if flags.intersects(unrestricted) {
                    SelectFilter::NONE
                } else {
                    SelectFilter {
                        spell: Some(*spell),
                        players_only: false,
                        in_line_of_sight: true,
                    }
                };
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, filter) {
                    self.do_cast(unit, *spell, *flags, world);
                }
            }
            ActionEffect::Summon {
                template,
                target,
                duration_ms,
            } => {
                let lifetime = if *duration_ms > 0 {
                    SummonLifetime::TimedOutOfCombatOrDead(*duration_ms)
                } else {
                    SummonLifetime::OutOfCombat
                };
                let request = SummonRequest {
                    template: *template,
                    placement: None,
                    lifetime,
                };
                self.summon(def, effect, &request, *target, ctx, world);
            }
            ActionEffect::SummonId {
                template,
                target,
                spawn,
            } => self.summon_at(def, effect, *template, *target, *spawn, ctx, world),
            ActionEffect::SummonUnique {
                template,
                target,
                spawn,
            } => {
                let radius = self.config.summons.unique_search_radius;
                if world.find_live_creature(*template, radius).is_some() {
                    debug!(template = %self.template, summon = %template, "unique summon already alive");
                    return;
                }
                self.summon_at(def, effect, *template, *target, *spawn, ctx, world);
            }
            ActionEffect::ThreatSinglePct { percent, target } => {
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                {
                    world.modify_threat_percent(unit, *percent);
                }
            }
            ActionEffect::ThreatAllPct { percent } => {
                for unit in world.threat_list() {
                    world.modify_threat_percent(unit, *percent);
                }
            }
            ActionEffect::QuestEvent { quest, target } => {
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                {
                    if world.is_player(unit) {
                        world.credit_quest_event(unit, *quest);
                    }
                }
            }
            ActionEffect::QuestEventAll { quest } => {
                if let Some(player) = ctx.invoker.filter(|u| world.is_player(*u)) {
                    world.credit_group_quest_event(player, *quest);
                }
            }
            ActionEffect::CastEvent {
                creature,
                spell,
                target,
            } => {
                if let Some(unit) =
                    self.target(def, effect, *target, ctx, &*world, SelectFilter::PLAYERS)
                {
                    if world.is_player(unit) {
                        world.credit_spell_cast(unit, *creature, *spell);
                    }
                }
            }
            ActionEffect::CastEventAll { creature, spell } => {
                for unit in world.threat_list() {
                    if world.is_player(unit) {
                        world.credit_spell_cast(unit, *creature, *spell);
                    }
                }
            }
            ActionEffect::KilledMonster { creature, target } => {
                if let Some(player) = world.loot_recipient() {
                    world.credit_kill(player, *creature);
                } else if let Some(unit) =
                    self.target(def, effect, *target, ctx, &*world, SelectFilter::PLAYERS)
                {
                    if let Some(player) = player_behind(unit, &*world) {
                        world.credit_kill(player, *creature);
                    }
                }
            }
            ActionEffect::SetUnitField {
                field,
                value,
                target,
            } => {
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                {
                    if !world.set_unit_field(unit, *field, *value) {
                        debug!(template = %self.template, field, "unit field write refused");
                    }
                }
            }
            ActionEffect::SetUnitFlag { flags, target } => {
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                {
                    world.set_unit_flags(unit, *flags);
                }
            }
            ActionEffect::RemoveUnitFlag { flags, target } => {
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                {
                    world.remove_unit_flags(unit, *flags);
                }
            }
            ActionEffect::RemoveAurasFromSpell { target, spell } => {
                if let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                {
                    world.remove_auras(unit, *spell);
                }
            }
            ActionEffect::AutoAttack { enabled } => self.melee_enabled = *enabled,
            ActionEffect::CombatMovement {
                enabled,
                toggle_melee,
            } => {
                if self.combat_movement.script == *enabled {
                    return;
                }
                self.combat_movement.script = *enabled;
                if self.combat_movement.is_enabled() {
                    self.set_chase(*enabled, world);
                } else if world.is_chasing() {
                    world.stop_chase();
                }
                if *toggle_melee && world.in_combat() {
                    if let Some(victim) = world.victim() {
                        world.send_melee_state(victim, self.combat_movement.is_enabled());
                    }
                }
            }
            ActionEffect::RangedMovement {
                distance,
                angle_degrees,
            } => {
                self.attack_distance = *distance;
                self.attack_angle = angle_degrees.to_radians();
                if self.combat_movement.is_enabled() && world.is_chasing() {
                    if let Some(victim) = world.victim() {
                        world.chase(victim, self.attack_distance, self.attack_angle);
                    }
                }
            }
            ActionEffect::SetPhase { phase } => self.set_phase(def, i64::from(*phase)),
            ActionEffect::IncPhase { delta } => {
                let requested = i64::from(self.phase.value()) + i64::from(*delta);
                self.set_phase(def, requested);
            }
            ActionEffect::RandomPhase { phases } => {
                let phase = pick(roll, phases).copied().unwrap_or(phases[0]);
                self.set_phase(def, i64::from(phase));
            }
            ActionEffect::RandomPhaseRange { min, max } => {
                if max > min {
                    self.set_phase(def, i64::from(min + roll % (max - min)));
                } else {
                    self.report(Fault::EmptyPhaseRange {
                        event: def.id,
                        min: *min,
                        max: *max,
                    });
                }
            }
            ActionEffect::Evade => self.on_enter_evade(world),
            ActionEffect::FleeForAssist => world.flee_for_assistance(),
            ActionEffect::SetInstanceData { field, value } => match world.instance_data() {
                Some(data) => data.set_data(*field, *value),
                None => self.report(Fault::NoInstanceContext { event: def.id }),
            },
            ActionEffect::SetInstanceGuid { field, target } => {
                let Some(unit) = self.target(def, effect, *target, ctx, &*world, SelectFilter::NONE)
                else {
                    return;
                };
                match world.instance_data() {
                    Some(data) => data.set_guid(*field, unit),
                    None => self.report(Fault::NoInstanceContext { event: def.id }),
                }
            }
            ActionEffect::UpdateTemplate { template, horde } => {
                if world.template_of(world.actor()) == Some(*template) {
                    self.report(Fault::TemplateUnchanged {
                        event: def.id,
                        template: *template,
                    });
                } else if !world.update_template(*template, *horde) {
                    self.report(Fault::UnknownTemplate {
                        event: def.id,
                        template: *template,
                    });
                }
            }
            ActionEffect::Die => {
                if world.is_alive(world.actor()) {
                    world.kill_self();
                } else {
                    self.report(Fault::AlreadyDead { event: def.id });
                }
            }
            ActionEffect::ZoneCombatPulse => world.zone_combat_pulse(),
            ActionEffect::CallForHelp { radius } => world.call_for_help(*radius),
            ActionEffect::SetSheath { sheath } => world.set_sheath(*sheath),
            ActionEffect::ForceDespawn { delay_ms } => world.despawn(*delay_ms),
            ActionEffect::SetInvincibilityHpLevel(level) => {
                self.invincibility_floor = match level {
                    InvincibilityLevel::Flat(hp) => *hp,
                    InvincibilityLevel::PercentOfMax(percent) => {
                        let max = world.health(world.actor()).map_or(0, |h| h.max);
                        let floor = u64::from(max) * u64::from(*percent) / 100;
                        u32::try_from(floor).unwrap_or(u32::MAX)
                    }
                };
            }
            ActionEffect::ThrowSignal { kind, radius } => {
                self.throw_signal(*kind, ctx.invoker, *radius, world);
            }
            ActionEffect::SetThrowMask { mask } => self.throw_mask = *mask,
            ActionEffect::SetStandState { state } => world.set_stand_state(*state),
            ActionEffect::ChangeMovement {
                kind,
                wander_distance,
            } => world.change_movement(*kind, *wander_distance),
            ActionEffect::EmoteTarget { emote, target } => {
                if world.creature_exists(*target) {
                    world.face(*target);
                    world.play_emote(*emote);
                } else {
                    self.report(Fault::UnknownCreature {
                        event: def.id,
                        entity: *target,
                    });
                }
            }
        }
    }

    /// Resolve a selector, reporting failures.
    fn target<W: World + ?Sized>(
        &mut self,
        def: &EventDefinition,
        effect: &ActionEffect,
        selector: TargetSelector,
        ctx: InvocationContext,
        world: &W,
        filter: SelectFilter,
    ) -> Option<EntityId> {
        let resolution = target::resolve(selector, &ctx, world, &mut self.rng, filter);
        if resolution.failed {
            self.report(Fault::TargetUnresolved {
                event: def.id,
                action: effect.type_code(),
                selector,
            });
        }
        resolution.target
    }

    /// Display a text to the invoker-aware audience.
    fn say<W: World + ?Sized>(
        &mut self,
        def: &EventDefinition,
        text: i32,
        ctx: InvocationContext,
        world: &mut W,
    ) {
        if text == 0 {
            return;
        }
        let audience = match ctx.invoker {
            Some(invoker) => player_behind(invoker, &*world),
            None => world
                .victim()
                .map(|victim| player_behind(victim, &*world).unwrap_or(victim)),
        };
        if !world.display_text(text, audience) {
            self.report(Fault::TextNotDisplayed {
                event: def.id,
                text,
            });
        }
    }

    /// The display model a model reference points at. `Some(None)` means
    /// "restore the default"; `None` means the reference could not be used.
    fn model_for<W: World + ?Sized>(
        &self,
        def: &EventDefinition,
        model: ModelRef,
        world: &W,
    ) -> Option<Option<u32>> {
        match model {
            ModelRef::Reset => Some(None),
            ModelRef::Model(display) => Some(Some(display)),
            ModelRef::Template(template) => {
                let display = world.display_for_template(template);
                if display.is_none() {
                    self.report(Fault::UnknownTemplate {
                        event: def.id,
                        template,
                    });
                }
                display.map(Some)
            }
        }
    }

    /// Apply a phase change, clamping into range.
    fn set_phase(&mut self, def: &EventDefinition, requested: i64) {
        let (phase, corrected) = Phase::clamped(requested);
        if corrected {
            self.report(Fault::PhaseOutOfRange {
                event: def.id,
                requested,
                applied: phase.value(),
            });
        }
        self.phase = phase;
        debug!(template = %self.template, event = %def.id, phase = %phase, "phase changed");
    }

    /// Summon at a stored spawn position.
    #[allow(clippy::too_many_arguments)]
    fn summon_at<W: World + ?Sized>(
        &mut self,
        def: &EventDefinition,
        effect: &ActionEffect,
        template: TemplateId,
        selector: TargetSelector,
        spawn: u32,
        ctx: InvocationContext,
        world: &mut W,
    ) {
        let Some(position) = self.store.summon_spawn(spawn) else {
            self.report(Fault::UnknownSummonSpawn {
                event: def.id,
                spawn,
            });
            return;
        };
        let lifetime = if position.despawn_secs > 0 {
            SummonLifetime::TimedOutOfCombatOrDead(position.despawn_secs.saturating_mul(1000))
        } else {
            SummonLifetime::OutOfCombat
        };
        let request = SummonRequest {
            template,
            placement: Some((position.position, position.orientation)),
            lifetime,
        };
        self.summon(def, effect, &request, selector, ctx, world);
    }

    /// Spawn a creature and, unless the selector is the actor itself, send
    /// it after the resolved target.
    fn summon<W: World + ?Sized>(
        &mut self,
        def: &EventDefinition,
        effect: &ActionEffect,
        request: &SummonRequest,
        selector: TargetSelector,
        ctx: InvocationContext,
        world: &mut W,
    ) {
        let target = self.target(def, effect, selector, ctx, &*world, SelectFilter::NONE);
        match world.summon(request) {
            Some(summon) => {
                if selector != TargetSelector::SelfActor {
                    if let Some(target) = target {
                        world.order_attack(summon, target);
                    }
                }
            }
            None => self.report(Fault::SummonFailed {
                event: def.id,
                template: request.template,
            }),
        }
    }
}

/// Which of up to three texts a firing says. With all three set the roll
/// picks uniformly; with two, odd rolls take the second.
fn text_variant(roll: u32, texts: &[i32; 3]) -> Option<i32> {
    if texts[0] == 0 {
        return None;
    }
    let text = if texts[1] != 0 && texts[2] != 0 {
        *pick(roll, texts).unwrap_or(&texts[0])
    } else if texts[1] != 0 && roll % 2 == 1 {
        texts[1]
    } else {
        texts[0]
    };
    Some(text)
}

/// The text a chanced text action says, if `roll` passes its percent chance.
fn chanced_text_variant(roll: u32, chance: u32, texts: &[i32; 2]) -> Option<i32> {
    if texts[0] == 0 || roll % 100 >= chance {
        return None;
    }
    if texts[1] == 0 {
        return Some(texts[0]);
    }
    pick(roll, texts).copied()
}

/// The slot `roll` selects among `items`.
fn pick<T>(roll: u32, items: &[T]) -> Option<&T> {
    let len = u32::try_from(items.len()).ok().filter(|n| *n > 0)?;
    let index = usize::try_from(roll % len).ok()?;
    items.get(index)
}

/// The unit itself if it is a player, else its player owner.
fn player_behind<W: World + ?Sized>(unit: EntityId, world: &W) -> Option<EntityId> {
    if world.is_player(unit) {
        Some(unit)
    } else {
        world.owner_of(unit).filter(|owner| world.is_player(*owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_first_text_says_nothing() {
        assert_eq!(text_variant(5, &[0, -2, -3]), None);
    }

    #[test]
    fn three_texts_cycle_with_the_roll() {
        let texts = [-1, -2, -3];
        assert_eq!(text_variant(0, &texts), Some(-1));
        assert_eq!(text_variant(4, &texts), Some(-2));
        assert_eq!(text_variant(101, &texts), Some(-3));
    }

    #[test]
    fn two_texts_split_on_odd_rolls() {
        let texts = [-1, -2, 0];
        assert_eq!(text_variant(6, &texts), Some(-1));
        assert_eq!(text_variant(7, &texts), Some(-2));
    }

    #[test]
    fn lone_text_ignores_the_roll() {
        assert_eq!(text_variant(1, &[-1, 0, 0]), Some(-1));
        // A gap in the middle slot falls back to the first text.
        assert_eq!(text_variant(5, &[-1, 0, -3]), Some(-1));
    }

    #[test]
    fn chanced_text_respects_percent() {
        let texts = [-10, 0];
        assert_eq!(chanced_text_variant(29, 30, &texts), Some(-10));
        assert_eq!(chanced_text_variant(30, 30, &texts), None);
        assert_eq!(chanced_text_variant(130, 31, &texts), Some(-10));
        assert_eq!(chanced_text_variant(0, 0, &texts), None);
    }

    #[test]
    fn chanced_text_picks_between_two() {
        let texts = [-10, -11];
        assert_eq!(chanced_text_variant(10, 50, &texts), Some(-10));
        assert_eq!(chanced_text_variant(11, 50, &texts), Some(-11));
        assert_eq!(chanced_text_variant(0, 100, &[0, -11]), None);
    }

    #[test]
    fn pick_wraps_and_rejects_empty() {
        assert_eq!(pick(7, &[1, 2, 3]), Some(&2));
        assert_eq!(pick::<u32>(7, &[]), None);
    }
}
