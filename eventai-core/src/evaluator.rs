//! Event trigger evaluation.
//!
//! [`EventAi::try_fire`] is the single gate every firing goes through, in
//! this order:
//!
//! 1. the runtime must be armed (enabled, no cooldown left);
//! 2. the current phase must not be in the inverse phase mask;
//! 3. the kind-specific condition must hold;
//! 4. the cooldown is re-armed from the repeat bounds;
//! 5. non-repeatable events are disabled;
//! 6. one roll is drawn and gated against the chance;
//! 7. the actions run with that same roll.
//!
//! Steps 4 and 5 stick even when the chance roll then abandons the firing.

use rand::Rng;
use tracing::debug;

use crate::engine::EventAi;
use crate::event::{AuraCheck, EventCondition, EventDefinition, PercentBand, SummonFilter};
use crate::metrics::EventAiCounters;
use crate::target::InvocationContext;
use crate::types::{EntityId, PowerKind, Vitals};
use crate::world::World;

impl EventAi {
    /// Try to fire the runtime at `index`. Returns `true` when the actions ran.
    pub(crate) fn try_fire<W: World + ?Sized>(
        &mut self,
        index: usize,
        ctx: InvocationContext,
        world: &mut W,
    ) -> bool {
        let Some(runtime) = self.runtimes.get(index) else {
            return false;
        };
        if !runtime.is_armed() {
            return false;
        }
        let def = runtime.shared_definition();

        if def.inverse_phase_mask.contains(self.phase) {
            if self.config.diagnostics.trace_phase_skips && !def.condition.is_timer_based() {
                debug!(
                    template = %self.template,
                    event = %def.id,
                    phase = %self.phase,
                    "event skipped by phase mask"
                );
            }
            return false;
        }

        let mut ctx = ctx;
        if !self.condition_holds(&def, &mut ctx, &*world) {
            return false;
        }
        debug!(
            template = %self.template,
            event = %def.id,
            kind = def.condition.type_code(),
            invoker = ?ctx.invoker,
            "processing event"
        );

        if let Some(bounds) = def.condition.repeat_bounds() {
            if let Some(runtime) = self.runtimes.get_mut(index) {
                if let Err(fault) = runtime.arm(bounds, &mut self.rng) {
                    self.report(fault);
                }
            }
        }
        if !def.is_repeatable() {
            if let Some(runtime) = self.runtimes.get_mut(index) {
                runtime.disable();
            }
        }

        let roll: u32 = self.rng.r#gen();
        if u32::from(def.chance) <= roll % 100 {
            EventAiCounters::bump(&self.counters.chance_skipped);
            return false;
        }
        EventAiCounters::bump(&self.counters.events_fired);

        self.run_actions(&def, roll, ctx, world);
        true
    }

    /// Kind-specific trigger check. Friendly scans store the unit they
    /// found as the invoker.
    fn condition_holds<W: World + ?Sized>(
        &self,
        def: &EventDefinition,
        ctx: &mut InvocationContext,
        world: &W,
    ) -> bool {
        let actor = world.actor();
        match &def.condition {
            EventCondition::TimerInCombat(_) => world.in_combat(),
            EventCondition::TimerOutOfCombat(_) => !world.in_combat() && !world.is_evading(),
            EventCondition::TimerGeneric(_) => true,
            EventCondition::Health(band) => {
                world.in_combat() && percent_in_band(world.health(actor), band)
            }
            EventCondition::Mana(band) => {
                world.in_combat() && percent_in_band(world.power(actor, PowerKind::Mana), band)
            }
            EventCondition::Energy(band) => {
                world.in_combat() && percent_in_band(world.power(actor, PowerKind::Energy), band)
            }
            EventCondition::TargetHealth(band) => combat_victim(world)
                .is_some_and(|victim| percent_in_band(world.health(victim), band)),
            EventCondition::TargetMana(band) => combat_victim(world).is_some_and(|victim| {
                percent_in_band(world.power(victim, PowerKind::Mana), band)
            }),
            EventCondition::Range {
                min_distance,
                max_distance,
                ..
            } => combat_victim(world).is_some_and(|victim| {
                world.same_map(actor, victim)
                    && world
                        .distance(actor, victim)
                        .is_some_and(|d| d >= *min_distance && d <= *max_distance)
            }),
            EventCondition::TargetCasting { .. } => {
                combat_victim(world).is_some_and(|victim| world.is_casting(victim))
            }
            EventCondition::FriendlyHealth {
                min_deficit,
                radius,
                ..
            } => {
                world.in_combat()
                    && capture(ctx, world.find_friendly_injured(*radius, *min_deficit))
            }
            EventCondition::FriendlyIsCc {
                dispel_type,
                radius,
                ..
            } => {
                world.in_combat()
                    && capture(
                        ctx,
                        world.find_friendly_crowd_controlled(*radius, *dispel_type),
                    )
            }
            EventCondition::FriendlyMissingBuff { spell, radius, .. } => {
                capture(ctx, world.find_friendly_missing_buff(*radius, *spell))
            }
            EventCondition::SummonedUnit(filter)
            | EventCondition::SummonedJustDied(filter)
            | EventCondition::SummonedJustDespawned(filter) => {
                summon_matches(ctx.invoker, filter, world)
            }
            EventCondition::Aura(check) => {
                world.in_combat() && stacked(world, actor, check)
            }
            EventCondition::MissingAura(check) => {
                world.in_combat() && !stacked(world, actor, check)
            }
            EventCondition::TargetAura(check) => {
                combat_victim(world).is_some_and(|victim| stacked(world, victim, check))
            }
            EventCondition::TargetMissingAura(check) => {
                combat_victim(world).is_some_and(|victim| !stacked(world, victim, check))
            }
            EventCondition::ReachedWaypoint(wp) => {
                let Some(pos) = world.position(actor) else {
                    return false;
                };
                #[allow(clippy::cast_precision_loss)]
                let target = crate::types::Location::new(wp.x as f32, wp.y as f32, wp.z as f32);
                #[allow(clippy::cast_precision_loss)]
                let tolerance = wp.tolerance as f32;
                target.within_box(&pos, tolerance)
            }
            // Hooks pre-filter these before calling in.
            EventCondition::Aggro
            | EventCondition::Kill { .. }
            | EventCondition::Death
            | EventCondition::Evade
            | EventCondition::SpellHit { .. }
            | EventCondition::OutOfCombatLos { .. }
            | EventCondition::Spawned(_)
            | EventCondition::QuestAccept { .. }
            | EventCondition::QuestComplete { .. }
            | EventCondition::ReachedHome
            | EventCondition::ReceiveEmote { .. }
            | EventCondition::ReceiveSignal { .. } => true,
            EventCondition::Unsupported { .. } => false,
        }
    }
}

/// The victim, if the actor is in combat and has one.
fn combat_victim<W: World + ?Sized>(world: &W) -> Option<EntityId> {
    if world.in_combat() {
        world.victim()
    } else {
        None
    }
}

fn percent_in_band(pool: Option<Vitals>, band: &PercentBand) -> bool {
    pool.and_then(Vitals::percent)
        .is_some_and(|pct| band.contains(pct))
}

fn stacked<W: World + ?Sized>(world: &W, unit: EntityId, check: &AuraCheck) -> bool {
    let stacks = world.aura_stacks(unit, check.spell);
    stacks > 0 && stacks >= check.amount
}

fn capture(ctx: &mut InvocationContext, found: Option<EntityId>) -> bool {
    match found {
        Some(unit) => {
            ctx.invoker = Some(unit);
            true
        }
        None => false,
    }
}

fn summon_matches<W: World + ?Sized>(
    invoker: Option<EntityId>,
    filter: &SummonFilter,
    world: &W,
) -> bool {
    invoker.is_some_and(|summon| {
        !world.is_player(summon) && world.template_of(summon) == Some(filter.template)
    })
}
