//! The per-actor controller.
//!
//! An [`EventAi`] owns the runtime list of one actor plus the little bit of
//! AI state scripts can change (phase, melee and movement toggles, the
//! auto-signal mask, the invincibility floor). The host calls one hook per
//! lifecycle transition and [`EventAi::periodic_tick`] once per server tick.
//! Each hook scans the runtime list for the event kinds it drives and hands
//! matching runtimes to the evaluator.
//!
//! Every hook takes the actor's [`World`] explicitly. The controller keeps
//! no reference to the world between calls.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::action::CastFlags;
use crate::config::EventAiConfig;
use crate::error::Fault;
use crate::event::{EventCondition, RepeatBounds, SpawnCondition};
use crate::metrics::EventAiCounters;
use crate::runtime::{self, BuildContext, EventRuntime};
use crate::signal::{HEALTH_THRESHOLDS, HealthArc, SignalKind, SignalMask};
use crate::store::EventStore;
use crate::target::InvocationContext;
use crate::types::{Difficulty, EntityId, Phase, QuestId, SchoolMask, SpellId, TemplateId};
use crate::world::{CastOutcome, CastResult, World};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything an [`EventAi`] shares with its siblings in a zone.
#[derive(Debug, Clone)]
pub struct AiSettings {
    /// Engine configuration.
    pub config: Arc<EventAiConfig>,
    /// Counters the controller reports into.
    pub counters: Arc<EventAiCounters>,
    /// Instance difficulty; `None` outside instances.
    pub difficulty: Option<Difficulty>,
    /// Fixed RNG seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl AiSettings {
    /// Settings around a configuration, with fresh counters.
    #[must_use]
    pub fn new(config: Arc<EventAiConfig>) -> Self {
        Self {
            config,
            counters: Arc::new(EventAiCounters::new()),
            difficulty: None,
            seed: None,
        }
    }

    /// Share an existing set of counters.
    #[must_use]
    pub fn with_counters(mut self, counters: Arc<EventAiCounters>) -> Self {
        self.counters = counters;
        self
    }

    /// Set the instance difficulty.
    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Seed the controller's RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for AiSettings {
    fn default() -> Self {
        Self::new(Arc::new(EventAiConfig::default()))
    }
}

/// Who wants the actor to move in combat. Movement is on while either
/// side asks for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombatMovement {
    /// Requested by scripts (on by default).
    pub script: bool,
    /// Requested after a cast could not go off.
    pub spell: bool,
}

impl CombatMovement {
    /// Whether the actor moves in combat.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        self.script || self.spell
    }
}

impl Default for CombatMovement {
    fn default() -> Self {
        Self {
            script: true,
            spell: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Event-driven AI for one actor.
pub struct EventAi {
    pub(crate) template: TemplateId,
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) config: Arc<EventAiConfig>,
    pub(crate) counters: Arc<EventAiCounters>,
    pub(crate) runtimes: Vec<EventRuntime>,
    pub(crate) phase: Phase,
    pub(crate) melee_enabled: bool,
    pub(crate) combat_movement: CombatMovement,
    pub(crate) has_ooc_los_event: bool,
    pub(crate) update_timer: u32,
    pub(crate) pending_elapsed: u32,
    pub(crate) invincibility_floor: u32,
    pub(crate) throw_mask: SignalMask,
    pub(crate) health_arc: HealthArc,
    pub(crate) current_spell: Option<SpellId>,
    pub(crate) attack_distance: f32,
    pub(crate) attack_angle: f32,
    pub(crate) rng: StdRng,
}

impl EventAi {
    /// Build the controller for an actor of `template`.
    ///
    /// Configuration problems found while building the runtime list are
    /// reported here; the controller is usable either way. Call
    /// [`EventAi::on_activate`] once the actor is in the world.
    #[must_use]
    pub fn new(template: TemplateId, store: Arc<dyn EventStore>, settings: &AiSettings) -> Self {
        let ctx = BuildContext {
            debug_build: settings.config.general.debug_build,
            difficulty: settings.difficulty,
        };
        let list = runtime::build(template, store.as_ref(), &ctx);
        let rng = settings
            .seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);

        let mut ai = Self {
            template,
            store,
            update_timer: settings.config.scheduler.event_update_interval_ms,
            config: Arc::clone(&settings.config),
            counters: Arc::clone(&settings.counters),
            runtimes: list.entries,
            phase: Phase::ZERO,
            melee_enabled: true,
            combat_movement: CombatMovement::default(),
            has_ooc_los_event: list.has_ooc_los_event,
            pending_elapsed: 0,
            invincibility_floor: 0,
            throw_mask: SignalMask::EMPTY,
            health_arc: HealthArc::default(),
            current_spell: None,
            attack_distance: 0.0,
            attack_angle: 0.0,
            rng,
        };
        for fault in list.faults {
            ai.report(fault);
        }
        ai
    }

    // -- accessors ----------------------------------------------------------

    /// Template the runtime list was built for.
    #[must_use]
    pub const fn template(&self) -> TemplateId {
        self.template
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// The runtime list, in definition order.
    #[must_use]
    pub fn runtimes(&self) -> &[EventRuntime] {
        &self.runtimes
    }

    /// Whether melee swings are enabled.
    #[must_use]
    pub const fn melee_enabled(&self) -> bool {
        self.melee_enabled
    }

    /// Combat movement requests.
    #[must_use]
    pub const fn combat_movement(&self) -> CombatMovement {
        self.combat_movement
    }

    /// Signals thrown automatically on health and death transitions.
    #[must_use]
    pub const fn throw_mask(&self) -> SignalMask {
        self.throw_mask
    }

    /// Progress through the current damage arc.
    #[must_use]
    pub const fn health_arc(&self) -> HealthArc {
        self.health_arc
    }

    /// Health below which damage is clamped; 0 when unset.
    #[must_use]
    pub const fn invincibility_floor(&self) -> u32 {
        self.invincibility_floor
    }

    /// The spell whose cast result is being waited for.
    #[must_use]
    pub const fn current_spell(&self) -> Option<SpellId> {
        self.current_spell
    }

    /// Chase distance and angle (radians).
    #[must_use]
    pub const fn attack_offset(&self) -> (f32, f32) {
        (self.attack_distance, self.attack_angle)
    }

    /// Shared counters.
    #[must_use]
    pub fn counters(&self) -> &EventAiCounters {
        &self.counters
    }

    // -- lifecycle ----------------------------------------------------------

    /// First activation. Identical to a respawn.
    pub fn on_activate<W: World + ?Sized>(&mut self, world: &mut W) {
        self.on_respawn(world);
    }

    /// The actor (re)spawned: reset, re-arm generic timers from their
    /// initial bounds and fire spawn events whose condition matches.
    pub fn on_respawn<W: World + ?Sized>(&mut self, world: &mut W) {
        self.on_reset(world);
        for index in 0..self.runtimes.len() {
            let def = self.runtimes[index].shared_definition();
            match &def.condition {
                EventCondition::TimerGeneric(timer) => self.rearm(index, timer.initial),
                EventCondition::Spawned(condition) => {
                    if spawn_condition_holds(*condition, &*world) {
                        self.try_fire(index, InvocationContext::NONE, world);
                    }
                }
                _ => {}
            }
        }
    }

    /// Clear transient state and re-arm out-of-combat timers.
    pub fn on_reset<W: World + ?Sized>(&mut self, world: &mut W) {
        world.leave_evade();
        self.current_spell = None;
        self.update_timer = self.config.scheduler.event_update_interval_ms;
        self.pending_elapsed = 0;
        self.health_arc = HealthArc::Untouched;
        for index in 0..self.runtimes.len() {
            let timer = match self.runtimes[index].definition().condition {
                EventCondition::TimerOutOfCombat(timer) => timer,
                _ => continue,
            };
            self.rearm(index, timer.initial);
        }
    }

    /// Combat started against `enemy`.
    ///
    /// Aggro events fire right away, in-combat timers restart from their
    /// initial bounds and every other runtime is re-enabled with no
    /// cooldown.
    pub fn on_enter_combat<W: World + ?Sized>(&mut self, enemy: EntityId, world: &mut W) {
        for index in 0..self.runtimes.len() {
            let def = self.runtimes[index].shared_definition();
            match &def.condition {
                EventCondition::Aggro => {
                    self.runtimes[index].enable();
                    self.try_fire(index, InvocationContext::invoked_by(enemy), world);
                }
                EventCondition::TimerInCombat(timer) => self.rearm(index, timer.initial),
                _ => {
                    let runtime = &mut self.runtimes[index];
                    runtime.enable();
                    runtime.time_remaining = 0;
                }
            }
        }
        self.update_timer = self.config.scheduler.event_update_interval_ms;
        self.pending_elapsed = 0;
    }

    /// The actor gave up the fight and heads home.
    pub fn on_enter_evade<W: World + ?Sized>(&mut self, world: &mut W) {
        world.begin_evade();
        self.current_spell = None;
        self.fire_matching(world, InvocationContext::NONE, |c| {
            matches!(c, EventCondition::Evade)
        });
        world.finish_evade();
    }

    /// The actor died.
    pub fn on_death<W: World + ?Sized>(&mut self, killer: Option<EntityId>, world: &mut W) {
        self.on_reset(world);
        if self.throw_mask.contains(SignalKind::JustDied) {
            let radius = self.config.signals.default_throw_radius;
            self.throw_signal(SignalKind::JustDied, killer, radius, world);
        }
        let ctx = InvocationContext {
            invoker: killer,
            sender: None,
        };
        self.fire_matching(world, ctx, |c| matches!(c, EventCondition::Death));
        self.phase = Phase::ZERO;
    }

    /// The actor killed `victim`. Only player kills count.
    pub fn on_kill<W: World + ?Sized>(&mut self, victim: EntityId, world: &mut W) {
        if !world.is_player(victim) {
            return;
        }
        self.fire_matching(world, InvocationContext::invoked_by(victim), |c| {
            matches!(c, EventCondition::Kill { .. })
        });
    }

    /// The actor summoned `summon`.
    pub fn on_summon_created<W: World + ?Sized>(&mut self, summon: EntityId, world: &mut W) {
        self.fire_matching(world, InvocationContext::invoked_by(summon), |c| {
            matches!(c, EventCondition::SummonedUnit(_))
        });
    }

    /// A creature the actor summoned died.
    pub fn on_summoned_creature_died<W: World + ?Sized>(&mut self, summon: EntityId, world: &mut W) {
        self.fire_matching(world, InvocationContext::invoked_by(summon), |c| {
            matches!(c, EventCondition::SummonedJustDied(_))
        });
    }

    /// A creature the actor summoned despawned.
    pub fn on_summoned_creature_despawned<W: World + ?Sized>(
        &mut self,
        summon: EntityId,
        world: &mut W,
    ) {
        self.fire_matching(world, InvocationContext::invoked_by(summon), |c| {
            matches!(c, EventCondition::SummonedJustDespawned(_))
        });
    }

    /// Another actor threw a signal that reached this one.
    pub fn on_receive_signal<W: World + ?Sized>(
        &mut self,
        kind: SignalKind,
        sender: EntityId,
        invoker: Option<EntityId>,
        world: &mut W,
    ) {
        let sender_template = world.template_of(sender);
        let ctx = InvocationContext {
            invoker,
            sender: Some(sender),
        };
        self.fire_matching(world, ctx, |c| match c {
            EventCondition::ReceiveSignal {
                kind: wanted,
                sender: filter,
            } => *wanted == kind && filter.is_none_or(|t| Some(t) == sender_template),
            _ => false,
        });
    }

    /// A spell from `caster` hit the actor.
    pub fn on_spell_hit<W: World + ?Sized>(
        &mut self,
        caster: EntityId,
        spell: SpellId,
        school: SchoolMask,
        world: &mut W,
    ) {
        self.fire_matching(world, InvocationContext::invoked_by(caster), |c| match c {
            EventCondition::SpellHit {
                spell: wanted,
                school: schools,
                ..
            } => wanted.is_none_or(|w| w == spell) && schools.intersects(school),
            _ => false,
        });
    }

    /// `player` emoted at the actor.
    pub fn on_receive_emote<W: World + ?Sized>(&mut self, player: EntityId, emote: u32, world: &mut W) {
        for index in 0..self.runtimes.len() {
            let def = self.runtimes[index].shared_definition();
            let EventCondition::ReceiveEmote {
                emote: wanted,
                condition,
            } = &def.condition
            else {
                continue;
            };
            if *wanted != emote || !world.condition_holds(condition, player) {
                continue;
            }
            debug!(template = %self.template, event = %def.id, "emote condition met");
            self.try_fire(index, InvocationContext::invoked_by(player), world);
        }
    }

    /// The actor arrived at a waypoint.
    pub fn on_reached_waypoint<W: World + ?Sized>(&mut self, world: &mut W) {
        self.fire_matching(world, InvocationContext::NONE, |c| {
            matches!(c, EventCondition::ReachedWaypoint(_))
        });
    }

    /// The actor is back home after evading. Fires, then resets.
    pub fn on_reached_home<W: World + ?Sized>(&mut self, world: &mut W) {
        self.fire_matching(world, InvocationContext::NONE, |c| {
            matches!(c, EventCondition::ReachedHome)
        });
        self.on_reset(world);
    }

    /// `player` accepted `quest` from the actor.
    pub fn on_quest_accept<W: World + ?Sized>(&mut self, player: EntityId, quest: QuestId, world: &mut W) {
        self.fire_matching(world, InvocationContext::invoked_by(player), |c| {
            matches!(c, EventCondition::QuestAccept { quest: q } if *q == quest)
        });
    }

    /// `player` turned in `quest` at the actor.
    pub fn on_quest_complete<W: World + ?Sized>(
        &mut self,
        player: EntityId,
        quest: QuestId,
        world: &mut W,
    ) {
        self.fire_matching(world, InvocationContext::invoked_by(player), |c| {
            matches!(c, EventCondition::QuestComplete { quest: q } if *q == quest)
        });
    }

    /// `dealer` is about to deal `damage`.
    ///
    /// Clamps the damage to the invincibility floor, then throws the
    /// deepest health-threshold signal crossed in this arc, if any.
    pub fn on_damage_taken<W: World + ?Sized>(
        &mut self,
        dealer: EntityId,
        damage: &mut u32,
        world: &mut W,
    ) {
        let Some(health) = world.health(world.actor()) else {
            return;
        };
        let floor = self.invincibility_floor;
        if floor > 0 && u64::from(health.current) < u64::from(floor) + u64::from(*damage) {
            *damage = health.current.saturating_sub(floor);
        }

        let Some(mut step) = self.health_arc.next_step() else {
            return;
        };
        if health.max == 0 {
            return;
        }
        let remaining = f64::from(health.current.saturating_sub(*damage));
        let percent = remaining * 100.0 / f64::from(health.max);
        if percent > HEALTH_THRESHOLDS[step].0 {
            return;
        }
        // Skip straight to the deepest threshold that has a signal attached.
        for deeper in (step + 1..HEALTH_THRESHOLDS.len()).rev() {
            let (threshold, kind) = HEALTH_THRESHOLDS[deeper];
            if percent < threshold && self.throw_mask.contains(kind) {
                step = deeper;
                break;
            }
        }
        let kind = HEALTH_THRESHOLDS[step].1;
        if self.throw_mask.contains(kind) {
            let radius = self.config.signals.default_throw_radius;
            self.throw_signal(kind, Some(dealer), radius, world);
        }
        self.health_arc = HealthArc::after_step(step);
    }

    /// `healer` is about to restore `amount` health.
    pub fn on_healed<W: World + ?Sized>(&mut self, healer: EntityId, amount: u32, world: &mut W) {
        if self.health_arc == HealthArc::FullHealthSent {
            return;
        }
        let Some(health) = world.health(world.actor()) else {
            return;
        };
        if u64::from(health.current) + u64::from(amount) >= u64::from(health.max) {
            if self.throw_mask.contains(SignalKind::GotFullHealth) {
                let radius = self.config.signals.default_throw_radius;
                self.throw_signal(SignalKind::GotFullHealth, Some(healer), radius, world);
            }
            self.health_arc = HealthArc::FullHealthSent;
        }
    }

    /// Advance the controller by `elapsed` milliseconds.
    ///
    /// Timers move in aggregated steps of at least the configured update
    /// interval. Within a step, cooling runtimes outside the phase mask
    /// count down, and armed timer-kind runtimes are evaluated.
    pub fn periodic_tick<W: World + ?Sized>(&mut self, elapsed: u32, world: &mut W) {
        let in_combat = world.select_hostile_target() && world.victim().is_some();

        if self.update_timer < elapsed {
            self.pending_elapsed = self.pending_elapsed.saturating_add(elapsed);
            EventAiCounters::bump(&self.counters.timer_updates);
            let step = self.pending_elapsed;
            for index in 0..self.runtimes.len() {
                let runtime = &mut self.runtimes[index];
                let masked = runtime.definition().inverse_phase_mask.contains(self.phase);
                if runtime.is_cooling() && !masked {
                    runtime.advance(step);
                }
                if !runtime.is_armed() || !runtime.definition().condition.is_timer_based() {
                    continue;
                }
                self.try_fire(index, InvocationContext::NONE, world);
            }
            self.pending_elapsed = 0;
            self.update_timer = self.config.scheduler.event_update_interval_ms;
        } else {
            self.pending_elapsed = self.pending_elapsed.saturating_add(elapsed);
            self.update_timer -= elapsed;
        }

        if in_combat && self.melee_enabled && world.victim().is_some() {
            world.melee_attack_if_ready();
        }
    }

    /// `who` came into view.
    ///
    /// Out-of-combat sight events are considered first; the actor then
    /// attacks if the world says it would.
    pub fn on_move_in_line_of_sight<W: World + ?Sized>(&mut self, who: EntityId, world: &mut W) {
        if self.has_ooc_los_event && world.victim().is_none() {
            let actor = world.actor();
            let hostile = world.is_hostile(actor, who);
            for index in 0..self.runtimes.len() {
                let EventCondition::OutOfCombatLos {
                    no_hostile,
                    max_range,
                    ..
                } = self.runtimes[index].definition().condition
                else {
                    continue;
                };
                if no_hostile == hostile {
                    continue;
                }
                let in_range = world.same_map(actor, who)
                    && world.distance(actor, who).is_some_and(|d| d <= max_range);
                if in_range && world.in_line_of_sight(actor, who) {
                    self.try_fire(index, InvocationContext::invoked_by(who), world);
                }
            }
        }

        if world.victim().is_none() && world.can_start_attack(who) {
            self.on_attack_start(who, world);
        }
    }

    /// Start attacking `who`.
    pub fn on_attack_start<W: World + ?Sized>(&mut self, who: EntityId, world: &mut W) {
        if !world.start_attack(who, self.melee_enabled) {
            return;
        }
        if self.combat_movement.is_enabled() {
            world.chase(who, self.attack_distance, self.attack_angle);
        } else {
            world.stop_chase();
        }
    }

    /// The world reports how a tracked cast ended.
    pub fn on_spell_cast_result<W: World + ?Sized>(
        &mut self,
        spell: SpellId,
        outcome: CastOutcome,
        world: &mut W,
    ) {
        if self.current_spell != Some(spell) {
            return;
        }
        self.current_spell = None;

        let actor = world.actor();
        if outcome.wants_chase() {
            world.interrupt_cast(actor);
            self.combat_movement.spell = true;
            self.set_chase(true, world);
            return;
        }
        if outcome != CastOutcome::Succeeded {
            world.interrupt_cast(actor);
        }
        self.combat_movement.spell = false;
        self.set_chase(false, world);
    }

    // -- internals ----------------------------------------------------------

    /// Log and count a fault.
    pub(crate) fn report(&self, fault: Fault) {
        warn!(template = %self.template, fault = %fault, "event ai fault");
        EventAiCounters::bump(&self.counters.faults_reported);
        if fault.is_target_failure() {
            EventAiCounters::bump(&self.counters.targets_unresolved);
        }
    }

    /// Try every runtime whose condition satisfies `filter`, in order.
    fn fire_matching<W, F>(&mut self, world: &mut W, ctx: InvocationContext, filter: F)
    where
        W: World + ?Sized,
        F: Fn(&EventCondition) -> bool,
    {
        for index in 0..self.runtimes.len() {
            if filter(&self.runtimes[index].definition().condition) {
                self.try_fire(index, ctx, world);
            }
        }
    }

    /// Restart a runtime's countdown from `bounds` and enable it.
    fn rearm(&mut self, index: usize, bounds: RepeatBounds) {
        let Some(runtime) = self.runtimes.get_mut(index) else {
            return;
        };
        match runtime.arm(bounds, &mut self.rng) {
            Ok(()) => runtime.enable(),
            Err(fault) => self.report(fault),
        }
    }

    /// Throw a signal around the actor. A zero radius uses the default.
    pub(crate) fn throw_signal<W: World + ?Sized>(
        &mut self,
        kind: SignalKind,
        invoker: Option<EntityId>,
        radius: f32,
        world: &mut W,
    ) {
        let radius = if radius > 0.0 {
            radius
        } else {
            self.config.signals.default_throw_radius
        };
        debug!(template = %self.template, signal = %kind, radius, "throwing signal");
        world.throw_signal(kind, invoker, radius);
        EventAiCounters::bump(&self.counters.signals_thrown);
    }

    /// Close in on the victim, or stop chasing it. Only acts while combat
    /// movement is on and there is a victim.
    pub(crate) fn set_chase<W: World + ?Sized>(&mut self, chase: bool, world: &mut W) {
        if !self.combat_movement.is_enabled() {
            return;
        }
        let Some(victim) = world.victim() else {
            return;
        };
        if chase {
            world.chase(victim, 0.0, 0.0);
        } else if world.is_chasing() {
            world.stop_chase();
        }
    }

    /// Cast with the engine's pre-checks and movement fallback.
    ///
    /// Results that mean "get closer" switch spell-driven movement on and
    /// chase the victim, unless the flags say to stand still.
    pub(crate) fn do_cast<W: World + ?Sized>(
        &mut self,
        target: EntityId,
        spell: SpellId,
        flags: CastFlags,
        world: &mut W,
    ) -> CastResult {
        self.combat_movement.spell = false;
        self.current_spell = Some(spell);
        self.set_chase(false, world);

        // A forced self-cast makes the target cast the spell on itself.
        let caster = if flags.intersects(CastFlags::FORCE_TARGET_SELF) {
            target
        } else {
            world.actor()
        };
        let busy = world.is_casting(caster);
        let result = if busy
            && !flags.intersects(CastFlags::TRIGGERED | CastFlags::INTERRUPT_PREVIOUS)
        {
            CastResult::IsCasting
        } else if flags.intersects(CastFlags::AURA_NOT_PRESENT)
            && world.aura_stacks(target, spell) > 0
        {
            CastResult::TargetAura
        } else {
            if busy && flags.intersects(CastFlags::INTERRUPT_PREVIOUS) {
                world.interrupt_cast(caster);
            }
            world.cast_as(caster, target, spell, flags)
        };

        match result {
            CastResult::Ok => {}
            r if r.wants_chase() => {
                if flags.intersects(CastFlags::NO_MELEE_IF_OOM) {
                    self.current_spell = None;
                } else {
                    self.combat_movement.spell = true;
                    self.set_chase(true, world);
                }
            }
            _ => self.current_spell = None,
        }
        debug!(template = %self.template, spell = %spell, result = ?result, "cast requested");
        result
    }
}

fn spawn_condition_holds<W: World + ?Sized>(condition: SpawnCondition, world: &W) -> bool {
    match condition {
        SpawnCondition::Always => true,
        SpawnCondition::Map(map) => world.map_id() == map,
        SpawnCondition::ZoneOrArea(id) => {
            let (zone, area) = world.zone_and_area();
            zone == id || area == id
        }
    }
}
