//! Zone — owns every actor's controller and the world they share.
//!
//! A zone is the host-side glue around `eventai-core`: it spawns units,
//! builds a controller for each scripted creature, routes [`ZoneEvent`]s
//! into hooks and ticks everyone. After every event or tick it *settles*:
//! commands that have consequences for other controllers (summons, attack
//! orders, suicides, despawns) are followed up, and thrown signals are
//! delivered to living scripted creatures within radius, never to the
//! sender. Settling is bounded by `max_signal_rounds` so scripts that
//! answer signals with signals cannot spin forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use eventai_core::config::EventAiConfig;
use eventai_core::diagnostics::AiInformation;
use eventai_core::engine::{AiSettings, EventAi};
use eventai_core::metrics::{EventAiCounters, TickSample, ZoneTickMonitor, spans};
use eventai_core::sandbox::{ActorScope, JournalEntry, SandboxEffect, SandboxWorld, UnitSpec};
use eventai_core::store::EventStore;
use eventai_core::types::EntityId;
use eventai_core::world::WorldView;
use tracing::{debug, debug_span, info, info_span, warn};

use crate::config::ZoneConfig;
use crate::error::{Result, ZoneError};
use crate::events::ZoneEvent;

// ---------------------------------------------------------------------------
// Zone State
// ---------------------------------------------------------------------------

/// A zone full of scripted creatures.
pub struct Zone {
    /// The shared world.
    pub world: SandboxWorld,
    controllers: HashMap<EntityId, EventAi>,
    /// Tick order: spawn order.
    order: Vec<EntityId>,
    store: Arc<dyn EventStore>,
    engine: Arc<EventAiConfig>,
    config: ZoneConfig,
    counters: Arc<EventAiCounters>,
    monitor: ZoneTickMonitor,
    /// How far into the world journal follow-ups have been processed.
    cursor: usize,
}

/// How a settle pass ended.
#[derive(Debug, Clone, Copy)]
struct Settled {
    rounds: u32,
    exhausted: bool,
}

impl Zone {
    /// An empty zone backed by `store`.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>, config: ZoneConfig) -> Self {
        info!(
            budget_ms = config.zone.tick_budget_ms,
            signal_rounds = config.zone.max_signal_rounds,
            "zone created"
        );
        Self {
            world: SandboxWorld::new(),
            controllers: HashMap::new(),
            order: Vec::new(),
            store,
            engine: Arc::new(config.engine.clone()),
            monitor: ZoneTickMonitor::new(config.zone.tick_budget_ms, config.zone.tick_window),
            counters: Arc::new(EventAiCounters::new()),
            config,
            cursor: 0,
        }
    }

    /// Add a unit. Creatures whose template has scripts get a controller,
    /// which is activated straight away.
    pub fn spawn(&mut self, spec: UnitSpec) -> EntityId {
        let id = self.world.add_unit(spec);
        self.adopt(id);
        self.settle();
        id
    }

    /// The controller of a unit.
    #[must_use]
    pub fn controller(&self, unit: EntityId) -> Option<&EventAi> {
        self.controllers.get(&unit)
    }

    /// Number of scripted actors.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.controllers.len()
    }

    /// Counters shared by every controller in the zone.
    #[must_use]
    pub fn counters(&self) -> &EventAiCounters {
        &self.counters
    }

    /// Recent tick costs.
    #[must_use]
    pub fn monitor(&self) -> &ZoneTickMonitor {
        &self.monitor
    }

    /// Operator summary of one actor.
    #[must_use]
    pub fn information(&self, unit: EntityId) -> Option<AiInformation> {
        self.controllers.get(&unit).map(EventAi::information)
    }

    /// Hand the recorded effects to the host and start a fresh journal.
    pub fn drain_journal(&mut self) -> Vec<JournalEntry> {
        self.cursor = 0;
        self.world.take_journal()
    }

    // -- driving ------------------------------------------------------------

    /// Advance every living actor by `elapsed` milliseconds.
    pub fn tick(&mut self, elapsed: u32) {
        let started = Instant::now();
        let mut sample = TickSample::default();
        {
            let _span = info_span!(spans::ZONE_TICK, actors = self.order.len()).entered();
            self.expire_despawns(elapsed);
            for i in 0..self.order.len() {
                let id = self.order[i];
                if !self.world.unit(id).is_some_and(|u| u.alive) {
                    continue;
                }
                let _actor = debug_span!(spans::ACTOR_UPDATE).entered();
                let actor_started = Instant::now();
                self.drive(id, |ai, w| ai.periodic_tick(elapsed, w));
                let actor_ms = actor_started.elapsed().as_secs_f64() * 1000.0;
                sample.actors_updated += 1;
                sample.slowest_actor_ms = sample.slowest_actor_ms.max(actor_ms);
            }
            let settled = self.settle();
            sample.settle_rounds = settled.rounds;
            sample.settle_exhausted = settled.exhausted;
        }
        sample.total_ms = started.elapsed().as_secs_f64() * 1000.0;
        if self.monitor.record(sample) {
            warn!(
                last_ms = sample.total_ms,
                budget_ms = self.monitor.budget_ms(),
                actors = sample.actors_updated,
                slowest_actor_ms = sample.slowest_actor_ms,
                settle_rounds = sample.settle_rounds,
                "zone tick over budget"
            );
        }
    }

    /// Route a world event into the hooks it concerns.
    ///
    /// # Errors
    /// Returns `ZoneError::UnknownUnit` if the event's subject does not
    /// exist.
    pub fn handle(&mut self, event: ZoneEvent) -> Result<()> {
        let subject = event.subject();
        if self.world.unit(subject).is_none() {
            return Err(ZoneError::UnknownUnit(subject));
        }
        debug!(?event, "zone event");

        match event {
            ZoneEvent::Damage {
                dealer,
                target,
                amount,
            } => self.damage(dealer, target, amount),
            ZoneEvent::Heal {
                healer,
                target,
                amount,
            } => {
                self.drive(target, |ai, w| ai.on_healed(healer, amount, w));
                if let Some(unit) = self.world.unit_mut(target) {
                    let health = &mut unit.health;
                    health.current = health.current.saturating_add(amount).min(health.max);
                }
            }
            ZoneEvent::Died { unit, killer } => {
                if self.world.unit(unit).is_some_and(|u| u.alive) {
                    self.world.set_alive(unit, false);
                    self.notify_death(unit, killer);
                }
            }
            ZoneEvent::CombatStarted { actor, enemy } => {
                self.world.add_threat(actor, enemy, 1.0);
                self.drive(actor, |ai, w| ai.on_enter_combat(enemy, w));
            }
            ZoneEvent::Evade { actor } => self.drive(actor, |ai, w| ai.on_enter_evade(w)),
            ZoneEvent::Respawned { unit } => {
                if let Some(u) = self.world.unit_mut(unit) {
                    u.alive = true;
                    u.health.current = u.health.max;
                }
                self.world.clear_threat(unit);
                self.drive(unit, |ai, w| ai.on_respawn(w));
            }
            ZoneEvent::SpellHit {
                caster,
                target,
                spell,
                school,
            } => self.drive(target, |ai, w| ai.on_spell_hit(caster, spell, school, w)),
            ZoneEvent::CastFinished {
                caster,
                spell,
                outcome,
            } => self.drive(caster, |ai, w| ai.on_spell_cast_result(spell, outcome, w)),
            ZoneEvent::Emote {
                player,
                target,
                emote,
            } => self.drive(target, |ai, w| ai.on_receive_emote(player, emote, w)),
            ZoneEvent::Sighted { observer, who } => {
                self.engage(observer, who, |ai, w| ai.on_move_in_line_of_sight(who, w));
            }
            ZoneEvent::ReachedWaypoint { actor } => {
                self.drive(actor, |ai, w| ai.on_reached_waypoint(w));
            }
            ZoneEvent::ReachedHome { actor } => self.drive(actor, |ai, w| ai.on_reached_home(w)),
            ZoneEvent::QuestAccepted {
                player,
                giver,
                quest,
            } => self.drive(giver, |ai, w| ai.on_quest_accept(player, quest, w)),
            ZoneEvent::QuestCompleted {
                player,
                giver,
                quest,
            } => self.drive(giver, |ai, w| ai.on_quest_complete(player, quest, w)),
        }
        self.settle();
        Ok(())
    }

    // -- internals ----------------------------------------------------------

    /// Run `f` against a unit's controller and its scoped world. Units
    /// without a controller are skipped.
    fn drive<F>(&mut self, unit: EntityId, f: F)
    where
        F: FnOnce(&mut EventAi, &mut ActorScope<'_>),
    {
        if let Some(ai) = self.controllers.get_mut(&unit) {
            let mut scope = self.world.scope(unit);
            f(ai, &mut scope);
        }
    }

    /// Like [`Zone::drive`], then enter combat if the hook pulled the
    /// actor into a fight.
    fn engage<F>(&mut self, actor: EntityId, enemy: EntityId, f: F)
    where
        F: FnOnce(&mut EventAi, &mut ActorScope<'_>),
    {
        let was_fighting = self.in_combat(actor);
        self.drive(actor, f);
        if !was_fighting && self.in_combat(actor) {
            self.drive(actor, |ai, w| ai.on_enter_combat(enemy, w));
        }
    }

    fn in_combat(&mut self, unit: EntityId) -> bool {
        self.world.scope(unit).in_combat()
    }

    /// Build and activate a controller for a scripted creature.
    fn adopt(&mut self, unit: EntityId) {
        let Some(template) = self.world.unit(unit).and_then(|u| u.template) else {
            return;
        };
        if self.store.definitions(template).is_none() {
            return;
        }
        let mut settings =
            AiSettings::new(Arc::clone(&self.engine)).with_counters(Arc::clone(&self.counters));
        if let Some(seed) = self.config.zone.rng_seed {
            let offset = u64::try_from(self.order.len()).unwrap_or(u64::MAX);
            settings = settings.with_seed(seed.wrapping_add(offset));
        }
        let ai = EventAi::new(template, Arc::clone(&self.store), &settings);
        self.controllers.insert(unit, ai);
        self.order.push(unit);
        debug!(unit = %unit, template = %template, "controller adopted");
        self.drive(unit, |ai, w| ai.on_activate(w));
    }

    fn damage(&mut self, dealer: EntityId, target: EntityId, amount: u32) {
        let mut dealt = amount;
        self.engage(target, dealer, |ai, w| {
            ai.on_damage_taken(dealer, &mut dealt, w);
        });
        let Some(unit) = self.world.unit_mut(target) else {
            return;
        };
        unit.health.current = unit.health.current.saturating_sub(dealt);
        let killed = unit.alive && unit.health.current == 0;
        #[allow(clippy::cast_precision_loss)]
        let threat = dealt as f32;
        if killed {
            unit.alive = false;
            self.notify_death(target, Some(dealer));
        } else {
            let was_fighting = self.in_combat(target);
            self.world.add_threat(target, dealer, threat);
            if !was_fighting {
                self.drive(target, |ai, w| ai.on_enter_combat(dealer, w));
            }
        }
    }

    /// Death bookkeeping: the dead unit, its killer, its summoner.
    fn notify_death(&mut self, unit: EntityId, killer: Option<EntityId>) {
        self.drive(unit, |ai, w| ai.on_death(killer, w));
        self.world.clear_threat(unit);
        if let Some(killer) = killer {
            self.drive(killer, |ai, w| ai.on_kill(unit, w));
        }
        if let Some(summoner) = self.world.unit(unit).and_then(|u| u.summoner) {
            self.drive(summoner, |ai, w| ai.on_summoned_creature_died(unit, w));
        }
    }

    /// Follow up commands and deliver signals until nothing is pending or
    /// the round limit is hit.
    fn settle(&mut self) -> Settled {
        let _span = debug_span!(spans::SIGNAL_DELIVERY).entered();
        let limit = self.config.zone.max_signal_rounds;
        for rounds in 0..limit {
            if self.cursor >= self.world.journal().len() && self.world.pending_signals() == 0 {
                return Settled {
                    rounds,
                    exhausted: false,
                };
            }
            self.follow_journal();
            self.deliver_signals();
        }
        let dropped = self.world.take_signals().len();
        let unfollowed = self.world.journal().len().saturating_sub(self.cursor);
        self.cursor = self.world.journal().len();
        let exhausted = dropped > 0 || unfollowed > 0;
        if exhausted {
            warn!(
                dropped,
                unfollowed,
                rounds = limit,
                "settle rounds exhausted, dropping pending signals"
            );
        }
        Settled {
            rounds: limit,
            exhausted,
        }
    }

    fn follow_journal(&mut self) {
        let entries = self.world.journal()[self.cursor..].to_vec();
        self.cursor += entries.len();
        for entry in entries {
            match entry.effect {
                SandboxEffect::Summon { unit, .. } => {
                    self.adopt(unit);
                    self.drive(entry.actor, |ai, w| ai.on_summon_created(unit, w));
                }
                SandboxEffect::OrderAttack { attacker, target } => {
                    self.drive(attacker, |ai, w| {
                        ai.on_attack_start(target, w);
                        ai.on_enter_combat(target, w);
                    });
                }
                SandboxEffect::KillSelf => self.notify_death(entry.actor, None),
                SandboxEffect::Despawn(0) => self.despawn(entry.actor),
                _ => {}
            }
        }
    }

    /// Count down scheduled despawns; units whose delay ran out vanish.
    fn expire_despawns(&mut self, elapsed: u32) {
        let scheduled: Vec<EntityId> = self
            .world
            .units()
            .filter(|u| u.alive && u.despawn_in.is_some())
            .map(|u| u.id)
            .collect();
        for id in scheduled {
            let Some(unit) = self.world.unit_mut(id) else {
                continue;
            };
            let left = unit.despawn_in.unwrap_or(0);
            if left > elapsed {
                unit.despawn_in = Some(left - elapsed);
            } else {
                self.despawn(id);
            }
        }
    }

    fn despawn(&mut self, unit: EntityId) {
        let summoner = match self.world.unit_mut(unit) {
            Some(u) if u.alive => {
                u.alive = false;
                u.despawn_in = None;
                u.summoner
            }
            _ => return,
        };
        self.world.clear_threat(unit);
        debug!(unit = %unit, "despawned");
        if let Some(summoner) = summoner {
            self.drive(summoner, |ai, w| ai.on_summoned_creature_despawned(unit, w));
        }
    }

    fn deliver_signals(&mut self) {
        for signal in self.world.take_signals() {
            let recipients: Vec<EntityId> = self
                .world
                .creatures_near(signal.sender, signal.radius)
                .into_iter()
                .filter(|id| self.controllers.contains_key(id))
                .collect();
            debug!(
                sender = %signal.sender,
                signal = %signal.kind,
                recipients = recipients.len(),
                "delivering signal"
            );
            for recipient in recipients {
                self.drive(recipient, |ai, w| {
                    ai.on_receive_signal(signal.kind, signal.sender, signal.invoker, w);
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventai_core::action::{ActionEffect, TargetSelector};
    use eventai_core::event::{
        EventCondition, EventDefinition, EventFlags, RepeatBounds, SpawnCondition, SummonFilter,
        TimerSpec,
    };
    use eventai_core::signal::SignalKind;
    use eventai_core::store::InMemoryEventStore;
    use eventai_core::types::{Location, TemplateId};

    fn zone(defs: Vec<EventDefinition>) -> Zone {
        let mut config = ZoneConfig::default();
        config.zone.rng_seed = Some(5);
        Zone::new(Arc::new(InMemoryEventStore::from_definitions(defs)), config)
    }

    fn emotes(zone: &Zone, unit: EntityId) -> Vec<u32> {
        zone.world
            .effects_of(unit)
            .filter_map(|e| match e {
                SandboxEffect::Emote(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn emote(id: u32) -> ActionEffect {
        ActionEffect::Emote { emote: id }
    }

    #[test]
    fn signal_reaches_creatures_in_radius_but_not_sender() {
        let listener = |template: u32, id: u32, reply: u32| {
            EventDefinition::new(id, template, EventCondition::ReceiveSignal {
                kind: SignalKind::CustomA,
                sender: None,
            })
            .with_action(0, emote(reply))
        };
        let mut zone = zone(vec![
            EventDefinition::new(1, 1, EventCondition::Spawned(SpawnCondition::Always)).with_action(
                0,
                ActionEffect::ThrowSignal {
                    kind: SignalKind::CustomA,
                    radius: 10.0,
                },
            ),
            listener(1, 2, 8),
            listener(2, 3, 7),
        ]);
        let near = zone.spawn(UnitSpec::creature(TemplateId(2)).at(Location::new(5.0, 0.0, 0.0)));
        let far = zone.spawn(UnitSpec::creature(TemplateId(2)).at(Location::new(50.0, 0.0, 0.0)));
        let sender = zone.spawn(UnitSpec::creature(TemplateId(1)));

        assert_eq!(emotes(&zone, near), vec![7]);
        assert!(emotes(&zone, far).is_empty());
        assert!(emotes(&zone, sender).is_empty());
    }

    #[test]
    fn signal_ping_pong_is_bounded() {
        let mut zone = zone(vec![
            EventDefinition::new(1, 3, EventCondition::ReceiveSignal {
                kind: SignalKind::CustomB,
                sender: None,
            })
            .with_flags(EventFlags::REPEATABLE)
            .with_action(
                0,
                ActionEffect::ThrowSignal {
                    kind: SignalKind::CustomB,
                    radius: 10.0,
                },
            ),
            EventDefinition::new(2, 4, EventCondition::Spawned(SpawnCondition::Always)).with_action(
                0,
                ActionEffect::ThrowSignal {
                    kind: SignalKind::CustomB,
                    radius: 10.0,
                },
            ),
        ]);
        zone.spawn(UnitSpec::creature(TemplateId(3)));
        zone.spawn(UnitSpec::creature(TemplateId(3)));
        zone.spawn(UnitSpec::creature(TemplateId(4)));
        assert_eq!(zone.world.pending_signals(), 0);

        zone.tick(1000);
        assert_eq!(zone.world.pending_signals(), 0);
    }

    #[test]
    fn lethal_damage_runs_aggro_then_death() {
        let mut zone = zone(vec![
            EventDefinition::new(1, 5, EventCondition::Aggro).with_action(0, emote(1)),
            EventDefinition::new(2, 5, EventCondition::Death).with_action(0, emote(2)),
        ]);
        let npc = zone.spawn(UnitSpec::creature(TemplateId(5)).with_health(50, 100));
        let player = zone.spawn(UnitSpec::player());

        zone.handle(ZoneEvent::Damage {
            dealer: player,
            target: npc,
            amount: 10,
        })
        .expect("known unit");
        assert_eq!(emotes(&zone, npc), vec![1]);

        zone.handle(ZoneEvent::Damage {
            dealer: player,
            target: npc,
            amount: 100,
        })
        .expect("known unit");
        assert_eq!(emotes(&zone, npc), vec![1, 2]);
        assert!(!zone.world.unit(npc).is_some_and(|u| u.alive));
    }

    #[test]
    fn summons_get_controllers_and_notify_the_summoner() {
        let mut zone = zone(vec![
            EventDefinition::new(1, 6, EventCondition::Aggro).with_action(
                0,
                ActionEffect::Summon {
                    template: TemplateId(7),
                    target: TargetSelector::Victim,
                    duration_ms: 0,
                },
            ),
            EventDefinition::new(
                2,
                6,
                EventCondition::SummonedUnit(SummonFilter {
                    template: TemplateId(7),
                    repeat: RepeatBounds::fixed(0),
                }),
            )
            .with_action(0, emote(12)),
            EventDefinition::new(3, 7, EventCondition::Spawned(SpawnCondition::Always))
                .with_action(0, emote(11)),
        ]);
        let boss = zone.spawn(UnitSpec::creature(TemplateId(6)));
        let player = zone.spawn(UnitSpec::player().at(Location::new(3.0, 0.0, 0.0)));

        zone.handle(ZoneEvent::CombatStarted {
            actor: boss,
            enemy: player,
        })
        .expect("known unit");

        let summon = zone
            .world
            .units()
            .find(|u| u.template == Some(TemplateId(7)))
            .map(|u| u.id)
            .expect("summoned");
        assert!(zone.controller(summon).is_some());
        assert_eq!(emotes(&zone, summon), vec![11]);
        assert_eq!(emotes(&zone, boss), vec![12]);
        assert_eq!(zone.world.threat_of(summon), vec![player]);
    }

    #[test]
    fn delayed_despawn_waits_then_tells_the_summoner() {
        let mut zone = zone(vec![
            EventDefinition::new(1, 10, EventCondition::Spawned(SpawnCondition::Always))
                .with_action(
                    0,
                    ActionEffect::Summon {
                        template: TemplateId(11),
                        target: TargetSelector::SelfActor,
                        duration_ms: 0,
                    },
                ),
            EventDefinition::new(
                2,
                10,
                EventCondition::SummonedJustDespawned(SummonFilter {
                    template: TemplateId(11),
                    repeat: RepeatBounds::fixed(0),
                }),
            )
            .with_action(0, emote(30)),
            EventDefinition::new(3, 11, EventCondition::Spawned(SpawnCondition::Always))
                .with_action(0, ActionEffect::ForceDespawn { delay_ms: 1500 }),
        ]);
        let owner = zone.spawn(UnitSpec::creature(TemplateId(10)));
        let summon = zone
            .world
            .units()
            .find(|u| u.summoner == Some(owner))
            .map(|u| u.id)
            .expect("summoned");

        zone.tick(1000);
        assert!(zone.world.unit(summon).is_some_and(|u| u.alive));
        assert!(emotes(&zone, owner).is_empty());

        zone.tick(1000);
        assert!(!zone.world.unit(summon).is_some_and(|u| u.alive));
        assert_eq!(emotes(&zone, owner), vec![30]);
    }

    #[test]
    fn unknown_subject_is_an_error() {
        let mut zone = zone(Vec::new());
        let ghost = EntityId::new();
        let err = zone.handle(ZoneEvent::Evade { actor: ghost });
        assert!(matches!(err, Err(ZoneError::UnknownUnit(id)) if id == ghost));
    }

    #[test]
    fn ticks_are_timed_and_counted() {
        let mut zone = zone(vec![
            EventDefinition::new(1, 8, EventCondition::Spawned(SpawnCondition::Always))
                .with_action(0, emote(1)),
        ]);
        zone.spawn(UnitSpec::creature(TemplateId(8)));
        zone.spawn(UnitSpec::creature(TemplateId(9)));
        assert_eq!(zone.actor_count(), 1, "unscripted creatures get no controller");

        for _ in 0..3 {
            zone.tick(600);
        }
        assert_eq!(zone.monitor().tick_count(), 3);
        let last = zone.monitor().last().expect("recorded");
        assert_eq!(last.actors_updated, 1);
        assert!(last.slowest_actor_ms <= last.total_ms);
        assert!(!last.settle_exhausted);
        assert_eq!(zone.counters().snapshot().events_fired, 1);
        assert!(!zone.drain_journal().is_empty());
        assert!(zone.world.journal().is_empty());
    }

    #[test]
    fn tick_monitor_sees_signal_storms() {
        let crier = EventDefinition::new(1, 4, EventCondition::TimerGeneric(TimerSpec {
            initial: RepeatBounds::fixed(0),
            repeat: RepeatBounds::fixed(0),
        }))
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, ActionEffect::ThrowSignal {
            kind: SignalKind::CustomB,
            radius: 10.0,
        });
        let echo = EventDefinition::new(2, 3, EventCondition::ReceiveSignal {
            kind: SignalKind::CustomB,
            sender: None,
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, ActionEffect::ThrowSignal {
            kind: SignalKind::CustomB,
            radius: 10.0,
        });
        let mut zone = zone(vec![crier, echo]);
        zone.spawn(UnitSpec::creature(TemplateId(4)));
        zone.spawn(UnitSpec::creature(TemplateId(3)));
        zone.spawn(UnitSpec::creature(TemplateId(3)));
        assert_eq!(zone.monitor().tick_count(), 0, "spawns are not ticks");

        zone.tick(1000);
        let last = zone.monitor().last().expect("recorded");
        assert_eq!(last.actors_updated, 3);
        assert!(last.settle_exhausted);
        assert_eq!(last.settle_rounds, zone.config.zone.max_signal_rounds);
        assert_eq!(zone.monitor().exhausted_settles(), 1);
        assert_eq!(zone.monitor().summary().max_settle_rounds, last.settle_rounds);
    }
}
