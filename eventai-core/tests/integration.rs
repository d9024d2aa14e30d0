//! Integration Tests — End-to-End Controller Flows
//!
//! Each test builds a controller over an in-memory store, drops the actor
//! into a sandbox world and drives it through lifecycle hooks and ticks,
//! asserting on the commands the world recorded.

use std::sync::Arc;

use eventai_core::action::{ActionEffect, CastFlags, TargetSelector};
use eventai_core::engine::{AiSettings, EventAi};
use eventai_core::event::{
    EventCondition, EventDefinition, EventFlags, PercentBand, PlayerCondition, RepeatBounds,
    SpawnCondition, SummonFilter, TimerSpec, WaypointBox,
};
use eventai_core::sandbox::{ActorScope, SandboxEffect, SandboxWorld, UnitSpec};
use eventai_core::signal::{SignalKind, SignalMask};
use eventai_core::store::InMemoryEventStore;
use eventai_core::types::{
    EntityId, Location, Phase, PhaseMask, SchoolMask, SpellId, TemplateId,
};
use eventai_core::world::{CastOutcome, CastResult};

const TEMPLATE: TemplateId = TemplateId(7);

struct Arena {
    ai: EventAi,
    world: SandboxWorld,
    actor: EntityId,
}

impl Arena {
    fn new(defs: Vec<EventDefinition>) -> Self {
        let store = InMemoryEventStore::from_definitions(defs);
        let settings = AiSettings::default().with_seed(42);
        let ai = EventAi::new(TEMPLATE, Arc::new(store), &settings);
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TEMPLATE));
        let mut arena = Self { ai, world, actor };
        arena.with(|ai, w| ai.on_activate(w));
        arena
    }

    fn with<F>(&mut self, f: F)
    where
        F: FnOnce(&mut EventAi, &mut ActorScope<'_>),
    {
        let mut scope = self.world.scope(self.actor);
        f(&mut self.ai, &mut scope);
    }

    fn tick(&mut self, elapsed: u32) {
        self.with(|ai, w| ai.periodic_tick(elapsed, w));
    }

    fn emotes(&self) -> Vec<u32> {
        self.world
            .effects_of(self.actor)
            .filter_map(|e| match e {
                SandboxEffect::Emote(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn signals(&mut self) -> Vec<SignalKind> {
        self.world.take_signals().into_iter().map(|s| s.kind).collect()
    }

    fn faults(&self) -> u64 {
        self.ai.counters().snapshot().faults_reported
    }
}

fn def(id: u32, condition: EventCondition) -> EventDefinition {
    EventDefinition::new(id, TEMPLATE.0, condition)
}

fn emote(id: u32) -> ActionEffect {
    ActionEffect::Emote { emote: id }
}

fn timer(initial: u32, repeat: RepeatBounds) -> TimerSpec {
    TimerSpec {
        initial: RepeatBounds::fixed(initial),
        repeat,
    }
}

fn mask_spawn(kinds: &[SignalKind]) -> EventDefinition {
    def(99, EventCondition::Spawned(SpawnCondition::Always)).with_action(
        0,
        ActionEffect::SetThrowMask {
            mask: SignalMask::of(kinds),
        },
    )
}

// ---------------------------------------------------------------------------
// Combat reactions
// ---------------------------------------------------------------------------

#[test]
fn kill_of_player_plays_emote() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Kill {
            repeat: RepeatBounds::fixed(0),
        })
        .with_action(0, emote(5)),
    ]);
    let guard = arena.world.add_unit(UnitSpec::creature(TemplateId(3)));
    let player = arena.world.add_unit(UnitSpec::player());

    arena.with(|ai, w| ai.on_kill(guard, w));
    assert!(arena.emotes().is_empty(), "creature kills never count");

    arena.with(|ai, w| ai.on_kill(player, w));
    assert_eq!(arena.emotes(), vec![5]);
}

#[test]
fn kill_text_addresses_the_victim() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Kill {
            repeat: RepeatBounds::fixed(0),
        })
        .with_action(0, ActionEffect::Text { texts: [-100, 0, 0] }),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.with(|ai, w| ai.on_kill(player, w));

    let said: Vec<_> = arena
        .world
        .effects_of(arena.actor)
        .filter(|e| matches!(e, SandboxEffect::Text { .. }))
        .collect();
    assert_eq!(
        said,
        vec![&SandboxEffect::Text {
            text: -100,
            audience: Some(player),
        }]
    );
}

#[test]
fn random_action_splits_evenly_and_skips_empty_slot() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Aggro)
            .with_flags(EventFlags::RANDOM_ACTION | EventFlags::REPEATABLE)
            .with_action(0, emote(1))
            .with_action(2, emote(2)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    for _ in 0..1000 {
        arena.with(|ai, w| ai.on_enter_combat(player, w));
    }

    let emotes = arena.emotes();
    assert_eq!(emotes.len(), 1000, "exactly one slot runs per firing");
    let first = emotes.iter().filter(|e| **e == 1).count();
    let third = emotes.iter().filter(|e| **e == 2).count();
    assert_eq!(first + third, 1000);
    assert!((400..=600).contains(&first), "slot 0 chosen {first} times");
    assert!((400..=600).contains(&third), "slot 2 chosen {third} times");
}

#[test]
fn health_band_is_inclusive() {
    let mut arena = Arena::new(vec![
        def(
            1,
            EventCondition::Health(PercentBand {
                max_percent: 50,
                min_percent: 10,
                repeat: RepeatBounds::fixed(0),
            }),
        )
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(1)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 10.0);

    let mut fired = Vec::new();
    for health in [9, 10, 50, 51] {
        arena.world.set_health(arena.actor, health, 100);
        let before = arena.emotes().len();
        arena.tick(1000);
        fired.push(arena.emotes().len() > before);
    }
    assert_eq!(fired, vec![false, true, true, false]);
}

#[test]
fn health_band_needs_combat() {
    let mut arena = Arena::new(vec![
        def(
            1,
            EventCondition::Health(PercentBand {
                max_percent: 100,
                min_percent: 0,
                repeat: RepeatBounds::fixed(0),
            }),
        )
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(1)),
    ]);
    arena.tick(1000);
    assert!(arena.emotes().is_empty());
}

// ---------------------------------------------------------------------------
// Line of sight
// ---------------------------------------------------------------------------

#[test]
fn ooc_sight_with_no_hostile_fires_only_for_friends_in_range() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::OutOfCombatLos {
            no_hostile: true,
            max_range: 10.0,
            repeat: RepeatBounds::fixed(0),
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(3)),
    ]);
    let far_friend = arena
        .world
        .add_unit(UnitSpec::player().friendly().at(Location::new(20.0, 0.0, 0.0)));
    let hidden_friend = arena
        .world
        .add_unit(UnitSpec::player().friendly().at(Location::new(5.0, 0.0, 0.0)));
    arena.world.block_line_of_sight(arena.actor, hidden_friend);
    let friend = arena
        .world
        .add_unit(UnitSpec::player().friendly().at(Location::new(5.0, 0.0, 0.0)));
    let enemy = arena
        .world
        .add_unit(UnitSpec::player().at(Location::new(5.0, 0.0, 0.0)));

    arena.with(|ai, w| ai.on_move_in_line_of_sight(far_friend, w));
    arena.with(|ai, w| ai.on_move_in_line_of_sight(hidden_friend, w));
    assert!(arena.emotes().is_empty());

    arena.with(|ai, w| ai.on_move_in_line_of_sight(friend, w));
    assert_eq!(arena.emotes(), vec![3]);

    arena.with(|ai, w| ai.on_move_in_line_of_sight(enemy, w));
    assert_eq!(arena.emotes(), vec![3], "hostile units never trigger it");
    assert_eq!(arena.world.threat_of(arena.actor), vec![enemy], "but get attacked");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn respawn_twice_matches_respawn_once() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::TimerGeneric(timer(2000, RepeatBounds::fixed(5000))))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(1)),
        def(2, EventCondition::TimerOutOfCombat(timer(3000, RepeatBounds::fixed(3000))))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(2)),
        def(3, EventCondition::Spawned(SpawnCondition::Always)).with_action(0, emote(3)),
    ]);
    let snapshot = |ai: &EventAi| {
        ai.runtimes()
            .iter()
            .map(|r| (r.is_enabled(), r.time_remaining()))
            .collect::<Vec<_>>()
    };

    arena.with(|ai, w| ai.on_respawn(w));
    let once = snapshot(&arena.ai);
    arena.with(|ai, w| ai.on_respawn(w));
    let twice = snapshot(&arena.ai);

    assert_eq!(once, twice);
    assert_eq!(once[0], (true, 2000));
    assert_eq!(once[1], (true, 3000));
    assert_eq!(arena.ai.phase(), Phase::ZERO);
}

#[test]
fn out_of_combat_timer_fires_and_repeats() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::TimerOutOfCombat(timer(1000, RepeatBounds::fixed(2000))))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(1)),
    ]);
    arena.tick(600);
    assert!(arena.emotes().is_empty());
    arena.tick(600);
    assert_eq!(arena.emotes(), vec![1]);
    arena.tick(1000);
    assert_eq!(arena.emotes(), vec![1], "still cooling");
    arena.tick(1100);
    assert_eq!(arena.emotes(), vec![1, 1]);
}

#[test]
fn inverted_bounds_reported_once_and_firing_proceeds() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::TimerGeneric(timer(0, RepeatBounds::new(5000, 1000))))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(1)),
    ]);
    assert_eq!(arena.faults(), 0);

    arena.tick(1000);
    assert_eq!(arena.emotes(), vec![1]);
    assert_eq!(arena.faults(), 1);

    for _ in 0..5 {
        arena.tick(1000);
    }
    arena.with(|ai, w| ai.on_respawn(w));
    arena.tick(1000);

    assert_eq!(arena.emotes(), vec![1]);
    assert_eq!(arena.faults(), 1);
    assert!(arena.ai.runtimes()[0].is_faulted());
}

#[test]
fn phase_mask_suppresses_events() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Aggro).with_action(0, ActionEffect::SetPhase { phase: 1 }),
        def(2, EventCondition::TimerInCombat(timer(0, RepeatBounds::fixed(0))))
            .with_flags(EventFlags::REPEATABLE)
            .with_phase_mask(PhaseMask::of(&[Phase::new(1).expect("valid phase")]))
            .with_action(0, emote(1)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 1.0);
    arena.with(|ai, w| ai.on_enter_combat(player, w));
    assert_eq!(arena.ai.phase().value(), 1);

    arena.tick(1000);
    assert!(arena.emotes().is_empty());
}

#[test]
fn death_resets_phase() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Aggro).with_action(0, ActionEffect::SetPhase { phase: 4 }),
        def(2, EventCondition::Death).with_action(0, emote(9)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.with(|ai, w| ai.on_enter_combat(player, w));
    assert_eq!(arena.ai.phase().value(), 4);

    arena.with(|ai, w| ai.on_death(Some(player), w));
    assert_eq!(arena.ai.phase(), Phase::ZERO);
    assert_eq!(arena.emotes(), vec![9]);
}

// ---------------------------------------------------------------------------
// Health-threshold signals
// ---------------------------------------------------------------------------

#[test]
fn threshold_signals_fire_in_descending_order() {
    let mut arena = Arena::new(vec![mask_spawn(&[
        SignalKind::LostSomeHealth,
        SignalKind::LostHealth,
        SignalKind::CriticalHealth,
    ])]);
    let player = arena.world.add_unit(UnitSpec::player());

    for (current, hit) in [(100, 15), (85, 40), (45, 40), (5, 4)] {
        arena.world.set_health(arena.actor, current, 100);
        let mut damage = hit;
        arena.with(|ai, w| ai.on_damage_taken(player, &mut damage, w));
    }
    assert_eq!(
        arena.signals(),
        vec![
            SignalKind::LostSomeHealth,
            SignalKind::LostHealth,
            SignalKind::CriticalHealth,
        ]
    );
}

#[test]
fn big_hit_skips_to_deepest_threshold() {
    let mut arena = Arena::new(vec![mask_spawn(&[
        SignalKind::LostSomeHealth,
        SignalKind::CriticalHealth,
    ])]);
    let player = arena.world.add_unit(UnitSpec::player());
    let mut damage = 95;
    arena.with(|ai, w| ai.on_damage_taken(player, &mut damage, w));
    assert_eq!(arena.signals(), vec![SignalKind::CriticalHealth]);

    arena.world.set_health(arena.actor, 5, 100);
    let mut damage = 1;
    arena.with(|ai, w| ai.on_damage_taken(player, &mut damage, w));
    assert!(arena.signals().is_empty());
}

#[test]
fn full_health_signal_once_per_arc() {
    let mut arena = Arena::new(vec![mask_spawn(&[
        SignalKind::LostSomeHealth,
        SignalKind::GotFullHealth,
    ])]);
    let healer = arena.world.add_unit(UnitSpec::creature(TemplateId(8)));

    arena.world.set_health(arena.actor, 50, 100);
    arena.with(|ai, w| ai.on_healed(healer, 60, w));
    arena.with(|ai, w| ai.on_healed(healer, 60, w));
    assert_eq!(arena.signals(), vec![SignalKind::GotFullHealth]);

    arena.world.set_health(arena.actor, 100, 100);
    let mut damage = 20;
    arena.with(|ai, w| ai.on_damage_taken(healer, &mut damage, w));
    arena.world.set_health(arena.actor, 80, 100);
    arena.with(|ai, w| ai.on_healed(healer, 20, w));
    assert_eq!(
        arena.signals(),
        vec![SignalKind::LostSomeHealth, SignalKind::GotFullHealth]
    );
}

#[test]
fn invincibility_floor_clamps_damage() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Spawned(SpawnCondition::Always)).with_action(
            0,
            ActionEffect::SetInvincibilityHpLevel(
                eventai_core::action::InvincibilityLevel::PercentOfMax(20),
            ),
        ),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.set_health(arena.actor, 50, 100);
    let mut damage = 45;
    arena.with(|ai, w| ai.on_damage_taken(player, &mut damage, w));
    assert_eq!(damage, 30);
}

// ---------------------------------------------------------------------------
// Actions against the world
// ---------------------------------------------------------------------------

#[test]
fn summon_attacks_the_victim() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Aggro).with_action(
            0,
            ActionEffect::Summon {
                template: TemplateId(50),
                target: TargetSelector::Victim,
                duration_ms: 0,
            },
        ),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 1.0);
    arena.with(|ai, w| ai.on_enter_combat(player, w));

    let summon = arena
        .world
        .units()
        .find(|u| u.template == Some(TemplateId(50)))
        .map(|u| u.id)
        .expect("summon spawned");
    assert_eq!(arena.world.unit(summon).and_then(|u| u.summoner), Some(arena.actor));
    assert!(arena.world.effects_of(arena.actor).any(|e| *e
        == SandboxEffect::OrderAttack {
            attacker: summon,
            target: player,
        }));
}

#[test]
fn failed_cast_falls_back_to_chasing() {
    let spell = SpellId(10);
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Aggro).with_action(
            0,
            ActionEffect::Cast {
                spell,
                target: TargetSelector::Victim,
                flags: CastFlags::NONE,
            },
        ),
    ]);
    arena.world.set_cast_result(spell, CastResult::TooFar);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 1.0);

    arena.with(|ai, w| ai.on_enter_combat(player, w));
    assert!(arena.ai.combat_movement().spell);
    assert_eq!(arena.world.unit(arena.actor).and_then(|u| u.chasing), Some(player));

    arena.with(|ai, w| ai.on_spell_cast_result(spell, CastOutcome::Succeeded, w));
    assert!(!arena.ai.combat_movement().spell);
    assert_eq!(arena.world.unit(arena.actor).and_then(|u| u.chasing), None);
}

#[test]
fn unresolved_target_is_reported_and_other_slots_run() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Spawned(SpawnCondition::Always))
            .with_action(
                0,
                ActionEffect::Cast {
                    spell: SpellId(1),
                    target: TargetSelector::SecondAggro,
                    flags: CastFlags::NONE,
                },
            )
            .with_action(1, emote(4)),
    ]);
    assert_eq!(arena.emotes(), vec![4]);
    let counters = arena.ai.counters().snapshot();
    assert_eq!(counters.targets_unresolved, 1);
    assert_eq!(counters.actions_executed, 2);
}

#[test]
fn thrown_signal_uses_default_radius_for_zero() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Spawned(SpawnCondition::Always)).with_action(
            0,
            ActionEffect::ThrowSignal {
                kind: SignalKind::CustomA,
                radius: 0.0,
            },
        ),
    ]);
    let thrown = arena.world.take_signals();
    assert_eq!(thrown.len(), 1);
    assert_eq!(thrown[0].kind, SignalKind::CustomA);
    assert!((thrown[0].radius - 30.0).abs() < f32::EPSILON);
}

#[test]
fn received_signal_filters_on_sender_template() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::ReceiveSignal {
            kind: SignalKind::CustomB,
            sender: Some(TemplateId(20)),
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(6)),
    ]);
    let stranger = arena.world.add_unit(UnitSpec::creature(TemplateId(21)));
    let ally = arena.world.add_unit(UnitSpec::creature(TemplateId(20)));

    arena.with(|ai, w| ai.on_receive_signal(SignalKind::CustomB, stranger, None, w));
    arena.with(|ai, w| ai.on_receive_signal(SignalKind::CustomA, ally, None, w));
    assert!(arena.emotes().is_empty());

    arena.with(|ai, w| ai.on_receive_signal(SignalKind::CustomB, ally, None, w));
    assert_eq!(arena.emotes(), vec![6]);
}

#[test]
fn store_without_template_reports_fault() {
    let store = InMemoryEventStore::new();
    let ai = EventAi::new(TemplateId(1), Arc::new(store), &AiSettings::default());
    assert!(ai.runtimes().is_empty());
    assert_eq!(ai.counters().snapshot().faults_reported, 1);
}

// ---------------------------------------------------------------------------
// Evading
// ---------------------------------------------------------------------------

#[test]
fn ooc_timer_waits_until_home() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::TimerOutOfCombat(timer(0, RepeatBounds::fixed(1000))))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(77)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 10.0);
    arena.with(|ai, w| ai.on_enter_combat(player, w));
    arena.with(|ai, w| ai.on_enter_evade(w));

    arena.tick(1000);
    arena.tick(1000);
    assert!(arena.emotes().is_empty());
    assert!(arena.world.unit(arena.actor).is_some_and(|u| u.evading));

    arena.with(|ai, w| ai.on_reached_home(w));
    assert!(arena.world.unit(arena.actor).is_some_and(|u| !u.evading));
    arena.tick(1000);
    assert_eq!(arena.emotes(), vec![77]);
}

// ---------------------------------------------------------------------------
// Forced self-casts
// ---------------------------------------------------------------------------

fn cast_on_victim(id: u32, spell: u32, flags: CastFlags) -> EventDefinition {
    def(id, EventCondition::Aggro).with_action(0, ActionEffect::Cast {
        spell: SpellId(spell),
        target: TargetSelector::Victim,
        flags,
    })
}

#[test]
fn forced_self_cast_is_cast_by_the_target() {
    let mut arena = Arena::new(vec![cast_on_victim(1, 5, CastFlags::FORCE_TARGET_SELF)]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 10.0);
    // The actor's own cast bar is irrelevant here.
    arena.world.set_casting(arena.actor, true);
    arena.with(|ai, w| ai.on_enter_combat(player, w));

    let by_player: Vec<_> = arena.world.effects_of(player).cloned().collect();
    assert_eq!(by_player, vec![SandboxEffect::Cast {
        target: player,
        spell: SpellId(5),
        flags: CastFlags::FORCE_TARGET_SELF,
        result: CastResult::Ok,
    }]);
    assert!(
        !arena
            .world
            .effects_of(arena.actor)
            .any(|e| matches!(e, SandboxEffect::Cast { .. }))
    );
}

#[test]
fn forced_self_cast_checks_the_targets_cast_bar() {
    let forced_interrupt = CastFlags::FORCE_TARGET_SELF | CastFlags::INTERRUPT_PREVIOUS;
    let mut arena = Arena::new(vec![
        cast_on_victim(1, 5, CastFlags::FORCE_TARGET_SELF),
        cast_on_victim(2, 6, forced_interrupt),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    arena.world.add_threat(arena.actor, player, 10.0);
    arena.world.set_casting(player, true);
    arena.with(|ai, w| ai.on_enter_combat(player, w));

    let by_player: Vec<_> = arena.world.effects_of(player).cloned().collect();
    assert_eq!(by_player, vec![
        SandboxEffect::InterruptCast,
        SandboxEffect::Cast {
            target: player,
            spell: SpellId(6),
            flags: forced_interrupt,
            result: CastResult::Ok,
        },
    ]);
    assert_eq!(arena.world.effects_of(arena.actor).count(), 0);
}

// ---------------------------------------------------------------------------
// Hook filters
// ---------------------------------------------------------------------------

#[test]
fn spell_hit_matches_spell_and_school() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::SpellHit {
            spell: Some(SpellId(10)),
            school: SchoolMask(0b100),
            repeat: RepeatBounds::fixed(0),
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(1)),
        def(2, EventCondition::SpellHit {
            spell: None,
            school: SchoolMask(0b011),
            repeat: RepeatBounds::fixed(0),
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(2)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());

    arena.with(|ai, w| ai.on_spell_hit(player, SpellId(11), SchoolMask(0b100), w));
    assert!(arena.emotes().is_empty());

    arena.with(|ai, w| ai.on_spell_hit(player, SpellId(10), SchoolMask(0b110), w));
    assert_eq!(arena.emotes(), vec![1, 2]);

    arena.with(|ai, w| ai.on_spell_hit(player, SpellId(12), SchoolMask(0b001), w));
    assert_eq!(arena.emotes(), vec![1, 2, 2]);
}

#[test]
fn emote_needs_player_condition() {
    let reputation = PlayerCondition {
        kind: 5,
        value1: 72,
        value2: 3,
    };
    let mut arena = Arena::new(vec![
        def(1, EventCondition::ReceiveEmote {
            emote: 34,
            condition: reputation,
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(1)),
        def(2, EventCondition::ReceiveEmote {
            emote: 21,
            condition: PlayerCondition::NONE,
        })
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(2)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());
    let stranger = arena.world.add_unit(UnitSpec::player());

    arena.with(|ai, w| ai.on_receive_emote(player, 34, w));
    assert!(arena.emotes().is_empty());
    arena.with(|ai, w| ai.on_receive_emote(player, 21, w));
    assert_eq!(arena.emotes(), vec![2]);

    arena.world.grant_condition(reputation, player);
    arena.with(|ai, w| ai.on_receive_emote(stranger, 34, w));
    assert_eq!(arena.emotes(), vec![2]);
    arena.with(|ai, w| ai.on_receive_emote(player, 34, w));
    assert_eq!(arena.emotes(), vec![2, 1]);
}

#[test]
fn waypoint_box_checks_every_axis() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::ReachedWaypoint(WaypointBox {
            x: 10,
            y: -5,
            z: 2,
            tolerance: 1,
        }))
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, emote(3)),
    ]);
    let actor = arena.actor;
    let arrive = |arena: &mut Arena, at: Location| {
        arena.world.set_position(actor, at);
        arena.with(|ai, w| ai.on_reached_waypoint(w));
        arena.emotes().len()
    };

    assert_eq!(arrive(&mut arena, Location::new(10.5, -5.0, 2.0)), 1);
    // Close in x and y, too high.
    assert_eq!(arrive(&mut arena, Location::new(10.0, -5.0, 3.5)), 1);
    assert_eq!(arrive(&mut arena, Location::new(13.0, -5.0, 2.0)), 1);
    // The box edges count as inside.
    assert_eq!(arrive(&mut arena, Location::new(11.0, -6.0, 3.0)), 2);
}

#[test]
fn summon_hooks_filter_on_template() {
    let filter = SummonFilter {
        template: TemplateId(30),
        repeat: RepeatBounds::fixed(0),
    };
    let mut arena = Arena::new(vec![
        def(1, EventCondition::SummonedUnit(filter))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(1)),
        def(2, EventCondition::SummonedJustDied(filter))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(2)),
        def(3, EventCondition::SummonedJustDespawned(filter))
            .with_flags(EventFlags::REPEATABLE)
            .with_action(0, emote(3)),
    ]);
    let wolf = arena.world.add_unit(UnitSpec::creature(TemplateId(30)));
    let boar = arena.world.add_unit(UnitSpec::creature(TemplateId(31)));
    let player = arena.world.add_unit(UnitSpec::player());

    arena.with(|ai, w| ai.on_summon_created(boar, w));
    arena.with(|ai, w| ai.on_summon_created(wolf, w));
    assert_eq!(arena.emotes(), vec![1]);

    arena.with(|ai, w| ai.on_summoned_creature_died(boar, w));
    arena.with(|ai, w| ai.on_summoned_creature_died(wolf, w));
    assert_eq!(arena.emotes(), vec![1, 2]);

    arena.with(|ai, w| ai.on_summoned_creature_despawned(player, w));
    arena.with(|ai, w| ai.on_summoned_creature_despawned(wolf, w));
    assert_eq!(arena.emotes(), vec![1, 2, 3]);
}

#[test]
fn entering_combat_revives_spent_events() {
    let mut arena = Arena::new(vec![
        def(1, EventCondition::Kill {
            repeat: RepeatBounds::fixed(60_000),
        })
        .with_action(0, emote(4)),
    ]);
    let player = arena.world.add_unit(UnitSpec::player());

    arena.with(|ai, w| ai.on_kill(player, w));
    arena.with(|ai, w| ai.on_kill(player, w));
    assert_eq!(arena.emotes(), vec![4]);
    let spent = &arena.ai.runtimes()[0];
    assert!(!spent.is_enabled());
    assert_eq!(spent.time_remaining(), 60_000);

    arena.with(|ai, w| ai.on_enter_combat(player, w));
    assert!(arena.ai.runtimes()[0].is_armed());
    arena.with(|ai, w| ai.on_kill(player, w));
    assert_eq!(arena.emotes(), vec![4, 4]);
}
