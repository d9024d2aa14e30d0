//! Property-Based Tests for the EventAI controller
//!
//! Uses `proptest` to check controller invariants under random inputs:
//! phase range, timer spacing, seeded reproducibility.

use std::sync::Arc;

use proptest::prelude::*;

use eventai_core::action::ActionEffect;
use eventai_core::engine::{AiSettings, EventAi};
use eventai_core::event::{EventCondition, EventDefinition, EventFlags, RepeatBounds, TimerSpec};
use eventai_core::sandbox::{SandboxEffect, SandboxWorld, UnitSpec};
use eventai_core::store::InMemoryEventStore;
use eventai_core::types::{EntityId, TemplateId, MAX_PHASE};

const TEMPLATE: TemplateId = TemplateId(11);

fn setup(defs: Vec<EventDefinition>, seed: u64) -> (EventAi, SandboxWorld, EntityId) {
    let store = InMemoryEventStore::from_definitions(defs);
    let ai = EventAi::new(TEMPLATE, Arc::new(store), &AiSettings::default().with_seed(seed));
    let mut world = SandboxWorld::new();
    let actor = world.add_unit(UnitSpec::creature(TEMPLATE));
    (ai, world, actor)
}

fn emote_count(world: &SandboxWorld, actor: EntityId) -> usize {
    world
        .effects_of(actor)
        .filter(|e| matches!(e, SandboxEffect::Emote(_)))
        .count()
}

// ---------------------------------------------------------------------------
// Property: phase always stays in range
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn phase_stays_in_range(deltas in prop::collection::vec(-40i32..40, 1..30)) {
        let defs = deltas
            .iter()
            .enumerate()
            .map(|(i, delta)| {
                let id = u32::try_from(i).unwrap_or(u32::MAX);
                EventDefinition::new(id, TEMPLATE.0, EventCondition::Aggro)
                    .with_action(0, ActionEffect::IncPhase { delta: *delta })
            })
            .collect();
        let (mut ai, mut world, actor) = setup(defs, 1);
        let enemy = world.add_unit(UnitSpec::player());
        ai.on_enter_combat(enemy, &mut world.scope(actor));
        prop_assert!(ai.phase().value() < MAX_PHASE);
    }
}

// ---------------------------------------------------------------------------
// Property: a repeating timer never fires faster than its repeat delay
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn timer_spacing_respects_repeat(
        repeat in 1000u32..5000,
        ticks in prop::collection::vec(1u32..2000, 1..200),
    ) {
        let def = EventDefinition::new(
            1,
            TEMPLATE.0,
            EventCondition::TimerGeneric(TimerSpec {
                initial: RepeatBounds::fixed(0),
                repeat: RepeatBounds::fixed(repeat),
            }),
        )
        .with_flags(EventFlags::REPEATABLE)
        .with_action(0, ActionEffect::Emote { emote: 1 });
        let (mut ai, mut world, actor) = setup(vec![def], 2);
        ai.on_activate(&mut world.scope(actor));

        let mut total = 0u64;
        for elapsed in &ticks {
            ai.periodic_tick(*elapsed, &mut world.scope(actor));
            total += u64::from(*elapsed);
        }
        let fired = u64::try_from(emote_count(&world, actor)).unwrap_or(u64::MAX);
        prop_assert!(fired <= 1 + total / u64::from(repeat));
    }
}

// ---------------------------------------------------------------------------
// Property: same seed, same inputs, same behaviour
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn seeded_controllers_are_reproducible(seed in any::<u64>(), firings in 1usize..50) {
        let defs = vec![
            EventDefinition::new(1, TEMPLATE.0, EventCondition::Aggro)
                .with_flags(EventFlags::REPEATABLE)
                .with_chance(60)
                .with_action(0, ActionEffect::RandomEmote { emotes: [1, 2, -1] }),
        ];
        let run = |defs: Vec<EventDefinition>| {
            let (mut ai, mut world, actor) = setup(defs, seed);
            let enemy = world.add_unit(UnitSpec::player());
            for _ in 0..firings {
                ai.on_enter_combat(enemy, &mut world.scope(actor));
            }
            world
                .effects_of(actor)
                .filter_map(|e| match e {
                    SandboxEffect::Emote(id) => Some(*id),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(run(defs.clone()), run(defs));
    }
}
