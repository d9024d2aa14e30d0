//! Target resolution.
//!
//! Turns a [`TargetSelector`] plus the current [`InvocationContext`] into a
//! concrete unit. A resolution can come back empty without having *failed*:
//! "random hostile except the top one" with a single-entry threat list just
//! has nothing to pick, while "second aggro" on an empty list means the
//! script ran where it shouldn't have. Callers report only failures.

use rand::Rng;
use rand::seq::IteratorRandom;

use crate::action::TargetSelector;
use crate::types::EntityId;
use crate::world::{SelectFilter, WorldView};

/// Who caused the current event to be considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvocationContext {
    /// The unit that caused the event (killer, aggressor, emoting player, ...).
    pub invoker: Option<EntityId>,
    /// The actor that threw the signal being handled.
    pub sender: Option<EntityId>,
}

impl InvocationContext {
    /// No invoker, no sender.
    pub const NONE: Self = Self {
        invoker: None,
        sender: None,
    };

    /// Context with an invoker.
    #[must_use]
    pub const fn invoked_by(invoker: EntityId) -> Self {
        Self {
            invoker: Some(invoker),
            sender: None,
        }
    }
}

/// Outcome of a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// The unit, if one qualified.
    pub target: Option<EntityId>,
    /// Whether the empty result indicates a misconfigured script.
    pub failed: bool,
}

impl Resolution {
    const fn found(target: Option<EntityId>, fail_if_missing: bool) -> Self {
        Self {
            target,
            failed: target.is_none() && fail_if_missing,
        }
    }
}

/// Resolve `selector` against the world.
pub fn resolve<W, R>(
    selector: TargetSelector,
    ctx: &InvocationContext,
    world: &W,
    rng: &mut R,
    filter: SelectFilter,
) -> Resolution
where
    W: WorldView + ?Sized,
    R: Rng + ?Sized,
{
    let actor = world.actor();
    match selector {
        TargetSelector::SelfActor => Resolution::found(Some(actor), false),
        TargetSelector::Victim => Resolution::found(world.victim(), true),
        TargetSelector::SecondAggro => {
            let threat = world.threat_list();
            let pick = threat
                .iter()
                .skip(1)
                .copied()
                .find(|u| passes(world, actor, *u, filter));
            Resolution::found(pick, not_top_failed(&threat, filter))
        }
        TargetSelector::LastAggro => {
            let threat = world.threat_list();
            let pick = threat
                .iter()
                .rev()
                .copied()
                .find(|u| passes(world, actor, *u, filter));
            Resolution::found(pick, threat.is_empty())
        }
        TargetSelector::RandomHostile => {
            let threat = world.threat_list();
            let pick = threat
                .iter()
                .copied()
                .filter(|u| passes(world, actor, *u, filter))
                .choose(rng);
            Resolution::found(pick, threat.is_empty())
        }
        TargetSelector::RandomHostileNotTop => {
            let threat = world.threat_list();
            let pick = threat
                .iter()
                .skip(1)
                .copied()
                .filter(|u| passes(world, actor, *u, filter))
                .choose(rng);
            Resolution::found(pick, not_top_failed(&threat, filter))
        }
        TargetSelector::RandomPlayer => {
            let players = SelectFilter {
                players_only: true,
                ..filter
            };
            let pick = world
                .threat_list()
                .into_iter()
                .filter(|u| passes(world, actor, *u, players))
                .choose(rng);
            Resolution::found(pick, true)
        }
        TargetSelector::RandomPlayerNotTop => {
            let players = SelectFilter {
                players_only: true,
                ..filter
            };
            let threat = world.threat_list();
            let pick = threat
                .iter()
                .skip(1)
                .copied()
                .filter(|u| passes(world, actor, *u, players))
                .choose(rng);
            Resolution::found(pick, not_top_failed(&threat, filter))
        }
        TargetSelector::Invoker => Resolution::found(ctx.invoker, true),
        TargetSelector::InvokerOwner => {
            let owner = ctx
                .invoker
                .map(|invoker| world.owner_of(invoker).unwrap_or(invoker));
            Resolution::found(owner, true)
        }
        TargetSelector::Sender => Resolution::found(ctx.sender, true),
    }
}

/// Selectors skipping the top entry fail when the list is empty, or when
/// an unfiltered list had more than one entry and still produced nothing.
fn not_top_failed(threat: &[EntityId], filter: SelectFilter) -> bool {
    threat.is_empty() || (filter.is_empty() && threat.len() > 1)
}

fn passes<W: WorldView + ?Sized>(
    world: &W,
    actor: EntityId,
    unit: EntityId,
    filter: SelectFilter,
) -> bool {
    if filter.players_only && !world.is_player(unit) {
        return false;
    }
    if filter.in_line_of_sight && !world.in_line_of_sight(actor, unit) {
        return false;
    }
    filter
        .spell
        .is_none_or(|spell| world.spell_can_reach(unit, spell))
}
