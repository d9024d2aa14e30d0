//! An in-memory world for tests, benches and tooling.
//!
//! [`SandboxWorld`] keeps a flat list of units with just enough state to
//! answer every [`WorldView`] query: health and power pools, positions,
//! auras, threat lists, ownership, line-of-sight blockers. Every command
//! is recorded in a journal so callers can assert on what the engine did.
//!
//! The engine talks to the world through an [`ActorScope`], which pins
//! "the actor" to one unit: `world.scope(actor)`.

use std::collections::{HashMap, HashSet};

use crate::action::{CastFlags, MovementKind};
use crate::event::PlayerCondition;
use crate::signal::SignalKind;
use crate::types::{EntityId, Location, PowerKind, QuestId, SpellId, TemplateId, Vitals};
use crate::world::{
    CastResult, InstanceData, SummonLifetime, SummonRequest, WorldCommands, WorldView,
};

/// Raw unit fields below this index are protected from scripted writes.
pub const PROTECTED_FIELDS: u32 = 6;

/// Default distance at which creatures notice hostile units.
pub const DEFAULT_AGGRO_RADIUS: f32 = 20.0;

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Builder for a new unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    template: Option<TemplateId>,
    player: bool,
    position: Location,
    owner: Option<EntityId>,
    health: Vitals,
    friendly: bool,
}

impl UnitSpec {
    /// A creature of `template` at the origin with 100/100 health.
    #[must_use]
    pub fn creature(template: TemplateId) -> Self {
        Self {
            template: Some(template),
            player: false,
            position: Location::default(),
            owner: None,
            health: Vitals::new(100, 100),
            friendly: false,
        }
    }

    /// A player at the origin with 100/100 health.
    #[must_use]
    pub fn player() -> Self {
        Self {
            template: None,
            player: true,
            ..Self::creature(TemplateId(0))
        }
    }

    /// Place the unit.
    #[must_use]
    pub fn at(mut self, position: Location) -> Self {
        self.position = position;
        self
    }

    /// Give the unit an owner (pets, totems, guardians).
    #[must_use]
    pub fn owned_by(mut self, owner: EntityId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Start with this health pool.
    #[must_use]
    pub fn with_health(mut self, current: u32, max: u32) -> Self {
        self.health = Vitals::new(current, max);
        self
    }

    /// Make a player non-hostile to creatures.
    #[must_use]
    pub fn friendly(mut self) -> Self {
        self.friendly = true;
        self
    }
}

/// A unit living in the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub struct SandboxUnit {
    /// Identity.
    pub id: EntityId,
    /// Creature template; `None` for players.
    pub template: Option<TemplateId>,
    /// Player-controlled.
    pub player: bool,
    /// Charmer or owner.
    pub owner: Option<EntityId>,
    /// Position.
    pub position: Location,
    /// Health pool.
    pub health: Vitals,
    /// Mana pool.
    pub mana: Vitals,
    /// Energy pool.
    pub energy: Vitals,
    /// Alive.
    pub alive: bool,
    /// Currently casting.
    pub casting: bool,
    /// Heading home after dropping combat.
    pub evading: bool,
    /// Aura stacks by spell.
    pub auras: HashMap<SpellId, u32>,
    /// Dispel type of an active crowd-control effect.
    pub crowd_control: Option<u32>,
    /// Unit flag bits.
    pub flags: u32,
    /// Raw field writes.
    pub fields: HashMap<u32, u32>,
    /// Display model override.
    pub display: Option<u32>,
    /// Mount model.
    pub mount: Option<u32>,
    /// Who the unit is chasing.
    pub chasing: Option<EntityId>,
    /// Pending despawn delay.
    pub despawn_in: Option<u32>,
    /// Non-hostile player.
    pub friendly: bool,
    /// Creature that summoned this one.
    pub summoner: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// A command the engine issued.
#[derive(Debug, Clone, PartialEq)]
pub enum SandboxEffect {
    /// Text displayed.
    Text {
        /// Text id.
        text: i32,
        /// Audience.
        audience: Option<EntityId>,
    },
    /// Temporary faction applied.
    Faction {
        /// Faction.
        faction: u32,
        /// Flags.
        flags: u32,
    },
    /// Temporary faction cleared.
    ClearFaction,
    /// Display model changed.
    Display(u32),
    /// Display model restored.
    Demorph,
    /// Mounted.
    Mount(u32),
    /// Dismounted.
    Dismount,
    /// Sound played.
    Sound(u32),
    /// Emote played.
    Emote(u32),
    /// Turned to face a unit.
    Face(EntityId),
    /// Cast attempted.
    Cast {
        /// Target.
        target: EntityId,
        /// Spell.
        spell: SpellId,
        /// Flags.
        flags: CastFlags,
        /// Result handed back.
        result: CastResult,
    },
    /// Cast interrupted.
    InterruptCast,
    /// Creature summoned.
    Summon {
        /// Template.
        template: TemplateId,
        /// The new unit.
        unit: EntityId,
        /// Lifetime.
        lifetime: SummonLifetime,
    },
    /// Attack ordered.
    OrderAttack {
        /// Attacker.
        attacker: EntityId,
        /// Target.
        target: EntityId,
    },
    /// Threat scaled.
    ThreatPercent {
        /// Unit.
        unit: EntityId,
        /// Percent change.
        percent: i32,
    },
    /// Quest objective credited.
    QuestCredit {
        /// Player.
        player: EntityId,
        /// Quest.
        quest: QuestId,
    },
    /// Quest objective credited to a group.
    GroupQuestCredit {
        /// Player.
        player: EntityId,
        /// Quest.
        quest: QuestId,
    },
    /// Spell-cast objective credited.
    SpellCastCredit {
        /// Player.
        player: EntityId,
        /// Creature.
        creature: TemplateId,
        /// Spell.
        spell: SpellId,
    },
    /// Kill credited.
    KillCredit {
        /// Player.
        player: EntityId,
        /// Creature.
        creature: TemplateId,
    },
    /// Raw field written.
    UnitField {
        /// Unit.
        unit: EntityId,
        /// Field.
        field: u32,
        /// Value.
        value: u32,
    },
    /// Unit flags set.
    SetUnitFlags {
        /// Unit.
        unit: EntityId,
        /// Flags.
        flags: u32,
    },
    /// Unit flags cleared.
    RemoveUnitFlags {
        /// Unit.
        unit: EntityId,
        /// Flags.
        flags: u32,
    },
    /// Auras removed.
    RemoveAuras {
        /// Unit.
        unit: EntityId,
        /// Spell.
        spell: SpellId,
    },
    /// Chase started.
    Chase {
        /// Target.
        target: EntityId,
        /// Distance.
        distance: f32,
        /// Angle.
        angle: f32,
    },
    /// Chase stopped.
    StopChase,
    /// Melee swing toggled.
    MeleeState {
        /// Victim.
        victim: EntityId,
        /// Swinging.
        swinging: bool,
    },
    /// Fled for help.
    FleeForAssist,
    /// Template changed.
    UpdateTemplate {
        /// New template.
        template: TemplateId,
        /// Horde faction.
        horde: bool,
    },
    /// Actor killed itself.
    KillSelf,
    /// Zone pulled into combat.
    ZoneCombatPulse,
    /// Called for help.
    CallForHelp(f32),
    /// Sheath changed.
    Sheath(u32),
    /// Despawn scheduled.
    Despawn(u32),
    /// Signal thrown.
    Signal {
        /// Kind.
        kind: SignalKind,
        /// Invoker.
        invoker: Option<EntityId>,
        /// Radius.
        radius: f32,
    },
    /// Stand state changed.
    StandState(u32),
    /// Movement generator changed.
    Movement {
        /// Kind.
        kind: MovementKind,
        /// Wander distance.
        wander_distance: f32,
    },
    /// Evade began.
    BeginEvade,
    /// Evade finished.
    FinishEvade,
    /// Attack started.
    StartAttack {
        /// Target.
        who: EntityId,
        /// Melee allowed.
        melee: bool,
    },
    /// Melee swing.
    MeleeSwing,
}

/// A journal line: which actor did what.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// The acting unit.
    pub actor: EntityId,
    /// What it did.
    pub effect: SandboxEffect,
}

/// A signal waiting for delivery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrownSignal {
    /// Who threw it.
    pub sender: EntityId,
    /// Kind.
    pub kind: SignalKind,
    /// Unit that caused it.
    pub invoker: Option<EntityId>,
    /// Reach.
    pub radius: f32,
}

/// Instance storage backed by maps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxInstance {
    /// Numeric fields.
    pub data: HashMap<u32, u32>,
    /// Unit fields.
    pub guids: HashMap<u32, EntityId>,
}

impl InstanceData for SandboxInstance {
    fn set_data(&mut self, field: u32, value: u32) {
        self.data.insert(field, value);
    }

    fn set_guid(&mut self, field: u32, unit: EntityId) {
        self.guids.insert(field, unit);
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The in-memory world.
#[derive(Debug, Clone)]
pub struct SandboxWorld {
    units: Vec<SandboxUnit>,
    index: HashMap<EntityId, usize>,
    threat: HashMap<EntityId, Vec<(EntityId, f32)>>,
    loot_recipients: HashMap<EntityId, EntityId>,
    journal: Vec<JournalEntry>,
    outbox: Vec<ThrownSignal>,
    instance: Option<SandboxInstance>,
    templates: HashMap<TemplateId, u32>,
    missing_texts: HashSet<i32>,
    cast_results: HashMap<SpellId, CastResult>,
    spell_ranges: HashMap<SpellId, f32>,
    failing_summons: HashSet<TemplateId>,
    granted_conditions: Vec<(PlayerCondition, EntityId)>,
    sight_blockers: HashSet<(EntityId, EntityId)>,
    map_id: u32,
    zone_and_area: (u32, u32),
    aggro_radius: f32,
}

impl SandboxWorld {
    /// An empty world on map 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            index: HashMap::new(),
            threat: HashMap::new(),
            loot_recipients: HashMap::new(),
            journal: Vec::new(),
            outbox: Vec::new(),
            instance: None,
            templates: HashMap::new(),
            missing_texts: HashSet::new(),
            cast_results: HashMap::new(),
            spell_ranges: HashMap::new(),
            failing_summons: HashSet::new(),
            granted_conditions: Vec::new(),
            sight_blockers: HashSet::new(),
            map_id: 0,
            zone_and_area: (0, 0),
            aggro_radius: DEFAULT_AGGRO_RADIUS,
        }
    }

    /// Add a unit and return its id.
    pub fn add_unit(&mut self, spec: UnitSpec) -> EntityId {
        let id = EntityId::new();
        self.index.insert(id, self.units.len());
        self.units.push(SandboxUnit {
            id,
            template: spec.template,
            player: spec.player,
            owner: spec.owner,
            position: spec.position,
            health: spec.health,
            mana: Vitals::new(100, 100),
            energy: Vitals::new(100, 100),
            alive: true,
            casting: false,
            evading: false,
            auras: HashMap::new(),
            crowd_control: None,
            flags: 0,
            fields: HashMap::new(),
            display: None,
            mount: None,
            chasing: None,
            despawn_in: None,
            friendly: spec.friendly,
            summoner: None,
        });
        id
    }

    /// Scope the world to one actor.
    pub fn scope(&mut self, actor: EntityId) -> ActorScope<'_> {
        ActorScope { world: self, actor }
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, id: EntityId) -> Option<&SandboxUnit> {
        self.index.get(&id).and_then(|i| self.units.get(*i))
    }

    /// Look up a unit for modification.
    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut SandboxUnit> {
        self.index.get(&id).and_then(|i| self.units.get_mut(*i))
    }

    /// All units in insertion order.
    pub fn units(&self) -> impl Iterator<Item = &SandboxUnit> {
        self.units.iter()
    }

    // -- setup --------------------------------------------------------------

    /// Add (or increase) `unit`'s threat on `actor`'s list.
    pub fn add_threat(&mut self, actor: EntityId, unit: EntityId, amount: f32) {
        let list = self.threat.entry(actor).or_default();
        match list.iter_mut().find(|(u, _)| *u == unit) {
            Some(entry) => entry.1 += amount,
            None => list.push((unit, amount)),
        }
        list.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    /// Drop `actor`'s threat list.
    pub fn clear_threat(&mut self, actor: EntityId) {
        self.threat.remove(&actor);
    }

    /// Set a unit's health.
    pub fn set_health(&mut self, unit: EntityId, current: u32, max: u32) {
        if let Some(u) = self.unit_mut(unit) {
            u.health = Vitals::new(current, max);
        }
    }

    /// Set a unit's power pool.
    pub fn set_power(&mut self, unit: EntityId, kind: PowerKind, current: u32, max: u32) {
        if let Some(u) = self.unit_mut(unit) {
            match kind {
                PowerKind::Mana => u.mana = Vitals::new(current, max),
                PowerKind::Energy => u.energy = Vitals::new(current, max),
            }
        }
    }

    /// Move a unit.
    pub fn set_position(&mut self, unit: EntityId, position: Location) {
        if let Some(u) = self.unit_mut(unit) {
            u.position = position;
        }
    }

    /// Kill or revive a unit.
    pub fn set_alive(&mut self, unit: EntityId, alive: bool) {
        if let Some(u) = self.unit_mut(unit) {
            u.alive = alive;
        }
    }

    /// Mark a unit as casting.
    pub fn set_casting(&mut self, unit: EntityId, casting: bool) {
        if let Some(u) = self.unit_mut(unit) {
            u.casting = casting;
        }
    }

    /// Set aura stacks; 0 removes the aura.
    pub fn set_aura(&mut self, unit: EntityId, spell: SpellId, stacks: u32) {
        if let Some(u) = self.unit_mut(unit) {
            if stacks == 0 {
                u.auras.remove(&spell);
            } else {
                u.auras.insert(spell, stacks);
            }
        }
    }

    /// Put a crowd-control effect of a dispel type on a unit.
    pub fn set_crowd_control(&mut self, unit: EntityId, dispel_type: Option<u32>) {
        if let Some(u) = self.unit_mut(unit) {
            u.crowd_control = dispel_type;
        }
    }

    /// Block line of sight between two units, both ways.
    pub fn block_line_of_sight(&mut self, a: EntityId, b: EntityId) {
        self.sight_blockers.insert((a, b));
        self.sight_blockers.insert((b, a));
    }

    /// Set the map, zone and area every unit is in.
    pub fn set_location_ids(&mut self, map_id: u32, zone: u32, area: u32) {
        self.map_id = map_id;
        self.zone_and_area = (zone, area);
    }

    /// Make a template known, with its display model.
    pub fn register_template(&mut self, template: TemplateId, display: u32) {
        self.templates.insert(template, display);
    }

    /// Make a text id fail to display.
    pub fn mark_text_missing(&mut self, text: i32) {
        self.missing_texts.insert(text);
    }

    /// Answer casts of `spell` with `result`.
    pub fn set_cast_result(&mut self, spell: SpellId, result: CastResult) {
        self.cast_results.insert(spell, result);
    }

    /// Limit a spell's reach for target selection.
    pub fn set_spell_range(&mut self, spell: SpellId, range: f32) {
        self.spell_ranges.insert(spell, range);
    }

    /// Make summons of `template` fail.
    pub fn fail_summons_of(&mut self, template: TemplateId) {
        self.failing_summons.insert(template);
    }

    /// Make `condition` hold for `player`.
    pub fn grant_condition(&mut self, condition: PlayerCondition, player: EntityId) {
        self.granted_conditions.push((condition, player));
    }

    /// Record who tapped `actor`.
    pub fn set_loot_recipient(&mut self, actor: EntityId, player: EntityId) {
        self.loot_recipients.insert(actor, player);
    }

    /// Give the world instance storage.
    pub fn enable_instance(&mut self) {
        self.instance.get_or_insert_with(SandboxInstance::default);
    }

    /// Instance storage, if enabled.
    #[must_use]
    pub fn instance(&self) -> Option<&SandboxInstance> {
        self.instance.as_ref()
    }

    /// Change the aggro radius.
    pub fn set_aggro_radius(&mut self, radius: f32) {
        self.aggro_radius = radius;
    }

    // -- inspection ---------------------------------------------------------

    /// Everything recorded so far.
    #[must_use]
    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Drain the journal.
    pub fn take_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    /// Effects recorded for one actor.
    pub fn effects_of(&self, actor: EntityId) -> impl Iterator<Item = &SandboxEffect> {
        self.journal
            .iter()
            .filter(move |e| e.actor == actor)
            .map(|e| &e.effect)
    }

    /// Drain signals waiting for delivery.
    pub fn take_signals(&mut self) -> Vec<ThrownSignal> {
        std::mem::take(&mut self.outbox)
    }

    /// Number of signals waiting for delivery.
    #[must_use]
    pub fn pending_signals(&self) -> usize {
        self.outbox.len()
    }

    /// Living creatures within `radius` of `center`, excluding it.
    #[must_use]
    pub fn creatures_near(&self, center: EntityId, radius: f32) -> Vec<EntityId> {
        let Some(origin) = self.unit(center).map(|u| u.position) else {
            return Vec::new();
        };
        self.units
            .iter()
            .filter(|u| u.id != center && !u.player && u.alive)
            .filter(|u| u.position.distance(&origin) <= radius)
            .map(|u| u.id)
            .collect()
    }

    /// `actor`'s threat list, highest first.
    #[must_use]
    pub fn threat_of(&self, actor: EntityId) -> Vec<EntityId> {
        self.threat
            .get(&actor)
            .map(|list| list.iter().map(|(u, _)| *u).collect())
            .unwrap_or_default()
    }

    fn record(&mut self, actor: EntityId, effect: SandboxEffect) {
        self.journal.push(JournalEntry { actor, effect });
    }

    fn hostile(&self, a: EntityId, b: EntityId) -> bool {
        match (self.unit(a), self.unit(b)) {
            (Some(a), Some(b)) => a.player != b.player && !a.friendly && !b.friendly,
            _ => false,
        }
    }

    fn distance_between(&self, a: EntityId, b: EntityId) -> Option<f32> {
        Some(self.unit(a)?.position.distance(&self.unit(b)?.position))
    }

    /// First friendly living creature near `actor` satisfying `pred`.
    fn find_friendly<F>(&self, actor: EntityId, radius: f32, pred: F) -> Option<EntityId>
    where
        F: Fn(&SandboxUnit) -> bool,
    {
        self.units
            .iter()
            .filter(|u| u.id != actor && !u.player && u.alive)
            .filter(|u| !self.hostile(actor, u.id))
            .filter(|u| self.distance_between(actor, u.id).is_some_and(|d| d <= radius))
            .find(|u| pred(u))
            .map(|u| u.id)
    }
}

impl Default for SandboxWorld {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Actor scope
// ---------------------------------------------------------------------------

/// The sandbox seen from one actor.
#[derive(Debug)]
pub struct ActorScope<'a> {
    world: &'a mut SandboxWorld,
    actor: EntityId,
}

impl ActorScope<'_> {
    /// The underlying world.
    #[must_use]
    pub fn world(&self) -> &SandboxWorld {
        &*self.world
    }

    fn me(&mut self) -> Option<&mut SandboxUnit> {
        let actor = self.actor;
        self.world.unit_mut(actor)
    }

    fn record(&mut self, effect: SandboxEffect) {
        let actor = self.actor;
        self.world.record(actor, effect);
    }
}

impl WorldView for ActorScope<'_> {
    fn actor(&self) -> EntityId {
        self.actor
    }

    fn template_of(&self, unit: EntityId) -> Option<TemplateId> {
        self.world.unit(unit).and_then(|u| u.template)
    }

    fn is_player(&self, unit: EntityId) -> bool {
        self.world.unit(unit).is_some_and(|u| u.player)
    }

    fn owner_of(&self, unit: EntityId) -> Option<EntityId> {
        self.world.unit(unit).and_then(|u| u.owner)
    }

    fn is_alive(&self, unit: EntityId) -> bool {
        self.world.unit(unit).is_some_and(|u| u.alive)
    }

    fn in_combat(&self) -> bool {
        self.world
            .threat
            .get(&self.actor)
            .is_some_and(|list| !list.is_empty())
    }

    fn is_evading(&self) -> bool {
        self.world.unit(self.actor).is_some_and(|u| u.evading)
    }

    fn victim(&self) -> Option<EntityId> {
        self.world
            .threat
            .get(&self.actor)
            .and_then(|list| list.first())
            .map(|(u, _)| *u)
    }

    fn threat_list(&self) -> Vec<EntityId> {
        self.world.threat_of(self.actor)
    }

    fn health(&self, unit: EntityId) -> Option<Vitals> {
        self.world.unit(unit).map(|u| u.health)
    }

    fn power(&self, unit: EntityId, kind: PowerKind) -> Option<Vitals> {
        self.world.unit(unit).map(|u| match kind {
            PowerKind::Mana => u.mana,
            PowerKind::Energy => u.energy,
        })
    }

    fn position(&self, unit: EntityId) -> Option<Location> {
        self.world.unit(unit).map(|u| u.position)
    }

    fn map_id(&self) -> u32 {
        self.world.map_id
    }

    fn zone_and_area(&self) -> (u32, u32) {
        self.world.zone_and_area
    }

    fn same_map(&self, a: EntityId, b: EntityId) -> bool {
        self.world.unit(a).is_some() && self.world.unit(b).is_some()
    }

    fn in_line_of_sight(&self, from: EntityId, to: EntityId) -> bool {
        !self.world.sight_blockers.contains(&(from, to))
    }

    fn is_hostile(&self, a: EntityId, b: EntityId) -> bool {
        self.world.hostile(a, b)
    }

    fn is_casting(&self, unit: EntityId) -> bool {
        self.world.unit(unit).is_some_and(|u| u.casting)
    }

    fn aura_stacks(&self, unit: EntityId, spell: SpellId) -> u32 {
        self.world
            .unit(unit)
            .and_then(|u| u.auras.get(&spell).copied())
            .unwrap_or(0)
    }

    fn find_friendly_injured(&self, radius: f32, min_deficit: u32) -> Option<EntityId> {
        self.world.find_friendly(self.actor, radius, |u| {
            u.health.max.saturating_sub(u.health.current) >= min_deficit
        })
    }

    fn find_friendly_crowd_controlled(&self, radius: f32, dispel_type: u32) -> Option<EntityId> {
        self.world.find_friendly(self.actor, radius, |u| {
            u.crowd_control
                .is_some_and(|d| dispel_type == 0 || d == dispel_type)
        })
    }

    fn find_friendly_missing_buff(&self, radius: f32, spell: SpellId) -> Option<EntityId> {
        self.world
            .find_friendly(self.actor, radius, |u| !u.auras.contains_key(&spell))
    }

    fn spell_can_reach(&self, unit: EntityId, spell: SpellId) -> bool {
        match self.world.spell_ranges.get(&spell) {
            Some(range) => self
                .world
                .distance_between(self.actor, unit)
                .is_some_and(|d| d <= *range),
            None => self.world.unit(unit).is_some(),
        }
    }

    fn display_for_template(&self, template: TemplateId) -> Option<u32> {
        self.world.templates.get(&template).copied()
    }

    fn loot_recipient(&self) -> Option<EntityId> {
        self.world.loot_recipients.get(&self.actor).copied()
    }

    fn find_live_creature(&self, template: TemplateId, radius: f32) -> Option<EntityId> {
        self.world
            .creatures_near(self.actor, radius)
            .into_iter()
            .find(|u| self.template_of(*u) == Some(template))
    }

    fn creature_exists(&self, unit: EntityId) -> bool {
        self.world.unit(unit).is_some_and(|u| !u.player)
    }

    fn condition_holds(&self, condition: &PlayerCondition, player: EntityId) -> bool {
        condition.kind == 0
            || self
                .world
                .granted_conditions
                .iter()
                .any(|(c, p)| c == condition && *p == player)
    }

    fn can_start_attack(&self, who: EntityId) -> bool {
        self.is_alive(self.actor)
            && self.is_alive(who)
            && self.is_hostile(self.actor, who)
            && self
                .distance(self.actor, who)
                .is_some_and(|d| d <= self.world.aggro_radius)
            && self.in_line_of_sight(self.actor, who)
    }

    fn is_chasing(&self) -> bool {
        self.world
            .unit(self.actor)
            .is_some_and(|u| u.chasing.is_some())
    }
}

impl WorldCommands for ActorScope<'_> {
    fn display_text(&mut self, text: i32, audience: Option<EntityId>) -> bool {
        if self.world.missing_texts.contains(&text) {
            return false;
        }
        self.record(SandboxEffect::Text { text, audience });
        true
    }

    fn set_temporary_faction(&mut self, faction: u32, flags: u32) {
        self.record(SandboxEffect::Faction { faction, flags });
    }

    fn clear_temporary_faction(&mut self) {
        self.record(SandboxEffect::ClearFaction);
    }

    fn set_display(&mut self, model: u32) {
        if let Some(me) = self.me() {
            me.display = Some(model);
        }
        self.record(SandboxEffect::Display(model));
    }

    fn demorph(&mut self) {
        if let Some(me) = self.me() {
            me.display = None;
        }
        self.record(SandboxEffect::Demorph);
    }

    fn mount(&mut self, model: u32) {
        if let Some(me) = self.me() {
            me.mount = Some(model);
        }
        self.record(SandboxEffect::Mount(model));
    }

    fn dismount(&mut self) {
        if let Some(me) = self.me() {
            me.mount = None;
        }
        self.record(SandboxEffect::Dismount);
    }

    fn play_sound(&mut self, sound: u32) {
        self.record(SandboxEffect::Sound(sound));
    }

    fn play_emote(&mut self, emote: u32) {
        self.record(SandboxEffect::Emote(emote));
    }

    fn face(&mut self, unit: EntityId) {
        self.record(SandboxEffect::Face(unit));
    }

    fn cast_as(
        &mut self,
        caster: EntityId,
        target: EntityId,
        spell: SpellId,
        flags: CastFlags,
    ) -> CastResult {
        let result = self
            .world
            .cast_results
            .get(&spell)
            .copied()
            .unwrap_or(CastResult::Ok);
        self.world.record(caster, SandboxEffect::Cast {
            target,
            spell,
            flags,
            result,
        });
        result
    }

    fn interrupt_cast(&mut self, caster: EntityId) {
        if let Some(unit) = self.world.unit_mut(caster) {
            unit.casting = false;
        }
        self.world.record(caster, SandboxEffect::InterruptCast);
    }

    fn summon(&mut self, request: &SummonRequest) -> Option<EntityId> {
        if self.world.failing_summons.contains(&request.template) {
            return None;
        }
        let (position, _orientation) = match request.placement {
            Some(placement) => placement,
            None => (self.position(self.actor)?, 0.0),
        };
        let unit = self
            .world
            .add_unit(UnitSpec::creature(request.template).at(position));
        let actor = self.actor;
        if let Some(summon) = self.world.unit_mut(unit) {
            summon.summoner = Some(actor);
        }
        self.record(SandboxEffect::Summon {
            template: request.template,
            unit,
            lifetime: request.lifetime,
        });
        Some(unit)
    }

    fn order_attack(&mut self, attacker: EntityId, target: EntityId) {
        self.world.add_threat(attacker, target, 1.0);
        self.record(SandboxEffect::OrderAttack { attacker, target });
    }

    fn modify_threat_percent(&mut self, unit: EntityId, percent: i32) {
        if let Some(list) = self.world.threat.get_mut(&self.actor) {
            #[allow(clippy::cast_precision_loss)]
            let factor = (100.0 + percent as f32).max(0.0) / 100.0;
            for entry in list.iter_mut().filter(|(u, _)| *u == unit) {
                entry.1 *= factor;
            }
            list.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        self.record(SandboxEffect::ThreatPercent { unit, percent });
    }

    fn credit_quest_event(&mut self, player: EntityId, quest: QuestId) {
        self.record(SandboxEffect::QuestCredit { player, quest });
    }

    fn credit_group_quest_event(&mut self, player: EntityId, quest: QuestId) {
        self.record(SandboxEffect::GroupQuestCredit { player, quest });
    }

    fn credit_spell_cast(&mut self, player: EntityId, creature: TemplateId, spell: SpellId) {
        self.record(SandboxEffect::SpellCastCredit {
            player,
            creature,
            spell,
        });
    }

    fn credit_kill(&mut self, player: EntityId, creature: TemplateId) {
        self.record(SandboxEffect::KillCredit { player, creature });
    }

    fn set_unit_field(&mut self, unit: EntityId, field: u32, value: u32) -> bool {
        if field < PROTECTED_FIELDS {
            return false;
        }
        let Some(target) = self.world.unit_mut(unit) else {
            return false;
        };
        target.fields.insert(field, value);
        self.record(SandboxEffect::UnitField { unit, field, value });
        true
    }

    fn set_unit_flags(&mut self, unit: EntityId, flags: u32) {
        if let Some(target) = self.world.unit_mut(unit) {
            target.flags |= flags;
        }
        self.record(SandboxEffect::SetUnitFlags { unit, flags });
    }

    fn remove_unit_flags(&mut self, unit: EntityId, flags: u32) {
        if let Some(target) = self.world.unit_mut(unit) {
            target.flags &= !flags;
        }
        self.record(SandboxEffect::RemoveUnitFlags { unit, flags });
    }

    fn remove_auras(&mut self, unit: EntityId, spell: SpellId) {
        self.world.set_aura(unit, spell, 0);
        self.record(SandboxEffect::RemoveAuras { unit, spell });
    }

    fn chase(&mut self, target: EntityId, distance: f32, angle: f32) {
        if let Some(me) = self.me() {
            me.chasing = Some(target);
        }
        self.record(SandboxEffect::Chase {
            target,
            distance,
            angle,
        });
    }

    fn stop_chase(&mut self) {
        if let Some(me) = self.me() {
            me.chasing = None;
        }
        self.record(SandboxEffect::StopChase);
    }

    fn send_melee_state(&mut self, victim: EntityId, swinging: bool) {
        self.record(SandboxEffect::MeleeState { victim, swinging });
    }

    fn flee_for_assistance(&mut self) {
        self.record(SandboxEffect::FleeForAssist);
    }

    fn instance_data(&mut self) -> Option<&mut dyn InstanceData> {
        self.world
            .instance
            .as_mut()
            .map(|instance| instance as &mut dyn InstanceData)
    }

    fn update_template(&mut self, template: TemplateId, horde: bool) -> bool {
        let Some(display) = self.world.templates.get(&template).copied() else {
            return false;
        };
        if let Some(me) = self.me() {
            me.template = Some(template);
            me.display = Some(display);
        }
        self.record(SandboxEffect::UpdateTemplate { template, horde });
        true
    }

    fn kill_self(&mut self) {
        if let Some(me) = self.me() {
            me.alive = false;
            me.health.current = 0;
        }
        let actor = self.actor;
        self.world.clear_threat(actor);
        self.record(SandboxEffect::KillSelf);
    }

    fn zone_combat_pulse(&mut self) {
        let actor = self.actor;
        let players: Vec<EntityId> = self
            .world
            .units
            .iter()
            .filter(|u| u.player && u.alive)
            .map(|u| u.id)
            .collect();
        for player in players {
            self.world.add_threat(actor, player, 0.0);
        }
        self.record(SandboxEffect::ZoneCombatPulse);
    }

    fn call_for_help(&mut self, radius: f32) {
        self.record(SandboxEffect::CallForHelp(radius));
    }

    fn set_sheath(&mut self, sheath: u32) {
        self.record(SandboxEffect::Sheath(sheath));
    }

    fn despawn(&mut self, delay_ms: u32) {
        if let Some(me) = self.me() {
            me.despawn_in = Some(delay_ms);
        }
        self.record(SandboxEffect::Despawn(delay_ms));
    }

    fn throw_signal(&mut self, kind: SignalKind, invoker: Option<EntityId>, radius: f32) {
        let sender = self.actor;
        self.world.outbox.push(ThrownSignal {
            sender,
            kind,
            invoker,
            radius,
        });
        self.record(SandboxEffect::Signal {
            kind,
            invoker,
            radius,
        });
    }

    fn set_stand_state(&mut self, state: u32) {
        self.record(SandboxEffect::StandState(state));
    }

    fn change_movement(&mut self, kind: MovementKind, wander_distance: f32) {
        self.record(SandboxEffect::Movement {
            kind,
            wander_distance,
        });
    }

    fn begin_evade(&mut self) {
        let actor = self.actor;
        self.world.clear_threat(actor);
        self.world.loot_recipients.remove(&actor);
        if let Some(me) = self.me() {
            me.auras.clear();
            me.casting = false;
            me.chasing = None;
            me.evading = me.alive;
        }
        self.record(SandboxEffect::BeginEvade);
    }

    fn finish_evade(&mut self) {
        self.record(SandboxEffect::FinishEvade);
    }

    fn leave_evade(&mut self) {
        if let Some(me) = self.me() {
            me.evading = false;
        }
    }

    fn start_attack(&mut self, who: EntityId, melee: bool) -> bool {
        let actor = self.actor;
        if who == actor || !self.is_alive(who) || !self.is_alive(actor) {
            return false;
        }
        self.world.add_threat(actor, who, 1.0);
        self.world.add_threat(who, actor, 1.0);
        self.record(SandboxEffect::StartAttack { who, melee });
        true
    }

    fn select_hostile_target(&mut self) -> bool {
        let actor = self.actor;
        let alive: HashSet<EntityId> = self
            .world
            .units
            .iter()
            .filter(|u| u.alive)
            .map(|u| u.id)
            .collect();
        match self.world.threat.get_mut(&actor) {
            Some(list) => {
                list.retain(|(u, _)| alive.contains(u));
                !list.is_empty()
            }
            None => false,
        }
    }

    fn melee_attack_if_ready(&mut self) {
        self.record(SandboxEffect::MeleeSwing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threat_list_sorted_highest_first() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        let a = world.add_unit(UnitSpec::player());
        let b = world.add_unit(UnitSpec::player());
        world.add_threat(actor, a, 10.0);
        world.add_threat(actor, b, 20.0);
        let scope = world.scope(actor);
        assert_eq!(scope.threat_list(), vec![b, a]);
        assert_eq!(scope.victim(), Some(b));
        assert!(scope.in_combat());
    }

    #[test]
    fn hostility_between_players_and_creatures() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        let enemy = world.add_unit(UnitSpec::player());
        let friend = world.add_unit(UnitSpec::player().friendly());
        let ally = world.add_unit(UnitSpec::creature(TemplateId(2)));
        let scope = world.scope(actor);
        assert!(scope.is_hostile(actor, enemy));
        assert!(!scope.is_hostile(actor, friend));
        assert!(!scope.is_hostile(actor, ally));
    }

    #[test]
    fn signals_go_to_outbox_and_journal() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        world
            .scope(actor)
            .throw_signal(SignalKind::CustomA, None, 15.0);
        let signals = world.take_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].sender, actor);
        assert_eq!(world.effects_of(actor).count(), 1);
        assert!(world.take_signals().is_empty());
    }

    #[test]
    fn friendly_scan_respects_radius() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        let near = world.add_unit(
            UnitSpec::creature(TemplateId(2))
                .at(Location::new(5.0, 0.0, 0.0))
                .with_health(40, 100),
        );
        let _far = world.add_unit(
            UnitSpec::creature(TemplateId(2))
                .at(Location::new(50.0, 0.0, 0.0))
                .with_health(10, 100),
        );
        let scope = world.scope(actor);
        assert_eq!(scope.find_friendly_injured(10.0, 50), Some(near));
        assert_eq!(scope.find_friendly_injured(10.0, 70), None);
    }

    #[test]
    fn evade_mode_lasts_until_left() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        let enemy = world.add_unit(UnitSpec::player());
        world.add_threat(actor, enemy, 5.0);
        let mut scope = world.scope(actor);
        scope.begin_evade();
        scope.finish_evade();
        assert!(!scope.in_combat());
        assert!(scope.is_evading());
        scope.leave_evade();
        assert!(!scope.is_evading());
    }

    #[test]
    fn cast_as_is_journaled_under_the_caster() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        let other = world.add_unit(UnitSpec::player());
        world.set_casting(other, true);
        let mut scope = world.scope(actor);
        scope.interrupt_cast(other);
        let result = scope.cast_as(other, other, SpellId(9), CastFlags::NONE);
        assert_eq!(result, CastResult::Ok);
        assert_eq!(world.effects_of(actor).count(), 0);
        assert_eq!(world.effects_of(other).count(), 2);
        assert!(!world.unit(other).is_some_and(|u| u.casting));
    }

    #[test]
    fn protected_fields_refused() {
        let mut world = SandboxWorld::new();
        let actor = world.add_unit(UnitSpec::creature(TemplateId(1)));
        let mut scope = world.scope(actor);
        assert!(!scope.set_unit_field(actor, 2, 1));
        assert!(scope.set_unit_field(actor, PROTECTED_FIELDS, 1));
    }
}
