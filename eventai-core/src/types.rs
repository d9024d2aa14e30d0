//! Core type definitions shared by every part of the engine.
//!
//! Identifiers are thin newtypes so a spell id can never be passed where a
//! creature template is expected. Phases and phase masks are range-checked:
//! a phase at or above [`MAX_PHASE`] cannot be constructed.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for any entity (creature, player, pet) in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creature template (entry) identifier. All actors spawned from the same
/// template share one list of event definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Spell (ability) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Event definition identifier, unique across the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Quest identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuestId(pub u32);

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Location {
    /// Construct a location from its coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another location.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Whether `other` lies inside an axis-aligned box of half-width
    /// `tolerance` centred on this location.
    #[must_use]
    pub fn within_box(&self, other: &Self, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Number of distinct phases an actor can be in.
pub const MAX_PHASE: u8 = 32;

/// The actor's current behavioural mode, always in `0..MAX_PHASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Phase(u8);

impl Phase {
    /// The initial phase.
    pub const ZERO: Self = Self(0);
    /// The highest valid phase.
    pub const LAST: Self = Self(MAX_PHASE - 1);

    /// Range-checked constructor. Returns `None` for values at or above [`MAX_PHASE`].
    #[must_use]
    pub fn new(value: u32) -> Option<Self> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v < MAX_PHASE)
            .map(Self)
    }

    /// Clamp an arbitrary (possibly negative) value into the valid range.
    ///
    /// The second element is `true` when the input had to be corrected.
    #[must_use]
    pub fn clamped(value: i64) -> (Self, bool) {
        let clamped = value.clamp(0, i64::from(MAX_PHASE - 1));
        // In range after the clamp above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let phase = Self(clamped as u8);
        (phase, clamped != value)
    }

    /// Raw phase number.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Single-bit mask for this phase.
    #[must_use]
    pub const fn bit(self) -> u32 {
        1 << self.0
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of phases. Used inverted on event definitions: an event is
/// suppressed while the actor's phase is a member of its mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PhaseMask(u32);

impl PhaseMask {
    /// The empty mask; suppresses nothing.
    pub const EMPTY: Self = Self(0);

    /// Build a mask from raw bits. Every `u32` is a valid 32-phase set.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Build a mask containing the given phases.
    #[must_use]
    pub fn of(phases: &[Phase]) -> Self {
        Self(phases.iter().fold(0, |acc, p| acc | p.bit()))
    }

    /// Whether `phase` is in the mask.
    #[must_use]
    pub const fn contains(self, phase: Phase) -> bool {
        self.0 & phase.bit() != 0
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Combat primitives
// ---------------------------------------------------------------------------

/// Spell school bitmask (physical, holy, fire, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SchoolMask(pub u32);

impl SchoolMask {
    /// Whether the two masks share at least one school.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Current and maximum value of a resource pool (health, mana, energy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vitals {
    /// Current amount.
    pub current: u32,
    /// Maximum amount.
    pub max: u32,
}

impl Vitals {
    /// Construct a pool.
    #[must_use]
    pub const fn new(current: u32, max: u32) -> Self {
        Self { current, max }
    }

    /// Truncating integer percentage `current * 100 / max`, or `None` when
    /// the pool has no maximum.
    #[must_use]
    pub fn percent(self) -> Option<u32> {
        if self.max == 0 {
            return None;
        }
        let pct = u64::from(self.current) * 100 / u64::from(self.max);
        Some(u32::try_from(pct).unwrap_or(u32::MAX))
    }
}

/// Resource pools that percent-band events can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerKind {
    /// Mana pool.
    Mana,
    /// Energy pool.
    Energy,
}

/// Instance difficulty, used to filter difficulty-flagged events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Normal-mode instance.
    Normal,
    /// Heroic-mode instance.
    Heroic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_rejects_out_of_range() {
        assert_eq!(Phase::new(0), Some(Phase::ZERO));
        assert_eq!(Phase::new(31).map(Phase::value), Some(31));
        assert!(Phase::new(32).is_none());
        assert!(Phase::new(u32::MAX).is_none());
    }

    #[test]
    fn phase_clamp_reports_correction() {
        assert_eq!(Phase::clamped(5), (Phase(5), false));
        assert_eq!(Phase::clamped(-3), (Phase::ZERO, true));
        assert_eq!(Phase::clamped(40), (Phase::LAST, true));
    }

    #[test]
    fn phase_mask_membership() {
        let mask = PhaseMask::of(&[Phase(1), Phase(31)]);
        assert!(mask.contains(Phase(1)));
        assert!(mask.contains(Phase(31)));
        assert!(!mask.contains(Phase(0)));
        assert_eq!(mask.bits(), 0x8000_0002);
    }

    #[test]
    fn vitals_percent_truncates() {
        assert_eq!(Vitals::new(999, 1000).percent(), Some(99));
        assert_eq!(Vitals::new(0, 1000).percent(), Some(0));
        assert_eq!(Vitals::new(5, 0).percent(), None);
    }

    #[test]
    fn waypoint_box_is_per_axis() {
        let a = Location::new(0.0, 0.0, 0.0);
        assert!(a.within_box(&Location::new(2.0, -2.0, 2.0), 2.0));
        assert!(!a.within_box(&Location::new(2.5, 0.0, 0.0), 2.0));
    }
}
