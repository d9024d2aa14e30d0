//! Inter-actor signals and the automatic health-threshold broadcasts.
//!
//! Actors talk to each other by throwing a [`SignalKind`] to every creature
//! within a radius. Some signals are thrown automatically by the engine when
//! health crosses fixed thresholds; which ones is controlled per actor by a
//! [`SignalMask`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of signal exchanged between actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// The thrower died.
    JustDied,
    /// Health fell below 10%.
    CriticalHealth,
    /// Health fell below 50%.
    LostHealth,
    /// Health fell below 90%.
    LostSomeHealth,
    /// Health was restored to full.
    GotFullHealth,
    /// Script-defined signal A.
    CustomA,
    /// Script-defined signal B.
    CustomB,
    /// The thrower was crowd-controlled.
    GotCrowdControlled,
}

impl SignalKind {
    /// Every kind, in code order.
    pub const ALL: [Self; 8] = [
        Self::JustDied,
        Self::CriticalHealth,
        Self::LostHealth,
        Self::LostSomeHealth,
        Self::GotFullHealth,
        Self::CustomA,
        Self::CustomB,
        Self::GotCrowdControlled,
    ];

    /// Numeric code used in masks and diagnostics.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::JustDied => 0,
            Self::CriticalHealth => 1,
            Self::LostHealth => 2,
            Self::LostSomeHealth => 3,
            Self::GotFullHealth => 4,
            Self::CustomA => 5,
            Self::CustomB => 6,
            Self::GotCrowdControlled => 7,
        }
    }

    /// Inverse of [`SignalKind::code`].
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::JustDied => "just-died",
            Self::CriticalHealth => "critical-health",
            Self::LostHealth => "lost-health",
            Self::LostSomeHealth => "lost-some-health",
            Self::GotFullHealth => "got-full-health",
            Self::CustomA => "custom-a",
            Self::CustomB => "custom-b",
            Self::GotCrowdControlled => "got-crowd-controlled",
        };
        f.write_str(name)
    }
}

/// Set of signal kinds the engine throws automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SignalMask(u32);

impl SignalMask {
    /// No automatic signals.
    pub const EMPTY: Self = Self(0);

    /// Build from raw bits; bits beyond the known kinds are dropped.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & 0xFF)
    }

    /// Build a mask from a list of kinds.
    #[must_use]
    pub fn of(kinds: &[SignalKind]) -> Self {
        Self(kinds.iter().fold(0, |acc, k| acc | (1 << k.code())))
    }

    /// Whether `kind` is in the mask.
    #[must_use]
    pub const fn contains(self, kind: SignalKind) -> bool {
        self.0 & (1 << kind.code()) != 0
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Health arc
// ---------------------------------------------------------------------------

/// Health-percent thresholds, highest first, with the signal each one throws.
pub const HEALTH_THRESHOLDS: [(f64, SignalKind); 3] = [
    (90.0, SignalKind::LostSomeHealth),
    (50.0, SignalKind::LostHealth),
    (10.0, SignalKind::CriticalHealth),
];

/// Progress through one damage arc.
///
/// Each threshold is passed at most once per arc, always in descending
/// order. Healing to full closes the arc; the next arc starts once damage
/// drops health to the first threshold again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HealthArc {
    /// No threshold passed yet.
    #[default]
    Untouched,
    /// Below 90%.
    PastSome,
    /// Below 50%.
    PastHalf,
    /// Below 10%; nothing further can fire until the arc closes.
    Critical,
    /// The full-health signal was sent; no further heal signal until the
    /// next arc begins.
    FullHealthSent,
}

impl HealthArc {
    /// Index into [`HEALTH_THRESHOLDS`] of the next threshold to watch, or
    /// `None` when every threshold in this arc has been passed.
    #[must_use]
    pub const fn next_step(self) -> Option<usize> {
        match self {
            Self::Untouched | Self::FullHealthSent => Some(0),
            Self::PastSome => Some(1),
            Self::PastHalf => Some(2),
            Self::Critical => None,
        }
    }

    /// State after passing the threshold at `step`.
    #[must_use]
    pub const fn after_step(step: usize) -> Self {
        match step {
            0 => Self::PastSome,
            1 => Self::PastHalf,
            _ => Self::Critical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for kind in SignalKind::ALL {
            assert_eq!(SignalKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(SignalKind::from_code(8), None);
    }

    #[test]
    fn mask_membership() {
        let mask = SignalMask::of(&[SignalKind::JustDied, SignalKind::GotFullHealth]);
        assert!(mask.contains(SignalKind::JustDied));
        assert!(mask.contains(SignalKind::GotFullHealth));
        assert!(!mask.contains(SignalKind::CustomA));
        assert_eq!(SignalMask::from_bits(0xFFFF_FFFF).bits(), 0xFF);
    }

    #[test]
    fn arc_steps_advance_monotonically() {
        assert_eq!(HealthArc::Untouched.next_step(), Some(0));
        assert_eq!(HealthArc::after_step(0).next_step(), Some(1));
        assert_eq!(HealthArc::after_step(1).next_step(), Some(2));
        assert_eq!(HealthArc::after_step(2).next_step(), None);
        assert_eq!(HealthArc::FullHealthSent.next_step(), Some(0));
    }
}
