//! Runtime metrics and instrumentation.
//!
//! Provides Prometheus-compatible counters for the event engine and a
//! monitor for zone tick cost. Counters are plain atomics bumped on the hot
//! path; a zone normally shares one [`EventAiCounters`] between all of its
//! actors. The tick window sits behind a `parking_lot::Mutex` that is only
//! contended on dashboard reads.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

// ---------------------------------------------------------------------------
// Counters (lock-free)
// ---------------------------------------------------------------------------

/// Atomic counters for high-frequency engine events.
#[derive(Debug)]
pub struct EventAiCounters {
    /// Firings that passed every gate and ran their actions.
    pub events_fired: AtomicU64,
    /// Firings abandoned by the chance roll.
    pub chance_skipped: AtomicU64,
    /// Individual actions dispatched.
    pub actions_executed: AtomicU64,
    /// Faults reported (all kinds).
    pub faults_reported: AtomicU64,
    /// Of those, target selectors that failed to resolve.
    pub targets_unresolved: AtomicU64,
    /// Signals thrown, by action or automatically.
    pub signals_thrown: AtomicU64,
    /// Aggregated timer updates performed.
    pub timer_updates: AtomicU64,
}

impl EventAiCounters {
    /// Create a new set of zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            events_fired: AtomicU64::new(0),
            chance_skipped: AtomicU64::new(0),
            actions_executed: AtomicU64::new(0),
            faults_reported: AtomicU64::new(0),
            targets_unresolved: AtomicU64::new(0),
            signals_thrown: AtomicU64::new(0),
            timer_updates: AtomicU64::new(0),
        }
    }

    /// Increment a counter by one.
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            events_fired: self.events_fired.load(Ordering::Relaxed),
            chance_skipped: self.chance_skipped.load(Ordering::Relaxed),
            actions_executed: self.actions_executed.load(Ordering::Relaxed),
            faults_reported: self.faults_reported.load(Ordering::Relaxed),
            targets_unresolved: self.targets_unresolved.load(Ordering::Relaxed),
            signals_thrown: self.signals_thrown.load(Ordering::Relaxed),
            timer_updates: self.timer_updates.load(Ordering::Relaxed),
        }
    }
}

impl Default for EventAiCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of counter values at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Firings that ran their actions.
    pub events_fired: u64,
    /// Firings abandoned by the chance roll.
    pub chance_skipped: u64,
    /// Actions dispatched.
    pub actions_executed: u64,
    /// Faults reported.
    pub faults_reported: u64,
    /// Unresolved targets.
    pub targets_unresolved: u64,
    /// Signals thrown.
    pub signals_thrown: u64,
    /// Aggregated timer updates.
    pub timer_updates: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP eventai_events_fired_total Event firings that ran their actions\n\
             # TYPE eventai_events_fired_total counter\n\
             eventai_events_fired_total {}\n\
             # HELP eventai_chance_skipped_total Firings abandoned by the chance roll\n\
             # TYPE eventai_chance_skipped_total counter\n\
             eventai_chance_skipped_total {}\n\
             # HELP eventai_actions_executed_total Actions dispatched\n\
             # TYPE eventai_actions_executed_total counter\n\
             eventai_actions_executed_total {}\n\
             # HELP eventai_faults_reported_total Recovered faults reported\n\
             # TYPE eventai_faults_reported_total counter\n\
             eventai_faults_reported_total {}\n\
             # HELP eventai_targets_unresolved_total Target selectors that failed to resolve\n\
             # TYPE eventai_targets_unresolved_total counter\n\
             eventai_targets_unresolved_total {}\n\
             # HELP eventai_signals_thrown_total Signals thrown between actors\n\
             # TYPE eventai_signals_thrown_total counter\n\
             eventai_signals_thrown_total {}\n\
             # HELP eventai_timer_updates_total Aggregated timer updates\n\
             # TYPE eventai_timer_updates_total counter\n\
             eventai_timer_updates_total {}\n",
            self.events_fired,
            self.chance_skipped,
            self.actions_executed,
            self.faults_reported,
            self.targets_unresolved,
            self.signals_thrown,
            self.timer_updates,
        )
    }
}

// ---------------------------------------------------------------------------
// Zone Tick Monitor
// ---------------------------------------------------------------------------

/// What one zone tick cost.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickSample {
    /// Wall time of the whole tick, settling included (milliseconds).
    pub total_ms: f64,
    /// Actors whose periodic update ran.
    pub actors_updated: u32,
    /// Most expensive single actor update (milliseconds).
    pub slowest_actor_ms: f64,
    /// Settle rounds spent on follow-ups and signal delivery.
    pub settle_rounds: u32,
    /// Settling hit the round limit with work still pending.
    pub settle_exhausted: bool,
}

impl TickSample {
    /// Mean cost of one actor update (milliseconds).
    #[must_use]
    pub fn per_actor_ms(&self) -> f64 {
        if self.actors_updated == 0 {
            0.0
        } else {
            self.total_ms / f64::from(self.actors_updated)
        }
    }
}

/// Rolling window of recent zone ticks, judged against a time budget.
///
/// The zone times each actor's update and counts settle rounds, then hands
/// the finished [`TickSample`] over:
///
/// ```rust
/// # use eventai_core::metrics::{TickSample, ZoneTickMonitor};
/// let monitor = ZoneTickMonitor::new(2.0, 64);
/// let over = monitor.record(TickSample {
///     total_ms: 0.4,
///     actors_updated: 20,
///     slowest_actor_ms: 0.05,
///     settle_rounds: 1,
///     settle_exhausted: false,
/// });
/// assert!(!over);
/// assert_eq!(monitor.tick_count(), 1);
/// ```
#[derive(Debug)]
pub struct ZoneTickMonitor {
    budget_ms: f64,
    window: Mutex<TickWindow>,
}

#[derive(Debug)]
struct TickWindow {
    samples: VecDeque<TickSample>,
    capacity: usize,
    ticks: u64,
    over_budget: u64,
    exhausted_settles: u64,
}

impl ZoneTickMonitor {
    /// A monitor keeping the last `window` ticks (at least one).
    #[must_use]
    pub fn new(budget_ms: f64, window: usize) -> Self {
        let capacity = window.max(1);
        Self {
            budget_ms,
            window: Mutex::new(TickWindow {
                samples: VecDeque::with_capacity(capacity),
                capacity,
                ticks: 0,
                over_budget: 0,
                exhausted_settles: 0,
            }),
        }
    }

    /// Add a finished tick. Returns whether it went over budget.
    pub fn record(&self, sample: TickSample) -> bool {
        let over = sample.total_ms > self.budget_ms;
        let mut w = self.window.lock();
        if w.samples.len() == w.capacity {
            w.samples.pop_front();
        }
        w.samples.push_back(sample);
        w.ticks += 1;
        w.over_budget += u64::from(over);
        w.exhausted_settles += u64::from(sample.settle_exhausted);
        over
    }

    /// The most recent tick.
    #[must_use]
    pub fn last(&self) -> Option<TickSample> {
        self.window.lock().samples.back().copied()
    }

    /// Ticks recorded since creation.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.window.lock().ticks
    }

    /// Ticks since creation that went over budget.
    #[must_use]
    pub fn over_budget_count(&self) -> u64 {
        self.window.lock().over_budget
    }

    /// Ticks since creation whose settling ran out of rounds.
    #[must_use]
    pub fn exhausted_settles(&self) -> u64 {
        self.window.lock().exhausted_settles
    }

    /// The configured budget in milliseconds.
    #[must_use]
    pub fn budget_ms(&self) -> f64 {
        self.budget_ms
    }

    /// Aggregate over the ticks still in the window.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn summary(&self) -> TickSummary {
        let w = self.window.lock();
        let n = w.samples.len();
        if n == 0 {
            return TickSummary::default();
        }

        let mut totals: Vec<f64> = w.samples.iter().map(|s| s.total_ms).collect();
        totals.sort_by(f64::total_cmp);
        let actors: u64 = w.samples.iter().map(|s| u64::from(s.actors_updated)).sum();
        let spent: f64 = totals.iter().sum();
        let over = totals.iter().filter(|&&t| t > self.budget_ms).count();

        TickSummary {
            ticks: n,
            mean_ms: spent / n as f64,
            p95_ms: totals[((n as f64 * 0.95) as usize).min(n - 1)],
            max_ms: totals[n - 1],
            per_actor_ms: if actors == 0 { 0.0 } else { spent / actors as f64 },
            slowest_actor_ms: w
                .samples
                .iter()
                .map(|s| s.slowest_actor_ms)
                .fold(0.0, f64::max),
            max_settle_rounds: w.samples.iter().map(|s| s.settle_rounds).max().unwrap_or(0),
            over_budget_ratio: over as f64 / n as f64,
        }
    }
}

/// Aggregate of the monitor's window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSummary {
    /// Ticks in the window.
    pub ticks: usize,
    /// Mean tick time in milliseconds.
    pub mean_ms: f64,
    /// 95th percentile tick time in milliseconds.
    pub p95_ms: f64,
    /// Slowest tick in milliseconds.
    pub max_ms: f64,
    /// Tick time spread over every actor update in the window.
    pub per_actor_ms: f64,
    /// Slowest single actor update in the window.
    pub slowest_actor_ms: f64,
    /// Most settle rounds any tick needed.
    pub max_settle_rounds: u32,
    /// Fraction of ticks over budget (0.0–1.0).
    pub over_budget_ratio: f64,
}

impl fmt::Display for TickSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ticks={} mean={:.2}ms p95={:.2}ms max={:.2}ms per-actor={:.3}ms \
             slowest-actor={:.3}ms settle-rounds<={} over-budget={:.1}%",
            self.ticks,
            self.mean_ms,
            self.p95_ms,
            self.max_ms,
            self.per_actor_ms,
            self.slowest_actor_ms,
            self.max_settle_rounds,
            self.over_budget_ratio * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracing Span Names
// ---------------------------------------------------------------------------

/// Span names used with `tracing::span!`.
pub mod spans {
    /// One zone tick across all actors.
    pub const ZONE_TICK: &str = "eventai::zone::tick";
    /// One actor's periodic update.
    pub const ACTOR_UPDATE: &str = "eventai::actor::update";
    /// Signal delivery round.
    pub const SIGNAL_DELIVERY: &str = "eventai::zone::signals";
}
