//! # EventAI Core Library
//!
//! Game-agnostic, data-driven behaviour for non-player characters.
//!
//! Every creature template may carry a list of scripted events. An
//! [`EventAi`] controller owns one actor's copy of that list and turns
//! game callbacks into action sequences:
//!
//! - **Triggers**: timers, health/mana/energy bands, aggro, death, kills,
//!   spell hits, line of sight, summons, emotes, quests, waypoints, auras.
//! - **Gates**: an inverse phase mask, a per-event cooldown, a chance roll
//!   and (for friendly scans) a unit found in range.
//! - **Actions**: up to three per event: texts, casts, summons, threat,
//!   phase changes, movement, quest credit, signals and more.
//! - **Signals**: actors broadcast [`SignalKind`]s to creatures nearby,
//!   some automatically as health drops through fixed thresholds.
//!
//! The engine never touches game state directly. Everything goes through
//! the [`World`] trait, scoped to the controlled actor; [`sandbox`] ships
//! an in-memory implementation.
//!
//! ## Runtime Contract
//!
//! Controllers are single-threaded and per-actor. Nothing here panics on
//! bad script data: misconfigurations surface as [`error::Fault`]s, logged
//! through `tracing` and counted in [`EventAiCounters`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod runtime;
pub mod sandbox;
pub mod signal;
pub mod store;
pub mod target;
pub mod types;
pub mod world;

mod evaluator;
mod executor;

pub use action::{ActionEffect, CastFlags, TargetSelector};
pub use config::EventAiConfig;
pub use engine::{AiSettings, CombatMovement, EventAi};
pub use error::{EventAiError, Fault};
pub use event::{EventCondition, EventDefinition};
pub use metrics::EventAiCounters;
pub use signal::{SignalKind, SignalMask};
pub use store::{EventStore, InMemoryEventStore};
pub use types::*;
pub use world::{World, WorldCommands, WorldView};
