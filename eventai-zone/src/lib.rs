//! # eventai-zone — Zone Host for EventAI
//!
//! This crate hosts many `eventai-core` controllers in one shared world.
//! It owns the units, routes world events into each controller's hooks
//! and delivers the signals actors throw at each other.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                  Zone                    │
//! │  ┌───────────────┐  ┌────────────────┐  │
//! │  │  ZoneEvent    │  │  tick(elapsed) │  │
//! │  └───────┬───────┘  └───────┬────────┘  │
//! │          ▼                  ▼           │
//! │    ┌─────────────────────────────┐      │
//! │    │  EventAi per scripted unit  │      │
//! │    └──────────────┬──────────────┘      │
//! │                   ▼                     │
//! │    ┌─────────────────────────────┐      │
//! │    │ SandboxWorld (journal, box) │      │
//! │    └──────────────┬──────────────┘      │
//! │                   ▼                     │
//! │    settle: summons, attack orders,      │
//! │    despawns, signal delivery            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config` — Zone TOML (engine tables plus `[zone]`) and tracing setup
//! - `error` — Zone error type
//! - `events` — World events a host feeds into the zone
//! - `zone` — Actor registry, event routing, ticking, signal delivery

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod zone;

pub use config::{ZoneConfig, ZoneSettings, init_tracing};
pub use error::{Result, ZoneError};
pub use events::ZoneEvent;
pub use zone::Zone;
