//! Zone configuration and logging setup.
//!
//! A zone file is an engine file (`[general]`, `[scheduler]`, ...) with an
//! extra `[zone]` table:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [zone]
//! tick_budget_ms = 2.0
//! tick_window = 128
//! max_signal_rounds = 8
//! rng_seed = 42
//! ```

use eventai_core::config::{EventAiConfig, GeneralConfig};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::{Result, ZoneError};

/// Engine configuration plus zone-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Engine settings shared by every controller in the zone.
    #[serde(flatten)]
    pub engine: EventAiConfig,
    /// Zone settings.
    #[serde(default)]
    pub zone: ZoneSettings,
}

/// The `[zone]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSettings {
    /// Budget for one zone tick (milliseconds).
    #[serde(default = "default_tick_budget")]
    pub tick_budget_ms: f64,
    /// Recent ticks the monitor keeps for its summary.
    #[serde(default = "default_tick_window")]
    pub tick_window: usize,
    /// Rounds of cascaded signal delivery allowed per tick or event.
    #[serde(default = "default_signal_rounds")]
    pub max_signal_rounds: u32,
    /// Base seed for controller RNGs; `None` seeds from the OS.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            tick_budget_ms: default_tick_budget(),
            tick_window: default_tick_window(),
            max_signal_rounds: default_signal_rounds(),
            rng_seed: None,
        }
    }
}

fn default_tick_budget() -> f64 {
    2.0
}
fn default_tick_window() -> usize {
    128
}
fn default_signal_rounds() -> u32 {
    8
}

impl ZoneConfig {
    /// Load from a TOML string.
    ///
    /// # Errors
    /// Returns `ZoneError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| ZoneError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
///
/// # Errors
/// Returns `ZoneError::Tracing` if the filter is invalid or a subscriber
/// is already installed.
pub fn init_tracing(general: &GeneralConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&general.log_level)
            .map_err(|e| ZoneError::Tracing(e.to_string()))?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let installed = if general.json_logs {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|e| ZoneError::Tracing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn engine_and_zone_tables_share_a_file() {
        let config = ZoneConfig::from_toml(
            r#"
            [general]
            log_level = "debug"

            [signals]
            default_throw_radius = 12.5

            [zone]
            max_signal_rounds = 3
            rng_seed = 9
            "#,
        )
        .expect("valid toml");
        assert_eq!(config.engine.general.log_level, "debug");
        assert!((config.engine.signals.default_throw_radius - 12.5).abs() < f32::EPSILON);
        assert_eq!(config.zone.max_signal_rounds, 3);
        assert_eq!(config.zone.rng_seed, Some(9));
        assert!((config.zone.tick_budget_ms - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = ZoneConfig::from_toml("").expect("empty is valid");
        assert_eq!(config.zone.max_signal_rounds, 8);
        assert_eq!(config.zone.tick_window, 128);
        assert_eq!(config.engine.scheduler.event_update_interval_ms, 500);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[zone]\ntick_budget_ms = 4.0").expect("write");
        let config = ZoneConfig::from_file(file.path()).expect("loads");
        assert!((config.zone.tick_budget_ms - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = ZoneConfig::from_toml("[zone]\nmax_signal_rounds = \"many\"");
        assert!(matches!(err, Err(ZoneError::Config(_))));
    }
}
