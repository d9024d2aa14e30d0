//! Configuration for the event engine.
//!
//! Maps directly to the `[general]`, `[scheduler]`, `[signals]`, `[summons]`
//! and `[diagnostics]` tables of `eventai.toml`. Every field has a default,
//! so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventAiConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Timer aggregation.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    /// Inter-actor signalling.
    #[serde(default)]
    pub signals: SignalConfig,
    /// Summon behaviour.
    #[serde(default)]
    pub summons: SummonConfig,
    /// Operator diagnostics.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl EventAiConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `EventAiError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::EventAiError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
    /// Load events flagged debug-only.
    #[serde(default)]
    pub debug_build: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            debug_build: false,
        }
    }
}

/// Timer aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Timers are advanced in batches of at least this many milliseconds.
    #[serde(default = "default_update_interval")]
    pub event_update_interval_ms: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_update_interval_ms: default_update_interval(),
        }
    }
}

/// Signal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Radius used for automatic signals and throws with radius 0.
    #[serde(default = "default_throw_radius")]
    pub default_throw_radius: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            default_throw_radius: default_throw_radius(),
        }
    }
}

/// Summon settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummonConfig {
    /// A unique summon is skipped when a live creature of the same
    /// template is within this distance.
    #[serde(default = "default_unique_radius")]
    pub unique_search_radius: f32,
}

impl Default for SummonConfig {
    fn default() -> Self {
        Self {
            unique_search_radius: default_unique_radius(),
        }
    }
}

/// Operator diagnostics settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Hide the per-event listing from diagnostics output.
    #[serde(default)]
    pub restricted: bool,
    /// Log a debug line whenever the phase mask suppresses a
    /// non-timer event.
    #[serde(default)]
    pub trace_phase_skips: bool,
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}
fn default_update_interval() -> u32 {
    500
}
fn default_throw_radius() -> f32 {
    30.0
}
fn default_unique_radius() -> f32 {
    100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = EventAiConfig::from_toml("").expect("empty config parses");
        assert_eq!(cfg.scheduler.event_update_interval_ms, 500);
        assert!((cfg.signals.default_throw_radius - 30.0).abs() < f32::EPSILON);
        assert!((cfg.summons.unique_search_radius - 100.0).abs() < f32::EPSILON);
        assert_eq!(cfg.general.log_level, "info");
        assert!(!cfg.general.debug_build);
        assert!(!cfg.diagnostics.restricted);
    }

    #[test]
    fn partial_tables_override_only_named_fields() {
        let cfg = EventAiConfig::from_toml(
            r#"
            [scheduler]
            event_update_interval_ms = 250

            [diagnostics]
            restricted = true
            "#,
        )
        .expect("valid config");
        assert_eq!(cfg.scheduler.event_update_interval_ms, 250);
        assert!(cfg.diagnostics.restricted);
        assert!(!cfg.diagnostics.trace_phase_skips);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = EventAiConfig::from_toml("[scheduler\nbroken").expect_err("must fail");
        assert!(matches!(err, crate::EventAiError::Config(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[general]\ndebug_build = true\nlog_level = \"debug\"").expect("write");
        let cfg = EventAiConfig::from_file(file.path()).expect("file parses");
        assert!(cfg.general.debug_build);
        assert_eq!(cfg.general.log_level, "debug");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EventAiConfig::from_file(std::path::Path::new("/nonexistent/eventai.toml"))
            .expect_err("must fail");
        assert!(matches!(err, crate::EventAiError::Io(_)));
    }
}
