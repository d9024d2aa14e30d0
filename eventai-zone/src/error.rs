//! Error types for the zone layer.

use eventai_core::EntityId;
use eventai_core::EventAiError;
use thiserror::Error;

/// Errors raised by zone setup and event routing.
#[derive(Error, Debug)]
pub enum ZoneError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error bubbled up from the engine.
    #[error(transparent)]
    Engine(#[from] EventAiError),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracing subscriber could not be installed.
    #[error("Tracing setup failed: {0}")]
    Tracing(String),

    /// An event named a unit the zone does not know.
    #[error("unknown unit {0}")]
    UnknownUnit(EntityId),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, ZoneError>;
