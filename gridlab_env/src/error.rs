//! Error types for the GridLab engine abstraction.

use gridlab_core::{ConfigError, DecodeError};
use thiserror::Error;

/// Errors that can occur while talking to the simulation engine.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Simulation, page or result set does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Underlying I/O failed (file-backed engines)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A page payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The engine rejected the request
    #[error("Engine error: {0}")]
    Engine(String),
}

impl EnvError {
    /// Creates a not-found error.
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    /// Creates an engine error.
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

impl From<ConfigError> for EnvError {
    fn from(err: ConfigError) -> Self {
        Self::Serialization(err.to_string())
    }
}
