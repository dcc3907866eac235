//! Error type for the console harness.

use gridlab_core::{ConfigError, DecodeError};
use gridlab_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking decode task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ConsoleError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
