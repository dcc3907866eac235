//! Error types for the GridLab core.

use thiserror::Error;

/// Errors raised while decoding a compressed iteration page.
///
/// An absent payload is not an error; these only fire on payloads that are
/// present but cannot be read, so they never collapse into "no data yet".
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload is not valid base64
    #[error("Base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Compressed stream is corrupt or truncated
    #[error("Inflate error: {0}")]
    Inflate(#[source] std::io::Error),

    /// Inflated bytes are not UTF-8 text
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Text is not a JSON iteration -> row -> cell array
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A snapshot is not a non-empty rectangle
    #[error("Malformed snapshot at iteration {iteration}: {reason}")]
    Shape { iteration: usize, reason: String },
}

impl DecodeError {
    /// Creates a shape error.
    pub fn shape(iteration: usize, reason: impl Into<String>) -> Self {
        Self::Shape {
            iteration,
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading or editing a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON could not be parsed into a configuration
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Component index does not exist
    #[error("No component at index {0}")]
    NoSuchComponent(usize),

    /// Component list is full
    #[error("At most {0} components are supported")]
    TooManyComponents(usize),

    /// Component has no plain cell value
    #[error("Component {0} cannot be packed into a cell value")]
    NotEncodable(usize),
}
