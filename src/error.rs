//! Error types for taskrelay.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Bot Framework Connector API errors.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Token request failed: {0}")]
    Auth(String),

    #[error("Connector {operation} failed (HTTP {status}): {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Connector {operation} request failed: {reason}")]
    Request { operation: String, reason: String },

    #[error("Activity is missing required field: {0}")]
    MissingField(&'static str),
}

impl ConnectorError {
    /// Map a transport-level reqwest error for a named connector operation.
    pub fn request(operation: &str, err: reqwest::Error) -> Self {
        Self::Request {
            operation: operation.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
