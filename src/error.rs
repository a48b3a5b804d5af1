//! Error types for Roundtable

use thiserror::Error;

/// Result type alias for Roundtable operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Roundtable.
///
/// None of these escape the router or the tool invoker: both turn every
/// failure into a visible string in the conversation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Provider { provider: String, message: String },

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Delegation recursion limit reached ({0} hops)")]
    RecursionLimit(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a provider error from a vendor error payload.
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Whether this came from a well-formed provider error payload.
    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider { .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
