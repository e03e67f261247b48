//! Error types for research gathering and debate runs

use debate_llm::LLMError;
use std::time::Duration;
use thiserror::Error;

/// Stock debate specific errors
#[derive(Debug, Error)]
pub enum DebateError {
    /// A research collaborator returned nothing usable
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
    },

    /// The completion backend failed (transport, auth, rate limit)
    #[error("Provider error: {0}")]
    Provider(#[from] LLMError),

    /// A completion did not finish within the configured bound
    #[error("Completion timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The run was cancelled by the caller
    #[error("Debate cancelled")]
    Cancelled,

    /// A completion arrived without the expected content
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Required settings or credentials are missing or invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Rate limit exceeded for a data API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded {
        provider: String,
    },

    /// Network or HTTP error talking to a data API
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Prompt template failed to render
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl DebateError {
    /// Convenience constructor for [`DebateError::DataUnavailable`]
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    /// Whether this failure belongs to the completion side of a turn
    ///
    /// Provider failures, timeouts and empty responses all end a turn the same way.
    pub fn is_turn_failure(&self) -> bool {
        matches!(
            self,
            Self::Provider(_) | Self::Timeout(_) | Self::MalformedResponse(_) | Self::Cancelled
        )
    }
}

/// Result type alias for debate operations
pub type Result<T> = std::result::Result<T, DebateError>;
