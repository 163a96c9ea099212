//! Error types for the careerswarm domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all careerswarm operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation errors ---
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    // --- Persistence errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- State errors ---
    #[error("Task not found in the current weekly plan: {0}")]
    TaskNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the generative completion path.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("Rate limit exceeded: more than {limit} requests in {window_secs}s")]
    RateLimitExceeded { limit: u32, window_secs: u64 },

    #[error("Network error{}: {message}", describe_status(.status))]
    Network { status: Option<u16>, message: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Endpoint returned an empty response")]
    EmptyResponse,

    #[error("Invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("Generative endpoint not configured: {0}")]
    NotConfigured(String),

    #[error("Generation cancelled")]
    Cancelled,
}

fn describe_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status: {s})")).unwrap_or_default()
}

impl GenerationError {
    /// Shorthand for a network failure without an HTTP status (transport error).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Network {
            status: None,
            message: message.into(),
        }
    }

    /// Shorthand for a network failure carrying an HTTP status.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Network {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Client-class failures (HTTP 4xx) are the caller's fault; repeating the
    /// same request cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Network { status: Some(s), .. } if (400..500).contains(s))
    }

    /// Errors that must abort a swarm run instead of degrading one agent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotConfigured(_) | Self::Cancelled)
    }
}

/// Failures of the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stored state for user '{user_id}' is corrupted: {reason}")]
    Corrupted { user_id: String, reason: String },

    #[error("Failed to serialize state: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_error_displays_status() {
        let err = Error::Generation(GenerationError::status(503, "Service Unavailable"));
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));

        let err = GenerationError::transport("connection reset");
        assert_eq!(err.to_string(), "Network error: connection reset");
    }

    #[test]
    fn client_errors_are_4xx_only() {
        assert!(GenerationError::status(400, "bad request").is_client_error());
        assert!(GenerationError::status(404, "no such model").is_client_error());
        assert!(GenerationError::status(429, "quota").is_client_error());
        assert!(!GenerationError::status(500, "boom").is_client_error());
        assert!(!GenerationError::transport("dns").is_client_error());
        assert!(!GenerationError::Timeout("60s".into()).is_client_error());
    }

    #[test]
    fn only_configuration_and_cancellation_are_fatal() {
        assert!(GenerationError::NotConfigured("no key".into()).is_fatal());
        assert!(GenerationError::Cancelled.is_fatal());
        assert!(!GenerationError::EmptyResponse.is_fatal());
        assert!(!GenerationError::InvalidJson("{}".into()).is_fatal());
        assert!(!GenerationError::RateLimitExceeded { limit: 60, window_secs: 60 }.is_fatal());
    }

    #[test]
    fn store_error_displays_user() {
        let err = Error::Store(StoreError::Corrupted {
            user_id: "u-42".into(),
            reason: "expected value at line 1".into(),
        });
        assert!(err.to_string().contains("u-42"));
    }
}
