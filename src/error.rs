//! Custom error types for citegraph.
//!
//! All fallible library functions return `Result<T, CitegraphError>`.
//! The binary wraps these in `anyhow` at the edges.

use thiserror::Error;

/// Main error type for citegraph operations.
#[derive(Debug, Error)]
pub enum CitegraphError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by external API
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// External API returned an error
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message from API
        message: String,
    },

    /// A requested collection name has no identifier in the library
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// A raw library item could not be turned into a paper record
    #[error("Malformed item: {0}")]
    MalformedItem(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CitegraphError {
    /// True for errors caused by the caller's input rather than a gateway.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CitegraphError::CollectionNotFound(_) | CitegraphError::Validation(_)
        )
    }
}

/// Result type alias using `CitegraphError`
pub type Result<T> = std::result::Result<T, CitegraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(CitegraphError::CollectionNotFound("x".into()).is_client_error());
        assert!(CitegraphError::Validation("x".into()).is_client_error());
        assert!(!CitegraphError::RateLimited(5).is_client_error());
    }
}
