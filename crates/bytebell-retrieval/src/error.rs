//! Error types for bytebell-retrieval

use thiserror::Error;

/// Errors that can occur in bytebell-retrieval operations
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Qdrant client error
    #[error("Qdrant error: {0}")]
    Qdrant(String),

    /// Vector index query failed
    #[error("Index query failed: {0}")]
    Index(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(String),

    // =========================================================================
    // Remote service errors
    // =========================================================================
    /// Remote service unavailable (network failure, timeout, 5xx)
    #[error("{service} unavailable: {message}")]
    ServiceUnavailable {
        service: &'static str,
        message: String,
    },

    /// Authentication with a remote service failed
    #[error("{service} authentication failed: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    /// Remote service rate limited the request
    #[error("{service} rate limited, retry after {retry_after:?} seconds")]
    RateLimit {
        service: &'static str,
        retry_after: Option<u64>,
    },

    /// Requested model or resource does not exist
    #[error("{service} resource not found: {message}")]
    NotFound {
        service: &'static str,
        message: String,
    },

    /// Embedding dimension mismatch
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Completion service error
    #[error("Completion failed: {0}")]
    Completion(String),

    /// Response body did not have the expected shape
    #[error("Malformed response from {service}: {message}")]
    MalformedResponse {
        service: &'static str,
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RetrievalError {
    /// Create a new ServiceUnavailable error.
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service,
            message: message.into(),
        }
    }

    /// Create a new MalformedResponse error.
    pub fn malformed(service: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            service,
            message: message.into(),
        }
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// Auth, not-found, malformed and configuration errors are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::ServiceUnavailable { .. }
                | RetrievalError::RateLimit { .. }
                | RetrievalError::Connection(_)
        )
    }
}

impl From<qdrant_client::QdrantError> for RetrievalError {
    fn from(err: qdrant_client::QdrantError) -> Self {
        RetrievalError::Qdrant(err.to_string())
    }
}

/// Result type for bytebell-retrieval operations
pub type Result<T> = std::result::Result<T, RetrievalError>;
