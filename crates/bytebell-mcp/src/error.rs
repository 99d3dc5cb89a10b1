//! Error types for the MCP server

use thiserror::Error;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur in the MCP server
#[derive(Error, Debug)]
pub enum McpError {
    /// Invalid parameters provided
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// A search stage reported failure
    #[error("Search failed: {0}")]
    SearchError(String),

    /// Retrieval aborted before producing context
    #[error("Retrieval failed: {0}")]
    Retrieval(String),
}

impl From<bytebell_retrieval::RetrievalError> for McpError {
    fn from(e: bytebell_retrieval::RetrievalError) -> Self {
        McpError::Retrieval(e.to_string())
    }
}
