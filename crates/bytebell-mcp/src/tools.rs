//! MCP Tool parameter definitions
//!
//! These structs define the JSON Schema for tool parameters using schemars.

use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Parameters for the bytebell_agent tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentParams {
    #[schemars(description = "The user's question to answer from the ByteBell knowledge base")]
    pub query: String,
}

/// Parameters for the search_namespace tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchNamespaceParams {
    #[schemars(description = "Search query")]
    pub query: String,

    #[schemars(
        description = "Which namespace to search: 'meta' for cross-referencing summaries, 'base' for detailed content"
    )]
    pub stage: String,

    /// Overrides the code-intent classifier
    #[schemars(
        description = "Also search code repositories. When omitted, the query itself decides."
    )]
    pub include_code: Option<bool>,

    #[schemars(description = "Maximum results to return (default 20, at most 100)")]
    pub top_k: Option<usize>,
}
