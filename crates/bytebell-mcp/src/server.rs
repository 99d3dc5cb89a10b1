//! ByteBell MCP Server implementation
//!
//! This module implements the MCP server using the rmcp SDK, exposing:
//! - Grounding context (bytebell_agent, the full meta→base retrieval)
//! - Single-stage search (search_namespace)
//!
//! Tool failures are reported as text content rather than protocol errors so
//! the calling model can read them.

use std::sync::Arc;

use bytebell_retrieval::{FormatOptions, RetrievalOutcome, Retriever, Stage};
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ErrorData as McpError,
};
use tracing::{debug, info, warn};

use crate::tools::*;

/// Largest `top_k` accepted by search_namespace
pub const MAX_TOP_K: usize = 100;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Upper bound on requested results per search
    pub max_top_k: usize,
    /// Separator line printed after each search_namespace result
    pub separator: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_top_k: MAX_TOP_K,
            separator: FormatOptions::DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn with_max_top_k(mut self, max_top_k: usize) -> Self {
        self.max_top_k = max_top_k;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

/// Wrap retrieved documents for a calling model
pub fn wrap_context(docs: &str) -> String {
    format!(
        "Here is the context from ByteBell\n\
         <CONTEXT>{}</CONTEXT>\n\
         Calling LLM Must follow the instructions mentioned in the <Instructions> tag.\n\
         <Instructions>\n\
         Use as much resources you are getting above in the <CONTEXT> tag and include urls and any references also while generating the answer\n\
         </Instructions>",
        docs
    )
}

/// Text reported for a failed tool call
fn error_text(query: &str, err: &crate::McpError) -> String {
    format!("Error processing query \"{}\": {}", query, err)
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

/// ByteBell MCP Server exposing retrieval tools
#[derive(Clone)]
pub struct ByteBellServer {
    retriever: Arc<Retriever>,
    config: ServerConfig,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ByteBellServer {
    pub fn new(retriever: Arc<Retriever>, config: ServerConfig) -> Self {
        info!("Initializing ByteBell MCP server");
        Self {
            retriever,
            config,
            tool_router: Self::tool_router(),
        }
    }

    /// Grounding context for `query`, wrapped for the calling model
    ///
    /// The query is forwarded as given; retrieval always yields text.
    pub async fn agent_context(&self, query: &str) -> String {
        match self.retriever.run(query).await {
            RetrievalOutcome::Context(docs) => wrap_context(&docs),
            RetrievalOutcome::Diagnostic(message) => {
                warn!("bytebell_agent: retrieval aborted for '{}'", query);
                wrap_context(message)
            }
        }
    }

    /// Labelled single-stage results
    pub async fn namespace_results(&self, params: &SearchNamespaceParams) -> crate::Result<String> {
        let query = params.query.trim();
        if query.is_empty() {
            return Err(crate::McpError::InvalidParams(
                "query must not be empty".to_string(),
            ));
        }
        let stage: Stage = params
            .stage
            .parse()
            .map_err(crate::McpError::InvalidParams)?;
        if let Some(top_k) = params.top_k {
            if top_k == 0 || top_k > self.config.max_top_k {
                return Err(crate::McpError::InvalidParams(format!(
                    "top_k must be between 1 and {}",
                    self.config.max_top_k
                )));
            }
        }

        let response = self
            .retriever
            .search_stage(stage, query, params.include_code, params.top_k)
            .await;

        if !response.success {
            let message = response
                .error
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(crate::McpError::SearchError(message));
        }

        let rendered = FormatOptions::for_stage(stage)
            .with_separator(self.config.separator.clone())
            .render(&response);
        if rendered.is_empty() {
            return Ok(format!(
                "No results found in the {} namespace '{}'.",
                stage, response.namespace
            ));
        }
        Ok(rendered)
    }

    // =========================================================================
    // MCP Tools
    // =========================================================================

    #[tool(
        name = "bytebell_agent",
        description = "Answer questions from the ByteBell knowledge base. Returns relevant documentation passages inside a <CONTEXT> tag, with instructions on how to use them in the answer."
    )]
    async fn bytebell_agent(
        &self,
        Parameters(params): Parameters<AgentParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!("bytebell_agent: query='{}'", params.query);

        Ok(text_result(self.agent_context(&params.query).await))
    }

    #[tool(
        name = "search_namespace",
        description = "Search a single ByteBell namespace. stage='meta' returns cross-referencing summaries (Meta Type, Source, Content); stage='base' returns detailed passages (Title, Source, Content)."
    )]
    async fn search_namespace(
        &self,
        Parameters(params): Parameters<SearchNamespaceParams>,
    ) -> Result<CallToolResult, McpError> {
        debug!(
            "search_namespace: query='{}', stage={}, include_code={:?}, top_k={:?}",
            params.query, params.stage, params.include_code, params.top_k
        );

        let text = match self.namespace_results(&params).await {
            Ok(text) => text,
            Err(e) => error_text(&params.query, &e),
        };
        Ok(text_result(text))
    }
}

// Implement ServerHandler for tool routing
#[tool_handler]
impl rmcp::ServerHandler for ByteBellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "ByteBell: grounding context from a curated knowledge base.\n\n\
                TOOLS:\n\
                - bytebell_agent: Full retrieval for a question (start here)\n\
                - search_namespace: Inspect one namespace ('meta' summaries or 'base' passages)"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_context() {
        let wrapped = wrap_context("SEI is fast");
        assert!(wrapped
            .starts_with("Here is the context from ByteBell\n<CONTEXT>SEI is fast</CONTEXT>"));
        assert!(wrapped.contains("<Instructions>\nUse as much resources"));
        assert!(wrapped.ends_with("</Instructions>"));
    }

    #[test]
    fn test_error_text() {
        let err = crate::McpError::InvalidParams("query must not be empty".into());
        assert_eq!(
            error_text("  ", &err),
            "Error processing query \"  \": Invalid parameters: query must not be empty"
        );
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.max_top_k, 100);
        assert_eq!(config.separator, "-----");
    }
}
