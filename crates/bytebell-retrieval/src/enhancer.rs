//! Query rewriting with meta-stage context
//!
//! The meta namespace holds coarse summaries. Their text is handed to a
//! completion model, which rewrites the user's query in the vocabulary of the
//! knowledge base before the detailed base search. If the model is
//! unavailable or answers with nothing, the query is extended with the meta
//! type labels of the top results instead.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::completion::{ChatMessage, ChatModel, CompletionRequest};
use crate::error::{Result, RetrievalError};
use crate::schema::SearchResult;

/// Default rewrite model
pub const DEFAULT_ENHANCER_MODEL: &str = "google/gemini-2.0-flash-lite-001:nitro";

/// Meta results contributing labels to the fallback query
const FALLBACK_LABELS: usize = 3;

/// Keywords contributing to the prompt and the fallback query
const MAX_KEYWORDS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct EnhancerConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_ENHANCER_MODEL.into(),
            max_tokens: 1024,
            temperature: 0.1,
        }
    }
}

/// Rewrites queries using meta-stage results
#[derive(Clone)]
pub struct QueryEnhancer {
    model: Arc<dyn ChatModel>,
    config: EnhancerConfig,
}

impl QueryEnhancer {
    pub fn new(model: Arc<dyn ChatModel>, config: EnhancerConfig) -> Self {
        Self { model, config }
    }

    /// Rewrite `query`; never fails
    ///
    /// Returns `query` unchanged when there is no meta context.
    pub async fn enhance(
        &self,
        query: &str,
        meta_results: &[SearchResult],
        keywords: &[String],
    ) -> String {
        if meta_results.is_empty() {
            debug!("No meta context, keeping original query");
            return query.to_string();
        }

        match self.rewrite(query, meta_results, keywords).await {
            Ok(enhanced) => {
                info!(enhanced = %enhanced, "Model enhanced query");
                enhanced
            }
            Err(e) => {
                warn!("Query enhancement failed, using fallback: {}", e);
                fallback_query(query, meta_results, keywords)
            }
        }
    }

    async fn rewrite(
        &self,
        query: &str,
        meta_results: &[SearchResult],
        keywords: &[String],
    ) -> Result<String> {
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(rewrite_prompt(
                query,
                meta_results,
                keywords,
            ))],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let reply = self.model.complete(request).await?;
        if reply.trim().is_empty() {
            return Err(RetrievalError::malformed("Completion", "blank rewrite"));
        }
        Ok(reply)
    }
}

impl std::fmt::Debug for QueryEnhancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEnhancer")
            .field("config", &self.config)
            .finish()
    }
}

fn rewrite_prompt(query: &str, meta_results: &[SearchResult], keywords: &[String]) -> String {
    let meta_context = meta_results
        .iter()
        .map(|r| r.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    let top_keywords = keywords
        .iter()
        .take(MAX_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a search query optimizer. Analyze the meta context to enhance the original query for better document retrieval.

Original Query: \"{query}\"

Meta Context Found:
{meta_context}

Extracted Keywords: {top_keywords}

Task: Create an enhanced search query that:
1. Preserves the original intent
2. Incorporates relevant meta context
3. Uses domain-specific terminology found in meta
4. Optimizes for semantic similarity search

Respond with ONLY the enhanced query, no explanation:"
    )
}

/// `query`, then meta type labels of the top results, then keywords
pub fn fallback_query(query: &str, meta_results: &[SearchResult], keywords: &[String]) -> String {
    let labels = meta_results
        .iter()
        .take(FALLBACK_LABELS)
        .map(SearchResult::meta_type)
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let top_keywords = keywords
        .iter()
        .take(MAX_KEYWORDS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    format!("{} {} {}", query, labels, top_keywords)
        .trim()
        .to_string()
}
