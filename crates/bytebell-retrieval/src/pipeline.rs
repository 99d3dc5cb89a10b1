//! Two-phase retrieval orchestration
//!
//! ```text
//! query ─► QueryClassifier ─► datasource filter
//!            │
//!            ▼
//!        meta stage(query, filter) ─► QueryEnhancer ─► base stage(enhanced, filter)
//!                                                          │
//!                                                          ▼
//!                                           base contents joined with "\n"
//! ```
//!
//! [`Retriever::retrieve`] always produces text. Stage failures degrade
//! (no meta context keeps the original query, no base results yields an
//! empty string) and a panic anywhere in the sequence is turned into
//! [`DIAGNOSTIC_MESSAGE`].

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use tracing::{error, info};

use crate::classifier::QueryClassifier;
use crate::enhancer::QueryEnhancer;
use crate::filter::datasource_filter;
use crate::schema::{RetrievalResponse, Stage};
use crate::stage::{NamespaceSearch, SearchParams};

/// Text returned when retrieval could not complete
pub const DIAGNOSTIC_MESSAGE: &str = "Error retrieving information from knowledge base.";

/// Result of one orchestrated retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrievalOutcome {
    /// Joined base-stage contents (possibly empty)
    Context(String),
    /// Fixed diagnostic for an aborted retrieval
    Diagnostic(&'static str),
}

impl RetrievalOutcome {
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, RetrievalOutcome::Diagnostic(_))
    }

    pub fn into_text(self) -> String {
        match self {
            RetrievalOutcome::Context(text) => text,
            RetrievalOutcome::Diagnostic(message) => message.to_string(),
        }
    }
}

/// Per-phase search parameters
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RetrieverConfig {
    pub meta: SearchParams,
    pub base: SearchParams,
}

/// Two-phase meta→base retriever
///
/// Holds no per-call state; share one instance behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Retriever {
    classifier: QueryClassifier,
    meta: NamespaceSearch,
    base: NamespaceSearch,
    enhancer: QueryEnhancer,
    config: RetrieverConfig,
}

impl Retriever {
    pub fn new(
        classifier: QueryClassifier,
        meta: NamespaceSearch,
        base: NamespaceSearch,
        enhancer: QueryEnhancer,
    ) -> Self {
        Self {
            classifier,
            meta,
            base,
            enhancer,
            config: RetrieverConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrieverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Retrieve grounding text for `query`; never fails
    pub async fn retrieve(&self, query: &str) -> String {
        self.run(query).await.into_text()
    }

    /// Retrieve, reporting whether the sequence completed
    pub async fn run(&self, query: &str) -> RetrievalOutcome {
        match AssertUnwindSafe(self.pipeline(query)).catch_unwind().await {
            Ok(context) => RetrievalOutcome::Context(context),
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Retrieval aborted: {}", reason);
                RetrievalOutcome::Diagnostic(DIAGNOSTIC_MESSAGE)
            }
        }
    }

    async fn pipeline(&self, query: &str) -> String {
        let include_code = self.classifier.include_code(query).await;
        let filter = datasource_filter(include_code);

        let meta = self.meta.search(query, Some(&filter), self.config.meta).await;
        info!(
            success = meta.success,
            results = meta.results.len(),
            "Meta stage finished"
        );

        let keywords: Vec<String> = Vec::new();
        let enhanced = self.enhancer.enhance(query, &meta.results, &keywords).await;

        let base = self
            .base
            .search(&enhanced, Some(&filter), self.config.base)
            .await;
        info!(
            success = base.success,
            results = base.results.len(),
            "Base stage finished"
        );

        base.results
            .into_iter()
            .map(|r| r.content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a single stage with an explicit code decision
    ///
    /// When `include_code` is `None` the classifier decides.
    pub async fn search_stage(
        &self,
        stage: Stage,
        query: &str,
        include_code: Option<bool>,
        top_k: Option<usize>,
    ) -> RetrievalResponse {
        let include_code = match include_code {
            Some(flag) => flag,
            None => self.classifier.include_code(query).await,
        };
        let filter = datasource_filter(include_code);

        let (search, mut params) = match stage {
            Stage::Meta => (&self.meta, self.config.meta),
            Stage::Base => (&self.base, self.config.base),
        };
        if let Some(top_k) = top_k {
            params.top_k = top_k;
        }

        search.search(query, Some(&filter), params).await
    }
}
