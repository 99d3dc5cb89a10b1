//! Namespace search stage
//!
//! One stage = embed the stage query, search one namespace with the shared
//! filter, then normalize matches with the stage's transform. The meta and
//! base stages are the same [`NamespaceSearch`] with a different namespace
//! and transform.
//!
//! Failures never escape: they become a [`RetrievalResponse`] with
//! `success = false` and the error text.

use tracing::{info, warn};

use crate::embeddings::EmbeddingPurpose;
use crate::error::Result;
use crate::filter::MetadataFilter;
use crate::hybrid::HybridEmbedder;
use crate::index::VectorSearchClient;
use crate::schema::{RetrievalResponse, SearchMatch, SearchResult, Stage};

/// Default matches per stage
pub const DEFAULT_TOP_K: usize = 20;

/// Default minimum similarity score (exclusive)
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.1;

/// Maps a raw index match to a stage result
pub type Transform = fn(SearchMatch) -> SearchResult;

/// Search parameters for one stage call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub top_k: usize,
    pub score_threshold: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

/// Hybrid search over a single namespace
#[derive(Debug, Clone)]
pub struct NamespaceSearch {
    stage: Stage,
    namespace: String,
    embedder: HybridEmbedder,
    client: VectorSearchClient,
    transform: Transform,
}

impl NamespaceSearch {
    pub fn new(
        stage: Stage,
        namespace: impl Into<String>,
        embedder: HybridEmbedder,
        client: VectorSearchClient,
        transform: Transform,
    ) -> Self {
        Self {
            stage,
            namespace: namespace.into(),
            embedder,
            client,
            transform,
        }
    }

    /// Meta stage: coarse summaries normalized with [`SearchResult::from_meta_match`]
    pub fn meta(
        namespace: impl Into<String>,
        embedder: HybridEmbedder,
        client: VectorSearchClient,
    ) -> Self {
        Self::new(
            Stage::Meta,
            namespace,
            embedder,
            client,
            SearchResult::from_meta_match,
        )
    }

    /// Base stage: detailed passages normalized with [`SearchResult::from_base_match`]
    pub fn base(
        namespace: impl Into<String>,
        embedder: HybridEmbedder,
        client: VectorSearchClient,
    ) -> Self {
        Self::new(
            Stage::Base,
            namespace,
            embedder,
            client,
            SearchResult::from_base_match,
        )
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run the stage once; never fails
    pub async fn search(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        params: SearchParams,
    ) -> RetrievalResponse {
        match self.try_search(query, filter, params).await {
            Ok(results) => {
                info!(
                    stage = %self.stage,
                    namespace = %self.namespace,
                    results = results.len(),
                    "Stage search complete"
                );
                RetrievalResponse::succeeded(query, &self.namespace, self.stage, results)
            }
            Err(e) => {
                warn!(
                    stage = %self.stage,
                    namespace = %self.namespace,
                    "Stage search failed: {}",
                    e
                );
                RetrievalResponse::failed(query, &self.namespace, self.stage, e.to_string())
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        params: SearchParams,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(query, EmbeddingPurpose::Query).await?;
        let matches = self
            .client
            .search(
                &self.namespace,
                &vector,
                filter,
                params.top_k,
                params.score_threshold,
            )
            .await?;
        Ok(matches.into_iter().map(self.transform).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{DenseEmbedder, SparseEmbedder, SparseVector};
    use crate::error::RetrievalError;
    use crate::index::{IndexQuery, VectorIndex};
    use async_trait::async_trait;
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    struct ConstDense;

    #[async_trait]
    impl DenseEmbedder for ConstDense {
        async fn embed_dense(
            &self,
            texts: Vec<String>,
            _purpose: EmbeddingPurpose,
        ) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn model(&self) -> &str {
            "const"
        }
    }

    struct ConstSparse;

    #[async_trait]
    impl SparseEmbedder for ConstSparse {
        async fn embed_sparse(
            &self,
            texts: Vec<String>,
            _purpose: EmbeddingPurpose,
        ) -> Result<Vec<SparseVector>> {
            Ok(texts
                .iter()
                .map(|_| SparseVector {
                    indices: vec![0],
                    values: vec![1.0],
                })
                .collect())
        }

        fn model(&self) -> &str {
            "const"
        }
    }

    struct Fixed(Vec<(f32, Value)>);

    #[async_trait]
    impl VectorIndex for Fixed {
        async fn query(&self, _query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, (score, metadata))| {
                    let metadata: Map<String, Value> =
                        metadata.as_object().cloned().unwrap_or_default();
                    SearchMatch::new(format!("id-{}", i), *score, metadata)
                })
                .collect())
        }

        fn backend(&self) -> &'static str {
            "fixed"
        }
    }

    struct Broken;

    #[async_trait]
    impl VectorIndex for Broken {
        async fn query(&self, _query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
            Err(RetrievalError::Index("namespace not found".into()))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    fn embedder() -> HybridEmbedder {
        HybridEmbedder::new(Arc::new(ConstDense), Arc::new(ConstSparse))
    }

    #[tokio::test]
    async fn test_meta_stage_uses_meta_transform() {
        let index = Fixed(vec![(
            0.4,
            json!({"text": "overview", "meta_type": "protocol", "datasource": "WEBSITE"}),
        )]);
        let stage = NamespaceSearch::meta(
            "sei_meta",
            embedder(),
            VectorSearchClient::new(Arc::new(index)),
        );

        let response = stage.search("what is sei", None, SearchParams::default()).await;
        assert!(response.success);
        assert_eq!(response.stage, Stage::Meta);
        assert_eq!(response.namespace, "sei_meta");
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].meta_type(), "protocol");
    }

    #[tokio::test]
    async fn test_base_stage_applies_threshold() {
        let index = Fixed(vec![
            (0.5, json!({"text": "first", "title": "A"})),
            (0.15, json!({"text": "third", "title": "C"})),
            (0.05, json!({"text": "dropped"})),
        ]);
        let stage = NamespaceSearch::base(
            "sei",
            embedder(),
            VectorSearchClient::new(Arc::new(index)),
        );

        let response = stage
            .search(
                "sei",
                None,
                SearchParams {
                    top_k: 20,
                    score_threshold: 0.1,
                },
            )
            .await;
        let contents: Vec<_> = response
            .results
            .iter()
            .map(|r| r.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_failure_becomes_failed_response() {
        let stage = NamespaceSearch::base(
            "sei",
            embedder(),
            VectorSearchClient::new(Arc::new(Broken)),
        );

        let response = stage.search("sei", None, SearchParams::default()).await;
        assert!(!response.success);
        assert!(response.results.is_empty());
        assert_eq!(response.stage, Stage::Base);
        assert!(response
            .error
            .as_deref()
            .is_some_and(|e| e.contains("namespace not found")));
    }
}
