//! Vector index access
//!
//! ```text
//! VectorIndex (trait)
//!     ├── PineconeIndex  - REST client for a Pinecone serverless index
//!     └── QdrantIndex    - gRPC client, one collection per namespace
//! ```
//!
//! [`VectorSearchClient`] sits on top of a backend and enforces the search
//! contract regardless of what the backend returns: at most `top_k` matches,
//! every score strictly above the threshold, and only matches that carry
//! passage text.

pub mod pinecone;
pub mod qdrant;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::filter::MetadataFilter;
use crate::hybrid::HybridVector;
use crate::schema::SearchMatch;

pub use pinecone::{PineconeIndex, PineconeIndexConfig};
pub use qdrant::{QdrantIndex, QdrantIndexConfig};

/// One similarity query against one namespace
#[derive(Debug, Clone, Copy)]
pub struct IndexQuery<'a> {
    pub namespace: &'a str,
    pub vector: &'a HybridVector,
    /// Already stripped of empty filters
    pub filter: Option<&'a MetadataFilter>,
    pub top_k: usize,
    pub score_threshold: f32,
}

/// Backend executing hybrid similarity queries
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Ranked matches in backend order
    async fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// Filtered, thresholded and capped search over a [`VectorIndex`]
#[derive(Clone)]
pub struct VectorSearchClient {
    index: Arc<dyn VectorIndex>,
}

impl VectorSearchClient {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self { index }
    }

    pub fn backend(&self) -> &'static str {
        self.index.backend()
    }

    /// Search `namespace`, returning at most `top_k` matches scored above
    /// `score_threshold`, in backend order
    pub async fn search(
        &self,
        namespace: &str,
        vector: &HybridVector,
        filter: Option<&MetadataFilter>,
        top_k: usize,
        score_threshold: f32,
    ) -> Result<Vec<SearchMatch>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let query = IndexQuery {
            namespace,
            vector,
            filter: filter.filter(|f| !f.is_empty()),
            top_k,
            score_threshold,
        };

        let raw = self.index.query(&query).await?;
        let returned = raw.len();

        let matches: Vec<SearchMatch> = raw
            .into_iter()
            .filter(|m| m.score > score_threshold && m.has_content())
            .take(top_k)
            .collect();

        debug!(
            backend = self.index.backend(),
            namespace,
            returned,
            kept = matches.len(),
            score_threshold,
            "Vector search complete"
        );

        Ok(matches)
    }
}

impl std::fmt::Debug for VectorSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorSearchClient")
            .field("backend", &self.index.backend())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::SparseVector;
    use crate::filter::datasource_filter;
    use serde_json::{json, Map, Value};
    use std::sync::Mutex;

    /// Returns canned matches and records whether a filter was sent
    struct CannedIndex {
        matches: Vec<SearchMatch>,
        saw_filter: Mutex<Vec<bool>>,
    }

    #[async_trait]
    impl VectorIndex for CannedIndex {
        async fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
            self.saw_filter.lock().unwrap().push(query.filter.is_some());
            Ok(self.matches.clone())
        }

        fn backend(&self) -> &'static str {
            "canned"
        }
    }

    fn text_match(id: &str, score: f32) -> SearchMatch {
        let mut metadata = Map::new();
        metadata.insert("text".into(), Value::String(format!("content {}", id)));
        SearchMatch::new(id, score, metadata)
    }

    fn vector() -> HybridVector {
        HybridVector {
            dense: vec![0.1, 0.2],
            sparse: SparseVector {
                indices: vec![1],
                values: vec![1.0],
            },
        }
    }

    fn client_with(matches: Vec<SearchMatch>) -> (VectorSearchClient, Arc<CannedIndex>) {
        let index = Arc::new(CannedIndex {
            matches,
            saw_filter: Mutex::new(Vec::new()),
        });
        (VectorSearchClient::new(index.clone()), index)
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let (client, _) = client_with(vec![
            text_match("a", 0.5),
            text_match("b", 0.1),
            text_match("c", 0.05),
        ]);

        let out = client.search("sei", &vector(), None, 10, 0.1).await.unwrap();
        let ids: Vec<_> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_result_count_capped_at_top_k() {
        let matches = (0..30)
            .map(|i| text_match(&format!("m{}", i), 0.9 - i as f32 * 0.01))
            .collect();
        let (client, _) = client_with(matches);

        let out = client.search("sei", &vector(), None, 20, 0.1).await.unwrap();
        assert_eq!(out.len(), 20);
        assert_eq!(out[0].id, "m0");
        assert!(out.iter().all(|m| m.score > 0.1));
    }

    #[tokio::test]
    async fn test_matches_without_text_are_dropped() {
        let mut chunk_only = Map::new();
        chunk_only.insert("chunk_content".into(), json!("body"));
        let mut bare = Map::new();
        bare.insert("title".into(), json!("no body"));

        let (client, _) = client_with(vec![
            SearchMatch::new("chunk", 0.6, chunk_only),
            SearchMatch::new("bare", 0.7, bare),
        ]);

        let out = client.search("sei", &vector(), None, 10, 0.1).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "chunk");
    }

    #[tokio::test]
    async fn test_matches_with_empty_text_are_dropped() {
        let (client, _) = client_with(vec![
            SearchMatch::new("empty", 0.9, json_map(json!({"text": ""}))),
            SearchMatch::new("null", 0.8, json_map(json!({"text": null}))),
            SearchMatch::new(
                "blank_both",
                0.7,
                json_map(json!({"text": "", "chunk_content": ""})),
            ),
            SearchMatch::new(
                "fallback",
                0.6,
                json_map(json!({"text": "", "chunk_content": "chunk body"})),
            ),
        ]);

        let out = client.search("sei", &vector(), None, 10, 0.1).await.unwrap();
        let ids: Vec<_> = out.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["fallback"]);
        assert_eq!(out[0].content().as_deref(), Some("chunk body"));
    }

    fn json_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_filter_is_not_sent() {
        let (client, index) = client_with(vec![]);

        let empty = MetadataFilter::and([]);
        client
            .search("sei", &vector(), Some(&empty), 5, 0.1)
            .await
            .unwrap();
        let real = datasource_filter(false);
        client
            .search("sei", &vector(), Some(&real), 5, 0.1)
            .await
            .unwrap();

        assert_eq!(*index.saw_filter.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_zero_top_k_skips_backend() {
        let (client, index) = client_with(vec![text_match("a", 0.9)]);

        let out = client.search("sei", &vector(), None, 0, 0.1).await.unwrap();
        assert!(out.is_empty());
        assert!(index.saw_filter.lock().unwrap().is_empty());
    }
}
