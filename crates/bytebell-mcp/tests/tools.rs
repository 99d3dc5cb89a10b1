//! Tool behaviour against an in-memory knowledge base

use std::sync::Arc;

use async_trait::async_trait;
use bytebell_mcp::tools::SearchNamespaceParams;
use bytebell_mcp::{wrap_context, ByteBellServer, McpError, ServerConfig};
use bytebell_retrieval::{
    ChatModel, ClassifierConfig, CompletionRequest, DenseEmbedder, EmbeddingPurpose,
    EnhancerConfig, HybridEmbedder, IndexQuery, NamespaceSearch, QueryClassifier, QueryEnhancer,
    Result, Retriever, RetrievalError, SearchMatch, SparseEmbedder, SparseVector, VectorIndex,
    VectorSearchClient,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

struct FixedDense;

#[async_trait]
impl DenseEmbedder for FixedDense {
    async fn embed_dense(
        &self,
        texts: Vec<String>,
        _purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
    }

    fn model(&self) -> &str {
        "fixed-dense"
    }
}

struct FixedSparse;

#[async_trait]
impl SparseEmbedder for FixedSparse {
    async fn embed_sparse(
        &self,
        texts: Vec<String>,
        _purpose: EmbeddingPurpose,
    ) -> Result<Vec<SparseVector>> {
        Ok(texts
            .iter()
            .map(|_| SparseVector {
                indices: vec![3],
                values: vec![1.0],
            })
            .collect())
    }

    fn model(&self) -> &str {
        "fixed-sparse"
    }
}

/// Meta and base namespaces with one passage each; "broken" base fails
struct TwoNamespaces {
    base_fails: bool,
}

fn passage(id: &str, text: &str) -> SearchMatch {
    let metadata = match json!({
        "text": text,
        "title": "Parallel execution",
        "source": "docs.sei.io",
        "meta_type": "overview",
        "datasource": "WEBSITE",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    SearchMatch::new(id, 0.8, metadata)
}

#[async_trait]
impl VectorIndex for TwoNamespaces {
    async fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
        match query.namespace {
            "kb_meta" => Ok(vec![passage("m1", "SEI summary")]),
            "kb" if self.base_fails => Err(RetrievalError::Index("timeout".into())),
            "kb" => Ok(vec![passage("b1", "SEI executes transactions in parallel")]),
            _ => Ok(Vec::new()),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

struct EchoChat;

#[async_trait]
impl ChatModel for EchoChat {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        if request.messages[0].content.starts_with("You are a strict classifier") {
            Ok("NO".to_string())
        } else {
            Ok("SEI parallel execution".to_string())
        }
    }
}

fn server(base_fails: bool) -> ByteBellServer {
    let embedder = HybridEmbedder::new(Arc::new(FixedDense), Arc::new(FixedSparse));
    let client = VectorSearchClient::new(Arc::new(TwoNamespaces { base_fails }));
    let chat: Arc<dyn ChatModel> = Arc::new(EchoChat);
    let retriever = Retriever::new(
        QueryClassifier::new(chat.clone(), ClassifierConfig::default()),
        NamespaceSearch::meta("kb_meta", embedder.clone(), client.clone()),
        NamespaceSearch::base("kb", embedder, client),
        QueryEnhancer::new(chat, EnhancerConfig::default()),
    );
    ByteBellServer::new(Arc::new(retriever), ServerConfig::default())
}

fn params(query: &str, stage: &str, top_k: Option<usize>) -> SearchNamespaceParams {
    SearchNamespaceParams {
        query: query.to_string(),
        stage: stage.to_string(),
        include_code: None,
        top_k,
    }
}

// ============================================================================
// bytebell_agent
// ============================================================================

#[tokio::test]
async fn test_agent_wraps_base_context() {
    let text = server(false).agent_context("How does SEI work?").await;
    assert_eq!(text, wrap_context("SEI executes transactions in parallel"));
}

#[tokio::test]
async fn test_agent_base_failure_wraps_empty_context() {
    let text = server(true).agent_context("How does SEI work?").await;
    assert!(text.contains("<CONTEXT></CONTEXT>"));
}

#[tokio::test]
async fn test_agent_forwards_blank_query_to_retrieval() {
    let text = server(false).agent_context("   ").await;
    assert_eq!(text, wrap_context("SEI executes transactions in parallel"));
}

// ============================================================================
// search_namespace
// ============================================================================

#[tokio::test]
async fn test_search_meta_formats_meta_fields() {
    let text = server(false)
        .namespace_results(&params("SEI", "meta", None))
        .await
        .unwrap();
    assert_eq!(
        text,
        "Meta Type: overview\nSource: WEBSITE\nContent: SEI summary\n-----"
    );
}

#[tokio::test]
async fn test_search_base_formats_base_fields() {
    let text = server(false)
        .namespace_results(&params("SEI", "BASE", Some(5)))
        .await
        .unwrap();
    assert_eq!(
        text,
        "Title: Parallel execution\nSource: docs.sei.io\n\
         Content: SEI executes transactions in parallel\n-----"
    );
}

#[tokio::test]
async fn test_search_unknown_stage() {
    let err = server(false)
        .namespace_results(&params("SEI", "middle", None))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown stage 'middle'"));
}

#[tokio::test]
async fn test_search_top_k_bounds() {
    let s = server(false);
    assert!(s.namespace_results(&params("SEI", "base", Some(0))).await.is_err());
    assert!(s
        .namespace_results(&params("SEI", "base", Some(101)))
        .await
        .is_err());
}

#[tokio::test]
async fn test_search_failure_is_reported() {
    let err = server(true)
        .namespace_results(&params("SEI", "base", None))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::SearchError(ref m) if m.contains("timeout")));
}
