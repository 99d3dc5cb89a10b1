//! End-to-end retrieval behaviour with in-memory collaborators

mod common;

use std::sync::Arc;

use bytebell_retrieval::{HybridEmbedder, RetrievalOutcome, Stage, DIAGNOSTIC_MESSAGE};
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;

const SEI_QUERY: &str = "What is SEI blockchain and how does it work?";

fn sei_index() -> ScriptedIndex {
    ScriptedIndex::default()
        .with(
            META_NAMESPACE,
            NamespaceReply::Matches(vec![
                text_match("m1", 0.4, "SEI is a parallelized EVM layer 1"),
                text_match("m2", 0.2, "Twin-turbo consensus overview"),
            ]),
        )
        .with(
            BASE_NAMESPACE,
            NamespaceReply::Matches(vec![
                text_match("b1", 0.5, "SEI processes transactions in parallel."),
                text_match("b2", 0.3, "Twin-turbo consensus finalizes blocks fast."),
                text_match("b3", 0.15, "SEI is EVM compatible."),
            ]),
        )
}

// ============================================================================
// Full pipeline
// ============================================================================

#[tokio::test]
async fn test_sei_query_returns_base_contents_in_order() {
    let h = harness(
        sei_index(),
        ScriptedChat::new(Some("NO"), Some("SEI parallel EVM consensus architecture")),
    );

    let output = h.retriever.retrieve(SEI_QUERY).await;

    assert_eq!(
        output,
        "SEI processes transactions in parallel.\n\
         Twin-turbo consensus finalizes blocks fast.\n\
         SEI is EVM compatible."
    );
    assert_eq!(
        h.index.namespaces_called(),
        vec![META_NAMESPACE.to_string(), BASE_NAMESPACE.to_string()]
    );
    assert_eq!(
        *h.dense.texts.lock().unwrap(),
        vec![
            SEI_QUERY.to_string(),
            "SEI parallel EVM consensus architecture".to_string()
        ]
    );
}

#[tokio::test]
async fn test_enhancer_sees_meta_context() {
    let h = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));

    h.retriever.retrieve(SEI_QUERY).await;

    let prompts = h.chat.prompts.lock().unwrap();
    let rewrite = prompts
        .iter()
        .find(|p| p.starts_with("You are a search query optimizer"))
        .expect("enhancer was called");
    assert!(rewrite.contains("SEI is a parallelized EVM layer 1\nTwin-turbo consensus overview"));
}

#[tokio::test]
async fn test_same_filter_used_for_both_stages() {
    let h = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));

    h.retriever.retrieve(SEI_QUERY).await;

    let expected = Some(json!({"datasource": {"$in": ["PDF", "WEBSITE", "CUSTOM"]}}));
    assert_eq!(h.index.filters(), vec![expected.clone(), expected]);
}

// ============================================================================
// Code-intent filter
// ============================================================================

#[tokio::test]
async fn test_code_keyword_admits_github() {
    let h = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));

    h.retriever
        .retrieve("Show me a code example for SEI staking")
        .await;

    let filters = h.index.filters();
    assert_eq!(
        filters[0],
        Some(json!({"datasource": {"$in": ["PDF", "WEBSITE", "CUSTOM", "GITHUB"]}}))
    );
    // Keyword path answers without asking the model
    assert!(h
        .chat
        .prompts
        .lock()
        .unwrap()
        .iter()
        .all(|p| !p.starts_with("You are a strict classifier")));
}

#[tokio::test]
async fn test_failed_classification_excludes_github() {
    let h = harness(sei_index(), ScriptedChat::new(None, Some("rewritten")));

    h.retriever.retrieve(SEI_QUERY).await;

    assert_eq!(
        h.index.filters()[0],
        Some(json!({"datasource": {"$in": ["PDF", "WEBSITE", "CUSTOM"]}}))
    );
}

// ============================================================================
// Degradation
// ============================================================================

#[tokio::test]
async fn test_meta_failure_searches_base_with_original_query() {
    let index = ScriptedIndex::default()
        .with(META_NAMESPACE, NamespaceReply::Fail("network error".into()))
        .with(
            BASE_NAMESPACE,
            NamespaceReply::Matches(vec![text_match("b1", 0.5, "base passage")]),
        );
    let h = harness(index, ScriptedChat::new(Some("NO"), Some("should not be used")));

    let output = h.retriever.retrieve(SEI_QUERY).await;

    assert_eq!(output, "base passage");
    assert_eq!(h.chat.enhancer_calls(), 0);
    assert_eq!(
        *h.dense.texts.lock().unwrap(),
        vec![SEI_QUERY.to_string(), SEI_QUERY.to_string()]
    );
}

#[tokio::test]
async fn test_enhancer_failure_uses_fallback_query() {
    let h = harness(sei_index(), ScriptedChat::new(Some("NO"), None));

    let output = h.retriever.retrieve(SEI_QUERY).await;

    assert!(!output.is_empty());
    let texts = h.dense.texts.lock().unwrap();
    assert_eq!(texts[1], format!("{} type-m1 type-m2", SEI_QUERY));
}

#[tokio::test]
async fn test_base_failure_yields_empty_text() {
    let index = ScriptedIndex::default()
        .with(META_NAMESPACE, NamespaceReply::Matches(vec![]))
        .with(BASE_NAMESPACE, NamespaceReply::Fail("timeout".into()));
    let h = harness(index, ScriptedChat::new(Some("NO"), Some("rewritten")));

    let outcome = h.retriever.run(SEI_QUERY).await;
    assert_eq!(outcome, RetrievalOutcome::Context(String::new()));
}

#[tokio::test]
async fn test_panic_becomes_diagnostic() {
    let chat = Arc::new(ScriptedChat::new(Some("NO"), Some("rewritten")));
    let embedder = HybridEmbedder::new(Arc::new(PanickingDense), Arc::new(ConstSparse));
    let retriever = build_retriever(embedder, Arc::new(sei_index()), chat);

    let outcome = retriever.run(SEI_QUERY).await;
    assert_eq!(outcome, RetrievalOutcome::Diagnostic(DIAGNOSTIC_MESSAGE));
    assert_eq!(
        retriever.retrieve(SEI_QUERY).await,
        "Error retrieving information from knowledge base."
    );
}

// ============================================================================
// Determinism and sharing
// ============================================================================

#[tokio::test]
async fn test_identical_inputs_give_identical_output() {
    let first = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));
    let second = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));

    let a = first.retriever.retrieve(SEI_QUERY).await;
    let b = second.retriever.retrieve(SEI_QUERY).await;
    let c = first.retriever.retrieve(SEI_QUERY).await;

    assert_eq!(a, b);
    assert_eq!(a, c);
}

#[tokio::test]
async fn test_concurrent_retrievals_share_one_retriever() {
    let h = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let retriever = h.retriever.clone();
            tokio::spawn(async move { retriever.retrieve(SEI_QUERY).await })
        })
        .collect();

    for handle in handles {
        let output = handle.await.unwrap();
        assert_eq!(output.lines().count(), 3);
    }
}

// ============================================================================
// Single-stage search
// ============================================================================

#[tokio::test]
async fn test_search_stage_honours_overrides() {
    let h = harness(sei_index(), ScriptedChat::new(Some("NO"), Some("rewritten")));

    let response = h
        .retriever
        .search_stage(Stage::Base, "sei", Some(true), Some(2))
        .await;

    assert!(response.success);
    assert_eq!(response.stage, Stage::Base);
    assert_eq!(response.results.len(), 2);
    assert_eq!(
        h.index.filters()[0],
        Some(json!({"datasource": {"$in": ["PDF", "WEBSITE", "CUSTOM", "GITHUB"]}}))
    );
}
