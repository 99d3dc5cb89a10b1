//! Shared in-memory collaborators for pipeline tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytebell_retrieval::{
    ChatModel, ClassifierConfig, CompletionRequest, DenseEmbedder, EmbeddingPurpose,
    EnhancerConfig, HybridEmbedder, IndexQuery, NamespaceSearch, QueryClassifier, QueryEnhancer,
    Result, Retriever, RetrievalError, SearchMatch, SparseEmbedder, SparseVector, VectorIndex,
    VectorSearchClient,
};
use serde_json::{json, Map, Value};

pub const META_NAMESPACE: &str = "sei_meta";
pub const BASE_NAMESPACE: &str = "sei";

/// Dense embedder that records every text it embeds
#[derive(Default)]
pub struct RecordingDense {
    pub texts: Mutex<Vec<String>>,
}

#[async_trait]
impl DenseEmbedder for RecordingDense {
    async fn embed_dense(
        &self,
        texts: Vec<String>,
        _purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>> {
        self.texts.lock().unwrap().extend(texts.iter().cloned());
        Ok(texts.iter().map(|t| vec![t.len() as f32, 0.5]).collect())
    }

    fn model(&self) -> &str {
        "recording-dense"
    }
}

/// Dense embedder that panics, standing in for a collaborator bug
pub struct PanickingDense;

#[async_trait]
impl DenseEmbedder for PanickingDense {
    async fn embed_dense(
        &self,
        _texts: Vec<String>,
        _purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>> {
        panic!("dense embedder exploded");
    }

    fn model(&self) -> &str {
        "panicking-dense"
    }
}

pub struct ConstSparse;

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
                indices: vec![11, 42],
                values: vec![0.6, 0.4],
            })
            .collect())
    }

    fn model(&self) -> &str {
        "const-sparse"
    }
}

/// Scripted reply for a namespace
pub enum NamespaceReply {
    Matches(Vec<SearchMatch>),
    Fail(String),
}

/// Index returning scripted matches per namespace and recording each query
#[derive(Default)]
pub struct ScriptedIndex {
    replies: HashMap<String, NamespaceReply>,
    /// (namespace, filter JSON) per call, in call order
    pub calls: Mutex<Vec<(String, Option<Value>)>>,
}

impl ScriptedIndex {
    pub fn with(mut self, namespace: &str, reply: NamespaceReply) -> Self {
        self.replies.insert(namespace.to_string(), reply);
        self
    }

    pub fn namespaces_called(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(ns, _)| ns.clone())
            .collect()
    }

    pub fn filters(&self) -> Vec<Option<Value>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, f)| f.clone())
            .collect()
    }
}

#[async_trait]
impl VectorIndex for ScriptedIndex {
    async fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
        self.calls.lock().unwrap().push((
            query.namespace.to_string(),
            query.filter.map(|f| f.to_pinecone_json()),
        ));
        match self.replies.get(query.namespace) {
            Some(NamespaceReply::Matches(matches)) => Ok(matches.clone()),
            Some(NamespaceReply::Fail(message)) => Err(RetrievalError::Index(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    fn backend(&self) -> &'static str {
        "scripted"
    }
}

/// Completion model answering classifier and enhancer prompts separately
pub struct ScriptedChat {
    classify: Option<String>,
    enhance: Option<String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    /// `None` makes the corresponding call fail
    pub fn new(classify: Option<&str>, enhance: Option<&str>) -> Self {
        Self {
            classify: classify.map(str::to_string),
            enhance: enhance.map(str::to_string),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn enhancer_calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with("You are a search query optimizer"))
            .count()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let prompt = request.messages[0].content.clone();
        self.prompts.lock().unwrap().push(prompt.clone());

        let reply = if prompt.starts_with("You are a strict classifier") {
            &self.classify
        } else {
            &self.enhance
        };
        reply
            .clone()
            .ok_or_else(|| RetrievalError::Completion("upstream timed out".into()))
    }
}

/// Match carrying `text` and a few descriptive fields
pub fn text_match(id: &str, score: f32, text: &str) -> SearchMatch {
    let metadata: Map<String, Value> = match json!({
        "text": text,
        "title": format!("Title {}", id),
        "source": "docs.sei.io",
        "meta_type": format!("type-{}", id),
        "datasource": "WEBSITE",
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };
    SearchMatch::new(id, score, metadata)
}

/// Wired retriever plus handles on its collaborators
pub struct Harness {
    pub retriever: Arc<Retriever>,
    pub dense: Arc<RecordingDense>,
    pub index: Arc<ScriptedIndex>,
    pub chat: Arc<ScriptedChat>,
}

pub fn harness(index: ScriptedIndex, chat: ScriptedChat) -> Harness {
    let dense = Arc::new(RecordingDense::default());
    let index = Arc::new(index);
    let chat = Arc::new(chat);

    let embedder = HybridEmbedder::new(dense.clone(), Arc::new(ConstSparse));
    let retriever = build_retriever(embedder, index.clone(), chat.clone());

    Harness {
        retriever: Arc::new(retriever),
        dense,
        index,
        chat,
    }
}

pub fn build_retriever(
    embedder: HybridEmbedder,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
) -> Retriever {
    let client = VectorSearchClient::new(index);
    Retriever::new(
        QueryClassifier::new(chat.clone(), ClassifierConfig::default()),
        NamespaceSearch::meta(META_NAMESPACE, embedder.clone(), client.clone()),
        NamespaceSearch::base(BASE_NAMESPACE, embedder, client),
        QueryEnhancer::new(chat, EnhancerConfig::default()),
    )
}
