//! Pinecone inference sparse embedding provider
//!
//! - POST `{base_url}/embed`
//! - Headers: `Api-Key`, `X-Pinecone-API-Version`
//! - Request: `{"model": "...", "parameters": {"input_type": "query", "truncate": "END"},
//!   "inputs": [{"text": "..."}]}`
//! - Response: `{"data": [{"vector_type": "sparse", "sparse_indices": [...],
//!   "sparse_values": [...]}]}`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{EmbeddingPurpose, SparseEmbedder, SparseVector};
use crate::error::{Result, RetrievalError};
use crate::http::{join_url, HttpPolicy, RemoteClient};

const SERVICE: &str = "Pinecone inference";

/// Default Pinecone inference base URL
pub const DEFAULT_PINECONE_API_URL: &str = "https://api.pinecone.io";

/// Default sparse model
pub const DEFAULT_SPARSE_MODEL: &str = "pinecone-sparse-english-v0";

/// Pinecone REST API version header value
pub const PINECONE_API_VERSION: &str = "2025-01";

/// Configuration for the Pinecone sparse embedder
#[derive(Clone)]
pub struct PineconeSparseConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub api_version: String,
    pub http: HttpPolicy,
}

impl PineconeSparseConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_PINECONE_API_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_SPARSE_MODEL.into(),
            api_version: PINECONE_API_VERSION.into(),
            http: HttpPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_http(mut self, http: HttpPolicy) -> Self {
        self.http = http;
        self
    }
}

impl std::fmt::Debug for PineconeSparseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeSparseConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmbedParameters {
    input_type: &'static str,
    truncate: &'static str,
}

#[derive(Debug, Serialize)]
struct EmbedInput {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: EmbedParameters,
    inputs: Vec<EmbedInput>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    vector_type: Option<String>,
    #[serde(default)]
    sparse_indices: Vec<u32>,
    #[serde(default)]
    sparse_values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    vector_type: Option<String>,
    data: Vec<EmbedData>,
}

/// Sparse embedder backed by Pinecone's hosted inference API
pub struct PineconeSparseEmbedder {
    remote: RemoteClient,
    config: PineconeSparseConfig,
}

impl PineconeSparseEmbedder {
    pub fn new(config: PineconeSparseConfig) -> Result<Self> {
        let remote = RemoteClient::new(SERVICE, config.http.clone())?;
        Ok(Self { remote, config })
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Api-Key", self.config.api_key.clone()),
            ("X-Pinecone-API-Version", self.config.api_version.clone()),
        ]
    }
}

impl std::fmt::Debug for PineconeSparseEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeSparseEmbedder")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl SparseEmbedder for PineconeSparseEmbedder {
    async fn embed_sparse(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<SparseVector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let expected = texts.len();
        let body = EmbedRequest {
            model: &self.config.model,
            parameters: EmbedParameters {
                input_type: purpose.as_str(),
                truncate: "END",
            },
            inputs: texts.into_iter().map(|text| EmbedInput { text }).collect(),
        };

        debug!(model = %self.config.model, count = expected, "Requesting sparse embeddings");
        let response: EmbedResponse = self
            .remote
            .post_json_with_retry(&join_url(&self.config.base_url, "embed"), &self.headers(), &body)
            .await?;

        if response.data.len() != expected {
            return Err(RetrievalError::malformed(
                SERVICE,
                format!("expected {} embeddings, got {}", expected, response.data.len()),
            ));
        }

        let default_type = response.vector_type;
        response
            .data
            .into_iter()
            .map(|entry| {
                let vector_type = entry.vector_type.as_deref().or(default_type.as_deref());
                if vector_type != Some("sparse") {
                    return Err(RetrievalError::malformed(
                        SERVICE,
                        format!("expected sparse vector, got {:?}", vector_type),
                    ));
                }
                SparseVector::new(entry.sparse_indices, entry.sparse_values)
                    .map_err(|e| RetrievalError::malformed(SERVICE, e.to_string()))
            })
            .collect()
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
