//! Voyage-compatible dense embedding provider
//!
//! # Endpoint Format
//!
//! - POST `{base_url}/v1/embeddings`
//! - Request: `{"model": "...", "input": ["text1", ...], "input_type": "query"}`
//! - Response: `{"data": [{"embedding": [...], "index": 0}, ...], ...}`
//!
//! # Example
//!
//! ```ignore
//! use bytebell_retrieval::embeddings::{VoyageConfig, VoyageEmbedder, EmbeddingPurpose};
//!
//! let embedder = VoyageEmbedder::new(VoyageConfig::voyage(api_key))?;
//! let vectors = embedder
//!     .embed_dense(vec!["what is sei".into()], EmbeddingPurpose::Query)
//!     .await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{DenseEmbedder, EmbeddingPurpose};
use crate::error::{Result, RetrievalError};
use crate::http::{HttpPolicy, RemoteClient};

const SERVICE: &str = "Voyage";

/// Default Voyage API base URL
pub const DEFAULT_VOYAGE_URL: &str = "https://api.voyageai.com/v1";

/// Default dense embedding model
pub const DEFAULT_VOYAGE_MODEL: &str = "voyage-3-large";

/// Configuration for the Voyage-compatible provider
#[derive(Clone)]
pub struct VoyageConfig {
    /// Base URL (with or without a trailing `/v1`)
    pub base_url: String,
    /// Bearer token (optional for self-hosted compatible servers)
    pub api_key: Option<String>,
    /// Embedding model identifier
    pub model: String,
    /// Timeout and retry policy
    pub http: HttpPolicy,
}

impl VoyageConfig {
    /// Config for the hosted Voyage API
    pub fn voyage(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_VOYAGE_URL.into(),
            api_key: Some(api_key.into()),
            model: DEFAULT_VOYAGE_MODEL.into(),
            http: HttpPolicy::default(),
        }
    }

    /// Point at a different base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the HTTP policy
    pub fn with_http(mut self, http: HttpPolicy) -> Self {
        self.http = http;
        self
    }
}

impl std::fmt::Debug for VoyageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoyageConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("http", &self.http)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    input_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

/// Dense embedder backed by a Voyage-compatible HTTP API
pub struct VoyageEmbedder {
    remote: RemoteClient,
    config: VoyageConfig,
    /// Dimension observed on the first successful response
    dimension: AtomicUsize,
}

impl VoyageEmbedder {
    pub fn new(config: VoyageConfig) -> Result<Self> {
        let remote = RemoteClient::new(SERVICE, config.http.clone())?;
        Ok(Self {
            remote,
            config,
            dimension: AtomicUsize::new(0),
        })
    }

    /// Dimension seen so far (0 before the first response)
    pub fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }

    fn embeddings_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/embeddings", base)
        } else {
            format!("{}/v1/embeddings", base)
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        self.config
            .api_key
            .as_ref()
            .map(|key| vec![("Authorization", format!("Bearer {}", key))])
            .unwrap_or_default()
    }

    fn check_dimension(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        let Some(first) = embeddings.first() else {
            return Ok(());
        };
        let dim = first.len();
        let cached = self.dimension.load(Ordering::Relaxed);
        if cached == 0 {
            self.dimension.store(dim, Ordering::Relaxed);
        } else if cached != dim {
            return Err(RetrievalError::DimensionMismatch {
                expected: cached,
                actual: dim,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for VoyageEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoyageEmbedder")
            .field("config", &self.config)
            .field("dimension", &self.dimension())
            .finish()
    }
}

#[async_trait]
impl DenseEmbedder for VoyageEmbedder {
    async fn embed_dense(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let expected = texts.len();
        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
            input_type: purpose.as_str(),
        };

        debug!(model = %self.config.model, count = expected, "Requesting dense embeddings");
        let response: EmbeddingsResponse = self
            .remote
            .post_json_with_retry(&self.embeddings_url(), &self.headers(), &body)
            .await?;

        let mut data = response.data;
        if data.len() != expected {
            return Err(RetrievalError::malformed(
                SERVICE,
                format!("expected {} embeddings, got {}", expected, data.len()),
            ));
        }
        data.sort_by_key(|d| d.index);

        let embeddings: Vec<Vec<f32>> = data.into_iter().map(|d| d.embedding).collect();
        self.check_dimension(&embeddings)?;
        Ok(embeddings)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
