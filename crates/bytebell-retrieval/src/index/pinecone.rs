//! Pinecone serverless index backend
//!
//! Queries go to the index's data-plane host:
//!
//! - POST `https://{host}/query`
//! - Request: `{"namespace", "vector", "sparseVector", "filter", "topK",
//!   "includeValues": false, "includeMetadata": true}`
//! - Response: `{"matches": [{"id", "score", "metadata"}], "namespace"}`
//!
//! When no host is configured it is looked up once through the control
//! plane (`GET {control_plane_url}/indexes/{index_name}`) and cached.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{IndexQuery, VectorIndex};
use crate::embeddings::sparse::PINECONE_API_VERSION;
use crate::error::{Result, RetrievalError};
use crate::http::{join_url, HttpPolicy, RemoteClient};
use crate::schema::SearchMatch;

const SERVICE: &str = "Pinecone";

/// Default Pinecone control-plane URL
pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";

/// Default index name
pub const DEFAULT_INDEX_NAME: &str = "bytebell-prod-v2";

/// Connection settings for a Pinecone index
#[derive(Clone)]
pub struct PineconeIndexConfig {
    pub api_key: String,
    pub index_name: String,
    /// Data-plane host; resolved through the control plane when `None`
    pub host: Option<String>,
    pub control_plane_url: String,
    pub api_version: String,
    pub http: HttpPolicy,
}

impl PineconeIndexConfig {
    pub fn new(api_key: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            index_name: index_name.into(),
            host: None,
            control_plane_url: DEFAULT_CONTROL_PLANE_URL.into(),
            api_version: PINECONE_API_VERSION.into(),
            http: HttpPolicy::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_control_plane_url(mut self, url: impl Into<String>) -> Self {
        self.control_plane_url = url.into();
        self
    }

    pub fn with_http(mut self, http: HttpPolicy) -> Self {
        self.http = http;
        self
    }
}

impl std::fmt::Debug for PineconeIndexConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndexConfig")
            .field("api_key", &"[REDACTED]")
            .field("index_name", &self.index_name)
            .field("host", &self.host)
            .field("control_plane_url", &self.control_plane_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct SparseValues<'a> {
    indices: &'a [u32],
    values: &'a [f32],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    #[serde(skip_serializing_if = "Option::is_none")]
    sparse_vector: Option<SparseValues<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct DescribeIndexResponse {
    host: String,
}

/// Pinecone index accessed over REST
pub struct PineconeIndex {
    remote: RemoteClient,
    config: PineconeIndexConfig,
    host: OnceCell<String>,
}

impl PineconeIndex {
    pub fn new(config: PineconeIndexConfig) -> Result<Self> {
        let remote = RemoteClient::new(SERVICE, config.http.clone())?;
        let host = match config.host.as_deref() {
            Some(h) => OnceCell::new_with(Some(normalize_host(h))),
            None => OnceCell::new(),
        };
        Ok(Self {
            remote,
            config,
            host,
        })
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Api-Key", self.config.api_key.clone()),
            ("X-Pinecone-API-Version", self.config.api_version.clone()),
        ]
    }

    /// Data-plane base URL, resolved on first use
    async fn host(&self) -> Result<&str> {
        let host = self
            .host
            .get_or_try_init(|| async {
                let url = join_url(
                    &self.config.control_plane_url,
                    &format!("indexes/{}", self.config.index_name),
                );
                let description: DescribeIndexResponse = self
                    .remote
                    .get_json_with_retry(&url, &self.headers())
                    .await?;
                info!(
                    index = %self.config.index_name,
                    host = %description.host,
                    "Resolved Pinecone index host"
                );
                Ok::<_, RetrievalError>(normalize_host(&description.host))
            })
            .await?;
        Ok(host.as_str())
    }
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("config", &self.config)
            .field("host", &self.host.get())
            .finish()
    }
}

fn normalize_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, query: &IndexQuery<'_>) -> Result<Vec<SearchMatch>> {
        let host = self.host().await?;
        let sparse = &query.vector.sparse;

        let body = QueryRequest {
            namespace: query.namespace,
            vector: &query.vector.dense,
            sparse_vector: (!sparse.is_empty()).then(|| SparseValues {
                indices: &sparse.indices,
                values: &sparse.values,
            }),
            filter: query.filter.map(|f| f.to_pinecone_json()),
            top_k: query.top_k,
            include_values: false,
            include_metadata: true,
        };

        debug!(namespace = query.namespace, top_k = query.top_k, "Querying Pinecone");
        let response: QueryResponse = self
            .remote
            .post_json_with_retry(&join_url(host, "query"), &self.headers(), &body)
            .await
            .map_err(|e| {
                if e.is_retryable() {
                    e
                } else {
                    RetrievalError::Index(e.to_string())
                }
            })?;

        Ok(response
            .matches
            .into_iter()
            .map(|m| SearchMatch::new(m.id, m.score, m.metadata.unwrap_or_default()))
            .collect())
    }

    fn backend(&self) -> &'static str {
        "pinecone"
    }
}
