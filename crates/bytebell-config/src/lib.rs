//! ByteBell Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.bytebell/config.toml`
//! - Local config: `.bytebell/config.toml` (in the working directory)
//! - CLI overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: defaults → global → local → CLI overrides.
//!
//! API keys are never stored in the file. Each remote service names the
//! environment variable that holds its key.

mod error;
mod loader;

pub use error::{ConfigError, FileOp};
pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for ByteBell.
///
/// Represents the fully merged configuration from all sources.
///
/// # Example TOML
///
/// ```toml
/// [index]
/// backend = "pinecone"
/// name = "bytebell-prod-v2"
/// meta_namespace = "sei_meta"
/// base_namespace = "sei"
///
/// [index.pinecone]
/// api_key_env = "PINECONE_API_KEY"
///
/// [completion]
/// api_key_env = "OPENROUTER_API_KEY"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ByteBellConfig {
    /// Vector index and namespace settings
    pub index: IndexConfig,

    /// Dense embedding service
    pub embedding: EmbeddingConfig,

    /// Sparse embedding service
    pub sparse: SparseConfig,

    /// Chat completion service used by the classifier and the enhancer
    pub completion: CompletionConfig,

    /// Shared HTTP policy for remote calls
    pub http: HttpConfig,

    pub logging: LoggingConfig,
}

/// Vector index backend selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Pinecone serverless index over REST (default)
    #[default]
    Pinecone,
    /// Qdrant over gRPC, one collection per namespace
    Qdrant,
}

impl std::fmt::Display for IndexBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pinecone => write!(f, "pinecone"),
            Self::Qdrant => write!(f, "qdrant"),
        }
    }
}

impl std::str::FromStr for IndexBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pinecone" => Ok(Self::Pinecone),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Vector index configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,

    /// Index name (Pinecone index, or Qdrant collection prefix)
    pub name: String,

    /// Namespace holding cross-referencing summaries
    pub meta_namespace: String,

    /// Namespace holding detailed content chunks
    pub base_namespace: String,

    /// Matches requested per stage
    pub top_k: usize,

    /// Matches must score strictly above this value
    pub score_threshold: f32,

    pub pinecone: PineconeSettings,

    pub qdrant: QdrantSettings,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            name: "bytebell-prod-v2".to_string(),
            meta_namespace: "sei_meta".to_string(),
            base_namespace: "sei".to_string(),
            top_k: 20,
            score_threshold: 0.1,
            pinecone: PineconeSettings::default(),
            qdrant: QdrantSettings::default(),
        }
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "index.name is required".to_string(),
            ));
        }
        if self.meta_namespace.is_empty() || self.base_namespace.is_empty() {
            return Err(ConfigError::ValidationError(
                "index.meta_namespace and index.base_namespace are required".to_string(),
            ));
        }
        if self.meta_namespace == self.base_namespace {
            return Err(ConfigError::NamespaceClash(self.meta_namespace.clone()));
        }
        if self.top_k == 0 {
            return Err(ConfigError::invalid_value(
                "index.top_k",
                "must be greater than 0",
            ));
        }
        if !(0.0..1.0).contains(&self.score_threshold) {
            return Err(ConfigError::invalid_value(
                "index.score_threshold",
                format!("{} is outside [0, 1)", self.score_threshold),
            ));
        }
        Ok(())
    }
}

/// Pinecone index settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeSettings {
    /// Environment variable name containing the API key
    pub api_key_env: String,

    /// Data-plane host; resolved through the control plane when unset
    pub host: Option<String>,

    pub control_plane_url: String,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key_env: "PINECONE_API_KEY".to_string(),
            host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
        }
    }
}

/// Qdrant connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QdrantSettings {
    /// Qdrant gRPC URL
    pub url: String,

    /// Environment variable name containing the API key (optional)
    pub api_key_env: Option<String>,
}

impl Default for QdrantSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            api_key_env: None,
        }
    }
}

/// Dense embedding service settings (Voyage-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// API base URL (e.g., "https://api.voyageai.com/v1")
    pub base_url: String,

    pub model: String,

    /// Environment variable name containing the API key
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.voyageai.com/v1".to_string(),
            model: "voyage-3-large".to_string(),
            api_key_env: "VOYAGE_API_KEY".to_string(),
        }
    }
}

/// Sparse embedding service settings (Pinecone inference).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SparseConfig {
    pub base_url: String,

    pub model: String,

    /// Value of the `X-Pinecone-API-Version` header
    pub api_version: String,

    /// Environment variable name containing the API key
    pub api_key_env: String,
}

impl Default for SparseConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.pinecone.io".to_string(),
            model: "pinecone-sparse-english-v0".to_string(),
            api_version: "2025-01".to_string(),
            api_key_env: "PINECONE_API_KEY".to_string(),
        }
    }
}

/// Chat completion settings (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    /// API base URL (e.g., "https://openrouter.ai/api/v1")
    pub base_url: String,

    /// Environment variable name containing the API key
    pub api_key_env: String,

    /// Model answering the code-intent question
    pub classifier_model: String,

    /// Model rewriting the query between stages
    pub enhancer_model: String,

    pub enhancer_max_tokens: u32,

    /// Sent as `HTTP-Referer` for provider attribution
    pub referer: Option<String>,

    /// Sent as `X-Title` for provider attribution
    pub title: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            classifier_model: "google/gemini-2.0-flash-lite-001".to_string(),
            enhancer_model: "google/gemini-2.0-flash-lite-001:nitro".to_string(),
            enhancer_max_tokens: 1024,
            referer: None,
            title: None,
        }
    }
}

/// HTTP policy shared by every remote client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retry attempts for idempotent requests
    pub max_retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 1,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,

    /// Log file path (optional)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// CLI overrides for configuration values.
///
/// Used to apply command-line arguments over file-based config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub index_backend: Option<IndexBackend>,

    pub index_name: Option<String>,

    pub qdrant_url: Option<String>,

    pub top_k: Option<usize>,

    pub log_level: Option<String>,

    pub log_file: Option<PathBuf>,
}

impl ByteBellConfig {
    /// Apply CLI overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(backend) = overrides.index_backend {
            self.index.backend = backend;
        }

        if let Some(ref name) = overrides.index_name {
            self.index.name = name.clone();
        }

        if let Some(ref url) = overrides.qdrant_url {
            self.index.qdrant.url = url.clone();
        }

        if let Some(top_k) = overrides.top_k {
            self.index.top_k = top_k;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }

        if let Some(ref file) = overrides.log_file {
            self.logging.file = Some(file.clone());
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.index.validate()?;

        let models = [
            ("embedding.model", &self.embedding.model),
            ("sparse.model", &self.sparse.model),
            ("completion.classifier_model", &self.completion.classifier_model),
            ("completion.enhancer_model", &self.completion.enhancer_model),
        ];
        for (key, model) in models {
            if model.trim().is_empty() {
                return Err(ConfigError::invalid_value(key, "model name is required"));
            }
        }

        if self.completion.enhancer_max_tokens == 0 {
            return Err(ConfigError::invalid_value(
                "completion.enhancer_max_tokens",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Read an API key from the named environment variable.
///
/// Unset and blank variables are both reported as missing.
pub fn api_key_from_env(service: &str, env: &str) -> Result<String, ConfigError> {
    match std::env::var(env) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::missing_api_key(service, env)),
    }
}
