//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.bytebell/config.toml`
//! 2. Local config: `.bytebell/config.toml` (in the working directory)
//! 3. CLI overrides
//!
//! Later sources override earlier ones. A value in a later file only wins
//! when it differs from the built-in default, so partial files compose.

use crate::error::ConfigError;
use crate::{
    ByteBellConfig, CompletionConfig, ConfigOverrides, EmbeddingConfig, HttpConfig, IndexConfig,
    LoggingConfig, PineconeSettings, QdrantSettings, SparseConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global and local configuration directory name.
const CONFIG_DIR: &str = ".bytebell";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.bytebell`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<ByteBellConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.bytebell`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    pub fn local_config_path(&self, root: &Path) -> PathBuf {
        root.join(CONFIG_DIR).join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a directory with optional CLI overrides.
    ///
    /// Merges config in order: global → local → overrides.
    pub fn load(
        &mut self,
        root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ByteBellConfig, ConfigError> {
        let mut config = ByteBellConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load an explicit config file over the defaults, skipping global and local lookup.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<ByteBellConfig, ConfigError> {
        debug!("Loading config from {:?}", path);
        let mut config = merge_configs(ByteBellConfig::default(), load_config_file(path)?);

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<ByteBellConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration.
    pub fn load_local(&self, root: &Path) -> Result<Option<ByteBellConfig>, ConfigError> {
        let local_path = self.local_config_path(root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    pub fn save_global(&self, config: &ByteBellConfig) -> Result<(), ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        save_config_file(&global_dir.join(CONFIG_FILE_NAME), config)
    }

    pub fn save_local(&self, root: &Path, config: &ByteBellConfig) -> Result<(), ConfigError> {
        save_config_file(&self.local_config_path(root), config)
    }

    /// Initialize the global configuration directory.
    ///
    /// Creates `~/.bytebell/config.toml` with default configuration. An
    /// existing file is left untouched.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let Some(ref global_dir) = self.global_config_dir else {
            return Err(ConfigError::NoHomeDir);
        };

        init_config_dir(global_dir)
    }

    /// Initialize local configuration under `root`.
    pub fn init_local(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        init_config_dir(&root.join(CONFIG_DIR))
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

fn init_config_dir(dir: &Path) -> Result<PathBuf, ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }

    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        save_config_file(&config_path, &ByteBellConfig::default())?;
    }

    Ok(config_path)
}

fn load_config_file(path: &Path) -> Result<ByteBellConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

fn save_config_file(path: &Path, config: &ByteBellConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Overlay wins when it differs from the default, otherwise base is kept.
fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Merge two configurations, with `overlay` taking precedence.
fn merge_configs(base: ByteBellConfig, overlay: ByteBellConfig) -> ByteBellConfig {
    ByteBellConfig {
        index: merge_index(base.index, overlay.index),
        embedding: merge_embedding(base.embedding, overlay.embedding),
        sparse: merge_sparse(base.sparse, overlay.sparse),
        completion: merge_completion(base.completion, overlay.completion),
        http: merge_http(base.http, overlay.http),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_index(base: IndexConfig, overlay: IndexConfig) -> IndexConfig {
    let d = IndexConfig::default();
    IndexConfig {
        backend: pick(base.backend, overlay.backend, d.backend),
        name: pick(base.name, overlay.name, d.name),
        meta_namespace: pick(base.meta_namespace, overlay.meta_namespace, d.meta_namespace),
        base_namespace: pick(base.base_namespace, overlay.base_namespace, d.base_namespace),
        top_k: pick(base.top_k, overlay.top_k, d.top_k),
        score_threshold: pick(base.score_threshold, overlay.score_threshold, d.score_threshold),
        pinecone: merge_pinecone(base.pinecone, overlay.pinecone),
        qdrant: merge_qdrant(base.qdrant, overlay.qdrant),
    }
}

fn merge_pinecone(base: PineconeSettings, overlay: PineconeSettings) -> PineconeSettings {
    let d = PineconeSettings::default();
    PineconeSettings {
        api_key_env: pick(base.api_key_env, overlay.api_key_env, d.api_key_env),
        host: overlay.host.or(base.host),
        control_plane_url: pick(
            base.control_plane_url,
            overlay.control_plane_url,
            d.control_plane_url,
        ),
    }
}

fn merge_qdrant(base: QdrantSettings, overlay: QdrantSettings) -> QdrantSettings {
    let d = QdrantSettings::default();
    QdrantSettings {
        url: pick(base.url, overlay.url, d.url),
        api_key_env: overlay.api_key_env.or(base.api_key_env),
    }
}

fn merge_embedding(base: EmbeddingConfig, overlay: EmbeddingConfig) -> EmbeddingConfig {
    let d = EmbeddingConfig::default();
    EmbeddingConfig {
        base_url: pick(base.base_url, overlay.base_url, d.base_url),
        model: pick(base.model, overlay.model, d.model),
        api_key_env: pick(base.api_key_env, overlay.api_key_env, d.api_key_env),
    }
}

fn merge_sparse(base: SparseConfig, overlay: SparseConfig) -> SparseConfig {
    let d = SparseConfig::default();
    SparseConfig {
        base_url: pick(base.base_url, overlay.base_url, d.base_url),
        model: pick(base.model, overlay.model, d.model),
        api_version: pick(base.api_version, overlay.api_version, d.api_version),
        api_key_env: pick(base.api_key_env, overlay.api_key_env, d.api_key_env),
    }
}

fn merge_completion(base: CompletionConfig, overlay: CompletionConfig) -> CompletionConfig {
    let d = CompletionConfig::default();
    CompletionConfig {
        base_url: pick(base.base_url, overlay.base_url, d.base_url),
        api_key_env: pick(base.api_key_env, overlay.api_key_env, d.api_key_env),
        classifier_model: pick(
            base.classifier_model,
            overlay.classifier_model,
            d.classifier_model,
        ),
        enhancer_model: pick(base.enhancer_model, overlay.enhancer_model, d.enhancer_model),
        enhancer_max_tokens: pick(
            base.enhancer_max_tokens,
            overlay.enhancer_max_tokens,
            d.enhancer_max_tokens,
        ),
        referer: overlay.referer.or(base.referer),
        title: overlay.title.or(base.title),
    }
}

fn merge_http(base: HttpConfig, overlay: HttpConfig) -> HttpConfig {
    let d = HttpConfig::default();
    HttpConfig {
        timeout_secs: pick(base.timeout_secs, overlay.timeout_secs, d.timeout_secs),
        max_retries: pick(base.max_retries, overlay.max_retries, d.max_retries),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let d = LoggingConfig::default();
    LoggingConfig {
        level: pick(base.level, overlay.level, d.level),
        format: pick(base.format, overlay.format, d.format),
        file: overlay.file.or(base.file),
    }
}
