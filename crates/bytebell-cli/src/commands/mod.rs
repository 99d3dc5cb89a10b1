//! CLI command implementations

pub mod config;
pub mod mcp;
pub mod retrieve;
pub mod search;

use std::sync::Arc;

use anyhow::{Context, Result};
use bytebell_config::{api_key_from_env, ByteBellConfig, ConfigLoader, IndexBackend};
use bytebell_retrieval::{
    ChatClient, ChatClientConfig, ChatModel, ClassifierConfig, EnhancerConfig, HttpPolicy,
    HybridEmbedder, NamespaceSearch, PineconeIndex, PineconeIndexConfig, PineconeSparseConfig,
    PineconeSparseEmbedder, QdrantIndex, QdrantIndexConfig, QueryClassifier, QueryEnhancer,
    Retriever, RetrieverConfig, SearchParams, VectorIndex, VectorSearchClient, VoyageConfig,
    VoyageEmbedder,
};
use tracing::info;

use crate::GlobalOptions;

/// Load configuration with CLI overrides applied.
///
/// `--config` loads that file over the defaults; otherwise the global and
/// local files are merged.
pub fn load_config(global: &GlobalOptions) -> Result<ByteBellConfig> {
    let overrides = global.to_config_overrides();
    let mut loader = ConfigLoader::new();

    if let Some(ref config_path) = global.config {
        return loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file: {}", config_path.display()));
    }

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    loader
        .load(&cwd, Some(&overrides))
        .context("Failed to load configuration")
}

/// HTTP policy shared by the remote clients
fn http_policy(config: &ByteBellConfig) -> HttpPolicy {
    HttpPolicy::default()
        .with_timeout(config.http.timeout_secs)
        .with_max_retries(config.http.max_retries)
}

/// Vector index for the configured backend
fn build_index(config: &ByteBellConfig) -> Result<Arc<dyn VectorIndex>> {
    let index = &config.index;
    match index.backend {
        IndexBackend::Pinecone => {
            let api_key = api_key_from_env("pinecone", &index.pinecone.api_key_env)?;
            let mut pc = PineconeIndexConfig::new(api_key, &index.name)
                .with_control_plane_url(&index.pinecone.control_plane_url)
                .with_http(http_policy(config));
            if let Some(ref host) = index.pinecone.host {
                pc = pc.with_host(host);
            }
            Ok(Arc::new(
                PineconeIndex::new(pc).context("Failed to create Pinecone client")?,
            ))
        }
        IndexBackend::Qdrant => {
            let mut qc = QdrantIndexConfig::with_url(&index.qdrant.url).index_name(&index.name);
            qc.timeout_secs = config.http.timeout_secs;
            if let Some(ref env) = index.qdrant.api_key_env {
                qc = qc.api_key(api_key_from_env("qdrant", env)?);
            }
            Ok(Arc::new(
                QdrantIndex::connect(qc).context("Failed to create Qdrant client")?,
            ))
        }
    }
}

/// Wire a retriever from configuration, reading API keys from the environment.
pub fn build_retriever(config: &ByteBellConfig) -> Result<Retriever> {
    config.validate().context("Invalid configuration")?;
    let policy = http_policy(config);

    let dense = VoyageConfig::voyage(api_key_from_env("voyage", &config.embedding.api_key_env)?)
        .with_base_url(&config.embedding.base_url)
        .with_model(&config.embedding.model)
        .with_http(policy.clone());
    let sparse = PineconeSparseConfig {
        api_version: config.sparse.api_version.clone(),
        ..PineconeSparseConfig::new(api_key_from_env("pinecone", &config.sparse.api_key_env)?)
    }
    .with_base_url(&config.sparse.base_url)
    .with_model(&config.sparse.model)
    .with_http(policy.clone());

    let embedder = HybridEmbedder::new(
        Arc::new(VoyageEmbedder::new(dense).context("Failed to create dense embedder")?),
        Arc::new(PineconeSparseEmbedder::new(sparse).context("Failed to create sparse embedder")?),
    );

    let completion = &config.completion;
    // Completions are not idempotent enough to retry
    let chat_key = api_key_from_env("completion", &completion.api_key_env)?;
    let chat = ChatClientConfig::openrouter(chat_key)
        .with_base_url(&completion.base_url)
        .with_attribution(completion.referer.clone(), completion.title.clone())
        .with_http(policy.with_max_retries(0));
    let chat: Arc<dyn ChatModel> =
        Arc::new(ChatClient::new(chat).context("Failed to create completion client")?);

    let client = VectorSearchClient::new(build_index(config)?);
    info!(
        "Using {} index '{}' (meta: {}, base: {})",
        client.backend(),
        config.index.name,
        config.index.meta_namespace,
        config.index.base_namespace
    );

    let params = SearchParams {
        top_k: config.index.top_k,
        score_threshold: config.index.score_threshold,
    };

    Ok(Retriever::new(
        QueryClassifier::new(
            chat.clone(),
            ClassifierConfig {
                model: completion.classifier_model.clone(),
                ..Default::default()
            },
        ),
        NamespaceSearch::meta(&config.index.meta_namespace, embedder.clone(), client.clone()),
        NamespaceSearch::base(&config.index.base_namespace, embedder, client),
        QueryEnhancer::new(
            chat,
            EnhancerConfig {
                model: completion.enhancer_model.clone(),
                max_tokens: completion.enhancer_max_tokens,
                ..Default::default()
            },
        ),
    )
    .with_config(RetrieverConfig {
        meta: params,
        base: params,
    }))
}

/// Print an info message to stderr (respects quiet flag).
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("{}", message);
    }
}
