//! ByteBell Retrieval - two-phase hybrid search for grounding language models
//!
//! Answers a free-text query with the most relevant passages from a
//! vector-indexed knowledge base, returned as one text blob.
//!
//! # Features
//!
//! - **Two phases**: a coarse "meta" namespace search whose results steer a
//!   query rewrite, then a fine "base" namespace search with the rewritten query
//! - **Hybrid vectors**: dense (Voyage) and sparse (Pinecone inference)
//!   embeddings computed concurrently for every query
//! - **Adaptive filter**: code repositories are only searched when the query
//!   explicitly asks for code
//! - **Backends**: Pinecone (REST) or Qdrant (gRPC) behind [`VectorIndex`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use bytebell_retrieval::*;
//!
//! let chat: Arc<dyn ChatModel> = Arc::new(ChatClient::new(ChatClientConfig::openrouter(or_key))?);
//! let embedder = HybridEmbedder::new(
//!     Arc::new(VoyageEmbedder::new(VoyageConfig::voyage(voyage_key))?),
//!     Arc::new(PineconeSparseEmbedder::new(PineconeSparseConfig::new(pc_key.clone()))?),
//! );
//! let client = VectorSearchClient::new(Arc::new(PineconeIndex::new(
//!     PineconeIndexConfig::new(pc_key, "bytebell-prod-v2"),
//! )?));
//!
//! let retriever = Retriever::new(
//!     QueryClassifier::new(chat.clone(), ClassifierConfig::default()),
//!     NamespaceSearch::meta("sei_meta", embedder.clone(), client.clone()),
//!     NamespaceSearch::base("sei", embedder, client),
//!     QueryEnhancer::new(chat, EnhancerConfig::default()),
//! );
//!
//! let context = retriever.retrieve("What is SEI blockchain?").await;
//! ```

pub mod classifier;
pub mod completion;
pub mod embeddings;
pub mod enhancer;
pub mod error;
pub mod filter;
pub mod format;
pub mod http;
pub mod hybrid;
pub mod index;
pub mod pipeline;
pub mod schema;
pub mod stage;

// Re-exports for convenience
pub use classifier::{Classification, ClassifierConfig, DecisionPath, QueryClassifier};
pub use completion::{ChatClient, ChatClientConfig, ChatMessage, ChatModel, CompletionRequest};
pub use embeddings::{
    DenseEmbedder, EmbeddingPurpose, PineconeSparseConfig, PineconeSparseEmbedder,
    SparseEmbedder, SparseVector, VoyageConfig, VoyageEmbedder,
};
pub use enhancer::{EnhancerConfig, QueryEnhancer};
pub use error::{Result, RetrievalError};
pub use filter::{datasource_filter, DataSource, FilterValue, MetadataFilter};
pub use format::{FieldLabel, FormatOptions};
pub use http::HttpPolicy;
pub use hybrid::{HybridEmbedder, HybridVector};
pub use index::{
    IndexQuery, PineconeIndex, PineconeIndexConfig, QdrantIndex, QdrantIndexConfig, VectorIndex,
    VectorSearchClient,
};
pub use pipeline::{RetrievalOutcome, Retriever, RetrieverConfig, DIAGNOSTIC_MESSAGE};
pub use schema::{
    BaseDetails, MetaDetails, ResultDetails, RetrievalResponse, SearchMatch, SearchResult, Stage,
};
pub use stage::{NamespaceSearch, SearchParams, Transform};
