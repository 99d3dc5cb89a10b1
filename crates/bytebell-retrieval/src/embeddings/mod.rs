//! Query embedding for hybrid retrieval
//!
//! # Architecture
//!
//! ```text
//! DenseEmbedder (trait)
//!     └── VoyageEmbedder          - HTTP client for /v1/embeddings
//! SparseEmbedder (trait)
//!     └── PineconeSparseEmbedder  - HTTP client for Pinecone /embed
//! ```
//!
//! [`crate::hybrid::HybridEmbedder`] runs one of each concurrently.

mod provider;
pub mod sparse;
pub mod voyage;

pub use provider::{DenseEmbedder, EmbeddingPurpose, SparseEmbedder, SparseVector};
pub use sparse::{PineconeSparseConfig, PineconeSparseEmbedder};
pub use voyage::{VoyageConfig, VoyageEmbedder};
