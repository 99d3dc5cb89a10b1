//! Hybrid dense+sparse query embedding
//!
//! A hybrid query vector pairs a semantic (dense) embedding with a lexical
//! (sparse) one. The two encoders are independent remote services, so they
//! are called concurrently and joined; failure of either fails the whole
//! embedding.

use std::sync::Arc;

use tracing::debug;

use crate::embeddings::{DenseEmbedder, EmbeddingPurpose, SparseEmbedder, SparseVector};
use crate::error::{Result, RetrievalError};

/// Dense and sparse representation of one text
#[derive(Debug, Clone, PartialEq)]
pub struct HybridVector {
    pub dense: Vec<f32>,
    pub sparse: SparseVector,
}

/// Produces [`HybridVector`]s from a dense and a sparse embedder
#[derive(Clone)]
pub struct HybridEmbedder {
    dense: Arc<dyn DenseEmbedder>,
    sparse: Arc<dyn SparseEmbedder>,
}

impl HybridEmbedder {
    pub fn new(dense: Arc<dyn DenseEmbedder>, sparse: Arc<dyn SparseEmbedder>) -> Self {
        Self { dense, sparse }
    }

    /// Embed a single text with both encoders concurrently
    pub async fn embed(&self, text: &str, purpose: EmbeddingPurpose) -> Result<HybridVector> {
        debug!(
            dense_model = self.dense.model(),
            sparse_model = self.sparse.model(),
            %purpose,
            "Embedding query"
        );

        let (dense, sparse) = tokio::try_join!(
            self.dense.embed_dense(vec![text.to_string()], purpose),
            self.sparse.embed_sparse(vec![text.to_string()], purpose),
        )?;

        let dense = dense
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("dense embedder returned no vector".into()))?;
        let sparse = sparse
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalError::Embedding("sparse embedder returned no vector".into()))?;

        Ok(HybridVector { dense, sparse })
    }
}

impl std::fmt::Debug for HybridEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridEmbedder")
            .field("dense_model", &self.dense.model())
            .field("sparse_model", &self.sparse.model())
            .finish()
    }
}
