//! Embedding provider traits and types
//!
//! Retrieval needs two independent encoders for every query:
//! - `DenseEmbedder` - semantic vector (Voyage-compatible `/v1/embeddings`)
//! - `SparseEmbedder` - lexical term weights (Pinecone inference `/embed`)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// What the embedded text will be used for
///
/// Embedding services tune the representation for the asymmetric
/// query/document case, so the purpose is passed through on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingPurpose {
    /// Search query text
    #[default]
    Query,
    /// Passage text being indexed
    Document,
}

impl EmbeddingPurpose {
    /// Wire value understood by the embedding services
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingPurpose::Query => "query",
            EmbeddingPurpose::Document => "document",
        }
    }
}

impl std::fmt::Display for EmbeddingPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sparse vector as parallel index and weight lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Build a sparse vector, rejecting mismatched lengths
    pub fn new(indices: Vec<u32>, values: Vec<f32>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(RetrievalError::Embedding(format!(
                "sparse vector has {} indices but {} values",
                indices.len(),
                values.len()
            )));
        }
        Ok(Self { indices, values })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Dense embedding provider
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one instance serves every
/// concurrent retrieval.
#[async_trait]
pub trait DenseEmbedder: Send + Sync {
    /// Encode texts into dense vectors, one per input, in input order
    async fn embed_dense(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<Vec<f32>>>;

    /// Model identifier sent to the service
    fn model(&self) -> &str;
}

/// Sparse (lexical) embedding provider
#[async_trait]
pub trait SparseEmbedder: Send + Sync {
    /// Encode texts into sparse vectors, one per input, in input order
    async fn embed_sparse(
        &self,
        texts: Vec<String>,
        purpose: EmbeddingPurpose,
    ) -> Result<Vec<SparseVector>>;

    /// Model identifier sent to the service
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_wire_values() {
        assert_eq!(EmbeddingPurpose::Query.to_string(), "query");
        assert_eq!(EmbeddingPurpose::Document.as_str(), "document");
        assert_eq!(EmbeddingPurpose::default(), EmbeddingPurpose::Query);
    }

    #[test]
    fn test_sparse_vector_rejects_length_mismatch() {
        let err = SparseVector::new(vec![1, 2], vec![0.5]).unwrap_err();
        assert!(err.to_string().contains("2 indices but 1 values"));

        let ok = SparseVector::new(vec![7], vec![0.25]).unwrap();
        assert_eq!(ok.len(), 1);
        assert!(!ok.is_empty());
    }
}
