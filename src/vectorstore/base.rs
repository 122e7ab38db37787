//! Helpers shared by the vector store implementations.

use std::sync::Arc;

use crate::embedding::Embedder;
use crate::schemas::Document;
use crate::vectorstore::{VecStoreOptions, VectorStore, VectorStoreError};

pub struct VectorStoreHelpers;

impl VectorStoreHelpers {
    pub fn extract_texts(docs: &[Document]) -> Vec<String> {
        docs.iter().map(|d| d.page_content.clone()).collect()
    }

    /// Checks that the embedder returned one vector per document, each of the
    /// expected dimension.
    pub fn validate_documents_vectors(
        docs: &[Document],
        vectors: &[Vec<f64>],
        dimension: usize,
    ) -> Result<(), VectorStoreError> {
        if docs.len() != vectors.len() {
            return Err(VectorStoreError::InternalError(format!(
                "Number of documents ({}) and vectors ({}) do not match",
                docs.len(),
                vectors.len()
            )));
        }
        Self::validate_dimension(vectors, dimension)
    }

    pub fn validate_dimension(vectors: &[Vec<f64>], dimension: usize) -> Result<(), VectorStoreError> {
        match vectors.iter().find(|v| v.len() != dimension) {
            Some(v) => Err(VectorStoreError::InvalidParameter(format!(
                "expected vectors of dimension {}, got {}",
                dimension,
                v.len()
            ))),
            None => Ok(()),
        }
    }

    /// The per-call embedder when one is set, otherwise the store's own.
    pub fn get_embedder<F>(
        opt: &VecStoreOptions<F>,
        default: &Arc<dyn Embedder>,
    ) -> Arc<dyn Embedder> {
        opt.embedder.as_ref().unwrap_or(default).clone()
    }

    /// The caller's ids when given, otherwise a fresh UUID per document.
    pub fn document_ids<F>(
        opt: &VecStoreOptions<F>,
        count: usize,
    ) -> Result<Vec<String>, VectorStoreError> {
        match &opt.ids {
            Some(ids) if ids.len() != count => Err(VectorStoreError::InvalidParameter(format!(
                "got {} ids for {} documents",
                ids.len(),
                count
            ))),
            Some(ids) => Ok(ids.clone()),
            None => Ok((0..count)
                .map(|_| uuid::Uuid::new_v4().to_string())
                .collect()),
        }
    }

    pub fn apply_score_threshold(mut docs: Vec<Document>, threshold: Option<f32>) -> Vec<Document> {
        if let Some(threshold) = threshold {
            docs.retain(|doc| doc.score >= threshold as f64);
        }
        docs
    }

    /// Maps a cosine similarity in `[-1, 1]` onto a relevance score in `[0, 1]`.
    pub fn relevance_score(cosine: f64) -> f64 {
        ((cosine + 1.0) / 2.0).clamp(0.0, 1.0)
    }
}

/// Stores that need schema objects (tables, indexes, constraints) created
/// before use.
#[async_trait::async_trait]
pub trait VectorStoreInitializable: VectorStore {
    /// Creates whatever is missing; safe to call repeatedly.
    async fn initialize(&self) -> Result<(), VectorStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_documents_vectors() {
        let docs = vec![Document::new("text1"), Document::new("text2")];
        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(VectorStoreHelpers::validate_documents_vectors(&docs, &vectors, 2).is_ok());
        assert!(matches!(
            VectorStoreHelpers::validate_documents_vectors(&docs, &vectors, 3),
            Err(VectorStoreError::InvalidParameter(_))
        ));
        assert!(matches!(
            VectorStoreHelpers::validate_documents_vectors(&docs[..1], &vectors, 2),
            Err(VectorStoreError::InternalError(_))
        ));
    }

    #[test]
    fn test_document_ids() {
        let generated =
            VectorStoreHelpers::document_ids(&VecStoreOptions::<()>::default(), 2).unwrap();
        assert_eq!(generated.len(), 2);
        assert_ne!(generated[0], generated[1]);

        let opt = VecStoreOptions::<()>::new().with_ids(["a", "b"]);
        assert_eq!(
            VectorStoreHelpers::document_ids(&opt, 2).unwrap(),
            vec!["a", "b"]
        );
        assert!(matches!(
            VectorStoreHelpers::document_ids(&opt, 3),
            Err(VectorStoreError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_apply_score_threshold() {
        let docs = vec![
            Document::new("text1").with_score(0.8),
            Document::new("text2").with_score(0.3),
        ];
        let filtered = VectorStoreHelpers::apply_score_threshold(docs, Some(0.5));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].page_content, "text1");
    }

    #[test]
    fn test_relevance_score() {
        assert_eq!(VectorStoreHelpers::relevance_score(1.0), 1.0);
        assert_eq!(VectorStoreHelpers::relevance_score(0.0), 0.5);
        assert_eq!(VectorStoreHelpers::relevance_score(-1.0), 0.0);
    }
}
