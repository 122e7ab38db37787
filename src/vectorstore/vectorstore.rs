use async_trait::async_trait;

use crate::schemas::Document;

use super::{Filter, VectorStoreError};

#[async_trait]
pub trait VectorStore: Send + Sync {
    type Options: Send + Sync;

    /// Embeds and stores the documents, returning their ids.
    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &Self::Options,
    ) -> Result<Vec<String>, VectorStoreError>;

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError>;

    /// Searches with an already computed query embedding.
    async fn similarity_search_by_vector(
        &self,
        vector: &[f64],
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError>;

    async fn delete(&self, ids: &[String], opt: &Self::Options) -> Result<(), VectorStoreError>;

    async fn delete_by_filter(
        &self,
        _filter: &Filter,
        _opt: &Self::Options,
    ) -> Result<(), VectorStoreError> {
        Err(VectorStoreError::DeleteNotSupported)
    }

    async fn delete_all(&self, _opt: &Self::Options) -> Result<(), VectorStoreError> {
        Err(VectorStoreError::DeleteNotSupported)
    }
}
