use std::sync::Arc;

use crate::{embedding::Embedder, vectorstore::VectorStoreError};

use super::{validate_name, Neo4jClient, SimilarityFunction, Store};

pub struct StoreBuilder {
    client: Option<Neo4jClient>,
    embedder: Option<Arc<dyn Embedder>>,
    label: String,
    id_property: String,
    text_property: String,
    embedding_property: String,
    metadata_prefix: String,
    index_name: String,
    full_text_index: Option<String>,
    dimension: Option<usize>,
    similarity: SimilarityFunction,
    retrieval_query: Option<String>,
    await_index_timeout: u64,
    batch_size: usize,
}

impl StoreBuilder {
    pub fn new() -> Self {
        StoreBuilder {
            client: None,
            embedder: None,
            label: "Document".to_string(),
            id_property: "id".to_string(),
            text_property: "text".to_string(),
            embedding_property: "embedding".to_string(),
            metadata_prefix: String::new(),
            index_name: "vector".to_string(),
            full_text_index: None,
            dimension: None,
            similarity: SimilarityFunction::Cosine,
            retrieval_query: None,
            await_index_timeout: 300,
            batch_size: 1000,
        }
    }

    /// Defaults to [`Neo4jClient::from_env`].
    pub fn client(mut self, client: Neo4jClient) -> Self {
        self.client = Some(client);
        self
    }

    pub fn embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn id_property(mut self, property: &str) -> Self {
        self.id_property = property.to_string();
        self
    }

    pub fn text_property(mut self, property: &str) -> Self {
        self.text_property = property.to_string();
        self
    }

    pub fn embedding_property(mut self, property: &str) -> Self {
        self.embedding_property = property.to_string();
        self
    }

    /// Prefix added to metadata keys when they are stored as node properties.
    pub fn metadata_prefix(mut self, prefix: &str) -> Self {
        self.metadata_prefix = prefix.to_string();
        self
    }

    pub fn index_name(mut self, name: &str) -> Self {
        self.index_name = name.to_string();
        self
    }

    /// Enables hybrid (vector + full-text) search over the text property.
    pub fn full_text_index(mut self, name: &str) -> Self {
        self.full_text_index = Some(name.to_string());
        self
    }

    /// When unset, the dimension is probed by embedding a short text.
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn similarity(mut self, similarity: SimilarityFunction) -> Self {
        self.similarity = similarity;
        self
    }

    /// Replaces the default `RETURN` clause of searches. It runs after
    /// `WITH node, score` and must return `text`, `score` and `metadata`.
    pub fn retrieval_query(mut self, query: &str) -> Self {
        self.retrieval_query = Some(query.to_string());
        self
    }

    /// Seconds `initialize` waits for the indexes to come online.
    pub fn await_index_timeout(mut self, seconds: u64) -> Self {
        self.await_index_timeout = seconds;
        self
    }

    /// Rows sent per `UNWIND` statement.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub async fn build(self) -> Result<Store, VectorStoreError> {
        let embedder = self.embedder.ok_or("embedder is required".to_string())?;
        validate_name("label", &self.label)?;
        validate_name("id property", &self.id_property)?;
        validate_name("text property", &self.text_property)?;
        validate_name("embedding property", &self.embedding_property)?;
        validate_name("index name", &self.index_name)?;
        if let Some(index) = &self.full_text_index {
            validate_name("full-text index name", index)?;
        }

        let client = match self.client {
            Some(client) => client,
            None => Neo4jClient::from_env()?,
        };
        let dimension = match self.dimension {
            Some(0) => {
                return Err(VectorStoreError::InvalidParameter(
                    "dimension must be positive".to_string(),
                ))
            }
            Some(dimension) => dimension,
            None => embedder.embed_query("dimension probe").await?.len(),
        };

        Ok(Store {
            client,
            embedder,
            label: self.label,
            id_property: self.id_property,
            text_property: self.text_property,
            embedding_property: self.embedding_property,
            metadata_prefix: self.metadata_prefix,
            index_name: self.index_name,
            full_text_index: self.full_text_index,
            dimension,
            similarity: self.similarity,
            retrieval_query: self.retrieval_query,
            await_index_timeout: self.await_index_timeout,
            batch_size: self.batch_size,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
