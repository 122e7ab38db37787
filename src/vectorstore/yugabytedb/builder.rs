use std::sync::Arc;

use crate::{embedding::Embedder, vectorstore::VectorStoreError};

use super::{
    DistanceMetric, HnswIndex, MetadataStorageConfig, Store, TableSchema, YugabyteDBEngine,
};

pub struct StoreBuilder {
    engine: Option<YugabyteDBEngine>,
    embedder: Option<Arc<dyn Embedder>>,
    table: String,
    dimension: Option<usize>,
    metric: DistanceMetric,
    metadata: MetadataStorageConfig,
    index: Option<HnswIndex>,
    create_table: bool,
    drop_table_first: bool,
}

impl StoreBuilder {
    pub fn new() -> Self {
        StoreBuilder {
            engine: None,
            embedder: None,
            table: "documents".to_string(),
            dimension: None,
            metric: DistanceMetric::Cosine,
            metadata: MetadataStorageConfig::default(),
            index: Some(HnswIndex::default()),
            create_table: true,
            drop_table_first: false,
        }
    }

    pub fn engine(mut self, engine: YugabyteDBEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn table(mut self, table: &str) -> Self {
        self.table = table.to_string();
        self
    }

    /// When unset, the dimension is probed by embedding a short text.
    pub fn dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn metadata(mut self, metadata: MetadataStorageConfig) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn create_table(mut self, create_table: bool) -> Self {
        self.create_table = create_table;
        self
    }

    /// Drops the table in `initialize` before recreating it.
    pub fn drop_table_first(mut self, drop_table_first: bool) -> Self {
        self.drop_table_first = drop_table_first;
        self
    }

    pub fn hnsw(mut self, m: u32, ef_construction: u32) -> Self {
        self.index = Some(HnswIndex { m, ef_construction });
        self
    }

    /// Skips the `ybhnsw` index; searches scan the table.
    pub fn without_index(mut self) -> Self {
        self.index = None;
        self
    }

    pub async fn build(self) -> Result<Store, VectorStoreError> {
        let engine = self.engine.ok_or("engine is required".to_string())?;
        let embedder = self.embedder.ok_or("embedder is required".to_string())?;
        let dimension = match self.dimension {
            Some(dimension) => dimension,
            None => embedder.embed_query("dimension probe").await?.len(),
        };

        let schema = TableSchema {
            table: self.table,
            dimension,
            metric: self.metric,
            metadata: self.metadata,
            index: self.index,
        };
        schema.validate()?;

        Ok(Store {
            engine,
            embedder,
            schema,
            create_table: self.create_table,
            drop_table_first: self.drop_table_first,
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::embedding::EmbedderError;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_documents(&self, docs: &[String]) -> Result<Vec<Vec<f64>>, EmbedderError> {
            Ok(docs.iter().map(|_| vec![0.0, 1.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f64>, EmbedderError> {
            Ok(vec![0.0, 1.0, 0.0])
        }
    }

    fn lazy_engine() -> YugabyteDBEngine {
        YugabyteDBEngine::builder()
            .database("yugabyte")
            .connect_lazy()
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_probes_dimension() {
        let store = StoreBuilder::new()
            .engine(lazy_engine())
            .embedder(FixedEmbedder)
            .table("docs")
            .build()
            .await
            .unwrap();
        assert_eq!(store.schema().dimension, 3);
        assert_eq!(store.schema().table, "docs");
    }

    #[tokio::test]
    async fn test_build_rejects_bad_config() {
        let result = StoreBuilder::new()
            .engine(lazy_engine())
            .embedder(FixedEmbedder)
            .dimension(0)
            .build()
            .await;
        assert!(matches!(result, Err(VectorStoreError::YugabyteDBError(_))));

        let result = StoreBuilder::new().embedder(FixedEmbedder).build().await;
        assert!(matches!(result, Err(VectorStoreError::Unknown(_))));
    }
}
