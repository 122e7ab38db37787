use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use pgvector::Vector;
use serde_json::{Map, Value};
use sqlx::{types::Json, Row};
use uuid::Uuid;

use crate::{
    embedding::Embedder,
    schemas::Document,
    vectorstore::{
        Filter, VecStoreOptions, VectorStore, VectorStoreError, VectorStoreHelpers,
        VectorStoreInitializable,
    },
};

use super::{MetadataStorageMode, TableSchema, YugabyteDBEngine};

pub type YugabyteDBOptions = VecStoreOptions<Filter>;

/// pgvector store on a YugabyteDB table.
///
/// Build it with [`StoreBuilder`](super::StoreBuilder).
pub struct Store {
    pub(crate) engine: YugabyteDBEngine,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) schema: TableSchema,
    pub(crate) create_table: bool,
    pub(crate) drop_table_first: bool,
}

impl Store {
    pub fn engine(&self) -> &YugabyteDBEngine {
        &self.engine
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn to_vector(vector: &[f64]) -> Vector {
        Vector::from(vector.iter().map(|x| *x as f32).collect::<Vec<f32>>())
    }

    /// Stores documents with precomputed embeddings, returning their ids.
    ///
    /// Ids come from `opt.ids` (UUIDs) when set; a row with the same id is
    /// replaced.
    pub async fn add_vectors(
        &self,
        docs: &[Document],
        vectors: &[Vec<f64>],
        opt: &YugabyteDBOptions,
    ) -> Result<Vec<String>, VectorStoreError> {
        VectorStoreHelpers::validate_documents_vectors(docs, vectors, self.schema.dimension)?;
        let ids = Self::parse_ids(&VectorStoreHelpers::document_ids(opt, docs.len())?)?;
        let sql = self.schema.upsert()?;

        if let MetadataStorageMode::ColumnPerKey(_) = &self.schema.metadata.mode {
            for key in docs.iter().flat_map(|d| d.metadata.keys()) {
                if self.schema.metadata.column(key).is_none() {
                    log::debug!("Dropping undeclared metadata key {:?}", key);
                }
            }
        }

        let mut tx = self.engine.pool().begin().await?;
        for ((doc, vector), id) in docs.iter().zip(vectors).zip(&ids) {
            let metadata: Map<String, Value> = doc
                .metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            sqlx::query(&sql)
                .bind(*id)
                .bind(&doc.page_content)
                .bind(Self::to_vector(vector))
                .bind(Json(Value::Object(metadata)))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        log::debug!("Stored {} documents in {}", ids.len(), self.schema.table);
        Ok(ids.iter().map(Uuid::to_string).collect())
    }

    fn parse_ids(ids: &[String]) -> Result<Vec<Uuid>, VectorStoreError> {
        ids.iter()
            .map(|id| {
                Uuid::parse_str(id).map_err(|e| {
                    VectorStoreError::InvalidParameter(format!("invalid id {:?}: {}", id, e))
                })
            })
            .collect()
    }
}

#[async_trait]
impl VectorStore for Store {
    type Options = YugabyteDBOptions;

    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &Self::Options,
    ) -> Result<Vec<String>, VectorStoreError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let texts = VectorStoreHelpers::extract_texts(docs);
        let vectors = embedder.embed_documents(&texts).await?;
        self.add_vectors(docs, &vectors, opt).await
    }

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError> {
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let vector = embedder.embed_query(query).await?;
        self.similarity_search_by_vector(&vector, limit, opt).await
    }

    async fn similarity_search_by_vector(
        &self,
        vector: &[f64],
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError> {
        VectorStoreHelpers::validate_dimension(&[vector.to_vec()], self.schema.dimension)?;
        if opt.name_space.is_some() {
            log::debug!("YugabyteDB store ignores name_space");
        }
        let (sql, values) = self.schema.search(opt.filters.as_ref())?;

        let mut query = sqlx::query(&sql)
            .bind(Self::to_vector(vector))
            .bind(limit as i64);
        for value in values {
            query = value.bind(query);
        }
        let rows = query.fetch_all(self.engine.pool()).await?;

        let docs = rows
            .into_iter()
            .map(|row| {
                let page_content: Option<String> = row.try_get("content")?;
                let metadata: Option<Value> = row.try_get("metadata")?;
                let score: f64 = row.try_get("score")?;
                let metadata: HashMap<String, Value> = match metadata {
                    Some(Value::Object(map)) => map.into_iter().collect(),
                    _ => HashMap::new(),
                };
                Ok(Document {
                    page_content: page_content.unwrap_or_default(),
                    metadata,
                    score,
                })
            })
            .collect::<Result<Vec<Document>, sqlx::Error>>()?;

        Ok(VectorStoreHelpers::apply_score_threshold(
            docs,
            opt.score_threshold,
        ))
    }

    async fn delete(&self, ids: &[String], _opt: &Self::Options) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = Self::parse_ids(ids)?;
        sqlx::query(&self.schema.delete_ids()?)
            .bind(ids)
            .execute(self.engine.pool())
            .await?;
        Ok(())
    }

    async fn delete_by_filter(
        &self,
        filter: &Filter,
        _opt: &Self::Options,
    ) -> Result<(), VectorStoreError> {
        let (sql, values) = self.schema.delete_by_filter(filter)?;
        let mut query = sqlx::query(&sql);
        for value in values {
            query = value.bind(query);
        }
        let result = query.execute(self.engine.pool()).await?;
        log::debug!(
            "Deleted {} rows from {} where {}",
            result.rows_affected(),
            self.schema.table,
            filter
        );
        Ok(())
    }

    async fn delete_all(&self, _opt: &Self::Options) -> Result<(), VectorStoreError> {
        sqlx::query(&self.schema.delete_all()?)
            .execute(self.engine.pool())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStoreInitializable for Store {
    /// Enables the `vector` extension and creates the table and indexes as
    /// configured.
    async fn initialize(&self) -> Result<(), VectorStoreError> {
        let pool = self.engine.pool();
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(pool)
            .await?;
        if self.drop_table_first {
            log::warn!("Dropping table {}", self.schema.table);
            sqlx::query(&self.schema.drop_table()?).execute(pool).await?;
        }
        if self.create_table {
            sqlx::query(&self.schema.create_table()?)
                .execute(pool)
                .await?;
        }
        for statement in self.schema.create_indexes()? {
            sqlx::query(&statement).execute(pool).await?;
        }
        Ok(())
    }
}
