use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::{
    embedding::Embedder,
    schemas::Document,
    vectorstore::{
        Filter, VecStoreOptions, VectorStore, VectorStoreError, VectorStoreHelpers,
        VectorStoreInitializable,
    },
};

use super::{
    cypher::{escape_lucene, sanitize, CypherFilterMapper},
    Neo4jClient, QueryResult, Statement,
};

pub type Neo4jOptions = VecStoreOptions<Filter>;

/// Similarity function of the vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityFunction {
    #[default]
    Cosine,
    Euclidean,
}

impl SimilarityFunction {
    fn index_option(self) -> &'static str {
        match self {
            SimilarityFunction::Cosine => "cosine",
            SimilarityFunction::Euclidean => "euclidean",
        }
    }

    /// Cypher function returning the same normalised score as the index.
    fn cypher_function(self) -> &'static str {
        match self {
            SimilarityFunction::Cosine => "vector.similarity.cosine",
            SimilarityFunction::Euclidean => "vector.similarity.euclidean",
        }
    }
}

/// Vector store on Neo4j nodes carrying a text, an embedding and metadata
/// properties.
///
/// Build it with [`StoreBuilder`](super::StoreBuilder).
pub struct Store {
    pub(crate) client: Neo4jClient,
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) label: String,
    pub(crate) id_property: String,
    pub(crate) text_property: String,
    pub(crate) embedding_property: String,
    pub(crate) metadata_prefix: String,
    pub(crate) index_name: String,
    pub(crate) full_text_index: Option<String>,
    pub(crate) dimension: usize,
    pub(crate) similarity: SimilarityFunction,
    pub(crate) retrieval_query: Option<String>,
    pub(crate) await_index_timeout: u64,
    pub(crate) batch_size: usize,
}

impl Store {
    pub fn client(&self) -> &Neo4jClient {
        &self.client
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn constraint_statement(&self) -> Statement {
        let name = sanitize(&format!("{}_{}_unique", self.label, self.id_property));
        Statement::new(format!(
            "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
            name,
            sanitize(&self.label),
            sanitize(&self.id_property)
        ))
    }

    fn vector_index_statement(&self) -> Statement {
        Statement::new(format!(
            "CREATE VECTOR INDEX {} IF NOT EXISTS FOR (n:{}) ON (n.{}) \
             OPTIONS {{indexConfig: {{`vector.dimensions`: {}, `vector.similarity_function`: '{}'}}}}",
            sanitize(&self.index_name),
            sanitize(&self.label),
            sanitize(&self.embedding_property),
            self.dimension,
            self.similarity.index_option()
        ))
    }

    fn full_text_index_statement(&self, index: &str) -> Statement {
        Statement::new(format!(
            "CREATE FULLTEXT INDEX {} IF NOT EXISTS FOR (n:{}) ON EACH [n.{}]",
            sanitize(index),
            sanitize(&self.label),
            sanitize(&self.text_property)
        ))
    }

    fn await_indexes_statement(&self) -> Statement {
        Statement::new("CALL db.awaitIndexes($timeout)")
            .with_param("timeout", self.await_index_timeout)
    }

    fn upsert_statement(&self, rows: Vec<Value>) -> Statement {
        Statement::new(format!(
            "UNWIND $rows AS row \
             MERGE (node:{label} {{{id}: row.id}}) \
             SET node.{text} = row.text, node += row.metadata \
             WITH node, row \
             CALL db.create.setNodeVectorProperty(node, $embeddingProperty, row.embedding) \
             RETURN count(*) AS count",
            label = sanitize(&self.label),
            id = sanitize(&self.id_property),
            text = sanitize(&self.text_property),
        ))
        .with_param("rows", rows)
        .with_param("embeddingProperty", self.embedding_property.as_str())
    }

    /// The clause following `WITH node, score`; must yield `text`, `score`
    /// and `metadata`.
    fn return_clause(&self) -> String {
        match &self.retrieval_query {
            Some(query) => query.clone(),
            None => format!(
                "RETURN node.{text} AS text, score, \
                 node {{.*, {text}: null, {embedding}: null, {id}: null}} AS metadata",
                text = sanitize(&self.text_property),
                embedding = sanitize(&self.embedding_property),
                id = sanitize(&self.id_property),
            ),
        }
    }

    fn vector_search_statement(&self, vector: &[f64], limit: usize, min_score: f64) -> Statement {
        Statement::new(format!(
            "CALL db.index.vector.queryNodes($indexName, $k, $embedding) YIELD node, score \
             WHERE score >= $minScore \
             WITH node, score ORDER BY score DESC \
             {}",
            self.return_clause()
        ))
        .with_param("indexName", self.index_name.as_str())
        .with_param("k", limit)
        .with_param("embedding", json!(vector))
        .with_param("minScore", min_score)
    }

    fn filtered_search_statement(
        &self,
        vector: &[f64],
        limit: usize,
        min_score: f64,
        filter: &Filter,
    ) -> Result<Statement, VectorStoreError> {
        let (condition, params) = CypherFilterMapper::new("node", &self.metadata_prefix).map(filter)?;
        let embedding = sanitize(&self.embedding_property);
        Ok(Statement::new(format!(
            "MATCH (node:{label}) \
             WHERE node.{embedding} IS NOT NULL AND size(node.{embedding}) = $dimension AND {condition} \
             WITH node, {function}(node.{embedding}, $embedding) AS score \
             WHERE score >= $minScore \
             WITH node, score ORDER BY score DESC LIMIT $k \
             {ret}",
            label = sanitize(&self.label),
            function = self.similarity.cypher_function(),
            ret = self.return_clause(),
        ))
        .with_params(params)
        .with_param("dimension", self.dimension)
        .with_param("k", limit)
        .with_param("embedding", json!(vector))
        .with_param("minScore", min_score))
    }

    /// Union of vector and full-text hits, each normalised by its best score.
    fn hybrid_search_statement(
        &self,
        full_text_index: &str,
        query: &str,
        vector: &[f64],
        limit: usize,
        min_score: f64,
    ) -> Statement {
        Statement::new(format!(
            "CALL {{ \
                CALL db.index.vector.queryNodes($indexName, $k, $embedding) YIELD node, score \
                WITH collect({{node: node, score: score}}) AS nodes, max(score) AS max \
                UNWIND nodes AS n \
                RETURN n.node AS node, (n.score / max) AS score \
                UNION \
                CALL db.index.fulltext.queryNodes($keywordIndex, $query, {{limit: $k}}) YIELD node, score \
                WITH collect({{node: node, score: score}}) AS nodes, max(score) AS max \
                UNWIND nodes AS n \
                RETURN n.node AS node, (n.score / max) AS score \
             }} \
             WITH node, max(score) AS score \
             WHERE score >= $minScore \
             WITH node, score ORDER BY score DESC LIMIT $k \
             {}",
            self.return_clause()
        ))
        .with_param("indexName", self.index_name.as_str())
        .with_param("keywordIndex", full_text_index)
        .with_param("query", escape_lucene(query))
        .with_param("k", limit)
        .with_param("embedding", json!(vector))
        .with_param("minScore", min_score)
    }

    fn delete_where(&self, condition: &str) -> String {
        format!(
            "MATCH (node:{}) WHERE {} DETACH DELETE node",
            sanitize(&self.label),
            condition
        )
    }

    /// Neo4j properties hold scalars or homogeneous scalar lists; anything
    /// else is stored as its JSON text.
    fn to_property(value: &Value) -> Option<Value> {
        match value {
            Value::Null => None,
            Value::Object(_) => Some(Value::String(value.to_string())),
            Value::Array(items) => {
                let scalar_kinds: Option<Vec<_>> =
                    items.iter().map(crate::vectorstore::ScalarKind::of).collect();
                match scalar_kinds {
                    Some(kinds) if kinds.windows(2).all(|w| w[0] == w[1]) => Some(value.clone()),
                    _ => Some(Value::String(value.to_string())),
                }
            }
            _ => Some(value.clone()),
        }
    }

    fn is_reserved(&self, property: &str) -> bool {
        property == self.id_property
            || property == self.text_property
            || property == self.embedding_property
    }

    fn row(&self, id: &str, doc: &Document, vector: &[f64]) -> Value {
        let metadata: Map<String, Value> = doc
            .metadata
            .iter()
            .filter_map(|(k, v)| {
                let property = format!("{}{}", self.metadata_prefix, k);
                if self.is_reserved(&property) {
                    log::warn!("Dropping metadata key {:?}: it names a reserved property", k);
                    return None;
                }
                Self::to_property(v).map(|v| (property, v))
            })
            .collect();
        json!({
            "id": id,
            "text": doc.page_content,
            "embedding": vector,
            "metadata": metadata,
        })
    }

    fn parse_documents(&self, result: &QueryResult) -> Vec<Document> {
        result
            .records()
            .into_iter()
            .map(|record| {
                let page_content = record
                    .get("text")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let score = record.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0);
                let metadata: HashMap<String, Value> = match record.get("metadata") {
                    Some(Value::Object(map)) => map
                        .iter()
                        .filter(|(_, v)| !v.is_null())
                        .filter_map(|(k, v)| {
                            k.strip_prefix(self.metadata_prefix.as_str())
                                .map(|k| (k.to_string(), v.clone()))
                        })
                        .collect(),
                    _ => HashMap::new(),
                };
                Document {
                    page_content,
                    metadata,
                    score,
                }
            })
            .collect()
    }

    async fn search(
        &self,
        query: Option<&str>,
        vector: &[f64],
        limit: usize,
        opt: &Neo4jOptions,
    ) -> Result<Vec<Document>, VectorStoreError> {
        VectorStoreHelpers::validate_dimension(&[vector.to_vec()], self.dimension)?;
        let min_score = opt.score_threshold.unwrap_or(0.0) as f64;

        let statement = match (&opt.filters, query, &self.full_text_index) {
            (Some(filter), _, full_text) => {
                if full_text.is_some() && query.is_some() {
                    log::warn!("Neo4j hybrid search does not support filters; using vector search");
                }
                self.filtered_search_statement(vector, limit, min_score, filter)?
            }
            (None, Some(query), Some(index)) => {
                self.hybrid_search_statement(index, query, vector, limit, min_score)
            }
            (None, _, _) => self.vector_search_statement(vector, limit, min_score),
        };

        let result = self.client.run(statement).await?;
        Ok(self.parse_documents(&result))
    }
}

#[async_trait]
impl VectorStore for Store {
    type Options = Neo4jOptions;

    async fn add_documents(
        &self,
        docs: &[Document],
        opt: &Self::Options,
    ) -> Result<Vec<String>, VectorStoreError> {
        let ids = VectorStoreHelpers::document_ids(opt, docs.len())?;
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let texts = VectorStoreHelpers::extract_texts(docs);
        let vectors = embedder.embed_documents(&texts).await?;
        VectorStoreHelpers::validate_documents_vectors(docs, &vectors, self.dimension)?;

        let rows: Vec<Value> = ids
            .iter()
            .zip(docs.iter().zip(vectors.iter()))
            .map(|(id, (doc, vector))| self.row(id, doc, vector))
            .collect();

        for chunk in rows.chunks(self.batch_size.max(1)) {
            self.client.run(self.upsert_statement(chunk.to_vec())).await?;
        }
        log::debug!("Stored {} documents under label {}", ids.len(), self.label);
        Ok(ids)
    }

    async fn similarity_search(
        &self,
        query: &str,
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError> {
        let embedder = VectorStoreHelpers::get_embedder(opt, &self.embedder);
        let vector = embedder.embed_query(query).await?;
        self.search(Some(query), &vector, limit, opt).await
    }

    async fn similarity_search_by_vector(
        &self,
        vector: &[f64],
        limit: usize,
        opt: &Self::Options,
    ) -> Result<Vec<Document>, VectorStoreError> {
        self.search(None, vector, limit, opt).await
    }

    async fn delete(&self, ids: &[String], _opt: &Self::Options) -> Result<(), VectorStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let condition = format!("node.{} IN $ids", sanitize(&self.id_property));
        self.client
            .run(Statement::new(self.delete_where(&condition)).with_param("ids", ids.to_vec()))
            .await?;
        Ok(())
    }

    async fn delete_by_filter(
        &self,
        filter: &Filter,
        _opt: &Self::Options,
    ) -> Result<(), VectorStoreError> {
        let (condition, params) =
            CypherFilterMapper::new("node", &self.metadata_prefix).map(filter)?;
        self.client
            .run(Statement::new(self.delete_where(&condition)).with_params(params))
            .await?;
        Ok(())
    }

    async fn delete_all(&self, _opt: &Self::Options) -> Result<(), VectorStoreError> {
        self.client
            .run(Statement::new(format!(
                "MATCH (node:{}) DETACH DELETE node",
                sanitize(&self.label)
            )))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStoreInitializable for Store {
    /// Creates the id constraint, the vector index and the optional full-text
    /// index, then waits for them to come online.
    async fn initialize(&self) -> Result<(), VectorStoreError> {
        // Schema changes cannot share a transaction with other statements.
        self.client.run(self.constraint_statement()).await?;
        self.client.run(self.vector_index_statement()).await?;
        if let Some(index) = &self.full_text_index {
            self.client.run(self.full_text_index_statement(index)).await?;
        }
        self.client.run(self.await_indexes_statement()).await?;
        log::info!(
            "Neo4j vector index {} ready ({} dimensions)",
            self.index_name,
            self.dimension
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;
    use crate::{
        embedding::EmbedderError,
        vectorstore::neo4j::{Neo4jError, StoreBuilder},
    };

    #[derive(Clone)]
    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_documents(
            &self,
            documents: &[String],
        ) -> Result<Vec<Vec<f64>>, EmbedderError> {
            Ok(documents.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        async fn embed_query(&self, _text: &str) -> Result<Vec<f64>, EmbedderError> {
            Ok(vec![0.0, 1.0, 0.0])
        }
    }

    fn empty_result() -> String {
        json!({"results": [{"columns": [], "data": []}], "errors": []}).to_string()
    }

    async fn store(server: &mockito::ServerGuard, builder: StoreBuilder) -> Store {
        builder
            .client(Neo4jClient::new(&server.url(), "neo4j", "pw").unwrap())
            .embedder(FixedEmbedder)
            .dimension(3)
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_documents_unwinds_rows() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("UNWIND \\$rows AS row MERGE \\(node:`Chunk`".to_string()),
                Matcher::Regex("db.create.setNodeVectorProperty".to_string()),
                Matcher::Regex(r#""meta_source":"wiki""#.to_string()),
                Matcher::Regex(r#""embeddingProperty":"embedding""#.to_string()),
            ]))
            .with_body(empty_result())
            .create_async()
            .await;

        let store = store(
            &server,
            StoreBuilder::new().label("Chunk").metadata_prefix("meta_"),
        )
        .await;
        let docs = vec![Document::new("hello").with_metadata_entry("source", json!("wiki"))];
        let ids = store
            .add_documents(&docs, &Neo4jOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_reserved_metadata_keys_are_dropped() {
        let server = mockito::Server::new_async().await;
        let store = store(&server, StoreBuilder::new()).await;
        let doc = Document::new("kept")
            .with_metadata_entry("text", json!("clobbered"))
            .with_metadata_entry("id", json!("other-id"))
            .with_metadata_entry("embedding", json!([0.0]))
            .with_metadata_entry("source", json!("wiki"));

        let row = store.row("uuid-1", &doc, &[1.0, 0.0, 0.0]);
        assert_eq!(row["id"], json!("uuid-1"));
        assert_eq!(row["text"], json!("kept"));
        assert_eq!(row["metadata"], json!({"source": "wiki"}));

        let prefixed = self::store(&server, StoreBuilder::new().metadata_prefix("meta_")).await;
        let row = prefixed.row("uuid-1", &doc, &[1.0, 0.0, 0.0]);
        assert_eq!(row["metadata"]["meta_text"], json!("clobbered"));
        assert_eq!(row["metadata"]["meta_id"], json!("other-id"));
    }

    #[tokio::test]
    async fn test_add_documents_with_ids_merges_on_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("MERGE \\(node:`Document` \\{`id`: row.id\\}\\)".to_string()),
                Matcher::Regex(r#""id":"doc-1""#.to_string()),
            ]))
            .with_body(empty_result())
            .expect(2)
            .create_async()
            .await;

        let store = store(&server, StoreBuilder::new()).await;
        let opt = Neo4jOptions::new().with_ids(["doc-1"]);
        for text in ["first", "second"] {
            let ids = store
                .add_documents(&[Document::new(text)], &opt)
                .await
                .unwrap();
            assert_eq!(ids, vec!["doc-1"]);
        }
        mock.assert_async().await;

        let err = store
            .add_documents(&[Document::new("a"), Document::new("b")], &opt)
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_vector_search_parses_rows() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::Regex("db.index.vector.queryNodes".to_string()))
            .with_body(
                json!({
                    "results": [{
                        "columns": ["text", "score", "metadata"],
                        "data": [{"row": ["hello", 0.9, {"source": "wiki", "text": null, "embedding": null, "id": null}]}]
                    }],
                    "errors": []
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = store(&server, StoreBuilder::new()).await;
        let docs = store
            .similarity_search("hi", 2, &Neo4jOptions::default())
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].page_content, "hello");
        assert_eq!(docs[0].score, 0.9);
        assert_eq!(docs[0].metadata.len(), 1);
        assert_eq!(docs[0].metadata["source"], json!("wiki"));
    }

    #[tokio::test]
    async fn test_filtered_search_parameterizes_values() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("MATCH \\(node:`Document`\\)".to_string()),
                Matcher::Regex("node.`category` = \\$f_0".to_string()),
                Matcher::Regex("vector.similarity.cosine".to_string()),
                Matcher::PartialJson(json!({
                    "statements": [{"parameters": {"f_0": "news", "k": 4, "minScore": 0.5}}]
                })),
            ]))
            .with_body(empty_result())
            .create_async()
            .await;

        let store = store(&server, StoreBuilder::new()).await;
        let opt = Neo4jOptions::new()
            .with_filters(Filter::eq("category", "news"))
            .with_score_threshold(0.5);
        store.similarity_search("q", 4, &opt).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_hybrid_search_escapes_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("db.index.fulltext.queryNodes".to_string()),
                Matcher::PartialJson(json!({
                    "statements": [{"parameters": {"keywordIndex": "keyword", "query": "rust\\?"}}]
                })),
            ]))
            .with_body(empty_result())
            .create_async()
            .await;

        let store = store(&server, StoreBuilder::new().full_text_index("keyword")).await;
        store
            .similarity_search("rust?", 3, &Neo4jOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_wrong_dimension_rejected() {
        let server = mockito::Server::new_async().await;
        let store = store(&server, StoreBuilder::new()).await;
        let err = store
            .similarity_search_by_vector(&[1.0], 1, &Neo4jOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, VectorStoreError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_deletes() {
        let mut server = mockito::Server::new_async().await;
        let by_ids = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("WHERE node.`id` IN \\$ids DETACH DELETE node".to_string()),
                Matcher::PartialJson(json!({"statements": [{"parameters": {"ids": ["a", "b"]}}]})),
            ]))
            .with_body(empty_result())
            .create_async()
            .await;
        let by_filter = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::Regex(
                "WHERE node.`year` < \\$f_0 DETACH DELETE node".to_string(),
            ))
            .with_body(empty_result())
            .create_async()
            .await;

        let store = store(&server, StoreBuilder::new()).await;
        let opt = Neo4jOptions::default();
        store
            .delete(&["a".to_string(), "b".to_string()], &opt)
            .await
            .unwrap();
        store
            .delete_by_filter(&Filter::lt("year", 2000), &opt)
            .await
            .unwrap();

        by_ids.assert_async().await;
        by_filter.assert_async().await;
    }

    #[tokio::test]
    async fn test_initialize_runs_schema_statements() {
        let mut server = mockito::Server::new_async().await;
        let constraint = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::Regex(
                "CREATE CONSTRAINT `Document_id_unique` IF NOT EXISTS".to_string(),
            ))
            .with_body(empty_result())
            .create_async()
            .await;
        let index = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::Regex(
                "CREATE VECTOR INDEX `vector` IF NOT EXISTS.*`vector.dimensions`: 3".to_string(),
            ))
            .with_body(empty_result())
            .create_async()
            .await;
        let await_indexes = server
            .mock("POST", "/db/neo4j/tx/commit")
            .match_body(Matcher::Regex("db.awaitIndexes".to_string()))
            .with_body(empty_result())
            .create_async()
            .await;

        store(&server, StoreBuilder::new())
            .await
            .initialize()
            .await
            .unwrap();

        constraint.assert_async().await;
        index.assert_async().await;
        await_indexes.assert_async().await;
    }

    #[tokio::test]
    async fn test_database_error_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/db/neo4j/tx/commit")
            .with_body(
                json!({
                    "results": [],
                    "errors": [{"code": "Neo.ClientError.Procedure.ProcedureCallFailed", "message": "no such index"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = store(&server, StoreBuilder::new()).await;
        let err = store
            .similarity_search("q", 1, &Neo4jOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::Neo4jError(Neo4jError::DatabaseError { .. })
        ));
    }

    #[test]
    fn test_to_property() {
        assert_eq!(Store::to_property(&json!(null)), None);
        assert_eq!(Store::to_property(&json!([1, 2])), Some(json!([1, 2])));
        assert_eq!(
            Store::to_property(&json!({"a": 1})),
            Some(json!("{\"a\":1}"))
        );
        assert_eq!(Store::to_property(&json!([1, "a"])), Some(json!("[1,\"a\"]")));
    }
}
