use serde::{Deserialize, Serialize};

use crate::vectorstore::{Filter, VectorStoreError};

use super::{
    metadata::{quote_ident, quote_literal},
    MetadataStorageConfig, MetadataStorageMode, SqlFilterMapper, SqlValue, YugabyteDBError,
};

/// pgvector distance used for ordering and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    DotProduct,
}

impl DistanceMetric {
    pub fn operator(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "<=>",
            DistanceMetric::Euclidean => "<->",
            DistanceMetric::DotProduct => "<#>",
        }
    }

    fn operator_class(self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "vector_cosine_ops",
            DistanceMetric::Euclidean => "vector_l2_ops",
            DistanceMetric::DotProduct => "vector_ip_ops",
        }
    }

    /// Maps the distance expression onto a relevance score.
    ///
    /// Cosine distance `d = 1 - cos` gives `(cos + 1) / 2`; `<#>` is the
    /// negated inner product, scored the same way for normalised vectors.
    fn score(self, distance: &str) -> String {
        match self {
            DistanceMetric::Cosine => format!("(2 - ({})) / 2", distance),
            DistanceMetric::Euclidean => format!("1 / (1 + ({}))", distance),
            DistanceMetric::DotProduct => format!("(1 - ({})) / 2", distance),
        }
    }
}

/// Parameters of the `ybhnsw` vector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswIndex {
    pub m: u32,
    pub ef_construction: u32,
}

impl Default for HnswIndex {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 64,
        }
    }
}

/// Table layout of the store and the SQL it runs against it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub table: String,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub metadata: MetadataStorageConfig,
    pub index: Option<HnswIndex>,
}

impl TableSchema {
    pub fn validate(&self) -> Result<(), YugabyteDBError> {
        quote_ident(&self.table)?;
        if self.dimension == 0 {
            return Err(YugabyteDBError::InvalidConfiguration(
                "dimension must be positive".to_string(),
            ));
        }
        self.metadata.validate()
    }

    fn table(&self) -> Result<String, YugabyteDBError> {
        quote_ident(&self.table)
    }

    fn metadata_column(&self) -> Result<String, YugabyteDBError> {
        quote_ident(&self.metadata.column_name)
    }

    pub fn drop_table(&self) -> Result<String, YugabyteDBError> {
        Ok(format!("DROP TABLE IF EXISTS {}", self.table()?))
    }

    pub fn create_table(&self) -> Result<String, YugabyteDBError> {
        let metadata = match &self.metadata.mode {
            MetadataStorageMode::CombinedJson => format!("{} JSON", self.metadata_column()?),
            MetadataStorageMode::CombinedJsonb => format!("{} JSONB", self.metadata_column()?),
            MetadataStorageMode::ColumnPerKey(columns) => columns
                .iter()
                .map(|c| Ok(format!("{} {}", quote_ident(&c.name)?, c.column_type.sql_type())))
                .collect::<Result<Vec<_>, YugabyteDBError>>()?
                .join(", "),
        };
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, content TEXT, embedding vector({}), {})",
            self.table()?,
            self.dimension,
            metadata
        ))
    }

    /// Vector index plus any metadata indexes.
    pub fn create_indexes(&self) -> Result<Vec<String>, YugabyteDBError> {
        let mut statements = Vec::new();
        if let Some(index) = &self.index {
            statements.push(format!(
                "CREATE INDEX NONCONCURRENTLY IF NOT EXISTS {} ON {} USING ybhnsw (embedding {}) WITH (m = {}, ef_construction = {})",
                quote_ident(&format!("{}_embedding_idx", self.table))?,
                self.table()?,
                self.metric.operator_class(),
                index.m,
                index.ef_construction
            ));
        }
        match &self.metadata.mode {
            MetadataStorageMode::CombinedJsonb if self.metadata.index => {
                statements.push(format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN ({})",
                    quote_ident(&format!("{}_{}_idx", self.table, self.metadata.column_name))?,
                    self.table()?,
                    self.metadata_column()?
                ));
            }
            MetadataStorageMode::ColumnPerKey(columns) => {
                for column in columns.iter().filter(|c| c.indexed) {
                    statements.push(format!(
                        "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                        quote_ident(&format!("{}_{}_idx", self.table, column.name))?,
                        self.table()?,
                        quote_ident(&column.name)?
                    ));
                }
            }
            _ => {}
        }
        Ok(statements)
    }

    /// Upsert of one row: `$1` id, `$2` content, `$3` embedding, `$4` metadata
    /// as JSONB.
    pub fn upsert(&self) -> Result<String, YugabyteDBError> {
        let table = self.table()?;
        match &self.metadata.mode {
            MetadataStorageMode::CombinedJson | MetadataStorageMode::CombinedJsonb => {
                let column = self.metadata_column()?;
                let cast = match self.metadata.mode {
                    MetadataStorageMode::CombinedJson => "json",
                    _ => "jsonb",
                };
                Ok(format!(
                    "INSERT INTO {table} (id, content, embedding, {column}) VALUES ($1, $2, $3, $4::{cast}) \
                     ON CONFLICT (id) DO UPDATE SET content = EXCLUDED.content, embedding = EXCLUDED.embedding, \
                     {column} = EXCLUDED.{column}",
                ))
            }
            MetadataStorageMode::ColumnPerKey(columns) => {
                let names = columns
                    .iter()
                    .map(|c| quote_ident(&c.name))
                    .collect::<Result<Vec<_>, _>>()?;
                let selected: Vec<String> = names.iter().map(|n| format!("r.{}", n)).collect();
                let updates: Vec<String> = names
                    .iter()
                    .map(|n| format!("{n} = EXCLUDED.{n}"))
                    .collect();
                Ok(format!(
                    "INSERT INTO {table} (id, content, embedding, {}) \
                     SELECT $1, $2, $3, {} FROM jsonb_populate_record(NULL::{table}, $4::jsonb) AS r \
                     ON CONFLICT (id) DO UPDATE SET content = EXCLUDED.content, embedding = EXCLUDED.embedding, {}",
                    names.join(", "),
                    selected.join(", "),
                    updates.join(", "),
                ))
            }
        }
    }

    /// Metadata of a row as one JSONB value.
    fn metadata_expr(&self) -> Result<String, YugabyteDBError> {
        Ok(match &self.metadata.mode {
            MetadataStorageMode::CombinedJson => format!("{}::jsonb", self.metadata_column()?),
            MetadataStorageMode::CombinedJsonb => self.metadata_column()?,
            MetadataStorageMode::ColumnPerKey(columns) => {
                let pairs = columns
                    .iter()
                    .map(|c| Ok(format!("{}, {}", quote_literal(&c.name), quote_ident(&c.name)?)))
                    .collect::<Result<Vec<_>, YugabyteDBError>>()?;
                format!("jsonb_strip_nulls(jsonb_build_object({}))", pairs.join(", "))
            }
        })
    }

    /// Nearest-neighbour query: `$1` query vector, `$2` limit, filter values
    /// from `$3`.
    pub fn search(&self, filter: Option<&Filter>) -> Result<(String, Vec<SqlValue>), VectorStoreError> {
        let distance = format!("embedding {} $1", self.metric.operator());
        let (condition, values) = match filter {
            Some(filter) => {
                let (condition, values) = SqlFilterMapper::new(&self.metadata, 3).map(filter)?;
                (format!(" WHERE {}", condition), values)
            }
            None => (String::new(), Vec::new()),
        };
        Ok((
            format!(
                "SELECT id::text AS id, content, {} AS metadata, ({})::float8 AS score FROM {}{} ORDER BY {} LIMIT $2",
                self.metadata_expr()?,
                self.metric.score(&distance),
                self.table()?,
                condition,
                distance
            ),
            values,
        ))
    }

    pub fn delete_ids(&self) -> Result<String, YugabyteDBError> {
        Ok(format!("DELETE FROM {} WHERE id = ANY($1)", self.table()?))
    }

    pub fn delete_by_filter(&self, filter: &Filter) -> Result<(String, Vec<SqlValue>), VectorStoreError> {
        let (condition, values) = SqlFilterMapper::new(&self.metadata, 1).map(filter)?;
        Ok((
            format!("DELETE FROM {} WHERE {}", self.table()?, condition),
            values,
        ))
    }

    pub fn delete_all(&self) -> Result<String, YugabyteDBError> {
        Ok(format!("DELETE FROM {}", self.table()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorstore::yugabytedb::{MetadataColumn, MetadataColumnType};

    fn schema(metadata: MetadataStorageConfig) -> TableSchema {
        TableSchema {
            table: "docs".to_string(),
            dimension: 3,
            metric: DistanceMetric::Cosine,
            metadata,
            index: Some(HnswIndex::default()),
        }
    }

    fn columns() -> MetadataStorageConfig {
        MetadataStorageConfig::column_per_key(vec![
            MetadataColumn::new("category", MetadataColumnType::Text).indexed(),
            MetadataColumn::new("year", MetadataColumnType::BigInt),
        ])
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            schema(MetadataStorageConfig::default()).create_table().unwrap(),
            "CREATE TABLE IF NOT EXISTS \"docs\" (id UUID PRIMARY KEY, content TEXT, embedding vector(3), \"metadata\" JSONB)"
        );
        assert_eq!(
            schema(columns()).create_table().unwrap(),
            "CREATE TABLE IF NOT EXISTS \"docs\" (id UUID PRIMARY KEY, content TEXT, embedding vector(3), \"category\" TEXT, \"year\" BIGINT)"
        );
    }

    #[test]
    fn test_indexes() {
        let statements = schema(MetadataStorageConfig::default().with_index(true))
            .create_indexes()
            .unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE INDEX NONCONCURRENTLY IF NOT EXISTS \"docs_embedding_idx\" ON \"docs\" USING ybhnsw (embedding vector_cosine_ops) WITH (m = 16, ef_construction = 64)".to_string(),
                "CREATE INDEX IF NOT EXISTS \"docs_metadata_idx\" ON \"docs\" USING GIN (\"metadata\")".to_string(),
            ]
        );

        let statements = schema(columns()).create_indexes().unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(
            statements[1],
            "CREATE INDEX IF NOT EXISTS \"docs_category_idx\" ON \"docs\" (\"category\")"
        );
    }

    #[test]
    fn test_column_per_key_upsert_populates_record() {
        let sql = schema(columns()).upsert().unwrap();
        assert!(sql.contains("SELECT $1, $2, $3, r.\"category\", r.\"year\" FROM jsonb_populate_record(NULL::\"docs\", $4::jsonb) AS r"));
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE"));
        assert!(sql.contains("\"year\" = EXCLUDED.\"year\""));
    }

    #[test]
    fn test_search_with_filter() {
        let (sql, values) = schema(MetadataStorageConfig::default())
            .search(Some(&Filter::eq("category", "news")))
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id::text AS id, content, \"metadata\" AS metadata, ((2 - (embedding <=> $1)) / 2)::float8 AS score \
             FROM \"docs\" WHERE (\"metadata\"->>'category') = $3 ORDER BY embedding <=> $1 LIMIT $2"
        );
        assert_eq!(values, vec![SqlValue::Text("news".to_string())]);
    }

    #[test]
    fn test_search_column_metadata_and_metric() {
        let mut schema = schema(columns());
        schema.metric = DistanceMetric::Euclidean;
        let (sql, _) = schema.search(None).unwrap();
        assert!(sql.contains(
            "jsonb_strip_nulls(jsonb_build_object('category', \"category\", 'year', \"year\")) AS metadata"
        ));
        assert!(sql.contains("ORDER BY embedding <-> $1 LIMIT $2"));
        assert!(!sql.contains("WHERE"));
    }

    #[test]
    fn test_delete_by_filter_numbers_from_one() {
        let (sql, values) = schema(columns())
            .delete_by_filter(&Filter::lt("year", 2000))
            .unwrap();
        assert_eq!(sql, "DELETE FROM \"docs\" WHERE \"year\" < $1");
        assert_eq!(values, vec![SqlValue::BigInt(2000)]);
    }
}
