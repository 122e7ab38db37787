use serde_json::Value;
use sqlx::{postgres::PgArguments, query::Query, Postgres};

use crate::vectorstore::{Filter, ScalarKind, VectorStoreError};

use super::{
    metadata::{quote_ident, quote_literal},
    MetadataColumnType, MetadataStorageConfig, MetadataStorageMode,
};

/// A typed value bound to a `$n` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    BigInt(i64),
    Double(f64),
    Boolean(bool),
    TextArray(Vec<String>),
    BigIntArray(Vec<i64>),
    DoubleArray(Vec<f64>),
    BooleanArray(Vec<bool>),
}

impl SqlValue {
    pub(crate) fn bind<'q>(
        self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlValue::Text(v) => query.bind(v),
            SqlValue::BigInt(v) => query.bind(v),
            SqlValue::Double(v) => query.bind(v),
            SqlValue::Boolean(v) => query.bind(v),
            SqlValue::TextArray(v) => query.bind(v),
            SqlValue::BigIntArray(v) => query.bind(v),
            SqlValue::DoubleArray(v) => query.bind(v),
            SqlValue::BooleanArray(v) => query.bind(v),
        }
    }

    fn scalar(kind: ScalarKind, value: &Value) -> Option<Self> {
        match kind {
            ScalarKind::Text => Some(SqlValue::Text(match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            ScalarKind::Integer => value
                .as_i64()
                .map(SqlValue::BigInt)
                .or_else(|| value.as_f64().map(SqlValue::Double)),
            ScalarKind::Float => value.as_f64().map(SqlValue::Double),
            ScalarKind::Boolean => value.as_bool().map(SqlValue::Boolean),
        }
    }

    fn array(kind: ScalarKind, values: &[Value]) -> Option<Self> {
        let scalars = values
            .iter()
            .map(|v| SqlValue::scalar(kind, v))
            .collect::<Option<Vec<_>>>()?;
        let mut texts = Vec::new();
        let mut ints = Vec::new();
        let mut floats = Vec::new();
        let mut bools = Vec::new();
        for scalar in scalars {
            match scalar {
                SqlValue::Text(v) => texts.push(v),
                SqlValue::BigInt(v) => ints.push(v),
                SqlValue::Double(v) => floats.push(v),
                SqlValue::Boolean(v) => bools.push(v),
                _ => return None,
            }
        }
        match kind {
            ScalarKind::Text => Some(SqlValue::TextArray(texts)),
            // u64 values past i64::MAX fall back to doubles.
            ScalarKind::Integer if floats.is_empty() => Some(SqlValue::BigIntArray(ints)),
            ScalarKind::Integer | ScalarKind::Float => {
                floats.extend(ints.into_iter().map(|i| i as f64));
                Some(SqlValue::DoubleArray(floats))
            }
            ScalarKind::Boolean => Some(SqlValue::BooleanArray(bools)),
        }
    }
}

fn column_kind(column_type: MetadataColumnType) -> ScalarKind {
    match column_type {
        MetadataColumnType::Text => ScalarKind::Text,
        MetadataColumnType::BigInt => ScalarKind::Integer,
        MetadataColumnType::Double => ScalarKind::Float,
        MetadataColumnType::Boolean => ScalarKind::Boolean,
    }
}

/// Lowers a [`Filter`] into an SQL condition for the configured metadata
/// layout.
///
/// Values become `$n` placeholders numbered from the given start; the matching
/// [`SqlValue`]s are returned in placeholder order. JSON keys are single-quote
/// escaped literals, columns are double-quote escaped identifiers.
pub struct SqlFilterMapper<'a> {
    storage: &'a MetadataStorageConfig,
    next_placeholder: usize,
    values: Vec<SqlValue>,
}

impl<'a> SqlFilterMapper<'a> {
    pub fn new(storage: &'a MetadataStorageConfig, first_placeholder: usize) -> Self {
        Self {
            storage,
            next_placeholder: first_placeholder,
            values: Vec::new(),
        }
    }

    pub fn map(mut self, filter: &Filter) -> Result<(String, Vec<SqlValue>), VectorStoreError> {
        filter.validate()?;
        let condition = self.condition(filter)?;
        Ok((condition, self.values))
    }

    fn placeholder(&mut self, value: SqlValue) -> String {
        let placeholder = format!("${}", self.next_placeholder);
        self.next_placeholder += 1;
        self.values.push(value);
        placeholder
    }

    /// The SQL expression for `key`, and the kind its values are bound as.
    ///
    /// `kind` is the kind of the compared value; JSON text is cast to match,
    /// while typed columns dictate the kind themselves.
    fn key_expr(
        &self,
        key: &str,
        kind: ScalarKind,
    ) -> Result<(String, ScalarKind), VectorStoreError> {
        match &self.storage.mode {
            MetadataStorageMode::CombinedJson | MetadataStorageMode::CombinedJsonb => {
                let column = quote_ident(&self.storage.column_name)?;
                let text = format!("({}->>{})", column, quote_literal(key));
                let expr = match kind {
                    ScalarKind::Text => text,
                    ScalarKind::Integer | ScalarKind::Float => format!("{}::numeric", text),
                    ScalarKind::Boolean => format!("{}::boolean", text),
                };
                Ok((expr, kind))
            }
            MetadataStorageMode::ColumnPerKey(_) => {
                let column = self.storage.column(key).ok_or_else(|| {
                    VectorStoreError::InvalidFilter(format!(
                        "'{}' is not a declared metadata column",
                        key
                    ))
                })?;
                Ok((quote_ident(&column.name)?, column_kind(column.column_type)))
            }
        }
    }

    fn text_expr(&self, key: &str) -> Result<String, VectorStoreError> {
        let (expr, kind) = self.key_expr(key, ScalarKind::Text)?;
        Ok(match kind {
            ScalarKind::Text => expr,
            _ => format!("{}::text", expr),
        })
    }

    fn scalar(&mut self, key: &str, value: &Value) -> Result<(String, String), VectorStoreError> {
        let kind = ScalarKind::of(value)
            .ok_or_else(|| VectorStoreError::InvalidFilter(format!("bad value for '{}'", key)))?;
        let (expr, kind) = self.key_expr(key, kind)?;
        let bound = SqlValue::scalar(kind, value).ok_or_else(|| {
            VectorStoreError::InvalidFilter(format!(
                "{} does not fit the type of metadata column '{}'",
                value, key
            ))
        })?;
        Ok((expr, self.placeholder(bound)))
    }

    fn list(&mut self, key: &str, values: &[Value]) -> Result<(String, String), VectorStoreError> {
        let kind = ScalarKind::common(values).ok_or_else(|| {
            VectorStoreError::InvalidFilter(format!("mixed value types for '{}'", key))
        })?;
        let (expr, kind) = self.key_expr(key, kind)?;
        let bound = SqlValue::array(kind, values).ok_or_else(|| {
            VectorStoreError::InvalidFilter(format!(
                "values do not fit the type of metadata column '{}'",
                key
            ))
        })?;
        Ok((expr, self.placeholder(bound)))
    }

    fn compare(&mut self, key: &str, op: &str, value: &Value) -> Result<String, VectorStoreError> {
        let (expr, placeholder) = self.scalar(key, value)?;
        Ok(format!("{} {} {}", expr, op, placeholder))
    }

    fn condition(&mut self, filter: &Filter) -> Result<String, VectorStoreError> {
        Ok(match filter {
            Filter::IsEqualTo { key, value } => self.compare(key, "=", value)?,
            Filter::IsNotEqualTo { key, value } => {
                let (expr, placeholder) = self.scalar(key, value)?;
                format!("({e} IS NULL OR {e} <> {})", placeholder, e = expr)
            }
            Filter::IsGreaterThan { key, value } => self.compare(key, ">", value)?,
            Filter::IsGreaterThanOrEqualTo { key, value } => self.compare(key, ">=", value)?,
            Filter::IsLessThan { key, value } => self.compare(key, "<", value)?,
            Filter::IsLessThanOrEqualTo { key, value } => self.compare(key, "<=", value)?,
            Filter::IsIn { key, values } => {
                let (expr, placeholder) = self.list(key, values)?;
                format!("{} = ANY({})", expr, placeholder)
            }
            Filter::IsNotIn { key, values } => {
                let (expr, placeholder) = self.list(key, values)?;
                format!("({e} IS NULL OR NOT ({e} = ANY({})))", placeholder, e = expr)
            }
            Filter::ContainsString { key, value } => {
                let expr = self.text_expr(key)?;
                let placeholder = self.placeholder(SqlValue::Text(value.clone()));
                format!("strpos({}, {}) > 0", expr, placeholder)
            }
            Filter::And { left, right } => {
                let left = self.condition(left)?;
                let right = self.condition(right)?;
                format!("({} AND {})", left, right)
            }
            Filter::Or { left, right } => {
                let left = self.condition(left)?;
                let right = self.condition(right)?;
                format!("({} OR {})", left, right)
            }
            Filter::Not { filter } => format!("NOT ({})", self.condition(filter)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::vectorstore::yugabytedb::MetadataColumn;

    fn columns() -> MetadataStorageConfig {
        MetadataStorageConfig::column_per_key(vec![
            MetadataColumn::new("category", MetadataColumnType::Text),
            MetadataColumn::new("year", MetadataColumnType::BigInt),
            MetadataColumn::new("rating", MetadataColumnType::Double),
        ])
    }

    #[test]
    fn test_equal_to_is_parameterized_in_every_mode() {
        let filter = Filter::eq("category", "news");
        let expected = [
            (MetadataStorageConfig::combined_json(), "(\"metadata\"->>'category') = $3"),
            (MetadataStorageConfig::combined_jsonb(), "(\"metadata\"->>'category') = $3"),
            (columns(), "\"category\" = $3"),
        ];
        for (storage, condition) in expected {
            let (sql, values) = SqlFilterMapper::new(&storage, 3).map(&filter).unwrap();
            assert_eq!(sql, condition);
            assert_eq!(values, vec![SqlValue::Text("news".to_string())]);
            assert!(!sql.contains("news"));
        }
    }

    #[test]
    fn test_json_casts_follow_value_kind() {
        let storage = MetadataStorageConfig::default();
        let filter = Filter::and(
            Filter::gte("year", 2020),
            Filter::or(Filter::lt("rating", 4.5), Filter::eq("draft", false)),
        );
        let (sql, values) = SqlFilterMapper::new(&storage, 1).map(&filter).unwrap();
        assert_eq!(
            sql,
            "((\"metadata\"->>'year')::numeric >= $1 AND ((\"metadata\"->>'rating')::numeric < $2 OR (\"metadata\"->>'draft')::boolean = $3))"
        );
        assert_eq!(
            values,
            vec![
                SqlValue::BigInt(2020),
                SqlValue::Double(4.5),
                SqlValue::Boolean(false)
            ]
        );
    }

    #[test]
    fn test_in_lists_and_negations() {
        let storage = MetadataStorageConfig::default();
        let filter = Filter::and(
            Filter::is_in("year", vec![json!(2020), json!(2021.5)]),
            Filter::not_in("tag", ["a", "b"]),
        );
        let (sql, values) = SqlFilterMapper::new(&storage, 1).map(&filter).unwrap();
        assert_eq!(
            sql,
            "((\"metadata\"->>'year')::numeric = ANY($1) AND ((\"metadata\"->>'tag') IS NULL OR NOT ((\"metadata\"->>'tag') = ANY($2))))"
        );
        assert_eq!(
            values,
            vec![
                SqlValue::DoubleArray(vec![2020.0, 2021.5]),
                SqlValue::TextArray(vec!["a".to_string(), "b".to_string()])
            ]
        );
    }

    #[test]
    fn test_not_equal_matches_null() {
        let (sql, _) = SqlFilterMapper::new(&columns(), 1)
            .map(&Filter::not(Filter::ne("year", 1999)))
            .unwrap();
        assert_eq!(sql, "NOT ((\"year\" IS NULL OR \"year\" <> $1))");
    }

    #[test]
    fn test_column_types_drive_binding() {
        let (sql, values) = SqlFilterMapper::new(&columns(), 1)
            .map(&Filter::and(
                Filter::gt("rating", 3),
                Filter::contains("year", "19"),
            ))
            .unwrap();
        assert_eq!(sql, "(\"rating\" > $1 AND strpos(\"year\"::text, $2) > 0)");
        assert_eq!(
            values,
            vec![SqlValue::Double(3.0), SqlValue::Text("19".to_string())]
        );

        assert!(matches!(
            SqlFilterMapper::new(&columns(), 1).map(&Filter::eq("year", "recent")),
            Err(VectorStoreError::InvalidFilter(_))
        ));
        assert!(matches!(
            SqlFilterMapper::new(&columns(), 1).map(&Filter::eq("unknown", 1)),
            Err(VectorStoreError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_hostile_keys_are_escaped() {
        let (sql, _) = SqlFilterMapper::new(&MetadataStorageConfig::default(), 1)
            .map(&Filter::eq("x') OR 1=1 --", "v"))
            .unwrap();
        assert_eq!(sql, "(\"metadata\"->>'x'') OR 1=1 --') = $1");

        let storage = MetadataStorageConfig::column_per_key(vec![MetadataColumn::new(
            "a\"b",
            MetadataColumnType::Text,
        )]);
        let (sql, _) = SqlFilterMapper::new(&storage, 1)
            .map(&Filter::eq("a\"b", "v"))
            .unwrap();
        assert_eq!(sql, "\"a\"\"b\" = $1");
    }
}
