use serde::{Deserialize, Serialize};

use super::YugabyteDBError;

/// Quotes an SQL identifier, doubling embedded double quotes.
pub fn quote_ident(name: &str) -> Result<String, YugabyteDBError> {
    if name.is_empty() || name.contains('\0') {
        return Err(YugabyteDBError::InvalidConfiguration(format!(
            "invalid identifier {:?}",
            name
        )));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Quotes an SQL string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\0', "").replace('\'', "''"))
}

/// SQL type of a metadata column in [`MetadataStorageMode::ColumnPerKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataColumnType {
    Text,
    BigInt,
    Double,
    Boolean,
}

impl MetadataColumnType {
    pub fn sql_type(self) -> &'static str {
        match self {
            MetadataColumnType::Text => "TEXT",
            MetadataColumnType::BigInt => "BIGINT",
            MetadataColumnType::Double => "DOUBLE PRECISION",
            MetadataColumnType::Boolean => "BOOLEAN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataColumn {
    pub name: String,
    pub column_type: MetadataColumnType,
    /// Adds a B-tree index on the column.
    #[serde(default)]
    pub indexed: bool,
}

impl MetadataColumn {
    pub fn new<S: Into<String>>(name: S, column_type: MetadataColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            indexed: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStorageMode {
    /// All metadata in one `JSON` column.
    CombinedJson,
    /// All metadata in one `JSONB` column.
    CombinedJsonb,
    /// One typed column per declared key; undeclared keys are dropped.
    ColumnPerKey(Vec<MetadataColumn>),
}

/// How document metadata is laid out in the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataStorageConfig {
    pub mode: MetadataStorageMode,
    /// Column holding the combined JSON/JSONB metadata.
    pub column_name: String,
    /// Adds a GIN index on the JSONB column.
    #[serde(default)]
    pub index: bool,
}

impl Default for MetadataStorageConfig {
    fn default() -> Self {
        Self::combined_jsonb()
    }
}

impl MetadataStorageConfig {
    pub fn combined_json() -> Self {
        Self {
            mode: MetadataStorageMode::CombinedJson,
            column_name: "metadata".to_string(),
            index: false,
        }
    }

    pub fn combined_jsonb() -> Self {
        Self {
            mode: MetadataStorageMode::CombinedJsonb,
            ..Self::combined_json()
        }
    }

    pub fn column_per_key(columns: Vec<MetadataColumn>) -> Self {
        Self {
            mode: MetadataStorageMode::ColumnPerKey(columns),
            ..Self::combined_json()
        }
    }

    pub fn with_column_name<S: Into<String>>(mut self, column_name: S) -> Self {
        self.column_name = column_name.into();
        self
    }

    pub fn with_index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    pub fn columns(&self) -> &[MetadataColumn] {
        match &self.mode {
            MetadataStorageMode::ColumnPerKey(columns) => columns,
            _ => &[],
        }
    }

    pub fn column(&self, key: &str) -> Option<&MetadataColumn> {
        self.columns().iter().find(|c| c.name == key)
    }

    pub fn validate(&self) -> Result<(), YugabyteDBError> {
        match &self.mode {
            MetadataStorageMode::CombinedJson if self.index => {
                Err(YugabyteDBError::InvalidConfiguration(
                    "a GIN index needs JSONB metadata storage".to_string(),
                ))
            }
            MetadataStorageMode::ColumnPerKey(columns) => {
                if columns.is_empty() {
                    return Err(YugabyteDBError::InvalidConfiguration(
                        "column-per-key storage needs at least one column".to_string(),
                    ));
                }
                for (i, column) in columns.iter().enumerate() {
                    quote_ident(&column.name)?;
                    if matches!(column.name.as_str(), "id" | "content" | "embedding") {
                        return Err(YugabyteDBError::InvalidConfiguration(format!(
                            "metadata column {:?} clashes with a reserved column",
                            column.name
                        )));
                    }
                    if columns[..i].iter().any(|c| c.name == column.name) {
                        return Err(YugabyteDBError::InvalidConfiguration(format!(
                            "metadata column {:?} declared twice",
                            column.name
                        )));
                    }
                }
                Ok(())
            }
            _ => quote_ident(&self.column_name).map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("docs").unwrap(), "\"docs\"");
        assert_eq!(quote_ident("a\"b").unwrap(), "\"a\"\"b\"");
        assert!(quote_ident("").is_err());
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_validate() {
        assert!(MetadataStorageConfig::default().with_index(true).validate().is_ok());
        assert!(MetadataStorageConfig::combined_json()
            .with_index(true)
            .validate()
            .is_err());
        assert!(MetadataStorageConfig::column_per_key(vec![]).validate().is_err());
        assert!(MetadataStorageConfig::column_per_key(vec![
            MetadataColumn::new("a", MetadataColumnType::Text),
            MetadataColumn::new("a", MetadataColumnType::BigInt),
        ])
        .validate()
        .is_err());
        assert!(MetadataStorageConfig::column_per_key(vec![MetadataColumn::new(
            "embedding",
            MetadataColumnType::Text
        )])
        .validate()
        .is_err());
    }
}
