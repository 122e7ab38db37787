//! Metadata filter expressions.
//!
//! A [`Filter`] is a small expression tree over document metadata. Stores
//! lower it into their own query language; [`Filter::matches`] evaluates it
//! locally against a metadata map.

use std::{cmp::Ordering, collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::VectorStoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
    IsEqualTo { key: String, value: Value },
    IsNotEqualTo { key: String, value: Value },
    IsGreaterThan { key: String, value: Value },
    IsGreaterThanOrEqualTo { key: String, value: Value },
    IsLessThan { key: String, value: Value },
    IsLessThanOrEqualTo { key: String, value: Value },
    IsIn { key: String, values: Vec<Value> },
    IsNotIn { key: String, values: Vec<Value> },
    ContainsString { key: String, value: String },
    And { left: Box<Filter>, right: Box<Filter> },
    Or { left: Box<Filter>, right: Box<Filter> },
    Not { filter: Box<Filter> },
}

/// The JSON scalar kinds a filter may compare against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
}

impl ScalarKind {
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(ScalarKind::Text),
            Value::Bool(_) => Some(ScalarKind::Boolean),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(ScalarKind::Integer),
            Value::Number(_) => Some(ScalarKind::Float),
            _ => None,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::Float)
    }

    /// The kind a list of values shares; integers mixed with floats widen to
    /// `Float`.
    pub fn common(values: &[Value]) -> Option<Self> {
        let mut kinds = values.iter().map(ScalarKind::of);
        let mut common = kinds.next()??;
        for kind in kinds {
            let kind = kind?;
            common = match (common, kind) {
                (a, b) if a == b => a,
                (a, b) if a.is_numeric() && b.is_numeric() => ScalarKind::Float,
                _ => return None,
            };
        }
        Some(common)
    }
}

impl Filter {
    pub fn eq<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Filter::IsEqualTo {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn ne<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Filter::IsNotEqualTo {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn gt<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Filter::IsGreaterThan {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn gte<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Filter::IsGreaterThanOrEqualTo {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn lt<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Filter::IsLessThan {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn lte<K: Into<String>, V: Into<Value>>(key: K, value: V) -> Self {
        Filter::IsLessThanOrEqualTo {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn is_in<K, I, V>(key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::IsIn {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<K, I, V>(key: K, values: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Filter::IsNotIn {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains<K: Into<String>, S: Into<String>>(key: K, value: S) -> Self {
        Filter::ContainsString {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn and(left: Filter, right: Filter) -> Self {
        Filter::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Filter, right: Filter) -> Self {
        Filter::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not {
            filter: Box::new(filter),
        }
    }

    /// Checks the tree before it is lowered into a query.
    ///
    /// Comparison values must be JSON scalars (no null, array or object),
    /// `IsIn`/`IsNotIn` lists must be non-empty and of one kind, and ordering
    /// comparisons only accept numbers and strings.
    pub fn validate(&self) -> Result<(), VectorStoreError> {
        match self {
            Filter::IsEqualTo { key, value } | Filter::IsNotEqualTo { key, value } => {
                check_key(key)?;
                scalar_kind(key, value).map(|_| ())
            }
            Filter::IsGreaterThan { key, value }
            | Filter::IsGreaterThanOrEqualTo { key, value }
            | Filter::IsLessThan { key, value }
            | Filter::IsLessThanOrEqualTo { key, value } => {
                check_key(key)?;
                match scalar_kind(key, value)? {
                    ScalarKind::Boolean => Err(VectorStoreError::InvalidFilter(format!(
                        "ordering comparison on '{}' needs a number or string",
                        key
                    ))),
                    _ => Ok(()),
                }
            }
            Filter::IsIn { key, values } | Filter::IsNotIn { key, values } => {
                check_key(key)?;
                if values.is_empty() {
                    return Err(VectorStoreError::InvalidFilter(format!(
                        "value list for '{}' is empty",
                        key
                    )));
                }
                for value in values {
                    scalar_kind(key, value)?;
                }
                ScalarKind::common(values).map(|_| ()).ok_or_else(|| {
                    VectorStoreError::InvalidFilter(format!(
                        "values for '{}' mix incompatible types",
                        key
                    ))
                })
            }
            Filter::ContainsString { key, .. } => check_key(key),
            Filter::And { left, right } | Filter::Or { left, right } => {
                left.validate()?;
                right.validate()
            }
            Filter::Not { filter } => filter.validate(),
        }
    }

    /// Evaluates the filter against a metadata map.
    ///
    /// A missing key never satisfies a positive comparison and always
    /// satisfies `IsNotEqualTo`/`IsNotIn`, matching how the database mappers
    /// treat NULL.
    pub fn matches(&self, metadata: &HashMap<String, Value>) -> bool {
        match self {
            Filter::IsEqualTo { key, value } => metadata
                .get(key)
                .is_some_and(|actual| values_equal(actual, value)),
            Filter::IsNotEqualTo { key, value } => !metadata
                .get(key)
                .is_some_and(|actual| values_equal(actual, value)),
            Filter::IsGreaterThan { key, value } => {
                compare(metadata.get(key), value).is_some_and(Ordering::is_gt)
            }
            Filter::IsGreaterThanOrEqualTo { key, value } => {
                compare(metadata.get(key), value).is_some_and(Ordering::is_ge)
            }
            Filter::IsLessThan { key, value } => {
                compare(metadata.get(key), value).is_some_and(Ordering::is_lt)
            }
            Filter::IsLessThanOrEqualTo { key, value } => {
                compare(metadata.get(key), value).is_some_and(Ordering::is_le)
            }
            Filter::IsIn { key, values } => metadata
                .get(key)
                .is_some_and(|actual| values.iter().any(|v| values_equal(actual, v))),
            Filter::IsNotIn { key, values } => !metadata
                .get(key)
                .is_some_and(|actual| values.iter().any(|v| values_equal(actual, v))),
            Filter::ContainsString { key, value } => metadata
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|actual| actual.contains(value.as_str())),
            Filter::And { left, right } => left.matches(metadata) && right.matches(metadata),
            Filter::Or { left, right } => left.matches(metadata) || right.matches(metadata),
            Filter::Not { filter } => !filter.matches(metadata),
        }
    }
}

impl std::ops::Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::not(self)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::IsEqualTo { key, value } => write!(f, "{} = {}", key, value),
            Filter::IsNotEqualTo { key, value } => write!(f, "{} != {}", key, value),
            Filter::IsGreaterThan { key, value } => write!(f, "{} > {}", key, value),
            Filter::IsGreaterThanOrEqualTo { key, value } => write!(f, "{} >= {}", key, value),
            Filter::IsLessThan { key, value } => write!(f, "{} < {}", key, value),
            Filter::IsLessThanOrEqualTo { key, value } => write!(f, "{} <= {}", key, value),
            Filter::IsIn { key, values } => write!(f, "{} in {}", key, Value::from(values.clone())),
            Filter::IsNotIn { key, values } => {
                write!(f, "{} not in {}", key, Value::from(values.clone()))
            }
            Filter::ContainsString { key, value } => write!(f, "{} contains {:?}", key, value),
            Filter::And { left, right } => write!(f, "({} and {})", left, right),
            Filter::Or { left, right } => write!(f, "({} or {})", left, right),
            Filter::Not { filter } => write!(f, "not ({})", filter),
        }
    }
}

fn check_key(key: &str) -> Result<(), VectorStoreError> {
    if key.trim().is_empty() {
        return Err(VectorStoreError::InvalidFilter(
            "metadata key must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn scalar_kind(key: &str, value: &Value) -> Result<ScalarKind, VectorStoreError> {
    ScalarKind::of(value).ok_or_else(|| {
        VectorStoreError::InvalidFilter(format!(
            "'{}' can only be compared with a string, number or boolean, got {}",
            key, value
        ))
    })
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) if actual.is_number() && expected.is_number() => a == b,
        _ => actual == expected,
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}
