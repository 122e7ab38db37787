use serde_json::{Map, Value};

use crate::vectorstore::{Filter, VectorStoreError};

use super::Neo4jError;

/// Quotes a label, property, index or constraint name for Cypher.
///
/// The name is wrapped in backticks and embedded backticks are doubled.
/// Cypher resolves a `\u0060` escape inside quoted names, so it counts as a
/// backtick too.
pub fn sanitize(identifier: &str) -> String {
    let normalized = identifier
        .replace("\\u0060", "`")
        .replace("\\U0060", "`");
    format!("`{}`", normalized.replace('`', "``"))
}

/// Rejects names that cannot be used as Cypher identifiers even when quoted.
pub fn validate_name(kind: &str, name: &str) -> Result<(), Neo4jError> {
    if name.trim().is_empty() {
        return Err(Neo4jError::InvalidIdentifier(format!("{} must not be empty", kind)));
    }
    if name.contains('\0') {
        return Err(Neo4jError::InvalidIdentifier(format!(
            "{} must not contain NUL characters",
            kind
        )));
    }
    Ok(())
}

/// Escapes Lucene query syntax so user text is searched literally.
pub fn escape_lucene(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':',
        '\\', '/',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Lowers a [`Filter`] into a Cypher condition on a node variable.
///
/// Values are never inlined: each becomes a `$f_<n>` parameter returned
/// alongside the condition. Property names are prefixed and quoted with
/// [`sanitize`].
pub struct CypherFilterMapper<'a> {
    node: &'a str,
    prefix: &'a str,
    parameters: Map<String, Value>,
}

impl<'a> CypherFilterMapper<'a> {
    pub fn new(node: &'a str, prefix: &'a str) -> Self {
        Self {
            node,
            prefix,
            parameters: Map::new(),
        }
    }

    /// Returns the condition and the parameters it references.
    pub fn map(mut self, filter: &Filter) -> Result<(String, Map<String, Value>), VectorStoreError> {
        filter.validate()?;
        let condition = self.condition(filter);
        Ok((condition, self.parameters))
    }

    fn property(&self, key: &str) -> String {
        format!("{}.{}", self.node, sanitize(&format!("{}{}", self.prefix, key)))
    }

    fn param(&mut self, value: Value) -> String {
        let name = format!("f_{}", self.parameters.len());
        self.parameters.insert(name.clone(), value);
        format!("${}", name)
    }

    fn compare(&mut self, key: &str, op: &str, value: &Value) -> String {
        let property = self.property(key);
        let param = self.param(value.clone());
        format!("{} {} {}", property, op, param)
    }

    fn condition(&mut self, filter: &Filter) -> String {
        match filter {
            Filter::IsEqualTo { key, value } => self.compare(key, "=", value),
            Filter::IsNotEqualTo { key, value } => {
                let property = self.property(key);
                let param = self.param(value.clone());
                format!("({p} IS NULL OR {p} <> {})", param, p = property)
            }
            Filter::IsGreaterThan { key, value } => self.compare(key, ">", value),
            Filter::IsGreaterThanOrEqualTo { key, value } => self.compare(key, ">=", value),
            Filter::IsLessThan { key, value } => self.compare(key, "<", value),
            Filter::IsLessThanOrEqualTo { key, value } => self.compare(key, "<=", value),
            Filter::IsIn { key, values } => self.compare(key, "IN", &Value::from(values.clone())),
            Filter::IsNotIn { key, values } => {
                let property = self.property(key);
                let param = self.param(Value::from(values.clone()));
                format!("({p} IS NULL OR NOT {p} IN {})", param, p = property)
            }
            Filter::ContainsString { key, value } => {
                let property = self.property(key);
                let param = self.param(Value::from(value.as_str()));
                // CONTAINS on a non-string property yields null, which WHERE drops.
                format!("{} CONTAINS {}", property, param)
            }
            Filter::And { left, right } => {
                let left = self.condition(left);
                let right = self.condition(right);
                format!("({} AND {})", left, right)
            }
            Filter::Or { left, right } => {
                let left = self.condition(left);
                let right = self.condition(right);
                format!("({} OR {})", left, right)
            }
            Filter::Not { filter } => format!("NOT ({})", self.condition(filter)),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("Document"), "`Document`");
        assert_eq!(sanitize("my label"), "`my label`");
        assert_eq!(sanitize("a`b"), "`a``b`");
        assert_eq!(sanitize("x` RETURN 1 //"), "`x`` RETURN 1 //`");
        assert_eq!(sanitize("a\\u0060b"), "`a``b`");
    }

    #[test]
    fn test_equal_to_is_parameterized() {
        let (condition, params) = CypherFilterMapper::new("node", "")
            .map(&Filter::eq("category", "news"))
            .unwrap();
        assert_eq!(condition, "node.`category` = $f_0");
        assert_eq!(params["f_0"], json!("news"));
        assert!(!condition.contains("news"));
    }

    #[test]
    fn test_nested_filter() {
        let filter = Filter::and(
            Filter::or(Filter::gte("year", 2020), Filter::is_in("tag", ["a", "b"])),
            Filter::not(Filter::contains("title", "draft")),
        );
        let (condition, params) = CypherFilterMapper::new("n", "meta_").map(&filter).unwrap();
        assert_eq!(
            condition,
            "((n.`meta_year` >= $f_0 OR n.`meta_tag` IN $f_1) AND NOT (n.`meta_title` CONTAINS $f_2))"
        );
        assert_eq!(params["f_0"], json!(2020));
        assert_eq!(params["f_1"], json!(["a", "b"]));
        assert_eq!(params["f_2"], json!("draft"));
    }

    #[test]
    fn test_negations_match_missing_properties() {
        let (condition, _) = CypherFilterMapper::new("n", "")
            .map(&Filter::and(Filter::ne("a", 1), Filter::not_in("b", [1, 2])))
            .unwrap();
        assert_eq!(
            condition,
            "((n.`a` IS NULL OR n.`a` <> $f_0) AND (n.`b` IS NULL OR NOT n.`b` IN $f_1))"
        );
    }

    #[test]
    fn test_hostile_key_stays_quoted() {
        let (condition, params) = CypherFilterMapper::new("n", "")
            .map(&Filter::eq("x`) DETACH DELETE n //", "v'\""))
            .unwrap();
        assert_eq!(condition, "n.`x``) DETACH DELETE n //` = $f_0");
        assert_eq!(params["f_0"], json!("v'\""));
    }

    #[test]
    fn test_invalid_filter_rejected() {
        assert!(matches!(
            CypherFilterMapper::new("n", "").map(&Filter::is_in("k", Vec::<Value>::new())),
            Err(VectorStoreError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_escape_lucene() {
        assert_eq!(escape_lucene("a+b (c)"), "a\\+b \\(c\\)");
    }
}
