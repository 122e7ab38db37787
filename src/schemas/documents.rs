use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A piece of text with metadata, as stored in and returned by vector stores.
///
/// `score` is only meaningful on search results; it holds the relevance score
/// in `[0, 1]` reported by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub page_content: String,
    pub metadata: HashMap<String, Value>,
    pub score: f64,
}

impl Document {
    pub fn new<S: Into<String>>(page_content: S) -> Self {
        Document {
            page_content: page_content.into(),
            metadata: HashMap::new(),
            score: 0.0,
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a single metadata entry.
    pub fn with_metadata_entry<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new("")
    }
}
