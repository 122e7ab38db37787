use std::sync::Arc;

use crate::embedding::Embedder;

/// Per-call options shared by the vector stores.
///
/// `F` is the filter type of the store; both stores in this crate use
/// [`Filter`](super::Filter).
pub struct VecStoreOptions<F> {
    pub name_space: Option<String>,
    pub score_threshold: Option<f32>,
    pub filters: Option<F>,
    pub embedder: Option<Arc<dyn Embedder>>,
    /// Ids for the documents of the next `add_documents` call, one per
    /// document. Writing an existing id replaces that entry.
    pub ids: Option<Vec<String>>,
}

impl<F> Default for VecStoreOptions<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> VecStoreOptions<F> {
    pub fn new() -> Self {
        VecStoreOptions {
            name_space: None,
            score_threshold: None,
            filters: None,
            embedder: None,
            ids: None,
        }
    }

    pub fn with_name_space<S: Into<String>>(mut self, name_space: S) -> Self {
        self.name_space = Some(name_space.into());
        self
    }

    /// Minimum relevance score in `[0, 1]` a result must reach.
    pub fn with_score_threshold(mut self, score_threshold: f32) -> Self {
        self.score_threshold = Some(score_threshold);
        self
    }

    pub fn with_filters(mut self, filters: F) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn with_embedder<E: Embedder + 'static>(mut self, embedder: E) -> Self {
        self.embedder = Some(Arc::new(embedder));
        self
    }

    pub fn with_ids<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }
}
