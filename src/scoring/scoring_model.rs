use async_trait::async_trait;

use super::ScoringError;

/// Scores text segments against a query, typically with a cross-encoder
/// reranking model.
#[async_trait]
pub trait ScoringModel: Send + Sync {
    /// Returns one score per segment, in the order the segments were given.
    async fn score_all(&self, query: &str, segments: &[String]) -> Result<Vec<f64>, ScoringError>;

    async fn score(&self, query: &str, text: &str) -> Result<f64, ScoringError> {
        self.score_all(query, &[text.to_string()])
            .await?
            .pop()
            .ok_or(ScoringError::MissingScore(0))
    }
}
