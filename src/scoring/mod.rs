mod error;
pub use error::*;

mod scoring_model;
pub use scoring_model::*;

pub mod dashscope;
pub use dashscope::QwenScoringModel;

pub mod xinference;
pub use xinference::XinferenceScoringModel;

use serde::Deserialize;

/// One `{index, relevance_score}` entry of a rerank response.
#[derive(Deserialize, Debug)]
pub(crate) struct RerankResult {
    pub index: usize,
    pub relevance_score: f64,
}

/// Puts rerank results back into the order of the submitted segments.
pub(crate) fn scores_by_index(
    results: Vec<RerankResult>,
    count: usize,
) -> Result<Vec<f64>, ScoringError> {
    let mut scores = vec![None; count];
    for result in results {
        let slot = scores
            .get_mut(result.index)
            .ok_or(ScoringError::IndexOutOfRange(result.index))?;
        *slot = Some(result.relevance_score);
    }
    scores
        .into_iter()
        .enumerate()
        .map(|(i, s)| s.ok_or(ScoringError::MissingScore(i)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: usize, relevance_score: f64) -> RerankResult {
        RerankResult {
            index,
            relevance_score,
        }
    }

    #[test]
    fn test_scores_restored_to_segment_order() {
        let scores = scores_by_index(vec![result(2, 0.9), result(0, 0.5), result(1, 0.1)], 3);
        assert_eq!(scores.unwrap(), vec![0.5, 0.1, 0.9]);
    }

    #[test]
    fn test_missing_and_out_of_range() {
        assert!(matches!(
            scores_by_index(vec![result(0, 0.5)], 2),
            Err(ScoringError::MissingScore(1))
        ));
        assert!(matches!(
            scores_by_index(vec![result(5, 0.5)], 2),
            Err(ScoringError::IndexOutOfRange(5))
        ));
    }
}
