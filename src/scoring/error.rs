use thiserror::Error;

use crate::llm::{QwenError, XinferenceError};

#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("Network request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    QwenError(#[from] QwenError),

    #[error(transparent)]
    XinferenceError(#[from] XinferenceError),

    #[error("No score returned for segment {0}")]
    MissingScore(usize),

    #[error("Score index {0} does not match any segment")]
    IndexOutOfRange(usize),
}
