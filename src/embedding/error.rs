use thiserror::Error;

use crate::llm::{QwenError, XinferenceError, ZhipuError};

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("Network request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    QwenError(#[from] QwenError),

    #[error(transparent)]
    XinferenceError(#[from] XinferenceError),

    #[error(transparent)]
    ZhipuError(#[from] ZhipuError),

    #[error("Expected {expected} embeddings, received {actual}")]
    MismatchedCount { expected: usize, actual: usize },

    #[error("Embedding not found in response: {0}")]
    EmbeddingNotFound(String),
}
