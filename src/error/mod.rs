//! Crate-wide error type.
//!
//! Every module keeps its own `thiserror` enum; [`LangChainError`] wraps them
//! so callers mixing integrations can propagate with `?`.

mod utils;
pub use utils::*;

pub use crate::embedding::EmbedderError;
pub use crate::language_models::LLMError;
pub use crate::scoring::ScoringError;
#[cfg(feature = "docker")]
pub use crate::tools::docker::{DockerErrorKind, DockerExecutionError};
pub use crate::tools::ToolError;
pub use crate::vectorstore::VectorStoreError;

#[derive(thiserror::Error, Debug)]
pub enum LangChainError {
    #[error("LLM error: {0}")]
    LLMError(#[from] LLMError),

    #[error("Embedder error: {0}")]
    EmbedderError(#[from] EmbedderError),

    #[error("Scoring error: {0}")]
    ScoringError(#[from] ScoringError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] VectorStoreError),

    #[error("Tool error: {0}")]
    ToolError(#[from] ToolError),

    #[cfg(feature = "docker")]
    #[error("Docker execution error: {0}")]
    DockerExecutionError(#[from] DockerExecutionError),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, LangChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_conversion() {
        let error: LangChainError = ToolError::ExecutionError("test execution".to_string()).into();
        assert!(matches!(error, LangChainError::ToolError(_)));
    }

    #[test]
    fn test_vectorstore_error_conversion() {
        let error: LangChainError = VectorStoreError::DeleteNotSupported.into();
        assert!(matches!(error, LangChainError::VectorStoreError(_)));
    }

    #[test]
    fn test_embedder_error_conversion() {
        let error: LangChainError = EmbedderError::MismatchedCount {
            expected: 2,
            actual: 1,
        }
        .into();
        assert!(matches!(error, LangChainError::EmbedderError(_)));
    }
}
