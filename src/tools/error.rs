use thiserror::Error;

/// Failures a tool reports back to its caller.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Execution failed: {0}")]
    ExecutionError(String),

    #[error("Invalid input: {0}")]
    InvalidInputError(String),

    #[error("Input parsing failed: {0}")]
    ParsingError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    /// The run hit a memory, process or output cap.
    #[error("Resource limit exceeded: {0}")]
    ResourceLimitError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The backing service (Docker daemon, registry) could not be used.
    #[error("External service error: {0}")]
    ExternalServiceError(String),
}

impl ToolError {
    /// Whether retrying the same input could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ToolError::TimeoutError(_) | ToolError::ExternalServiceError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(ToolError::TimeoutError("30s".into()).is_transient());
        assert!(ToolError::ExternalServiceError("daemon down".into()).is_transient());
        assert!(!ToolError::InvalidInputError("empty code".into()).is_transient());
        assert!(!ToolError::ResourceLimitError("oom".into()).is_transient());
    }
}
