use strum_macros::Display;
use thiserror::Error;

use crate::tools::ToolError;

/// Failure classes of a sandboxed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DockerErrorKind {
    DockerNotAvailable,
    ImageNotFound,
    ImagePullFailed,
    ContainerCreateFailed,
    ExecutionTimeout,
    ExecutionFailed,
    OutputLimitExceeded,
    ResourceLimitExceeded,
    InvalidConfiguration,
}

#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct DockerExecutionError {
    pub kind: DockerErrorKind,
    pub message: String,
    /// Exit code of the container process, when it ran.
    pub exit_code: Option<i64>,
}

impl DockerExecutionError {
    pub fn new<S: Into<String>>(kind: DockerErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            exit_code: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: i64) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    pub fn invalid_configuration<S: Into<String>>(message: S) -> Self {
        Self::new(DockerErrorKind::InvalidConfiguration, message)
    }

    pub fn kind(&self) -> DockerErrorKind {
        self.kind
    }
}

impl From<DockerExecutionError> for ToolError {
    fn from(error: DockerExecutionError) -> Self {
        match error.kind {
            DockerErrorKind::InvalidConfiguration => ToolError::ConfigurationError(error.to_string()),
            DockerErrorKind::ExecutionTimeout => ToolError::TimeoutError(error.to_string()),
            DockerErrorKind::DockerNotAvailable
            | DockerErrorKind::ImageNotFound
            | DockerErrorKind::ImagePullFailed => ToolError::ExternalServiceError(error.to_string()),
            DockerErrorKind::ResourceLimitExceeded | DockerErrorKind::OutputLimitExceeded => {
                ToolError::ResourceLimitError(error.to_string())
            }
            DockerErrorKind::ContainerCreateFailed | DockerErrorKind::ExecutionFailed => {
                ToolError::ExecutionError(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_tool_error() {
        let error = DockerExecutionError::new(DockerErrorKind::ExecutionFailed, "exit 1")
            .with_exit_code(1);
        assert_eq!(error.to_string(), "ExecutionFailed: exit 1");
        assert_eq!(error.exit_code, Some(1));

        let tool_error: ToolError =
            DockerExecutionError::new(DockerErrorKind::ExecutionTimeout, "30s").into();
        assert!(matches!(tool_error, ToolError::TimeoutError(_)));

        let tool_error: ToolError =
            DockerExecutionError::new(DockerErrorKind::ResourceLimitExceeded, "oom").into();
        assert!(matches!(tool_error, ToolError::ResourceLimitError(_)));
    }
}
