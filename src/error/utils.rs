use std::{collections::BTreeMap, fmt};

use crate::{
    llm::{QwenError, XinferenceError, ZhipuError},
    vectorstore::VectorStoreError,
};

use super::{LLMError, LangChainError};

/// Numeric codes for logs and metrics, grouped by module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// LLM (1000-1999)
    LLMError = 1000,
    LLMTimeout = 1001,
    LLMRateLimit = 1002,
    LLMInvalidResponse = 1003,
    LLMAuthentication = 1004,
    LLMModelNotFound = 1005,
    LLMInvalidRequest = 1006,
    LLMContentFiltered = 1007,

    /// Embedding and scoring (2000-2999)
    EmbedderError = 2000,
    ScoringError = 2100,

    /// Vector store (6000-6999)
    VectorStoreError = 6000,
    VectorStoreConnectionError = 6001,
    VectorStoreQueryError = 6002,
    VectorStoreInvalidFilter = 6003,

    /// Tools (8000-8999)
    ToolError = 8000,
    ToolExecutionError = 8001,
    ToolValidationError = 8002,
    ToolTimeout = 8003,
    SandboxUnavailable = 8100,
    SandboxResourceLimit = 8101,

    /// General (9000-9999)
    ConfigurationError = 9000,
    IOError = 9001,
    JsonError = 9002,
    UnknownError = 9999,
}

fn llm_code(error: &LLMError) -> ErrorCode {
    match error {
        LLMError::QwenError(QwenError::RateLimitError(_))
        | LLMError::XinferenceError(XinferenceError::RateLimitError(_))
        | LLMError::ZhipuError(ZhipuError::RateLimitError(_)) => ErrorCode::LLMRateLimit,
        LLMError::QwenError(QwenError::InvalidApiKeyError(_))
        | LLMError::XinferenceError(XinferenceError::UnauthorizedError(_))
        | LLMError::ZhipuError(ZhipuError::InvalidApiKeyError(_)) => ErrorCode::LLMAuthentication,
        LLMError::QwenError(QwenError::ModelNotFoundError(_))
        | LLMError::XinferenceError(XinferenceError::ModelNotFoundError(_))
        | LLMError::ZhipuError(ZhipuError::ModelNotFoundError(_)) => ErrorCode::LLMModelNotFound,
        LLMError::QwenError(QwenError::InvalidParameterError(_))
        | LLMError::XinferenceError(XinferenceError::InvalidParameterError(_))
        | LLMError::ZhipuError(ZhipuError::InvalidParameterError(_)) => {
            ErrorCode::LLMInvalidRequest
        }
        LLMError::QwenError(QwenError::DataInspectionFailed(_))
        | LLMError::ZhipuError(ZhipuError::SensitiveContentError(_)) => {
            ErrorCode::LLMContentFiltered
        }
        LLMError::Timeout(_) => ErrorCode::LLMTimeout,
        LLMError::SerdeError(_) | LLMError::ContentNotFound(_) | LLMError::ParsingError(_) => {
            ErrorCode::LLMInvalidResponse
        }
        _ => ErrorCode::LLMError,
    }
}

fn vectorstore_code(error: &VectorStoreError) -> ErrorCode {
    match error {
        VectorStoreError::InvalidFilter(_) => ErrorCode::VectorStoreInvalidFilter,
        #[cfg(feature = "neo4j")]
        VectorStoreError::Neo4jError(crate::vectorstore::neo4j::Neo4jError::RequestError(_)) => {
            ErrorCode::VectorStoreConnectionError
        }
        #[cfg(feature = "neo4j")]
        VectorStoreError::Neo4jError(_) => ErrorCode::VectorStoreQueryError,
        #[cfg(feature = "yugabytedb")]
        VectorStoreError::YugabyteDBError(_) => ErrorCode::VectorStoreQueryError,
        _ => ErrorCode::VectorStoreError,
    }
}

#[cfg(feature = "docker")]
fn docker_code(error: &super::DockerExecutionError) -> ErrorCode {
    use super::DockerErrorKind;

    match error.kind {
        DockerErrorKind::DockerNotAvailable
        | DockerErrorKind::ImageNotFound
        | DockerErrorKind::ImagePullFailed => ErrorCode::SandboxUnavailable,
        DockerErrorKind::ResourceLimitExceeded | DockerErrorKind::OutputLimitExceeded => {
            ErrorCode::SandboxResourceLimit
        }
        DockerErrorKind::ExecutionTimeout => ErrorCode::ToolTimeout,
        DockerErrorKind::InvalidConfiguration => ErrorCode::ConfigurationError,
        DockerErrorKind::ContainerCreateFailed | DockerErrorKind::ExecutionFailed => {
            ErrorCode::ToolExecutionError
        }
    }
}

impl ErrorCode {
    pub fn from_error(error: &LangChainError) -> Self {
        use crate::tools::ToolError;

        match error {
            LangChainError::LLMError(e) => llm_code(e),
            LangChainError::EmbedderError(_) => ErrorCode::EmbedderError,
            LangChainError::ScoringError(_) => ErrorCode::ScoringError,
            LangChainError::VectorStoreError(e) => vectorstore_code(e),
            LangChainError::ToolError(ToolError::ExecutionError(_)) => {
                ErrorCode::ToolExecutionError
            }
            LangChainError::ToolError(
                ToolError::InvalidInputError(_)
                | ToolError::ParsingError(_),
            ) => ErrorCode::ToolValidationError,
            LangChainError::ToolError(ToolError::TimeoutError(_)) => ErrorCode::ToolTimeout,
            LangChainError::ToolError(ToolError::ResourceLimitError(_)) => {
                ErrorCode::SandboxResourceLimit
            }
            LangChainError::ToolError(_) => ErrorCode::ToolError,
            #[cfg(feature = "docker")]
            LangChainError::DockerExecutionError(e) => docker_code(e),
            LangChainError::ConfigurationError(_) => ErrorCode::ConfigurationError,
            LangChainError::IOError(_) => ErrorCode::IOError,
            LangChainError::JsonError(_) => ErrorCode::JsonError,
            LangChainError::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::LLMError => "LLM operation failed",
            ErrorCode::LLMTimeout => "LLM request timed out",
            ErrorCode::LLMRateLimit => "LLM rate limit exceeded",
            ErrorCode::LLMInvalidResponse => "LLM returned invalid response",
            ErrorCode::LLMAuthentication => "LLM credentials rejected",
            ErrorCode::LLMModelNotFound => "LLM model not found",
            ErrorCode::LLMInvalidRequest => "LLM rejected the request parameters",
            ErrorCode::LLMContentFiltered => "LLM content was filtered",
            ErrorCode::EmbedderError => "Embedding operation failed",
            ErrorCode::ScoringError => "Scoring operation failed",
            ErrorCode::VectorStoreError => "Vector store operation failed",
            ErrorCode::VectorStoreConnectionError => "Vector store connection failed",
            ErrorCode::VectorStoreQueryError => "Vector store query failed",
            ErrorCode::VectorStoreInvalidFilter => "Vector store filter is invalid",
            ErrorCode::ToolError => "Tool operation failed",
            ErrorCode::ToolExecutionError => "Tool execution failed",
            ErrorCode::ToolValidationError => "Tool validation failed",
            ErrorCode::ToolTimeout => "Tool timed out",
            ErrorCode::SandboxUnavailable => "Code sandbox unavailable",
            ErrorCode::SandboxResourceLimit => "Code sandbox resource limit exceeded",
            ErrorCode::ConfigurationError => "Configuration error",
            ErrorCode::IOError => "IO operation failed",
            ErrorCode::JsonError => "JSON parsing/serialization failed",
            ErrorCode::UnknownError => "Unknown error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}: {}", self.as_u32(), self.description())
    }
}

/// Where an error happened, for log lines.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub module: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn format(&self) -> String {
        let mut parts = Vec::new();

        if let Some(ref module) = self.module {
            parts.push(format!("module: {}", module));
        }

        if let Some(ref operation) = self.operation {
            parts.push(format!("operation: {}", operation));
        }

        if !self.metadata.is_empty() {
            let metadata_str: Vec<String> = self
                .metadata
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect();
            parts.push(format!("metadata: {}", metadata_str.join(", ")));
        }

        if parts.is_empty() {
            "no context".to_string()
        } else {
            parts.join("; ")
        }
    }
}

pub fn error_context(error: &LangChainError) -> ErrorContext {
    let module = match error {
        LangChainError::LLMError(LLMError::QwenError(_)) => "llm::dashscope",
        LangChainError::LLMError(LLMError::XinferenceError(_)) => "llm::xinference",
        LangChainError::LLMError(LLMError::ZhipuError(_)) => "llm::zhipu",
        LangChainError::LLMError(_) => "llm",
        LangChainError::EmbedderError(_) => "embedding",
        LangChainError::ScoringError(_) => "scoring",
        #[cfg(feature = "neo4j")]
        LangChainError::VectorStoreError(VectorStoreError::Neo4jError(_)) => "vectorstore::neo4j",
        #[cfg(feature = "yugabytedb")]
        LangChainError::VectorStoreError(VectorStoreError::YugabyteDBError(_)) => {
            "vectorstore::yugabytedb"
        }
        LangChainError::VectorStoreError(_) => "vectorstore",
        LangChainError::ToolError(_) => "tools",
        #[cfg(feature = "docker")]
        LangChainError::DockerExecutionError(_) => "tools::docker",
        _ => return ErrorContext::new(),
    };
    ErrorContext::new().with_module(module)
}

/// Code, message and context of an error on one line.
///
/// ```rust,ignore
/// use langchain_ai_rust_community::error::{error_info, LangChainError};
///
/// let error = LangChainError::ConfigurationError("invalid config".to_string());
/// println!("{}", error_info(&error));
/// ```
pub fn error_info(error: &LangChainError) -> String {
    let code = ErrorCode::from_error(error);
    let context = error_context(error);

    format!("[{}] {} [{}]", code, error, context.format())
}
