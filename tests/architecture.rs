//! Architecture tests
//!
//! Public surface: error unification, error codes and type aliases.

use langchain_ai_rust_community::error::{error_info, ErrorCode, LangChainError};

#[test]
fn test_error_unification() {
    let error: LangChainError =
        langchain_ai_rust_community::vectorstore::VectorStoreError::DeleteNotSupported.into();
    assert!(matches!(error, LangChainError::VectorStoreError(_)));

    let error: LangChainError = langchain_ai_rust_community::language_models::LLMError::from(
        langchain_ai_rust_community::llm::QwenError::RateLimitError("busy".to_string()),
    )
    .into();
    assert_eq!(ErrorCode::from_error(&error), ErrorCode::LLMRateLimit);
}

#[test]
fn test_error_code_system() {
    let error = LangChainError::ConfigurationError("test".to_string());
    let code = ErrorCode::from_error(&error);
    assert_eq!(code, ErrorCode::ConfigurationError);
    assert_eq!(code.as_u32(), 9000);
}

#[test]
fn test_error_info() {
    let error = LangChainError::ConfigurationError("test config".to_string());
    let info = error_info(&error);
    assert!(info.contains("E9000"));
    assert!(info.contains("test config"));
}

#[test]
fn test_type_aliases() {
    use langchain_ai_rust_community::{Documents, Messages, Tools};

    let _tools: Tools = vec![];
    let _messages: Messages = vec![];
    let _documents: Documents = vec![];
}

#[cfg(feature = "docker")]
#[test]
fn test_docker_tool_is_a_tool() {
    use langchain_ai_rust_community::tools::{DockerCodeExecutionTool, DockerExecutionConfig};

    let tool = DockerCodeExecutionTool::new(DockerExecutionConfig::default()).unwrap();
    let tools: langchain_ai_rust_community::Tools = vec![std::sync::Arc::new(tool)];
    assert_eq!(tools[0].name(), "docker_code_execution");
}
