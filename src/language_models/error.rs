use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use tokio::time::error::Elapsed;

use crate::llm::{QwenError, XinferenceError, ZhipuError};

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("Qwen error: {0}")]
    QwenError(#[from] QwenError),

    #[error("Xinference error: {0}")]
    XinferenceError(#[from] XinferenceError),

    #[error("Zhipu error: {0}")]
    ZhipuError(#[from] ZhipuError),

    #[error("Network request failed: {0}")]
    RequestError(#[from] ReqwestError),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] SerdeJsonError),

    #[error("Operation timed out")]
    Timeout(#[from] Elapsed),

    #[error("Content not found in response: Expected at {0}")]
    ContentNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Error: {0}")]
    OtherError(String),
}
