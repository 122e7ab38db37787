use thiserror::Error;

#[derive(Error, Debug)]
pub enum QwenError {
    #[error("Qwen API error: Invalid parameter - {0}")]
    InvalidParameterError(String),

    #[error("Qwen API error: Invalid API Key - {0}")]
    InvalidApiKeyError(String),

    #[error("Qwen API error: Model not found - {0}")]
    ModelNotFoundError(String),

    #[error("Qwen API error: Rate limit exceeded - {0}")]
    RateLimitError(String),

    #[error("Qwen API error: Data inspection failed - {0}")]
    DataInspectionFailed(String),

    #[error("Qwen API error: Internal error - {0}")]
    InternalError(String),

    #[error("Qwen API error: Model Unavailable - {0}")]
    ModelUnavailableError(String),

    #[error("Qwen API error: System error - {0}")]
    SystemError(String),
}

impl QwenError {
    /// Maps an HTTP status and DashScope error `code` to an error.
    ///
    /// The vendor code wins over the status where it is more specific, e.g.
    /// content moderation failures arrive as 400 `DataInspectionFailed`.
    pub fn from_response(status: u16, code: Option<&str>, message: &str) -> Self {
        let message = match code {
            Some(code) if !code.is_empty() => format!("{}: {}", code, message),
            _ => message.to_string(),
        };
        match code.unwrap_or_default() {
            "InvalidApiKey" => return QwenError::InvalidApiKeyError(message),
            "DataInspectionFailed" => return QwenError::DataInspectionFailed(message),
            "ModelNotFound" | "Model.AccessDenied" => {
                return QwenError::ModelNotFoundError(message)
            }
            c if c.starts_with("Throttling") => return QwenError::RateLimitError(message),
            _ => {}
        }
        match status {
            400 => QwenError::InvalidParameterError(message),
            401 | 403 => QwenError::InvalidApiKeyError(message),
            404 => QwenError::ModelNotFoundError(message),
            429 => QwenError::RateLimitError(message),
            500 => QwenError::InternalError(message),
            503 => QwenError::ModelUnavailableError(message),
            _ => QwenError::SystemError(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_overrides_status() {
        assert!(matches!(
            QwenError::from_response(400, Some("DataInspectionFailed"), "blocked"),
            QwenError::DataInspectionFailed(_)
        ));
        assert!(matches!(
            QwenError::from_response(400, Some("Throttling.RateQuota"), "slow down"),
            QwenError::RateLimitError(_)
        ));
        assert!(matches!(
            QwenError::from_response(400, Some("InvalidParameter"), "bad"),
            QwenError::InvalidParameterError(_)
        ));
    }
}
