use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZhipuError {
    #[error("Zhipu API error: Invalid parameter - {0}")]
    InvalidParameterError(String),

    #[error("Zhipu API error: Invalid API Key - {0}")]
    InvalidApiKeyError(String),

    #[error("Zhipu API error: Model not found - {0}")]
    ModelNotFoundError(String),

    #[error("Zhipu API error: Rate limit exceeded - {0}")]
    RateLimitError(String),

    #[error("Zhipu API error: Insufficient balance - {0}")]
    InsufficientBalanceError(String),

    #[error("Zhipu API error: Sensitive content - {0}")]
    SensitiveContentError(String),

    #[error("Zhipu API error: Internal error - {0}")]
    InternalError(String),

    #[error("Zhipu API error: System error - {0}")]
    SystemError(String),
}

impl ZhipuError {
    /// Maps the numeric business code of `{"error": {"code", "message"}}`,
    /// falling back to the HTTP status.
    pub fn from_response(status: u16, code: Option<&str>, message: &str) -> Self {
        let message = match code {
            Some(code) => format!("{}: {}", code, message),
            None => message.to_string(),
        };
        match code.unwrap_or_default() {
            "1000" | "1001" | "1002" | "1003" | "1004" => {
                return ZhipuError::InvalidApiKeyError(message)
            }
            "1113" => return ZhipuError::InsufficientBalanceError(message),
            "1211" | "1221" | "1222" => return ZhipuError::ModelNotFoundError(message),
            "1301" => return ZhipuError::SensitiveContentError(message),
            "1302" | "1303" | "1304" | "1305" => return ZhipuError::RateLimitError(message),
            "1210" | "1214" | "1261" => return ZhipuError::InvalidParameterError(message),
            _ => {}
        }
        match status {
            400 => ZhipuError::InvalidParameterError(message),
            401 => ZhipuError::InvalidApiKeyError(message),
            404 => ZhipuError::ModelNotFoundError(message),
            429 => ZhipuError::RateLimitError(message),
            500 => ZhipuError::InternalError(message),
            _ => ZhipuError::SystemError(message),
        }
    }
}
