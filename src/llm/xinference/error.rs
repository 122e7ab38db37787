use thiserror::Error;

#[derive(Error, Debug)]
pub enum XinferenceError {
    #[error("Xinference API error: Invalid parameter - {0}")]
    InvalidParameterError(String),

    #[error("Xinference API error: Unauthorized - {0}")]
    UnauthorizedError(String),

    #[error("Xinference API error: Model not found - {0}")]
    ModelNotFoundError(String),

    #[error("Xinference API error: Rate limit exceeded - {0}")]
    RateLimitError(String),

    #[error("Xinference API error: Internal error - {0}")]
    InternalError(String),

    #[error("Xinference API error: Model Unavailable - {0}")]
    ModelUnavailableError(String),

    #[error("Xinference API error: System error - {0}")]
    SystemError(String),
}

impl XinferenceError {
    pub fn from_status(status: u16, message: &str) -> Self {
        let message = message.to_string();
        match status {
            400 | 422 => XinferenceError::InvalidParameterError(message),
            401 | 403 => XinferenceError::UnauthorizedError(message),
            404 => XinferenceError::ModelNotFoundError(message),
            429 => XinferenceError::RateLimitError(message),
            500 => XinferenceError::InternalError(message),
            503 => XinferenceError::ModelUnavailableError(message),
            _ => XinferenceError::SystemError(message),
        }
    }
}
