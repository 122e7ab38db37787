use thiserror::Error;

#[derive(Error, Debug)]
pub enum Neo4jError {
    #[error("Neo4j request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Neo4j error {code}: {message}")]
    DatabaseError { code: String, message: String },

    #[error("Neo4j returned HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    #[error("Invalid Neo4j URI '{0}': only http and https are supported")]
    InvalidUri(String),

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unexpected Neo4j response: {0}")]
    InvalidResponse(String),
}
