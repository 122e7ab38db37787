use thiserror::Error;

use crate::embedding::EmbedderError;

#[cfg(feature = "neo4j")]
use super::neo4j::Neo4jError;
#[cfg(feature = "yugabytedb")]
use super::yugabytedb::YugabyteDBError;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Embedder error: {0}")]
    EmbedderError(#[from] EmbedderError),

    #[cfg(feature = "neo4j")]
    #[error(transparent)]
    Neo4jError(#[from] Neo4jError),

    #[cfg(feature = "yugabytedb")]
    #[error(transparent)]
    YugabyteDBError(#[from] YugabyteDBError),

    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("This vector store does not support delete")]
    DeleteNotSupported,

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<String> for VectorStoreError {
    fn from(message: String) -> Self {
        VectorStoreError::Unknown(message)
    }
}
