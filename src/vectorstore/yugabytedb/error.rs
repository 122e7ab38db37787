use thiserror::Error;

use crate::vectorstore::VectorStoreError;

#[derive(Error, Debug)]
pub enum YugabyteDBError {
    #[error("YugabyteDB request failed: {0}")]
    RequestFailed(#[from] sqlx::Error),

    #[error("Invalid YugabyteDB configuration: {0}")]
    InvalidConfiguration(String),
}

impl From<sqlx::Error> for VectorStoreError {
    fn from(error: sqlx::Error) -> Self {
        VectorStoreError::YugabyteDBError(error.into())
    }
}
