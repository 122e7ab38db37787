mod error;
mod filter;
mod options;

#[cfg(feature = "neo4j")]
pub mod neo4j;

#[cfg(feature = "yugabytedb")]
pub mod yugabytedb;

mod base;
mod vectorstore;

pub use base::{VectorStoreHelpers, VectorStoreInitializable};
pub use error::*;
pub use filter::*;
pub use options::*;
pub use vectorstore::*;
