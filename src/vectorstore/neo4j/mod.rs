mod builder;
mod client;
mod cypher;
mod error;
#[allow(clippy::module_inception)]
mod neo4j;

pub use builder::*;
pub use client::*;
pub use cypher::{escape_lucene, sanitize, validate_name, CypherFilterMapper};
pub use error::*;
pub use neo4j::*;
