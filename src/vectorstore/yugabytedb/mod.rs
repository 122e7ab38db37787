mod builder;
mod engine;
mod error;
mod metadata;
mod schema;
mod sql_filter;
#[allow(clippy::module_inception)]
mod yugabytedb;

pub use builder::*;
pub use engine::*;
pub use error::*;
pub use metadata::*;
pub use schema::*;
pub use sql_filter::*;
pub use yugabytedb::*;
