mod config;
mod engine;
mod error;
mod tool;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use tool::*;
