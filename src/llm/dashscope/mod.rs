pub mod client;
pub mod error;
pub mod models;

pub use client::Qwen;
pub use error::QwenError;
pub use models::QwenModel;
