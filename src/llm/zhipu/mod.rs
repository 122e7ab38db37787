pub mod client;
pub mod error;
pub mod models;

pub use client::Zhipu;
pub use error::ZhipuError;
pub use models::ZhipuModel;
