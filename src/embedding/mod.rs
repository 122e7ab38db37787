mod error;
pub use error::*;

pub mod embedder_trait;
pub use embedder_trait::*;

pub mod dashscope;
pub use dashscope::QwenEmbedder;

pub mod xinference;
pub use xinference::XinferenceEmbedder;

pub mod zhipu;
pub use zhipu::ZhipuEmbedder;
