pub mod sse;

pub(crate) mod openai_like;

pub mod dashscope;
pub use dashscope::{Qwen, QwenError, QwenModel};

pub mod xinference;
pub use xinference::{Xinference, XinferenceConfig, XinferenceError};

pub mod zhipu;
pub use zhipu::{Zhipu, ZhipuError, ZhipuModel};
