mod dashscope_embedder;
pub use dashscope_embedder::*;
