mod dashscope_scoring;
pub use dashscope_scoring::*;
