use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schemas::ToolCall;

pub mod llm;
pub mod options;

mod error;
pub use error::*;

/// Result of a non-streamed generation.
///
/// `tool_calls` is non-empty when the model asked for functions to be called
/// instead of (or in addition to) producing text.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct GenerateResult {
    pub tokens: Option<TokenUsage>,
    pub generation: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl GenerateResult {
    pub fn to_hashmap(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();

        map.insert("generation".to_string(), self.generation.clone());

        if let Some(ref tokens) = self.tokens {
            map.insert(
                "prompt_tokens".to_string(),
                tokens.prompt_tokens.to_string(),
            );
            map.insert(
                "completion_tokens".to_string(),
                tokens.completion_tokens.to_string(),
            );
            map.insert("total_tokens".to_string(), tokens.total_tokens.to_string());
        }

        map
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn sum(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens + other.prompt_tokens,
            completion_tokens: self.completion_tokens + other.completion_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Why the model stopped producing output.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    /// The provider's content filter stopped the generation.
    ContentFilter,
    Other,
}

impl FinishReason {
    /// Maps the `finish_reason` strings used by DashScope, Xinference and Zhipu.
    pub fn from_wire(reason: &str) -> Option<Self> {
        match reason {
            "" | "null" => None,
            "stop" | "eos" => Some(FinishReason::Stop),
            "length" => Some(FinishReason::Length),
            "tool_calls" | "function_call" => Some(FinishReason::ToolCalls),
            "content_filter" | "sensitive" => Some(FinishReason::ContentFilter),
            _ => Some(FinishReason::Other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_sum() {
        let a = TokenUsage::new(10, 5);
        let b = TokenUsage::new(1, 2);
        assert_eq!(a.sum(&b), TokenUsage::new(11, 7));
    }

    #[test]
    fn test_finish_reason_from_wire() {
        assert_eq!(FinishReason::from_wire("stop"), Some(FinishReason::Stop));
        assert_eq!(
            FinishReason::from_wire("sensitive"),
            Some(FinishReason::ContentFilter)
        );
        assert_eq!(FinishReason::from_wire("null"), None);
    }
}
