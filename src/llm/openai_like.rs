//! Wire types shared by providers that speak the OpenAI chat-completions
//! dialect (Xinference, Zhipu).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    language_models::{FinishReason, GenerateResult, LLMError, TokenUsage},
    llm::sse::{openai_usage, ChunkParts},
    schemas::{parse_tool_calls, Message, MessageType},
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn from_message(message: &Message) -> Self {
        match message.message_type {
            MessageType::SystemMessage => Self::new("system", &message.content),
            MessageType::HumanMessage => Self::new("user", &message.content),
            MessageType::AIMessage => Self {
                tool_calls: message.tool_calls.clone(),
                ..Self::new("assistant", &message.content)
            },
            MessageType::ToolMessage => Self {
                tool_call_id: message.id.clone(),
                ..Self::new("tool", &message.content)
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Value>,
}

impl ChatResponse {
    pub fn into_generate_result(self) -> Result<GenerateResult, LLMError> {
        let tokens: Option<TokenUsage> = self.usage.as_ref().and_then(openai_usage);
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ContentNotFound("choices[0].message".to_string()))?;
        Ok(GenerateResult {
            tokens,
            generation: choice.message.content.unwrap_or_default(),
            tool_calls: choice
                .message
                .tool_calls
                .as_ref()
                .map(parse_tool_calls)
                .unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .as_deref()
                .and_then(FinishReason::from_wire),
        })
    }
}

/// Reads `choices[0].delta` and the optional trailing `usage` of a chunk.
pub(crate) fn parse_chunk(value: &Value) -> ChunkParts<'_> {
    let choice = value.pointer("/choices/0");
    let delta = choice.and_then(|c| c.get("delta"));
    ChunkParts {
        content: delta.and_then(|d| d.get("content")).and_then(Value::as_str),
        tool_calls: delta
            .and_then(|d| d.get("tool_calls"))
            .filter(|t| t.is_array()),
        finish_reason: choice
            .and_then(|c| c.get("finish_reason"))
            .and_then(Value::as_str),
        usage: value.get("usage").and_then(openai_usage),
    }
}

#[derive(Serialize, Debug)]
pub(crate) struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct EmbeddingData {
    #[serde(default)]
    pub index: usize,
    pub embedding: Vec<f64>,
}

impl EmbeddingResponse {
    /// Returns the vectors in input order.
    pub fn into_vectors(mut self) -> Vec<Vec<f64>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_ai_message_keeps_tool_calls() {
        let calls = json!([{"id": "c1", "type": "function", "function": {"name": "f", "arguments": "{}"}}]);
        let msg = ChatMessage::from_message(&Message::new_ai_message("").with_tool_calls(calls.clone()));
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.tool_calls, Some(calls));
    }

    #[test]
    fn test_embedding_response_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "data": [
                {"index": 1, "embedding": [2.0]},
                {"index": 0, "embedding": [1.0]}
            ]
        }))
        .unwrap();
        assert_eq!(response.into_vectors(), vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn test_parse_chunk_reads_delta() {
        let value = json!({
            "choices": [{"index": 0, "delta": {"content": "hi"}, "finish_reason": null}]
        });
        let parts = parse_chunk(&value);
        assert_eq!(parts.content, Some("hi"));
        assert!(parts.finish_reason.is_none());
    }
}
