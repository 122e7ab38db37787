use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schemas::{Message, MessageType};

/// Qwen models served by DashScope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum QwenModel {
    #[strum(serialize = "qwen-turbo")]
    QwenTurbo,
    #[strum(serialize = "qwen-plus")]
    QwenPlus,
    #[strum(serialize = "qwen-max")]
    QwenMax,
    #[strum(serialize = "qwen-long")]
    QwenLong,
    #[strum(serialize = "qwen2.5-72b-instruct")]
    Qwen25_72bInstruct,
    #[strum(serialize = "qwen2.5-coder-32b-instruct")]
    Qwen25Coder32bInstruct,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct QwenMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl QwenMessage {
    pub fn new(role: &str, content: &str) -> Self {
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

#[derive(Serialize, Debug)]
pub(crate) struct Payload {
    pub model: String,
    pub input: Input,
    pub parameters: Parameters,
}

#[derive(Serialize, Debug)]
pub(crate) struct Input {
    pub messages: Vec<QwenMessage>,
}

#[derive(Serialize, Debug, Default)]
pub(crate) struct Parameters {
    pub result_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_search: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental_output: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct ApiResponse {
    pub output: Output,
    pub usage: Option<Usage>,
    #[allow(dead_code)]
    pub request_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Output {
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// Only present when `result_format` is `text`.
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Choice {
    pub finish_reason: Option<String>,
    pub message: ResponseMessage,
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct ResponseMessage {
    #[serde(default)]
    pub content: Value,
    pub tool_calls: Option<Value>,
}

impl ResponseMessage {
    /// Content is a string for text models and a list of `{text}` parts for
    /// multimodal ones.
    pub fn text(&self) -> String {
        content_text(&self.content).unwrap_or_default()
    }
}

pub(crate) fn content_text(content: &Value) -> Option<String> {
    match content {
        Value::String(s) => Some(s.clone()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<String>(),
        ),
        _ => None,
    }
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct Usage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    pub total_tokens: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ErrorResponse {
    pub code: Option<String>,
    pub message: String,
}
