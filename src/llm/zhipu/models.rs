use serde::Serialize;
use serde_json::Value;

use crate::llm::openai_like::ChatMessage;

/// GLM models served by the Zhipu open platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ZhipuModel {
    #[strum(serialize = "glm-4-flash")]
    Glm4Flash,
    #[strum(serialize = "glm-4-air")]
    Glm4Air,
    #[strum(serialize = "glm-4-plus")]
    Glm4Plus,
    #[strum(serialize = "glm-4-long")]
    Glm4Long,
    #[strum(serialize = "glm-4")]
    Glm4,
}

#[derive(Serialize, Debug)]
pub(crate) struct Payload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}
