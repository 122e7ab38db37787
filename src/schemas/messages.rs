use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message in a chat exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[strum(serialize = "system")]
    SystemMessage,
    #[strum(serialize = "human")]
    HumanMessage,
    #[strum(serialize = "ai")]
    AIMessage,
    #[strum(serialize = "tool")]
    ToolMessage,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::HumanMessage
    }
}

/// A chat message.
///
/// For tool messages `id` carries the id of the tool call being answered. AI
/// messages that requested tools carry the raw tool calls in `tool_calls`, an
/// array of `{id, type, function: {name, arguments}}` objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub content: String,
    pub message_type: MessageType,
    pub id: Option<String>,
    pub tool_calls: Option<Value>,
}

impl Message {
    pub fn new_human_message<T: std::fmt::Display>(content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::HumanMessage,
            id: None,
            tool_calls: None,
        }
    }

    pub fn new_system_message<T: std::fmt::Display>(content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::SystemMessage,
            id: None,
            tool_calls: None,
        }
    }

    pub fn new_ai_message<T: std::fmt::Display>(content: T) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::AIMessage,
            id: None,
            tool_calls: None,
        }
    }

    pub fn new_tool_message<T: std::fmt::Display, S: Into<String>>(content: T, id: S) -> Self {
        Message {
            content: content.to_string(),
            message_type: MessageType::ToolMessage,
            id: Some(id.into()),
            tool_calls: None,
        }
    }

    pub fn with_tool_calls(mut self, tool_calls: Value) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }
}
