use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::tools::Tool;

/// Describes a function the model may call, in the OpenAI `tools` shape that
/// DashScope, Xinference and Zhipu all accept.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionDefinition {
    pub fn new(name: &str, description: &str, parameters: Value) -> Self {
        FunctionDefinition {
            name: name.trim().replace(' ', "_"),
            description: description.to_string(),
            parameters,
        }
    }

    pub fn from_langchain_tool(tool: &dyn Tool) -> FunctionDefinition {
        FunctionDefinition::new(&tool.name(), &tool.description(), tool.parameters())
    }

    /// Wire form: `{"type": "function", "function": {...}}`.
    pub fn to_tool_json(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

/// How the model is allowed to use the supplied functions.
#[derive(Clone, Debug, PartialEq)]
pub enum FunctionCallBehavior {
    None,
    Auto,
    /// The model must call at least one function.
    Required,
    /// The model must call the named function.
    Named(String),
}

impl FunctionCallBehavior {
    /// Wire form of `tool_choice`.
    pub fn to_tool_choice(&self) -> Value {
        match self {
            FunctionCallBehavior::None => json!("none"),
            FunctionCallBehavior::Auto => json!("auto"),
            FunctionCallBehavior::Required => json!("required"),
            FunctionCallBehavior::Named(name) => json!({
                "type": "function",
                "function": { "name": name }
            }),
        }
    }
}

/// A function call requested by the model.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as produced by the model.
    pub arguments: String,
}

impl ToolCall {
    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "type": "function",
            "function": {
                "name": self.name,
                "arguments": self.arguments,
            }
        })
    }

    /// Serialises a list of calls into the form stored on an AI message.
    pub fn list_to_json(calls: &[ToolCall]) -> Value {
        Value::Array(calls.iter().map(ToolCall::to_json).collect())
    }
}

/// Accumulates streamed tool-call deltas keyed by their `index`.
///
/// The first delta for an index carries `id` and `function.name`; later
/// deltas append fragments of `function.arguments`.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: Vec<(u64, ToolCall)>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one `tool_calls` array from a delta.
    pub fn push_delta(&mut self, deltas: &Value) {
        let Some(deltas) = deltas.as_array() else {
            return;
        };
        for (position, delta) in deltas.iter().enumerate() {
            let index = delta
                .get("index")
                .and_then(Value::as_u64)
                .unwrap_or(position as u64);
            let slot = match self.calls.iter().position(|(i, _)| *i == index) {
                Some(slot) => slot,
                None => {
                    self.calls.push((index, ToolCall::default()));
                    self.calls.len() - 1
                }
            };
            let call = &mut self.calls[slot].1;
            if let Some(id) = delta.get("id").and_then(Value::as_str) {
                if !id.is_empty() {
                    call.id = id.to_string();
                }
            }
            if let Some(function) = delta.get("function") {
                if let Some(name) = function.get("name").and_then(Value::as_str) {
                    call.name.push_str(name);
                }
                if let Some(arguments) = function.get("arguments") {
                    match arguments {
                        Value::String(s) => call.arguments.push_str(s),
                        Value::Null => {}
                        other => call.arguments.push_str(&other.to_string()),
                    }
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn finish(mut self) -> Vec<ToolCall> {
        self.calls.sort_by_key(|(index, _)| *index);
        self.calls.into_iter().map(|(_, call)| call).collect()
    }
}

/// Parses a non-streamed `tool_calls` array into [`ToolCall`]s.
pub fn parse_tool_calls(value: &Value) -> Vec<ToolCall> {
    let mut acc = ToolCallAccumulator::new();
    acc.push_delta(value);
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulates_streamed_arguments() {
        let mut acc = ToolCallAccumulator::new();
        acc.push_delta(&json!([{
            "index": 0,
            "id": "call_1",
            "type": "function",
            "function": {"name": "get_weather", "arguments": ""}
        }]));
        acc.push_delta(&json!([{"index": 0, "function": {"arguments": "{\"city\":"}}]));
        acc.push_delta(&json!([{"index": 0, "function": {"arguments": "\"Paris\"}"}}]));

        let calls = acc.finish();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "get_weather");
        assert_eq!(calls[0].arguments, "{\"city\":\"Paris\"}");
    }

    #[test]
    fn test_parallel_calls_keep_index_order() {
        let mut acc = ToolCallAccumulator::new();
        acc.push_delta(&json!([{"index": 1, "id": "b", "function": {"name": "second"}}]));
        acc.push_delta(&json!([{"index": 0, "id": "a", "function": {"name": "first"}}]));

        let names: Vec<_> = acc.finish().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_object_arguments_are_encoded() {
        let calls = parse_tool_calls(&json!([{
            "id": "call_9",
            "function": {"name": "add", "arguments": {"a": 1}}
        }]));
        assert_eq!(calls[0].arguments, "{\"a\":1}");
    }

    #[test]
    fn test_tool_choice_wire_form() {
        assert_eq!(FunctionCallBehavior::Auto.to_tool_choice(), json!("auto"));
        assert_eq!(
            FunctionCallBehavior::Named("calc".into()).to_tool_choice(),
            json!({"type": "function", "function": {"name": "calc"}})
        );
    }
}
