use std::string::String;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::ToolError;

#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool.
    fn name(&self) -> String;

    /// Provides a description of what the tool does and when to use it.
    fn description(&self) -> String;

    /// JSON schema of the input, as used by OpenAI-like function calling.
    ///
    /// ```json
    /// {
    ///     "type": "object",
    ///     "properties": {
    ///         "input": { "type": "string", "description": "..." }
    ///     },
    ///     "required": ["input"]
    /// }
    /// ```
    ///
    /// The default is a single string `input` described by
    /// [`Tool::description`].
    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input": {
                    "type": "string",
                    "description": self.description()
                }
            },
            "required": ["input"]
        })
    }

    /// Parses the raw input with [`Tool::parse_input`] and runs the tool.
    async fn call(&self, input: &str) -> Result<String, ToolError> {
        let input = self.parse_input(input).await;
        self.run(input).await
    }

    /// Executes the core functionality of the tool.
    async fn run(&self, input: Value) -> Result<String, ToolError>;

    /// Parses the input string, which could be a JSON value or a raw string, depending on the LLM model.
    ///
    /// The default unwraps `{"input": "..."}` and otherwise passes the text
    /// through as a string.
    async fn parse_input(&self, input: &str) -> Value {
        log::debug!("Using default input parsing: {}", input);
        match serde_json::from_str::<Value>(input) {
            Ok(value) => match value.get("input").and_then(Value::as_str) {
                Some(inner) => Value::String(inner.to_string()),
                None => Value::String(value.to_string()),
            },
            Err(_) => Value::String(input.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> String {
            "echo".to_string()
        }

        fn description(&self) -> String {
            "Echoes the input".to_string()
        }

        async fn run(&self, input: Value) -> Result<String, ToolError> {
            input
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| ToolError::InvalidInputError("expected a string".to_string()))
        }
    }

    #[tokio::test]
    async fn test_default_parse_input() {
        assert_eq!(Echo.call(r#"{"input": "hi"}"#).await.unwrap(), "hi");
        assert_eq!(Echo.call("plain text").await.unwrap(), "plain text");
        assert_eq!(Echo.call(r#"{"x": 1}"#).await.unwrap(), r#"{"x":1}"#);
        assert_eq!(
            Echo.parameters()["properties"]["input"]["description"],
            "Echoes the input"
        );
    }
}
