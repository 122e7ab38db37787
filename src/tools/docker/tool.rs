use std::collections::BTreeMap;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::{Tool, ToolError};

use super::{DockerCodeExecutionEngine, DockerExecutionConfig, DockerExecutionError};

/// Image and interpreter used for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreset {
    pub image: String,
    pub file_extension: String,
    pub command: String,
}

impl LanguagePreset {
    pub fn new(image: &str, file_extension: &str, command: &str) -> Self {
        Self {
            image: image.to_string(),
            file_extension: file_extension.to_string(),
            command: command.to_string(),
        }
    }
}

fn default_presets() -> BTreeMap<String, LanguagePreset> {
    BTreeMap::from([
        (
            "python".to_string(),
            LanguagePreset::new("python:3.12-slim", "py", "python3"),
        ),
        (
            "javascript".to_string(),
            LanguagePreset::new("node:20-slim", "js", "node"),
        ),
        ("bash".to_string(), LanguagePreset::new("bash:5", "sh", "bash")),
        (
            "ruby".to_string(),
            LanguagePreset::new("ruby:3.3-slim", "rb", "ruby"),
        ),
    ])
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CodeExecutionInput {
    /// Source code to run. Print the result to stdout.
    pub code: String,
    /// Language of the code.
    pub language: Option<String>,
}

/// Lets a model run code in a locked-down container.
///
/// Failures come back as text so the model can read and fix its code.
pub struct DockerCodeExecutionTool {
    engine: DockerCodeExecutionEngine,
    presets: BTreeMap<String, LanguagePreset>,
    default_language: String,
}

impl DockerCodeExecutionTool {
    pub fn new(config: DockerExecutionConfig) -> Result<Self, DockerExecutionError> {
        Ok(Self {
            engine: DockerCodeExecutionEngine::new(config)?,
            presets: default_presets(),
            default_language: "python".to_string(),
        })
    }

    /// Adds or replaces a language preset.
    pub fn with_preset<S: Into<String>>(mut self, language: S, preset: LanguagePreset) -> Self {
        self.presets.insert(language.into().to_lowercase(), preset);
        self
    }

    pub fn with_default_language<S: Into<String>>(mut self, language: S) -> Self {
        self.default_language = language.into().to_lowercase();
        self
    }

    pub fn engine(&self) -> &DockerCodeExecutionEngine {
        &self.engine
    }

    fn preset(&self, language: Option<&str>) -> Result<&LanguagePreset, ToolError> {
        let language = language
            .map(str::to_lowercase)
            .unwrap_or_else(|| self.default_language.clone());
        let language = match language.as_str() {
            "py" | "python3" => "python",
            "js" | "node" => "javascript",
            "sh" | "shell" => "bash",
            other => other,
        };
        self.presets.get(language).ok_or_else(|| {
            ToolError::InvalidInputError(format!(
                "unsupported language {:?}, expected one of {}",
                language,
                self.presets.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

#[async_trait]
impl Tool for DockerCodeExecutionTool {
    fn name(&self) -> String {
        "docker_code_execution".to_string()
    }

    fn description(&self) -> String {
        format!(
            "Runs code in an isolated container without network access and returns what it prints \
             to stdout. Supported languages: {}.",
            self.presets.keys().cloned().collect::<Vec<_>>().join(", ")
        )
    }

    fn parameters(&self) -> Value {
        let mut schema = serde_json::to_value(schemars::schema_for!(CodeExecutionInput))
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
        if let Some(language) = schema.pointer_mut("/properties/language") {
            language["enum"] = self.presets.keys().cloned().collect();
        }
        schema
    }

    async fn parse_input(&self, input: &str) -> Value {
        match serde_json::from_str::<Value>(input) {
            Ok(value) if value.is_object() => value,
            _ => serde_json::json!({ "code": input }),
        }
    }

    async fn run(&self, input: Value) -> Result<String, ToolError> {
        let input: CodeExecutionInput = match input {
            Value::String(code) => CodeExecutionInput {
                code,
                language: None,
            },
            value => serde_json::from_value(value)
                .map_err(|e| ToolError::ParsingError(e.to_string()))?,
        };
        let preset = self.preset(input.language.as_deref())?;

        match self
            .engine
            .execute(
                &preset.image,
                &preset.file_extension,
                &input.code,
                &preset.command,
            )
            .await
        {
            Ok(output) => Ok(output),
            Err(e) => Ok(format!("Error ({}): {}", e.kind, e.message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> DockerCodeExecutionTool {
        DockerCodeExecutionTool::new(DockerExecutionConfig::default()).unwrap()
    }

    #[test]
    fn test_presets() {
        let tool = tool().with_preset("go", LanguagePreset::new("golang:1.22", "go", "go run"));
        assert_eq!(tool.preset(None).unwrap().command, "python3");
        assert_eq!(tool.preset(Some("JS")).unwrap().image, "node:20-slim");
        assert_eq!(tool.preset(Some("go")).unwrap().file_extension, "go");
        assert!(matches!(
            tool.preset(Some("cobol")),
            Err(ToolError::InvalidInputError(_))
        ));
    }

    #[test]
    fn test_parameters() {
        let schema = tool().parameters();
        assert_eq!(schema["properties"]["code"]["type"], "string");
        assert!(schema["properties"]["language"]["enum"]
            .as_array()
            .unwrap()
            .contains(&Value::from("python")));
        assert_eq!(schema["required"], serde_json::json!(["code"]));
    }

    #[tokio::test]
    async fn test_parse_input() {
        let tool = tool();
        assert_eq!(
            tool.parse_input(r#"{"code": "print(1)", "language": "python"}"#)
                .await["language"],
            "python"
        );
        assert_eq!(tool.parse_input("print(1)").await["code"], "print(1)");
    }

    #[tokio::test]
    async fn test_unsupported_language_is_an_error() {
        let result = tool()
            .run(serde_json::json!({ "code": "x", "language": "cobol" }))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_as_text() {
        let config = DockerExecutionConfig {
            docker_binary: "/nonexistent/docker".to_string(),
            ..Default::default()
        };
        let tool = DockerCodeExecutionTool::new(config).unwrap();
        let output = tool.call("print(1)").await.unwrap();
        assert!(output.starts_with("Error (DockerNotAvailable)"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_call_python() {
        let output = tool()
            .call(r#"{"code": "print(2+2*10)", "language": "python"}"#)
            .await
            .unwrap();
        assert_eq!(output, "22");
    }
}
