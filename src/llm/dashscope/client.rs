use async_trait::async_trait;
use eventsource_stream::Event;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::{
    language_models::{
        llm::LLM, options::CallOptions, FinishReason, GenerateResult, LLMError, TokenUsage,
    },
    llm::{
        sse::{chat_stream, collect_stream, ChatStream, ChunkParser, ChunkParts},
        QwenError,
    },
    schemas::{parse_tool_calls, Message},
};

use super::models::{ApiResponse, ErrorResponse, Input, Parameters, Payload, QwenMessage};

pub(crate) const DEFAULT_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";

/// Reads the DashScope API key and base URL from the environment.
pub(crate) fn env_credentials() -> (SecretString, String) {
    let api_key = std::env::var("DASHSCOPE_API_KEY").unwrap_or_default();
    let base_url =
        std::env::var("DASHSCOPE_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    (SecretString::from(api_key), base_url)
}

/// Reads a DashScope error body `{code, message, request_id}`.
pub(crate) async fn error_from_response(res: reqwest::Response) -> QwenError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(e) => QwenError::from_response(status, e.code.as_deref(), &e.message),
        Err(_) if body.is_empty() => {
            QwenError::from_response(status, None, &format!("HTTP {}", status))
        }
        Err(_) => QwenError::from_response(status, None, &body),
    }
}

fn qwen_usage(usage: &Value) -> Option<TokenUsage> {
    let input = usage.get("input_tokens")?.as_u64()? as u32;
    let output = usage
        .get("output_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let mut tokens = TokenUsage::new(input, output);
    if let Some(total) = usage.get("total_tokens").and_then(Value::as_u64) {
        tokens.total_tokens = total as u32;
    }
    Some(tokens)
}

/// Chat client for Qwen models on the native DashScope generation API.
#[derive(Clone)]
pub struct Qwen {
    model: String,
    options: CallOptions,
    api_key: SecretString,
    base_url: String,
    enable_search: Option<bool>,
    client: Client,
}

impl Default for Qwen {
    fn default() -> Self {
        Self::new()
    }
}

impl Qwen {
    /// Creates a client for `qwen-turbo`, reading `DASHSCOPE_API_KEY` and
    /// `DASHSCOPE_BASE_URL` from the environment.
    pub fn new() -> Self {
        let (api_key, base_url) = env_credentials();
        Self {
            model: super::QwenModel::QwenTurbo.to_string(),
            options: CallOptions::default(),
            api_key,
            base_url,
            enable_search: None,
            client: Client::new(),
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = SecretString::from(api_key.into());
        self
    }

    /// Base URL up to and including `/api/v1`.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Lets the model consult web search before answering.
    pub fn with_enable_search(mut self, enable_search: bool) -> Self {
        self.enable_search = Some(enable_search);
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/services/aigc/text-generation/generation",
            self.base_url
        )
    }

    fn request(&self, payload: &Payload) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.url())
            .bearer_auth(self.api_key.expose_secret())
            .json(payload);
        if let Some(timeout) = self.options.timeout {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }
        request
    }

    pub(crate) fn build_payload(&self, messages: &[Message], stream: bool) -> Payload {
        let options = &self.options;
        Payload {
            model: self.model.clone(),
            input: Input {
                messages: messages.iter().map(QwenMessage::from_message).collect(),
            },
            parameters: Parameters {
                result_format: "message",
                temperature: options.temperature,
                top_p: options.top_p,
                top_k: options.top_k,
                max_tokens: options.max_tokens,
                seed: options.seed,
                stop: options.stop_words.clone(),
                repetition_penalty: options.repetition_penalty,
                presence_penalty: options.presence_penalty,
                enable_search: self.enable_search,
                incremental_output: stream.then_some(true),
                tools: options
                    .functions
                    .as_ref()
                    .map(|fs| fs.iter().map(|f| f.to_tool_json()).collect()),
                tool_choice: options
                    .function_call_behavior
                    .as_ref()
                    .map(|b| b.to_tool_choice()),
            },
        }
    }

    async fn generate(&self, messages: &[Message]) -> Result<GenerateResult, LLMError> {
        let payload = self.build_payload(messages, false);
        log::debug!("Qwen request: model={} messages={}", self.model, messages.len());
        let res = self.request(&payload).send().await?;

        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }

        let api_response = res.json::<ApiResponse>().await?;
        let tokens = api_response.usage.map(|u| {
            let mut tokens = TokenUsage::new(u.input_tokens, u.output_tokens);
            if let Some(total) = u.total_tokens {
                tokens.total_tokens = total;
            }
            tokens
        });

        match api_response.output.choices.into_iter().next() {
            Some(choice) => Ok(GenerateResult {
                tokens,
                generation: choice.message.text(),
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
            }),
            None => match api_response.output.text {
                Some(generation) => Ok(GenerateResult {
                    tokens,
                    generation,
                    ..Default::default()
                }),
                None => Err(LLMError::ContentNotFound(
                    "output.choices[0].message".to_string(),
                )),
            },
        }
    }
}

/// Chunks of the DashScope SSE stream have the same shape as a full
/// response, with `incremental_output` making `content` a delta.
pub(crate) struct QwenChunk;

impl ChunkParser for QwenChunk {
    fn parse(value: &Value) -> ChunkParts<'_> {
        let choice = value.pointer("/output/choices/0");
        let message = choice.and_then(|c| c.get("message"));
        ChunkParts {
            content: message
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str),
            tool_calls: message
                .and_then(|m| m.get("tool_calls"))
                .filter(|t| t.is_array()),
            finish_reason: choice
                .and_then(|c| c.get("finish_reason"))
                .and_then(Value::as_str)
                .filter(|r| *r != "null"),
            usage: value.get("usage").and_then(qwen_usage),
        }
    }

    fn error(event: &Event, value: &Value) -> Option<LLMError> {
        let is_error = event.event == "error"
            || (value.get("output").is_none() && value.get("code").is_some());
        if !is_error {
            return None;
        }
        let status = value
            .get("status_code")
            .and_then(Value::as_u64)
            .unwrap_or(500) as u16;
        let code = value.get("code").and_then(Value::as_str);
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("stream error");
        Some(LLMError::QwenError(QwenError::from_response(
            status, code, message,
        )))
    }
}

#[async_trait]
impl LLM for Qwen {
    async fn generate(&self, messages: &[Message]) -> Result<GenerateResult, LLMError> {
        match &self.options.streaming_func {
            Some(func) => {
                let stream = self.stream(messages).await?;
                collect_stream::<QwenChunk>(stream, func).await
            }
            None => self.generate(messages).await,
        }
    }

    async fn stream(&self, messages: &[Message]) -> Result<ChatStream, LLMError> {
        let payload = self.build_payload(messages, true);
        let res = self
            .request(&payload)
            .header("X-DashScope-SSE", "enable")
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }

        Ok(chat_stream::<QwenChunk>(res))
    }

    fn add_options(&mut self, options: CallOptions) {
        self.options.merge_options(options)
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use mockito::Matcher;
    use serde_json::json;

    use super::*;
    use crate::schemas::{FunctionCallBehavior, FunctionDefinition};

    const PATH: &str = "/services/aigc/text-generation/generation";

    fn client(server: &mockito::ServerGuard) -> Qwen {
        Qwen::new()
            .with_api_key("test-key")
            .with_base_url(server.url())
            .with_model("qwen-plus")
    }

    #[test]
    fn test_payload_shape() {
        let qwen = Qwen::new().with_options(
            CallOptions::new()
                .with_temperature(0.3)
                .with_functions(vec![FunctionDefinition::new(
                    "get weather",
                    "Weather for a city",
                    json!({"type": "object"}),
                )])
                .with_function_call_behavior(FunctionCallBehavior::Auto),
        );
        let payload = serde_json::to_value(qwen.build_payload(
            &[
                Message::new_system_message("be brief"),
                Message::new_tool_message("sunny", "call_1"),
            ],
            true,
        ))
        .unwrap();

        assert_eq!(payload["parameters"]["result_format"], "message");
        assert_eq!(payload["parameters"]["incremental_output"], true);
        assert_eq!(payload["parameters"]["tool_choice"], "auto");
        assert_eq!(
            payload["parameters"]["tools"][0]["function"]["name"],
            "get_weather"
        );
        assert_eq!(payload["input"]["messages"][0]["role"], "system");
        assert_eq!(payload["input"]["messages"][1]["role"], "tool");
        assert_eq!(payload["input"]["messages"][1]["tool_call_id"], "call_1");
        assert!(payload["parameters"].get("top_k").is_none());
    }

    #[tokio::test]
    async fn test_generate_parses_message_and_usage() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PATH)
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({
                "model": "qwen-plus",
                "input": {"messages": [{"role": "user", "content": "2+2?"}]}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "output": {"choices": [{
                        "finish_reason": "stop",
                        "message": {"role": "assistant", "content": "4"}
                    }]},
                    "usage": {"input_tokens": 5, "output_tokens": 1, "total_tokens": 6},
                    "request_id": "req-1"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = LLM::generate(&client(&server), &[Message::new_human_message("2+2?")])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.generation, "4");
        assert_eq!(result.finish_reason, Some(FinishReason::Stop));
        assert_eq!(result.tokens, Some(TokenUsage::new(5, 1)));
    }

    #[tokio::test]
    async fn test_generate_returns_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(
                json!({
                    "output": {"choices": [{
                        "finish_reason": "tool_calls",
                        "message": {
                            "role": "assistant",
                            "content": "",
                            "tool_calls": [{
                                "index": 0,
                                "id": "call_abc",
                                "type": "function",
                                "function": {"name": "get_weather", "arguments": "{\"city\":\"Hangzhou\"}"}
                            }]
                        }
                    }]},
                    "usage": {"input_tokens": 20, "output_tokens": 10}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = LLM::generate(&client(&server), &[Message::new_human_message("weather?")])
            .await
            .unwrap();

        assert!(result.has_tool_calls());
        assert_eq!(result.tool_calls[0].id, "call_abc");
        assert_eq!(result.tool_calls[0].arguments, "{\"city\":\"Hangzhou\"}");
        assert_eq!(result.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(result.tokens.unwrap().total_tokens, 30);
    }

    #[tokio::test]
    async fn test_error_body_is_mapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(401)
            .with_body(r#"{"code":"InvalidApiKey","message":"Invalid API-key provided.","request_id":"x"}"#)
            .create_async()
            .await;

        let err = LLM::generate(&client(&server), &[Message::new_human_message("hi")])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LLMError::QwenError(QwenError::InvalidApiKeyError(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_yields_incremental_content() {
        let mut server = mockito::Server::new_async().await;
        let body = [
            r#"{"output":{"choices":[{"message":{"content":"Hel","role":"assistant"},"finish_reason":"null"}]},"usage":{"input_tokens":3,"output_tokens":1}}"#,
            r#"{"output":{"choices":[{"message":{"content":"lo","role":"assistant"},"finish_reason":"stop"}]},"usage":{"input_tokens":3,"output_tokens":2}}"#,
        ]
        .iter()
        .map(|d| format!("id:1\nevent:result\ndata:{}\n\n", d))
        .collect::<String>();
        server
            .mock("POST", PATH)
            .match_header("x-dashscope-sse", "enable")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let mut stream = client(&server)
            .stream(&[Message::new_human_message("hi")])
            .await
            .unwrap();
        let mut text = String::new();
        let mut last_usage = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            text.push_str(&chunk.content);
            last_usage = chunk.tokens.or(last_usage);
        }

        assert_eq!(text, "Hello");
        assert_eq!(last_usage, Some(TokenUsage::new(3, 2)));
    }

    #[tokio::test]
    async fn test_stream_error_event() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body("event:error\ndata:{\"code\":\"DataInspectionFailed\",\"message\":\"inappropriate content\"}\n\n")
            .create_async()
            .await;

        let mut stream = client(&server)
            .stream(&[Message::new_human_message("hi")])
            .await
            .unwrap();
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            LLMError::QwenError(QwenError::DataInspectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_streaming_func_collects_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        let body = [
            r#"{"output":{"choices":[{"message":{"content":"","role":"assistant","tool_calls":[{"index":0,"id":"call_1","type":"function","function":{"name":"add","arguments":"{\"a\":"}}]},"finish_reason":"null"}]}}"#,
            r#"{"output":{"choices":[{"message":{"content":"","role":"assistant","tool_calls":[{"index":0,"function":{"arguments":"1}"}}]},"finish_reason":"tool_calls"}]},"usage":{"input_tokens":9,"output_tokens":4}}"#,
        ]
        .iter()
        .map(|d| format!("data:{}\n\n", d))
        .collect::<String>();
        server
            .mock("POST", PATH)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let qwen = client(&server)
            .with_options(CallOptions::new().with_streaming_func(|_| async { Ok(()) }));
        let result = LLM::generate(&qwen, &[Message::new_human_message("1?")])
            .await
            .unwrap();

        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].name, "add");
        assert_eq!(result.tool_calls[0].arguments, "{\"a\":1}");
        assert_eq!(result.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(result.tokens, Some(TokenUsage::new(9, 4)));
    }

    #[tokio::test]
    #[ignore]
    async fn test_qwen_generate_live() {
        let qwen = Qwen::new();
        let res = qwen.invoke("Hello!").await.unwrap();
        println!("{:?}", res)
    }
}
