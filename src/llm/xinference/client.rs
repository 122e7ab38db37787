use async_trait::async_trait;
use eventsource_stream::Event;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::{
    language_models::{llm::LLM, options::CallOptions, GenerateResult, LLMError},
    llm::{
        openai_like::{parse_chunk, ChatMessage, ChatResponse},
        sse::{chat_stream, collect_stream, ChatStream, ChunkParser, ChunkParts},
        XinferenceError,
    },
    schemas::Message,
};

use super::models::Payload;

pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost:9997";

/// Connection settings shared by the Xinference chat, embedding and rerank
/// clients.
#[derive(Clone)]
pub struct XinferenceConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub client: Client,
}

impl Default for XinferenceConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl XinferenceConfig {
    /// Reads `XINFERENCE_BASE_URL` and the optional `XINFERENCE_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("XINFERENCE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: std::env::var("XINFERENCE_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            client: Client::new(),
        }
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }
}

/// Reads an Xinference (FastAPI) error body: `{"detail": "..."}`.
pub(crate) async fn error_from_response(res: reqwest::Response) -> XinferenceError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| match v.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body
            }
        });
    XinferenceError::from_status(status, &message)
}

/// Chat client for models launched on an Xinference server.
///
/// `model` is the model UID given at launch time.
#[derive(Clone)]
pub struct Xinference {
    model: String,
    options: CallOptions,
    config: XinferenceConfig,
}

impl Default for Xinference {
    fn default() -> Self {
        Self::new()
    }
}

impl Xinference {
    pub fn new() -> Self {
        Self {
            model: "qwen2.5-instruct".to_string(),
            options: CallOptions::default(),
            config: XinferenceConfig::from_env(),
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

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.config.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.config.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_config(mut self, config: XinferenceConfig) -> Self {
        self.config = config;
        self
    }

    pub(crate) fn build_payload(&self, messages: &[Message]) -> Payload {
        let options = &self.options;
        Payload {
            model: self.model.clone(),
            messages: messages.iter().map(ChatMessage::from_message).collect(),
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            max_tokens: options.max_tokens,
            stop: options.stop_words.clone(),
            seed: options.seed,
            presence_penalty: options.presence_penalty,
            frequency_penalty: options.frequency_penalty,
            tools: options
                .functions
                .as_ref()
                .map(|fs| fs.iter().map(|f| f.to_tool_json()).collect()),
            tool_choice: options
                .function_call_behavior
                .as_ref()
                .map(|b| b.to_tool_choice()),
            stream: None,
            stream_options: None,
        }
    }

    fn request(&self, payload: &Payload) -> reqwest::RequestBuilder {
        let mut request = self.config.post("/v1/chat/completions").json(payload);
        if let Some(timeout) = self.options.timeout {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }
        request
    }

    async fn generate(&self, messages: &[Message]) -> Result<GenerateResult, LLMError> {
        let payload = self.build_payload(messages);
        log::debug!(
            "Xinference request: model={} messages={}",
            self.model,
            messages.len()
        );
        let res = self.request(&payload).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        res.json::<ChatResponse>().await?.into_generate_result()
    }
}

pub(crate) struct XinferenceChunk;

impl ChunkParser for XinferenceChunk {
    fn parse(value: &Value) -> ChunkParts<'_> {
        parse_chunk(value)
    }

    fn error(_event: &Event, value: &Value) -> Option<LLMError> {
        let error = value.get("error")?;
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        let status = error.get("code").and_then(Value::as_u64).unwrap_or(500) as u16;
        Some(LLMError::XinferenceError(XinferenceError::from_status(
            status, &message,
        )))
    }
}

#[async_trait]
impl LLM for Xinference {
    async fn generate(&self, messages: &[Message]) -> Result<GenerateResult, LLMError> {
        match &self.options.streaming_func {
            Some(func) => {
                let stream = self.stream(messages).await?;
                collect_stream::<XinferenceChunk>(stream, func).await
            }
            None => self.generate(messages).await,
        }
    }

    async fn stream(&self, messages: &[Message]) -> Result<ChatStream, LLMError> {
        let payload = self
            .build_payload(messages)
            .stream(self.options.stream_usage.unwrap_or(true));
        let res = self
            .request(&payload)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        Ok(chat_stream::<XinferenceChunk>(res))
    }

    fn add_options(&mut self, options: CallOptions) {
        self.options.merge_options(options)
    }
}
