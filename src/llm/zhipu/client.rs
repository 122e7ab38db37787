use async_trait::async_trait;
use eventsource_stream::Event;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::{
    language_models::{llm::LLM, options::CallOptions, FinishReason, GenerateResult, LLMError},
    llm::{
        openai_like::{parse_chunk, ChatMessage, ChatResponse},
        sse::{chat_stream, collect_stream, ChatStream, ChunkParser, ChunkParts},
        ZhipuError,
    },
    schemas::{FunctionCallBehavior, Message},
};

use super::models::Payload;

pub(crate) const DEFAULT_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4";

/// Finish reason Zhipu reports when inference broke off server-side.
const NETWORK_ERROR: &str = "network_error";

/// Reads `ZHIPU_API_KEY` and `ZHIPU_BASE_URL`.
pub(crate) fn env_credentials() -> (SecretString, String) {
    let api_key = std::env::var("ZHIPU_API_KEY").unwrap_or_default();
    let base_url = std::env::var("ZHIPU_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string();
    (SecretString::from(api_key), base_url)
}

fn error_from_value(status: u16, value: &Value) -> Option<ZhipuError> {
    let error = value.get("error")?;
    let code = match error.get("code") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error");
    Some(ZhipuError::from_response(status, code.as_deref(), message))
}

pub(crate) async fn error_from_response(res: reqwest::Response) -> ZhipuError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| error_from_value(status, &v))
        .unwrap_or_else(|| {
            let message = if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body
            };
            ZhipuError::from_response(status, None, &message)
        })
}

/// Chat client for GLM models on the Zhipu open platform.
///
/// The API key is sent as a bearer token, which the v4 API accepts directly.
#[derive(Clone)]
pub struct Zhipu {
    model: String,
    options: CallOptions,
    api_key: SecretString,
    base_url: String,
    do_sample: Option<bool>,
    user_id: Option<String>,
    client: Client,
}

impl Default for Zhipu {
    fn default() -> Self {
        Self::new()
    }
}

impl Zhipu {
    pub fn new() -> Self {
        let (api_key, base_url) = env_credentials();
        Self {
            model: super::ZhipuModel::Glm4Flash.to_string(),
            options: CallOptions::default(),
            api_key,
            base_url,
            do_sample: None,
            user_id: None,
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

    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `false` makes decoding greedy; temperature and top_p are then ignored.
    pub fn with_do_sample(mut self, do_sample: bool) -> Self {
        self.do_sample = Some(do_sample);
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub(crate) fn build_payload(&self, messages: &[Message], stream: bool) -> Payload {
        let options = &self.options;
        // Zhipu only accepts "auto" for tool_choice.
        let tool_choice = match &options.function_call_behavior {
            Some(FunctionCallBehavior::None) | None => None,
            Some(_) => Some(FunctionCallBehavior::Auto.to_tool_choice()),
        };
        Payload {
            model: self.model.clone(),
            messages: messages.iter().map(ChatMessage::from_message).collect(),
            request_id: Some(new_request_id()),
            do_sample: self.do_sample,
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stop: options.stop_words.clone(),
            tools: options
                .functions
                .as_ref()
                .map(|fs| fs.iter().map(|f| f.to_tool_json()).collect()),
            tool_choice,
            user_id: self.user_id.clone(),
            stream: stream.then_some(true),
        }
    }

    fn request(&self, payload: &Payload) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(payload);
        if let Some(timeout) = self.options.timeout {
            request = request.timeout(std::time::Duration::from_secs(timeout));
        }
        request
    }

    async fn generate(&self, messages: &[Message]) -> Result<GenerateResult, LLMError> {
        let payload = self.build_payload(messages, false);
        log::debug!("Zhipu request: model={} messages={}", self.model, messages.len());
        let res = self.request(&payload).send().await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        let response = res.json::<ChatResponse>().await?;
        if response
            .choices
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            == Some(NETWORK_ERROR)
        {
            return Err(ZhipuError::SystemError("generation interrupted: network_error".into()).into());
        }
        let result = response.into_generate_result()?;
        if result.finish_reason == Some(FinishReason::ContentFilter) {
            log::warn!("Zhipu stopped generation: content flagged as sensitive");
        }
        Ok(result)
    }
}

fn new_request_id() -> String {
    format!("lc-{}", uuid::Uuid::new_v4().simple())
}

pub(crate) struct ZhipuChunk;

impl ChunkParser for ZhipuChunk {
    fn parse(value: &Value) -> ChunkParts<'_> {
        parse_chunk(value)
    }

    fn error(_event: &Event, value: &Value) -> Option<LLMError> {
        if let Some(error) = error_from_value(500, value) {
            return Some(LLMError::ZhipuError(error));
        }
        let reason = value.pointer("/choices/0/finish_reason")?.as_str()?;
        (reason == NETWORK_ERROR).then(|| {
            LLMError::ZhipuError(ZhipuError::SystemError(
                "generation interrupted: network_error".into(),
            ))
        })
    }
}

#[async_trait]
impl LLM for Zhipu {
    async fn generate(&self, messages: &[Message]) -> Result<GenerateResult, LLMError> {
        match &self.options.streaming_func {
            Some(func) => {
                let stream = self.stream(messages).await?;
                collect_stream::<ZhipuChunk>(stream, func).await
            }
            None => self.generate(messages).await,
        }
    }

    async fn stream(&self, messages: &[Message]) -> Result<ChatStream, LLMError> {
        let payload = self.build_payload(messages, true);
        let res = self
            .request(&payload)
            .header("Accept", "text/event-stream")
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await.into());
        }
        Ok(chat_stream::<ZhipuChunk>(res))
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
    use crate::{language_models::TokenUsage, schemas::FunctionDefinition};

    fn client(server: &mockito::ServerGuard) -> Zhipu {
        Zhipu::new()
            .with_api_key("id.secret")
            .with_base_url(server.url())
    }

    #[test]
    fn test_tool_choice_forced_to_auto() {
        let zhipu = Zhipu::new().with_options(
            CallOptions::new()
                .with_functions(vec![FunctionDefinition::new("f", "d", json!({}))])
                .with_function_call_behavior(FunctionCallBehavior::Required),
        );
        let payload =
            serde_json::to_value(zhipu.build_payload(&[Message::new_human_message("x")], false))
                .unwrap();
        assert_eq!(payload["tool_choice"], "auto");
        assert_eq!(payload["model"], "glm-4-flash");
        assert!(payload["request_id"].as_str().unwrap().starts_with("lc-"));
        assert!(payload.get("stream").is_none());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| new_request_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.len() == 35));
    }

    #[tokio::test]
    async fn test_generate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer id.secret")
            .match_body(Matcher::PartialJson(json!({"do_sample": false})))
            .with_body(
                json!({
                    "id": "8311",
                    "created": 1703487403,
                    "model": "glm-4-flash",
                    "choices": [{
                        "index": 0,
                        "finish_reason": "stop",
                        "message": {"role": "assistant", "content": "你好"}
                    }],
                    "usage": {"prompt_tokens": 8, "completion_tokens": 2, "total_tokens": 10}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let result = LLM::generate(
            &client(&server).with_do_sample(false),
            &[Message::new_human_message("hi")],
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(result.generation, "你好");
        assert_eq!(result.tokens, Some(TokenUsage::new(8, 2)));
    }

    #[tokio::test]
    async fn test_sensitive_content_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_body(r#"{"error":{"code":"1301","message":"系统检测到输入或生成内容可能包含不安全或敏感内容"}}"#)
            .create_async()
            .await;

        let err = client(&server).invoke("x").await.unwrap_err();
        assert!(matches!(
            err,
            LLMError::ZhipuError(ZhipuError::SensitiveContentError(_))
        ));
    }

    #[tokio::test]
    async fn test_network_error_finish_reason() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_body(
                json!({
                    "choices": [{
                        "index": 0,
                        "finish_reason": "network_error",
                        "message": {"role": "assistant", "content": ""}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client(&server).invoke("x").await.unwrap_err();
        assert!(matches!(err, LLMError::ZhipuError(ZhipuError::SystemError(_))));
    }

    #[tokio::test]
    async fn test_stream() {
        let mut server = mockito::Server::new_async().await;
        let body = "data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"1\"}}]}\n\n\
                    data: {\"id\":\"1\",\"choices\":[{\"index\":0,\"finish_reason\":\"stop\",\"delta\":{\"role\":\"assistant\",\"content\":\"2\"}}],\"usage\":{\"prompt_tokens\":1,\"completion_tokens\":2,\"total_tokens\":3}}\n\n\
                    data: [DONE]\n\n";
        server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({"stream": true})))
            .with_body(body)
            .create_async()
            .await;

        let chunks: Vec<_> = client(&server)
            .stream(&[Message::new_human_message("count")])
            .await
            .unwrap()
            .collect()
            .await;
        let chunks: Vec<_> = chunks.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "1");
        assert_eq!(chunks[1].tokens, Some(TokenUsage::new(1, 2)));
    }
}
