//! Server-sent events decoding shared by the streaming chat clients.
//!
//! The vendor streams differ only in where a chunk keeps its text, tool-call
//! deltas and usage, so each client supplies a [`ChunkParser`] and reuses the
//! decoding and accumulation here.

use std::pin::Pin;

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::{
    language_models::{options::StreamingFunc, FinishReason, GenerateResult, LLMError, TokenUsage},
    schemas::{StreamData, ToolCallAccumulator},
};

/// The parts of one streamed chunk the accumulator cares about.
#[derive(Debug, Default)]
pub struct ChunkParts<'a> {
    pub content: Option<&'a str>,
    pub tool_calls: Option<&'a Value>,
    pub finish_reason: Option<&'a str>,
    pub usage: Option<TokenUsage>,
}

impl ChunkParts<'_> {
    fn is_empty(&self) -> bool {
        self.content.map_or(true, str::is_empty)
            && self.tool_calls.is_none()
            && self.finish_reason.is_none()
            && self.usage.is_none()
    }
}

/// Vendor-specific view of a streamed chunk.
pub trait ChunkParser: Send + Sync + 'static {
    fn parse(value: &Value) -> ChunkParts<'_>;

    /// Returns an error when the event reports a failure instead of a chunk.
    fn error(event: &Event, value: &Value) -> Option<LLMError>;
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamData, LLMError>> + Send>>;

/// Turns an HTTP response carrying SSE into a stream of [`StreamData`].
pub fn chat_stream<P: ChunkParser>(response: reqwest::Response) -> ChatStream {
    parse_events::<P, _, _>(response.bytes_stream())
}

fn parse_events<P, S, B>(bytes: S) -> ChatStream
where
    P: ChunkParser,
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let stream = bytes.eventsource().filter_map(|event| async move {
        let event = match event {
            Ok(event) => event,
            Err(EventStreamError::Transport(e)) => return Some(Err(LLMError::RequestError(e))),
            Err(e) => {
                return Some(Err(LLMError::ParsingError(format!(
                    "Malformed SSE stream: {}",
                    e
                ))))
            }
        };
        let data = event.data.trim();
        if data.is_empty() || data == "[DONE]" {
            return None;
        }
        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                return Some(Err(LLMError::ParsingError(format!(
                    "Failed to parse SSE data: {}, data: {}",
                    e, data
                ))))
            }
        };
        if let Some(err) = P::error(&event, &value) {
            return Some(Err(err));
        }
        let parts = P::parse(&value);
        if parts.is_empty() {
            return None;
        }
        let content = parts.content.unwrap_or_default().to_string();
        let usage = parts.usage.clone();
        Some(Ok(StreamData::new(value, usage, content)))
    });
    Box::pin(stream)
}

/// Drains a chat stream into a [`GenerateResult`], forwarding text to the
/// streaming callback as it arrives.
pub async fn collect_stream<P: ChunkParser>(
    mut stream: ChatStream,
    func: &StreamingFunc,
) -> Result<GenerateResult, LLMError> {
    let mut generation = String::new();
    let mut tool_calls = ToolCallAccumulator::new();
    let mut tokens = None;
    let mut finish_reason = None;

    while let Some(data) = stream.next().await {
        let data = data?;
        let parts = P::parse(&data.value);
        if let Some(calls) = parts.tool_calls {
            tool_calls.push_delta(calls);
        }
        if let Some(reason) = parts.finish_reason {
            finish_reason = FinishReason::from_wire(reason).or(finish_reason);
        }
        if parts.usage.is_some() {
            tokens = parts.usage;
        }
        if !data.content.is_empty() {
            generation.push_str(&data.content);
            let mut func = func.lock().await;
            let _ = func(data.content).await;
        }
    }

    Ok(GenerateResult {
        tokens,
        generation,
        tool_calls: tool_calls.finish(),
        finish_reason,
    })
}

/// Reads `{prompt_tokens, completion_tokens, total_tokens}` usage blocks.
pub fn openai_usage(usage: &Value) -> Option<TokenUsage> {
    let prompt = usage.get("prompt_tokens")?.as_u64()? as u32;
    let completion = usage
        .get("completion_tokens")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let total = usage
        .get("total_tokens")
        .and_then(Value::as_u64)
        .map(|t| t as u32)
        .unwrap_or(prompt + completion);
    Some(TokenUsage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}
