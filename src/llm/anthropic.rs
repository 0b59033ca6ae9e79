//! Anthropic Claude provider implementation (streaming Messages API)

use super::sse::{SseEvent, SseParser};
use super::types::*;
use super::{LlmError, LlmService};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt::Display;
use std::time::Duration;

/// Anthropic model variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnthropicModel {
    Claude4Sonnet,
    Claude35Haiku,
}

impl AnthropicModel {
    pub fn api_name(self) -> &'static str {
        match self {
            AnthropicModel::Claude4Sonnet => "claude-sonnet-4-20250514",
            AnthropicModel::Claude35Haiku => "claude-3-5-haiku-20241022",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            AnthropicModel::Claude4Sonnet => "claude-4-sonnet",
            AnthropicModel::Claude35Haiku => "claude-3.5-haiku",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        [AnthropicModel::Claude4Sonnet, AnthropicModel::Claude35Haiku]
            .into_iter()
            .find(|model| model.model_id() == id || model.api_name() == id)
    }
}

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    model: AnthropicModel,
    base_url: String,
}

impl AnthropicService {
    pub fn new(
        api_key: String,
        model: AnthropicModel,
        gateway: Option<&str>,
    ) -> Result<Self, LlmError> {
        let base_url = match gateway {
            Some(gw) => format!("{}/_/gateway/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let system = request
            .system
            .iter()
            .map(|s| AnthropicSystemBlock {
                r#type: "text",
                text: s.text.clone(),
                cache_control: s.cache.then_some(CacheControl { r#type: "ephemeral" }),
            })
            .collect();

        let messages = request
            .messages
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                },
                content: m.text.clone(),
            })
            .collect();

        let tools: Vec<AnthropicTool> = request
            .tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect();

        AnthropicRequest {
            model: self.model.api_name(),
            max_tokens: request.max_tokens.unwrap_or(4096),
            system,
            messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
            stream: true,
        }
    }
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::auth(format!("Authentication failed: {body}")),
        429 => match serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.pointer("/error/retry_after").and_then(Value::as_f64))
        {
            Some(secs) => LlmError::rate_limit(format!("Rate limited, retry after {secs}s: {body}")),
            None => LlmError::rate_limit(format!("Rate limited: {body}")),
        },
        400 => LlmError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => LlmError::server_error(format!("Server error: {body}")),
        _ => LlmError::unknown(format!("HTTP {status}: {body}")),
    }
}

fn classify_stream_error(error: &WireError) -> LlmError {
    let message = format!("{}: {}", error.kind, error.message);
    match error.kind.as_str() {
        "authentication_error" | "permission_error" => LlmError::auth(message),
        "rate_limit_error" => LlmError::rate_limit(message),
        "overloaded_error" | "api_error" => LlmError::server_error(message),
        "invalid_request_error" => LlmError::invalid_request(message),
        _ => LlmError::unknown(message),
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn stream(&self, request: &LlmRequest) -> Result<LlmStream, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;
            return Err(classify_error(status, &body));
        }

        Ok(decode_body(Box::pin(response.bytes_stream())))
    }

    fn model_id(&self) -> &str {
        self.model.model_id()
    }
}

/// Turn a raw SSE response body into a chunk stream.
///
/// The stream ends after the first error or after `message_stop`.
fn decode_body<S, B, E>(body: S) -> LlmStream
where
    S: Stream<Item = Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = BodyState {
        body,
        parser: SseParser::new(),
        decoder: StreamDecoder::default(),
        queue: VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                if item.is_err() {
                    st.queue.clear();
                    st.done = true;
                }
                return Some((item, st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(bytes)) => {
                    for event in st.parser.push(bytes.as_ref()) {
                        let chunks = st.decoder.handle(&event);
                        st.queue.extend(chunks);
                    }
                }
                Some(Err(e)) => {
                    st.queue
                        .push_back(Err(LlmError::network(format!("Stream interrupted: {e}"))));
                }
                None => {
                    st.done = true;
                    if let Some(event) = std::mem::take(&mut st.parser).finish() {
                        let chunks = st.decoder.handle(&event);
                        st.queue.extend(chunks);
                    }
                    if !st.decoder.finished {
                        st.queue.push_back(Err(LlmError::network(
                            "Stream ended before message_stop",
                        )));
                    }
                }
            }
        }
    })
    .boxed()
}

struct BodyState<S> {
    body: S,
    parser: SseParser,
    decoder: StreamDecoder,
    queue: VecDeque<Result<LlmChunk, LlmError>>,
    done: bool,
}

#[derive(Debug)]
struct PartialToolUse {
    id: String,
    name: String,
    initial: Value,
    json: String,
}

/// Folds Anthropic stream events into [`LlmChunk`]s
#[derive(Debug, Default)]
struct StreamDecoder {
    tool_blocks: HashMap<usize, PartialToolUse>,
    usage: Usage,
    finished: bool,
}

impl StreamDecoder {
    fn handle(&mut self, event: &SseEvent) -> Vec<Result<LlmChunk, LlmError>> {
        if self.finished || event.data.is_empty() {
            return vec![];
        }
        let wire: WireEvent = match serde_json::from_str(&event.data) {
            Ok(wire) => wire,
            Err(e) => {
                return vec![Err(LlmError::invalid_response(format!(
                    "Unparseable stream event: {e}"
                )))]
            }
        };

        match wire {
            WireEvent::MessageStart { message } => {
                self.usage.input_tokens = message.usage.input_tokens;
                self.usage.cache_creation_tokens =
                    message.usage.cache_creation_input_tokens.unwrap_or(0);
                self.usage.cache_read_tokens = message.usage.cache_read_input_tokens.unwrap_or(0);
                vec![]
            }
            WireEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                WireBlockStart::Text { text } if !text.is_empty() => {
                    vec![Ok(LlmChunk::TextDelta(text))]
                }
                WireBlockStart::ToolUse { id, name, input } => {
                    self.tool_blocks.insert(
                        index,
                        PartialToolUse {
                            id,
                            name,
                            initial: input,
                            json: String::new(),
                        },
                    );
                    vec![]
                }
                _ => vec![],
            },
            WireEvent::ContentBlockDelta { index, delta } => match delta {
                WireDelta::TextDelta { text } => vec![Ok(LlmChunk::TextDelta(text))],
                WireDelta::InputJsonDelta { partial_json } => {
                    match self.tool_blocks.get_mut(&index) {
                        Some(block) => {
                            block.json.push_str(&partial_json);
                            vec![]
                        }
                        None => vec![Err(LlmError::invalid_response(format!(
                            "Tool input delta for unknown block {index}"
                        )))],
                    }
                }
                WireDelta::Other => vec![],
            },
            WireEvent::ContentBlockStop { index } => match self.tool_blocks.remove(&index) {
                Some(block) => vec![finish_tool_use(block)],
                None => vec![],
            },
            WireEvent::MessageDelta { usage } => {
                if let Some(usage) = usage {
                    self.usage.output_tokens = usage.output_tokens;
                }
                vec![]
            }
            WireEvent::MessageStop => {
                self.finished = true;
                vec![Ok(LlmChunk::Finished { usage: self.usage })]
            }
            WireEvent::Error { error } => vec![Err(classify_stream_error(&error))],
            WireEvent::Ping | WireEvent::Unknown => vec![],
        }
    }
}

fn finish_tool_use(block: PartialToolUse) -> Result<LlmChunk, LlmError> {
    let input = if block.json.trim().is_empty() {
        block.initial
    } else {
        serde_json::from_str(&block.json).map_err(|e| {
            LlmError::invalid_response(format!(
                "Malformed input for tool '{}': {e}",
                block.name
            ))
        })?
    };
    Ok(LlmChunk::ToolUse {
        id: block.id,
        name: block.name,
        input,
    })
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: &'static str,
    max_tokens: u32,
    system: Vec<AnthropicSystemBlock>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    r#type: &'static str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<CacheControl>,
}

#[derive(Debug, Serialize)]
struct CacheControl {
    r#type: &'static str,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    MessageStart {
        message: WireMessageStart,
    },
    ContentBlockStart {
        index: usize,
        content_block: WireBlockStart,
    },
    ContentBlockDelta {
        index: usize,
        delta: WireDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<WireUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: WireError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct WireMessageStart {
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlockStart {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    cache_creation_input_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}
