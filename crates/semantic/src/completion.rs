//! Streaming chat completions over an OpenAI-compatible API.
//!
//! The upstream response is read as server-sent events. Every event carries
//! a JSON chunk whose `choices[0].delta.content` is the next text fragment;
//! the literal `[DONE]` event ends the stream. Dropping a
//! [`CompletionStream`] drops the underlying HTTP response, which cancels the
//! upstream generation.

use std::pin::Pin;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{CompletionConfig, SemanticError};

/// Incremental text fragments in arrival order.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, SemanticError>> + Send>>;

/// One message of a chat prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A fully assembled prompt ready to be sent upstream.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Overrides the client's configured key for this request only.
    pub api_key: Option<String>,
}

/// A service that answers chat prompts as a stream of text fragments.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Start a generation. Errors before the first byte are returned here;
    /// errors after that surface as an `Err` item on the stream.
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream, SemanticError>;
}

/// [`CompletionClient`] for `/chat/completions` with `stream: true`.
pub struct OpenAiCompletionClient {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl OpenAiCompletionClient {
    pub fn new(cfg: &CompletionConfig) -> Result<Self, SemanticError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", cfg.api_base.trim_end_matches('/')),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
        })
    }
}

#[derive(Serialize)]
struct StreamingRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// What a single SSE `data:` payload means for the caller.
#[derive(Debug, PartialEq, Eq)]
enum StreamEvent {
    Fragment(String),
    Skip,
    Done,
}

fn parse_event_data(data: &str) -> Result<StreamEvent, SemanticError> {
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(StreamEvent::Done);
    }
    if data.is_empty() {
        return Ok(StreamEvent::Skip);
    }

    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| SemanticError::Decode(format!("completion chunk: {e}")))?;

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map_or(StreamEvent::Skip, StreamEvent::Fragment))
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn stream_chat(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<CompletionStream, SemanticError> {
        let api_key = request
            .api_key
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
            .ok_or_else(|| {
                SemanticError::InvalidConfig("no API key for completion request".into())
            })?;

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "starting streaming completion"
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&StreamingRequest {
                model: &request.model,
                messages: &request.messages,
                stream: true,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(%status, "completion API error");
            return Err(SemanticError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let events = response.bytes_stream().eventsource();
        let fragments = stream! {
            futures::pin_mut!(events);
            while let Some(event) = events.next().await {
                let parsed = event
                    .map_err(|e| SemanticError::Stream(e.to_string()))
                    .and_then(|event| parse_event_data(&event.data));
                match parsed {
                    Ok(StreamEvent::Fragment(text)) => yield Ok(text),
                    Ok(StreamEvent::Skip) => {}
                    Ok(StreamEvent::Done) => break,
                    Err(err) => {
                        error!(error = %err, "completion stream aborted");
                        yield Err(err);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(fragments))
    }
}
