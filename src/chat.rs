//! Retrieval-grounded chat.
//!
//! A [`ChatRequest`] names one or two source tags. For each tag the top chunks
//! for the user's question are retrieved, a system prompt is assembled around
//! them and the answer is streamed back from the completion service.
//!
//! One tag asks a question about a single document; two tags ask for a
//! comparison of two routes. Anything else is rejected before any retrieval
//! happens.

use std::fmt;
use std::sync::Arc;

use futures::StreamExt;
use index::{IndexError, SearchHit, VectorStore};
use semantic::{
    ChatCompletionRequest, ChatMessage, CompletionClient, CompletionStream, SemanticError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::PipelineConfig;

const SINGLE_SOURCE_PREAMBLE: &str = "You are a helpful assistant. Use the following context \
from the user's document to answer the question.\nContext:\n";

const COMPARISON_PREAMBLE: &str = "You are a helpful assistant. Compare the following two GPX \
routes based on the user's question. Use the provided context for each route.\n";

/// A question about one document, or a comparison of two.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatRequest {
    /// Extra instructions from the calling application.
    #[serde(default)]
    pub developer_message: String,
    pub user_message: String,
    /// Completion model; the configured default when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Key for the completion service; the configured key when absent.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Source tags to ground the answer in. One or two.
    #[serde(default)]
    pub file_names: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("At least one file must be provided.")]
    NoSources,
    #[error("You can only compare up to two files.")]
    TooManySources(usize),
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
    #[error("completion failed: {0}")]
    Completion(#[from] SemanticError),
}

/// Where a chat request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Received,
    Retrieving,
    PromptAssembled,
    Streaming,
    Complete,
    Error,
}

impl ChatPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatPhase::Received => "received",
            ChatPhase::Retrieving => "retrieving",
            ChatPhase::PromptAssembled => "prompt_assembled",
            ChatPhase::Streaming => "streaming",
            ChatPhase::Complete => "complete",
            ChatPhase::Error => "error",
        }
    }
}

impl fmt::Display for ChatPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traces every phase transition of one request.
struct PhaseTracker {
    phase: ChatPhase,
}

impl PhaseTracker {
    fn new() -> Self {
        debug!(phase = %ChatPhase::Received, "chat phase");
        Self {
            phase: ChatPhase::Received,
        }
    }

    fn advance(&mut self, next: ChatPhase) {
        debug!(from = %self.phase, to = %next, "chat phase");
        self.phase = next;
    }

    fn fail<E: fmt::Display>(&mut self, err: E) -> E {
        error!(from = %self.phase, error = %err, "chat failed");
        self.phase = ChatPhase::Error;
        err
    }
}

/// Which documents a request draws on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sources<'a> {
    Single(&'a str),
    Pair(&'a str, &'a str),
}

impl<'a> Sources<'a> {
    /// Accept exactly one or two tags.
    pub fn from_tags(tags: &'a [String]) -> Result<Self, ChatError> {
        match tags {
            [] => Err(ChatError::NoSources),
            [one] => Ok(Sources::Single(one)),
            [first, second] => Ok(Sources::Pair(first, second)),
            more => Err(ChatError::TooManySources(more.len())),
        }
    }
}

/// Contexts retrieved for each source, in the order the sources were named.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievedContext {
    Single(String),
    Pair {
        first_tag: String,
        first: String,
        second_tag: String,
        second: String,
    },
}

fn join_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The grounding system prompt for the retrieved context.
pub fn build_system_prompt(context: &RetrievedContext) -> String {
    match context {
        RetrievedContext::Single(c) => format!("{SINGLE_SOURCE_PREAMBLE}{c}"),
        RetrievedContext::Pair {
            first_tag,
            first,
            second_tag,
            second,
        } => format!(
            "{COMPARISON_PREAMBLE}\nRoute 1: {first_tag}\nContext:\n{first}\n\nRoute 2: {second_tag}\nContext:\n{second}\n"
        ),
    }
}

/// Messages sent upstream: grounding prompt, optional developer message,
/// then the user's question.
pub fn build_messages(system_prompt: String, request: &ChatRequest) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(system_prompt)];
    if !request.developer_message.trim().is_empty() {
        messages.push(ChatMessage::system(request.developer_message.clone()));
    }
    messages.push(ChatMessage::user(request.user_message.clone()));
    messages
}

/// Answers [`ChatRequest`]s from stored chunks.
pub struct ChatOrchestrator {
    store: Arc<VectorStore>,
    completion: Arc<dyn CompletionClient>,
    default_model: String,
    top_k: usize,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<VectorStore>,
        completion: Arc<dyn CompletionClient>,
        default_model: impl Into<String>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            store,
            completion,
            default_model: default_model.into(),
            top_k: config.chat_top_k.max(1),
        }
    }

    /// Retrieve the top chunks per source. Two sources are searched
    /// concurrently and both must succeed.
    pub async fn retrieve(
        &self,
        question: &str,
        sources: &Sources<'_>,
    ) -> Result<RetrievedContext, ChatError> {
        match *sources {
            Sources::Single(tag) => {
                let hits = self
                    .store
                    .search_by_text(question, self.top_k, Some(tag))
                    .await?;
                Ok(RetrievedContext::Single(join_hits(&hits)))
            }
            Sources::Pair(first, second) => {
                let (a, b) = tokio::join!(
                    self.store.search_by_text(question, self.top_k, Some(first)),
                    self.store.search_by_text(question, self.top_k, Some(second)),
                );
                Ok(RetrievedContext::Pair {
                    first_tag: first.to_string(),
                    first: join_hits(&a?),
                    second_tag: second.to_string(),
                    second: join_hits(&b?),
                })
            }
        }
    }

    /// Validate, retrieve, assemble the prompt and start the completion.
    ///
    /// Returns once the upstream stream is open, so a failing completion
    /// service is reported here rather than mid-stream. Dropping the returned
    /// stream cancels the generation.
    pub async fn stream_answer(&self, request: ChatRequest) -> Result<CompletionStream, ChatError> {
        let mut tracker = PhaseTracker::new();

        let sources = Sources::from_tags(&request.file_names).map_err(|e| tracker.fail(e))?;

        tracker.advance(ChatPhase::Retrieving);
        let context = self
            .retrieve(&request.user_message, &sources)
            .await
            .map_err(|e| tracker.fail(e))?;

        let messages = build_messages(build_system_prompt(&context), &request);
        tracker.advance(ChatPhase::PromptAssembled);

        let model = request
            .model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.default_model.clone());
        info!(
            model = %model,
            sources = request.file_names.len(),
            messages = messages.len(),
            "starting chat completion"
        );

        let upstream = self
            .completion
            .stream_chat(ChatCompletionRequest {
                model,
                messages,
                api_key: request.api_key.clone(),
            })
            .await
            .map_err(|e| tracker.fail(ChatError::from(e)))?;
        tracker.advance(ChatPhase::Streaming);

        Ok(track_stream(upstream, tracker))
    }
}

/// Relay fragments and record how the stream ended.
fn track_stream(upstream: CompletionStream, mut tracker: PhaseTracker) -> CompletionStream {
    Box::pin(async_stream::stream! {
        let mut upstream = upstream;
        let mut fragments = 0usize;
        let mut failed = false;
        while let Some(item) = upstream.next().await {
            match item {
                Ok(fragment) => {
                    fragments += 1;
                    yield Ok(fragment);
                }
                Err(err) => {
                    failed = true;
                    yield Err(tracker.fail(err));
                    break;
                }
            }
        }
        if !failed {
            tracker.advance(ChatPhase::Complete);
            debug!(fragments, "chat stream finished");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tags: &[&str]) -> ChatRequest {
        ChatRequest {
            developer_message: String::new(),
            user_message: "How long is it?".into(),
            model: None,
            api_key: None,
            file_names: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn source_count_is_validated() {
        assert!(matches!(
            Sources::from_tags(&[]),
            Err(ChatError::NoSources)
        ));
        let three = request(&["a", "b", "c"]).file_names;
        assert!(matches!(
            Sources::from_tags(&three),
            Err(ChatError::TooManySources(3))
        ));
        let two = request(&["a", "b"]).file_names;
        assert_eq!(Sources::from_tags(&two).unwrap(), Sources::Pair("a", "b"));
    }

    #[test]
    fn single_source_prompt() {
        let prompt =
            build_system_prompt(&RetrievedContext::Single("chunk one\nchunk two".into()));
        assert_eq!(
            prompt,
            "You are a helpful assistant. Use the following context from the user's document \
             to answer the question.\nContext:\nchunk one\nchunk two"
        );
    }

    #[test]
    fn comparison_prompt_labels_each_route() {
        let prompt = build_system_prompt(&RetrievedContext::Pair {
            first_tag: "north.gpx".into(),
            first: "N ctx".into(),
            second_tag: "south.gpx".into(),
            second: "S ctx".into(),
        });
        assert!(prompt.starts_with("You are a helpful assistant. Compare the following two GPX routes"));
        assert!(prompt.ends_with(
            "\n\nRoute 1: north.gpx\nContext:\nN ctx\n\nRoute 2: south.gpx\nContext:\nS ctx\n"
        ));
    }

    #[test]
    fn developer_message_is_forwarded_when_present() {
        let mut req = request(&["a.pdf"]);
        let messages = build_messages("sys".into(), &req);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], ChatMessage::system("sys"));
        assert_eq!(messages[1], ChatMessage::user("How long is it?"));

        req.developer_message = "Answer in French.".into();
        let messages = build_messages("sys".into(), &req);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1], ChatMessage::system("Answer in French."));
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"user_message":"hi","file_names":["a.pdf"]}"#).unwrap();
        assert!(req.developer_message.is_empty());
        assert!(req.model.is_none());
        assert_eq!(req.file_names, vec!["a.pdf"]);
    }

    #[test]
    fn phases_render_snake_case() {
        assert_eq!(ChatPhase::PromptAssembled.to_string(), "prompt_assembled");
    }
}
