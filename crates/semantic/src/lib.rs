//! routerag model clients
//!
//! This crate talks to the two remote model services routerag depends on:
//!
//! - **Embeddings** - turn chunks and queries into dense vectors via any
//!   [`Embedder`]. [`OpenAiEmbedder`] calls an OpenAI-compatible
//!   `/embeddings` endpoint; [`HashingEmbedder`] is an offline, deterministic
//!   stand-in for local runs and tests.
//! - **Chat completions** - [`OpenAiCompletionClient`] streams answer text
//!   fragment by fragment from `/chat/completions`.
//!
//! Both sit behind traits so the pipeline and the HTTP layer can be tested
//! without network access.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{Embedder, EmbedderConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = EmbedderConfig {
//!         mode: "hashing".into(),
//!         dimensions: 256,
//!         ..Default::default()
//!     };
//!
//!     let embedder = cfg.build().unwrap();
//!     let vector = embedder.embed("Climb to the pass").await.unwrap();
//!     assert_eq!(vector.len(), 256);
//! }
//! ```
//!
//! ## Env vars to know
//!
//! The server reads `OPENAI_API_KEY` as the default key for both clients when
//! no key is set in its config file.

pub mod completion;
pub mod config;
pub mod embedder;
pub mod error;

mod api;
mod hashing;
mod normalize;

pub use crate::api::OpenAiEmbedder;
pub use crate::completion::{
    ChatCompletionRequest, ChatMessage, CompletionClient, CompletionStream,
    OpenAiCompletionClient,
};
pub use crate::config::{CompletionConfig, EmbedderConfig, DEFAULT_API_BASE};
pub use crate::embedder::Embedder;
pub use crate::error::SemanticError;
pub use crate::hashing::HashingEmbedder;
