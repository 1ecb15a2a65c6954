use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use index::VectorStore;
use routerag::{ChatOrchestrator, DocumentPipeline};
use semantic::{CompletionClient, OpenAiCompletionClient};
use std::sync::Arc;

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Vector store shared by uploads, search and chat
    pub store: Arc<VectorStore>,

    /// Parse, chunk and store uploaded documents
    pub pipeline: Arc<DocumentPipeline>,

    /// Retrieval plus streaming completion
    pub chat: Arc<ChatOrchestrator>,
}

impl ServerState {
    /// Create the embedder, vector store and completion client from config.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let embedder = config.embedding.build()?;
        let store = Arc::new(VectorStore::new(&config.index, embedder)?);
        let completion = Arc::new(OpenAiCompletionClient::new(&config.completion)?);

        Ok(Self::from_parts(config, store, completion))
    }

    /// Assemble state around an existing store and completion client.
    pub fn from_parts(
        config: ServerConfig,
        store: Arc<VectorStore>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        let pipeline = Arc::new(DocumentPipeline::new(store.clone(), &config.pipeline));
        let chat = Arc::new(ChatOrchestrator::new(
            store.clone(),
            completion,
            config.completion.default_model.clone(),
            &config.pipeline,
        ));

        Self {
            config: Arc::new(config),
            store,
            pipeline,
            chat,
        }
    }

    /// Create the collection now instead of on first use.
    pub async fn prepare(&self) -> ServerResult<()> {
        self.store
            .ensure_collection()
            .await
            .map_err(ServerError::from)
    }
}
