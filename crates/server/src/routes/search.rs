use crate::error::{JsonBody, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use index::SearchHit;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_k")]
    pub k: usize,
}

fn default_k() -> usize {
    3
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

/// Top-k chunks across every stored document.
pub async fn search(
    State(state): State<Arc<ServerState>>,
    JsonBody(request): JsonBody<SearchRequest>,
) -> ServerResult<Json<SearchResponse>> {
    let results = state
        .store
        .search_by_text(&request.query, request.k, None)
        .await?;

    tracing::debug!(k = request.k, hits = results.len(), "search served");
    Ok(Json(SearchResponse { results }))
}
