use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Status of the API and its vector database.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub api: String,
    pub vector_db: String,
    pub overall: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_db_error: Option<String>,
}

/// Always 200; an unreachable vector database degrades `overall`.
pub async fn health_check(State(state): State<Arc<ServerState>>) -> Json<HealthResponse> {
    let response = match state.store.health_check().await {
        Ok(()) => HealthResponse {
            api: "ok".to_string(),
            vector_db: "ok".to_string(),
            overall: "ok".to_string(),
            vector_db_error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "vector database health check failed");
            HealthResponse {
                api: "ok".to_string(),
                vector_db: "error".to_string(),
                overall: "degraded".to_string(),
                vector_db_error: Some(e.to_string()),
            }
        }
    };

    Json(response)
}
