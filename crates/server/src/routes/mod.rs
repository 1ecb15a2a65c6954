//! API route handlers
//!
//! - `chat`: streamed, retrieval-grounded answers
//! - `upload`: PDF and GPX ingestion
//! - `search`: similarity search over stored chunks
//! - `files`: uploaded file listing and download
//! - `health`: API and vector database status

pub mod chat;
pub mod files;
pub mod health;
pub mod search;
pub mod upload;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// Service name, version and available endpoints (GET /).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "routerag",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/chat",
            "/api/upload_pdf",
            "/api/upload_gpx",
            "/api/search",
            "/api/files",
            "/api/file/{name}",
            "/api/health"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound("Not Found".to_string())
}
