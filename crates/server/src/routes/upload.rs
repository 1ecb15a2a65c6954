use crate::error::{ServerError, ServerResult};
use crate::routes::files::stored_name;
use crate::state::ServerState;
use axum::extract::{Multipart, State};
use axum::Json;
use ingest::DocumentKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: String,
    pub chunks_uploaded: usize,
}

pub async fn upload_pdf(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    upload(&state, DocumentKind::Pdf, multipart).await
}

pub async fn upload_gpx(
    State(state): State<Arc<ServerState>>,
    multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    upload(&state, DocumentKind::Gpx, multipart).await
}

/// Save the file, then parse, chunk and store it under its file name.
async fn upload(
    state: &ServerState,
    kind: DocumentKind,
    mut multipart: Multipart,
) -> ServerResult<Json<UploadResponse>> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let name = stored_name(&raw_name)
            .ok_or_else(|| ServerError::BadRequest("A file name is required.".to_string()))?;
        kind.check_file_name(&name)
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        document = Some((name, bytes));
        break;
    }

    let (name, bytes) = document
        .ok_or_else(|| ServerError::BadRequest("No file was uploaded.".to_string()))?;

    tokio::fs::create_dir_all(&state.config.upload_dir).await?;
    tokio::fs::write(state.config.upload_dir.join(&name), &bytes).await?;

    let report = state.pipeline.ingest(kind, &name, bytes.to_vec()).await?;
    tracing::info!(
        file_name = %report.file_name,
        kind = kind.label(),
        chunks = report.chunks_uploaded,
        "upload complete"
    );

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        chunks_uploaded: report.chunks_uploaded,
    }))
}
