use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
pub struct FilesResponse {
    pub files: Vec<String>,
}

/// Last path component of a client-supplied file name, or `None` when
/// nothing usable remains.
pub fn stored_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// Distinct source tags present in the collection, sorted.
pub async fn list_files(State(state): State<Arc<ServerState>>) -> ServerResult<Json<FilesResponse>> {
    let files = state.store.list_source_tags().await?;
    Ok(Json(FilesResponse { files }))
}

/// Raw bytes of an uploaded file.
pub async fn get_file(
    State(state): State<Arc<ServerState>>,
    Path(name): Path<String>,
) -> ServerResult<Response> {
    let not_found = || ServerError::NotFound("File not found".to_string());

    let safe = stored_name(&name).filter(|s| *s == name).ok_or_else(not_found)?;
    let path = state.config.upload_dir.join(&safe);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    let content_type = mime_guess::from_path(&safe).first_or_octet_stream();
    let disposition = format!("attachment; filename=\"{}\"", safe.replace('"', "'"));

    Ok((
        [
            (CONTENT_TYPE, content_type.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_name_strips_directories() {
        assert_eq!(stored_name("route.gpx").as_deref(), Some("route.gpx"));
        assert_eq!(stored_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(stored_name("C:\\docs\\plan.pdf").as_deref(), Some("plan.pdf"));
        assert_eq!(stored_name("dir/"), None);
        assert_eq!(stored_name(".."), None);
        assert_eq!(stored_name("  "), None);
    }
}
