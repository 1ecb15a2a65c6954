use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use index::IndexError;
use routerag::{ChatError, PipelineError};
use semantic::SemanticError;
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Semantic(#[from] SemanticError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON request body whose rejections are reported as `{"detail": ...}`
/// with a 400 status.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct JsonBody<T>(pub T);

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

fn index_status(err: &IndexError) -> StatusCode {
    match err {
        IndexError::InvalidK => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ServerError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Chat(ChatError::NoSources | ChatError::TooManySources(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Chat(ChatError::Retrieval(e)) => index_status(e),
            ServerError::Chat(ChatError::Completion(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Pipeline(PipelineError::Ingest(_) | PipelineError::NoChunks(_)) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Pipeline(PipelineError::Index(e)) | ServerError::Index(e) => {
                index_status(e)
            }
            ServerError::Pipeline(PipelineError::Task(_))
            | ServerError::Semantic(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %detail, "request failed");
        } else {
            tracing::debug!(status = %status, error = %detail, "request rejected");
        }

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Internal(format!("IO error: {err}"))
    }
}
