use crate::error::{JsonBody, ServerResult};
use crate::state::ServerState;
use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use routerag::ChatRequest;
use std::sync::Arc;

/// Stream the grounded answer as plain text.
///
/// Validation, retrieval and the upstream handshake complete before the
/// status line is sent, so those failures still produce a JSON error.
/// A failure after that ends the body early.
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    JsonBody(request): JsonBody<ChatRequest>,
) -> ServerResult<Response> {
    let stream = state.chat.stream_answer(request).await?;

    Ok((
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response())
}
