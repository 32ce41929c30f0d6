use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::{future, StreamExt};
use ragchat::Query;
use serde::Deserialize;

use crate::error::{ServerError, ServerResult};
use crate::middleware::RequestId;
use crate::state::ServerState;

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, rename = "selectedText", alias = "selected_text")]
    pub selected_text: Option<String>,
}

/// Streams the answer to one question as `text/event-stream`.
///
/// Frames are `data: <json>\n\n`: `{"sources":[...]}` first, then
/// `{"content":"..."}` fragments, then either `{"error":"..."}` or the end of
/// the response. Only an empty question or an over-long selection is refused
/// with an HTTP error; every later failure arrives as an `error` frame.
pub async fn chat(
    State(state): State<Arc<ServerState>>,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ServerResult<Response> {
    let Json(request) = payload?;
    if request.query.trim().is_empty() {
        return Err(ServerError::BadRequest("Query cannot be empty.".into()));
    }

    let mut query = Query::new(request.query);
    if let Some(selected) = request.selected_text {
        query = query.with_selected_text(selected);
    }
    let budget = state.pipeline.config().context_budget_chars;
    if query.selected_chars().is_some_and(|chars| chars > budget) {
        return Err(ServerError::BadRequest(format!(
            "Selected text exceeds the {budget} character limit."
        )));
    }

    tracing::info!(
        request_id = %request_id.map(|Extension(id)| id.0).unwrap_or_default(),
        query_len = query.text.len(),
        selected = query.selected_text.is_some(),
        "chat stream opened"
    );

    let frames = state
        .pipeline
        .run(query)
        .filter_map(|event| future::ready(event.to_sse_frame()))
        .map(Ok::<_, Infallible>);

    Ok((
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}
