//! API route handlers
//!
//! - `chat`: the streaming question-answering endpoint
//! - `health`: liveness, readiness and metrics

pub mod chat;
pub mod health;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;

/// API version and base info
///
/// ```json
/// {
///   "name": "ragchat",
///   "version": "0.1.0",
///   "models": {"embedding": "...", "retriever": "...", "generation": "..."},
///   "endpoints": ["..."]
/// }
/// ```
pub async fn api_info(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let (embedding, retriever, generation) = state.pipeline.describe();
    Ok(Json(json!({
        "name": "ragchat",
        "version": env!("CARGO_PKG_VERSION"),
        "models": {
            "embedding": embedding,
            "retriever": retriever,
            "generation": generation,
        },
        "endpoints": [
            "POST /chat",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
