//! ragchat server - HTTP boundary for the streaming question-answering pipeline
//!
//! Exposes one streaming endpoint plus the usual operational routes:
//!
//! - `POST /chat` - answer a question as a `text/event-stream`
//! - `GET /` - service and model information
//! - `GET /health` - liveness probe
//! - `GET /ready` - readiness probe (checks the vector collection)
//! - `GET /metrics` - Prometheus metrics
//!
//! # Wire format
//!
//! `POST /chat` takes `{"query": "...", "selectedText": "..."}` (`selected_text`
//! is accepted too) and answers with frames of the form `data: <json>\n\n`:
//!
//! ```text
//! data: {"sources":[{"id":"42","text":"...","url":"...","score":0.83}]}
//!
//! data: {"content":"Physical AI"}
//!
//! data: {"content":" is ..."}
//! ```
//!
//! The response closes after the last fragment. On failure the last frame is
//! `data: {"error":"..."}` instead.
//!
//! # Configuration
//!
//! Read from `.env`, an optional `ragchat.toml` and `RAGCHAT__*` environment
//! variables (`__` separates nested keys, e.g. `RAGCHAT__GENERATOR__MODEL`).
//! `OPENAI_API_KEY`, `COHERE_API_KEY`, `QDRANT_URL` and `QDRANT_API_KEY` fill
//! unset credentials.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
