//! Query embedding for the ragchat pipeline.
//!
//! This crate turns a piece of text into an [`EmbeddingVector`]. The pipeline only ever embeds
//! search queries, so callers go through [`Embedder::embed_query`], which pins the provider's
//! asymmetric "query" input mode. Getting the mode wrong never fails loudly; it just makes
//! retrieval worse, which is why the trait carries a default method for it.
//!
//! Two implementations ship here:
//!
//! - [`ApiEmbedder`] - calls a hosted provider (Cohere, OpenAI, Hugging Face, or a custom
//!   endpoint that accepts `{"text", "input_type"}`).
//! - [`StubEmbedder`] - deterministic, hash-derived vectors. No network. Good for tests and
//!   for running the server without credentials.
//!
//! Both are plain values with no global state; build one with [`build_embedder`] at startup and
//! share it behind an `Arc`.
//!
//! ```no_run
//! use semantic::{build_embedder, EmbedderConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let embedder = build_embedder(&EmbedderConfig::stub(384)).unwrap();
//!     let vector = embedder.embed_query("what is physical ai?").await.unwrap();
//!     assert_eq!(vector.dim(), 384);
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

mod api;
mod normalize;
mod stub;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::api::ApiEmbedder;
pub use crate::config::EmbedderConfig;
pub use crate::error::EmbeddingError;
pub use crate::stub::StubEmbedder;
pub use crate::types::{EmbedMode, EmbeddingVector};

/// Maps text to a fixed-dimension vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier, surfaced in logs.
    fn model_name(&self) -> &str;

    /// Embed `text` in the given mode. Blank text is an [`EmbeddingError::EmptyInput`].
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<EmbeddingVector, EmbeddingError>;

    /// Embed a search query.
    async fn embed_query(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        self.embed(text, EmbedMode::Query).await
    }
}

/// Builds the embedder selected by `cfg.provider`.
pub fn build_embedder(cfg: &EmbedderConfig) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match cfg.provider_lowercase().as_str() {
        "stub" | "fast" => {
            let dim = cfg.dimension.unwrap_or(384);
            Ok(Arc::new(StubEmbedder::new(dim, cfg.normalize)))
        }
        _ => Ok(Arc::new(ApiEmbedder::new(cfg)?)),
    }
}
