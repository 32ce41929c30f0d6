//! # Passage Index
//!
//! Read-only nearest-neighbour retrieval for the ragchat pipeline. Given a query
//! [`EmbeddingVector`], a [`Retriever`] returns at most `k` [`Passage`]s ordered by
//! descending similarity.
//!
//! ## Backends
//!
//! - [`QdrantRetriever`] talks to a Qdrant collection over its REST API. This is the
//!   production backend; the collection is populated by a separate ingestion job.
//! - [`MemoryIndex`] holds pre-embedded points in memory and scores them with cosine
//!   similarity. Handy for tests and for running without a vector database.
//!
//! ## Payload narrowing
//!
//! Vector stores hand back an arbitrary JSON payload per hit. It is narrowed into the
//! fixed [`Passage`] shape right here, so nothing downstream ever sees an untyped map:
//! `text` is required (hits without it are skipped), `url` / `source` become
//! [`Passage::source_url`], and numeric or UUID ids become strings.
//!
//! ## Ordering guarantees
//!
//! Results are stably sorted by score, so ties keep the order the index returned them in.
//! Hits below the configured relevance floor are dropped and the result is never padded:
//! asking for `k = 3` from a collection with one relevant passage yields one passage.
//!
//! ```
//! use index::{MemoryIndex, MemoryPoint, Retriever};
//! use semantic::EmbeddingVector;
//!
//! #[tokio::main]
//! async fn main() {
//!     let index = MemoryIndex::new(vec![
//!         MemoryPoint::new("a", "Humanoids walk.", vec![1.0, 0.0]),
//!         MemoryPoint::new("b", "Sensors see.", vec![0.0, 1.0]),
//!     ]);
//!     let hits = index
//!         .retrieve(&EmbeddingVector::new(vec![1.0, 0.1]), 1)
//!         .await
//!         .unwrap();
//!     assert_eq!(hits[0].id, "a");
//! }
//! ```

mod backend;
mod query;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backend::{MemoryIndex, MemoryPoint, QdrantRetriever};
pub use query::{narrow_hit, rank_passages, RawHit};
pub use semantic::EmbeddingVector;

/// One retrieved passage, narrowed from the index payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Opaque point identifier as reported by the index.
    pub id: String,
    /// Passage text, sent to the model as grounding.
    pub text: String,
    /// Where the passage came from, when the payload recorded it.
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Similarity to the query; higher is more relevant.
    pub score: f32,
}

/// Failures talking to the vector index. All of them are fatal for the request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RetrievalError {
    #[error("vector index unreachable: {0}")]
    Unreachable(String),
    #[error("collection '{0}' does not exist")]
    CollectionNotFound(String),
    #[error("query vector rejected by index: {0}")]
    BadVector(String),
    #[error("vector index returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("malformed index response: {0}")]
    Malformed(String),
    #[error("invalid retriever config: {0}")]
    InvalidConfig(String),
    #[error("failed to load index file: {0}")]
    Load(String),
}

/// Returns the top-`k` passages most similar to a query vector.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Backend label for logs.
    fn name(&self) -> &str;

    /// Nearest-neighbour search. An empty result is not an error.
    async fn retrieve(
        &self,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError>;

    /// Startup probe: verifies the backing collection exists and is reachable.
    async fn ensure_ready(&self) -> Result<(), RetrievalError> {
        Ok(())
    }
}

/// Retriever configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrieverConfig {
    /// `"qdrant"` or `"memory"`.
    pub backend: String,
    /// Qdrant base URL, e.g. `http://localhost:6333`.
    pub url: String,
    /// Value for Qdrant's `api-key` header (cloud clusters).
    pub api_key: Option<String>,
    /// Collection populated by the ingestion job.
    pub collection: String,
    /// Relevance floor; hits scoring below it are dropped.
    pub score_threshold: Option<f32>,
    /// JSON file of pre-embedded points for the memory backend.
    pub memory_path: Option<PathBuf>,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            backend: "qdrant".into(),
            url: "http://localhost:6333".into(),
            api_key: None,
            collection: "humanoid-robotics-book".into(),
            score_threshold: None,
            memory_path: None,
            timeout_secs: 10,
        }
    }
}

/// Builds the retriever selected by `cfg.backend`.
pub fn build_retriever(cfg: &RetrieverConfig) -> Result<Arc<dyn Retriever>, RetrievalError> {
    match cfg.backend.trim().to_ascii_lowercase().as_str() {
        "qdrant" => Ok(Arc::new(QdrantRetriever::new(cfg)?)),
        "memory" => {
            let index = match cfg.memory_path.as_deref() {
                Some(path) => MemoryIndex::from_json_file(path)?,
                None => MemoryIndex::default(),
            };
            Ok(Arc::new(index.with_score_threshold(cfg.score_threshold)))
        }
        other => Err(RetrievalError::InvalidConfig(format!(
            "unknown retriever backend '{other}'"
        ))),
    }
}
