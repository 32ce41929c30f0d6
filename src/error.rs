use std::time::Duration;

use generation::GenerationError;
use index::RetrievalError;
use semantic::EmbeddingError;
use thiserror::Error;

/// Per-request failures. Each one ends the event stream with a single error event.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    #[error("failed to embed the question: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("failed to search the book index: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error("failed to generate an answer: {0}")]
    Generation(#[from] GenerationError),
    #[error("retrieval timed out after {} ms", .0.as_millis())]
    RetrievalTimeout(Duration),
    #[error("answer generation timed out after {} s", .0.as_secs())]
    GenerationTimeout(Duration),
    #[error("selected text is {chars} characters; the limit is {budget}")]
    SelectionTooLong { chars: usize, budget: usize },
}

impl PipelineError {
    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Embedding(_) => "embedding",
            PipelineError::Retrieval(_) => "retrieval",
            PipelineError::Generation(_) => "generation",
            PipelineError::RetrievalTimeout(_) => "retrieval_timeout",
            PipelineError::GenerationTimeout(_) => "generation_timeout",
            PipelineError::SelectionTooLong { .. } => "selection_too_long",
        }
    }
}

/// Startup failures. The process must not accept requests after one of these.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("embedder: {0}")]
    Embedder(#[from] EmbeddingError),
    #[error("retriever: {0}")]
    Retriever(#[from] RetrievalError),
    #[error("generator: {0}")]
    Generator(#[from] GenerationError),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("invalid pipeline config: {0}")]
    Invalid(String),
}
