use thiserror::Error;

/// Errors surfaced while turning text into an [`EmbeddingVector`](crate::EmbeddingVector).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    /// Nothing to embed after trimming whitespace.
    #[error("cannot embed empty text")]
    EmptyInput,
    /// Configuration is inconsistent (missing URL, missing key, unknown provider).
    #[error("invalid embedder config: {0}")]
    InvalidConfig(String),
    /// Connection refused, DNS failure, or the request timed out.
    #[error("embedding provider unreachable: {0}")]
    Unreachable(String),
    /// The provider answered with a non-success status (auth error, rate limit, bad input).
    #[error("embedding provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The provider answered 2xx but the body was not a usable embedding.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    /// The vector length does not match the configured model dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// True for failures caused by credentials or quota rather than the request itself.
    pub fn is_auth_or_quota(&self) -> bool {
        matches!(
            self,
            EmbeddingError::Http { status, .. } if matches!(*status, 401 | 403 | 429)
        )
    }
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EmbeddingError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            EmbeddingError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            EmbeddingError::Unreachable(err.to_string())
        }
    }
}
