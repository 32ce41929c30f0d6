use thiserror::Error;

/// Failures from the generation provider, before or during streaming.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GenerationError {
    #[error("generation provider rejected credentials: {0}")]
    Auth(String),
    #[error("generation provider rate limit reached: {0}")]
    RateLimited(String),
    #[error("prompt exceeds the model context length: {0}")]
    ContextLengthExceeded(String),
    #[error("generation provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Connection refused, reset mid-stream, or the stream closed early.
    #[error("generation stream transport failed: {0}")]
    Transport(String),
    #[error("malformed generation stream: {0}")]
    Malformed(String),
    /// An error object delivered inside an otherwise healthy stream.
    #[error("generation provider error: {0}")]
    Upstream(String),
    #[error("invalid generator config: {0}")]
    InvalidConfig(String),
}

impl GenerationError {
    /// Maps a non-success status and its body onto the provider failure taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => GenerationError::Auth(body),
            429 => GenerationError::RateLimited(body),
            400 | 413 if is_context_length(&body) => GenerationError::ContextLengthExceeded(body),
            _ => GenerationError::Http { status, body },
        }
    }

    /// Classifies an in-stream `{"error": {...}}` object.
    pub(crate) fn from_error_object(error: &serde_json::Value) -> Self {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        let code = error
            .get("code")
            .or_else(|| error.get("type"))
            .and_then(|c| c.as_str())
            .unwrap_or_default();

        match code {
            "invalid_api_key" | "authentication_error" => GenerationError::Auth(message),
            "rate_limit_exceeded" | "insufficient_quota" => GenerationError::RateLimited(message),
            "context_length_exceeded" => GenerationError::ContextLengthExceeded(message),
            _ => GenerationError::Upstream(message),
        }
    }
}

fn is_context_length(body: &str) -> bool {
    body.contains("context_length_exceeded") || body.contains("maximum context length")
}
