//! # Answer Generation
//!
//! Streams a model answer for a grounded prompt as a lazy sequence of text
//! fragments.
//!
//! ## Contract
//!
//! [`Generator::generate`] sends the request and waits for the provider to
//! accept it. Auth failures, rate limits and oversized prompts therefore
//! surface as an `Err` before any text exists. On success it returns a
//! [`FragmentStream`]:
//!
//! - each item is exactly the text the model produced since the previous item;
//!   empty deltas are never yielded
//! - the stream is finite and cannot be restarted
//! - an `Err` item is always the last item; nothing is retried
//! - dropping the stream drops the underlying HTTP response, which closes the
//!   connection and stops the provider from generating further tokens
//!
//! ## Backends
//!
//! - [`OpenAiGenerator`] for OpenAI and OpenAI-compatible chat completion APIs.
//! - [`StubGenerator`] for offline runs and tests.

mod error;
mod openai;
pub mod sse;
mod stub;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use crate::error::GenerationError;
pub use crate::openai::{decode_fragments, OpenAiGenerator};
pub use crate::sse::SseDecoder;
pub use crate::stub::StubGenerator;

/// Fixed answer for questions the book does not cover.
pub const DECLINE_MESSAGE: &str = "I don’t have enough information in this book to answer that.";

/// Incremental answer text. See the crate docs for the stream contract.
pub type FragmentStream = BoxStream<'static, Result<String, GenerationError>>;

/// A prompt ready to send.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationRequest {
    /// System instruction fixing the model's behaviour.
    pub system: String,
    /// User turn: rendered context plus the question.
    pub user: String,
    /// Context chunks the user turn was built from. Not sent upstream.
    pub grounding: Vec<String>,
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    /// Opens a generation stream for `request`.
    async fn generate(&self, request: GenerationRequest) -> Result<FragmentStream, GenerationError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `"openai"` (any OpenAI-compatible endpoint) or `"stub"`.
    pub provider: String,
    /// API root; `/chat/completions` is appended.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub connect_timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: "openai".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            model: "gpt-4o-mini".into(),
            temperature: 0.1,
            max_tokens: None,
            connect_timeout_secs: 10,
        }
    }
}

/// Builds the generator selected by `cfg.provider`.
pub fn build_generator(cfg: &GeneratorConfig) -> Result<Arc<dyn Generator>, GenerationError> {
    match cfg.provider.trim().to_ascii_lowercase().as_str() {
        "openai" | "openai-compatible" => Ok(Arc::new(OpenAiGenerator::new(cfg)?)),
        "stub" => Ok(Arc::new(StubGenerator::new())),
        other => Err(GenerationError::InvalidConfig(format!(
            "unknown generation provider '{other}'"
        ))),
    }
}
