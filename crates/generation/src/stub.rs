use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::{FragmentStream, GenerationError, GenerationRequest, Generator, DECLINE_MESSAGE};

const PREVIEW_CHARS: usize = 240;

/// Offline generator for development and tests.
///
/// Answers with a short excerpt of the first grounding chunk, or with
/// [`DECLINE_MESSAGE`] when the request carries no grounding. Output is streamed
/// one word at a time.
#[derive(Debug, Clone, Default)]
pub struct StubGenerator;

impl StubGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Full answer text the stub produces for `request`.
    pub fn answer_for(request: &GenerationRequest) -> String {
        match request.grounding.first() {
            None => DECLINE_MESSAGE.to_string(),
            Some(chunk) => {
                let excerpt: String = chunk.chars().take(PREVIEW_CHARS).collect();
                format!("According to the book: {}", excerpt.trim())
            }
        }
    }
}

#[async_trait]
impl Generator for StubGenerator {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError> {
        let answer = Self::answer_for(&request);
        let words: Vec<Result<String, GenerationError>> = answer
            .split_inclusive(' ')
            .map(|w| Ok(w.to_string()))
            .collect();
        Ok(stream::iter(words).boxed())
    }
}
