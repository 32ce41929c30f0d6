use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// Request-scoped knobs for [`ChatPipeline`](crate::ChatPipeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Passages requested from the retriever.
    pub top_k: usize,
    /// Ceiling for the assembled context, in chars.
    pub context_budget_chars: usize,
    /// Bound on embedding plus retrieval, which precede any visible output.
    pub retrieval_timeout_ms: u64,
    /// Bound on the whole generation stream.
    pub generation_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            context_budget_chars: 6000,
            retrieval_timeout_ms: 10_000,
            generation_timeout_secs: 120,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.top_k == 0 {
            return Err(ConfigurationError::Invalid("top_k must be at least 1".into()));
        }
        if self.context_budget_chars == 0 {
            return Err(ConfigurationError::Invalid(
                "context_budget_chars must be positive".into(),
            ));
        }
        if self.retrieval_timeout_ms == 0 || self.generation_timeout_secs == 0 {
            return Err(ConfigurationError::Invalid("timeouts must be positive".into()));
        }
        Ok(())
    }

    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval_timeout_ms)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}
