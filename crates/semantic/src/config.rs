use serde::{Deserialize, Serialize};

/// Runtime configuration describing which embedding provider to call and how to
/// post-process vectors.
///
/// # Example
/// ```no_run
/// use semantic::{build_embedder, EmbedderConfig};
///
/// let cfg = EmbedderConfig {
///     provider: "cohere".into(),
///     api_key: Some("co-xxx".into()),
///     model_name: "embed-english-v3.0".into(),
///     ..Default::default()
/// };
///
/// let embedder = build_embedder(&cfg).expect("valid config");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Provider selector: `"cohere"`, `"openai"`, `"hf"`, `"custom"`, or `"stub"`.
    pub provider: String,
    /// Endpoint override. Cohere and OpenAI have sensible defaults; `hf` and `custom` require it.
    pub api_url: Option<String>,
    /// Bearer token sent in the `Authorization` header.
    pub api_key: Option<String>,
    /// Model identifier forwarded to the provider.
    pub model_name: String,
    /// Expected vector length. When set, responses of any other length are rejected.
    pub dimension: Option<usize>,
    /// Normalize the resulting vector to unit length.
    pub normalize: bool,
    /// Overall request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: "cohere".into(),
            api_url: None,
            api_key: None,
            model_name: "embed-english-v3.0".into(),
            dimension: None,
            normalize: false,
            timeout_secs: 15,
        }
    }
}

impl EmbedderConfig {
    /// Offline configuration backed by [`StubEmbedder`](crate::StubEmbedder).
    pub fn stub(dimension: usize) -> Self {
        Self {
            provider: "stub".into(),
            model_name: "stub".into(),
            dimension: Some(dimension),
            normalize: true,
            ..Default::default()
        }
    }

    pub(crate) fn provider_lowercase(&self) -> String {
        self.provider.trim().to_ascii_lowercase()
    }
}
