use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedMode, Embedder, EmbedderConfig, EmbeddingError, EmbeddingVector};

const COHERE_EMBED_URL: &str = "https://api.cohere.com/v1/embed";
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ApiProviderKind {
    Cohere,
    HuggingFace,
    OpenAI,
    Custom,
}

impl ApiProviderKind {
    pub(crate) fn parse(name: &str) -> Option<Self> {
        match name {
            "cohere" => Some(ApiProviderKind::Cohere),
            "hf" | "huggingface" => Some(ApiProviderKind::HuggingFace),
            "openai" | "gpt" => Some(ApiProviderKind::OpenAI),
            "custom" => Some(ApiProviderKind::Custom),
            _ => None,
        }
    }

    fn default_url(self) -> Option<&'static str> {
        match self {
            ApiProviderKind::Cohere => Some(COHERE_EMBED_URL),
            ApiProviderKind::OpenAI => Some(OPENAI_EMBED_URL),
            ApiProviderKind::HuggingFace | ApiProviderKind::Custom => None,
        }
    }
}

/// Embedding client for hosted providers.
///
/// Holds one pooled `reqwest::Client`; construct it once at startup and share
/// it behind an `Arc` across requests.
#[derive(Debug, Clone)]
pub struct ApiEmbedder {
    client: reqwest::Client,
    kind: ApiProviderKind,
    url: String,
    auth_header: Option<String>,
    model_name: String,
    dimension: Option<usize>,
    normalize: bool,
}

impl ApiEmbedder {
    pub fn new(cfg: &EmbedderConfig) -> Result<Self, EmbeddingError> {
        let provider = cfg.provider_lowercase();
        let kind = ApiProviderKind::parse(&provider).ok_or_else(|| {
            EmbeddingError::InvalidConfig(format!("unknown embedding provider '{provider}'"))
        })?;

        let url = cfg
            .api_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .or_else(|| kind.default_url())
            .ok_or_else(|| {
                EmbeddingError::InvalidConfig(format!(
                    "api_url is required for provider '{provider}'"
                ))
            })?
            .to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(EmbeddingError::InvalidConfig(format!(
                "embedding endpoint must be an http(s) URL, got '{url}'"
            )));
        }

        let api_key = cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty());
        if api_key.is_none() && matches!(kind, ApiProviderKind::Cohere | ApiProviderKind::OpenAI) {
            return Err(EmbeddingError::InvalidConfig(format!(
                "api_key is required for provider '{provider}'"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| {
                EmbeddingError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            kind,
            url,
            auth_header: api_key.map(|k| format!("Bearer {k}")),
            model_name: cfg.model_name.clone(),
            dimension: cfg.dimension,
            normalize: cfg.normalize,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    async fn send(&self, payload: Value) -> Result<Value, EmbeddingError> {
        let mut request = self.client.post(&self.url).json(&payload);
        if let Some(header) = self.auth_header.as_deref() {
            request = request.header(reqwest::header::AUTHORIZATION, header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::Unreachable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EmbeddingError::Malformed(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl Embedder for ApiEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<EmbeddingVector, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let payload = build_api_payload(self.kind, text, &self.model_name, mode);
        let response = self.send(payload).await?;

        let mut vectors = parse_embeddings_from_value(response)?;
        if vectors.len() != 1 {
            return Err(EmbeddingError::Malformed(format!(
                "expected 1 embedding, got {}",
                vectors.len()
            )));
        }
        let mut vector = vectors.remove(0);
        if vector.is_empty() {
            return Err(EmbeddingError::Malformed("embedding vector is empty".into()));
        }
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(EmbeddingError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        if self.normalize {
            l2_normalize_in_place(&mut vector);
        }

        tracing::debug!(
            model = %self.model_name,
            mode = mode.as_str(),
            dim = vector.len(),
            "embedded text"
        );
        Ok(EmbeddingVector::new(vector))
    }
}

pub(crate) fn build_api_payload(
    kind: ApiProviderKind,
    text: &str,
    model: &str,
    mode: EmbedMode,
) -> Value {
    match kind {
        ApiProviderKind::Cohere => json!({
            "texts": [text],
            "model": model,
            "input_type": mode.cohere_input_type(),
        }),
        ApiProviderKind::HuggingFace => json!({ "inputs": text }),
        ApiProviderKind::OpenAI => json!({ "input": text, "model": model }),
        ApiProviderKind::Custom => json!({ "text": text, "input_type": mode.as_str() }),
    }
}

pub(crate) fn parse_embeddings_from_value(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                // Cohere v2 nests vectors by type: {"embeddings": {"float": [[..]]}}
                if let Value::Object(mut by_type) = embeddings {
                    return match by_type.remove("float") {
                        Some(floats) => parse_embedding_collection(floats),
                        None => Err(EmbeddingError::Malformed(
                            "`embeddings` object has no `float` entry".into(),
                        )),
                    };
                }
                return parse_embedding_collection(embeddings);
            }

            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_embedding_vector(embedding)?),
                            None => {
                                return Err(EmbeddingError::Malformed(
                                    "missing `embedding` field in data item".into(),
                                ))
                            }
                        },
                        _ => {
                            return Err(EmbeddingError::Malformed(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }

            Err(EmbeddingError::Malformed("unsupported API response shape".into()))
        }
        other => parse_embedding_collection(other),
    }
}

fn parse_embedding_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_embedding_vector).collect()
            } else {
                parse_embedding_vector(Value::Array(items)).map(|vec| vec![vec])
            }
        }
        other => parse_embedding_vector(other).map(|vec| vec![vec]),
    }
}

fn parse_embedding_vector(value: Value) -> Result<Vec<f32>, EmbeddingError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbeddingError::Malformed("non-finite embedding value".into())),
                other => Err(EmbeddingError::Malformed(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(EmbeddingError::Malformed(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}
