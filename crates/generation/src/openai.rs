use std::collections::VecDeque;
use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Serialize;

use crate::sse::SseDecoder;
use crate::{FragmentStream, GenerationError, GenerationRequest, Generator, GeneratorConfig};

/// Streaming client for OpenAI-compatible `/chat/completions` endpoints.
///
/// The request is sent when [`Generator::generate`] is awaited; the body is read
/// lazily as the returned stream is polled. Dropping the stream closes the
/// connection.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

impl OpenAiGenerator {
    pub fn new(cfg: &GeneratorConfig) -> Result<Self, GenerationError> {
        let base = cfg.base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(GenerationError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{base}'"
            )));
        }
        let api_key = cfg
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GenerationError::InvalidConfig("api_key is required".into()))?;
        if cfg.model.trim().is_empty() {
            return Err(GenerationError::InvalidConfig("model is empty".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| GenerationError::InvalidConfig("invalid api key".into()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        // No overall timeout: answers stream for as long as the pipeline allows.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| {
                GenerationError::InvalidConfig(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: format!("{base}/chat/completions"),
            model: cfg.model.trim().to_string(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::from_status(status.as_u16(), body));
        }

        tracing::debug!(model = %self.model, "generation stream opened");
        Ok(decode_fragments(response.bytes_stream()))
    }
}

struct DecodeState<E> {
    body: BoxStream<'static, Result<bytes::Bytes, E>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, GenerationError>>,
    closed: bool,
}

/// Lazily decodes an SSE byte stream into text fragments.
///
/// Yields every fragment in order, then ends. The first error is the last item.
/// A body that ends before `[DONE]` or a `finish_reason` yields a transport error,
/// since the answer was cut short.
pub fn decode_fragments<S, E>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: body.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        closed: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                if item.is_err() {
                    st.pending.clear();
                    st.closed = true;
                }
                return Some((item, st));
            }
            if st.closed {
                return None;
            }

            match st.body.next().await {
                Some(Ok(chunk)) => {
                    st.pending.extend(st.decoder.push(&chunk));
                    if st.decoder.is_done() {
                        st.closed = true;
                    }
                }
                Some(Err(e)) => {
                    st.closed = true;
                    st.pending.push_back(Err(GenerationError::Transport(e.to_string())));
                }
                None => {
                    st.closed = true;
                    st.pending.extend(st.decoder.finish());
                    let failed = st.pending.iter().any(Result::is_err);
                    if !failed && !st.decoder.is_complete() {
                        st.pending.push_back(Err(GenerationError::Transport(
                            "stream closed before completion".into(),
                        )));
                    }
                }
            }
        }
    })
    .boxed()
}
