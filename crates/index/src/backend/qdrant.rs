//! Qdrant REST search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::query::{narrow_hit, rank_passages, RawHit};
use crate::{EmbeddingVector, Passage, RetrievalError, Retriever, RetrieverConfig};

/// Searches one Qdrant collection with `POST /collections/{name}/points/search`.
#[derive(Clone)]
pub struct QdrantRetriever {
    client: Client,
    base_url: String,
    collection: String,
    score_threshold: Option<f32>,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    vector: &'a [f32],
    limit: usize,
    with_payload: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f32>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<RawHit>,
}

impl QdrantRetriever {
    pub fn new(cfg: &RetrieverConfig) -> Result<Self, RetrievalError> {
        let url = cfg.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(RetrievalError::InvalidConfig(format!(
                "qdrant url must be http(s), got '{url}'"
            )));
        }
        if cfg.collection.trim().is_empty() {
            return Err(RetrievalError::InvalidConfig(
                "qdrant collection name is empty".into(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = cfg.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|_| RetrievalError::InvalidConfig("invalid qdrant api key".into()))?;
            headers.insert("api-key", value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .map_err(|e| RetrievalError::InvalidConfig(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            collection: cfg.collection.trim().to_string(),
            score_threshold: cfg.score_threshold,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.base_url, self.collection)
    }

    fn map_status(&self, status: StatusCode, body: String) -> RetrievalError {
        match status {
            StatusCode::NOT_FOUND => RetrievalError::CollectionNotFound(self.collection.clone()),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                RetrievalError::BadVector(body)
            }
            _ => RetrievalError::Http {
                status: status.as_u16(),
                body,
            },
        }
    }
}

fn transport_error(err: reqwest::Error) -> RetrievalError {
    if err.is_decode() {
        RetrievalError::Malformed(err.to_string())
    } else {
        RetrievalError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl Retriever for QdrantRetriever {
    fn name(&self) -> &str {
        "qdrant"
    }

    async fn retrieve(
        &self,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        if vector.is_empty() {
            return Err(RetrievalError::BadVector("empty query vector".into()));
        }

        let request = SearchRequest {
            vector: vector.as_slice(),
            limit: k,
            with_payload: true,
            score_threshold: self.score_threshold,
        };
        let resp = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(self.map_status(status, body));
        }

        let payload: SearchResponse = resp
            .json()
            .await
            .map_err(|e| RetrievalError::Malformed(e.to_string()))?;
        let returned = payload.result.len();
        let passages: Vec<Passage> = payload.result.into_iter().filter_map(narrow_hit).collect();
        log::debug!(
            "qdrant search on '{}' returned {returned} hits, {} usable",
            self.collection,
            passages.len()
        );

        Ok(rank_passages(passages, k, self.score_threshold))
    }

    async fn ensure_ready(&self) -> Result<(), RetrievalError> {
        let resp = self
            .client
            .get(self.collection_url())
            .send()
            .await
            .map_err(transport_error)?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(self.map_status(status, body))
    }
}
