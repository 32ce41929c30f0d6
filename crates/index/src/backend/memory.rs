use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::query::rank_passages;
use crate::{EmbeddingVector, Passage, RetrievalError, Retriever};

/// A pre-embedded passage held by [`MemoryIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPoint {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub vector: Vec<f32>,
}

impl MemoryPoint {
    pub fn new(id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            url: None,
            vector,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Read-only brute-force cosine index.
///
/// Built once and never mutated afterwards, so it can be shared across requests
/// without locking.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    points: Vec<MemoryPoint>,
    score_threshold: Option<f32>,
}

impl MemoryIndex {
    pub fn new(points: Vec<MemoryPoint>) -> Self {
        Self {
            points,
            score_threshold: None,
        }
    }

    /// Loads a JSON array of [`MemoryPoint`]s.
    pub fn from_json_file(path: &Path) -> Result<Self, RetrievalError> {
        let bytes = std::fs::read(path)
            .map_err(|e| RetrievalError::Load(format!("{}: {e}", path.display())))?;
        let points: Vec<MemoryPoint> = serde_json::from_slice(&bytes)
            .map_err(|e| RetrievalError::Load(format!("{}: {e}", path.display())))?;

        if let Some(first) = points.first() {
            let dim = first.vector.len();
            if let Some(bad) = points.iter().find(|p| p.vector.len() != dim) {
                return Err(RetrievalError::Load(format!(
                    "point '{}' has dimension {}, expected {dim}",
                    bad.id,
                    bad.vector.len()
                )));
            }
        }

        log::info!("loaded {} points from {}", points.len(), path.display());
        Ok(Self::new(points))
    }

    pub fn with_score_threshold(mut self, threshold: Option<f32>) -> Self {
        self.score_threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn dimension(&self) -> Option<usize> {
        self.points.first().map(|p| p.vector.len())
    }
}

#[async_trait]
impl Retriever for MemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn retrieve(
        &self,
        vector: &EmbeddingVector,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        if let Some(dim) = self.dimension() {
            if vector.dim() != dim {
                return Err(RetrievalError::BadVector(format!(
                    "expected dimension {dim}, got {}",
                    vector.dim()
                )));
            }
        }

        let scored = self
            .points
            .iter()
            .map(|point| Passage {
                id: point.id.clone(),
                text: point.text.clone(),
                source_url: point.url.clone(),
                score: vector.cosine_similarity(&point.vector),
            })
            .collect();

        Ok(rank_passages(scored, k, self.score_threshold))
    }
}
