use serde::{Deserialize, Serialize};

/// Which side of the retrieval problem the text belongs to.
///
/// Asymmetric embedding models (Cohere v3, E5, BGE with instructions) encode
/// queries and corpus passages differently. Search queries must always use
/// [`EmbedMode::Query`]; using `Document` still returns a vector, just a worse one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    Query,
    Document,
}

impl EmbedMode {
    /// Value of Cohere's `input_type` field.
    pub fn cohere_input_type(self) -> &'static str {
        match self {
            EmbedMode::Query => "search_query",
            EmbedMode::Document => "search_document",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmbedMode::Query => "query",
            EmbedMode::Document => "document",
        }
    }
}

/// Fixed-length embedding produced for one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity; `0.0` when dimensions differ or either side is all zeros.
    pub fn cosine_similarity(&self, other: &[f32]) -> f32 {
        if self.0.len() != other.len() {
            return 0.0;
        }
        let mut dot = 0f32;
        let mut norm_a = 0f32;
        let mut norm_b = 0f32;
        for (a, b) in self.0.iter().zip(other) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a.sqrt() * norm_b.sqrt())
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}
