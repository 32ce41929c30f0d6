use async_trait::async_trait;
use fxhash::hash64;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedMode, Embedder, EmbeddingError, EmbeddingVector};

/// Deterministic embedder for offline development and tests.
///
/// Values are sinusoids derived from a hash of the trimmed text, so the same
/// text always maps to the same vector and no network is involved. The mode
/// is ignored: stub vectors are symmetric.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dimension: usize,
    normalize: bool,
}

impl StubEmbedder {
    pub fn new(dimension: usize, normalize: bool) -> Self {
        Self {
            dimension: dimension.max(1),
            normalize,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Synchronous core, shared with tests that need to pre-compute index vectors.
    pub fn vector_for(&self, text: &str) -> EmbeddingVector {
        let mut v = vec![0f32; self.dimension];
        let h = hash64(text.trim().as_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            let shift = (idx % 48) as u32;
            *value = (((h >> shift) & 0xffff) as f32 * 0.001 + idx as f32).sin();
        }
        if self.normalize {
            l2_normalize_in_place(&mut v);
        }
        EmbeddingVector::new(v)
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn embed(&self, text: &str, _mode: EmbedMode) -> Result<EmbeddingVector, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(self.vector_for(text))
    }
}
