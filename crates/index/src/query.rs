use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Passage;

/// One hit exactly as the vector index reports it, before narrowing.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

/// Narrows a raw hit into a [`Passage`].
///
/// Returns `None` when the payload carries no usable `text`; such points cannot
/// ground an answer.
pub fn narrow_hit(hit: RawHit) -> Option<Passage> {
    let id = match hit.id {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    };

    let mut payload = hit.payload.unwrap_or_default();
    let text = match payload.remove("text") {
        Some(Value::String(text)) if !text.trim().is_empty() => text,
        _ => {
            log::warn!("skipping point {id}: payload has no text");
            return None;
        }
    };

    let source_url = ["url", "source", "source_url"]
        .iter()
        .find_map(|key| match payload.remove(*key) {
            Some(Value::String(url)) if !url.is_empty() => Some(url),
            _ => None,
        });

    Some(Passage {
        id,
        text,
        source_url,
        score: hit.score,
    })
}

/// Applies the relevance floor, sorts by descending score and keeps the first `k`.
///
/// The sort is stable: passages with equal scores keep their input order.
pub fn rank_passages(mut passages: Vec<Passage>, k: usize, floor: Option<f32>) -> Vec<Passage> {
    passages.retain(|p| p.score.is_finite() && floor.is_none_or(|min| p.score >= min));
    passages.sort_by(|a, b| b.score.total_cmp(&a.score));
    passages.truncate(k);
    passages
}
