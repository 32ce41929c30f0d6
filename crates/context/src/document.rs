use index::Passage;
use serde::Serialize;

/// Rendered in place of the context block when nothing was retrieved or selected.
pub const NO_CONTEXT_MARKER: &str = "(no context available)";

/// Bounded grounding for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssembledContext {
    /// Chunk texts in priority order.
    pub ordered_chunks: Vec<String>,
    /// Passages whose text made it into `ordered_chunks`, in the same order.
    pub source_list: Vec<Passage>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.ordered_chunks.is_empty()
    }

    /// Total size of all chunks, in chars.
    pub fn char_len(&self) -> usize {
        self.ordered_chunks.iter().map(|c| c.chars().count()).sum()
    }

    /// Context block for the prompt. Chunks are separated by blank lines.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return NO_CONTEXT_MARKER.to_string();
        }
        self.ordered_chunks.join("\n\n")
    }
}
