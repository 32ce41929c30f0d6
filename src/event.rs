use index::Passage;
use serde::{Deserialize, Serialize};

use crate::wire::to_wire_json;

/// One user question. Owned by a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    /// Passage the reader highlighted, if any.
    #[serde(
        rename = "selectedText",
        alias = "selected_text",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_text: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selected_text: None,
        }
    }

    /// Length of the selection in chars, if there is one.
    pub fn selected_chars(&self) -> Option<usize> {
        self.selected_text.as_deref().map(|s| s.chars().count())
    }

    /// Attaches a selection. Blank selections are dropped.
    pub fn with_selected_text(mut self, selected: impl Into<String>) -> Self {
        let selected = selected.into();
        self.selected_text = (!selected.trim().is_empty()).then_some(selected);
        self
    }
}

/// What a pipeline run emits.
///
/// Every run yields exactly one `Sources` first, then any number of `Content`,
/// then exactly one of `Error` or `End`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamEvent {
    /// Passages the answer is grounded on; may be empty.
    Sources(Vec<Passage>),
    /// Text produced since the previous `Content`.
    Content(String),
    /// Human-readable failure. Terminal.
    Error(String),
    /// Normal completion. Terminal.
    End,
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::End)
    }

    /// Wire frame for a `text/event-stream` body: `data: <json>\n\n`.
    ///
    /// The JSON text uses `", "`/`": "` separators and `\uXXXX` escapes for
    /// anything outside printable ASCII. `End` has no frame; closing the
    /// response is the end signal.
    pub fn to_sse_frame(&self) -> Option<String> {
        if matches!(self, StreamEvent::End) {
            return None;
        }
        to_wire_json(self)
            .ok()
            .map(|json| format!("data: {json}\n\n"))
    }
}
