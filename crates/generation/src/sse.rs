//! Incremental decoder for OpenAI-style `text/event-stream` bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::GenerationError;

#[derive(Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// Turns raw body bytes into text fragments.
///
/// Bytes are buffered until a full line is available, so events and multi-byte
/// characters split across network chunks decode correctly. Decoding stops at
/// `[DONE]` or at the first error; later input is ignored.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    done: bool,
    finished: bool,
    failed: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one body chunk and returns the fragments it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, GenerationError>> {
        let mut out = Vec::new();
        if self.is_closed() {
            return out;
        }
        self.buf.extend_from_slice(chunk);

        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            self.decode_line(&line[..line.len() - 1], &mut out);
            if self.is_closed() {
                self.buf.clear();
                break;
            }
        }
        out
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Vec<Result<String, GenerationError>> {
        let mut out = Vec::new();
        if !self.is_closed() && !self.buf.is_empty() {
            let line = std::mem::take(&mut self.buf);
            self.decode_line(&line, &mut out);
        }
        out
    }

    /// True once `[DONE]` arrived or a choice reported a `finish_reason`.
    pub fn is_complete(&self) -> bool {
        self.done || self.finished
    }

    /// True once `[DONE]` arrived.
    pub fn is_done(&self) -> bool {
        self.done
    }

    fn is_closed(&self) -> bool {
        self.done || self.failed
    }

    fn decode_line(&mut self, raw: &[u8], out: &mut Vec<Result<String, GenerationError>>) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                self.fail(out, GenerationError::Malformed(format!("invalid utf-8 in stream: {e}")));
                return;
            }
        };

        let Some(data) = line.strip_prefix("data:") else {
            // Blank separators, `: keep-alive` comments, `event:`/`id:` fields.
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);

        if data.trim() == "[DONE]" {
            self.done = true;
            return;
        }
        if data.trim().is_empty() {
            return;
        }

        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                self.fail(out, GenerationError::Malformed(format!("invalid event json: {e}")));
                return;
            }
        };

        if let Some(error) = value.get("error") {
            self.fail(out, GenerationError::from_error_object(error));
            return;
        }

        let chunk: Chunk = match serde_json::from_value(value) {
            Ok(chunk) => chunk,
            Err(e) => {
                self.fail(out, GenerationError::Malformed(format!("unexpected event shape: {e}")));
                return;
            }
        };

        for choice in chunk.choices {
            if choice.finish_reason.is_some() {
                self.finished = true;
            }
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                out.push(Ok(content));
            }
        }
    }

    fn fail(&mut self, out: &mut Vec<Result<String, GenerationError>>, err: GenerationError) {
        self.failed = true;
        out.push(Err(err));
    }
}
