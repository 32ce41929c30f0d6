#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ragchat::generation::{FragmentStream, GenerationError, GenerationRequest, Generator};
use ragchat::index::{EmbeddingVector, MemoryIndex, MemoryPoint, Passage, RetrievalError, Retriever};
use ragchat::semantic::{EmbedMode, Embedder, EmbeddingError};
use ragchat::{ChatPipeline, PipelineConfig, StreamEvent};

/// Maps known questions to fixed vectors; everything else gets `[0, 0, 1]`.
#[derive(Default)]
pub struct FakeEmbedder {
    pub calls: AtomicUsize,
    pub modes: Mutex<Vec<EmbedMode>>,
    pub delay: Option<Duration>,
    pub fail: Option<EmbeddingError>,
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        "fake-embedder"
    }

    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<EmbeddingVector, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.modes.lock().unwrap().push(mode);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.fail {
            return Err(err.clone());
        }
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }
        let v = if text.contains("physical ai") {
            vec![1.0, 0.0, 0.0]
        } else if text.contains("sensor") {
            vec![0.0, 1.0, 0.0]
        } else {
            vec![0.0, 0.0, 1.0]
        };
        Ok(EmbeddingVector::new(v))
    }
}

pub fn book_index() -> MemoryIndex {
    MemoryIndex::new(vec![
        MemoryPoint::new(
            "p1",
            "Physical AI is intelligence embodied in a robot body.",
            vec![1.0, 0.0, 0.0],
        )
            .with_url("https://book.example/ch1"),
        MemoryPoint::new("p2", "Sensors let humanoids perceive the world.", vec![0.2, 1.0, 0.0])
            .with_url("https://book.example/ch2"),
        MemoryPoint::new("p3", "Actuators convert energy into motion.", vec![0.6, 0.1, 0.3]),
        MemoryPoint::new("p4", "ROS 2 connects robot software components.", vec![0.1, 0.2, 0.9]),
    ])
    .with_score_threshold(Some(0.5))
}

pub struct FailingRetriever(pub RetrievalError);

#[async_trait]
impl Retriever for FailingRetriever {
    fn name(&self) -> &str {
        "failing"
    }

    async fn retrieve(
        &self,
        _: &EmbeddingVector,
        _: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        Err(self.0.clone())
    }

    async fn ensure_ready(&self) -> Result<(), RetrievalError> {
        Err(self.0.clone())
    }
}

/// Sets a flag when dropped; lets tests observe upstream cancellation.
pub struct DropFlag(pub Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Plays back fixed fragments, then optionally fails or hangs.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fragments: Vec<String>,
    pub fail_after: Option<GenerationError>,
    pub fail_on_open: Option<GenerationError>,
    pub hang_after: bool,
    pub requests: Mutex<Vec<GenerationRequest>>,
    pub dropped: Arc<AtomicBool>,
}

impl ScriptedGenerator {
    pub fn replying(fragments: &[&str]) -> Self {
        Self {
            fragments: fragments.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn last_request(&self) -> GenerationRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<FragmentStream, GenerationError> {
        self.requests.lock().unwrap().push(request);
        if let Some(err) = &self.fail_on_open {
            return Err(err.clone());
        }

        let guard = DropFlag(self.dropped.clone());
        let mut items: Vec<Result<String, GenerationError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        if let Some(err) = &self.fail_after {
            items.push(Err(err.clone()));
        }
        let played = stream::iter(items);

        let tail = if self.hang_after {
            stream::pending().boxed()
        } else {
            stream::empty().boxed()
        };

        Ok(played
            .chain(tail)
            .map(move |item| {
                let _keep = &guard;
                item
            })
            .boxed())
    }
}

pub fn pipeline(
    embedder: impl Embedder + 'static,
    retriever: impl Retriever + 'static,
    generator: Arc<ScriptedGenerator>,
) -> ChatPipeline {
    ChatPipeline::new(
        Arc::new(embedder),
        Arc::new(retriever),
        generator,
        PipelineConfig::default(),
    )
}

pub fn contents(events: &[StreamEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Content(text) => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

pub fn source_ids(events: &[StreamEvent]) -> Vec<String> {
    match events.first() {
        Some(StreamEvent::Sources(sources)) => sources.iter().map(|p| p.id.clone()).collect(),
        other => panic!("first event is not sources: {other:?}"),
    }
}

/// Checks the ordering contract: one leading `Sources`, contents, one terminal.
pub fn assert_well_formed(events: &[StreamEvent]) {
    assert!(events.len() >= 2, "too few events: {events:?}");
    assert!(matches!(events[0], StreamEvent::Sources(_)), "first: {:?}", events[0]);
    let last = events.last().unwrap();
    assert!(last.is_terminal(), "last: {last:?}");
    for event in &events[1..events.len() - 1] {
        assert!(matches!(event, StreamEvent::Content(_)), "middle: {event:?}");
    }
}
