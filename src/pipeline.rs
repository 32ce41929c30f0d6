use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use context::{AssembledContext, assemble};
use futures::stream::{self, StreamExt};
use generation::Generator;
use index::Retriever;
use semantic::Embedder;

use crate::streamer::{AnswerStreamer, EventStream};
use crate::{ConfigurationError, PipelineConfig, PipelineError, Query, StreamEvent};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Embedding,
    Retrieving,
    Assembling,
    Streaming,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Idle => "idle",
            PipelineStage::Embedding => "embedding",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Assembling => "assembling",
            PipelineStage::Streaming => "streaming",
            PipelineStage::Done => "done",
            PipelineStage::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query → embedding → retrieval → context → streamed answer.
///
/// Holds read-only handles only, so one instance serves any number of
/// concurrent requests. Cloning is cheap.
#[derive(Clone)]
pub struct ChatPipeline {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn Retriever>,
    streamer: AnswerStreamer,
    config: PipelineConfig,
}

enum Step {
    Pending(Query),
    Streaming(EventStream),
    Failed(String),
    Complete,
    Finished,
}

struct Run {
    step: Step,
    pipeline: ChatPipeline,
    outcome: Outcome,
}

/// Records how a run ended. A run dropped after its first poll but before a
/// terminal event counts as cancelled; a run never polled records nothing.
struct Outcome {
    started: Option<Instant>,
    recorded: bool,
}

impl Outcome {
    fn new() -> Self {
        Self {
            started: None,
            recorded: false,
        }
    }

    fn begin(&mut self) {
        metrics::counter!("chat_requests_total").increment(1);
        self.started = Some(Instant::now());
    }

    fn record(&mut self, stage: PipelineStage, outcome: &'static str) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        metrics::counter!("chat_stream_outcomes_total", "outcome" => outcome).increment(1);
        tracing::info!(
            stage = %stage,
            outcome,
            elapsed_ms = self.started.map_or(0, |t| t.elapsed().as_millis() as u64),
            "chat run finished"
        );
    }
}

impl Drop for Outcome {
    fn drop(&mut self) {
        if self.started.is_some() && !self.recorded {
            self.record(PipelineStage::Failed, "cancelled");
        }
    }
}

impl ChatPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        config: PipelineConfig,
    ) -> Self {
        let streamer = AnswerStreamer::new(generator, config.generation_timeout());
        Self {
            embedder,
            retriever,
            streamer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Model and backend names, for logs and the info endpoint.
    pub fn describe(&self) -> (String, String, String) {
        (
            self.embedder.model_name().to_string(),
            self.retriever.name().to_string(),
            self.streamer.model_name().to_string(),
        )
    }

    /// Startup probe. Fails when the collection is missing or unreachable.
    pub async fn check_ready(&self) -> Result<(), ConfigurationError> {
        self.config.validate()?;
        self.retriever.ensure_ready().await?;
        Ok(())
    }

    /// Embeds, retrieves and assembles the context for `query`.
    ///
    /// Embedding and retrieval together are bounded by `retrieval_timeout_ms`.
    /// The raw question is embedded; a selection only joins the context, ahead of
    /// every retrieved passage.
    ///
    /// A selection longer than `context_budget_chars` is refused before any
    /// upstream call; it is never cut.
    pub async fn retrieve_context(&self, query: &Query) -> Result<AssembledContext, PipelineError> {
        let budget = self.config.context_budget_chars;
        if let Some(chars) = query.selected_chars().filter(|&chars| chars > budget) {
            return Err(PipelineError::SelectionTooLong { chars, budget });
        }

        let limit = self.config.retrieval_timeout();
        let started = Instant::now();

        let searched = tokio::time::timeout(limit, async {
            tracing::debug!(
                stage = %PipelineStage::Embedding,
                query_len = query.text.len(),
                "embedding question"
            );
            let vector = self.embedder.embed_query(&query.text).await?;

            tracing::debug!(
                stage = %PipelineStage::Retrieving,
                backend = self.retriever.name(),
                k = self.config.top_k,
                "searching index"
            );
            let passages = self.retriever.retrieve(&vector, self.config.top_k).await?;
            Ok::<_, PipelineError>(passages)
        })
        .await;
        metrics::histogram!("chat_retrieval_seconds").record(started.elapsed().as_secs_f64());
        let passages = searched.map_err(|_| PipelineError::RetrievalTimeout(limit))??;

        tracing::debug!(
            stage = %PipelineStage::Assembling,
            passages = passages.len(),
            selected = query.selected_text.is_some(),
            "assembling context"
        );
        Ok(assemble(&passages, query.selected_text.as_deref(), budget))
    }

    /// Runs the pipeline for `query`.
    ///
    /// Nothing happens until the stream is first polled. The stream yields one
    /// `Sources`, then `Content` items, then exactly one `Error` or `End`. A failure
    /// before generation yields an empty `Sources` followed by the `Error`.
    /// Dropping the stream cancels the run, including any in-flight upstream call.
    pub fn run(&self, query: Query) -> EventStream {
        let run = Run {
            step: Step::Pending(query),
            pipeline: self.clone(),
            outcome: Outcome::new(),
        };

        stream::unfold(run, |mut run| async move {
            loop {
                match std::mem::replace(&mut run.step, Step::Finished) {
                    Step::Pending(query) => {
                        run.outcome.begin();
                        match run.pipeline.retrieve_context(&query).await {
                            Ok(context) => {
                                tracing::debug!(
                                    stage = %PipelineStage::Streaming,
                                    chunks = context.ordered_chunks.len(),
                                    context_chars = context.char_len(),
                                    "streaming answer"
                                );
                                let events = run.pipeline.streamer.stream(context, &query.text);
                                run.step = Step::Streaming(events);
                            }
                            Err(err) => {
                                tracing::warn!(
                                    stage = %PipelineStage::Failed,
                                    kind = err.kind(),
                                    error = %err,
                                    "chat run failed before streaming"
                                );
                                run.step = Step::Failed(err.to_string());
                                return Some((StreamEvent::Sources(Vec::new()), run));
                            }
                        }
                    }
                    Step::Streaming(mut events) => match events.next().await {
                        Some(StreamEvent::End) => run.step = Step::Complete,
                        Some(event) => {
                            if event.is_terminal() {
                                run.outcome.record(PipelineStage::Failed, "failed");
                            } else {
                                run.step = Step::Streaming(events);
                            }
                            return Some((event, run));
                        }
                        None => run.step = Step::Complete,
                    },
                    Step::Failed(message) => {
                        run.outcome.record(PipelineStage::Failed, "failed");
                        return Some((StreamEvent::Error(message), run));
                    }
                    Step::Complete => {
                        run.outcome.record(PipelineStage::Done, "completed");
                        return Some((StreamEvent::End, run));
                    }
                    Step::Finished => return None,
                }
            }
        })
        .boxed()
    }
}
