use std::sync::Arc;
use std::time::Duration;

use context::AssembledContext;
use futures::stream::{self, BoxStream, StreamExt};
use generation::{FragmentStream, GenerationRequest, Generator};
use index::Passage;
use tokio::time::{Instant, timeout_at};

use crate::prompt::build_request;
use crate::{PipelineError, StreamEvent};

/// Lazy, finite, non-restartable sequence of events for one request.
pub type EventStream = BoxStream<'static, StreamEvent>;

/// Drives one generation call and turns it into [`StreamEvent`]s.
#[derive(Clone)]
pub struct AnswerStreamer {
    generator: Arc<dyn Generator>,
    timeout: Duration,
}

enum State {
    Sources {
        sources: Vec<Passage>,
        request: GenerationRequest,
    },
    Opening(GenerationRequest),
    Streaming {
        fragments: FragmentStream,
        deadline: Instant,
    },
    Finished,
}

impl AnswerStreamer {
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model_name()
    }

    /// Streams the answer to `question` grounded on `context`.
    ///
    /// The first item is always `Sources`, yielded before the generator is
    /// contacted. `Content` items follow; an `Error` ends the stream. No `End` is
    /// emitted here.
    pub fn stream(&self, context: AssembledContext, question: &str) -> EventStream {
        let initial = State::Sources {
            request: build_request(&context, question),
            sources: context.source_list,
        };
        let generator = self.generator.clone();
        let limit = self.timeout;

        stream::unfold(initial, move |state| {
            let generator = generator.clone();
            async move {
                match state {
                    State::Sources { sources, request } => {
                        Some((StreamEvent::Sources(sources), State::Opening(request)))
                    }
                    State::Opening(request) => {
                        let deadline = Instant::now() + limit;
                        match timeout_at(deadline, generator.generate(request)).await {
                            Ok(Ok(fragments)) => next_fragment(fragments, deadline, limit).await,
                            Ok(Err(err)) => Some(fail(err.into())),
                            Err(_) => Some(fail(PipelineError::GenerationTimeout(limit))),
                        }
                    }
                    State::Streaming {
                        fragments,
                        deadline,
                    } => next_fragment(fragments, deadline, limit).await,
                    State::Finished => None,
                }
            }
        })
        .boxed()
    }
}

async fn next_fragment(
    mut fragments: FragmentStream,
    deadline: Instant,
    limit: Duration,
) -> Option<(StreamEvent, State)> {
    loop {
        match timeout_at(deadline, fragments.next()).await {
            Ok(Some(Ok(text))) if text.is_empty() => {}
            Ok(Some(Ok(text))) => {
                return Some((
                    StreamEvent::Content(text),
                    State::Streaming {
                        fragments,
                        deadline,
                    },
                ));
            }
            Ok(Some(Err(err))) => return Some(fail(err.into())),
            Ok(None) => return None,
            Err(_) => return Some(fail(PipelineError::GenerationTimeout(limit))),
        }
    }
}

fn fail(err: PipelineError) -> (StreamEvent, State) {
    tracing::warn!(kind = err.kind(), error = %err, "answer stream failed");
    (StreamEvent::Error(err.to_string()), State::Finished)
}
