//! Streaming retrieval-augmented question answering.
//!
//! [`ChatPipeline`] answers a [`Query`] about the book corpus:
//!
//! 1. the question is embedded in query mode ([`semantic`])
//! 2. the nearest passages are fetched from the vector index ([`index`])
//! 3. passages and any highlighted selection are packed into a bounded context
//!    ([`context`])
//! 4. the model answer is streamed back fragment by fragment ([`generation`])
//!
//! The output is a lazy stream of [`StreamEvent`]s with a fixed shape: one
//! `Sources` first (possibly empty), zero or more `Content`, then exactly one of
//! `Error` or `End`. Failures never escape as panics or `Err`s once a run has
//! started; they become the single `Error` event, since the transport may already
//! be mid-response.
//!
//! Nothing is retried. A transient upstream failure reaches the caller, who can
//! issue the query again.
//!
//! ```
//! use std::sync::Arc;
//!
//! use futures::StreamExt;
//! use generation::StubGenerator;
//! use index::{MemoryIndex, MemoryPoint};
//! use ragchat::{ChatPipeline, PipelineConfig, Query, StreamEvent};
//! use semantic::StubEmbedder;
//!
//! #[tokio::main]
//! async fn main() {
//!     let embedder = StubEmbedder::new(16, true);
//!     let text = "Physical AI is intelligence embodied in a robot.";
//!     let index = MemoryIndex::new(vec![MemoryPoint::new(
//!         "ch1",
//!         text,
//!         embedder.vector_for(text).into_inner(),
//!     )]);
//!
//!     let pipeline = ChatPipeline::new(
//!         Arc::new(embedder),
//!         Arc::new(index),
//!         Arc::new(StubGenerator::new()),
//!         PipelineConfig::default(),
//!     );
//!
//!     let events: Vec<_> = pipeline.run(Query::new("what is physical ai?")).collect().await;
//!     assert!(matches!(events.first(), Some(StreamEvent::Sources(_))));
//!     assert_eq!(events.last(), Some(&StreamEvent::End));
//! }
//! ```

mod config;
mod error;
mod event;
mod wire;
mod pipeline;
pub mod prompt;
mod streamer;

pub use crate::config::PipelineConfig;
pub use crate::error::{ConfigurationError, PipelineError};
pub use crate::event::{Query, StreamEvent};
pub use crate::pipeline::{ChatPipeline, PipelineStage};
pub use crate::streamer::{AnswerStreamer, EventStream};
pub use generation::DECLINE_MESSAGE;

pub use context;
pub use generation;
pub use index;
pub use semantic;
