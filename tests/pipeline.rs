mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::StreamExt;
use ragchat::context::NO_CONTEXT_MARKER;
use ragchat::generation::{GenerationError, StubGenerator};
use ragchat::index::{MemoryIndex, RetrievalError};
use ragchat::semantic::{EmbedMode, EmbeddingError};
use ragchat::{ChatPipeline, DECLINE_MESSAGE, PipelineConfig, Query, StreamEvent};

use common::*;

async fn collect(pipeline: &ChatPipeline, query: Query) -> Vec<StreamEvent> {
    pipeline.run(query).collect().await
}

#[tokio::test]
async fn answers_from_retrieved_passages() {
    let generator = Arc::new(ScriptedGenerator::replying(&[
        "Physical AI",
        " is embodied",
        " intelligence.",
    ]));
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator.clone());

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_well_formed(&events);
    assert_eq!(source_ids(&events), ["p1", "p3"]);
    assert_eq!(contents(&events), ["Physical AI", " is embodied", " intelligence."]);
    assert_eq!(events.last(), Some(&StreamEvent::End));

    let request = generator.last_request();
    assert!(request.user.contains("Physical AI is intelligence embodied in a robot body."));
    assert!(request.user.ends_with("Question:\nwhat is physical ai?"));
    assert!(request.system.contains(DECLINE_MESSAGE));
}

#[tokio::test]
async fn stub_answer_references_retrieved_text() {
    let pipeline = ChatPipeline::new(
        Arc::new(FakeEmbedder::default()),
        Arc::new(book_index()),
        Arc::new(StubGenerator::new()),
        PipelineConfig::default(),
    );

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;
    let answer = contents(&events).concat();

    assert!(!source_ids(&events).is_empty());
    assert!(answer.contains("Physical AI is intelligence embodied"));
    assert_ne!(answer, DECLINE_MESSAGE);
}

#[tokio::test]
async fn empty_collection_declines() {
    let pipeline = ChatPipeline::new(
        Arc::new(FakeEmbedder::default()),
        Arc::new(MemoryIndex::default()),
        Arc::new(StubGenerator::new()),
        PipelineConfig::default(),
    );

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_well_formed(&events);
    assert_eq!(events[0], StreamEvent::Sources(Vec::new()));
    assert_eq!(contents(&events).concat(), DECLINE_MESSAGE);
    assert_eq!(events.last(), Some(&StreamEvent::End));
}

#[tokio::test]
async fn empty_retrieval_prompts_with_no_context_marker() {
    let generator = Arc::new(ScriptedGenerator::replying(&[DECLINE_MESSAGE]));
    let pipeline = pipeline(FakeEmbedder::default(), MemoryIndex::default(), generator.clone());

    collect(&pipeline, Query::new("what is physical ai?")).await;

    let request = generator.last_request();
    assert!(request.user.contains(NO_CONTEXT_MARKER));
    assert!(request.grounding.is_empty());
}

#[tokio::test]
async fn selected_text_is_first_chunk() {
    let generator = Arc::new(ScriptedGenerator::replying(&["ok"]));
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator.clone());
    let selection = "Zero moment point control keeps a biped upright.";

    let events = collect(
        &pipeline,
        Query::new("what is physical ai?").with_selected_text(selection),
    )
    .await;

    let request = generator.last_request();
    assert_eq!(request.grounding[0], selection);
    assert_eq!(request.grounding.len(), 3);
    assert!(request.user.starts_with(&format!("Context:\n{selection}\n\n")));
    // The selection is context, not a source.
    assert_eq!(source_ids(&events), ["p1", "p3"]);
}

#[tokio::test]
async fn raw_question_is_embedded_in_query_mode() {
    let embedder = Arc::new(FakeEmbedder::default());
    let pipeline = ChatPipeline::new(
        embedder.clone(),
        Arc::new(book_index()),
        Arc::new(ScriptedGenerator::replying(&["ok"])),
        PipelineConfig::default(),
    );

    let events = collect(
        &pipeline,
        Query::new("tell me about sensor fusion").with_selected_text("what is physical ai?"),
    )
    .await;

    assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*embedder.modes.lock().unwrap(), [EmbedMode::Query]);
    assert_eq!(source_ids(&events), ["p2"]);
}

#[tokio::test]
async fn generation_failure_after_two_deltas() {
    let generator = Arc::new(ScriptedGenerator {
        fail_after: Some(GenerationError::Upstream("model overloaded".into())),
        ..ScriptedGenerator::replying(&["first", " second"])
    });
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator);

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_well_formed(&events);
    assert_eq!(events.len(), 4);
    assert_eq!(contents(&events), ["first", " second"]);
    assert!(matches!(&events[3], StreamEvent::Error(msg) if msg.contains("model overloaded")));
    assert!(!events.contains(&StreamEvent::End));
}

#[tokio::test]
async fn generation_rejected_before_any_text() {
    let generator = Arc::new(ScriptedGenerator {
        fail_on_open: Some(GenerationError::Auth("invalid api key".into())),
        ..Default::default()
    });
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator);

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(source_ids(&events), ["p1", "p3"]);
    assert!(matches!(&events[1], StreamEvent::Error(msg) if msg.contains("invalid api key")));
}

#[tokio::test]
async fn embedding_failure_yields_empty_sources_then_error() {
    let embedder = FakeEmbedder {
        fail: Some(EmbeddingError::Http {
            status: 429,
            body: "rate limited".into(),
        }),
        ..Default::default()
    };
    let generator = Arc::new(ScriptedGenerator::replying(&["never"]));
    let pipeline = pipeline(embedder, book_index(), generator.clone());

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Sources(Vec::new()));
    assert!(matches!(
        &events[1],
        StreamEvent::Error(msg) if msg.starts_with("failed to embed the question")
    ));
    assert!(generator.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_collection_is_an_error_event() {
    let generator = Arc::new(ScriptedGenerator::replying(&["never"]));
    let pipeline = pipeline(
        FakeEmbedder::default(),
        FailingRetriever(RetrievalError::CollectionNotFound("book".into())),
        generator,
    );

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Sources(Vec::new()));
    assert_eq!(
        events[1],
        StreamEvent::Error(
            "failed to search the book index: collection 'book' does not exist".into()
        )
    );
    assert!(pipeline.check_ready().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn slow_embedding_hits_retrieval_timeout() {
    let embedder = FakeEmbedder {
        delay: Some(Duration::from_secs(60)),
        ..Default::default()
    };
    let generator = Arc::new(ScriptedGenerator::replying(&["never"]));
    let pipeline = pipeline(embedder, book_index(), generator);

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Sources(Vec::new()));
    assert_eq!(events[1], StreamEvent::Error("retrieval timed out after 10000 ms".into()));
}

#[tokio::test(start_paused = true)]
async fn stalled_generation_hits_generation_timeout() {
    let generator = Arc::new(ScriptedGenerator {
        hang_after: true,
        ..ScriptedGenerator::replying(&["partial"])
    });
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator);

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_well_formed(&events);
    assert_eq!(contents(&events), ["partial"]);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Error("answer generation timed out after 120 s".into()))
    );
}

#[tokio::test]
async fn dropping_the_stream_cancels_generation() {
    let generator = Arc::new(ScriptedGenerator {
        hang_after: true,
        ..ScriptedGenerator::replying(&["a", "b"])
    });
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator.clone());

    let mut events = pipeline.run(Query::new("what is physical ai?"));
    assert!(matches!(events.next().await, Some(StreamEvent::Sources(_))));
    assert_eq!(events.next().await, Some(StreamEvent::Content("a".into())));
    assert!(!generator.dropped.load(Ordering::SeqCst));

    drop(events);
    assert!(generator.dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn nothing_runs_until_polled() {
    let embedder = Arc::new(FakeEmbedder::default());
    let pipeline = ChatPipeline::new(
        embedder.clone(),
        Arc::new(book_index()),
        Arc::new(ScriptedGenerator::replying(&["ok"])),
        PipelineConfig::default(),
    );

    let events = pipeline.run(Query::new("what is physical ai?"));
    tokio::task::yield_now().await;
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    drop(events);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_queries_retrieve_the_same_passages() {
    let generator = Arc::new(ScriptedGenerator::replying(&["x"]));
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator);

    let first = source_ids(&collect(&pipeline, Query::new("what is physical ai?")).await);
    let second = source_ids(&collect(&pipeline, Query::new("what is physical ai?")).await);
    assert_eq!(first, second);
}

#[tokio::test]
async fn fewer_relevant_passages_than_k_are_not_padded() {
    let generator = Arc::new(ScriptedGenerator::replying(&["x"]));
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator);

    let events = collect(&pipeline, Query::new("which sensor?")).await;
    assert_eq!(source_ids(&events), ["p2"]);
}

#[tokio::test]
async fn concurrent_runs_are_independent() {
    let generator = Arc::new(ScriptedGenerator::replying(&["one", " two"]));
    let pipeline = pipeline(FakeEmbedder::default(), book_index(), generator);

    let runs: Vec<_> = (0..8)
        .map(|i| {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let q = if i % 2 == 0 { "what is physical ai?" } else { "which sensor?" };
                pipeline.run(Query::new(q)).collect::<Vec<_>>().await
            })
        })
        .collect();

    for (i, handle) in runs.into_iter().enumerate() {
        let events = handle.await.unwrap();
        assert_well_formed(&events);
        let expected: &[&str] = if i % 2 == 0 { &["p1", "p3"] } else { &["p2"] };
        assert_eq!(source_ids(&events), expected);
        assert_eq!(events.last(), Some(&StreamEvent::End));
    }
}

#[tokio::test]
async fn context_budget_drops_overflowing_passages() {
    let generator = Arc::new(ScriptedGenerator::replying(&["x"]));
    let pipeline = ChatPipeline::new(
        Arc::new(FakeEmbedder::default()),
        Arc::new(book_index()),
        generator.clone(),
        PipelineConfig {
            context_budget_chars: 60,
            ..Default::default()
        },
    );

    let events = collect(&pipeline, Query::new("what is physical ai?")).await;

    assert_eq!(source_ids(&events), ["p1"]);
    assert_eq!(generator.last_request().grounding.len(), 1);
}

#[tokio::test]
async fn oversized_selection_is_refused_before_any_call() {
    let embedder = Arc::new(FakeEmbedder::default());
    let generator = Arc::new(ScriptedGenerator::replying(&["never"]));
    let pipeline = ChatPipeline::new(
        embedder.clone(),
        Arc::new(book_index()),
        generator.clone(),
        PipelineConfig {
            context_budget_chars: 10,
            ..Default::default()
        },
    );

    let query = Query::new("what is physical ai?").with_selected_text("eleven char");
    let events = collect(&pipeline, query).await;

    assert_eq!(events.len(), 2);
    assert_eq!(events[0], StreamEvent::Sources(Vec::new()));
    assert_eq!(
        events[1],
        StreamEvent::Error("selected text is 11 characters; the limit is 10".into())
    );
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert!(generator.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn selection_filling_the_budget_is_kept_verbatim() {
    let generator = Arc::new(ScriptedGenerator::replying(&["ok"]));
    let pipeline = ChatPipeline::new(
        Arc::new(FakeEmbedder::default()),
        Arc::new(book_index()),
        generator.clone(),
        PipelineConfig {
            context_budget_chars: 10,
            ..Default::default()
        },
    );

    let query = Query::new("what is physical ai?").with_selected_text("ten chars!");
    let events = collect(&pipeline, query).await;

    assert_well_formed(&events);
    assert!(source_ids(&events).is_empty());
    assert_eq!(generator.last_request().grounding, ["ten chars!"]);
}
