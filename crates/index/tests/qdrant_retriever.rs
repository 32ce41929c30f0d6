//! Exercises `QdrantRetriever` against an in-process fake Qdrant.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use index::{EmbeddingVector, QdrantRetriever, RetrievalError, Retriever, RetrieverConfig};

type Captured = Arc<Mutex<Vec<Value>>>;

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn fake_qdrant(hits: Value, captured: Captured) -> SocketAddr {
    let router = Router::new()
        .route(
            "/collections/{name}/points/search",
            post(move |Path(name): Path<String>, Json(body): Json<Value>| {
                let captured = captured.clone();
                let hits = hits.clone();
                async move {
                    if name != "book" {
                        return (
                            StatusCode::NOT_FOUND,
                            Json(json!({"status": {"error": "Not found: Collection `x` doesn't exist!"}})),
                        );
                    }
                    if body["vector"].as_array().map_or(0, Vec::len) != 2 {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({"status": {"error": "Wrong input: Vector dimension error"}})),
                        );
                    }
                    captured.lock().unwrap().push(body);
                    (StatusCode::OK, Json(json!({"result": hits, "status": "ok", "time": 0.001})))
                }
            }),
        )
        .route(
            "/collections/{name}",
            get(|Path(name): Path<String>| async move {
                if name == "book" {
                    (StatusCode::OK, Json(json!({"result": {"status": "green"}})))
                } else {
                    (StatusCode::NOT_FOUND, Json(json!({"status": {"error": "missing"}})))
                }
            }),
        );
    spawn(router).await
}

fn config(addr: SocketAddr, collection: &str) -> RetrieverConfig {
    RetrieverConfig {
        url: format!("http://{addr}"),
        collection: collection.into(),
        ..Default::default()
    }
}

fn three_hits() -> Value {
    json!([
        {"id": 2, "version": 0, "score": 0.71, "payload": {"text": "Actuators move joints.", "url": "https://book/ch2"}},
        {"id": 1, "version": 0, "score": 0.93, "payload": {"text": "Physical AI is embodied intelligence.", "url": "https://book/ch1"}},
        {"id": "c3", "version": 0, "score": 0.40, "payload": {"text": "Sensors perceive the world."}}
    ])
}

#[tokio::test]
async fn search_returns_passages_by_descending_score() {
    let captured: Captured = Arc::default();
    let addr = fake_qdrant(three_hits(), captured.clone()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();

    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap();

    let ids: Vec<_> = passages.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["1", "2", "c3"]);
    assert_eq!(passages[0].source_url.as_deref(), Some("https://book/ch1"));
    assert!(passages[2].source_url.is_none());

    let bodies = captured.lock().unwrap();
    assert_eq!(bodies[0]["limit"], 3);
    assert_eq!(bodies[0]["with_payload"], true);
}

#[tokio::test]
async fn result_is_truncated_to_k() {
    let addr = fake_qdrant(three_hits(), Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();

    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 1)
        .await
        .unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].id, "1");
}

#[tokio::test]
async fn fewer_hits_than_k_is_not_padded() {
    let hits = json!([{"id": 9, "score": 0.8, "payload": {"text": "Only one."}}]);
    let addr = fake_qdrant(hits, Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();

    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap();
    assert_eq!(passages.len(), 1);
}

#[tokio::test]
async fn empty_collection_is_not_an_error() {
    let addr = fake_qdrant(json!([]), Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();

    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap();
    assert!(passages.is_empty());
}

#[tokio::test]
async fn hits_without_text_are_skipped() {
    let hits = json!([
        {"id": 1, "score": 0.9, "payload": {"url": "https://book/no-text"}},
        {"id": 2, "score": 0.5, "payload": {"text": "Has text."}}
    ]);
    let addr = fake_qdrant(hits, Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();

    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap();
    assert_eq!(passages.len(), 1);
    assert_eq!(passages[0].id, "2");
}

#[tokio::test]
async fn score_threshold_is_forwarded_and_applied() {
    let captured: Captured = Arc::default();
    let addr = fake_qdrant(three_hits(), captured.clone()).await;
    let cfg = RetrieverConfig {
        score_threshold: Some(0.5),
        ..config(addr, "book")
    };
    let retriever = QdrantRetriever::new(&cfg).unwrap();

    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap();
    assert_eq!(passages.len(), 2);
    assert!((captured.lock().unwrap()[0]["score_threshold"].as_f64().unwrap() - 0.5).abs() < 1e-6);
}

#[tokio::test]
async fn missing_collection_is_reported() {
    let addr = fake_qdrant(three_hits(), Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "other")).unwrap();

    let err = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap_err();
    assert_eq!(err, RetrievalError::CollectionNotFound("other".into()));
    assert!(retriever.ensure_ready().await.is_err());
}

#[tokio::test]
async fn wrong_dimension_is_bad_vector() {
    let addr = fake_qdrant(three_hits(), Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();

    let err = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2, 0.3]), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::BadVector(_)));
}

#[tokio::test]
async fn ready_probe_succeeds_for_existing_collection() {
    let addr = fake_qdrant(json!([]), Arc::default()).await;
    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();
    retriever.ensure_ready().await.unwrap();
}

#[tokio::test]
async fn zero_k_skips_the_request() {
    let cfg = RetrieverConfig {
        url: "http://127.0.0.1:9".into(),
        ..Default::default()
    };
    let retriever = QdrantRetriever::new(&cfg).unwrap();
    let passages = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 0)
        .await
        .unwrap();
    assert!(passages.is_empty());
}

#[tokio::test]
async fn unreachable_index() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let retriever = QdrantRetriever::new(&config(addr, "book")).unwrap();
    let err = retriever
        .retrieve(&EmbeddingVector::new(vec![0.1, 0.2]), 3)
        .await
        .unwrap_err();
    assert!(matches!(err, RetrievalError::Unreachable(_)));
}
