//! HTTP service integration tests, over a real socket.
//!
//! The app is bound to an ephemeral port and exercised with reqwest; the
//! embedding gateway is mocked with httpmock.

use std::sync::Arc;

use corpusd::config::EmbeddingConfig;
use corpusd::embedding::EmbeddingClient;
use corpusd::index::{MemoryIndex, VectorIndex};
use corpusd::server::{router, AppState};

const DIMS: usize = 3;

fn embedder(gateway_url: &str) -> Arc<EmbeddingClient> {
    Arc::new(
        EmbeddingClient::new(&EmbeddingConfig {
            gateway_url: gateway_url.to_string(),
            dims: DIMS,
            timeout_secs: 2,
            max_retries: 0,
        })
        .unwrap(),
    )
}

/// Serve the app on an ephemeral port, returning its base URL.
async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn mock_gateway() -> httpmock::MockServer {
    let server = httpmock::MockServer::start_async().await;
    // One vector per input text, all pointing the same direction; enough
    // for contract tests that don't care about ranking.
    server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST).path("/embed");
            then.status(200)
                .json_body(serde_json::json!({ "embeddings": [[1.0, 0.0, 0.0]] }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/embed")
                .json_body_partial(r#"{ "texts": ["x", "y"] }"#);
            then.status(200).json_body(serde_json::json!({
                "embeddings": [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0]]
            }));
        })
        .await;
    server
}

#[tokio::test]
async fn health_reports_service_name() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(embedder(&gateway.base_url()), index)).await;

    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "retrieval-service");
}

#[tokio::test]
async fn add_without_metadata_defaults_source_unknown() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(
        embedder(&gateway.base_url()),
        index.clone(),
    ))
    .await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/add", base))
        .json(&serde_json::json!({ "texts": ["x", "y"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["added"], 2);
    assert_eq!(index.len().await.unwrap(), 2);

    // Both entries come back through /search with the default metadata.
    let resp = client
        .post(format!("{}/search", base))
        .json(&serde_json::json!({ "query": "x", "k": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let documents = body["documents"].as_array().unwrap();
    assert_eq!(documents.len(), 2);
    for doc in documents {
        assert_eq!(doc["source"], "unknown");
    }
}

#[tokio::test]
async fn add_with_metadata_preserves_source() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(
        embedder(&gateway.base_url()),
        index.clone(),
    ))
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/add", base))
        .json(&serde_json::json!({
            "texts": ["noted"],
            "metadata": [{ "source": "manual-entry", "timestamp": 1700000000 }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let hits = index.search(&[1.0, 0.0, 0.0], 1).await.unwrap();
    assert_eq!(hits[0].source, "manual-entry");
    assert_eq!(hits[0].timestamp, 1_700_000_000);
}

#[tokio::test]
async fn add_rejects_mismatched_metadata_length() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(embedder(&gateway.base_url()), index)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/add", base))
        .json(&serde_json::json!({
            "texts": ["x", "y"],
            "metadata": [{ "source": "only-one" }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn malformed_search_body_is_400_with_message() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(embedder(&gateway.base_url()), index)).await;

    let client = reqwest::Client::new();

    // Missing required field.
    let resp = client
        .post(format!("{}/search", base))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
    assert!(!body["error"]["message"].as_str().unwrap().is_empty());

    // Not JSON at all.
    let resp = client
        .post(format!("{}/search", base))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn search_surfaces_gateway_failure_never_empty_success() {
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(embedder("http://127.0.0.1:9"), index)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&serde_json::json!({ "query": "anything", "k": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "provider_unavailable");
}

#[tokio::test]
async fn embed_endpoint_matches_input_order_and_length() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(embedder(&gateway.base_url()), index)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/embed", base))
        .json(&serde_json::json!({ "texts": ["x"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    let embeddings = body["embeddings"].as_array().unwrap();
    assert_eq!(embeddings.len(), 1);
    assert_eq!(embeddings[0].as_array().unwrap().len(), DIMS);
}

#[tokio::test]
async fn search_on_empty_index_returns_empty_documents() {
    let gateway = mock_gateway().await;
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
    let base = spawn_app(AppState::new(embedder(&gateway.base_url()), index)).await;

    let resp = reqwest::Client::new()
        .post(format!("{}/search", base))
        .json(&serde_json::json!({ "query": "nothing here", "k": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["documents"].as_array().unwrap().len(), 0);
}
