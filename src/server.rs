//! Retrieval HTTP service.
//!
//! Exposes the query pipeline over a JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check |
//! | `POST` | `/search` | Top-k semantic search |
//! | `POST` | `/embed`  | Embed a batch of texts (fail-fast) |
//! | `POST` | `/add`    | Raw append of texts to the index |
//!
//! # Error Contract
//!
//! Failures are never masked as empty-but-successful results: every error
//! response carries a structured payload,
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "metadata length must match texts" } }
//! ```
//!
//! with `bad_request` (400) for malformed bodies and validation failures,
//! `provider_unavailable` (502) when the embedding gateway is down, and
//! `index_unavailable` (503) when the vector store cannot be reached.

use std::sync::Arc;

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::error::Error;
use crate::index::{IndexedVector, VectorIndex};
use crate::models::RetrievedDocument;
use crate::query::QueryService;

/// Shared handles passed to all route handlers; constructed once at
/// process start and injected, no ambient globals.
#[derive(Clone)]
pub struct AppState {
    query: Arc<QueryService>,
    embedder: Arc<EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
}

impl AppState {
    pub fn new(embedder: Arc<EmbeddingClient>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            query: Arc::new(QueryService::new(embedder.clone(), index.clone())),
            embedder,
            index,
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/embed", post(handle_embed))
        .route("/add", post(handle_add))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is terminated.
pub async fn run_server(config: &Config, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!(bind = %config.bind, "retrieval service listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::Validation(msg) => bad_request(msg),
            Error::Provider(msg) => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "provider_unavailable",
                message: msg,
            },
            Error::IndexUnavailable(msg) => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "index_unavailable",
                message: msg,
            },
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: other.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "retrieval-service",
    })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_k")]
    k: i64,
}

fn default_k() -> i64 {
    5
}

#[derive(Serialize)]
struct SearchResponse {
    documents: Vec<RetrievedDocument>,
}

async fn handle_search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Json(req) = payload?;
    let documents = state.query.search(&req.query, req.k).await?;
    Ok(Json(SearchResponse { documents }))
}

// ============ POST /embed ============

#[derive(Deserialize)]
struct EmbedRequest {
    texts: Vec<String>,
}

#[derive(Serialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embeds in fail-fast mode: callers of this endpoint want real vectors,
/// not placeholders.
async fn handle_embed(
    State(state): State<AppState>,
    payload: Result<Json<EmbedRequest>, JsonRejection>,
) -> Result<Json<EmbedResponse>, AppError> {
    let Json(req) = payload?;
    let embeddings = state.embedder.embed_strict(&req.texts).await?;
    Ok(Json(EmbedResponse { embeddings }))
}

// ============ POST /add ============

#[derive(Deserialize)]
struct AddRequest {
    texts: Vec<String>,
    #[serde(default)]
    metadata: Option<Vec<serde_json::Value>>,
}

#[derive(Serialize)]
struct AddResponse {
    status: &'static str,
    added: usize,
}

/// Raw append path: each text gets a fresh unique id, distinct from the
/// deterministic chunk-id scheme, and is not reconciled against the
/// ledger. Missing metadata defaults to `{"source": "unknown"}`.
/// Embedding runs in the ingestion-path degraded mode so a gateway
/// outage does not reject writes.
async fn handle_add(
    State(state): State<AppState>,
    payload: Result<Json<AddRequest>, JsonRejection>,
) -> Result<Json<AddResponse>, AppError> {
    let Json(req) = payload?;

    if let Some(ref metadata) = req.metadata {
        if metadata.len() != req.texts.len() {
            return Err(bad_request(format!(
                "metadata length {} does not match texts length {}",
                metadata.len(),
                req.texts.len()
            )));
        }
    }

    let batch = state.embedder.embed_for_ingest(&req.texts).await;
    let now = chrono::Utc::now().timestamp();

    for (i, (text, vector)) in req.texts.iter().zip(batch.vectors.into_iter()).enumerate() {
        let meta = req.metadata.as_ref().and_then(|m| m.get(i));
        let source = meta
            .and_then(|m| m.get("source"))
            .and_then(|s| s.as_str())
            .unwrap_or("unknown")
            .to_string();
        let timestamp = meta
            .and_then(|m| m.get("timestamp"))
            .and_then(|t| t.as_i64())
            .unwrap_or(now);

        state
            .index
            .upsert(IndexedVector {
                id: uuid::Uuid::new_v4().to_string(),
                vector,
                text: text.clone(),
                source,
                timestamp,
            })
            .await?;
    }

    Ok(Json(AddResponse {
        status: "success",
        added: req.texts.len(),
    }))
}
