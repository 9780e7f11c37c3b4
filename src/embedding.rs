//! Embedding gateway client.
//!
//! Calls the remote gateway's `POST /embed` endpoint with a bounded
//! timeout and exponential-backoff retry. Two failure policies:
//!
//! - **Ingestion path** ([`EmbeddingClient::embed_for_ingest`]): a gateway
//!   outage must not block ingestion, so failures fall back to a
//!   deterministic placeholder vector of the configured dimension. The
//!   degradation is never silent — a warning is logged and the returned
//!   batch is flagged, so placeholder vectors are distinguishable in
//!   logs and metrics.
//! - **Query path** ([`EmbeddingClient::embed_query`]): fail-fast.
//!   Searching with a placeholder would return nonsense ranked as if it
//!   were real, which is worse than failing the request.
//!
//! Retry strategy (transient errors only): HTTP 429 and 5xx retry with
//! backoff 1s, 2s, 4s, ... (capped at 2^5); other 4xx fail immediately;
//! network errors retry.
//!
//! Also provides the vector utilities shared by the index backends:
//! [`vec_to_blob`], [`blob_to_vec`], and [`cosine_similarity`].

use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Client for the embedding gateway.
pub struct EmbeddingClient {
    http: reqwest::Client,
    gateway_url: String,
    dims: usize,
    max_retries: u32,
}

/// Result of an ingestion-path embedding call.
pub struct EmbeddedBatch {
    /// One vector per input text, in input order.
    pub vectors: Vec<Vec<f32>>,
    /// True when the gateway failed and placeholder vectors were
    /// substituted.
    pub degraded: bool,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Provider(e.to_string()))?;

        Ok(Self {
            http,
            gateway_url: config.gateway_url.clone(),
            dims: config.dims,
            max_retries: config.max_retries,
        })
    }

    /// Configured vector dimensionality.
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed a batch for ingestion. Never fails: on gateway failure the
    /// batch degrades to placeholder vectors and a warning is emitted.
    pub async fn embed_for_ingest(&self, texts: &[String]) -> EmbeddedBatch {
        match self.request_embeddings(texts).await {
            Ok(vectors) => EmbeddedBatch {
                vectors,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!(
                    gateway = %self.gateway_url,
                    batch_size = texts.len(),
                    error = %e,
                    "embedding gateway unavailable, indexing placeholder vectors"
                );
                EmbeddedBatch {
                    vectors: texts.iter().map(|_| self.placeholder()).collect(),
                    degraded: true,
                }
            }
        }
    }

    /// Embed a batch, failing fast on any gateway error.
    pub async fn embed_strict(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.request_embeddings(texts).await
    }

    /// Embed a single query text, failing fast on any gateway error.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.request_embeddings(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("empty embedding response".to_string()))
    }

    /// Deterministic placeholder of the configured dimension, used when
    /// the gateway is unreachable in degraded mode.
    pub fn placeholder(&self) -> Vec<f32> {
        vec![0.1; self.dims]
    }

    async fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embed", self.gateway_url);
        let body = serde_json::json!({ "texts": texts });

        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self.http.post(&url).json(&body).send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| Error::Provider(e.to_string()))?;
                        return self.parse_response(&json, texts.len());
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(Error::Provider(format!(
                            "gateway error {}: {}",
                            status, body_text
                        )));
                        continue;
                    }

                    // Client error — don't retry.
                    let body_text = response.text().await.unwrap_or_default();
                    return Err(Error::Provider(format!(
                        "gateway error {}: {}",
                        status, body_text
                    )));
                }
                Err(e) => {
                    last_err = Some(Error::Provider(format!(
                        "gateway unreachable at {}: {}",
                        self.gateway_url, e
                    )));
                    continue;
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Provider("embedding failed after retries".to_string())))
    }

    /// Parse `{"embeddings": [[f32, ...], ...]}`, enforcing the same
    /// length/order contract and the fixed dimension.
    fn parse_response(&self, json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
        let embeddings = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| Error::Provider("malformed response: missing embeddings".to_string()))?;

        if embeddings.len() != expected {
            return Err(Error::Provider(format!(
                "gateway returned {} embeddings for {} texts",
                embeddings.len(),
                expected
            )));
        }

        let mut vectors = Vec::with_capacity(embeddings.len());
        for embedding in embeddings {
            let vec: Vec<f32> = embedding
                .as_array()
                .ok_or_else(|| {
                    Error::Provider("malformed response: embedding is not an array".to_string())
                })?
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect();

            if vec.len() != self.dims {
                return Err(Error::Provider(format!(
                    "gateway returned {}-dim vector, index is {}-dim",
                    vec.len(),
                    self.dims
                )));
            }
            vectors.push(vec);
        }

        Ok(vectors)
    }
}

/// Encode a float vector as a BLOB (little-endian f32 bytes) for SQLite
/// storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(dims: usize) -> EmbeddingClient {
        EmbeddingClient::new(&EmbeddingConfig {
            gateway_url: "http://localhost:3000".to_string(),
            dims,
            timeout_secs: 5,
            max_retries: 0,
        })
        .unwrap()
    }

    #[test]
    fn vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn placeholder_has_configured_dims() {
        let c = client(1536);
        assert_eq!(c.placeholder().len(), 1536);
        // Deterministic: two placeholders are identical.
        assert_eq!(c.placeholder(), c.placeholder());
    }

    #[test]
    fn parse_rejects_count_mismatch() {
        let c = client(3);
        let json = serde_json::json!({ "embeddings": [[0.1, 0.2, 0.3]] });
        let err = c.parse_response(&json, 2).unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
    }

    #[test]
    fn parse_rejects_dimension_mismatch() {
        let c = client(3);
        let json = serde_json::json!({ "embeddings": [[0.1, 0.2]] });
        let err = c.parse_response(&json, 1).unwrap_err();
        assert!(err.to_string().contains("dim"));
    }

    #[test]
    fn parse_accepts_well_formed_response() {
        let c = client(2);
        let json = serde_json::json!({ "embeddings": [[0.1, 0.2], [0.3, 0.4]] });
        let vectors = c.parse_response(&json, 2).unwrap();
        assert_eq!(vectors, vec![vec![0.1f32, 0.2], vec![0.3f32, 0.4]]);
    }

    #[test]
    fn parse_rejects_missing_embeddings_key() {
        let c = client(2);
        let json = serde_json::json!({ "error": "boom" });
        assert!(c.parse_response(&json, 1).is_err());
    }
}
