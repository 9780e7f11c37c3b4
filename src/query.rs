//! Query service: query text → top-k retrieved documents.
//!
//! Stateless over shared handles; invoked concurrently by the HTTP layer.
//! Embedding runs in fail-fast mode here — searching with a placeholder
//! vector would return nonsense ranked as if it were real, so provider
//! failures surface to the caller instead.

use std::sync::Arc;

use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::index::VectorIndex;
use crate::models::RetrievedDocument;

pub struct QueryService {
    embedder: Arc<EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
}

impl QueryService {
    pub fn new(embedder: Arc<EmbeddingClient>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Top-k search. `k < 1` is coerced to 1; empty query text is
    /// forwarded as-is (the gateway returns a valid vector for it).
    pub async fn search(&self, query: &str, k: i64) -> Result<Vec<RetrievedDocument>> {
        let k = k.max(1) as usize;

        let query_vec = self.embedder.embed_query(query).await?;
        let hits = self.index.search(&query_vec, k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedDocument {
                text: hit.text,
                source: hit.source,
                timestamp: hit.timestamp,
            })
            .collect())
    }
}
