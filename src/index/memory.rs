//! In-memory [`VectorIndex`] implementation.
//!
//! Same contract as the SQLite backend, held in a `RwLock<HashMap>`.
//! Used by the test suite and useful for ephemeral setups where
//! persistence is not needed.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::index::{cosine_distance, rank_hits, IndexedVector, ScoredHit, VectorIndex};

#[derive(Default)]
pub struct MemoryIndex {
    entries: RwLock<HashMap<String, IndexedVector>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, entry: IndexedVector) -> Result<()> {
        let mut entries = self.entries.write().await;

        if let Some(existing) = entries.values().next() {
            if existing.vector.len() != entry.vector.len() {
                return Err(Error::Validation(format!(
                    "index holds {}-dim vectors, refusing {}-dim entry '{}'",
                    existing.vector.len(),
                    entry.vector.len(),
                    entry.id
                )));
            }
        }

        entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>> {
        let entries = self.entries.read().await;
        let hits: Vec<ScoredHit> = entries
            .values()
            .map(|entry| ScoredHit {
                text: entry.text.clone(),
                source: entry.source.clone(),
                timestamp: entry.timestamp,
                distance: cosine_distance(query, &entry.vector),
            })
            .collect();
        Ok(rank_hits(hits, k))
    }

    async fn len(&self) -> Result<u64> {
        Ok(self.entries.read().await.len() as u64)
    }
}
