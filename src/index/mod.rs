//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the narrow interface the pipeline sees;
//! backends are pluggable. [`SqliteIndex`] is the persistent engine used
//! in production, [`MemoryIndex`] backs tests and ephemeral setups.
//!
//! Contract highlights:
//! - `upsert` is insert-or-replace keyed by chunk id; repeating an
//!   identical upsert is observably a no-op.
//! - `search` returns at most `k` hits in ascending cosine distance.
//!   An empty index yields an empty result, never an error.
//! - The vector dimension is fixed for the index's lifetime; a mismatch
//!   is a configuration error, rejected at upsert.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryIndex;
pub use sqlite::SqliteIndex;

use async_trait::async_trait;

use crate::error::Result;

/// One indexed entry: a chunk's id, its embedding, and the retrievable
/// payload.
#[derive(Debug, Clone)]
pub struct IndexedVector {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub source: String,
    pub timestamp: i64,
}

/// A search hit, distance ascending (0.0 = identical direction).
#[derive(Debug, Clone)]
pub struct ScoredHit {
    pub text: String,
    pub source: String,
    pub timestamp: i64,
    pub distance: f32,
}

/// Persistent nearest-neighbor store over (id, vector, text, metadata)
/// tuples.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the entry for `entry.id`.
    async fn upsert(&self, entry: IndexedVector) -> Result<()>;

    /// Top-k entries by ascending cosine distance to `query`.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>>;

    /// Number of entries currently held.
    async fn len(&self) -> Result<u64>;
}

/// Cosine distance: `1 - cos(a, b)`. Smaller is closer.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - crate::embedding::cosine_similarity(a, b)
}

/// Sort hits ascending by distance and truncate to `k`.
pub(crate) fn rank_hits(mut hits: Vec<ScoredHit>, k: usize) -> Vec<ScoredHit> {
    hits.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}
