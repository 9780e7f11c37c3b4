//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Vectors are stored as little-endian f32 BLOBs and ranked in-process by
//! cosine distance. WAL mode keeps concurrent query-path reads cheap while
//! the ingestion worker writes.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::{Error, Result};
use crate::index::{cosine_distance, rank_hits, IndexedVector, ScoredHit, VectorIndex};

pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (creating if missing) the index database at `path` and ensure
    /// the schema exists. Idempotent.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::IndexUnavailable(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vectors (
                id TEXT PRIMARY KEY,
                embedding BLOB NOT NULL,
                dims INTEGER NOT NULL,
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_vectors_source ON vectors(source)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The dimension of vectors already in the index, if any.
    async fn stored_dims(&self) -> Result<Option<i64>> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM vectors LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(dims)
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    async fn upsert(&self, entry: IndexedVector) -> Result<()> {
        // Mixing dimensions is a configuration error, not a runtime-
        // recoverable case; reject before writing.
        if let Some(dims) = self.stored_dims().await? {
            if dims != entry.vector.len() as i64 {
                return Err(Error::Validation(format!(
                    "index holds {}-dim vectors, refusing {}-dim entry '{}'",
                    dims,
                    entry.vector.len(),
                    entry.id
                )));
            }
        }

        let blob = vec_to_blob(&entry.vector);
        sqlx::query(
            r#"
            INSERT INTO vectors (id, embedding, dims, text, source, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                embedding = excluded.embedding,
                dims = excluded.dims,
                text = excluded.text,
                source = excluded.source,
                timestamp = excluded.timestamp
            "#,
        )
        .bind(&entry.id)
        .bind(&blob)
        .bind(entry.vector.len() as i64)
        .bind(&entry.text)
        .bind(&entry.source)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>> {
        let rows = sqlx::query("SELECT embedding, text, source, timestamp FROM vectors")
            .fetch_all(&self.pool)
            .await?;

        let hits: Vec<ScoredHit> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                ScoredHit {
                    text: row.get("text"),
                    source: row.get("source"),
                    timestamp: row.get("timestamp"),
                    distance: cosine_distance(query, &vector),
                }
            })
            .collect();

        Ok(rank_hits(hits, k))
    }

    async fn len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vectors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}
