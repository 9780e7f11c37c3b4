//! Ingestion coordinator.
//!
//! Drives the scan lifecycle over a corpus directory: discover files,
//! filter against the processed ledger by content fingerprint, extract
//! chunks, embed, upsert into the vector index, and commit the ledger.
//!
//! Failure containment: per-file errors are logged and skipped — the file
//! stays out of the ledger and is retried on the next cycle. A file is
//! committed only after every one of its chunks is upserted; re-upserting
//! on retry is safe because chunk ids are deterministic and upsert is
//! idempotent. In continuous mode a cycle-level error triggers a backoff
//! sleep, never a process exit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::chunker::ChunkExtractor;
use crate::config::Config;
use crate::embedding::EmbeddingClient;
use crate::error::Result;
use crate::fingerprint::fingerprint;
use crate::index::{IndexedVector, VectorIndex};
use crate::ledger::ProcessedLedger;

/// Sleep after a failed cycle in continuous mode.
const CYCLE_RETRY_BACKOFF: Duration = Duration::from_secs(60);

/// Directories never worth scanning for documents.
const DEFAULT_EXCLUDES: &[&str] = &["**/.git/**", "**/target/**", "**/node_modules/**"];

/// Counters for one scan cycle.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub discovered: u64,
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub chunks_indexed: u64,
    /// Files whose chunks were indexed with placeholder vectors because
    /// the embedding gateway was unavailable.
    pub degraded_files: u64,
}

struct FileOutcome {
    chunks: u64,
    degraded: bool,
}

pub struct IngestionCoordinator {
    config: Arc<Config>,
    extractor: ChunkExtractor,
    embedder: Arc<EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    ledger: ProcessedLedger,
}

impl IngestionCoordinator {
    /// Build a coordinator, loading the ledger from disk.
    pub fn new(
        config: Arc<Config>,
        extractor: ChunkExtractor,
        embedder: Arc<EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self> {
        let ledger = ProcessedLedger::load(&config.ledger_path)?;
        Ok(Self {
            config,
            extractor,
            embedder,
            index,
            ledger,
        })
    }

    /// Files under the corpus directory matching the extension allow-list,
    /// in deterministic order.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        let root = &self.config.corpus_dir;
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("corpus directory does not exist: {}", root.display()),
            )
            .into());
        }

        let excludes = build_globset(DEFAULT_EXCLUDES)?;
        let mut files = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path);
            if excludes.is_match(relative) {
                continue;
            }

            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase())
                .unwrap_or_default();
            if self.config.extensions.iter().any(|allowed| *allowed == ext) {
                files.push(path.to_path_buf());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Run one full scan cycle and persist the ledger.
    pub async fn run_cycle(&mut self) -> Result<CycleStats> {
        let files = self.discover()?;
        let mut stats = CycleStats {
            discovered: files.len() as u64,
            ..CycleStats::default()
        };

        tracing::info!(
            corpus = %self.config.corpus_dir.display(),
            files = files.len(),
            "scan cycle started"
        );

        for path in &files {
            let digest = match fingerprint(path) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "unreadable file, skipping");
                    stats.failed += 1;
                    continue;
                }
            };

            let key = ProcessedLedger::key(path, &digest);
            if self.ledger.contains(&key) {
                tracing::debug!(path = %path.display(), "already processed, skipping");
                stats.skipped += 1;
                continue;
            }

            match self.ingest_file(path).await {
                Ok(outcome) => {
                    // Commit only after every chunk is durably upserted.
                    self.ledger.insert(key);
                    stats.processed += 1;
                    stats.chunks_indexed += outcome.chunks;
                    if outcome.degraded {
                        stats.degraded_files += 1;
                    }
                    tracing::info!(
                        path = %path.display(),
                        chunks = outcome.chunks,
                        degraded = outcome.degraded,
                        "file ingested"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "file ingestion failed, will retry next cycle"
                    );
                    stats.failed += 1;
                }
            }
        }

        self.ledger.persist()?;

        tracing::info!(
            processed = stats.processed,
            skipped = stats.skipped,
            failed = stats.failed,
            chunks = stats.chunks_indexed,
            degraded_files = stats.degraded_files,
            "scan cycle complete"
        );
        Ok(stats)
    }

    /// Extract, embed, and upsert a single file. All-or-nothing for
    /// ledger purposes: any error here leaves the file uncommitted.
    async fn ingest_file(&self, path: &Path) -> Result<FileOutcome> {
        let chunks = self.extractor.extract(path)?;
        if chunks.is_empty() {
            return Ok(FileOutcome {
                chunks: 0,
                degraded: false,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let batch = self.embedder.embed_for_ingest(&texts).await;

        for (chunk, vector) in chunks.iter().zip(batch.vectors.into_iter()) {
            self.index
                .upsert(IndexedVector {
                    id: chunk.id.clone(),
                    vector,
                    text: chunk.text.clone(),
                    source: chunk.source.clone(),
                    timestamp: chunk.timestamp,
                })
                .await?;
        }

        Ok(FileOutcome {
            chunks: chunks.len() as u64,
            degraded: batch.degraded,
        })
    }

    /// Run a single cycle and return.
    pub async fn run_once(&mut self) -> Result<CycleStats> {
        self.run_cycle().await
    }

    /// Run cycles forever, sleeping `interval` between them, until a
    /// termination signal arrives. Cancellation takes effect between
    /// cycles, never mid-write to the ledger.
    pub async fn run_continuous(&mut self, interval: Duration) -> Result<()> {
        tracing::info!(interval_secs = interval.as_secs(), "continuous ingestion started");

        loop {
            let sleep_for = match self.run_cycle().await {
                Ok(_) => interval,
                Err(e) => {
                    tracing::error!(error = %e, "scan cycle failed, backing off");
                    CYCLE_RETRY_BACKOFF
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received, stopping ingestion worker");
                    return Ok(());
                }
            }
        }
    }
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()).into())
}
