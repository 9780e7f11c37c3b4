//! Environment-based configuration.
//!
//! All settings come from environment variables (a `.env` file is honored
//! via dotenvy in the binary). Defaults match the values the pipeline was
//! originally deployed with, so `corpusd ingest` works out of the box
//! against a `./corpus` directory.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory scanned for source documents.
    pub corpus_dir: PathBuf,
    /// SQLite database file backing the vector index.
    pub index_db: PathBuf,
    /// Flat-file ledger of `path:digest` keys for processed files.
    pub ledger_path: PathBuf,
    /// Seconds between scan cycles in continuous mode.
    pub scan_interval_secs: u64,
    /// Bind address for the retrieval HTTP service.
    pub bind: String,
    /// Lowercase extension allow-list for corpus discovery.
    pub extensions: Vec<String>,
    pub embedding: EmbeddingConfig,
}

/// Embedding gateway settings.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Base URL of the embedding gateway (`POST {url}/embed`).
    pub gateway_url: String,
    /// Fixed vector dimensionality for the whole index lifetime.
    pub dims: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries with exponential backoff on transient failures.
    pub max_retries: u32,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Split out from [`Config::from_env`] so tests can supply values
    /// without mutating process-global state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let scan_interval_secs: u64 = parse(&get("SCAN_INTERVAL_SECS", "300"), "SCAN_INTERVAL_SECS")?;
        let dims: usize = parse(&get("EMBED_DIMS", "1536"), "EMBED_DIMS")?;
        let timeout_secs: u64 = parse(&get("EMBED_TIMEOUT_SECS", "30"), "EMBED_TIMEOUT_SECS")?;
        let max_retries: u32 = parse(&get("EMBED_MAX_RETRIES", "2"), "EMBED_MAX_RETRIES")?;

        let extensions: Vec<String> = get("CORPUS_EXTENSIONS", "pdf,docx,txt,md,html,pptx")
            .split(',')
            .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = Config {
            corpus_dir: PathBuf::from(get("CORPUS_DIR", "./corpus")),
            index_db: PathBuf::from(get("INDEX_DB", "./data/index.sqlite")),
            ledger_path: PathBuf::from(get("LEDGER_PATH", "./data/processed_files.txt")),
            scan_interval_secs,
            bind: get("BIND", "0.0.0.0:8080"),
            extensions,
            embedding: EmbeddingConfig {
                gateway_url: get("EMBED_GATEWAY_URL", "http://localhost:3000")
                    .trim_end_matches('/')
                    .to_string(),
                dims,
                timeout_secs,
                max_retries,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.dims == 0 {
            bail!("EMBED_DIMS must be > 0");
        }
        if self.embedding.timeout_secs == 0 {
            bail!("EMBED_TIMEOUT_SECS must be > 0");
        }
        if self.scan_interval_secs == 0 {
            bail!("SCAN_INTERVAL_SECS must be > 0");
        }
        if self.extensions.is_empty() {
            bail!("CORPUS_EXTENSIONS must name at least one extension");
        }
        if self.bind.parse::<std::net::SocketAddr>().is_err() {
            bail!("BIND must be a host:port address, got '{}'", self.bind);
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid {}: '{}' ({})", key, value, e))
}
