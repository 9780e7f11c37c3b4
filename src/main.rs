//! # corpusd CLI
//!
//! Entry point for both halves of the pipeline: the ingestion worker and
//! the retrieval HTTP service.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `corpusd init` | Create the vector index database |
//! | `corpusd ingest` | Run the ingestion worker (continuous by default) |
//! | `corpusd ingest --once` | Run a single scan cycle and exit |
//! | `corpusd search "<query>"` | Query the index from the command line |
//! | `corpusd serve` | Start the retrieval HTTP service |
//!
//! Configuration comes from environment variables (a `.env` file is
//! honored). See [`corpusd::config::Config`] for the full list.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use corpusd::chunker::ChunkExtractor;
use corpusd::config::Config;
use corpusd::embedding::EmbeddingClient;
use corpusd::extract::FormatPartitioner;
use corpusd::index::{SqliteIndex, VectorIndex};
use corpusd::query::QueryService;
use corpusd::server::{self, AppState};
use corpusd::worker::IngestionCoordinator;

/// corpusd — corpus ingestion worker and semantic retrieval service.
#[derive(Parser)]
#[command(
    name = "corpusd",
    about = "Corpus ingestion worker and semantic retrieval service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vector index database.
    ///
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Run the ingestion worker over the corpus directory.
    ///
    /// Scans for new or changed documents, chunks and embeds them, and
    /// upserts into the vector index. Continuous by default; stops on
    /// SIGINT between cycles.
    Ingest {
        /// Run a single scan cycle and exit.
        #[arg(long)]
        once: bool,

        /// Seconds between scan cycles (overrides SCAN_INTERVAL_SECS).
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Query the index from the command line.
    Search {
        /// The query text.
        query: String,

        /// Number of results to return.
        #[arg(long, default_value_t = 5)]
        k: i64,
    },

    /// Start the retrieval HTTP service.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpusd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    match cli.command {
        Commands::Init => {
            SqliteIndex::open(&config.index_db).await?;
            tracing::info!(path = %config.index_db.display(), "index database initialized");
        }
        Commands::Ingest { once, interval } => {
            let index: Arc<dyn VectorIndex> = Arc::new(SqliteIndex::open(&config.index_db).await?);
            let embedder = Arc::new(EmbeddingClient::new(&config.embedding)?);
            let extractor = ChunkExtractor::new(Arc::new(FormatPartitioner));
            let mut coordinator =
                IngestionCoordinator::new(config.clone(), extractor, embedder, index)?;

            if once {
                coordinator.run_once().await?;
            } else {
                let interval = interval
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.scan_interval());
                coordinator.run_continuous(interval).await?;
            }
        }
        Commands::Search { query, k } => {
            let index: Arc<dyn VectorIndex> = Arc::new(SqliteIndex::open(&config.index_db).await?);
            let embedder = Arc::new(EmbeddingClient::new(&config.embedding)?);
            let service = QueryService::new(embedder, index);

            let results = service.search(&query, k).await?;
            if results.is_empty() {
                println!("No results.");
            } else {
                for (i, doc) in results.iter().enumerate() {
                    let date = chrono::DateTime::from_timestamp(doc.timestamp, 0)
                        .map(|dt| dt.format("%Y-%m-%d").to_string())
                        .unwrap_or_default();
                    println!("{}. {} ({})", i + 1, doc.source, date);
                    println!("   \"{}\"", doc.text.replace('\n', " ").trim());
                    println!();
                }
            }
        }
        Commands::Serve => {
            let index: Arc<dyn VectorIndex> = Arc::new(SqliteIndex::open(&config.index_db).await?);
            let embedder = Arc::new(EmbeddingClient::new(&config.embedding)?);
            let state = AppState::new(embedder, index);
            server::run_server(&config, state).await?;
        }
    }

    Ok(())
}
