//! # corpusd
//!
//! Corpus ingestion worker and semantic retrieval service for RAG
//! pipelines.
//!
//! A batch/periodic worker scans a corpus directory, detects new or
//! changed documents by content fingerprint, splits them into chunks with
//! deterministic ids, embeds the chunks through a remote gateway, and
//! reconciles them against a persistent vector index. An HTTP service
//! answers top-k similarity queries over the same index.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌───────────┐
//! │ corpus dir │──▶│ fingerprint →     │──▶│  SQLite   │
//! │ txt/md/pdf │   │ chunk → embed     │   │  vectors  │
//! │ docx/pptx  │   │ (ledger-gated)    │   └─────┬─────┘
//! └────────────┘   └──────────────────┘         │
//!                                  ┌────────────┤
//!                                  ▼            ▼
//!                             ┌─────────┐  ┌─────────┐
//!                             │   CLI   │  │  HTTP   │
//!                             │(corpusd)│  │ /search │
//!                             └─────────┘  └─────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! corpusd init              # create the index database
//! corpusd ingest --once     # scan the corpus directory once
//! corpusd ingest            # scan continuously
//! corpusd search "deployment" --k 3
//! corpusd serve             # start the retrieval HTTP service
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment-based configuration |
//! | [`error`] | Pipeline error taxonomy |
//! | [`fingerprint`] | Content digests for change detection |
//! | [`extract`] | Document partitioning (txt, md, html, pdf, docx, pptx) |
//! | [`chunker`] | Chunk extraction with deterministic ids |
//! | [`embedding`] | Embedding gateway client, degraded-mode fallback |
//! | [`index`] | Vector index trait, SQLite and in-memory backends |
//! | [`ledger`] | Processed-file ledger |
//! | [`worker`] | Ingestion coordinator and scan lifecycle |
//! | [`query`] | Query service |
//! | [`server`] | Retrieval HTTP service |

pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod index;
pub mod ledger;
pub mod models;
pub mod query;
pub mod server;
pub mod worker;
