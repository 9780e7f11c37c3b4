//! Core data models.
//!
//! These types represent the chunks and search results that flow through
//! the ingestion and retrieval pipeline.

use serde::Serialize;

/// A contiguous span of extracted text, the unit of indexing and retrieval.
///
/// The id is a deterministic function of the source path and the element's
/// position within the document, so re-extracting an unchanged file yields
/// identical ids and re-ingestion upserts instead of duplicating.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    /// Source file path the chunk was extracted from.
    pub source: String,
    /// Unix timestamp of extraction.
    pub timestamp: i64,
}

/// A single entry in a query response.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedDocument {
    pub text: String,
    pub source: String,
    pub timestamp: i64,
}
