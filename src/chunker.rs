//! Chunk extraction: document → deduplicated, ordered chunk records.
//!
//! Wraps a [`Partitioner`] and assigns each non-empty element a
//! deterministic id derived from the source path and the element's
//! position. Ids are SHA-256 hex, so they are bounded in length no matter
//! how deep the source path is, and stable across re-runs.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::extract::Partitioner;
use crate::models::Chunk;

/// Deterministic chunk id for `(source, element index)`.
pub fn chunk_id(source: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(b"#");
    hasher.update(index.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Converts one source document into an ordered list of [`Chunk`]s.
pub struct ChunkExtractor {
    partitioner: Arc<dyn Partitioner>,
}

impl ChunkExtractor {
    pub fn new(partitioner: Arc<dyn Partitioner>) -> Self {
        Self { partitioner }
    }

    /// Partition `path` and emit one chunk per element with non-empty
    /// trimmed text.
    ///
    /// Ids are keyed by the element index, not the emitted chunk position,
    /// so filtering whitespace elements never shifts the ids of the
    /// elements that follow. All-or-nothing: a partitioner failure
    /// produces no chunks at all for this file.
    pub fn extract(&self, path: &Path) -> Result<Vec<Chunk>> {
        let elements = self.partitioner.partition(path)?;
        let source = path.to_string_lossy().to_string();
        let now = chrono::Utc::now().timestamp();

        let chunks = elements
            .iter()
            .enumerate()
            .filter_map(|(index, element)| {
                let text = element.trim();
                if text.is_empty() {
                    return None;
                }
                Some(Chunk {
                    id: chunk_id(&source, index),
                    text: text.to_string(),
                    source: source.clone(),
                    timestamp: now,
                })
            })
            .collect();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::PathBuf;

    struct FixedPartitioner(Vec<String>);

    impl Partitioner for FixedPartitioner {
        fn partition(&self, _path: &Path) -> Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    struct FailingPartitioner;

    impl Partitioner for FailingPartitioner {
        fn partition(&self, path: &Path) -> Result<Vec<String>> {
            Err(Error::Extraction {
                path: path.to_path_buf(),
                reason: "corrupt document".to_string(),
            })
        }
    }

    fn elements(items: &[&str]) -> Arc<dyn Partitioner> {
        Arc::new(FixedPartitioner(
            items.iter().map(|s| s.to_string()).collect(),
        ))
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let extractor = ChunkExtractor::new(elements(&["one", "two"]));
        let path = PathBuf::from("/corpus/a.txt");
        let first = extractor.extract(&path).unwrap();
        let second = extractor.extract(&path).unwrap();
        assert_eq!(first.len(), 2);
        let first_ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
        let second_ids: Vec<_> = second.iter().map(|c| c.id.clone()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn whitespace_elements_dropped_without_shifting_ids() {
        let extractor = ChunkExtractor::new(elements(&["one", "   ", "three"]));
        let chunks = extractor.extract(Path::new("/corpus/a.txt")).unwrap();
        assert_eq!(chunks.len(), 2);
        // The surviving elements keep their element-index ids.
        assert_eq!(chunks[0].id, chunk_id("/corpus/a.txt", 0));
        assert_eq!(chunks[1].id, chunk_id("/corpus/a.txt", 2));
    }

    #[test]
    fn text_is_trimmed() {
        let extractor = ChunkExtractor::new(elements(&["  padded  "]));
        let chunks = extractor.extract(Path::new("/corpus/a.txt")).unwrap();
        assert_eq!(chunks[0].text, "padded");
    }

    #[test]
    fn ids_differ_across_sources_and_positions() {
        assert_ne!(chunk_id("/corpus/a.txt", 0), chunk_id("/corpus/a.txt", 1));
        assert_ne!(chunk_id("/corpus/a.txt", 0), chunk_id("/corpus/b.txt", 0));
    }

    #[test]
    fn id_length_is_bounded() {
        let deep = format!("/corpus/{}/doc.txt", "nested/".repeat(64));
        assert_eq!(chunk_id(&deep, 9999).len(), 64);
    }

    #[test]
    fn partitioner_failure_yields_no_chunks() {
        let extractor = ChunkExtractor::new(Arc::new(FailingPartitioner));
        let err = extractor.extract(Path::new("/corpus/bad.pdf")).unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn all_empty_elements_yield_empty_chunk_list() {
        let extractor = ChunkExtractor::new(elements(&["", "  ", "\n"]));
        let chunks = extractor.extract(Path::new("/corpus/blank.txt")).unwrap();
        assert!(chunks.is_empty());
    }
}
