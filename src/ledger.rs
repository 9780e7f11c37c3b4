//! Processed-file ledger.
//!
//! A flat file of `path:digest` keys, one per line, recording which
//! (file, content-version) pairs have been fully indexed. Loaded at
//! startup, rewritten atomically (temp file + rename) at the end of each
//! scan cycle so a crash never leaves a truncated ledger behind.
//!
//! The coordinator inserts a key only after all of that file's chunks are
//! confirmed written to the index; a partially-ingested file is never
//! marked processed.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub struct ProcessedLedger {
    path: PathBuf,
    keys: HashSet<String>,
}

impl ProcessedLedger {
    /// Ledger key for a source file at a given content version.
    pub fn key(path: &Path, digest: &str) -> String {
        format!("{}:{}", path.display(), digest)
    }

    /// Load the ledger from `path`. A missing file is an empty ledger,
    /// not an error.
    pub fn load(path: &Path) -> Result<Self> {
        let keys = match std::fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path: path.to_path_buf(),
            keys,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Record a fully-indexed file. Returns false if the key was already
    /// present.
    pub fn insert(&mut self, key: String) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Rewrite the ledger file atomically: write a sibling temp file,
    /// fsync, then rename over the target.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            let mut lines: Vec<&String> = self.keys.iter().collect();
            lines.sort();
            for key in lines {
                writeln!(file, "{}", key)?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
