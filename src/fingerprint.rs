//! Content fingerprinting for change detection.
//!
//! A fingerprint is the SHA-256 of a file's full byte content. It is
//! recomputed on every scan — no mtime shortcut — so renames, touched
//! timestamps, and in-place edits are all classified correctly.

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::Result;

/// Compute the hex SHA-256 digest of the file at `path`.
///
/// Fails with [`Error::Io`](crate::error::Error::Io) if the file cannot
/// be read; the scan loop skips such files and continues.
pub fn fingerprint(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn same_content_same_digest() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = tmp.path().join("a.txt");
        let b = tmp.path().join("b.txt");
        std::fs::write(&a, "identical bytes").unwrap();
        std::fs::write(&b, "identical bytes").unwrap();
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn changed_content_changes_digest() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("doc.txt");
        std::fs::write(&path, "version one").unwrap();
        let before = fingerprint(&path).unwrap();
        std::fs::write(&path, "version two").unwrap();
        let after = fingerprint(&path).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn unreadable_file_is_io_error() {
        let err = fingerprint(Path::new("/nonexistent/corpus/missing.txt")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn digest_is_hex_sha256() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("doc.txt");
        std::fs::write(&path, "").unwrap();
        let digest = fingerprint(&path).unwrap();
        // SHA-256 of the empty string.
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
