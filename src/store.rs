//! Content-addressed artifact storage.
//!
//! Artifacts are stored once per distinct content, named
//! `{first-12-hex-chars-of-sha256}{original-extension}`. The existence check
//! and the write are not mutually exclusive across workers; two workers
//! racing on the same hash write identical bytes to the same name, which is
//! benign and covered by an explicit test.

use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Hex prefix length used in artifact file names.
const NAME_HASH_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// SHA-256 of the content, lowercase hex.
    pub fn content_hash(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Artifact file name for a hash and its original extension.
    pub fn artifact_name(hash: &str, extension: &str) -> String {
        let prefix = &hash[..NAME_HASH_LEN.min(hash.len())];
        format!("{}{}", prefix, extension)
    }

    pub fn artifact_path(&self, hash: &str, extension: &str) -> PathBuf {
        self.root.join(Self::artifact_name(hash, extension))
    }

    pub fn contains(&self, hash: &str, extension: &str) -> bool {
        self.artifact_path(hash, extension).exists()
    }

    /// Persist content under its hash-derived name.
    ///
    /// Returns the artifact path and whether a write happened. An existing
    /// artifact is left untouched — identical bytes are never stored twice.
    pub fn put(&self, hash: &str, extension: &str, bytes: &[u8]) -> io::Result<(PathBuf, bool)> {
        let path = self.artifact_path(hash, extension);
        if path.exists() {
            return Ok((path, false));
        }
        std::fs::write(&path, bytes)?;
        Ok((path, true))
    }

    /// Read an artifact back for processing.
    pub fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Lowercased extension of a URL path, dot included; empty when absent.
pub fn url_extension(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit('/').next().and_then(|name| name.rfind('.')) {
        Some(idx) => {
            let name = path.rsplit('/').next().unwrap_or("");
            name[idx..].to_lowercase()
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_name_is_hash_prefix_plus_extension() {
        let hash = ArtifactStore::content_hash(b"mission report");
        let name = ArtifactStore::artifact_name(&hash, ".pdf");
        assert_eq!(name.len(), 12 + 4);
        assert!(name.ends_with(".pdf"));
        assert!(hash.starts_with(name.trim_end_matches(".pdf")));
    }

    #[test]
    fn put_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(tmp.path()).unwrap();
        let hash = ArtifactStore::content_hash(b"bytes");

        let (path1, written1) = store.put(&hash, ".pdf", b"bytes").unwrap();
        let (path2, written2) = store.put(&hash, ".pdf", b"bytes").unwrap();

        assert!(written1);
        assert!(!written2);
        assert_eq!(path1, path2);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn url_extension_handles_query_strings_and_case() {
        assert_eq!(url_extension("https://x.org/a/report.PDF"), ".pdf");
        assert_eq!(url_extension("https://x.org/a/report.docx?v=2"), ".docx");
        assert_eq!(url_extension("https://x.org/a/report"), "");
        assert_eq!(url_extension("https://x.org/"), "");
    }
}
