//! Build artifacts and the per-run artifact set.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// One distributable file produced by a build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Absolute path of the artifact on disk.
    pub path: PathBuf,

    /// Bare file name, used as the upload name at the registry.
    pub file_name: String,

    /// File size in bytes.
    pub size_bytes: u64,

    /// Hex-encoded SHA-256 digest of the file contents.
    pub digest: String,
}

impl BuildArtifact {
    /// Construct an artifact record from a file on disk, digesting its
    /// contents.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&bytes);

        Ok(Self {
            path: path.to_path_buf(),
            file_name,
            size_bytes: bytes.len() as u64,
            digest: hex::encode(hasher.finalize()),
        })
    }
}

/// Ordered, immutable collection of the artifacts produced by one run.
///
/// Created fresh per run by the builder, consumed by each publish
/// call, and discarded with the run. Ordering is fixed at creation
/// (builders collect in sorted file-name order for determinism).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildArtifactSet {
    artifacts: Vec<BuildArtifact>,
}

impl BuildArtifactSet {
    pub fn new(artifacts: Vec<BuildArtifact>) -> Self {
        Self { artifacts }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildArtifact> {
        self.artifacts.iter()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// File names in set order.
    pub fn file_names(&self) -> Vec<&str> {
        self.artifacts.iter().map(|a| a.file_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_artifact_from_path_digests_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkg-1.0.0.tar.gz");
        fs::write(&path, b"hello").unwrap();

        let artifact = BuildArtifact::from_path(&path).unwrap();
        assert_eq!(artifact.file_name, "pkg-1.0.0.tar.gz");
        assert_eq!(artifact.size_bytes, 5);
        // sha256("hello")
        assert_eq!(
            artifact.digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_identical_contents_identical_digest() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.whl");
        let b = dir.path().join("b.whl");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        let da = BuildArtifact::from_path(&a).unwrap().digest;
        let db = BuildArtifact::from_path(&b).unwrap().digest;
        assert_eq!(da, db);
    }

    #[test]
    fn test_set_preserves_order() {
        let artifacts = vec![
            BuildArtifact {
                path: PathBuf::from("/dist/a.tar.gz"),
                file_name: "a.tar.gz".to_string(),
                size_bytes: 1,
                digest: "d1".to_string(),
            },
            BuildArtifact {
                path: PathBuf::from("/dist/b.whl"),
                file_name: "b.whl".to_string(),
                size_bytes: 2,
                digest: "d2".to_string(),
            },
        ];

        let set = BuildArtifactSet::new(artifacts);
        assert_eq!(set.len(), 2);
        assert_eq!(set.file_names(), vec!["a.tar.gz", "b.whl"]);
    }
}
