//! Workspace collaborator.
//!
//! The checkout itself is externally supplied; the pipeline only needs
//! a root directory and a way to clear stale build output before each
//! build. Each run must own its workspace exclusively — concurrent
//! runs sharing one workspace would race on `reset()`.

use std::path::{Path, PathBuf};

/// A checkout directory the pipeline builds in.
pub trait Workspace: Send + Sync {
    /// Root of the checkout.
    fn root(&self) -> &Path;

    /// Remove build-output subdirectories so the next build starts
    /// from a clean state. Called by the orchestrator before every
    /// build attempt.
    fn reset(&self) -> std::io::Result<()>;
}

/// Filesystem-backed workspace.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    root: PathBuf,
    output_dirs: Vec<PathBuf>,
}

impl FsWorkspace {
    /// `output_dirs` are paths relative to `root` that hold build
    /// output (e.g. `dist`, `target/package`).
    pub fn new(root: impl Into<PathBuf>, output_dirs: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            output_dirs,
        }
    }
}

impl Workspace for FsWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn reset(&self) -> std::io::Result<()> {
        for dir in &self.output_dirs {
            let path = self.root.join(dir);
            if path.exists() {
                std::fs::remove_dir_all(&path)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_reset_removes_output_dirs() {
        let dir = TempDir::new().unwrap();
        let dist = dir.path().join("dist");
        fs::create_dir(&dist).unwrap();
        fs::write(dist.join("stale.tar.gz"), b"old").unwrap();

        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);
        workspace.reset().unwrap();

        assert!(!dist.exists());
    }

    #[test]
    fn test_reset_leaves_sources_alone() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("src.rs"), b"fn main() {}").unwrap();

        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);
        workspace.reset().unwrap();

        assert!(dir.path().join("src.rs").exists());
    }

    #[test]
    fn test_reset_on_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);
        assert!(workspace.reset().is_ok());
    }
}
