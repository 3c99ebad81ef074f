//! Artifact build stage.

use crate::artifact::{BuildArtifact, BuildArtifactSet};
use crate::error::BuildError;
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Produces build artifacts from a clean workspace.
///
/// Precondition: the orchestrator has reset the workspace's output
/// directories before calling `build`. A build failure is terminal for
/// the run and never retried.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    async fn build(&self, workspace: &dyn Workspace) -> Result<BuildArtifactSet, BuildError>;
}

/// Builder that runs a configured build command inside the workspace
/// and collects every file the output directory holds afterwards.
pub struct CommandArtifactBuilder {
    command: Vec<String>,
    output_dir: PathBuf,
    timeout: Duration,
}

impl CommandArtifactBuilder {
    /// `command` is the build invocation (first element is the
    /// executable); `output_dir` is relative to the workspace root.
    pub fn new(command: Vec<String>, output_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command,
            output_dir: output_dir.into(),
            timeout,
        }
    }

    /// Collect output files in sorted file-name order so two builds of
    /// identical source yield identically ordered sets.
    fn collect_artifacts(&self, workspace: &dyn Workspace) -> Result<BuildArtifactSet, BuildError> {
        let dir = workspace.root().join(&self.output_dir);
        if !dir.is_dir() {
            return Err(BuildError::NoArtifacts { dir });
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(BuildError::NoArtifacts { dir });
        }

        let mut artifacts = Vec::with_capacity(paths.len());
        for path in &paths {
            let artifact = BuildArtifact::from_path(path)?;
            debug!(
                file = %artifact.file_name,
                digest = %artifact.digest,
                size_bytes = artifact.size_bytes,
                "Collected build artifact"
            );
            artifacts.push(artifact);
        }

        Ok(BuildArtifactSet::new(artifacts))
    }
}

#[async_trait]
impl ArtifactBuilder for CommandArtifactBuilder {
    async fn build(&self, workspace: &dyn Workspace) -> Result<BuildArtifactSet, BuildError> {
        if self.command.is_empty() {
            return Err(BuildError::Spawn {
                command: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty build command"),
            });
        }

        let exe = &self.command[0];
        let args = &self.command[1..];
        let command_display = self.command.join(" ");

        info!(command = %command_display, "Running build command");

        let child = Command::new(exe)
            .args(args)
            .current_dir(workspace.root())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BuildError::Spawn {
                command: command_display.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| BuildError::TimedOut {
                timeout_secs: self.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(BuildError::CommandFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let set = self.collect_artifacts(workspace)?;
        info!(artifacts = set.len(), "Build produced artifact set");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::FsWorkspace;
    use std::fs;
    use tempfile::TempDir;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_build_collects_output_files_sorted() {
        let dir = TempDir::new().unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);

        let builder = CommandArtifactBuilder::new(
            sh("mkdir -p dist && echo b > dist/b.whl && echo a > dist/a.tar.gz"),
            "dist",
            Duration::from_secs(30),
        );

        let set = builder.build(&workspace).await.expect("build failed");
        assert_eq!(set.file_names(), vec!["a.tar.gz", "b.whl"]);
    }

    #[tokio::test]
    async fn test_failing_command_is_command_failed() {
        let dir = TempDir::new().unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);

        let builder = CommandArtifactBuilder::new(
            sh("echo broken >&2; exit 3"),
            "dist",
            Duration::from_secs(30),
        );

        let err = builder.build(&workspace).await.unwrap_err();
        match err {
            BuildError::CommandFailed { exit_code, stderr } => {
                assert_eq!(exit_code, 3);
                assert!(stderr.contains("broken"));
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output_dir_is_no_artifacts() {
        let dir = TempDir::new().unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);

        let builder =
            CommandArtifactBuilder::new(sh("mkdir -p dist"), "dist", Duration::from_secs(30));

        let err = builder.build(&workspace).await.unwrap_err();
        assert!(matches!(err, BuildError::NoArtifacts { .. }));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let dir = TempDir::new().unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);

        let builder = CommandArtifactBuilder::new(
            vec!["/nonexistent-build-tool".to_string()],
            "dist",
            Duration::from_secs(5),
        );

        let err = builder.build(&workspace).await.unwrap_err();
        assert!(matches!(err, BuildError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_slow_build_times_out() {
        let dir = TempDir::new().unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);

        let builder =
            CommandArtifactBuilder::new(sh("sleep 5"), "dist", Duration::from_millis(100));

        let err = builder.build(&workspace).await.unwrap_err();
        assert!(matches!(err, BuildError::TimedOut { .. }));
    }

    #[tokio::test]
    async fn test_subdirectories_are_not_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist/nested")).unwrap();
        let workspace = FsWorkspace::new(dir.path(), vec![PathBuf::from("dist")]);

        let builder = CommandArtifactBuilder::new(
            sh("echo pkg > dist/pkg.tar.gz"),
            "dist",
            Duration::from_secs(30),
        );

        let set = builder.build(&workspace).await.expect("build failed");
        assert_eq!(set.file_names(), vec!["pkg.tar.gz"]);
    }
}
