//! Error types for the release pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// The trigger's tag version does not match the version declared in the
/// packaging descriptor.
///
/// `expected` is the version carried by the tag (prefix stripped);
/// `actual` is the version the checkout declares. The gate is hard: a
/// mismatch halts the run before any build or publish.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("tag declares version '{expected}' but packaging metadata declares '{actual}'")]
pub struct VersionMismatch {
    pub expected: String,
    pub actual: String,
}

/// Errors produced while reading the packaging descriptor.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The descriptor file could not be read.
    #[error("failed to read packaging descriptor {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The descriptor is not valid TOML.
    #[error("packaging descriptor {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_edit::TomlError,
    },

    /// No `version` key was found under a recognized table.
    #[error("no version declared in packaging descriptor {path}")]
    MissingVersion { path: PathBuf },
}

/// Errors produced by an artifact build. Terminal for the run; a build
/// failure reflects a source defect, not a transient condition, so it
/// is never retried.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build command could not be spawned.
    #[error("failed to launch build command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The build command ran and exited non-zero.
    #[error("build command exited with code {exit_code}: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// The build exceeded the orchestrator-supplied timeout.
    #[error("build timed out after {timeout_secs} seconds")]
    TimedOut { timeout_secs: u64 },

    /// The build succeeded but the output directory holds no files.
    #[error("build produced no artifacts in {dir}")]
    NoArtifacts { dir: PathBuf },

    /// Filesystem error while resetting the workspace or collecting
    /// artifacts.
    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors produced by a registry publish attempt.
///
/// Only `Transient` is eligible for bounded retry by the orchestrator;
/// `AuthFailure` and `Conflict` are fatal per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The registry rejected the credential, or no credential could be
    /// resolved for the target.
    #[error("registry '{registry}' rejected credentials: {reason}")]
    AuthFailure { registry: String, reason: String },

    /// The artifact/version already exists at the target. Republishing
    /// a version is disallowed to preserve registry immutability.
    #[error("registry '{registry}' already holds '{artifact}' at this version")]
    Conflict { registry: String, artifact: String },

    /// Network failure, server error, or timeout. May succeed on retry.
    #[error("transient failure publishing to registry '{registry}': {reason}")]
    Transient { registry: String, reason: String },
}

impl PublishError {
    /// Whether the orchestrator may retry this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, PublishError::Transient { .. })
    }

    /// Name of the registry the failure occurred against.
    pub fn registry(&self) -> &str {
        match self {
            PublishError::AuthFailure { registry, .. }
            | PublishError::Conflict { registry, .. }
            | PublishError::Transient { registry, .. } => registry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_mismatch_displays_both_versions() {
        let err = VersionMismatch {
            expected: "2.0.1".to_string(),
            actual: "2.0.2".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2.0.1"));
        assert!(msg.contains("2.0.2"));
    }

    #[test]
    fn test_publish_error_transient_classification() {
        let transient = PublishError::Transient {
            registry: "staging".to_string(),
            reason: "503".to_string(),
        };
        let auth = PublishError::AuthFailure {
            registry: "staging".to_string(),
            reason: "expired token".to_string(),
        };
        let conflict = PublishError::Conflict {
            registry: "production".to_string(),
            artifact: "pkg-2.0.1.tar.gz".to_string(),
        };

        assert!(transient.is_transient());
        assert!(!auth.is_transient());
        assert!(!conflict.is_transient());
    }

    #[test]
    fn test_publish_error_registry_name() {
        let err = PublishError::Conflict {
            registry: "production".to_string(),
            artifact: "pkg.whl".to_string(),
        };
        assert_eq!(err.registry(), "production");
    }

    #[test]
    fn test_build_error_displays_stderr() {
        let err = BuildError::CommandFailed {
            exit_code: 1,
            stderr: "missing module".to_string(),
        };
        assert!(err.to_string().contains("missing module"));
    }
}
