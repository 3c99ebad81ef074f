//! Read-only accessor for the packaging descriptor.
//!
//! The declared project version lives under the `version` key of a
//! well-known TOML descriptor at the workspace root: `[package]` for a
//! Cargo manifest, `[project]` for a pyproject descriptor. The
//! descriptor is never written by this crate.

use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use toml_edit::DocumentMut;

/// Default packaging descriptor file name.
pub const DEFAULT_DESCRIPTOR: &str = "Cargo.toml";

/// Tables probed for a `version` key, in order.
const VERSION_TABLES: &[&str] = &["package", "project"];

/// The version string declared in the packaging descriptor at checkout
/// time. Read-only input to the version gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectVersion(String);

impl ProjectVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProjectVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Load the declared version from `descriptor` under `root`.
///
/// Probes `[package].version` then `[project].version`; the first
/// string value found wins.
pub fn declared_version(root: &Path, descriptor: &str) -> Result<ProjectVersion, MetadataError> {
    let path = root.join(descriptor);

    let raw = std::fs::read_to_string(&path).map_err(|source| MetadataError::Io {
        path: path.clone(),
        source,
    })?;

    let doc: DocumentMut = raw.parse().map_err(|source| MetadataError::Parse {
        path: path.clone(),
        source,
    })?;

    for table in VERSION_TABLES {
        if let Some(version) = doc
            .get(table)
            .and_then(|item| item.as_table_like())
            .and_then(|t| t.get("version"))
            .and_then(|v| v.as_str())
        {
            return Ok(ProjectVersion::new(version));
        }
    }

    Err(MetadataError::MissingVersion { path })
}
