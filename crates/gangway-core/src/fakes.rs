//! In-memory fakes for the pipeline collaborators (testing only)
//!
//! Provides `FakeWorkspace`, `FakeArtifactBuilder`, and
//! `FakeRegistryPublisher` that satisfy the trait contracts without
//! touching the filesystem or network, plus a shared `CallLog` for
//! asserting cross-collaborator ordering.

use crate::artifact::{BuildArtifact, BuildArtifactSet};
use crate::builder::ArtifactBuilder;
use crate::error::{BuildError, PublishError};
use crate::publisher::RegistryPublisher;
use crate::registry::RegistryTarget;
use crate::workspace::Workspace;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of collaborator calls. Clones share one log.
#[derive(Debug, Default, Clone)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// FakeWorkspace
// ---------------------------------------------------------------------------

/// Workspace fake that counts resets instead of deleting anything.
#[derive(Debug)]
pub struct FakeWorkspace {
    root: PathBuf,
    resets: Mutex<u32>,
    log: CallLog,
}

impl FakeWorkspace {
    pub fn new(log: CallLog) -> Self {
        Self {
            root: PathBuf::from("."),
            resets: Mutex::new(0),
            log,
        }
    }

    pub fn reset_count(&self) -> u32 {
        *self.resets.lock().unwrap()
    }
}

impl Workspace for FakeWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    fn reset(&self) -> std::io::Result<()> {
        *self.resets.lock().unwrap() += 1;
        self.log.record("reset");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeArtifactBuilder
// ---------------------------------------------------------------------------

/// Builder fake returning a fixed artifact set, or failing every call.
pub struct FakeArtifactBuilder {
    artifacts: Vec<BuildArtifact>,
    fail_with: Option<String>,
    builds: Mutex<u32>,
    log: CallLog,
}

impl FakeArtifactBuilder {
    /// A builder that succeeds with one synthetic artifact.
    pub fn succeeding(log: CallLog) -> Self {
        Self {
            artifacts: vec![synthetic_artifact("pkg-1.0.0.tar.gz")],
            fail_with: None,
            builds: Mutex::new(0),
            log,
        }
    }

    /// A builder whose every call fails with `CommandFailed`.
    pub fn failing(stderr: impl Into<String>, log: CallLog) -> Self {
        Self {
            artifacts: Vec::new(),
            fail_with: Some(stderr.into()),
            builds: Mutex::new(0),
            log,
        }
    }

    pub fn with_artifacts(artifacts: Vec<BuildArtifact>, log: CallLog) -> Self {
        Self {
            artifacts,
            fail_with: None,
            builds: Mutex::new(0),
            log,
        }
    }

    pub fn build_count(&self) -> u32 {
        *self.builds.lock().unwrap()
    }
}

#[async_trait]
impl ArtifactBuilder for FakeArtifactBuilder {
    async fn build(&self, _workspace: &dyn Workspace) -> Result<BuildArtifactSet, BuildError> {
        *self.builds.lock().unwrap() += 1;
        self.log.record("build");

        match &self.fail_with {
            Some(stderr) => Err(BuildError::CommandFailed {
                exit_code: 1,
                stderr: stderr.clone(),
            }),
            None => Ok(BuildArtifactSet::new(self.artifacts.clone())),
        }
    }
}

/// An artifact record that does not exist on disk.
pub fn synthetic_artifact(file_name: &str) -> BuildArtifact {
    BuildArtifact {
        path: PathBuf::from("/dist").join(file_name),
        file_name: file_name.to_string(),
        size_bytes: 4,
        digest: "0".repeat(64),
    }
}

// ---------------------------------------------------------------------------
// FakeRegistryPublisher
// ---------------------------------------------------------------------------

/// Publisher fake with per-registry scripted outcomes.
///
/// Each registry name holds a queue of results consumed one per
/// `publish` call; an empty queue means success. Calls are recorded in
/// order as `publish:<registry>`.
pub struct FakeRegistryPublisher {
    scripted: Mutex<HashMap<String, VecDeque<Result<(), PublishError>>>>,
    calls: Mutex<Vec<String>>,
    delay: Mutex<Option<std::time::Duration>>,
    log: CallLog,
}

impl FakeRegistryPublisher {
    pub fn new(log: CallLog) -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
            log,
        }
    }

    /// Make every publish call sleep for `delay` after being recorded,
    /// so orchestrator-side publish timeouts can be exercised.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Queue `result` for the next publish against `registry`.
    pub fn script(&self, registry: &str, result: Result<(), PublishError>) {
        self.scripted
            .lock()
            .unwrap()
            .entry(registry.to_string())
            .or_default()
            .push_back(result);
    }

    /// Registry names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryPublisher for FakeRegistryPublisher {
    async fn publish(
        &self,
        _artifacts: &BuildArtifactSet,
        target: &RegistryTarget,
    ) -> Result<(), PublishError> {
        self.calls.lock().unwrap().push(target.name.clone());
        self.log.record(format!("publish:{}", target.name));

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.scripted
            .lock()
            .unwrap()
            .get_mut(&target.name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Ok(()))
    }
}
