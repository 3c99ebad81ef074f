//! Gangway core - release verification and publish pipeline
//!
//! Models one linear release flow: a version-tag push on the release
//! line is gated against the packaging metadata, built into a fresh
//! artifact set, published to the staging registry, then promoted to
//! production. Checkout, toolchain setup, archive internals, and
//! registry wire formats are external collaborators behind traits.

pub mod artifact;
pub mod builder;
pub mod error;
pub mod fakes;
pub mod gate;
pub mod metadata;
pub mod pipeline;
pub mod publisher;
pub mod registry;
pub mod telemetry;
pub mod trigger;
pub mod workspace;

// Re-export key types
pub use artifact::{BuildArtifact, BuildArtifactSet};
pub use builder::{ArtifactBuilder, CommandArtifactBuilder};
pub use error::{BuildError, MetadataError, PublishError, VersionMismatch};
pub use gate::VersionGate;
pub use metadata::{declared_version, ProjectVersion, DEFAULT_DESCRIPTOR};
pub use pipeline::{PipelineConfig, PipelineRun, ReleasePipeline, RunStatus, Stage, StageOutcome};
pub use publisher::{HttpRegistryPublisher, RegistryPublisher};
pub use registry::{Credential, CredentialSource, RegistryTarget};
pub use telemetry::init_tracing;
pub use trigger::{ReleaseTrigger, DEFAULT_RELEASE_LINE, DEFAULT_TAG_PREFIX};
pub use workspace::{FsWorkspace, Workspace};

/// Gangway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
