//! Release pipeline orchestration.
//!
//! One run is a strictly linear sequence: eligibility → version gate →
//! workspace reset → build → publish(staging) → publish(production).
//! Each stage must fully succeed before the next starts; any failure
//! halts the run with the stage name and cause. No stage is
//! re-entrant within a run.

use crate::artifact::{BuildArtifact, BuildArtifactSet};
use crate::builder::ArtifactBuilder;
use crate::error::{BuildError, PublishError};
use crate::gate::VersionGate;
use crate::metadata::ProjectVersion;
use crate::publisher::RegistryPublisher;
use crate::registry::RegistryTarget;
use crate::trigger::{ReleaseTrigger, DEFAULT_RELEASE_LINE, DEFAULT_TAG_PREFIX};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Version-consistency gate.
    Gate,

    /// Workspace reset plus artifact build.
    Build,

    /// Publish to the staging registry.
    PublishStaging,

    /// Promote the same artifact set to the production registry.
    PublishProduction,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Gate => "gate",
            Stage::Build => "build",
            Stage::PublishStaging => "publish_staging",
            Stage::PublishProduction => "publish_production",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every stage completed; the release is live on both registries.
    Succeeded,

    /// The trigger was not an eligible release event. A correct no-op,
    /// not an error.
    Aborted,

    /// A stage failed; no later stage ran.
    Failed { stage: Stage, cause: String },
}

/// Result of one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub success: bool,
    pub duration_ms: u64,
    /// Failure cause, absent on success.
    pub detail: Option<String>,
}

impl StageOutcome {
    fn passed(stage: Stage, started: Instant) -> Self {
        Self {
            stage,
            success: true,
            duration_ms: started.elapsed().as_millis() as u64,
            detail: None,
        }
    }

    fn failed(stage: Stage, started: Instant, cause: &str) -> Self {
        Self {
            stage,
            success: false,
            duration_ms: started.elapsed().as_millis() as u64,
            detail: Some(cause.to_string()),
        }
    }
}

/// Aggregate record of one run: the trigger, every executed stage, the
/// produced artifacts, and the terminal status. Immutable once
/// returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: String,
    pub trigger: ReleaseTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageOutcome>,
    /// Artifacts produced by the build (empty when the run never
    /// reached a successful build).
    pub artifacts: Vec<BuildArtifact>,
    pub status: RunStatus,
}

impl PipelineRun {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// The most severe failure class: staging accepted the release but
    /// production did not, leaving the registries inconsistent until an
    /// operator reconciles them.
    pub fn is_partial_release(&self) -> bool {
        matches!(
            self.status,
            RunStatus::Failed {
                stage: Stage::PublishProduction,
                ..
            }
        )
    }
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Literal prefix release tags carry (`v`).
    pub tag_prefix: String,

    /// Branch production releases must originate from.
    pub release_line: String,

    /// Upper bound on one build attempt.
    pub build_timeout: Duration,

    /// Upper bound on one publish attempt.
    pub publish_timeout: Duration,

    /// Retry budget for transient publish failures. Auth failures,
    /// conflicts, and build failures are never retried.
    pub transient_retries: u32,

    /// Fixed delay between transient retries.
    pub retry_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tag_prefix: DEFAULT_TAG_PREFIX.to_string(),
            release_line: DEFAULT_RELEASE_LINE.to_string(),
            build_timeout: Duration::from_secs(600),
            publish_timeout: Duration::from_secs(120),
            transient_retries: 2,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// The release pipeline: wires the gate, builder, and publisher into
/// the linear stage machine and records every run.
pub struct ReleasePipeline<'a> {
    config: PipelineConfig,
    builder: &'a dyn ArtifactBuilder,
    publisher: &'a dyn RegistryPublisher,
}

impl<'a> ReleasePipeline<'a> {
    pub fn new(
        config: PipelineConfig,
        builder: &'a dyn ArtifactBuilder,
        publisher: &'a dyn RegistryPublisher,
    ) -> Self {
        Self {
            config,
            builder,
            publisher,
        }
    }

    /// Execute one run end to end.
    ///
    /// The workspace must be exclusively owned by this run; concurrent
    /// runs each need their own checkout so one run's reset cannot
    /// delete another's in-flight build output.
    pub async fn run(
        &self,
        trigger: ReleaseTrigger,
        workspace: &dyn Workspace,
        declared: &ProjectVersion,
        staging: &RegistryTarget,
        production: &RegistryTarget,
    ) -> PipelineRun {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();

        info!(
            run_id = %run_id,
            tag = %trigger.tag,
            branch = %trigger.source_branch,
            "Starting release run"
        );

        // Eligibility is evaluated exactly once, before any other
        // stage. An ineligible trigger is silently ignored.
        if !trigger.is_eligible(&self.config.tag_prefix, &self.config.release_line) {
            info!(
                run_id = %run_id,
                tag = %trigger.tag,
                branch = %trigger.source_branch,
                "Trigger is not an eligible release event; aborting (no-op)"
            );
            return self.terminal(run_id, trigger, started_at, Vec::new(), Vec::new(), RunStatus::Aborted);
        }

        let mut stages: Vec<StageOutcome> = Vec::new();

        // Gate
        debug!(run_id = %run_id, "Entering version gate");
        let stage_start = Instant::now();
        if let Err(mismatch) = VersionGate::check(&trigger, declared, &self.config.tag_prefix) {
            let cause = mismatch.to_string();
            warn!(run_id = %run_id, cause = %cause, "Version gate rejected the run");
            stages.push(StageOutcome::failed(Stage::Gate, stage_start, &cause));
            return self.terminal(
                run_id,
                trigger,
                started_at,
                stages,
                Vec::new(),
                RunStatus::Failed {
                    stage: Stage::Gate,
                    cause,
                },
            );
        }
        stages.push(StageOutcome::passed(Stage::Gate, stage_start));
        info!(run_id = %run_id, version = %declared, "Version gate passed");

        // Build; reset precedes every build attempt so stale output
        // from a prior run never leaks into this one's artifact set.
        debug!(run_id = %run_id, "Entering build stage");
        let stage_start = Instant::now();
        let artifacts = match self.reset_and_build(workspace).await {
            Ok(set) => set,
            Err(e) => {
                let cause = e.to_string();
                warn!(run_id = %run_id, cause = %cause, "Build failed");
                stages.push(StageOutcome::failed(Stage::Build, stage_start, &cause));
                return self.terminal(
                    run_id,
                    trigger,
                    started_at,
                    stages,
                    Vec::new(),
                    RunStatus::Failed {
                        stage: Stage::Build,
                        cause,
                    },
                );
            }
        };
        stages.push(StageOutcome::passed(Stage::Build, stage_start));
        info!(run_id = %run_id, artifacts = artifacts.len(), "Build stage passed");

        let artifact_records: Vec<BuildArtifact> = artifacts.iter().cloned().collect();

        // Staging publish; never skipped, regardless of how routine it
        // looks.
        debug!(run_id = %run_id, registry = %staging.name, "Entering staging publish");
        let stage_start = Instant::now();
        if let Err(e) = self.publish_with_retry(&artifacts, staging).await {
            let cause = e.to_string();
            warn!(run_id = %run_id, cause = %cause, "Staging publish failed; production never attempted");
            stages.push(StageOutcome::failed(Stage::PublishStaging, stage_start, &cause));
            return self.terminal(
                run_id,
                trigger,
                started_at,
                stages,
                artifact_records,
                RunStatus::Failed {
                    stage: Stage::PublishStaging,
                    cause,
                },
            );
        }
        stages.push(StageOutcome::passed(Stage::PublishStaging, stage_start));
        info!(run_id = %run_id, registry = %staging.name, "Staging publish passed");

        // Production publish: the same artifact set staging already
        // accepted.
        debug!(run_id = %run_id, registry = %production.name, "Entering production publish");
        let stage_start = Instant::now();
        if let Err(e) = self.publish_with_retry(&artifacts, production).await {
            let cause = e.to_string();
            // Staging succeeded, production did not: the release is
            // partially live and needs manual reconciliation.
            error!(
                run_id = %run_id,
                cause = %cause,
                partial_release = true,
                "Production publish failed after staging succeeded; registries are inconsistent"
            );
            stages.push(StageOutcome::failed(Stage::PublishProduction, stage_start, &cause));
            return self.terminal(
                run_id,
                trigger,
                started_at,
                stages,
                artifact_records,
                RunStatus::Failed {
                    stage: Stage::PublishProduction,
                    cause,
                },
            );
        }
        stages.push(StageOutcome::passed(Stage::PublishProduction, stage_start));

        info!(run_id = %run_id, tag = %trigger.tag, "Release run succeeded");
        self.terminal(
            run_id,
            trigger,
            started_at,
            stages,
            artifact_records,
            RunStatus::Succeeded,
        )
    }

    async fn reset_and_build(
        &self,
        workspace: &dyn Workspace,
    ) -> Result<BuildArtifactSet, BuildError> {
        workspace.reset()?;

        match tokio::time::timeout(self.config.build_timeout, self.builder.build(workspace)).await
        {
            Ok(result) => result,
            Err(_) => Err(BuildError::TimedOut {
                timeout_secs: self.config.build_timeout.as_secs(),
            }),
        }
    }

    /// One publish stage: bounded retry with fixed backoff, for
    /// transient failures only.
    async fn publish_with_retry(
        &self,
        artifacts: &BuildArtifactSet,
        target: &RegistryTarget,
    ) -> Result<(), PublishError> {
        let mut attempt = 0u32;
        loop {
            let result = match tokio::time::timeout(
                self.config.publish_timeout,
                self.publisher.publish(artifacts, target),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(PublishError::Transient {
                    registry: target.name.clone(),
                    reason: format!(
                        "publish timed out after {} seconds",
                        self.config.publish_timeout.as_secs()
                    ),
                }),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() && attempt < self.config.transient_retries => {
                    attempt += 1;
                    warn!(
                        registry = %target.name,
                        attempt,
                        error = %e,
                        "Transient publish failure; retrying after backoff"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn terminal(
        &self,
        run_id: String,
        trigger: ReleaseTrigger,
        started_at: DateTime<Utc>,
        stages: Vec<StageOutcome>,
        artifacts: Vec<BuildArtifact>,
        status: RunStatus,
    ) -> PipelineRun {
        PipelineRun {
            run_id,
            trigger,
            started_at,
            finished_at: Utc::now(),
            stages,
            artifacts,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Gate.name(), "gate");
        assert_eq!(Stage::Build.name(), "build");
        assert_eq!(Stage::PublishStaging.name(), "publish_staging");
        assert_eq!(Stage::PublishProduction.name(), "publish_production");
    }

    #[test]
    fn test_partial_release_marker() {
        let failed_production = RunStatus::Failed {
            stage: Stage::PublishProduction,
            cause: "503".to_string(),
        };
        let failed_staging = RunStatus::Failed {
            stage: Stage::PublishStaging,
            cause: "503".to_string(),
        };

        let run = |status: RunStatus| PipelineRun {
            run_id: "r".to_string(),
            trigger: ReleaseTrigger::new("v1.0.0", "main"),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            stages: Vec::new(),
            artifacts: Vec::new(),
            status,
        };

        assert!(run(failed_production).is_partial_release());
        assert!(!run(failed_staging).is_partial_release());
        assert!(!run(RunStatus::Succeeded).is_partial_release());
        assert!(!run(RunStatus::Aborted).is_partial_release());
    }

    #[test]
    fn test_run_status_serializes_with_stage_and_cause() {
        let status = RunStatus::Failed {
            stage: Stage::Gate,
            cause: "mismatch".to_string(),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["stage"], "gate");
        assert_eq!(json["cause"], "mismatch");
    }

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.tag_prefix, "v");
        assert_eq!(config.release_line, "main");
        assert_eq!(config.transient_retries, 2);
    }
}
