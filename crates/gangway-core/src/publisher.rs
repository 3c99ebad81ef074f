//! Registry publish stage.

use crate::artifact::BuildArtifactSet;
use crate::error::PublishError;
use crate::registry::RegistryTarget;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, info};

/// Uploads an artifact set to a named registry.
///
/// Staging and production are fully independent calls; a successful
/// staging publish implies nothing about production. There are no
/// partial-success semantics: either every artifact is accepted or the
/// call fails and registry state needs manual inspection.
#[async_trait]
pub trait RegistryPublisher: Send + Sync {
    async fn publish(
        &self,
        artifacts: &BuildArtifactSet,
        target: &RegistryTarget,
    ) -> Result<(), PublishError>;
}

/// HTTP publisher: one authenticated upload per artifact, bearer token
/// resolved from the target at call time.
pub struct HttpRegistryPublisher {
    client: reqwest::Client,
}

impl HttpRegistryPublisher {
    /// `timeout` bounds each upload request.
    pub fn new(timeout: Duration) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Transient {
                registry: String::new(),
                reason: format!("failed to construct HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

/// Map an upload response status to the publish error taxonomy.
///
/// 401/403 mean the credential is bad or expired; 409 means the
/// version already exists at the target (registries are immutable, so
/// this is fatal); everything else non-success is treated as transient
/// and left to the orchestrator's bounded retry.
fn classify_status(
    registry: &str,
    artifact: &str,
    status: StatusCode,
) -> Result<(), PublishError> {
    if status.is_success() {
        return Ok(());
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PublishError::AuthFailure {
            registry: registry.to_string(),
            reason: format!("registry returned {status} for '{artifact}'"),
        }),
        StatusCode::CONFLICT => Err(PublishError::Conflict {
            registry: registry.to_string(),
            artifact: artifact.to_string(),
        }),
        other => Err(PublishError::Transient {
            registry: registry.to_string(),
            reason: format!("registry returned {other} for '{artifact}'"),
        }),
    }
}

#[async_trait]
impl RegistryPublisher for HttpRegistryPublisher {
    async fn publish(
        &self,
        artifacts: &BuildArtifactSet,
        target: &RegistryTarget,
    ) -> Result<(), PublishError> {
        // Resolved here and dropped when the call returns; the token
        // is scoped to exactly one publish.
        let credential = target.credential.resolve(&target.name)?;
        let base = target.endpoint.trim_end_matches('/');

        info!(
            registry = %target.name,
            artifacts = artifacts.len(),
            "Publishing artifact set"
        );

        for artifact in artifacts.iter() {
            let bytes =
                tokio::fs::read(&artifact.path)
                    .await
                    .map_err(|e| PublishError::Transient {
                        registry: target.name.clone(),
                        reason: format!("failed to read '{}': {e}", artifact.file_name),
                    })?;

            let url = format!("{base}/{}", artifact.file_name);
            debug!(registry = %target.name, file = %artifact.file_name, "Uploading artifact");

            let response = self
                .client
                .put(&url)
                .bearer_auth(credential.reveal())
                .header("X-Content-Sha256", &artifact.digest)
                .body(bytes)
                .send()
                .await
                .map_err(|e| PublishError::Transient {
                    registry: target.name.clone(),
                    reason: format!("upload of '{}' failed: {e}", artifact.file_name),
                })?;

            classify_status(&target.name, &artifact.file_name, response.status())?;
        }

        info!(registry = %target.name, "Artifact set accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_statuses_pass() {
        assert!(classify_status("staging", "a.whl", StatusCode::OK).is_ok());
        assert!(classify_status("staging", "a.whl", StatusCode::CREATED).is_ok());
        assert!(classify_status("staging", "a.whl", StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn test_auth_statuses_are_auth_failure() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = classify_status("staging", "a.whl", status).unwrap_err();
            assert!(matches!(err, PublishError::AuthFailure { .. }), "{status}");
        }
    }

    #[test]
    fn test_conflict_status_is_conflict() {
        let err = classify_status("production", "pkg-2.0.1.tar.gz", StatusCode::CONFLICT)
            .unwrap_err();
        match err {
            PublishError::Conflict { registry, artifact } => {
                assert_eq!(registry, "production");
                assert_eq!(artifact, "pkg-2.0.1.tar.gz");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_server_errors_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::TOO_MANY_REQUESTS,
        ] {
            let err = classify_status("staging", "a.whl", status).unwrap_err();
            assert!(err.is_transient(), "{status}");
        }
    }
}
