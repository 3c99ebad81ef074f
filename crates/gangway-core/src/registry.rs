//! Registry targets and scoped credentials.

use crate::error::PublishError;

/// Opaque bearer token for one registry. Never logged, never
/// serialized; `Debug` redacts the value and there is no `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for constructing an `Authorization` header.
    pub fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Where a target's credential comes from. `Env` is resolved at
/// publish time so the token never outlives a single publish call.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Read from the named environment variable at call time.
    Env { var: String },

    /// Fixed token, used by tests and one-shot invocations.
    Static(Credential),
}

impl CredentialSource {
    /// Resolve the credential for `registry`. A missing or empty token
    /// is an `AuthFailure` — the registry would reject the call anyway,
    /// and failing here keeps the secret handling in one place.
    pub fn resolve(&self, registry: &str) -> Result<Credential, PublishError> {
        match self {
            CredentialSource::Env { var } => match std::env::var(var) {
                Ok(token) if !token.is_empty() => Ok(Credential::new(token)),
                _ => Err(PublishError::AuthFailure {
                    registry: registry.to_string(),
                    reason: format!("credential variable '{var}' is unset or empty"),
                }),
            },
            CredentialSource::Static(credential) => Ok(credential.clone()),
        }
    }
}

/// One publish destination: a named endpoint plus the credential
/// reference that authenticates uploads to it. Two instances exist per
/// run — staging and production, promoted in that order — and never
/// share credentials.
#[derive(Debug, Clone)]
pub struct RegistryTarget {
    /// Registry name used in logs and errors (`staging`, `production`).
    pub name: String,

    /// Upload endpoint URL.
    pub endpoint: String,

    /// Credential reference, resolved at call time.
    pub credential: CredentialSource,
}

impl RegistryTarget {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        credential: CredentialSource,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            credential,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("super-secret-token");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("redacted"));
    }

    #[test]
    fn test_target_debug_redacts_static_credential() {
        let target = RegistryTarget::new(
            "staging",
            "https://staging.example.org/upload",
            CredentialSource::Static(Credential::new("tok-123")),
        );
        let debug = format!("{target:?}");
        assert!(!debug.contains("tok-123"));
    }

    #[test]
    fn test_static_source_resolves() {
        let source = CredentialSource::Static(Credential::new("tok"));
        let credential = source.resolve("staging").unwrap();
        assert_eq!(credential.reveal(), "tok");
    }

    #[test]
    fn test_missing_env_var_is_auth_failure() {
        let source = CredentialSource::Env {
            var: "GANGWAY_TEST_NO_SUCH_VAR".to_string(),
        };
        let err = source.resolve("production").unwrap_err();
        match err {
            PublishError::AuthFailure { registry, reason } => {
                assert_eq!(registry, "production");
                assert!(reason.contains("GANGWAY_TEST_NO_SUCH_VAR"));
            }
            other => panic!("expected AuthFailure, got {other:?}"),
        }
    }
}
