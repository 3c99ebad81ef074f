//! Release trigger and eligibility.

use semver::Version;
use serde::{Deserialize, Serialize};

/// Default tag prefix for release tags (`v1.2.3`).
pub const DEFAULT_TAG_PREFIX: &str = "v";

/// Default release line; tags cut from any other branch are ignored.
pub const DEFAULT_RELEASE_LINE: &str = "main";

/// The event that starts a pipeline run: a tag push carrying the tag
/// name and the branch it was cut from. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReleaseTrigger {
    /// Tag name as pushed, e.g. `v1.2.3`.
    pub tag: String,

    /// Branch the tag was cut from.
    pub source_branch: String,
}

impl ReleaseTrigger {
    /// Create a new trigger.
    pub fn new(tag: impl Into<String>, source_branch: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            source_branch: source_branch.into(),
        }
    }

    /// The version substring of the tag: the fixed literal prefix
    /// stripped off. `None` when the tag does not carry the prefix.
    pub fn tag_version(&self, prefix: &str) -> Option<&str> {
        self.tag.strip_prefix(prefix)
    }

    /// Whether the tag names a release: prefix present and the
    /// remainder parses as a semantic version.
    pub fn is_release_tag(&self, prefix: &str) -> bool {
        self.tag_version(prefix)
            .map(|v| Version::parse(v).is_ok())
            .unwrap_or(false)
    }

    /// Eligibility predicate, evaluated once before any other stage:
    /// the tag matches the release pattern *and* was cut from the
    /// designated release line. A `false` here is a correct no-op, not
    /// an error.
    pub fn is_eligible(&self, prefix: &str, release_line: &str) -> bool {
        self.is_release_tag(prefix) && self.source_branch == release_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_version_strips_prefix() {
        let trigger = ReleaseTrigger::new("v1.2.3", "main");
        assert_eq!(trigger.tag_version("v"), Some("1.2.3"));
    }

    #[test]
    fn test_tag_version_missing_prefix() {
        let trigger = ReleaseTrigger::new("1.2.3", "main");
        assert_eq!(trigger.tag_version("v"), None);
    }

    #[test]
    fn test_release_tag_requires_semver() {
        assert!(ReleaseTrigger::new("v1.2.3", "main").is_release_tag("v"));
        assert!(ReleaseTrigger::new("v2.0.0-rc.1", "main").is_release_tag("v"));
        assert!(!ReleaseTrigger::new("v1.2", "main").is_release_tag("v"));
        assert!(!ReleaseTrigger::new("vnext", "main").is_release_tag("v"));
        assert!(!ReleaseTrigger::new("release-1.2.3", "main").is_release_tag("v"));
    }

    #[test]
    fn test_eligible_on_release_line() {
        let trigger = ReleaseTrigger::new("v1.2.3", "main");
        assert!(trigger.is_eligible("v", "main"));
    }

    #[test]
    fn test_ineligible_off_release_line() {
        let trigger = ReleaseTrigger::new("v1.2.3", "feature/tags");
        assert!(!trigger.is_eligible("v", "main"));
    }

    #[test]
    fn test_ineligible_non_release_tag() {
        let trigger = ReleaseTrigger::new("nightly-2024-01-01", "main");
        assert!(!trigger.is_eligible("v", "main"));
    }
}
