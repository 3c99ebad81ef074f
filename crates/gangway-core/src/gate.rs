//! Version consistency gate.
//!
//! Compares the version the tag declares against the version recorded
//! in the packaging descriptor. A mismatch halts the run before any
//! build or publish; this is a hard gate, not a warning.

use crate::error::VersionMismatch;
use crate::metadata::ProjectVersion;
use crate::trigger::ReleaseTrigger;

/// Hard version-consistency gate.
pub struct VersionGate;

impl VersionGate {
    /// Check the trigger's tag version against the declared project
    /// version.
    ///
    /// Strips the fixed literal `prefix` from the tag and compares the
    /// remainder byte-for-byte against `declared`. No side effects;
    /// idempotent; safe to call repeatedly.
    pub fn check(
        trigger: &ReleaseTrigger,
        declared: &ProjectVersion,
        prefix: &str,
    ) -> Result<(), VersionMismatch> {
        // Eligibility normally guarantees the prefix; a bare tag still
        // gets compared as-is rather than panicking.
        let tag_version = trigger.tag_version(prefix).unwrap_or(&trigger.tag);

        if tag_version == declared.as_str() {
            Ok(())
        } else {
            Err(VersionMismatch {
                expected: tag_version.to_string(),
                actual: declared.as_str().to_string(),
            })
        }
    }
}
