//! Severity classes, outcomes and rule categories.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity class of a rule, mirroring RFC 2119 MUST/SHOULD/MAY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// MUST: a violation fails the whole archive.
    Required,
    /// SHOULD: a violation produces a warning, never a failure.
    Recommended,
    /// MAY: purely advisory.
    Informational,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Required => "REQUIRED",
            Severity::Recommended => "RECOMMENDED",
            Severity::Informational => "INFORMATIONAL",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
    Warn,
    Info,
    Skipped,
}

impl Outcome {
    /// Clamp an outcome to the bounds of the owning rule's severity class.
    ///
    /// A RECOMMENDED rule can never fail (FAIL becomes WARN) and an
    /// INFORMATIONAL rule can neither fail nor warn (both become INFO).
    /// REQUIRED outcomes are returned unchanged.
    pub fn clamp_to(self, severity: Severity) -> Self {
        match (severity, self) {
            (Severity::Recommended, Outcome::Fail) => Outcome::Warn,
            (Severity::Informational, Outcome::Fail | Outcome::Warn) => Outcome::Info,
            (_, outcome) => outcome,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
            Outcome::Warn => "WARN",
            Outcome::Info => "INFO",
            Outcome::Skipped => "SKIPPED",
        };
        write!(f, "{}", s)
    }
}

/// Category a rule belongs to, used for report grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Spatial,
    Temporal,
    DataVariable,
    Licensing,
    Format,
    Chunking,
    Georeferencing,
    ToolCompatibility,
}

impl Category {
    /// All categories in canonical report order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Spatial,
            Category::Temporal,
            Category::DataVariable,
            Category::Licensing,
            Category::Format,
            Category::Chunking,
            Category::Georeferencing,
            Category::ToolCompatibility,
        ]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Spatial => "spatial",
            Category::Temporal => "temporal",
            Category::DataVariable => "data-variable",
            Category::Licensing => "licensing",
            Category::Format => "format",
            Category::Chunking => "chunking",
            Category::Georeferencing => "georeferencing",
            Category::ToolCompatibility => "tool-compatibility",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_recommended_fail_to_warn() {
        assert_eq!(Outcome::Fail.clamp_to(Severity::Recommended), Outcome::Warn);
        assert_eq!(Outcome::Pass.clamp_to(Severity::Recommended), Outcome::Pass);
    }

    #[test]
    fn test_clamp_informational() {
        assert_eq!(
            Outcome::Fail.clamp_to(Severity::Informational),
            Outcome::Info
        );
        assert_eq!(
            Outcome::Warn.clamp_to(Severity::Informational),
            Outcome::Info
        );
    }

    #[test]
    fn test_required_never_downgrades() {
        assert_eq!(Outcome::Fail.clamp_to(Severity::Required), Outcome::Fail);
        assert_eq!(Outcome::Warn.clamp_to(Severity::Required), Outcome::Warn);
    }
}
