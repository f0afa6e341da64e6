//! The outcome record produced by one rule evaluation.

use serde::{Deserialize, Serialize};

use crate::severity::{Category, Outcome, Severity};

/// Machine-readable tag explaining an unusual finding origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingTag {
    /// The rule predicate itself crashed; the failure is a validator bug,
    /// not an archive violation.
    InternalError,
    /// An external tool probe exceeded its time budget.
    Timeout,
    /// A declared dependency of the rule did not execute cleanly.
    DependencyNotMet,
}

/// One result record in a validation report.
///
/// The outcome is already clamped to the owning rule's severity class when
/// the finding is constructed through [`Finding::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Stable identifier of the rule that produced this finding.
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    pub outcome: Outcome,
    /// Human-readable explanation.
    pub message: String,
    /// Optional structured payload (offending timestamps, pixel windows, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<FindingTag>,
}

impl Finding {
    /// Create a finding, clamping the outcome to the severity class.
    pub fn new(
        rule_id: impl Into<String>,
        category: Category,
        severity: Severity,
        outcome: Outcome,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            category,
            severity,
            outcome: outcome.clamp_to(severity),
            message: message.into(),
            detail: None,
            tag: None,
        }
    }

    /// Attach a structured detail payload.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Attach an origin tag.
    pub fn with_tag(mut self, tag: FindingTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Whether this finding makes the overall verdict fail.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Required && self.outcome == Outcome::Fail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_clamps_outcome() {
        let f = Finding::new(
            "timestep-regularity",
            Category::Temporal,
            Severity::Recommended,
            Outcome::Fail,
            "irregular without metadata",
        );
        assert_eq!(f.outcome, Outcome::Warn);
        assert!(!f.is_blocking());
    }

    #[test]
    fn test_required_fail_is_blocking() {
        let f = Finding::new(
            "temporal-coverage",
            Category::Temporal,
            Severity::Required,
            Outcome::Fail,
            "span below minimum",
        );
        assert!(f.is_blocking());
    }

    #[test]
    fn test_detail_roundtrip() {
        let f = Finding::new(
            "valid-crop",
            Category::Spatial,
            Severity::Required,
            Outcome::Pass,
            "window found",
        )
        .with_detail(serde_json::json!({"row": 10, "col": 20}));
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["detail"]["row"], 10);
    }
}
