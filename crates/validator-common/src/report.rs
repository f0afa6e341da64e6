//! Validation report: ordered findings plus a derived verdict.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::finding::Finding;
use crate::severity::{Category, Outcome};

/// Lifecycle state of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

/// Overall verdict of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    /// Process exit status for this verdict. An aborted run (no report at
    /// all) uses [`ABORT_EXIT_CODE`] instead.
    pub fn exit_code(&self) -> i32 {
        match self {
            Verdict::Pass => 0,
            Verdict::Fail => 1,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
        }
    }
}

/// Exit status used when the archive could not be opened at all.
pub const ABORT_EXIT_CODE: i32 = 2;

/// Per-category outcome counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub pass: usize,
    pub fail: usize,
    pub warn: usize,
    pub info: usize,
    pub skipped: usize,
}

impl CategoryCounts {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Pass => self.pass += 1,
            Outcome::Fail => self.fail += 1,
            Outcome::Warn => self.warn += 1,
            Outcome::Info => self.info += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }
}

/// Aggregated counts over a full report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub fails: usize,
    pub warnings: usize,
    pub passes: usize,
    pub by_category: BTreeMap<Category, CategoryCounts>,
}

/// The terminal artifact of a validation run.
///
/// Findings keep registry order. The report is immutable once built; it is
/// only consumed by rendering collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Version of the acceptance specification evaluated against.
    pub spec_version: String,
    /// Location identifier of the archive under validation.
    pub location: String,
    pub verdict: Verdict,
    /// False when the run was cancelled before all rules executed.
    pub complete: bool,
    pub findings: Vec<Finding>,
}

impl Report {
    /// Build a report from an ordered finding sequence.
    ///
    /// The verdict is FAIL if and only if at least one finding from a
    /// REQUIRED rule has outcome FAIL; WARN/INFO counts never affect it.
    pub fn from_findings(
        spec_version: impl Into<String>,
        location: impl Into<String>,
        findings: Vec<Finding>,
        complete: bool,
    ) -> Self {
        let verdict = if findings.iter().any(Finding::is_blocking) {
            Verdict::Fail
        } else {
            Verdict::Pass
        };
        Self {
            spec_version: spec_version.into(),
            location: location.into(),
            verdict,
            complete,
            findings,
        }
    }

    /// Count outcomes overall and per category.
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary::default();
        for finding in &self.findings {
            match finding.outcome {
                Outcome::Fail => summary.fails += 1,
                Outcome::Warn => summary.warnings += 1,
                Outcome::Pass => summary.passes += 1,
                _ => {}
            }
            summary
                .by_category
                .entry(finding.category)
                .or_default()
                .record(finding.outcome);
        }
        summary
    }

    /// Findings for one category, in report order.
    pub fn findings_in(&self, category: Category) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.category == category)
    }
}
