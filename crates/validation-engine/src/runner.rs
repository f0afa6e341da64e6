//! Executes the rule registry against one opened dataset.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, instrument, warn};

use dataset_adapter::Dataset;
use validator_common::{FindingTag, Report, RunState};

use crate::rule::{Observation, Rule, RuleContext};
use crate::spec::AcceptanceSpec;

/// Orders and executes rules, isolating per-rule failures.
///
/// The runner never aborts a started run: a predicate that panics becomes an
/// internal-error FAIL finding, a rule whose dependency did not execute
/// cleanly becomes a SKIPPED finding, and cancellation yields a partial
/// report marked incomplete. Aborting is reserved for the caller when the
/// archive cannot be opened at all.
pub struct Runner {
    spec: AcceptanceSpec,
    rules: Vec<Rule>,
}

impl Runner {
    pub fn new(spec: AcceptanceSpec, rules: Vec<Rule>) -> Self {
        Self { spec, rules }
    }

    pub fn spec(&self) -> &AcceptanceSpec {
        &self.spec
    }

    /// Run every rule in registry order and fold the findings into a report.
    #[instrument(skip_all, fields(spec = %self.spec.version, location = %dataset.location()))]
    pub async fn run(&self, dataset: &dyn Dataset, cancel: &AtomicBool) -> Report {
        info!(rules = self.rules.len(), state = ?RunState::Running, "Validation run started");

        let mut findings = Vec::new();
        // Tracks whether each rule executed cleanly (no panic, not skipped);
        // dependents consult this, not the PASS/FAIL outcome.
        let mut executed_cleanly: BTreeMap<&str, bool> = BTreeMap::new();

        for rule in &self.rules {
            if cancel.load(Ordering::Relaxed) {
                warn!(rule = rule.id, "Cancellation requested; stopping rule dispatch");
                return Report::from_findings(
                    self.spec.version.clone(),
                    dataset.location(),
                    findings,
                    false,
                );
            }

            let unmet: Vec<&str> = rule
                .depends_on
                .iter()
                .copied()
                .filter(|dep| !executed_cleanly.get(dep).copied().unwrap_or(false))
                .collect();
            if !unmet.is_empty() {
                debug!(rule = rule.id, ?unmet, "Skipping rule: dependency not met");
                findings.push(rule.finding(
                    Observation::skipped(format!(
                        "dependency not met: {} did not execute cleanly",
                        unmet.join(", ")
                    ))
                    .with_tag(FindingTag::DependencyNotMet),
                ));
                executed_cleanly.insert(rule.id, false);
                continue;
            }

            debug!(rule = rule.id, "Evaluating rule");
            let evaluation = {
                let ctx = RuleContext {
                    dataset,
                    spec: &self.spec,
                    prior: &findings,
                };
                AssertUnwindSafe(rule.evaluate(&ctx)).catch_unwind().await
            };

            match evaluation {
                Ok(observations) => {
                    executed_cleanly.insert(rule.id, true);
                    for observation in observations {
                        findings.push(rule.finding(observation));
                    }
                }
                Err(payload) => {
                    // A bug in the predicate, not an archive violation; the
                    // remaining rules still run.
                    let message = panic_message(payload.as_ref());
                    warn!(rule = rule.id, %message, "Rule predicate panicked");
                    executed_cleanly.insert(rule.id, false);
                    findings.push(rule.finding(
                        Observation::fail(format!(
                            "internal error while evaluating rule: {}",
                            message
                        ))
                        .with_tag(FindingTag::InternalError),
                    ));
                }
            }
        }

        let report = Report::from_findings(
            self.spec.version.clone(),
            dataset.location(),
            findings,
            true,
        );
        info!(
            verdict = %report.verdict,
            findings = report.findings.len(),
            state = ?RunState::Completed,
            "Validation run finished"
        );
        report
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::MockDataset;
    use validator_common::{Category, Outcome, Severity, Verdict};

    use crate::rule::Rule;

    fn passing_rule(id: &'static str) -> Rule {
        Rule::sync(id, Category::Format, Severity::Required, |_| {
            vec![Observation::pass("fine")]
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_panicking_rule_is_isolated() {
        let rules = vec![
            Rule::sync("exploding", Category::Format, Severity::Required, |_| {
                panic!("boom")
            }),
            passing_rule("survivor"),
        ];
        let runner = Runner::new(crate::spec::AcceptanceSpec::v1(), rules);
        let dataset = MockDataset::radar_default();
        let report = runner.run(&dataset, &AtomicBool::new(false)).await;

        assert_eq!(report.findings.len(), 2);
        let exploded = &report.findings[0];
        assert_eq!(exploded.rule_id, "exploding");
        assert_eq!(exploded.outcome, Outcome::Fail);
        assert_eq!(exploded.tag, Some(FindingTag::InternalError));
        assert!(exploded.message.contains("boom"));
        assert_eq!(report.findings[1].outcome, Outcome::Pass);
        assert_eq!(report.verdict, Verdict::Fail);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dependency_on_crashed_rule_is_skipped() {
        let rules = vec![
            Rule::sync("first", Category::Format, Severity::Required, |_| {
                panic!("boom")
            }),
            passing_rule("second").depends_on("first"),
        ];
        let runner = Runner::new(crate::spec::AcceptanceSpec::v1(), rules);
        let dataset = MockDataset::radar_default();
        let report = runner.run(&dataset, &AtomicBool::new(false)).await;

        let skipped = &report.findings[1];
        assert_eq!(skipped.outcome, Outcome::Skipped);
        assert_eq!(skipped.tag, Some(FindingTag::DependencyNotMet));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancellation_yields_partial_incomplete_report() {
        let cancel = AtomicBool::new(true);
        let runner = Runner::new(
            crate::spec::AcceptanceSpec::v1(),
            vec![passing_rule("never-runs")],
        );
        let dataset = MockDataset::radar_default();
        let report = runner.run(&dataset, &cancel).await;

        assert!(!report.complete);
        assert!(report.findings.is_empty());
        assert_eq!(report.verdict, Verdict::Pass);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_dependency_still_counts_as_executed() {
        // A rule that FAILS (validation failure) executed cleanly; its
        // dependents must still run.
        let rules = vec![
            Rule::sync("failing", Category::Format, Severity::Required, |_| {
                vec![Observation::fail("violation")]
            }),
            passing_rule("dependent").depends_on("failing"),
        ];
        let runner = Runner::new(crate::spec::AcceptanceSpec::v1(), rules);
        let dataset = MockDataset::radar_default();
        let report = runner.run(&dataset, &AtomicBool::new(false)).await;

        assert_eq!(report.findings[1].outcome, Outcome::Pass);
    }
}
