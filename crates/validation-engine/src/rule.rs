//! The rule model: immutable units of evaluation.

use async_trait::async_trait;
use serde_json::Value;

use dataset_adapter::Dataset;
use validator_common::{Category, Finding, FindingTag, Outcome, Severity};

use crate::spec::AcceptanceSpec;

/// What a predicate observed, before the runner stamps rule identity onto it
/// and clamps the outcome to the rule's severity class.
#[derive(Debug, Clone)]
pub struct Observation {
    pub outcome: Outcome,
    pub message: String,
    pub detail: Option<Value>,
    pub tag: Option<FindingTag>,
}

impl Observation {
    fn new(outcome: Outcome, message: impl Into<String>) -> Self {
        Self {
            outcome,
            message: message.into(),
            detail: None,
            tag: None,
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Outcome::Pass, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Outcome::Fail, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Outcome::Warn, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Outcome::Info, message)
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::new(Outcome::Skipped, message)
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_tag(mut self, tag: FindingTag) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// Read-only context handed to every predicate.
pub struct RuleContext<'a> {
    pub dataset: &'a dyn Dataset,
    pub spec: &'a AcceptanceSpec,
    /// Findings of rules that already executed, for declared dependencies.
    pub prior: &'a [Finding],
}

impl<'a> RuleContext<'a> {
    /// Findings produced so far by the rule with `rule_id`.
    pub fn findings_of<'b>(&'b self, rule_id: &'b str) -> impl Iterator<Item = &'b Finding> + 'b {
        self.prior.iter().filter(move |f| f.rule_id == rule_id)
    }
}

/// A rule predicate over the dataset adapter.
///
/// Predicates must not mutate the adapter or have observable side effects
/// beyond the observations they return.
#[async_trait]
pub trait Check: Send + Sync {
    async fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Observation>;
}

/// Adapter turning a synchronous closure into a [`Check`].
struct SyncCheck<F>(F);

#[async_trait]
impl<F> Check for SyncCheck<F>
where
    F: Fn(&RuleContext<'_>) -> Vec<Observation> + Send + Sync,
{
    async fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Observation> {
        (self.0)(ctx)
    }
}

/// An immutable unit of evaluation: identity, classification, dependencies
/// and the predicate.
pub struct Rule {
    pub id: &'static str,
    pub category: Category,
    pub severity: Severity,
    /// Rule ids that must have executed cleanly before this rule runs.
    pub depends_on: Vec<&'static str>,
    check: Box<dyn Check>,
}

impl Rule {
    /// Create a rule with an async predicate.
    pub fn new(
        id: &'static str,
        category: Category,
        severity: Severity,
        check: impl Check + 'static,
    ) -> Self {
        Self {
            id,
            category,
            severity,
            depends_on: Vec::new(),
            check: Box::new(check),
        }
    }

    /// Create a rule with a synchronous predicate.
    pub fn sync(
        id: &'static str,
        category: Category,
        severity: Severity,
        check: impl Fn(&RuleContext<'_>) -> Vec<Observation> + Send + Sync + 'static,
    ) -> Self {
        Self::new(id, category, severity, SyncCheck(check))
    }

    /// Declare a dependency on another rule having executed cleanly.
    pub fn depends_on(mut self, rule_id: &'static str) -> Self {
        self.depends_on.push(rule_id);
        self
    }

    /// Evaluate the predicate. Panic isolation is the runner's job.
    pub async fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Observation> {
        self.check.evaluate(ctx).await
    }

    /// Stamp rule identity onto an observation, clamping the outcome.
    pub fn finding(&self, observation: Observation) -> Finding {
        let mut finding = Finding::new(
            self.id,
            self.category,
            self.severity,
            observation.outcome,
            observation.message,
        );
        finding.detail = observation.detail;
        finding.tag = observation.tag;
        finding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finding_stamps_identity_and_clamps() {
        let rule = Rule::sync(
            "compression",
            Category::DataVariable,
            Severity::Recommended,
            |_| vec![],
        );
        let finding = rule.finding(Observation::fail("uncompressed"));
        assert_eq!(finding.rule_id, "compression");
        assert_eq!(finding.outcome, Outcome::Warn);
    }

    #[tokio::test]
    async fn test_sync_check_evaluates() {
        let rule = Rule::sync("x", Category::Format, Severity::Required, |_| {
            vec![Observation::pass("fine")]
        });
        let spec = AcceptanceSpec::v1();
        // A context is only needed for predicates that look at the dataset;
        // use a throwaway mock-free context via a panic guard instead.
        struct NoDataset;
        impl Dataset for NoDataset {
            fn location(&self) -> String {
                "mem://none".to_string()
            }
            fn dimensions(&self) -> Vec<dataset_adapter::Dimension> {
                vec![]
            }
            fn variable_names(&self) -> Vec<String> {
                vec![]
            }
            fn data_variable_names(&self) -> Vec<String> {
                vec![]
            }
            fn variable(&self, _: &str) -> Option<dataset_adapter::VariableMeta> {
                None
            }
            fn global_attributes(&self) -> serde_json::Map<String, Value> {
                serde_json::Map::new()
            }
            fn time_len(&self) -> u64 {
                0
            }
            fn time_slice(
                &self,
                _: std::ops::Range<u64>,
            ) -> dataset_adapter::Result<Vec<chrono::DateTime<chrono::Utc>>> {
                Ok(vec![])
            }
            fn coord_values(&self, _: &str) -> dataset_adapter::Result<Vec<f64>> {
                Ok(vec![])
            }
            fn read_frame(&self, _: &str, _: u64) -> dataset_adapter::Result<dataset_adapter::Frame> {
                Err(dataset_adapter::AdapterError::not_found("none"))
            }
            fn zarr_format(&self) -> dataset_adapter::ZarrFormat {
                dataset_adapter::ZarrFormat {
                    version: 3,
                    consolidated: false,
                }
            }
        }
        let ctx = RuleContext {
            dataset: &NoDataset,
            spec: &spec,
            prior: &[],
        };
        let observations = rule.evaluate(&ctx).await;
        assert_eq!(observations.len(), 1);
        assert_eq!(observations[0].outcome, Outcome::Pass);
    }
}
