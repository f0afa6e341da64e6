//! Rule-evaluation engine for radar archive acceptance.
//!
//! The engine is declarative: a [`registry`](crate::registry) of immutable
//! [`Rule`]s is evaluated in order against one read-only
//! [`Dataset`](dataset_adapter::Dataset), every rule yields findings, and the
//! ordered finding sequence reduces to a [`Report`](validator_common::Report)
//! with a deterministic verdict.
//!
//! # Architecture
//!
//! ```text
//! ZarrDataset::open(location)
//!      │
//!      ▼
//! Runner::run(dataset)
//!      │
//!      ├─► for each Rule in registry order:
//!      │        dependency gate ──► SKIPPED finding
//!      │        panic isolation ──► internal-error FAIL finding
//!      │        predicate        ──► PASS/FAIL/WARN/INFO findings
//!      │
//!      └─► Report::from_findings (verdict, summary)
//! ```
//!
//! Thresholds and allow-lists come from a versioned [`AcceptanceSpec`] passed
//! into the runner, never from module state, so several specification
//! versions can be evaluated side by side.

pub mod checks;
pub mod registry;
pub mod rule;
pub mod runner;
pub mod spec;

pub use registry::standard_rules;
pub use rule::{Check, Observation, Rule, RuleContext};
pub use runner::Runner;
pub use spec::{AcceptanceSpec, VariableSpec};
