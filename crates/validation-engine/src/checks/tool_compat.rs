//! Tool-compatibility rules: probe execution with timeouts and the
//! cross-tool CRS agreement check.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use dataset_adapter::Location;
use tool_probes::{
    max_component_delta, ArrayLoadProbe, CartographicProbe, ProbeInput, ToolProbe, WktParseProbe,
};
use validator_common::{Category, FindingTag, Severity};

use crate::rule::{Check, Observation, Rule, RuleContext};

/// Extract the probe input once per rule from the adapter's metadata.
fn build_input(ctx: &RuleContext<'_>, location: Option<Location>) -> ProbeInput {
    let data_variable = ctx.dataset.data_variable_names().into_iter().next();

    let crs_meta = data_variable
        .as_ref()
        .and_then(|name| ctx.dataset.variable(name))
        .and_then(|meta| meta.attr_str("grid_mapping").map(str::to_string))
        .and_then(|crs_name| ctx.dataset.variable(&crs_name));
    let (crs_wkt, grid_mapping_attrs) = match crs_meta {
        Some(meta) => (
            meta.attr_str("crs_wkt").map(str::to_string),
            meta.attrs.clone(),
        ),
        None => (None, serde_json::Map::new()),
    };

    let corner_xy = match (
        ctx.dataset.coord_values("x"),
        ctx.dataset.coord_values("y"),
    ) {
        (Ok(x), Ok(y)) if !x.is_empty() && !y.is_empty() => Some((x[0], y[0])),
        _ => None,
    };

    ProbeInput {
        location,
        data_variable,
        crs_wkt,
        grid_mapping_attrs,
        corner_xy,
    }
}

/// Runs one probe under the specification's time budget.
struct ProbeCheck<P> {
    probe: P,
    location: Option<Location>,
}

#[async_trait]
impl<P: ToolProbe> Check for ProbeCheck<P> {
    async fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Observation> {
        let input = build_input(ctx, self.location.clone());
        let budget = Duration::from_secs(ctx.spec.probe_timeout_secs);

        match tokio::time::timeout(budget, self.probe.run(&input)).await {
            Ok(report) => {
                let detail = serde_json::to_value(&report).unwrap_or_default();
                let observation = if report.ok {
                    Observation::pass(report.message)
                } else {
                    Observation::fail(report.message)
                };
                vec![observation.with_detail(detail)]
            }
            Err(_) => {
                warn!(tool = self.probe.tool(), ?budget, "Probe timed out");
                vec![Observation::fail(format!(
                    "probe '{}' exceeded its {}s budget",
                    self.probe.tool(),
                    ctx.spec.probe_timeout_secs
                ))
                .with_tag(FindingTag::Timeout)]
            }
        }
    }
}

/// The archive must open and slice through the array-access collaborator.
pub fn array_load(location: Option<Location>) -> Rule {
    Rule::new(
        "tool-array-load",
        Category::ToolCompatibility,
        Severity::Required,
        ProbeCheck {
            probe: ArrayLoadProbe,
            location,
        },
    )
}

/// The CRS WKT must parse through the georeferencing collaborator.
pub fn wkt_parse() -> Rule {
    Rule::new(
        "tool-wkt-parse",
        Category::ToolCompatibility,
        Severity::Required,
        ProbeCheck {
            probe: WktParseProbe,
            location: None,
        },
    )
}

/// A CRS object must be constructible from the grid-mapping attributes and
/// support a sample transform.
pub fn cartographic() -> Rule {
    Rule::new(
        "tool-cartographic",
        Category::ToolCompatibility,
        Severity::Required,
        ProbeCheck {
            probe: CartographicProbe,
            location: None,
        },
    )
}

fn transform_of(ctx: &RuleContext<'_>, rule_id: &str) -> Option<(f64, f64)> {
    ctx.findings_of(rule_id).find_map(|finding| {
        let t = finding.detail.as_ref()?.get("transform")?.as_array()?;
        Some((t.first()?.as_f64()?, t.get(1)?.as_f64()?))
    })
}

/// Both CRS-capable probes must agree on the corner-pixel transform.
///
/// Disagreement within tolerance of working probes signals inconsistent
/// georeferencing interpretation, which is distinct from either probe
/// failing on its own.
pub fn crs_agreement() -> Rule {
    Rule::sync(
        "crs-agreement",
        Category::ToolCompatibility,
        Severity::Required,
        |ctx| {
            let wkt = transform_of(ctx, "tool-wkt-parse");
            let cf = transform_of(ctx, "tool-cartographic");
            let (wkt, cf) = match (wkt, cf) {
                (Some(wkt), Some(cf)) => (wkt, cf),
                _ => {
                    return vec![Observation::skipped(
                        "one or both CRS probes produced no transform to compare",
                    )
                    .with_tag(FindingTag::DependencyNotMet)]
                }
            };

            let delta = max_component_delta(wkt, cf);
            let tolerance = ctx.spec.crs_agreement_tolerance_deg;
            let detail = json!({
                "wkt_transform": [wkt.0, wkt.1],
                "cf_transform": [cf.0, cf.1],
                "delta_deg": delta,
                "tolerance_deg": tolerance,
            });
            if delta <= tolerance {
                vec![Observation::pass(format!(
                    "CRS interpretations agree within {:.1e} degrees",
                    delta.max(f64::MIN_POSITIVE)
                ))
                .with_detail(detail)]
            } else {
                vec![Observation::fail(format!(
                    "CRS interpretations disagree by {:.3e} degrees \
                     (tolerance {:.1e}): WKT gives ({:.6}, {:.6}), grid-mapping \
                     attributes give ({:.6}, {:.6})",
                    delta, tolerance, wkt.0, wkt.1, cf.0, cf.1
                ))
                .with_detail(detail)]
            }
        },
    )
    .depends_on("tool-wkt-parse")
    .depends_on("tool-cartographic")
}
