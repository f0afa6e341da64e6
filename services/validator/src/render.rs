//! Human-readable report rendering: findings grouped by category with
//! per-category counts and an overall summary.

use std::fmt::Write;

use validator_common::{Category, Report};

/// Render a report as an aligned text table.
pub fn render_report(report: &Report) -> String {
    let mut out = String::new();
    let summary = report.summary();

    let _ = writeln!(
        out,
        "Validation report for {} (spec {})",
        report.location, report.spec_version
    );
    if !report.complete {
        let _ = writeln!(out, "NOTE: run was interrupted; the report is partial");
    }
    let _ = writeln!(out);

    let rule_width = report
        .findings
        .iter()
        .map(|f| f.rule_id.len())
        .max()
        .unwrap_or(0);

    for category in Category::all() {
        let findings: Vec<_> = report.findings_in(*category).collect();
        if findings.is_empty() {
            continue;
        }
        let counts = &summary.by_category[category];
        let _ = writeln!(
            out,
            "{} ({} pass, {} fail, {} warn)",
            category, counts.pass, counts.fail, counts.warn
        );
        for finding in findings {
            let _ = writeln!(
                out,
                "  {:<7} {:<width$}  {}",
                finding.outcome.to_string(),
                finding.rule_id,
                finding.message,
                width = rule_width
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Summary: {} fail(s), {} warning(s), {} pass(es)",
        summary.fails, summary.warnings, summary.passes
    );
    let _ = writeln!(out, "Verdict: {}", report.verdict);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator_common::{Finding, Outcome, Severity};

    fn sample_report(complete: bool) -> Report {
        Report::from_findings(
            "v1.0",
            "/data/radar.zarr",
            vec![
                Finding::new(
                    "temporal-coverage",
                    Category::Temporal,
                    Severity::Required,
                    Outcome::Pass,
                    "coverage spans 4.0 years",
                ),
                Finding::new(
                    "license-spdx",
                    Category::Licensing,
                    Severity::Required,
                    Outcome::Fail,
                    "missing required 'license' global attribute",
                ),
            ],
            complete,
        )
    }

    #[test]
    fn test_render_groups_and_verdict() {
        let text = render_report(&sample_report(true));
        assert!(text.contains("Validation report for /data/radar.zarr (spec v1.0)"));
        assert!(text.contains("temporal (1 pass, 0 fail, 0 warn)"));
        assert!(text.contains("licensing (0 pass, 1 fail, 0 warn)"));
        assert!(text.contains("Verdict: FAIL"));
        assert!(text.contains("Summary: 1 fail(s), 0 warning(s), 1 pass(es)"));
    }

    #[test]
    fn test_render_marks_partial_reports() {
        let text = render_report(&sample_report(false));
        assert!(text.contains("report is partial"));
    }
}
