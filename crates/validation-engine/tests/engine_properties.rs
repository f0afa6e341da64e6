//! Engine-level properties from the acceptance design, exercised against an
//! in-memory dataset.

use std::sync::atomic::AtomicBool;

use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;

use test_utils::{masked_frame, nan_frame, regular_times, MockDataset};
use validation_engine::checks::{data_variable, global_attrs, spatial, temporal, tool_compat};
use validation_engine::{AcceptanceSpec, Rule, Runner};
use validator_common::{Outcome, Report, Severity, Verdict};

async fn run_rules(dataset: &MockDataset, rules: Vec<Rule>) -> Report {
    Runner::new(AcceptanceSpec::v1(), rules)
        .run(dataset, &AtomicBool::new(false))
        .await
}

fn finding<'a>(report: &'a Report, rule_id: &str) -> &'a validator_common::Finding {
    report
        .findings
        .iter()
        .find(|f| f.rule_id == rule_id)
        .unwrap_or_else(|| panic!("no finding for rule '{}'", rule_id))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_verdict_fails_iff_required_rule_fails() {
    let valid = MockDataset::radar_default();
    let report = run_rules(&valid, vec![global_attrs::license_spdx()]).await;
    assert_eq!(report.verdict, Verdict::Pass);

    let mut invalid = MockDataset::radar_default();
    invalid.global_attrs.remove("license");
    let report = run_rules(&invalid, vec![global_attrs::license_spdx()]).await;
    assert_eq!(report.verdict, Verdict::Fail);
    assert!(report
        .findings
        .iter()
        .any(|f| f.severity == Severity::Required && f.outcome == Outcome::Fail));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_recommended_rules_never_fail() {
    // Strip compression entirely; the predicate reports a violation but the
    // severity class caps it at WARN.
    let dataset =
        MockDataset::radar_default().edit_variable("precip", |meta| meta.codecs.clear());
    let report = run_rules(&dataset, vec![data_variable::compression()]).await;

    let compression = finding(&report, "compression");
    assert_eq!(compression.outcome, Outcome::Warn);
    assert_eq!(report.verdict, Verdict::Pass);
    assert!(report
        .findings
        .iter()
        .all(|f| !(f.severity == Severity::Recommended && f.outcome == Outcome::Fail)));
}

fn crop_rules() -> Vec<Rule> {
    vec![spatial::domain_consistency(), spatial::valid_crop()]
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crop_search_finds_300_square() {
    let dataset = MockDataset::radar_default()
        .with_grid(400, 400)
        .with_default_frame(masked_frame(400, 400, (30, 50, 300, 300)));
    let report = run_rules(&dataset, crop_rules()).await;

    let crop = finding(&report, "valid-crop");
    assert_eq!(crop.outcome, Outcome::Pass, "{}", crop.message);
    let window = &crop.detail.as_ref().unwrap()["window"];
    assert!(window["height"].as_u64().unwrap() >= 256);
    assert!(window["width"].as_u64().unwrap() >= 256);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crop_search_rejects_255_square() {
    let dataset = MockDataset::radar_default()
        .with_grid(400, 400)
        .with_default_frame(masked_frame(400, 400, (10, 10, 255, 255)));
    let report = run_rules(&dataset, crop_rules()).await;

    let crop = finding(&report, "valid-crop");
    assert_eq!(crop.outcome, Outcome::Fail);
    assert_eq!(report.verdict, Verdict::Fail);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crop_search_is_deterministic() {
    let dataset = MockDataset::radar_default()
        .with_grid(400, 400)
        .with_default_frame(masked_frame(400, 400, (30, 50, 300, 300)));

    let first = run_rules(&dataset, crop_rules()).await;
    let second = run_rules(&dataset, crop_rules()).await;
    assert_eq!(
        finding(&first, "valid-crop").detail,
        finding(&second, "valid-crop").detail
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crop_intersects_sampled_timesteps() {
    // The last timestep loses the right half of the sensing area; the
    // intersection must shrink accordingly.
    let n_times = 1462;
    let dataset = MockDataset::radar_default()
        .with_grid(300, 300)
        .with_default_frame(masked_frame(300, 300, (0, 0, 300, 300)))
        .with_frame_at(n_times - 1, masked_frame(300, 300, (0, 0, 300, 100)));
    let report = run_rules(&dataset, crop_rules()).await;

    let crop = finding(&report, "valid-crop");
    assert_eq!(crop.outcome, Outcome::Fail);
    let window = &crop.detail.as_ref().unwrap()["window"];
    assert_eq!(window["width"].as_u64().unwrap(), 100);
}

fn future_extended_dataset() -> (MockDataset, u64) {
    let daily_start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
    let mut times = regular_times(daily_start, Duration::days(1), 1000);
    let fine_start = Utc.with_ymd_and_hms(2022, 9, 27, 0, 0, 0).unwrap();
    times.extend(regular_times(fine_start, Duration::minutes(5), 289));
    let last_valid = *times.last().unwrap();

    let first_future = times.len() as u64;
    for k in 1..=12 {
        times.push(last_valid + Duration::minutes(5 * k));
    }

    let mut dataset = MockDataset::radar_default()
        .with_times(times)
        .with_global_attr(
            "last_valid_timestep",
            Value::String(last_valid.to_rfc3339()),
        );
    for t in first_future..first_future + 12 {
        dataset = dataset.with_frame_at(t, nan_frame(32, 32));
    }
    (dataset, first_future)
}

#[tokio::test(flavor = "multi_thread")]
async fn test_future_extension_valid_passes() {
    let (dataset, _) = future_extended_dataset();
    let report = run_rules(&dataset, vec![temporal::future_extension()]).await;
    let f = finding(&report, "future-extension");
    assert_eq!(f.outcome, Outcome::Pass, "{}", f.message);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_future_extension_non_nan_value_fails_with_timestamp() {
    let (dataset, first_future) = future_extended_dataset();
    let mut leaky = nan_frame(32, 32);
    leaky[5] = 0.7;
    let dataset = dataset.with_frame_at(first_future + 3, leaky);

    let report = run_rules(&dataset, vec![temporal::future_extension()]).await;
    let f = finding(&report, "future-extension");
    assert_eq!(f.outcome, Outcome::Fail);
    let offending = &f.detail.as_ref().unwrap()["offending_timesteps"];
    assert_eq!(offending.as_array().unwrap().len(), 1);
    assert!(offending[0]["timestamp"].as_str().unwrap().contains("2022"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_future_extension_wrong_spacing_fails() {
    let (dataset, first_future) = future_extended_dataset();
    // Push the final future timestamp off the 5-minute cadence.
    let mut times = dataset.times.clone();
    let last = times.len() - 1;
    times[last] += Duration::minutes(3);
    let dataset = dataset.clone().with_times(times).with_frame_at(
        first_future + 11,
        nan_frame(32, 32),
    );

    let report = run_rules(&dataset, vec![temporal::future_extension()]).await;
    let f = finding(&report, "future-extension");
    assert_eq!(f.outcome, Outcome::Fail);
    assert!(f.detail.as_ref().unwrap()["offending_timestamps"]
        .as_array()
        .is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_timestamps_beyond_cutoff_year_fail() {
    let start = Utc.with_ymd_and_hms(2048, 1, 1, 0, 0, 0).unwrap();
    let dataset = MockDataset::radar_default()
        .with_times(regular_times(start, Duration::days(1), 1200));

    let report = run_rules(&dataset, vec![temporal::future_extension()]).await;
    let f = finding(&report, "future-extension");
    assert_eq!(f.outcome, Outcome::Fail);
    assert!(f.message.contains("2050") || f.message.contains("2051"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_coverage_boundary_at_three_years() {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

    let exactly = MockDataset::radar_default()
        .with_times(vec![start, Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()]);
    let report = run_rules(&exactly, vec![temporal::coverage()]).await;
    assert_eq!(finding(&report, "temporal-coverage").outcome, Outcome::Pass);

    let one_day_short = MockDataset::radar_default()
        .with_times(vec![start, Utc.with_ymd_and_hms(2022, 12, 31, 0, 0, 0).unwrap()]);
    let report = run_rules(&one_day_short, vec![temporal::coverage()]).await;
    assert_eq!(finding(&report, "temporal-coverage").outcome, Outcome::Fail);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_declared_regular_start_must_be_exact() {
    let coarse_start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
    let mut times = regular_times(coarse_start, Duration::days(2), 500);
    let fine_start = Utc.with_ymd_and_hms(2021, 10, 1, 0, 0, 0).unwrap();
    times.extend(regular_times(fine_start, Duration::hours(1), 2000));

    let exact = MockDataset::radar_default()
        .with_times(times.clone())
        .with_global_attr(
            "consistent_timestep_start",
            Value::String(fine_start.to_rfc3339()),
        );
    let report = run_rules(&exact, vec![temporal::declared_regular_start()]).await;
    let f = finding(&report, "declared-regular-start");
    assert_eq!(f.outcome, Outcome::Pass, "{}", f.message);

    let approximate = MockDataset::radar_default()
        .with_times(times)
        .with_global_attr(
            "consistent_timestep_start",
            Value::String((fine_start + Duration::hours(1)).to_rfc3339()),
        );
    let report = run_rules(&approximate, vec![temporal::declared_regular_start()]).await;
    assert_eq!(
        finding(&report, "declared-regular-start").outcome,
        Outcome::Fail
    );
}

fn agreement_rules() -> Vec<Rule> {
    vec![
        tool_compat::wkt_parse(),
        tool_compat::cartographic(),
        tool_compat::crs_agreement(),
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crs_agreement_within_tolerance_passes() {
    // Identical parameters on both routes: disagreement is ~0.
    let dataset = MockDataset::radar_default();
    let report = run_rules(&dataset, agreement_rules()).await;
    let f = finding(&report, "crs-agreement");
    assert_eq!(f.outcome, Outcome::Pass, "{}", f.message);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crs_agreement_millidegree_disagreement_fails() {
    // Skew the CF attributes by 1e-3 degrees of central meridian; the WKT
    // route keeps the original value.
    let dataset = MockDataset::radar_default().edit_variable("crs", |meta| {
        meta.attrs.insert(
            "straight_vertical_longitude_from_pole".to_string(),
            serde_json::json!(10.5666 + 1e-3),
        );
    });
    let report = run_rules(&dataset, agreement_rules()).await;

    let f = finding(&report, "crs-agreement");
    assert_eq!(f.outcome, Outcome::Fail);
    let detail = f.detail.as_ref().unwrap();
    assert!(detail["wkt_transform"].is_array());
    assert!(detail["cf_transform"].is_array());
    assert!(detail["delta_deg"].as_f64().unwrap() > 1e-4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crs_agreement_nanodegree_disagreement_passes() {
    let dataset = MockDataset::radar_default().edit_variable("crs", |meta| {
        meta.attrs.insert(
            "straight_vertical_longitude_from_pole".to_string(),
            serde_json::json!(10.5666 + 1e-9),
        );
    });
    let report = run_rules(&dataset, agreement_rules()).await;
    assert_eq!(finding(&report, "crs-agreement").outcome, Outcome::Pass);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_crs_agreement_skipped_when_probe_fails() {
    let dataset = MockDataset::radar_default().edit_variable("crs", |meta| {
        meta.attrs.remove("crs_wkt");
    });
    let report = run_rules(&dataset, agreement_rules()).await;
    assert_eq!(
        finding(&report, "crs-agreement").outcome,
        Outcome::Skipped
    );
}
