//! Temporal rules: coverage span, timestep regularity and the NaN-filled
//! future extension.

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::json;
use tracing::debug;
use validator_common::{Category, Severity};

use crate::rule::{Observation, Rule, RuleContext};

/// Block length for lazy traversal of the time axis.
const TIME_BLOCK: u64 = 65_536;

/// Parse a timestamp attribute; accepts RFC 3339 and the common naive forms.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Visit consecutive-timestamp differences without materializing the axis.
///
/// Calls `visit(index, previous, current)` for every pair, where `index` is
/// the position of `current`. The scan is restricted to `[start, end)`.
fn scan_pairs(
    ctx: &RuleContext<'_>,
    start: u64,
    end: u64,
    mut visit: impl FnMut(u64, DateTime<Utc>, DateTime<Utc>),
) -> Result<(), Observation> {
    let mut prev: Option<DateTime<Utc>> = None;
    let mut at = start;
    while at < end {
        let stop = (at + TIME_BLOCK).min(end);
        let block = ctx
            .dataset
            .time_slice(at..stop)
            .map_err(|err| Observation::fail(format!("cannot read time axis: {}", err)))?;
        for (offset, t) in block.iter().enumerate() {
            if let Some(p) = prev {
                visit(at + offset as u64, p, *t);
            }
            prev = Some(*t);
        }
        at = stop;
    }
    Ok(())
}

fn timestamp_at(ctx: &RuleContext<'_>, index: u64) -> Result<DateTime<Utc>, Observation> {
    ctx.dataset
        .time_slice(index..index + 1)
        .map_err(|err| Observation::fail(format!("cannot read time axis: {}", err)))?
        .into_iter()
        .next()
        .ok_or_else(|| Observation::fail("empty time slice"))
}

/// Coverage is about span, not density: max - min of the time axis must
/// reach the specification's minimum, gaps included.
pub fn coverage() -> Rule {
    Rule::sync(
        "temporal-coverage",
        Category::Temporal,
        Severity::Required,
        |ctx| {
            let n = ctx.dataset.time_len();
            if n < 2 {
                return vec![Observation::fail(format!(
                    "time axis has {} value(s); cannot establish coverage",
                    n
                ))];
            }
            let (first, last) = match (timestamp_at(ctx, 0), timestamp_at(ctx, n - 1)) {
                (Ok(first), Ok(last)) => (first, last),
                (Err(obs), _) | (_, Err(obs)) => return vec![obs],
            };

            let months = ctx.spec.min_coverage_months;
            let threshold = first
                .checked_add_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            let span_days = (last - first).num_days();
            let detail = json!({
                "first": first.to_rfc3339(),
                "last": last.to_rfc3339(),
                "span_days": span_days,
            });

            if last >= threshold {
                vec![Observation::pass(format!(
                    "coverage spans {:.1} years ({} to {})",
                    span_days as f64 / 365.25,
                    first.date_naive(),
                    last.date_naive()
                ))
                .with_detail(detail)]
            } else {
                vec![Observation::fail(format!(
                    "coverage spans {:.2} years; at least {} months required",
                    span_days as f64 / 365.25,
                    months
                ))
                .with_detail(detail)]
            }
        },
    )
}

/// Result of one full pass over the time axis spacing.
struct SpacingProfile {
    unique_intervals: usize,
    /// Index where the trailing regularly spaced region begins.
    regular_start_index: u64,
    min_interval_ms: i64,
}

fn spacing_profile(ctx: &RuleContext<'_>) -> Result<SpacingProfile, Observation> {
    let n = ctx.dataset.time_len();
    let mut intervals = std::collections::BTreeSet::new();
    let mut last_diff: Option<i64> = None;
    let mut regular_start_index = 0u64;
    let mut min_interval_ms = i64::MAX;

    scan_pairs(ctx, 0, n, |index, prev, current| {
        let diff = (current - prev).num_milliseconds();
        intervals.insert(diff);
        min_interval_ms = min_interval_ms.min(diff);
        if let Some(previous_diff) = last_diff {
            if diff != previous_diff {
                // The run that reaches the end starts where spacing last
                // changed, at the earlier element of this pair.
                regular_start_index = index - 1;
            }
        }
        last_diff = Some(diff);
    })?;

    Ok(SpacingProfile {
        unique_intervals: intervals.len(),
        regular_start_index,
        min_interval_ms,
    })
}

/// Variable timesteps are allowed; an irregular axis should declare where
/// regular spacing begins.
pub fn timestep_regularity() -> Rule {
    Rule::sync(
        "timestep-regularity",
        Category::Temporal,
        Severity::Recommended,
        |ctx| {
            if ctx.dataset.time_len() < 2 {
                return vec![Observation::info(
                    "time axis too short to assess timestep regularity",
                )];
            }
            let profile = match spacing_profile(ctx) {
                Ok(profile) => profile,
                Err(obs) => return vec![obs],
            };

            if profile.unique_intervals <= 1 {
                return vec![Observation::pass(
                    "timestep is consistent throughout the archive",
                )];
            }

            let mut observations = vec![Observation::pass(format!(
                "variable timesteps detected ({} unique intervals)",
                profile.unique_intervals
            ))
            .with_detail(json!({
                "unique_intervals": profile.unique_intervals,
                "regular_start_index": profile.regular_start_index,
            }))];

            if ctx.dataset.global_attr_str("consistent_timestep_start").is_none() {
                observations.push(Observation::warn(
                    "variable timesteps without a 'consistent_timestep_start' attribute",
                ));
            }
            observations
        },
    )
}

/// When `consistent_timestep_start` is declared it must exactly equal the
/// first timestamp of the trailing regularly spaced region.
pub fn declared_regular_start() -> Rule {
    Rule::sync(
        "declared-regular-start",
        Category::Temporal,
        Severity::Required,
        |ctx| {
            let declared = match ctx.dataset.global_attr_str("consistent_timestep_start") {
                Some(value) => value,
                None => {
                    return vec![Observation::info(
                        "no 'consistent_timestep_start' attribute to verify",
                    )]
                }
            };
            let declared_ts = match parse_timestamp(&declared) {
                Some(ts) => ts,
                None => {
                    return vec![Observation::fail(format!(
                        "'consistent_timestep_start' is not a parseable timestamp: '{}'",
                        declared
                    ))]
                }
            };
            if ctx.dataset.time_len() < 2 {
                return vec![Observation::fail(
                    "'consistent_timestep_start' declared on an axis with fewer than 2 values",
                )];
            }
            let profile = match spacing_profile(ctx) {
                Ok(profile) => profile,
                Err(obs) => return vec![obs],
            };
            let actual = match timestamp_at(ctx, profile.regular_start_index) {
                Ok(ts) => ts,
                Err(obs) => return vec![obs],
            };

            if actual == declared_ts {
                vec![Observation::pass(format!(
                    "regular spacing begins exactly at the declared {}",
                    declared
                ))]
            } else {
                vec![Observation::fail(format!(
                    "'consistent_timestep_start' is {} but regular spacing begins at {}",
                    declared,
                    actual.to_rfc3339()
                ))
                .with_detail(json!({
                    "declared": declared_ts.to_rfc3339(),
                    "actual": actual.to_rfc3339(),
                }))]
            }
        },
    )
}

/// First index whose timestamp is strictly after `t`, by binary search over
/// lazy single-element slices.
fn first_index_after(
    ctx: &RuleContext<'_>,
    t: DateTime<Utc>,
) -> Result<u64, Observation> {
    let n = ctx.dataset.time_len();
    let mut lo = 0u64;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if timestamp_at(ctx, mid)? <= t {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Frame indices inspected for NaN-fill: all of them when few, otherwise
/// the first, last and an evenly spaced sample.
fn future_sample(start: u64, end: u64, cap: usize) -> Vec<u64> {
    let count = end - start;
    if count as usize <= cap {
        return (start..end).collect();
    }
    let mut indices = vec![start];
    for k in 1..cap as u64 {
        indices.push(start + k * (count - 1) / (cap as u64 - 1));
    }
    indices.push(end - 1);
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Timestamps beyond `last_valid_timestep` must be NaN-filled, regularly
/// spaced at the finest historical interval, and inside the cutoff year.
pub fn future_extension() -> Rule {
    Rule::sync(
        "future-extension",
        Category::Temporal,
        Severity::Required,
        |ctx| {
            let n = ctx.dataset.time_len();
            if n == 0 {
                return vec![Observation::fail("archive has no timesteps")];
            }
            let last = match timestamp_at(ctx, n - 1) {
                Ok(ts) => ts,
                Err(obs) => return vec![obs],
            };

            let mut observations = Vec::new();
            if last.year() > ctx.spec.future_cutoff_year {
                observations.push(
                    Observation::fail(format!(
                        "timestamps extend beyond {}: last is {}",
                        ctx.spec.future_cutoff_year,
                        last.to_rfc3339()
                    ))
                    .with_detail(json!({"offending_timestamp": last.to_rfc3339()})),
                );
            }

            let declared = ctx.dataset.global_attr_str("last_valid_timestep");
            let last_valid = match declared.as_deref().map(parse_timestamp) {
                Some(Some(ts)) => ts,
                Some(None) => {
                    observations.push(Observation::fail(format!(
                        "'last_valid_timestep' is not a parseable timestamp: '{}'",
                        declared.unwrap_or_default()
                    )));
                    return observations;
                }
                None => {
                    if last > Utc::now() {
                        observations.push(Observation::fail(
                            "archive extends into the future without a \
                             'last_valid_timestep' attribute",
                        ));
                    } else if observations.is_empty() {
                        observations.push(Observation::pass(
                            "no future extension and no cutoff violation",
                        ));
                    }
                    return observations;
                }
            };

            let first_future = match first_index_after(ctx, last_valid) {
                Ok(index) => index,
                Err(obs) => return vec![obs],
            };
            if first_future >= n {
                observations.push(Observation::pass(format!(
                    "no timestamps beyond last_valid_timestep {}",
                    last_valid.to_rfc3339()
                )));
                return observations;
            }
            debug!(first_future, total = n, "Validating future extension");

            // Finest spacing in the historical record.
            let mut min_hist_ms = i64::MAX;
            if let Err(obs) = scan_pairs(ctx, 0, first_future, |_, prev, current| {
                min_hist_ms = min_hist_ms.min((current - prev).num_milliseconds());
            }) {
                return vec![obs];
            }

            // Spacing from the last valid point forward, boundary included.
            let mut spacing_violations: Vec<String> = Vec::new();
            let scan_from = first_future.saturating_sub(1);
            if let Err(obs) = scan_pairs(ctx, scan_from, n, |_, prev, current| {
                if (current - prev).num_milliseconds() != min_hist_ms
                    && spacing_violations.len() < 16
                {
                    spacing_violations.push(current.to_rfc3339());
                }
            }) {
                return vec![obs];
            }
            if !spacing_violations.is_empty() {
                observations.push(
                    Observation::fail(format!(
                        "future spacing deviates from the finest historical interval \
                         ({} ms) at {} timestamp(s)",
                        min_hist_ms,
                        spacing_violations.len()
                    ))
                    .with_detail(json!({"offending_timestamps": spacing_violations})),
                );
            }

            // NaN-fill of future frames, on a bounded sample.
            let data_var = ctx.dataset.data_variable_names().into_iter().next();
            let mut nan_violations: Vec<serde_json::Value> = Vec::new();
            let sampled = future_sample(first_future, n, ctx.spec.future_frame_sample);
            if let Some(variable) = &data_var {
                for &t in &sampled {
                    let frame = match ctx.dataset.read_frame(variable, t) {
                        Ok(frame) => frame,
                        Err(err) => {
                            return vec![Observation::fail(format!(
                                "failed to read future timestep {}: {}",
                                t, err
                            ))]
                        }
                    };
                    let finite = frame.data.iter().filter(|v| !v.is_nan()).count();
                    if finite > 0 {
                        let ts = match timestamp_at(ctx, t) {
                            Ok(ts) => ts.to_rfc3339(),
                            Err(obs) => return vec![obs],
                        };
                        if nan_violations.len() < 16 {
                            nan_violations.push(json!({
                                "timestamp": ts,
                                "non_nan_pixels": finite,
                            }));
                        }
                    }
                }
            }
            if !nan_violations.is_empty() {
                observations.push(
                    Observation::fail(format!(
                        "{} future timestep(s) contain non-NaN values",
                        nan_violations.len()
                    ))
                    .with_detail(json!({"offending_timesteps": nan_violations})),
                );
            }

            if observations.is_empty() {
                observations.push(
                    Observation::pass(format!(
                        "future extension after {} is NaN-filled and regularly spaced",
                        last_valid.to_rfc3339()
                    ))
                    .with_detail(json!({
                        "checked_frames": sampled,
                        "min_historical_spacing_ms": min_hist_ms,
                    })),
                );
            }
            observations
        },
    )
}
