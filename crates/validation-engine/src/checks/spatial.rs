//! Spatial rules: coordinate presence, resolution, domain consistency and
//! the valid-crop search.

use serde_json::json;
use tracing::debug;
use validator_common::{Category, Severity};

use crate::checks::crop::{intersect_mask, largest_valid_window};
use crate::rule::{Observation, Rule};

/// Required coordinate variables with CF attributes.
pub fn coordinate_names() -> Rule {
    Rule::sync(
        "coordinate-names",
        Category::Spatial,
        Severity::Required,
        |ctx| {
            let mut observations = Vec::new();
            for name in ["time", "x", "y"] {
                match ctx.dataset.variable(name) {
                    None => observations.push(Observation::fail(format!(
                        "missing required coordinate variable '{}'",
                        name
                    ))),
                    Some(meta) => {
                        let missing: Vec<&str> = ["standard_name", "units"]
                            .iter()
                            .copied()
                            .filter(|attr| meta.attr_str(attr).is_none())
                            .collect();
                        if missing.is_empty() {
                            observations.push(Observation::pass(format!(
                                "coordinate '{}' present with CF attributes",
                                name
                            )));
                        } else {
                            observations.push(Observation::fail(format!(
                                "coordinate '{}' is missing CF attributes: {}",
                                name,
                                missing.join(", ")
                            )));
                        }
                    }
                }
            }
            observations
        },
    )
}

/// Auxiliary latitude/longitude coordinates are recommended for plotting
/// workflows.
pub fn latlon_coords() -> Rule {
    Rule::sync(
        "latlon-coords",
        Category::Spatial,
        Severity::Recommended,
        |ctx| {
            let names = ctx.dataset.variable_names();
            let has = |candidates: [&str; 2], standard: &str| {
                names.iter().any(|n| {
                    candidates.contains(&n.as_str())
                        || ctx
                            .dataset
                            .variable(n)
                            .and_then(|m| m.attr_str("standard_name").map(str::to_string))
                            .as_deref()
                            == Some(standard)
                })
            };
            let lat = has(["lat", "latitude"], "latitude");
            let lon = has(["lon", "longitude"], "longitude");
            if lat && lon {
                vec![Observation::pass(
                    "auxiliary latitude/longitude coordinates present",
                )]
            } else {
                vec![Observation::warn(
                    "no auxiliary latitude/longitude coordinate variables",
                )]
            }
        },
    )
}

/// Coordinate spacing must be at or below the specification's resolution
/// threshold.
pub fn resolution() -> Rule {
    Rule::sync(
        "spatial-resolution",
        Category::Spatial,
        Severity::Required,
        |ctx| {
            let spacing = |name: &str| -> Result<f64, Observation> {
                let values = ctx.dataset.coord_values(name).map_err(|err| {
                    Observation::fail(format!("cannot read coordinate '{}': {}", name, err))
                })?;
                if values.len() < 2 {
                    return Err(Observation::fail(format!(
                        "coordinate '{}' has fewer than 2 values",
                        name
                    )));
                }
                Ok((values[1] - values[0]).abs())
            };

            let (dx, dy) = match (spacing("x"), spacing("y")) {
                (Ok(dx), Ok(dy)) => (dx, dy),
                (Err(obs), _) | (_, Err(obs)) => return vec![obs],
            };

            let limit = ctx.spec.max_resolution_m;
            if dx <= limit && dy <= limit {
                vec![Observation::pass(format!(
                    "resolution {:.1} m x {:.1} m within the {:.0} m limit",
                    dx, dy, limit
                ))
                .with_detail(json!({"dx_m": dx, "dy_m": dy}))]
            } else {
                vec![Observation::fail(format!(
                    "resolution {:.1} m x {:.1} m exceeds the {:.0} m limit",
                    dx, dy, limit
                ))
                .with_detail(json!({"dx_m": dx, "dy_m": dy}))]
            }
        },
    )
}

/// The spatial domain must be shared across timesteps: coordinates are 1-D
/// (not per-timestep), uniformly spaced, and sized to the data variable.
pub fn domain_consistency() -> Rule {
    Rule::sync(
        "spatial-domain-consistency",
        Category::Spatial,
        Severity::Required,
        |ctx| {
            let data_var = match ctx.dataset.data_variable_names().into_iter().next() {
                Some(name) => name,
                None => return vec![Observation::fail("archive has no data variable")],
            };
            let meta = match ctx.dataset.variable(&data_var) {
                Some(meta) => meta,
                None => return vec![Observation::fail("data variable metadata unavailable")],
            };

            let mut observations = Vec::new();
            for (coord, expected_len) in [("y", meta.shape.get(1)), ("x", meta.shape.get(2))] {
                let coord_meta = match ctx.dataset.variable(coord) {
                    Some(m) => m,
                    None => {
                        observations
                            .push(Observation::fail(format!("missing coordinate '{}'", coord)));
                        continue;
                    }
                };
                if coord_meta.dims.iter().any(|d| d == "time") {
                    observations.push(Observation::fail(format!(
                        "coordinate '{}' varies along the time dimension; the spatial \
                         domain must be shared across timesteps",
                        coord
                    )));
                    continue;
                }
                let matches_data = match (coord_meta.shape.first(), expected_len) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                };
                if !matches_data {
                    observations.push(Observation::fail(format!(
                        "coordinate '{}' length {:?} does not match data variable '{}' {:?}",
                        coord, coord_meta.shape, data_var, meta.shape
                    )));
                    continue;
                }

                match ctx.dataset.coord_values(coord) {
                    Err(err) => observations.push(Observation::fail(format!(
                        "cannot read coordinate '{}': {}",
                        coord, err
                    ))),
                    Ok(values) if values.len() >= 2 => {
                        let step = values[1] - values[0];
                        let uniform = values
                            .windows(2)
                            .all(|w| ((w[1] - w[0]) - step).abs() <= step.abs() * 1e-9);
                        if uniform {
                            observations.push(Observation::pass(format!(
                                "coordinate '{}' is shared and uniformly spaced",
                                coord
                            )));
                        } else {
                            observations.push(Observation::fail(format!(
                                "coordinate '{}' spacing is not uniform",
                                coord
                            )));
                        }
                    }
                    Ok(_) => observations.push(Observation::fail(format!(
                        "coordinate '{}' has fewer than 2 values",
                        coord
                    ))),
                }
            }
            observations
        },
    )
}

/// Sampled timestep indices for the crop search: first, last and an evenly
/// spaced interior sample.
fn sample_indices(time_len: u64, interior: usize) -> Vec<u64> {
    let mut indices = vec![0];
    if time_len > 1 {
        for k in 1..=interior as u64 {
            indices.push(k * (time_len - 1) / (interior as u64 + 1));
        }
        indices.push(time_len - 1);
    }
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// The valid sensing area must contain at least one crop of the required
/// size, constant across (sampled) timesteps.
pub fn valid_crop() -> Rule {
    Rule::sync("valid-crop", Category::Spatial, Severity::Required, |ctx| {
        let data_var = match ctx.dataset.data_variable_names().into_iter().next() {
            Some(name) => name,
            None => return vec![Observation::fail("archive has no data variable")],
        };
        let time_len = ctx.dataset.time_len();
        if time_len == 0 {
            return vec![Observation::fail("archive has no timesteps")];
        }

        let samples = sample_indices(time_len, ctx.spec.crop_sample_timesteps);
        debug!(?samples, variable = %data_var, "Sampling timesteps for crop search");

        let mut mask: Option<Vec<bool>> = None;
        let mut dims = (0usize, 0usize);
        for &t in &samples {
            let frame = match ctx.dataset.read_frame(&data_var, t) {
                Ok(frame) => frame,
                Err(err) => {
                    return vec![Observation::fail(format!(
                        "failed to read timestep {} of '{}': {}",
                        t, data_var, err
                    ))]
                }
            };
            dims = (frame.height, frame.width);
            let width = frame.width;
            if let Some(mask) = mask.as_mut() {
                intersect_mask(mask, |i| frame.is_valid(i / width, i % width));
            } else {
                let mut initial = vec![false; frame.height * frame.width];
                for row in 0..frame.height {
                    for col in 0..width {
                        initial[row * width + col] = frame.is_valid(row, col);
                    }
                }
                mask = Some(initial);
            }
        }

        let mask = match mask {
            Some(mask) => mask,
            None => return vec![Observation::fail("no timesteps could be sampled")],
        };
        let (min_h, min_w) = ctx.spec.min_crop;
        let best = largest_valid_window(&mask, dims.0, dims.1);
        let detail = json!({
            "sampled_timesteps": samples,
            "window": best,
        });

        match best {
            Some(window) if window.height >= min_h && window.width >= min_w => {
                vec![Observation::pass(format!(
                    "found a {}x{} all-valid window at ({}, {}); {}x{} required",
                    window.height, window.width, window.top, window.left, min_h, min_w
                ))
                .with_detail(detail)]
            }
            Some(window) => vec![Observation::fail(format!(
                "largest all-valid window is {}x{}; {}x{} required",
                window.height, window.width, min_h, min_w
            ))
            .with_detail(detail)],
            None => vec![Observation::fail(
                "no valid pixels in the sampled timesteps",
            )
            .with_detail(detail)],
        }
    })
    .depends_on("spatial-domain-consistency")
}
