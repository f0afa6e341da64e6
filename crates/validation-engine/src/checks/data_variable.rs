//! Data-variable rules: layout, naming/units, chunking, compression and
//! georeferencing.

use serde_json::json;
use validator_common::{Category, Severity};

use crate::rule::{Observation, Rule, RuleContext};

/// Compressor names recognized as actual compression (as opposed to
/// serialization codecs like "bytes").
const COMPRESSORS: &[&str] = &[
    "zstd", "blosc", "gzip", "zlib", "lz4", "lzma", "bz2", "snappy",
];

fn each_data_variable(
    ctx: &RuleContext<'_>,
    mut check: impl FnMut(&dataset_adapter::VariableMeta) -> Observation,
) -> Vec<Observation> {
    let names = ctx.dataset.data_variable_names();
    if names.is_empty() {
        return vec![Observation::fail("archive has no data variable")];
    }
    names
        .into_iter()
        .filter_map(|name| ctx.dataset.variable(&name))
        .map(|meta| check(&meta))
        .collect()
}

/// The data variable must be laid out (time, y, x) with a floating dtype.
pub fn data_structure() -> Rule {
    Rule::sync(
        "data-structure",
        Category::DataVariable,
        Severity::Required,
        |ctx| {
            each_data_variable(ctx, |meta| {
                let expected = ["time", "y", "x"];
                if meta.dims != expected {
                    return Observation::fail(format!(
                        "variable '{}' has dimension order {:?}; expected {:?}",
                        meta.name, meta.dims, expected
                    ));
                }
                if !meta.dtype.is_float() {
                    return Observation::fail(format!(
                        "variable '{}' has dtype {}; a floating-point type is required",
                        meta.name, meta.dtype
                    ));
                }
                Observation::pass(format!(
                    "variable '{}' has (time, y, x) layout with dtype {}",
                    meta.name, meta.dtype
                ))
            })
        },
    )
}

/// Variable naming and units must match the specification's per-quantity
/// tables, and the CF identity attributes must be present.
pub fn variable_naming() -> Rule {
    Rule::sync(
        "variable-naming",
        Category::DataVariable,
        Severity::Required,
        |ctx| {
            let specs = &ctx.spec.variable_specs;
            each_data_variable(ctx, |meta| {
                let missing: Vec<&str> = ["long_name", "standard_name", "units"]
                    .iter()
                    .copied()
                    .filter(|attr| meta.attr_str(attr).is_none())
                    .collect();
                if !missing.is_empty() {
                    return Observation::fail(format!(
                        "variable '{}' is missing CF attributes: {}",
                        meta.name,
                        missing.join(", ")
                    ));
                }
                let standard_name = meta.attr_str("standard_name").unwrap_or_default();
                let units = meta.attr_str("units").unwrap_or_default();

                match specs.iter().find(|spec| {
                    spec.standard_names.iter().any(|n| n == standard_name)
                }) {
                    Some(spec) if spec.units.iter().any(|u| u == units) => {
                        Observation::pass(format!(
                            "variable '{}' ({}, '{}') is valid for quantity '{}'",
                            meta.name, standard_name, units, spec.quantity
                        ))
                    }
                    Some(spec) => Observation::fail(format!(
                        "variable '{}' has units '{}'; quantity '{}' allows {:?}",
                        meta.name, units, spec.quantity, spec.units
                    )),
                    None => Observation::fail(format!(
                        "variable '{}' has standard_name '{}', which matches no \
                         accepted quantity",
                        meta.name, standard_name
                    )),
                }
            })
        },
    )
}

/// One chunk per timestep covering the full spatial frame.
pub fn chunking() -> Rule {
    Rule::sync("chunking", Category::Chunking, Severity::Required, |ctx| {
        let time_chunk = ctx.spec.time_chunk_size;
        each_data_variable(ctx, |meta| {
            let chunks = match &meta.chunk_shape {
                Some(chunks) if chunks.len() == meta.shape.len() => chunks,
                _ => {
                    return Observation::fail(format!(
                        "variable '{}' exposes no regular chunk shape",
                        meta.name
                    ))
                }
            };
            let spatial_ok = chunks[1..] == meta.shape[1..];
            if chunks[0] == time_chunk && spatial_ok {
                Observation::pass(format!(
                    "variable '{}' is chunked {} x full-frame",
                    meta.name, time_chunk
                ))
            } else {
                Observation::fail(format!(
                    "variable '{}' chunk shape {:?} must be [{}, {}, {}] \
                     (one full frame per timestep)",
                    meta.name,
                    chunks,
                    time_chunk,
                    meta.shape.get(1).copied().unwrap_or_default(),
                    meta.shape.get(2).copied().unwrap_or_default()
                ))
            }
        })
    })
}

/// The data variable should be compressed, preferably with zstd.
pub fn compression() -> Rule {
    Rule::sync(
        "compression",
        Category::DataVariable,
        Severity::Recommended,
        |ctx| {
            let recommended = &ctx.spec.recommended_compressors;
            each_data_variable(ctx, |meta| {
                let used: Vec<&String> = meta
                    .codecs
                    .iter()
                    .filter(|codec| COMPRESSORS.contains(&codec.to_lowercase().as_str()))
                    .collect();
                if used.is_empty() {
                    return Observation::fail(format!(
                        "variable '{}' is not compressed",
                        meta.name
                    ));
                }
                let has_recommended = used.iter().any(|codec| {
                    recommended
                        .iter()
                        .any(|r| r.eq_ignore_ascii_case(codec))
                });
                if has_recommended {
                    Observation::pass(format!(
                        "variable '{}' uses recommended compression ({})",
                        meta.name,
                        used.iter().map(|s| s.as_str()).collect::<Vec<_>>().join("+")
                    ))
                } else {
                    Observation::warn(format!(
                        "variable '{}' is compressed with {:?}; {:?} recommended",
                        meta.name, used, recommended
                    ))
                }
            })
        },
    )
}

/// Proper georeferencing: a grid_mapping attribute naming a CRS variable
/// that carries both spatial_ref and crs_wkt.
pub fn georeferencing() -> Rule {
    Rule::sync(
        "georeferencing",
        Category::Georeferencing,
        Severity::Required,
        |ctx| {
            each_data_variable(ctx, |meta| {
                let grid_mapping = match meta.attr_str("grid_mapping") {
                    Some(name) => name.to_string(),
                    None => {
                        return Observation::fail(format!(
                            "variable '{}' is missing the 'grid_mapping' attribute",
                            meta.name
                        ))
                    }
                };
                let crs = match ctx.dataset.variable(&grid_mapping) {
                    Some(crs) => crs,
                    None => {
                        return Observation::fail(format!(
                            "variable '{}' references grid mapping '{}', which does \
                             not exist",
                            meta.name, grid_mapping
                        ))
                    }
                };
                let missing: Vec<&str> = ["spatial_ref", "crs_wkt"]
                    .iter()
                    .copied()
                    .filter(|attr| crs.attr_str(attr).is_none())
                    .collect();
                if missing.is_empty() {
                    Observation::pass(format!(
                        "CRS variable '{}' carries spatial_ref and crs_wkt",
                        grid_mapping
                    ))
                } else {
                    Observation::fail(format!(
                        "CRS variable '{}' is missing attributes: {}",
                        grid_mapping,
                        missing.join(", ")
                    ))
                    .with_detail(json!({"missing": missing}))
                }
            })
        },
    )
}
