//! The versioned acceptance specification table.
//!
//! Every threshold and allow-list a rule consults lives here, so a rule
//! never hard-codes policy and multiple specification versions can be tested
//! side by side.

use serde::{Deserialize, Serialize};

/// Allowed naming/units for one physical quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Quantity label used in messages ("precip_rate", "reflectivity", ...).
    pub quantity: String,
    /// CF standard names accepted for the quantity.
    pub standard_names: Vec<String>,
    /// Unit strings accepted for the quantity.
    pub units: Vec<String>,
}

/// One version of the acceptance specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceSpec {
    /// Version identifier reported in every [`Report`](validator_common::Report).
    pub version: String,

    // --- spatial ---
    /// Coarsest allowed coordinate spacing, meters.
    pub max_resolution_m: f64,
    /// Required contiguous valid window, (height, width) pixels.
    pub min_crop: (usize, usize),
    /// Number of evenly spaced interior timesteps sampled by the crop
    /// search, in addition to the first and last.
    pub crop_sample_timesteps: usize,

    // --- temporal ---
    /// Minimum coverage span, calendar months (36 = three years).
    pub min_coverage_months: u32,
    /// Latest calendar year a timestamp may fall in.
    pub future_cutoff_year: i32,
    /// Cap on the number of frames inspected after the last valid timestep.
    pub future_frame_sample: usize,

    // --- data variable ---
    /// Accepted naming/units per physical quantity.
    pub variable_specs: Vec<VariableSpec>,
    /// Required chunk length along the time dimension.
    pub time_chunk_size: u64,
    /// Compressors considered optimal for the data variable.
    pub recommended_compressors: Vec<String>,

    // --- licensing ---
    /// Curated SPDX identifiers accepted without review.
    pub known_licenses: Vec<String>,
    /// Licenses accepted outright (prefix match on the identifier).
    pub recommended_licenses: Vec<String>,
    /// Identifier fragments that downgrade a license to needs-review.
    pub restricted_license_tokens: Vec<String>,

    // --- tool compatibility ---
    /// Maximum lon/lat disagreement between CRS probes, degrees.
    pub crs_agreement_tolerance_deg: f64,
    /// Per-probe wall-clock budget, seconds.
    pub probe_timeout_secs: u64,
}

impl AcceptanceSpec {
    /// The v1.0 table for 2D radar composite archives.
    pub fn v1() -> Self {
        Self {
            version: "v1.0".to_string(),
            max_resolution_m: 1000.0,
            min_crop: (256, 256),
            crop_sample_timesteps: 5,
            min_coverage_months: 36,
            future_cutoff_year: 2050,
            future_frame_sample: 64,
            variable_specs: vec![
                VariableSpec {
                    quantity: "precip_rate".to_string(),
                    standard_names: vec![
                        "rainfall_flux".to_string(),
                        "precipitation_flux".to_string(),
                    ],
                    units: vec![
                        "kg m-2 h-1".to_string(),
                        "kg m-2 s-1".to_string(),
                        "mm h-1".to_string(),
                        "mm/h".to_string(),
                    ],
                },
                VariableSpec {
                    quantity: "precip_amount".to_string(),
                    standard_names: vec![
                        "precipitation_amount".to_string(),
                        "rainfall_amount".to_string(),
                    ],
                    units: vec!["kg m-2".to_string(), "mm".to_string()],
                },
                VariableSpec {
                    quantity: "reflectivity".to_string(),
                    standard_names: vec!["equivalent_reflectivity_factor".to_string()],
                    units: vec!["dBZ".to_string()],
                },
            ],
            time_chunk_size: 1,
            recommended_compressors: vec!["zstd".to_string()],
            known_licenses: [
                "CC0-1.0",
                "CC-BY-4.0",
                "CC-BY-SA-4.0",
                "CC-BY-NC-4.0",
                "CC-BY-ND-4.0",
                "CC-BY-NC-SA-4.0",
                "CC-BY-NC-ND-4.0",
                "OGL-UK-3.0",
                "ODbL-1.0",
                "ODC-By-1.0",
                "EUPL-1.2",
                "Apache-2.0",
                "MIT",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            recommended_licenses: vec![
                "CC0".to_string(),
                "CC-BY".to_string(),
                "CC-BY-SA".to_string(),
                "OGL".to_string(),
            ],
            restricted_license_tokens: vec!["-NC".to_string(), "-ND".to_string()],
            crs_agreement_tolerance_deg: 1e-6,
            probe_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_table() {
        let spec = AcceptanceSpec::v1();
        assert_eq!(spec.version, "v1.0");
        assert_eq!(spec.min_crop, (256, 256));
        assert_eq!(spec.min_coverage_months, 36);
        assert_eq!(spec.future_cutoff_year, 2050);
        assert!(spec.known_licenses.contains(&"CC-BY-4.0".to_string()));
    }

    #[test]
    fn test_spec_roundtrips_through_json() {
        let spec = AcceptanceSpec::v1();
        let json = serde_json::to_string(&spec).unwrap();
        let back: AcceptanceSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, spec.version);
        assert_eq!(back.variable_specs.len(), spec.variable_specs.len());
    }
}
