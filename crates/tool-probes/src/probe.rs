//! The probe interface and its shared input/outcome types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dataset_adapter::Location;

/// Everything a probe may need, extracted once by the caller.
///
/// Probes pick the fields relevant to their tool and ignore the rest; a
/// missing field a probe depends on is a probe failure, not a crash.
#[derive(Debug, Clone)]
pub struct ProbeInput {
    /// Location of the archive, for probes that re-open it themselves.
    /// Absent when the archive is not re-openable (e.g. in-memory datasets).
    pub location: Option<Location>,
    /// Name of the data variable to exercise.
    pub data_variable: Option<String>,
    /// CRS well-known-text string from the grid-mapping variable.
    pub crs_wkt: Option<String>,
    /// Full attribute map of the grid-mapping variable.
    pub grid_mapping_attrs: serde_json::Map<String, serde_json::Value>,
    /// Projected coordinates of the corner pixel (x[0], y[0]).
    pub corner_xy: Option<(f64, f64)>,
}

/// Structured outcome of one probe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// Name of the probed capability.
    pub tool: String,
    pub ok: bool,
    pub message: String,
    /// Corner-pixel transform result in degrees, for CRS-capable probes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<(f64, f64)>,
}

impl ProbeReport {
    pub fn success(tool: &str, message: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            ok: true,
            message: message.into(),
            transform: None,
        }
    }

    pub fn failure(tool: &str, message: impl Into<String>) -> Self {
        Self {
            tool: tool.to_string(),
            ok: false,
            message: message.into(),
            transform: None,
        }
    }

    pub fn with_transform(mut self, lonlat: (f64, f64)) -> Self {
        self.transform = Some(lonlat);
        self
    }
}

/// A probe of one named external capability.
#[async_trait]
pub trait ToolProbe: Send + Sync {
    /// Name of the capability under test.
    fn tool(&self) -> &'static str;

    /// Attempt the operation and classify the result. Never panics; any
    /// internal failure is reported as `ok = false`.
    async fn run(&self, input: &ProbeInput) -> ProbeReport;
}

/// Largest per-component absolute difference between two lon/lat pairs.
pub fn max_component_delta(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).abs().max((a.1 - b.1).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_component_delta() {
        let delta = max_component_delta((10.0, 55.0), (10.0 + 1e-3, 55.0 - 2e-4));
        assert!((delta - 1e-3).abs() < 1e-12);
    }

    #[test]
    fn test_report_serialization_skips_absent_transform() {
        let report = ProbeReport::failure("wkt-parse", "no CRS");
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("transform").is_none());
        assert_eq!(json["ok"], false);
    }
}
