//! Cartographic-CRS probe.
//!
//! Builds a projection from the CF grid-mapping attributes — the route a
//! mapping library takes when it ignores the WKT — and transforms the corner
//! pixel to longitude/latitude. Its result is compared against the
//! WKT-derived transform by the cross-tool agreement check.

use async_trait::async_trait;

use georef::Projection;

use crate::probe::{ProbeInput, ProbeReport, ToolProbe};
use crate::wkt_parse::projection_kind;

/// Probe of the mapping/projection collaborator.
#[derive(Debug, Default)]
pub struct CartographicProbe;

#[async_trait]
impl ToolProbe for CartographicProbe {
    fn tool(&self) -> &'static str {
        "cartographic"
    }

    async fn run(&self, input: &ProbeInput) -> ProbeReport {
        let tool = self.tool();
        if input.grid_mapping_attrs.is_empty() {
            return ProbeReport::failure(tool, "archive carries no grid-mapping attributes");
        }

        let projection = match Projection::from_cf_attrs(&input.grid_mapping_attrs) {
            Ok(projection) => projection,
            Err(err) => {
                return ProbeReport::failure(
                    tool,
                    format!("CRS construction from grid-mapping attributes failed: {}", err),
                )
            }
        };

        let corner = match input.corner_xy {
            Some(corner) => corner,
            None => {
                return ProbeReport::failure(
                    tool,
                    "no projected corner coordinates available for the sample transform",
                )
            }
        };

        match projection.to_lonlat(corner.0, corner.1) {
            Ok(lonlat) => ProbeReport::success(
                tool,
                format!(
                    "built {} and transformed the corner pixel to ({:.6}, {:.6})",
                    projection_kind(&projection),
                    lonlat.0,
                    lonlat.1
                ),
            )
            .with_transform(lonlat),
            Err(err) => ProbeReport::failure(tool, format!("corner transform failed: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(attrs: serde_json::Value) -> ProbeInput {
        ProbeInput {
            location: None,
            data_variable: Some("precip".to_string()),
            crs_wkt: None,
            grid_mapping_attrs: attrs.as_object().cloned().unwrap_or_default(),
            corner_xy: Some((-200_000.0, -3_800_000.0)),
        }
    }

    #[tokio::test]
    async fn test_cf_attrs_yield_transform() {
        let report = CartographicProbe
            .run(&input(serde_json::json!({
                "grid_mapping_name": "polar_stereographic",
                "straight_vertical_longitude_from_pole": 10.5666,
                "latitude_of_projection_origin": 90.0,
                "standard_parallel": 56.0,
                "earth_radius": 6371229.0
            })))
            .await;
        assert!(report.ok, "{}", report.message);
        assert!(report.transform.is_some());
    }

    #[tokio::test]
    async fn test_missing_attrs_fail() {
        let report = CartographicProbe.run(&input(serde_json::json!({}))).await;
        assert!(!report.ok);
    }

    #[tokio::test]
    async fn test_unknown_grid_mapping_fails() {
        let report = CartographicProbe
            .run(&input(serde_json::json!({
                "grid_mapping_name": "oblique_mercator"
            })))
            .await;
        assert!(!report.ok);
        assert!(report.message.contains("oblique_mercator"));
    }
}
