//! Georeferencing-parse probe.
//!
//! Hands the stored CRS WKT string to the georeferencing parser and, when a
//! corner pixel is available, derives the corner transform from the parsed
//! projection. The transform feeds the cross-tool agreement check.

use async_trait::async_trait;

use georef::Projection;

use crate::probe::{ProbeInput, ProbeReport, ToolProbe};

/// Probe of the WKT-parsing collaborator.
#[derive(Debug, Default)]
pub struct WktParseProbe;

#[async_trait]
impl ToolProbe for WktParseProbe {
    fn tool(&self) -> &'static str {
        "wkt-parse"
    }

    async fn run(&self, input: &ProbeInput) -> ProbeReport {
        let tool = self.tool();
        let wkt = match &input.crs_wkt {
            Some(wkt) if !wkt.trim().is_empty() => wkt,
            _ => return ProbeReport::failure(tool, "archive carries no crs_wkt string"),
        };

        let projection = match Projection::from_wkt(wkt) {
            Ok(projection) => projection,
            Err(err) => {
                return ProbeReport::failure(tool, format!("WKT parse failed: {}", err))
            }
        };

        let report = ProbeReport::success(
            tool,
            format!("parsed WKT into {}", projection_kind(&projection)),
        );
        match input.corner_xy {
            Some((x, y)) => match projection.to_lonlat(x, y) {
                Ok(lonlat) => report.with_transform(lonlat),
                Err(err) => ProbeReport::failure(
                    tool,
                    format!("corner transform through parsed WKT failed: {}", err),
                ),
            },
            None => report,
        }
    }
}

pub(crate) fn projection_kind(projection: &Projection) -> &'static str {
    match projection {
        Projection::PolarStereographic(_) => "polar stereographic projection",
        Projection::LambertConformal(_) => "Lambert conformal projection",
        Projection::Geographic => "geographic coordinate system",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WKT: &str = concat!(
        "PROJCS[\"stere\",GEOGCS[\"sphere\",DATUM[\"sphere\",",
        "SPHEROID[\"sphere\",6371229,0]]],",
        "PROJECTION[\"Polar_Stereographic\"],",
        "PARAMETER[\"latitude_of_origin\",56],",
        "PARAMETER[\"central_meridian\",10.5666],",
        "UNIT[\"metre\",1]]"
    );

    fn input(wkt: Option<&str>) -> ProbeInput {
        ProbeInput {
            location: None,
            data_variable: Some("precip".to_string()),
            crs_wkt: wkt.map(str::to_string),
            grid_mapping_attrs: serde_json::Map::new(),
            corner_xy: Some((-200_000.0, -3_800_000.0)),
        }
    }

    #[tokio::test]
    async fn test_valid_wkt_yields_transform() {
        let report = WktParseProbe.run(&input(Some(WKT))).await;
        assert!(report.ok, "{}", report.message);
        let (lon, lat) = report.transform.unwrap();
        assert!(lon.is_finite() && lat.is_finite());
        assert!(lat > 0.0 && lat < 90.0);
    }

    #[tokio::test]
    async fn test_missing_wkt_fails() {
        let report = WktParseProbe.run(&input(None)).await;
        assert!(!report.ok);
        assert!(report.transform.is_none());
    }

    #[tokio::test]
    async fn test_malformed_wkt_fails() {
        let report = WktParseProbe.run(&input(Some("PROJCS[oops"))).await;
        assert!(!report.ok);
    }
}
