//! Projection construction from WKT strings and CF grid-mapping attributes.

use serde_json::Value;

use crate::error::{GeorefError, Result};
use crate::lambert::LambertConformal;
use crate::stereographic::PolarStereographic;
use crate::wkt::WktNode;

/// Earth radius used when the CRS does not carry one (meters).
const DEFAULT_EARTH_RADIUS: f64 = 6371229.0;

/// A CRS reduced to the transform the validator needs.
#[derive(Debug, Clone)]
pub enum Projection {
    PolarStereographic(PolarStereographic),
    LambertConformal(LambertConformal),
    /// Plain geographic grid: projected coordinates are already degrees.
    Geographic,
}

impl Projection {
    /// Build a projection from a WKT1 string.
    pub fn from_wkt(wkt: &str) -> Result<Self> {
        let root = WktNode::parse(wkt)?;

        if root.keyword.eq_ignore_ascii_case("GEOGCS")
            || root.keyword.eq_ignore_ascii_case("GEOGCRS")
        {
            return Ok(Projection::Geographic);
        }
        if !root.keyword.eq_ignore_ascii_case("PROJCS")
            && !root.keyword.eq_ignore_ascii_case("PROJCRS")
        {
            return Err(GeorefError::UnsupportedProjection(format!(
                "root keyword '{}'",
                root.keyword
            )));
        }

        let method = root
            .find("PROJECTION")
            .and_then(|n| n.name())
            .ok_or_else(|| GeorefError::Wkt("PROJCS without PROJECTION".into()))?
            .to_string();

        let earth_radius = root
            .find("SPHEROID")
            .or_else(|| root.find("ELLIPSOID"))
            .and_then(|n| n.number(0))
            .unwrap_or(DEFAULT_EARTH_RADIUS);

        let param = |names: &[&str]| -> Option<f64> {
            names.iter().find_map(|name| root.parameter(name))
        };
        let fe = param(&["false_easting"]).unwrap_or(0.0);
        let fn_ = param(&["false_northing"]).unwrap_or(0.0);

        let lower = method.to_lowercase();
        if lower.contains("stereographic") {
            let lat_origin = param(&["latitude_of_origin", "standard_parallel_1"])
                .ok_or_else(|| GeorefError::MissingParameter("latitude_of_origin".into()))?;
            let lon0 = param(&["central_meridian", "longitude_of_origin"])
                .ok_or_else(|| GeorefError::MissingParameter("central_meridian".into()))?;
            let north = !lower.contains("south") && lat_origin >= 0.0;
            Ok(Projection::PolarStereographic(PolarStereographic::new(
                lon0,
                lat_origin.abs(),
                north,
                fe,
                fn_,
                earth_radius,
            )))
        } else if lower.contains("lambert_conformal") {
            let lon0 = param(&["central_meridian", "longitude_of_origin"])
                .ok_or_else(|| GeorefError::MissingParameter("central_meridian".into()))?;
            let lat0 = param(&["latitude_of_origin"])
                .ok_or_else(|| GeorefError::MissingParameter("latitude_of_origin".into()))?;
            let latin1 = param(&["standard_parallel_1"]).unwrap_or(lat0);
            let latin2 = param(&["standard_parallel_2"]).unwrap_or(latin1);
            Ok(Projection::LambertConformal(LambertConformal::new(
                lon0,
                lat0,
                latin1,
                latin2,
                fe,
                fn_,
                earth_radius,
            )))
        } else {
            Err(GeorefError::UnsupportedProjection(method))
        }
    }

    /// Build a projection from CF grid-mapping attributes.
    pub fn from_cf_attrs(attrs: &serde_json::Map<String, Value>) -> Result<Self> {
        let num = |key: &str| attrs.get(key).and_then(Value::as_f64);
        let earth_radius = num("earth_radius")
            .or_else(|| num("semi_major_axis"))
            .unwrap_or(DEFAULT_EARTH_RADIUS);
        let fe = num("false_easting").unwrap_or(0.0);
        let fn_ = num("false_northing").unwrap_or(0.0);

        let name = attrs
            .get("grid_mapping_name")
            .and_then(Value::as_str)
            .ok_or_else(|| GeorefError::MissingParameter("grid_mapping_name".into()))?;

        match name {
            "polar_stereographic" => {
                let lon0 = num("straight_vertical_longitude_from_pole")
                    .or_else(|| num("longitude_of_projection_origin"))
                    .ok_or_else(|| {
                        GeorefError::MissingParameter(
                            "straight_vertical_longitude_from_pole".into(),
                        )
                    })?;
                let lat_origin = num("latitude_of_projection_origin").unwrap_or(90.0);
                let lat_ts = num("standard_parallel")
                    .or_else(|| first_parallel(attrs))
                    .ok_or_else(|| GeorefError::MissingParameter("standard_parallel".into()))?;
                Ok(Projection::PolarStereographic(PolarStereographic::new(
                    lon0,
                    lat_ts.abs(),
                    lat_origin >= 0.0,
                    fe,
                    fn_,
                    earth_radius,
                )))
            }
            "lambert_conformal_conic" => {
                let lon0 = num("longitude_of_central_meridian")
                    .ok_or_else(|| {
                        GeorefError::MissingParameter("longitude_of_central_meridian".into())
                    })?;
                let lat0 = num("latitude_of_projection_origin")
                    .ok_or_else(|| {
                        GeorefError::MissingParameter("latitude_of_projection_origin".into())
                    })?;
                let (latin1, latin2) = parallels(attrs, lat0)?;
                Ok(Projection::LambertConformal(LambertConformal::new(
                    lon0,
                    lat0,
                    latin1,
                    latin2,
                    fe,
                    fn_,
                    earth_radius,
                )))
            }
            "latitude_longitude" => Ok(Projection::Geographic),
            other => Err(GeorefError::UnsupportedProjection(other.to_string())),
        }
    }

    /// Transform projected grid coordinates to geographic degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lon, lat) = match self {
            Projection::PolarStereographic(proj) => proj.to_lonlat(x, y),
            Projection::LambertConformal(proj) => proj.to_lonlat(x, y),
            Projection::Geographic => (x, y),
        };
        if !lon.is_finite() || !lat.is_finite() {
            return Err(GeorefError::Transform(format!(
                "non-finite result for ({}, {})",
                x, y
            )));
        }
        Ok((lon, lat))
    }
}

/// CF allows `standard_parallel` to be a 1- or 2-element list.
fn first_parallel(attrs: &serde_json::Map<String, Value>) -> Option<f64> {
    attrs
        .get("standard_parallel")
        .and_then(Value::as_array)
        .and_then(|list| list.first())
        .and_then(Value::as_f64)
}

fn parallels(attrs: &serde_json::Map<String, Value>, default: f64) -> Result<(f64, f64)> {
    match attrs.get("standard_parallel") {
        Some(Value::Number(n)) => {
            let p = n.as_f64().unwrap_or(default);
            Ok((p, p))
        }
        Some(Value::Array(list)) => {
            let p1 = list.first().and_then(Value::as_f64).unwrap_or(default);
            let p2 = list.get(1).and_then(Value::as_f64).unwrap_or(p1);
            Ok((p1, p2))
        }
        _ => Ok((default, default)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEREO_WKT: &str = concat!(
        "PROJCS[\"DMI stereographic\",",
        "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",",
        "SPHEROID[\"sphere\",6371229,0]],",
        "PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]],",
        "PROJECTION[\"Polar_Stereographic\"],",
        "PARAMETER[\"latitude_of_origin\",56],",
        "PARAMETER[\"central_meridian\",10.5666],",
        "PARAMETER[\"false_easting\",0],",
        "PARAMETER[\"false_northing\",0],",
        "UNIT[\"metre\",1]]"
    );

    fn cf_attrs() -> serde_json::Map<String, Value> {
        serde_json::json!({
            "grid_mapping_name": "polar_stereographic",
            "straight_vertical_longitude_from_pole": 10.5666,
            "latitude_of_projection_origin": 90.0,
            "standard_parallel": 56.0,
            "earth_radius": 6371229.0
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn test_wkt_and_cf_routes_agree() {
        let from_wkt = Projection::from_wkt(STEREO_WKT).unwrap();
        let from_cf = Projection::from_cf_attrs(&cf_attrs()).unwrap();

        let (lon_a, lat_a) = from_wkt.to_lonlat(-200_000.0, -3_800_000.0).unwrap();
        let (lon_b, lat_b) = from_cf.to_lonlat(-200_000.0, -3_800_000.0).unwrap();
        assert!((lon_a - lon_b).abs() < 1e-9);
        assert!((lat_a - lat_b).abs() < 1e-9);
    }

    #[test]
    fn test_geographic_passthrough() {
        let proj = Projection::from_wkt(
            "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]]]",
        )
        .unwrap();
        let (lon, lat) = proj.to_lonlat(10.0, 55.0).unwrap();
        assert_eq!((lon, lat), (10.0, 55.0));
    }

    #[test]
    fn test_unknown_projection_rejected() {
        let wkt = "PROJCS[\"m\",PROJECTION[\"Cassini_Soldner\"],PARAMETER[\"central_meridian\",0]]";
        assert!(matches!(
            Projection::from_wkt(wkt),
            Err(GeorefError::UnsupportedProjection(_))
        ));
    }

    #[test]
    fn test_cf_lambert_with_two_parallels() {
        let attrs = serde_json::json!({
            "grid_mapping_name": "lambert_conformal_conic",
            "longitude_of_central_meridian": 10.0,
            "latitude_of_projection_origin": 48.0,
            "standard_parallel": [46.0, 50.0]
        })
        .as_object()
        .unwrap()
        .clone();
        let proj = Projection::from_cf_attrs(&attrs).unwrap();
        let (lon, lat) = proj.to_lonlat(0.0, 0.0).unwrap();
        assert!((lon - 10.0).abs() < 1e-9);
        assert!((lat - 48.0).abs() < 1e-6);
    }
}
