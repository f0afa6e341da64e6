//! Polar stereographic projection.
//!
//! The workhorse projection of Nordic radar composites. Spherical formulas
//! (Snyder, Map Projections — A Working Manual, ch. 21) are used; the
//! validator compares two parameter-extraction routes against each other, so
//! both sides share the same forward model.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Polar stereographic projection parameters.
#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// Central meridian (straight vertical longitude from pole), radians.
    pub lon0: f64,
    /// Latitude of true scale, radians.
    pub lat_ts: f64,
    /// True for the north-polar aspect, false for south.
    pub north: bool,
    /// False easting, meters.
    pub false_easting: f64,
    /// False northing, meters.
    pub false_northing: f64,
    /// Earth radius, meters.
    pub earth_radius: f64,
}

impl PolarStereographic {
    /// Build from degree-valued parameters.
    pub fn new(
        lon0_deg: f64,
        lat_ts_deg: f64,
        north: bool,
        false_easting: f64,
        false_northing: f64,
        earth_radius: f64,
    ) -> Self {
        Self {
            lon0: lon0_deg.to_radians(),
            lat_ts: lat_ts_deg.to_radians(),
            north,
            false_easting,
            false_northing,
            earth_radius,
        }
    }

    /// Scale factor at the pole implied by the true-scale parallel.
    fn k0(&self) -> f64 {
        let lat_ts = if self.north { self.lat_ts } else { -self.lat_ts };
        (1.0 + lat_ts.sin()) / 2.0
    }

    /// Projected meters to geographic degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = y - self.false_northing;
        let rho = dx.hypot(dy);
        let two_ak0 = 2.0 * self.earth_radius * self.k0();

        if self.north {
            let lat = FRAC_PI_2 - 2.0 * (rho / two_ak0).atan();
            let lon = self.lon0 + dx.atan2(-dy);
            (normalize_deg(lon.to_degrees()), lat.to_degrees())
        } else {
            let lat = -(FRAC_PI_2 - 2.0 * (rho / two_ak0).atan());
            let lon = self.lon0 + dx.atan2(dy);
            (normalize_deg(lon.to_degrees()), lat.to_degrees())
        }
    }

    /// Geographic degrees to projected meters.
    pub fn from_lonlat(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lon = lon_deg.to_radians();
        let lat = lat_deg.to_radians();
        let two_ak0 = 2.0 * self.earth_radius * self.k0();
        let dlon = lon - self.lon0;

        if self.north {
            let rho = two_ak0 * (FRAC_PI_4 - lat / 2.0).tan();
            (
                self.false_easting + rho * dlon.sin(),
                self.false_northing - rho * dlon.cos(),
            )
        } else {
            let rho = two_ak0 * (FRAC_PI_4 + lat / 2.0).tan();
            (
                self.false_easting + rho * dlon.sin(),
                self.false_northing + rho * dlon.cos(),
            )
        }
    }
}

/// Wrap a longitude into [-180, 180].
pub(crate) fn normalize_deg(mut lon: f64) -> f64 {
    while lon > 180.0 {
        lon -= 360.0;
    }
    while lon < -180.0 {
        lon += 360.0;
    }
    lon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dmi() -> PolarStereographic {
        PolarStereographic::new(10.5666, 56.0, true, 0.0, 0.0, 6371229.0)
    }

    #[test]
    fn test_pole_maps_to_origin() {
        let proj = dmi();
        let (x, y) = proj.from_lonlat(10.5666, 90.0);
        assert!(x.abs() < 1e-6 && y.abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip() {
        let proj = dmi();
        for (lon, lat) in [(8.0, 55.0), (12.5, 57.3), (-3.0, 62.0)] {
            let (x, y) = proj.from_lonlat(lon, lat);
            let (lon2, lat2) = proj.to_lonlat(x, y);
            assert!((lon - lon2).abs() < 1e-9, "lon {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-9, "lat {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_south_aspect_roundtrip() {
        let proj = PolarStereographic::new(0.0, 71.0, false, 0.0, 0.0, 6371229.0);
        let (x, y) = proj.from_lonlat(45.0, -75.0);
        let (lon, lat) = proj.to_lonlat(x, y);
        assert!((lon - 45.0).abs() < 1e-9);
        assert!((lat + 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_true_scale_parallel_distance() {
        // At the true-scale parallel the radial distance equals
        // 2 a k0 tan(pi/4 - lat/2).
        let proj = dmi();
        let (x, y) = proj.from_lonlat(10.5666, 56.0);
        let rho = x.hypot(y);
        let expected = 2.0 * 6371229.0 * proj.k0()
            * (std::f64::consts::FRAC_PI_4 - 56f64.to_radians() / 2.0).tan();
        assert!((rho - expected).abs() < 1e-6);
    }
}
