//! Lambert Conformal Conic projection.
//!
//! Used by several central-European radar composites. Spherical formulas;
//! supports tangent (one standard parallel) and secant (two) cones.

use std::f64::consts::{FRAC_PI_4, PI};

use crate::stereographic::normalize_deg;

/// Lambert Conformal Conic projection parameters.
#[derive(Debug, Clone)]
pub struct LambertConformal {
    /// Central meridian, radians.
    pub lon0: f64,
    /// Latitude of projection origin, radians.
    pub lat0: f64,
    /// First standard parallel, radians.
    pub latin1: f64,
    /// Second standard parallel, radians.
    pub latin2: f64,
    /// False easting, meters.
    pub false_easting: f64,
    /// False northing, meters.
    pub false_northing: f64,
    /// Earth radius, meters.
    pub earth_radius: f64,
    /// Cone constant.
    n: f64,
    /// F constant.
    f: f64,
    /// Rho at the projection origin.
    rho0: f64,
}

impl LambertConformal {
    /// Build from degree-valued parameters.
    pub fn new(
        lon0_deg: f64,
        lat0_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        false_easting: f64,
        false_northing: f64,
        earth_radius: f64,
    ) -> Self {
        let lon0 = lon0_deg.to_radians();
        let lat0 = lat0_deg.to_radians();
        let latin1 = latin1_deg.to_radians();
        let latin2 = latin2_deg.to_radians();

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((FRAC_PI_4 + latin2 / 2.0).tan() / (FRAC_PI_4 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };
        let f = (latin1.cos() * (FRAC_PI_4 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (FRAC_PI_4 + lat0 / 2.0).tan().powf(n);

        Self {
            lon0,
            lat0,
            latin1,
            latin2,
            false_easting,
            false_northing,
            earth_radius,
            n,
            f,
            rho0,
        }
    }

    /// Projected meters to geographic degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> (f64, f64) {
        let dx = x - self.false_easting;
        let dy = self.rho0 - (y - self.false_northing);

        let rho = {
            let r = dx.hypot(dy);
            if self.n < 0.0 {
                -r
            } else {
                r
            }
        };
        let theta = dx.atan2(dy);

        let lat = 2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0;
        let lon = self.lon0 + theta / self.n;
        (normalize_deg(lon.to_degrees()), lat.to_degrees())
    }

    /// Geographic degrees to projected meters.
    pub fn from_lonlat(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let rho = self.earth_radius * self.f / (FRAC_PI_4 + lat / 2.0).tan().powf(self.n);
        let theta = self.n * dlon;
        (
            self.false_easting + rho * theta.sin(),
            self.false_northing + self.rho0 - rho * theta.cos(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secant() -> LambertConformal {
        LambertConformal::new(10.0, 48.0, 46.0, 50.0, 0.0, 0.0, 6371229.0)
    }

    #[test]
    fn test_origin_maps_to_false_offsets() {
        let proj = LambertConformal::new(10.0, 48.0, 46.0, 50.0, 2000.0, 3000.0, 6371229.0);
        let (x, y) = proj.from_lonlat(10.0, 48.0);
        assert!((x - 2000.0).abs() < 1e-6);
        assert!((y - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn test_roundtrip_secant() {
        let proj = secant();
        for (lon, lat) in [(6.0, 47.5), (15.0, 54.0), (10.0, 48.0)] {
            let (x, y) = proj.from_lonlat(lon, lat);
            let (lon2, lat2) = proj.to_lonlat(x, y);
            assert!((lon - lon2).abs() < 1e-9, "lon {} vs {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-9, "lat {} vs {}", lat, lat2);
        }
    }

    #[test]
    fn test_roundtrip_tangent() {
        let proj = LambertConformal::new(-97.5, 38.5, 38.5, 38.5, 0.0, 0.0, 6371229.0);
        let (x, y) = proj.from_lonlat(-94.5, 39.0);
        let (lon, lat) = proj.to_lonlat(x, y);
        assert!((lon + 94.5).abs() < 1e-9);
        assert!((lat - 39.0).abs() < 1e-9);
    }
}
