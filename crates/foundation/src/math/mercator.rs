//! Geographic → map-local conversion.
//!
//! Map engines in the Mapbox/MapLibre family render in a normalized Web
//! Mercator square: `(0, 0)` is the north-west corner of the world, `(1, 1)`
//! the south-east corner, and altitude is expressed in the same units.

use std::f64::consts::PI;

use super::Vec3;

/// Mean Earth radius used by the Mapbox/MapLibre projection (meters).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;
/// Equatorial circumference for [`EARTH_RADIUS_M`].
pub const EARTH_CIRCUMFERENCE_M: f64 = 2.0 * PI * EARTH_RADIUS_M;
/// Latitude limit of the Web Mercator square (degrees).
pub const MERCATOR_MAX_LAT_DEG: f64 = 85.051_128_78;

/// A point converted into the host's local planar space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectedPoint {
    pub position: Vec3,
    /// Local units per meter at this point.
    pub units_per_meter: f64,
}

/// Geographic coordinate + altitude → local x, y, z and scale.
///
/// The map engine owns this conversion; the viewer only consumes it.
pub trait Projection {
    fn project(&self, lng_deg: f64, lat_deg: f64, altitude_m: f64) -> ProjectedPoint;
}

/// Web Mercator as implemented by `MercatorCoordinate.fromLngLat`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct WebMercator;

impl WebMercator {
    pub fn x_from_lng(lng_deg: f64) -> f64 {
        (180.0 + lng_deg) / 360.0
    }

    pub fn y_from_lat(lat_deg: f64) -> f64 {
        (180.0 - (180.0 / PI) * (PI / 4.0 + lat_deg * PI / 360.0).tan().ln()) / 360.0
    }

    pub fn lat_from_y(y: f64) -> f64 {
        let y2 = 180.0 - y * 360.0;
        (360.0 / PI) * (y2 * PI / 180.0).exp().atan() - 90.0
    }

    pub fn lng_from_x(x: f64) -> f64 {
        x * 360.0 - 180.0
    }

    pub fn circumference_at_latitude(lat_deg: f64) -> f64 {
        EARTH_CIRCUMFERENCE_M * lat_deg.to_radians().cos()
    }

    pub fn z_from_altitude(altitude_m: f64, lat_deg: f64) -> f64 {
        altitude_m / Self::circumference_at_latitude(lat_deg)
    }
}

impl Projection for WebMercator {
    fn project(&self, lng_deg: f64, lat_deg: f64, altitude_m: f64) -> ProjectedPoint {
        ProjectedPoint {
            position: Vec3::new(
                Self::x_from_lng(lng_deg),
                Self::y_from_lat(lat_deg),
                Self::z_from_altitude(altitude_m, lat_deg),
            ),
            units_per_meter: 1.0 / Self::circumference_at_latitude(lat_deg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EARTH_CIRCUMFERENCE_M, Projection, WebMercator};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn null_island_is_centre_of_square() {
        let p = WebMercator.project(0.0, 0.0, 0.0);
        assert_close(p.position.x, 0.5, 1e-15);
        assert_close(p.position.y, 0.5, 1e-15);
        assert_eq!(p.position.z, 0.0);
        assert_close(p.units_per_meter, 1.0 / EARTH_CIRCUMFERENCE_M, 1e-24);
    }

    #[test]
    fn north_is_towards_smaller_y() {
        let south = WebMercator.project(24.9441, 60.0, 0.0);
        let north = WebMercator.project(24.9441, 61.0, 0.0);
        assert!(north.position.y < south.position.y);
    }

    #[test]
    fn latitude_round_trips_through_y() {
        for lat in [-80.0, -33.5, 0.0, 60.171, 85.0] {
            let y = WebMercator::y_from_lat(lat);
            assert_close(WebMercator::lat_from_y(y), lat, 1e-9);
        }
        assert_close(WebMercator::lng_from_x(WebMercator::x_from_lng(24.9441)), 24.9441, 1e-12);
    }

    #[test]
    fn scale_grows_with_latitude() {
        let equator = WebMercator.project(0.0, 0.0, 0.0).units_per_meter;
        let helsinki = WebMercator.project(24.9441, 60.171, 0.0).units_per_meter;
        assert_close(helsinki / equator, 1.0 / 60.171f64.to_radians().cos(), 1e-9);
    }

    #[test]
    fn altitude_uses_local_scale() {
        let p = WebMercator.project(10.0, 45.0, 100.0);
        assert_close(p.position.z, 100.0 * p.units_per_meter, 1e-18);
    }
}
