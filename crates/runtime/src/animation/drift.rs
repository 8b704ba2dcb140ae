use std::f64::consts::PI;

use foundation::geo::{GeographicAnchor, Placement};
use foundation::math::Projection;

/// Angle advanced per frame (radians of the orbit).
pub const DRIFT_SPEED: f64 = 0.015;
/// Orbit radius in degrees of longitude/latitude.
pub const DRIFT_RADIUS_DEG: f64 = 0.0002;
/// Peak heading offset between facing and travel direction (radians).
pub const DRIFT_AMPLITUDE_RAD: f64 = 0.4;
/// The asset is authored facing backwards along its forward axis.
pub const MODEL_FACING_OFFSET_RAD: f64 = PI;

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// State of the orbiting-drift animation.
///
/// The model circles its anchor while its heading swings around the direction
/// of travel, which reads as a car sliding through a controlled drift.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftState {
    time: f64,
    speed: f64,
    drift_radius: f64,
    previous: Option<LngLat>,
    velocity: LngLat,
    heading: f64,
}

impl Default for DriftState {
    fn default() -> Self {
        Self::new()
    }
}

impl DriftState {
    pub fn new() -> Self {
        Self::with_params(DRIFT_SPEED, DRIFT_RADIUS_DEG)
    }

    pub fn with_params(speed: f64, drift_radius: f64) -> Self {
        Self {
            time: 0.0,
            speed,
            drift_radius,
            previous: None,
            velocity: LngLat::default(),
            heading: 0.0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn drift_radius(&self) -> f64 {
        self.drift_radius
    }

    pub fn previous(&self) -> Option<LngLat> {
        self.previous
    }

    pub fn velocity(&self) -> LngLat {
        self.velocity
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Point on the orbit for the given angle.
    pub fn orbit_point(&self, anchor: &GeographicAnchor, angle: f64) -> LngLat {
        LngLat::new(
            anchor.lng() + angle.cos() * self.drift_radius,
            anchor.lat() + angle.sin() * self.drift_radius,
        )
    }

    /// Advance one frame. Writes translation and `rotate_y` only.
    pub fn update(
        &mut self,
        anchor: &GeographicAnchor,
        placement: &Placement,
        projection: &dyn Projection,
    ) -> Placement {
        self.time += self.speed;
        let point = self.orbit_point(anchor, self.time);

        // No previous point on the first frame: velocity stays zero.
        if let Some(prev) = self.previous {
            self.velocity = LngLat::new(point.lng - prev.lng, point.lat - prev.lat);
        }

        let movement_heading = self.velocity.lat.atan2(self.velocity.lng);
        let drift_offset = (self.time * 2.0).sin() * DRIFT_AMPLITUDE_RAD;
        self.heading = movement_heading + drift_offset;

        let projected = projection.project(point.lng, point.lat, 0.0);
        self.previous = Some(point);

        placement.with_translation_and_heading(
            projected.position,
            self.heading + MODEL_FACING_OFFSET_RAD,
        )
    }
}
