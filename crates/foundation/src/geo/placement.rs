use std::f64::consts::FRAC_PI_2;

use crate::geo::{GeographicAnchor, InvalidAnchorError};
use crate::math::{Projection, Vec3};

/// Static rotation that stands a Y-up asset upright on the map plane.
pub const DEFAULT_MODEL_ROTATION: [f64; 3] = [FRAC_PI_2, 0.0, 0.0];

/// Position, orientation and scale of a model in the map's local space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Placement {
    pub translate_x: f64,
    pub translate_y: f64,
    pub translate_z: f64,
    pub rotate_x: f64,
    pub rotate_y: f64,
    pub rotate_z: f64,
    pub scale: f64,
}

impl Placement {
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.translate_x, self.translate_y, self.translate_z)
    }

    /// Copy with a new translation and heading; tilt and scale are kept.
    pub fn with_translation_and_heading(&self, translation: Vec3, rotate_y: f64) -> Self {
        Self {
            translate_x: translation.x,
            translate_y: translation.y,
            translate_z: translation.z,
            rotate_y,
            ..*self
        }
    }
}

/// Derive the initial placement of a model pinned at `anchor`.
///
/// Pure: identical inputs always produce a bit-identical placement.
pub fn build_initial_placement(
    anchor: &GeographicAnchor,
    rotation: [f64; 3],
    projection: &dyn Projection,
) -> Result<Placement, InvalidAnchorError> {
    let projected = projection.project(anchor.lng(), anchor.lat(), anchor.altitude_m());
    if !projected.position.is_finite()
        || !projected.units_per_meter.is_finite()
        || projected.units_per_meter <= 0.0
    {
        return Err(InvalidAnchorError::Unprojectable);
    }

    Ok(Placement {
        translate_x: projected.position.x,
        translate_y: projected.position.y,
        translate_z: projected.position.z,
        rotate_x: rotation[0],
        rotate_y: rotation[1],
        rotate_z: rotation[2],
        scale: projected.units_per_meter,
    })
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_MODEL_ROTATION, Placement, build_initial_placement};
    use crate::geo::{GeographicAnchor, InvalidAnchorError};
    use crate::math::{ProjectedPoint, Projection, Vec3, WebMercator};

    struct Broken;

    impl Projection for Broken {
        fn project(&self, _lng: f64, _lat: f64, _alt: f64) -> ProjectedPoint {
            ProjectedPoint {
                position: Vec3::new(f64::NAN, 0.0, 0.0),
                units_per_meter: 1.0,
            }
        }
    }

    #[test]
    fn initial_placement_uses_projection_and_rotation() {
        let anchor = GeographicAnchor::default_anchor();
        let placement = build_initial_placement(&anchor, DEFAULT_MODEL_ROTATION, &WebMercator)
            .expect("placement");
        let projected = WebMercator.project(anchor.lng(), anchor.lat(), anchor.altitude_m());

        assert_eq!(placement.translation(), projected.position);
        assert_eq!(placement.scale, projected.units_per_meter);
        assert_eq!(
            [placement.rotate_x, placement.rotate_y, placement.rotate_z],
            DEFAULT_MODEL_ROTATION
        );
    }

    #[test]
    fn initial_placement_is_deterministic() {
        let anchor = GeographicAnchor::new(-73.9857, 40.7484, 12.5).expect("anchor");
        let rotation = [0.1, -2.0, 3.0];
        let a = build_initial_placement(&anchor, rotation, &WebMercator).expect("a");
        let b = build_initial_placement(&anchor, rotation, &WebMercator).expect("b");
        assert_eq!(a.translate_x.to_bits(), b.translate_x.to_bits());
        assert_eq!(a.translate_y.to_bits(), b.translate_y.to_bits());
        assert_eq!(a.translate_z.to_bits(), b.translate_z.to_bits());
        assert_eq!(a.scale.to_bits(), b.scale.to_bits());
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unprojectable_output() {
        let anchor = GeographicAnchor::default_anchor();
        let err = build_initial_placement(&anchor, DEFAULT_MODEL_ROTATION, &Broken)
            .expect_err("nan projection");
        assert_eq!(err, InvalidAnchorError::Unprojectable);
    }

    #[test]
    fn translation_update_keeps_tilt_and_scale() {
        let p = Placement {
            translate_x: 0.1,
            translate_y: 0.2,
            translate_z: 0.0,
            rotate_x: 1.0,
            rotate_y: 0.0,
            rotate_z: -1.0,
            scale: 3.0,
        };
        let q = p.with_translation_and_heading(Vec3::new(0.5, 0.6, 0.7), 2.0);
        assert_eq!(q.translation(), Vec3::new(0.5, 0.6, 0.7));
        assert_eq!((q.rotate_x, q.rotate_y, q.rotate_z, q.scale), (1.0, 2.0, -1.0, 3.0));
    }
}
