use foundation::math::Vec3;

pub const WHITE: u32 = 0xffffff;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    /// Parallel light shining from `direction` towards the origin.
    Directional {
        color: u32,
        intensity: f64,
        direction: Vec3,
    },
    Ambient {
        color: u32,
        intensity: f64,
    },
}

/// Two opposing key lights plus a soft ambient fill.
pub fn default_light_rig() -> Vec<Light> {
    vec![
        Light::Directional {
            color: WHITE,
            intensity: 1.0,
            direction: Vec3::new(0.0, -70.0, 100.0).normalize(),
        },
        Light::Directional {
            color: WHITE,
            intensity: 1.0,
            direction: Vec3::new(0.0, 70.0, 100.0).normalize(),
        },
        Light::Ambient {
            color: WHITE,
            intensity: 0.5,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::{Light, default_light_rig};

    #[test]
    fn rig_has_unit_directions_and_ambient_fill() {
        let rig = default_light_rig();
        assert_eq!(rig.len(), 3);
        for light in &rig {
            if let Light::Directional { direction, .. } = light {
                assert!((direction.length() - 1.0).abs() < 1e-12);
            }
        }
        assert!(
            rig.iter()
                .any(|l| matches!(l, Light::Ambient { intensity, .. } if *intensity == 0.5))
        );
    }
}
