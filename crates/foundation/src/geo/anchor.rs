use std::fmt;

use crate::math::MERCATOR_MAX_LAT_DEG;

/// Senate Square, Helsinki.
pub const DEFAULT_ANCHOR_LNG_LAT: [f64; 2] = [24.9441, 60.1710];

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum AnchorField {
    Longitude,
    Latitude,
    Altitude,
}

impl fmt::Display for AnchorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorField::Longitude => write!(f, "longitude"),
            AnchorField::Latitude => write!(f, "latitude"),
            AnchorField::Altitude => write!(f, "altitude"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InvalidAnchorError {
    NotFinite { field: AnchorField },
    LongitudeOutOfRange { lng_deg: f64 },
    LatitudeOutOfRange { lat_deg: f64 },
    /// The projection produced NaN/inf for an otherwise valid anchor.
    Unprojectable,
}

impl fmt::Display for InvalidAnchorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidAnchorError::NotFinite { field } => write!(f, "{field} must be a finite number"),
            InvalidAnchorError::LongitudeOutOfRange { lng_deg } => {
                write!(f, "longitude {lng_deg} outside [-180, 180]")
            }
            InvalidAnchorError::LatitudeOutOfRange { lat_deg } => write!(
                f,
                "latitude {lat_deg} outside [-{MERCATOR_MAX_LAT_DEG}, {MERCATOR_MAX_LAT_DEG}]"
            ),
            InvalidAnchorError::Unprojectable => {
                write!(f, "anchor cannot be projected into map space")
            }
        }
    }
}

impl std::error::Error for InvalidAnchorError {}

/// Fixed real-world point a model is pinned to.
///
/// Validated on construction and immutable afterwards.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeographicAnchor {
    lng_deg: f64,
    lat_deg: f64,
    altitude_m: f64,
}

impl GeographicAnchor {
    pub fn new(lng_deg: f64, lat_deg: f64, altitude_m: f64) -> Result<Self, InvalidAnchorError> {
        let checks = [
            (lng_deg, AnchorField::Longitude),
            (lat_deg, AnchorField::Latitude),
            (altitude_m, AnchorField::Altitude),
        ];
        for (value, field) in checks {
            if !value.is_finite() {
                return Err(InvalidAnchorError::NotFinite { field });
            }
        }
        if !(-180.0..=180.0).contains(&lng_deg) {
            return Err(InvalidAnchorError::LongitudeOutOfRange { lng_deg });
        }
        if !(-MERCATOR_MAX_LAT_DEG..=MERCATOR_MAX_LAT_DEG).contains(&lat_deg) {
            return Err(InvalidAnchorError::LatitudeOutOfRange { lat_deg });
        }
        Ok(Self {
            lng_deg,
            lat_deg,
            altitude_m,
        })
    }

    pub fn default_anchor() -> Self {
        Self {
            lng_deg: DEFAULT_ANCHOR_LNG_LAT[0],
            lat_deg: DEFAULT_ANCHOR_LNG_LAT[1],
            altitude_m: 0.0,
        }
    }

    pub fn lng(&self) -> f64 {
        self.lng_deg
    }

    pub fn lat(&self) -> f64 {
        self.lat_deg
    }

    pub fn altitude_m(&self) -> f64 {
        self.altitude_m
    }
}
