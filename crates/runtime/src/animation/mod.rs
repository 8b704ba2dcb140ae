//! Scripted model motion.
//!
//! Animations are a closed set of variants. Each variant produces fresh state
//! with [`AnimationKind::init`] and advances it one host frame at a time with
//! [`AnimationState::update`]. Adding an animation means adding a variant to
//! both enums.

pub mod drift;
pub mod driver;

pub use drift::*;
pub use driver::*;

use foundation::geo::{GeographicAnchor, Placement};
use foundation::math::Projection;

/// Produces the placement for the next frame.
///
/// This is the capability a model layer consumes on every draw tick.
pub trait PlacementUpdate {
    fn update(
        &mut self,
        anchor: &GeographicAnchor,
        placement: &Placement,
        projection: &dyn Projection,
    ) -> Placement;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    /// Circular path around the anchor with an oscillating drift heading.
    OrbitingDrift,
}

impl AnimationKind {
    pub const ALL: [AnimationKind; 1] = [AnimationKind::OrbitingDrift];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Registry key.
    pub fn name(self) -> &'static str {
        match self {
            AnimationKind::OrbitingDrift => "broomBroom",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AnimationKind::OrbitingDrift => "Broom Broom",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            AnimationKind::OrbitingDrift => "\u{1F3CE}\u{FE0F}",
        }
    }

    /// Whether starting this animation needs a freshly mounted layer.
    pub fn requires_remount(self) -> bool {
        match self {
            AnimationKind::OrbitingDrift => true,
        }
    }

    /// Heading-only animations never write `rotate_x`, `rotate_z` or `scale`.
    pub fn is_heading_only(self) -> bool {
        match self {
            AnimationKind::OrbitingDrift => true,
        }
    }

    /// Fresh state with all time and history fields reset.
    pub fn init(self) -> AnimationState {
        match self {
            AnimationKind::OrbitingDrift => AnimationState::OrbitingDrift(DriftState::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationState {
    OrbitingDrift(DriftState),
}

impl AnimationState {
    pub fn kind(&self) -> AnimationKind {
        match self {
            AnimationState::OrbitingDrift(_) => AnimationKind::OrbitingDrift,
        }
    }

    pub fn update(
        &mut self,
        anchor: &GeographicAnchor,
        placement: &Placement,
        projection: &dyn Projection,
    ) -> Placement {
        match self {
            AnimationState::OrbitingDrift(state) => state.update(anchor, placement, projection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimationKind, AnimationState};

    #[test]
    fn lookup_by_registry_name() {
        assert_eq!(
            AnimationKind::from_name("broomBroom"),
            Some(AnimationKind::OrbitingDrift)
        );
        assert_eq!(AnimationKind::from_name("spin"), None);
    }

    #[test]
    fn metadata_matches_registry() {
        for kind in AnimationKind::ALL {
            assert_eq!(AnimationKind::from_name(kind.name()), Some(kind));
            assert!(!kind.display_name().is_empty());
            assert_eq!(kind.init().kind(), kind);
        }
        assert!(AnimationKind::OrbitingDrift.requires_remount());
    }

    #[test]
    fn init_produces_fresh_state() {
        let AnimationState::OrbitingDrift(state) = AnimationKind::OrbitingDrift.init();
        assert_eq!(state.time(), 0.0);
        assert!(state.previous().is_none());
    }
}
