use foundation::geo::{GeographicAnchor, Placement};
use foundation::math::Projection;

use super::{AnimationKind, AnimationState, PlacementUpdate};

/// Owns the single live animation and advances it once per host redraw.
///
/// The driver never schedules itself; the map engine's draw callback is the
/// only thing that moves it forward.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    active: Option<AnimationState>,
    ticks: u64,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `kind` from fresh state, discarding whatever was running.
    pub fn start(&mut self, kind: AnimationKind) {
        self.active = Some(kind.init());
        self.ticks = 0;
    }

    /// Discard the live state. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        self.ticks = 0;
        self.active.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn kind(&self) -> Option<AnimationKind> {
        self.active.as_ref().map(AnimationState::kind)
    }

    pub fn state(&self) -> Option<&AnimationState> {
        self.active.as_ref()
    }

    /// Frames advanced since the current animation started.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl PlacementUpdate for AnimationDriver {
    fn update(
        &mut self,
        anchor: &GeographicAnchor,
        placement: &Placement,
        projection: &dyn Projection,
    ) -> Placement {
        match self.active.as_mut() {
            Some(state) => {
                self.ticks += 1;
                state.update(anchor, placement, projection)
            }
            None => *placement,
        }
    }
}
