/// Host-driven frame counter.
///
/// There is no fixed timestep: a frame is one draw callback from the map
/// engine, so the index is the only timebase the viewer owns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
}

impl Frame {
    pub fn new(index: u64) -> Self {
        Self { index }
    }

    pub fn next(self) -> Self {
        Self::new(self.index.wrapping_add(1))
    }
}

/// Counts draw ticks delivered by the host.
#[derive(Debug, Default)]
pub struct FrameClock {
    current: Frame,
    ticks: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Frame {
        self.current
    }

    /// Number of ticks seen since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance to the next frame and return it.
    pub fn tick(&mut self) -> Frame {
        if self.ticks > 0 {
            self.current = self.current.next();
        }
        self.ticks += 1;
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, FrameClock};

    #[test]
    fn next_advances_index() {
        assert_eq!(Frame::new(4).next(), Frame::new(5));
    }

    #[test]
    fn clock_starts_at_frame_zero() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(), Frame::new(0));
        assert_eq!(clock.tick(), Frame::new(1));
        assert_eq!(clock.ticks(), 2);
        assert_eq!(clock.current().index, 1);
    }
}
