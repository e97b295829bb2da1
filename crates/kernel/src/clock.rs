/// Frame clock fed with monotonic timestamps in seconds.
///
/// Camera movement uses the raw delta; the kinematics go through
/// [`OrbitalClock`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    last_frame: f32,
    delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to `now` and return the time since the previous frame.
    ///
    /// A timestamp earlier than the previous one yields a zero delta and
    /// leaves the clock where it was.
    pub fn tick(&mut self, now: f32) -> f32 {
        if now < self.last_frame {
            tracing::trace!(now, last = self.last_frame, "non-monotonic timestamp ignored");
            self.delta = 0.0;
            return 0.0;
        }
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.delta
    }

    /// Time between the two most recent ticks.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Timestamp of the most recent tick.
    pub fn elapsed(&self) -> f32 {
        self.last_frame
    }

    /// Frames per second implied by the last delta.
    pub fn fps(&self) -> f32 {
        if self.delta > 0.0 { 1.0 / self.delta } else { 0.0 }
    }
}

/// Orbital time, advanced by frame deltas multiplied by a time scale.
///
/// Only the kinematics read this; camera movement keeps the raw frame delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitalClock {
    time: f32,
    scale: f32,
}

impl Default for OrbitalClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl OrbitalClock {
    pub fn new(scale: f32) -> Self {
        Self { time: 0.0, scale }
    }

    /// Advance by a real frame delta and return the new orbital time.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.time += dt * self.scale;
        self.time
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_difference_of_ticks() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(0.5), 0.5);
        assert_eq!(clock.tick(0.75), 0.25);
        assert_eq!(clock.delta(), 0.25);
        assert_eq!(clock.elapsed(), 0.75);
        assert_eq!(clock.fps(), 4.0);
    }

    #[test]
    fn elapsed_never_goes_backwards() {
        let mut clock = FrameClock::new();
        clock.tick(2.0);
        assert_eq!(clock.tick(1.0), 0.0);
        assert_eq!(clock.elapsed(), 2.0);
        assert_eq!(clock.tick(2.5), 0.5);
    }

    #[test]
    fn fresh_clock_reports_zero_fps() {
        assert_eq!(FrameClock::new().fps(), 0.0);
    }

    #[test]
    fn orbital_clock_scales_deltas() {
        let mut frames = FrameClock::new();
        let mut orbital = OrbitalClock::new(2.0);
        for now in [0.25, 0.5, 1.0, 1.5] {
            orbital.advance(frames.tick(now));
        }
        assert_eq!(orbital.time(), 2.0 * frames.elapsed());
        assert_eq!(frames.delta(), 0.5);
    }

    #[test]
    fn zero_scale_freezes_orbits() {
        let mut orbital = OrbitalClock::new(0.0);
        orbital.advance(3.0);
        assert_eq!(orbital.time(), 0.0);
        assert_eq!(OrbitalClock::default().scale(), 1.0);
    }
}
