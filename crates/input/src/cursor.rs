use glam::Vec2;

/// Turns absolute cursor positions into look deltas.
///
/// The first sample only anchors the baseline; without that the first
/// delta would be measured from an arbitrary origin and snap the camera.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CursorTracker {
    last: Option<Vec2>,
}

impl CursorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cursor sample in screen pixels and return `(dx, dy)`.
    ///
    /// `dy` is positive when the cursor moves up the screen, matching a
    /// pitch-up look.
    pub fn delta(&mut self, x: f32, y: f32) -> Vec2 {
        let current = Vec2::new(x, y);
        let Some(last) = self.last.replace(current) else {
            tracing::trace!(x, y, "cursor baseline anchored");
            return Vec2::ZERO;
        };
        Vec2::new(current.x - last.x, last.y - current.y)
    }

    /// Forget the baseline, so the next sample anchors again.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn is_anchored(&self) -> bool {
        self.last.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_yields_zero() {
        let mut tracker = CursorTracker::new();
        assert_eq!(tracker.delta(812.0, 377.0), Vec2::ZERO);
        assert!(tracker.is_anchored());
    }

    #[test]
    fn y_axis_is_inverted() {
        let mut tracker = CursorTracker::new();
        tracker.delta(100.0, 100.0);
        assert_eq!(tracker.delta(110.0, 90.0), Vec2::new(10.0, 10.0));
        assert_eq!(tracker.delta(105.0, 95.0), Vec2::new(-5.0, -5.0));
    }

    #[test]
    fn reset_rearms_the_guard() {
        let mut tracker = CursorTracker::new();
        tracker.delta(0.0, 0.0);
        tracker.reset();
        assert_eq!(tracker.delta(500.0, 500.0), Vec2::ZERO);
        assert_eq!(tracker.delta(501.0, 500.0), Vec2::new(1.0, 0.0));
    }
}
