use crate::coords::{quadratic_bezier, Vec2};

/// Drives a point along a quadratic Bézier curve over a fixed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct BezierPath {
    pub start: Vec2,
    pub control: Vec2,
    pub end: Vec2,
    duration: f32,
    t: f32,
}

impl BezierPath {
    /// `duration` is in seconds; non-positive durations finish on the first advance.
    pub fn new(start: Vec2, control: Vec2, end: Vec2, duration: f32) -> Self {
        Self {
            start,
            control,
            end,
            duration,
            t: 0.0,
        }
    }

    /// Curve parameter in `[0, 1]`.
    #[inline]
    pub fn t(&self) -> f32 {
        self.t
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.t >= 1.0
    }

    #[inline]
    pub fn point(&self) -> Vec2 {
        quadratic_bezier(self.start, self.control, self.end, self.t)
    }

    /// Moves `dt` seconds along the curve. Returns the new point and whether
    /// the end was reached.
    pub fn advance(&mut self, dt: f32) -> (Vec2, bool) {
        let step = if self.duration > 0.0 { dt.max(0.0) / self.duration } else { 1.0 };
        self.t = (self.t + step).min(1.0);
        (self.point(), self.is_finished())
    }

    pub fn restart(&mut self) {
        self.t = 0.0;
    }

    /// Swaps `start` and `end` and restarts, for ping-pong motion.
    pub fn reverse(&mut self) {
        std::mem::swap(&mut self.start, &mut self.end);
        self.restart();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> BezierPath {
        BezierPath::new(
            Vec2::new(100.0, 100.0),
            Vec2::new(150.0, 200.0),
            Vec2::new(300.0, 200.0),
            1.0,
        )
    }

    #[test]
    fn advance_follows_curve_and_finishes() {
        let mut p = path();
        let (mid, done) = p.advance(0.5);
        assert!(!done);
        assert_eq!(mid, Vec2::new(175.0, 175.0));

        let (end, done) = p.advance(10.0);
        assert!(done);
        assert_eq!(end, p.end);
        assert_eq!(p.t(), 1.0);
    }

    #[test]
    fn zero_duration_jumps_to_end() {
        let mut p = BezierPath::new(Vec2::zero(), Vec2::zero(), Vec2::splat(4.0), 0.0);
        assert_eq!(p.advance(0.0), (Vec2::splat(4.0), true));
    }

    #[test]
    fn reverse_runs_back_from_the_end() {
        let mut p = path();
        p.advance(1.0);
        p.reverse();
        assert_eq!(p.point(), Vec2::new(300.0, 200.0));
        assert!(!p.is_finished());
    }
}
