use super::Vec2;

/// Point on the quadratic Bézier curve `p0 → p2` pulled toward `p1`.
///
/// `(1-t)² p0 + 2(1-t)t p1 + t² p2`; `t` is not clamped.
#[inline]
pub fn quadratic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + p1 * (2.0 * u * t) + p2 * (t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_midpoint() {
        let (a, c, b) = (Vec2::new(100.0, 100.0), Vec2::new(150.0, 200.0), Vec2::new(300.0, 200.0));
        assert_eq!(quadratic_bezier(a, c, b, 0.0), a);
        assert_eq!(quadratic_bezier(a, c, b, 1.0), b);
        // 0.25 a + 0.5 c + 0.25 b
        assert_eq!(quadratic_bezier(a, c, b, 0.5), Vec2::new(175.0, 175.0));
    }
}
