use super::Mat4;

/// Near plane of the batch projection.
pub const PROJECTION_NEAR: f32 = -100.0;
/// Far plane of the batch projection.
pub const PROJECTION_FAR: f32 = 100.0;

/// Viewport size in surface pixels.
///
/// Queried from the host surface at every flush; the renderer rebuilds its
/// projection from it so resizes take effect on the next draw.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    /// `ortho(0, width, 0, height, -100, 100)`: Y-up, origin bottom-left.
    ///
    /// Degenerate sizes are clamped to one pixel so the matrix stays finite.
    pub fn projection(self) -> Mat4 {
        Mat4::orthographic(
            0.0,
            self.width.max(1.0),
            0.0,
            self.height.max(1.0),
            PROJECTION_NEAR,
            PROJECTION_FAR,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_viewport_projection_is_finite() {
        let m = Viewport::new(0.0, 0.0).projection();
        assert!(m.cols.iter().flatten().all(|v| v.is_finite()));
        assert!(!Viewport::new(0.0, 10.0).is_valid());
    }
}
