use bytemuck::{Pod, Zeroable};

/// 4×4 matrix, column-major (`cols[c][r]`), matching WGSL `mat4x4<f32>`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Mat4 {
    pub cols: [[f32; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Right-handed orthographic projection with a `[0, 1]` depth range.
    ///
    /// `near` maps to depth 0 and `far` to depth 1; x/y map to `[-1, 1]` with
    /// `bottom` at -1 (Y-up).
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let rcp_w = 1.0 / (right - left);
        let rcp_h = 1.0 / (top - bottom);
        let r = 1.0 / (near - far);
        Mat4 {
            cols: [
                [2.0 * rcp_w, 0.0, 0.0, 0.0],
                [0.0, 2.0 * rcp_h, 0.0, 0.0],
                [0.0, 0.0, r, 0.0],
                [-(left + right) * rcp_w, -(top + bottom) * rcp_h, r * near, 1.0],
            ],
        }
    }

    #[inline]
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Mat4::IDENTITY;
        m.cols[3] = [x, y, z, 1.0];
        m
    }

    /// Transforms a point (w = 1) and performs the perspective divide.
    pub fn transform_point(&self, p: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = self.cols[0][row] * p[0]
                + self.cols[1][row] * p[1]
                + self.cols[2][row] * p[2]
                + self.cols[3][row];
        }
        let w = if out[3] == 0.0 { 1.0 } else { out[3] };
        [out[0] / w, out[1] / w, out[2] / w]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn ortho_maps_viewport_corners_to_clip_corners() {
        let m = Mat4::orthographic(0.0, 800.0, 0.0, 600.0, -100.0, 100.0);
        assert!(approx(m.transform_point([0.0, 0.0, 0.0]), [-1.0, -1.0, 0.5]));
        assert!(approx(m.transform_point([800.0, 600.0, 0.0]), [1.0, 1.0, 0.5]));
        assert!(approx(m.transform_point([400.0, 300.0, 0.0]), [0.0, 0.0, 0.5]));
    }

    #[test]
    fn ortho_depth_range_is_zero_to_one() {
        let m = Mat4::orthographic(0.0, 1.0, 0.0, 1.0, -100.0, 100.0);
        assert!(approx(m.transform_point([0.0, 0.0, 100.0]), [-1.0, -1.0, 0.0]));
        assert!(approx(m.transform_point([0.0, 0.0, -100.0]), [-1.0, -1.0, 1.0]));
    }

    #[test]
    fn translation_moves_points() {
        let m = Mat4::translation(5.0, -2.0, 1.0);
        assert!(approx(m.transform_point([1.0, 1.0, 1.0]), [6.0, -1.0, 2.0]));
    }

    #[test]
    fn byte_size_matches_wgsl_mat4() {
        assert_eq!(Mat4::IDENTITY.as_bytes().len(), 64);
    }
}
