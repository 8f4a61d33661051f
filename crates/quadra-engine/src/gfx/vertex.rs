use bytemuck::{Pod, Zeroable};

use crate::coords::Rect;
use crate::paint::Color;

/// Per-quad index pattern: two triangles over corners
/// bottom-left (0), bottom-right (1), top-right (2), top-left (3).
pub const QUAD_INDEX_TEMPLATE: [u16; 6] = [3, 0, 1, 3, 1, 2];

/// Largest batch a 16-bit index buffer can address (4 vertices per quad).
pub const MAX_QUADS_PER_BATCH: usize = (u16::MAX as usize + 1) / 4;

/// UVs matching the corner order of [`Rect::corners`].
const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

/// Interleaved batch vertex (40 bytes).
///
///  offset  0  position  [f32; 3]  loc 0
///  offset 12  uv        [f32; 2]  loc 1
///  offset 20  tex_slot  f32       loc 2
///  offset 24  color     [f32; 4]  loc 3
///
/// Every batch shader variant reads this exact layout.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
    pub tex_slot: f32,
    pub color: [f32; 4],
}

impl Vertex {
    /// Floats per vertex.
    pub const FLOATS: usize = 10;

    /// Bytes per vertex.
    pub const STRIDE: u64 = std::mem::size_of::<Vertex>() as u64;

    /// `(shader_location, component_count, byte_offset)` for each attribute.
    pub const ATTRIBUTES: [(u32, u32, u64); 4] = [(0, 3, 0), (1, 2, 12), (2, 1, 20), (3, 4, 24)];

    /// Expands a quad into its four corners, bottom-left first, counter-clockwise.
    pub fn quad(rect: Rect, color: Color, tex_slot: u32) -> [Vertex; 4] {
        let corners = rect.corners();
        let color = color.to_array();
        let tex_slot = tex_slot as f32;
        std::array::from_fn(|i| Vertex {
            position: [corners[i].x, corners[i].y, 0.0],
            uv: QUAD_UVS[i],
            tex_slot,
            color,
        })
    }
}

/// Builds the static index buffer contents for `max_quads` quads.
pub fn build_quad_indices(max_quads: usize) -> Vec<u16> {
    debug_assert!(max_quads <= MAX_QUADS_PER_BATCH);
    (0..max_quads)
        .flat_map(|quad| {
            let base = (quad * 4) as u16;
            QUAD_INDEX_TEMPLATE.map(|i| base + i)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn layout_matches_wire_contract() {
        assert_eq!(Vertex::STRIDE, 40);
        assert_eq!(Vertex::FLOATS * 4, Vertex::STRIDE as usize);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, uv), 12);
        assert_eq!(offset_of!(Vertex, tex_slot), 20);
        assert_eq!(offset_of!(Vertex, color), 24);
        for (_, _, offset) in Vertex::ATTRIBUTES {
            assert_eq!(offset % 4, 0);
        }
    }

    #[test]
    fn flattened_vertex_matches_float_order() {
        let v = Vertex::quad(Rect::new(1.0, 2.0, 3.0, 4.0), Color::new(0.1, 0.2, 0.3, 0.4), 7)[0];
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats, &[1.0, 2.0, 0.0, 0.0, 0.0, 7.0, 0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn quad_positions_and_uvs() {
        let verts = Vertex::quad(Rect::new(10.0, 20.0, 30.0, 40.0), Color::WHITE, 0);
        let pos: Vec<[f32; 2]> = verts.iter().map(|v| [v.position[0], v.position[1]]).collect();
        let uvs: Vec<[f32; 2]> = verts.iter().map(|v| v.uv).collect();
        assert_eq!(pos, vec![[10.0, 20.0], [40.0, 20.0], [40.0, 60.0], [10.0, 60.0]]);
        assert_eq!(uvs, vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert!(verts.iter().all(|v| v.position[2] == 0.0));
    }

    #[test]
    fn index_template_offsets_by_four_per_quad() {
        let idx = build_quad_indices(3);
        assert_eq!(idx.len(), 18);
        assert_eq!(&idx[0..6], &[3, 0, 1, 3, 1, 2]);
        assert_eq!(&idx[6..12], &[7, 4, 5, 7, 5, 6]);
        assert_eq!(&idx[12..18], &[11, 8, 9, 11, 9, 10]);
    }

    #[test]
    fn largest_batch_fits_u16_indices() {
        let idx = build_quad_indices(MAX_QUADS_PER_BATCH);
        assert_eq!(idx.iter().copied().max(), Some(u16::MAX));
    }
}
