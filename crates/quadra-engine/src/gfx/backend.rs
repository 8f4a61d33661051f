use crate::coords::{Mat4, Viewport};
use crate::paint::Color;

use super::renderer::ShaderKind;
use super::texture::TextureId;
use super::vertex::Vertex;

/// GPU operations the batch renderer needs, in the order it issues them.
///
/// The model is a single current program plus a table of texture units:
/// uniform setters apply to whatever program was bound last, and
/// `draw_indexed` reads the units bound since the previous draw.
pub trait RenderBackend {
    /// Current drawable size. Read at every flush.
    fn viewport(&self) -> Viewport;

    /// Texture units one draw call may read.
    fn texture_slot_limit(&self) -> usize;

    /// 1×1 white texture used for untextured quads.
    fn blank_texture(&self) -> TextureId;

    /// Clears the color target.
    fn clear(&mut self, color: Color);

    fn bind_program(&mut self, kind: ShaderKind);

    /// Silently ignored when the bound program has no such uniform.
    fn set_matrix4(&mut self, name: &str, m: &Mat4);

    /// Silently ignored when the bound program has no such uniform.
    fn set_vec4(&mut self, name: &str, v: [f32; 4]);

    /// Maps sampler array entries `0..count` to texture units `0..count`.
    fn set_sampler_array(&mut self, name: &str, count: usize);

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn upload_indices(&mut self, indices: &[u16]);

    fn upload_vertices(&mut self, vertices: &[Vertex]);

    /// Draws `index_count` indices from the start of the index buffer.
    fn draw_indexed(&mut self, index_count: u32);
}
