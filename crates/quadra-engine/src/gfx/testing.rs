//! Recording backend for renderer tests.

use crate::coords::{Mat4, Viewport};
use crate::paint::Color;

use super::backend::RenderBackend;
use super::renderer::ShaderKind;
use super::texture::TextureId;
use super::vertex::Vertex;
use super::MAX_TEXTURE_SLOTS;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Clear(Color),
    BindProgram(ShaderKind),
    SetMatrix4(String, Mat4),
    SetVec4(String, [f32; 4]),
    SetSamplerArray(String, usize),
    BindTexture(u32, TextureId),
    UploadIndices(Vec<u16>),
    UploadVertices(Vec<Vertex>),
    DrawIndexed(u32),
}

/// Logs every call; no GPU involved.
#[derive(Debug)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub viewport: Viewport,
    pub slot_limit: usize,
    blank: TextureId,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_slot_limit(MAX_TEXTURE_SLOTS)
    }

    pub fn with_slot_limit(slot_limit: usize) -> Self {
        Self {
            calls: Vec::new(),
            viewport: Viewport::new(800.0, 600.0),
            slot_limit,
            blank: TextureId::allocate(),
        }
    }

    pub fn draws(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::DrawIndexed(n) => Some(*n),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Texture binds grouped per draw call, in unit order as issued.
    pub fn binds_per_draw(&self) -> Vec<Vec<(u32, TextureId)>> {
        let mut out = Vec::new();
        let mut current = Vec::new();
        for call in &self.calls {
            match call {
                Call::BindTexture(unit, id) => current.push((*unit, *id)),
                Call::DrawIndexed(_) => out.push(std::mem::take(&mut current)),
                _ => {}
            }
        }
        out
    }

    /// Vertex uploads, one per draw.
    pub fn vertex_uploads(&self) -> Vec<&[Vertex]> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::UploadVertices(v) => Some(v.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.calls.clear();
    }
}

impl RenderBackend for RecordingBackend {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn texture_slot_limit(&self) -> usize {
        self.slot_limit
    }

    fn blank_texture(&self) -> TextureId {
        self.blank
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(Call::Clear(color));
    }

    fn bind_program(&mut self, kind: ShaderKind) {
        self.calls.push(Call::BindProgram(kind));
    }

    fn set_matrix4(&mut self, name: &str, m: &Mat4) {
        self.calls.push(Call::SetMatrix4(name.to_string(), *m));
    }

    fn set_vec4(&mut self, name: &str, v: [f32; 4]) {
        self.calls.push(Call::SetVec4(name.to_string(), v));
    }

    fn set_sampler_array(&mut self, name: &str, count: usize) {
        self.calls.push(Call::SetSamplerArray(name.to_string(), count));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(Call::BindTexture(unit, texture));
    }

    fn upload_indices(&mut self, indices: &[u16]) {
        self.calls.push(Call::UploadIndices(indices.to_vec()));
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        self.calls.push(Call::UploadVertices(vertices.to_vec()));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.calls.push(Call::DrawIndexed(index_count));
    }
}
