use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::coords::{Mat4, Viewport};
use crate::paint::Color;

use super::backend::RenderBackend;
use super::buffer::{BufferKind, GpuBuffer};
use super::renderer::ShaderKind;
use super::shader::{uniforms, ShaderDesc, ShaderProgram, UniformDecl, UniformKind};
use super::texture::{Texture, TextureId, TextureUnits};
use super::vertex::Vertex;
use super::MAX_TEXTURE_SLOTS;

const BATCH_VS: &str = include_str!("shaders/batch.vert.wgsl");
const BATCH_FS: &str = include_str!("shaders/batch.frag.wgsl");
const FLAT_VS: &str = include_str!("shaders/flat.vert.wgsl");
const FLAT_FS: &str = include_str!("shaders/flat.frag.wgsl");

const BATCH_UNIFORMS: [UniformDecl; 2] = [
    UniformDecl::new(uniforms::VIEW_PROJ, UniformKind::Mat4),
    UniformDecl::new(uniforms::TEXTURES, UniformKind::IntArray(MAX_TEXTURE_SLOTS)),
];

const FLAT_UNIFORMS: [UniformDecl; 2] = [
    UniformDecl::new(uniforms::VIEW_PROJ, UniformKind::Mat4),
    UniformDecl::new(uniforms::TINT, UniformKind::Vec4),
];

/// Where draws land this frame.
struct FrameTarget {
    view: wgpu::TextureView,
    viewport: Viewport,
}

/// [`RenderBackend`] on wgpu.
///
/// Every `clear` and `draw_indexed` records its own render pass and submits it
/// right away, so buffer writes made between two draws are seen by the second
/// draw only.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    batch_program: ShaderProgram,
    flat_program: ShaderProgram,
    current: ShaderKind,

    vbo: GpuBuffer,
    ibo: GpuBuffer,

    textures: HashMap<TextureId, Texture>,
    blank: TextureId,
    sampler: wgpu::Sampler,
    units: TextureUnits,
    texture_slots: usize,

    target: Option<FrameTarget>,
    viewport: Viewport,
}

impl WgpuBackend {
    /// Builds both programs and the shared buffers.
    ///
    /// `texture_slots` is the number of sampled textures the device allows per
    /// stage (see `Gpu::texture_slot_limit`).
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        texture_slots: usize,
    ) -> Result<Self> {
        let texture_slots = texture_slots.clamp(1, MAX_TEXTURE_SLOTS);

        let mut vbo = GpuBuffer::new(device, BufferKind::Vertex, "quadra batch vbo", 64 * Vertex::STRIDE);
        for (slot, components, offset) in Vertex::ATTRIBUTES {
            vbo.describe_attribute(slot, components, Vertex::STRIDE, offset)?;
        }
        let ibo = GpuBuffer::new(device, BufferKind::Index, "quadra batch ibo", 6 * 64 * 2);

        let batch_fs = batch_fragment_source(texture_slots as u32);
        let batch_program = ShaderProgram::new(
            device,
            &ShaderDesc {
                label: "quadra batch",
                vertex_source: BATCH_VS,
                fragment_source: &batch_fs,
                uniforms: &BATCH_UNIFORMS,
                texture_slots: texture_slots as u32,
            },
            vbo.layout(),
            surface_format,
        )
        .context("failed to build the batch program")?;

        let flat_program = ShaderProgram::new(
            device,
            &ShaderDesc {
                label: "quadra flat color",
                vertex_source: FLAT_VS,
                fragment_source: FLAT_FS,
                uniforms: &FLAT_UNIFORMS,
                texture_slots: 0,
            },
            vbo.layout(),
            surface_format,
        )
        .context("failed to build the flat-color program")?;

        let blank = Texture::blank(device, queue)?;
        let blank_id = blank.id();
        let mut textures = HashMap::new();
        textures.insert(blank_id, blank);

        Ok(Self {
            device: device.clone(),
            queue: queue.clone(),
            batch_program,
            flat_program,
            current: ShaderKind::Batch,
            vbo,
            ibo,
            textures,
            blank: blank_id,
            sampler: device.create_sampler(&Texture::sampler_descriptor()),
            units: TextureUnits::new(texture_slots),
            texture_slots,
            target: None,
            viewport: Viewport::default(),
        })
    }

    /// Uploads top-row-first RGBA8 pixels and registers the texture.
    pub fn load_texture_rgba8(&mut self, width: u32, height: u32, pixels: &[u8], label: &str) -> Result<TextureId> {
        let texture = Texture::from_rgba8(&self.device, &self.queue, width, height, pixels, label)?;
        let id = texture.id();
        self.textures.insert(id, texture);
        Ok(id)
    }

    /// Drops a texture. The blank texture cannot be removed.
    pub fn remove_texture(&mut self, id: TextureId) -> bool {
        if id == self.blank {
            return false;
        }
        self.textures.remove(&id).is_some()
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(&id).map(Texture::size)
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Directs subsequent clears and draws at `view`.
    pub fn begin_frame(&mut self, view: wgpu::TextureView, viewport: Viewport) {
        self.viewport = viewport;
        self.target = Some(FrameTarget { view, viewport });
    }

    /// Releases the frame view. Everything recorded so far is already submitted.
    pub fn end_frame(&mut self) {
        self.target = None;
    }

    /// Viewport reported outside a frame.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Records and submits one indexed draw into the current frame target.
    fn record_draw(&mut self, index_count: u32) {
        if index_count == 0 {
            return;
        }
        let Some(target) = self.target.as_ref() else {
            log::warn!("draw outside of a frame; {index_count} indices dropped");
            return;
        };

        let program = match self.current {
            ShaderKind::Batch => &mut self.batch_program,
            ShaderKind::FlatColor => &mut self.flat_program,
        };
        program.upload_uniforms(&self.queue);

        let texture_group = match program.texture_layout() {
            Some(layout) => {
                let Some(group) = texture_bind_group(
                    &self.device,
                    layout,
                    &self.sampler,
                    &self.units,
                    &self.textures,
                    self.blank,
                ) else {
                    log::warn!("blank texture missing; draw skipped");
                    return;
                };
                Some(group)
            }
            None => None,
        };

        let Some(index_format) = self.ibo.index_format() else { return };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quadra batch encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quadra batch pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(program.bind());
            pass.set_bind_group(0, program.uniform_bind_group(), &[]);
            if let Some(group) = texture_group.as_ref() {
                pass.set_bind_group(1, group, &[]);
            }
            pass.set_vertex_buffer(0, self.vbo.slice(self.vbo.len()));
            pass.set_index_buffer(self.ibo.slice(index_count as u64 * 2), index_format);
            pass.draw_indexed(0..index_count, 0, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn program_mut(&mut self) -> &mut ShaderProgram {
        match self.current {
            ShaderKind::Batch => &mut self.batch_program,
            ShaderKind::FlatColor => &mut self.flat_program,
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn viewport(&self) -> Viewport {
        self.target.as_ref().map_or(self.viewport, |t| t.viewport)
    }

    fn texture_slot_limit(&self) -> usize {
        self.texture_slots
    }

    fn blank_texture(&self) -> TextureId {
        self.blank
    }

    fn clear(&mut self, color: Color) {
        let Some(target) = self.target.as_ref() else {
            log::warn!("clear outside of a frame; ignored");
            return;
        };

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quadra clear encoder"),
        });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quadra clear pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn bind_program(&mut self, kind: ShaderKind) {
        self.current = kind;
        log::trace!("program {:?} bound", self.program_mut().label());
    }

    fn set_matrix4(&mut self, name: &str, m: &Mat4) {
        self.program_mut().set_matrix4(name, m);
    }

    fn set_vec4(&mut self, name: &str, v: [f32; 4]) {
        self.program_mut().set_vec4(name, v);
    }

    fn set_sampler_array(&mut self, name: &str, count: usize) {
        self.program_mut().set_sampler_array(name, count);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        bind_unit(&mut self.units, &self.textures, unit, texture, self.blank);
    }

    fn upload_indices(&mut self, indices: &[u16]) {
        self.ibo.upload_indices(&self.device, &self.queue, indices);
    }

    fn upload_vertices(&mut self, vertices: &[Vertex]) {
        self.vbo.upload_vertices(&self.device, &self.queue, vertices);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.record_draw(index_count);
        // Units hold one batch's textures only.
        self.units.clear();
    }
}

/// Binds `texture` to `unit`. A texture that is not loaded (or was removed
/// while still referenced by a batch) binds the blank texture instead.
fn bind_unit(
    units: &mut TextureUnits,
    textures: &HashMap<TextureId, Texture>,
    unit: u32,
    texture: TextureId,
    blank: TextureId,
) {
    units.activate(unit as usize);
    match textures.get(&texture) {
        Some(tex) => tex.bind(units),
        None => {
            log::warn!("bind of unknown texture {texture:?} on unit {unit}; using blank");
            units.bind(blank);
        }
    }
}

/// Group 1 for the batch program: the shared sampler, then one texture per
/// unit with empty units filled by the blank texture.
fn texture_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    units: &TextureUnits,
    textures: &HashMap<TextureId, Texture>,
    blank: TextureId,
) -> Option<wgpu::BindGroup> {
    let blank = textures.get(&blank)?;

    let mut entries = Vec::with_capacity(units.len() + 1);
    entries.push(wgpu::BindGroupEntry {
        binding: 0,
        resource: wgpu::BindingResource::Sampler(sampler),
    });
    for unit in 0..units.len() {
        let texture = units
            .get(unit)
            .and_then(|id| textures.get(&id))
            .unwrap_or(blank);
        entries.push(wgpu::BindGroupEntry {
            binding: unit as u32 + 1,
            resource: wgpu::BindingResource::TextureView(texture.view()),
        });
    }

    Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("quadra batch textures"),
        layout,
        entries: &entries,
    }))
}

/// Expands the batch fragment template for `slots` texture bindings.
fn batch_fragment_source(slots: u32) -> String {
    let bindings: String = (0..slots)
        .map(|i| format!("@group(1) @binding({}) var texture_{i}: texture_2d<f32>;\n", i + 1))
        .collect();
    let cases: String = (0..slots)
        .map(|i| {
            format!(
                "        case {i}: {{\n            texel = textureSampleLevel(texture_{i}, batch_sampler, uv, 0.0);\n        }}\n"
            )
        })
        .collect();

    BATCH_FS
        .replace("//@texture_bindings\n", &bindings)
        .replace("//@texture_cases\n", &cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::shader::{validate_wgsl, UniformBlock};

    // ── program sources ───────────────────────────────────────────────────

    #[test]
    fn batch_template_expands_per_slot() {
        let src = batch_fragment_source(3);
        assert!(!src.contains("//@"));
        assert_eq!(src.matches("texture_2d<f32>").count(), 3);
        assert!(src.contains("@group(1) @binding(3) var texture_2"));
        assert!(src.contains("case 2:"));
        assert!(!src.contains("case 3:"));
    }

    #[test]
    fn batch_program_validates_for_supported_slot_counts() {
        validate_wgsl("batch", "vertex", BATCH_VS).unwrap();
        for slots in [1, 16, MAX_TEXTURE_SLOTS as u32] {
            validate_wgsl("batch", "fragment", &batch_fragment_source(slots)).unwrap();
        }
    }

    #[test]
    fn flat_program_validates() {
        validate_wgsl("flat", "vertex", FLAT_VS).unwrap();
        validate_wgsl("flat", "fragment", FLAT_FS).unwrap();
    }

    // ── texture units ─────────────────────────────────────────────────────

    #[test]
    fn unknown_texture_binds_blank_over_stale_unit() {
        let textures = HashMap::new();
        let blank = TextureId::allocate();
        let stale = TextureId::allocate();
        let removed = TextureId::allocate();

        let mut units = TextureUnits::new(4);
        units.activate(2);
        units.bind(stale);

        bind_unit(&mut units, &textures, 2, removed, blank);
        assert_eq!(units.get(2), Some(blank));
        assert_eq!(units.active(), 2);
    }

    #[test]
    fn cleared_units_fall_back_to_nothing() {
        let mut units = TextureUnits::new(2);
        units.activate(1);
        units.bind(TextureId::allocate());
        units.clear();
        assert_eq!(units.get(1), None);
        assert_eq!(units.active(), 0);
    }

    #[test]
    fn uniform_blocks_match_wgsl_structs() {
        // mat4x4<f32> + array<vec4<i32>, 8>
        assert_eq!(UniformBlock::new(&BATCH_UNIFORMS).size(), 192);
        // mat4x4<f32> + vec4<f32>
        assert_eq!(UniformBlock::new(&FLAT_UNIFORMS).size(), 80);
    }
}
