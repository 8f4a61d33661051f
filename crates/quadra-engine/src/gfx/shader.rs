use anyhow::{anyhow, Result};

use crate::coords::Mat4;

/// Uniform names shared by the batch programs.
///
/// A program that does not declare one of these simply ignores writes to it.
pub mod uniforms {
    /// `mat4x4<f32>`: orthographic view-projection.
    pub const VIEW_PROJ: &str = "u_view_proj";
    /// `array<vec4<i32>, 8>`: texture slot → texture unit map.
    pub const TEXTURES: &str = "u_textures";
    /// `vec4<f32>`: color multiplier of the flat-color program.
    pub const TINT: &str = "u_tint";
}

/// Uniform value kinds. Every uniform starts on a 16-byte boundary.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UniformKind {
    /// `mat4x4<f32>`, 64 bytes.
    Mat4,
    /// `vec4<f32>`, 16 bytes.
    Vec4,
    /// `i32` padded to 16 bytes.
    Int,
    /// `n` tightly packed `i32`s, declared in WGSL as `array<vec4<i32>, ceil(n / 4)>`.
    IntArray(usize),
}

impl UniformKind {
    fn size(self) -> usize {
        match self {
            UniformKind::Mat4 => 64,
            UniformKind::Vec4 | UniformKind::Int => 16,
            UniformKind::IntArray(n) => n.div_ceil(4).max(1) * 16,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct UniformDecl {
    pub name: &'static str,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub const fn new(name: &'static str, kind: UniformKind) -> Self {
        Self { name, kind }
    }
}

#[derive(Debug, Copy, Clone)]
struct UniformSlot {
    name: &'static str,
    kind: UniformKind,
    offset: usize,
}

/// CPU-side copy of a program's uniform buffer, addressed by uniform name.
///
/// Setters return `false` when the name is unknown or declared with another
/// kind; the block is left untouched in that case.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    slots: Vec<UniformSlot>,
    data: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(decls: &[UniformDecl]) -> Self {
        let mut offset = 0;
        let slots = decls
            .iter()
            .map(|d| {
                let slot = UniformSlot {
                    name: d.name,
                    kind: d.kind,
                    offset,
                };
                offset += d.kind.size();
                slot
            })
            .collect();

        Self {
            slots,
            data: vec![0; offset.max(16)],
            dirty: true,
        }
    }

    fn slot(&self, name: &str, kind: UniformKind) -> Option<UniformSlot> {
        let slot = self.slots.iter().find(|s| s.name == name).copied()?;
        let compatible = match (slot.kind, kind) {
            (UniformKind::IntArray(_), UniformKind::IntArray(_)) => true,
            (a, b) => a == b,
        };
        if compatible {
            Some(slot)
        } else {
            log::debug!("uniform {name:?} is {:?}, not {kind:?}", slot.kind);
            None
        }
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        let dst = &mut self.data[offset..offset + bytes.len()];
        if dst != bytes {
            dst.copy_from_slice(bytes);
            self.dirty = true;
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    /// Byte offset of `name` inside the block.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.slots.iter().find(|s| s.name == name).map(|s| s.offset)
    }

    pub fn set_matrix4(&mut self, name: &str, m: &Mat4) -> bool {
        let Some(slot) = self.slot(name, UniformKind::Mat4) else { return false };
        self.write(slot.offset, m.as_bytes());
        true
    }

    pub fn set_vec4(&mut self, name: &str, v: [f32; 4]) -> bool {
        let Some(slot) = self.slot(name, UniformKind::Vec4) else { return false };
        self.write(slot.offset, bytemuck::cast_slice(&v));
        true
    }

    pub fn set_int(&mut self, name: &str, v: i32) -> bool {
        let Some(slot) = self.slot(name, UniformKind::Int) else { return false };
        self.write(slot.offset, bytemuck::bytes_of(&v));
        true
    }

    /// Writes `values` from the start of the array; extra values are dropped.
    pub fn set_int_array(&mut self, name: &str, values: &[i32]) -> bool {
        let Some(slot) = self.slot(name, UniformKind::IntArray(0)) else { return false };
        let UniformKind::IntArray(len) = slot.kind else { return false };
        let n = values.len().min(len);
        self.write(slot.offset, bytemuck::cast_slice(&values[..n]));
        true
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns whether the block changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

/// Everything needed to build a [`ShaderProgram`].
#[derive(Debug, Clone)]
pub struct ShaderDesc<'a> {
    pub label: &'a str,
    /// WGSL with a `vs_main` entry point.
    pub vertex_source: &'a str,
    /// WGSL with an `fs_main` entry point.
    pub fragment_source: &'a str,
    /// Layout of the group 0 / binding 0 uniform buffer.
    pub uniforms: &'a [UniformDecl],
    /// Textures bound in group 1 (sampler at binding 0, textures at 1..=n).
    /// Zero means the program samples nothing and has no group 1.
    pub texture_slots: u32,
}

/// A compiled vertex + fragment program with its pipeline and uniforms.
pub struct ShaderProgram {
    label: String,
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBlock,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_layout: Option<wgpu::BindGroupLayout>,
    texture_slots: u32,
}

impl ShaderProgram {
    /// Compiles both stages and builds the render pipeline.
    ///
    /// Stages are validated before wgpu sees them; a broken stage returns an
    /// error with the compiler diagnostic instead of poisoning later draws.
    pub fn new(
        device: &wgpu::Device,
        desc: &ShaderDesc<'_>,
        vertex_layout: wgpu::VertexBufferLayout<'_>,
        target_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        validate_wgsl(desc.label, "vertex", desc.vertex_source)?;
        validate_wgsl(desc.label, "fragment", desc.fragment_source)?;

        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} vs", desc.label)),
            source: wgpu::ShaderSource::Wgsl(desc.vertex_source.into()),
        });
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} fs", desc.label)),
            source: wgpu::ShaderSource::Wgsl(desc.fragment_source.into()),
        });

        let uniforms = UniformBlock::new(desc.uniforms);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} uniforms", desc.label)),
            size: uniforms.size(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} uniform bgl", desc.label)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(uniforms.size()),
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} uniform bind group", desc.label)),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_layout = (desc.texture_slots > 0)
            .then(|| texture_bind_group_layout(device, desc.label, desc.texture_slots));

        let mut group_layouts = vec![&uniform_layout];
        if let Some(layout) = texture_layout.as_ref() {
            group_layouts.push(layout);
        }

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} pipeline layout", desc.label)),
            bind_group_layouts: &group_layouts,
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} pipeline", desc.label)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!(
            "shader program {:?} built ({} uniform bytes, {} texture slots)",
            desc.label,
            uniforms.size(),
            desc.texture_slots
        );

        Ok(Self {
            label: desc.label.to_string(),
            pipeline,
            uniforms,
            uniform_buffer,
            uniform_bind_group,
            texture_layout,
            texture_slots: desc.texture_slots,
        })
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The pipeline to set on a pass when this program is current.
    #[inline]
    pub fn bind(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    #[inline]
    pub fn uniform_bind_group(&self) -> &wgpu::BindGroup {
        &self.uniform_bind_group
    }

    #[inline]
    pub fn texture_layout(&self) -> Option<&wgpu::BindGroupLayout> {
        self.texture_layout.as_ref()
    }

    #[inline]
    pub fn texture_slots(&self) -> u32 {
        self.texture_slots
    }

    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains(name)
    }

    pub fn set_matrix4(&mut self, name: &str, m: &Mat4) {
        if !self.uniforms.set_matrix4(name, m) {
            log::trace!("{}: no mat4 uniform {name:?}", self.label);
        }
    }

    pub fn set_vec4(&mut self, name: &str, v: [f32; 4]) {
        if !self.uniforms.set_vec4(name, v) {
            log::trace!("{}: no vec4 uniform {name:?}", self.label);
        }
    }

    pub fn set_texture_unit(&mut self, name: &str, unit: i32) {
        if !self.uniforms.set_int(name, unit) {
            log::trace!("{}: no int uniform {name:?}", self.label);
        }
    }

    /// Maps sampler array entries `0..count` to texture units `0..count`.
    pub fn set_sampler_array(&mut self, name: &str, count: usize) {
        let units: Vec<i32> = (0..count as i32).collect();
        if !self.uniforms.set_int_array(name, &units) {
            log::trace!("{}: no sampler array uniform {name:?}", self.label);
        }
    }

    /// Pushes changed uniforms to the GPU. Must precede the submit that reads them.
    pub fn upload_uniforms(&mut self, queue: &wgpu::Queue) {
        if self.uniforms.take_dirty() {
            queue.write_buffer(&self.uniform_buffer, 0, self.uniforms.bytes());
        }
    }
}

fn texture_bind_group_layout(device: &wgpu::Device, label: &str, slots: u32) -> wgpu::BindGroupLayout {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }];
    entries.extend((1..=slots).map(|binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }));

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label} texture bgl")),
        entries: &entries,
    })
}

/// Parses and validates one WGSL stage.
pub(crate) fn validate_wgsl(label: &str, stage: &str, source: &str) -> Result<()> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| {
        anyhow!("{label}: {stage} stage failed to compile:\n{}", e.emit_to_string(source))
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow!("{label}: {stage} stage failed validation:\n{}", e.emit_to_string(source)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_block() -> UniformBlock {
        UniformBlock::new(&[
            UniformDecl::new(uniforms::VIEW_PROJ, UniformKind::Mat4),
            UniformDecl::new(uniforms::TEXTURES, UniformKind::IntArray(32)),
        ])
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn offsets_follow_declaration_order() {
        let block = UniformBlock::new(&[
            UniformDecl::new("a", UniformKind::Mat4),
            UniformDecl::new("b", UniformKind::Vec4),
            UniformDecl::new("c", UniformKind::Int),
            UniformDecl::new("d", UniformKind::IntArray(5)),
        ]);
        assert_eq!(block.offset_of("a"), Some(0));
        assert_eq!(block.offset_of("b"), Some(64));
        assert_eq!(block.offset_of("c"), Some(80));
        assert_eq!(block.offset_of("d"), Some(96));
        assert_eq!(block.size(), 96 + 32);
    }

    #[test]
    fn batch_block_matches_wgsl_struct_size() {
        // mat4x4<f32> + array<vec4<i32>, 8>
        assert_eq!(batch_block().size(), 64 + 128);
    }

    // ── setters ───────────────────────────────────────────────────────────

    #[test]
    fn missing_uniform_is_a_no_op() {
        let mut block = batch_block();
        block.take_dirty();
        let before = block.bytes().to_vec();

        assert!(!block.set_vec4(uniforms::TINT, [1.0; 4]));
        assert!(!block.set_int("nope", 3));

        assert_eq!(block.bytes(), &before[..]);
        assert!(!block.take_dirty());
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut block = batch_block();
        assert!(!block.set_vec4(uniforms::VIEW_PROJ, [1.0; 4]));
    }

    #[test]
    fn matrix_lands_at_its_offset() {
        let mut block = batch_block();
        let m = Mat4::translation(1.0, 2.0, 3.0);
        assert!(block.set_matrix4(uniforms::VIEW_PROJ, &m));
        assert_eq!(&block.bytes()[0..64], m.as_bytes());
    }

    #[test]
    fn int_array_is_tightly_packed_and_truncated() {
        let mut block = UniformBlock::new(&[UniformDecl::new("arr", UniformKind::IntArray(4))]);
        let values: Vec<i32> = (10..20).collect();
        assert!(block.set_int_array("arr", &values));
        let expected: Vec<u8> = [10i32, 11, 12, 13].iter().flat_map(|v| v.to_ne_bytes()).collect();
        assert_eq!(block.bytes(), &expected[..]);
    }

    #[test]
    fn identical_writes_do_not_dirty() {
        let mut block = batch_block();
        block.take_dirty();
        assert!(block.set_matrix4(uniforms::VIEW_PROJ, &Mat4::orthographic(0.0, 2.0, 0.0, 2.0, -1.0, 1.0)));
        assert!(block.take_dirty());
        assert!(block.set_matrix4(uniforms::VIEW_PROJ, &Mat4::orthographic(0.0, 2.0, 0.0, 2.0, -1.0, 1.0)));
        assert!(!block.take_dirty());
    }

    // ── validation ────────────────────────────────────────────────────────

    #[test]
    fn broken_stage_reports_stage_and_label() {
        let err = validate_wgsl("test", "fragment", "fn fs_main( -> {").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("test"));
        assert!(msg.contains("fragment"));
    }

    #[test]
    fn type_error_fails_validation() {
        let src = "@fragment fn fs_main() -> @location(0) vec4<f32> { return 1.0; }";
        assert!(validate_wgsl("test", "fragment", src).is_err());
    }
}
