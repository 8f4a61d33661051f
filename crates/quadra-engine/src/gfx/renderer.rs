use anyhow::Result;

use crate::coords::{Rect, Vec2};
use crate::paint::Color;

use super::backend::RenderBackend;
use super::batch::BatchState;
use super::shader::uniforms;
use super::texture::TextureId;
use super::vertex::{build_quad_indices, Vertex, MAX_QUADS_PER_BATCH};
use super::MAX_TEXTURE_SLOTS;

/// Built-in program variants.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ShaderKind {
    /// Per-vertex color times the texture in the vertex's slot.
    #[default]
    Batch,
    /// Per-vertex color times `u_tint`. Ignores textures.
    FlatColor,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BatchPhase {
    /// No batch open. `flush` leaves the renderer here.
    Idle,
    /// Accepting submissions.
    Batching,
}

/// One quad submission: position, size, color, texture.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quad {
    /// Bottom-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub color: Color,
    /// `None` samples the blank white texture.
    pub texture: Option<TextureId>,
}

impl Quad {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            color: Color::WHITE,
            texture: None,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.texture = Some(texture);
        self
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }
}

/// Renderer construction parameters.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Quads per draw call. Sizes the scratch buffer and the index buffer.
    pub max_quads: usize,

    /// Texture slots per draw call; further clamped to the backend limit.
    pub texture_slots: usize,

    /// Color used by [`BatchRenderer::prepare`].
    pub clear_color: Color,

    /// Program bound at construction.
    pub shader: ShaderKind,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_quads: 1000,
            texture_slots: MAX_TEXTURE_SLOTS,
            clear_color: Color::rgb(0.1, 0.1, 0.1),
            shader: ShaderKind::Batch,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        validate_max_quads(self.max_quads)?;
        anyhow::ensure!(
            (1..=MAX_TEXTURE_SLOTS).contains(&self.texture_slots),
            "texture_slots must be in 1..={MAX_TEXTURE_SLOTS}, got {}",
            self.texture_slots
        );
        Ok(())
    }
}

fn validate_max_quads(max_quads: usize) -> Result<()> {
    anyhow::ensure!(
        (1..=MAX_QUADS_PER_BATCH).contains(&max_quads),
        "max_quads must be in 1..={MAX_QUADS_PER_BATCH}, got {max_quads}"
    );
    Ok(())
}

/// Counters accumulated since construction or the last [`BatchRenderer::reset_stats`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct RenderStats {
    pub draw_calls: u64,
    pub quads: u64,
    pub indices: u64,
    pub texture_binds: u64,
    pub program_binds: u64,
    /// Flushes forced by a full vertex buffer or a full slot table.
    pub implicit_flushes: u64,
}

/// Accumulates quads and draws them in as few indexed draw calls as the
/// buffer capacity and texture slot limit allow.
///
/// Per frame: [`prepare`](Self::prepare), [`begin_batch`](Self::begin_batch),
/// any number of [`submit`](Self::submit)s, [`end_batch`](Self::end_batch),
/// [`flush`](Self::flush). Quads submitted before an implicit flush are drawn
/// before quads submitted after it.
pub struct BatchRenderer<B: RenderBackend> {
    backend: B,
    config: BatchConfig,
    batch: BatchState,
    phase: BatchPhase,
    active_shader: ShaderKind,
    bound_program: Option<ShaderKind>,
    tint: Color,
    stats: RenderStats,
    logged_implicit_begin: bool,
}

impl<B: RenderBackend> BatchRenderer<B> {
    pub fn new(mut backend: B, config: BatchConfig) -> Result<Self> {
        config.validate()?;

        let backend_limit = backend.texture_slot_limit().max(1);
        let texture_slots = config.texture_slots.min(backend_limit);
        if texture_slots < config.texture_slots {
            log::debug!(
                "texture slots clamped to backend limit: {} -> {texture_slots}",
                config.texture_slots
            );
        }

        backend.upload_indices(&build_quad_indices(config.max_quads));

        let mut renderer = Self {
            backend,
            batch: BatchState::new(config.max_quads, texture_slots),
            phase: BatchPhase::Idle,
            active_shader: config.shader,
            bound_program: None,
            tint: Color::WHITE,
            stats: RenderStats::default(),
            logged_implicit_begin: false,
            config,
        };
        renderer.bind_active_program();

        log::debug!(
            "batch renderer ready: {} quads, {texture_slots} texture slots",
            renderer.config.max_quads
        );
        Ok(renderer)
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    #[inline]
    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    #[inline]
    pub fn batch(&self) -> &BatchState {
        &self.batch
    }

    #[inline]
    pub fn max_quads(&self) -> usize {
        self.batch.max_quads()
    }

    /// Slots per draw call after clamping to the backend.
    #[inline]
    pub fn texture_slots(&self) -> usize {
        self.batch.slots().limit()
    }

    #[inline]
    pub fn active_shader(&self) -> ShaderKind {
        self.active_shader
    }

    #[inline]
    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    #[inline]
    pub fn tint(&self) -> Color {
        self.tint
    }

    /// Tint applied by the flat-color program at the next flush.
    pub fn set_tint(&mut self, tint: Color) {
        self.tint = tint;
    }

    /// Resizes the batch and rebuilds the index buffer. Only valid while idle.
    pub fn set_max_quads(&mut self, max_quads: usize) -> Result<()> {
        anyhow::ensure!(
            self.phase == BatchPhase::Idle,
            "set_max_quads called with a batch open"
        );
        validate_max_quads(max_quads)?;
        if max_quads == self.batch.max_quads() {
            return Ok(());
        }

        self.batch.resize(max_quads);
        self.backend.upload_indices(&build_quad_indices(max_quads));
        self.config.max_quads = max_quads;
        log::debug!("batch capacity set to {max_quads} quads");
        Ok(())
    }

    /// Clears the color target.
    pub fn prepare(&mut self) {
        self.backend.clear(self.config.clear_color);
    }

    /// Switches the active program and binds it.
    ///
    /// Quads already in the batch are drawn with the previous program first.
    pub fn use_shader(&mut self, kind: ShaderKind) {
        if self.active_shader == kind && self.bound_program == Some(kind) {
            return;
        }
        if self.phase == BatchPhase::Batching && !self.batch.is_empty() {
            self.flush();
            self.begin_batch();
        }
        self.active_shader = kind;
        self.bind_active_program();
    }

    fn bind_active_program(&mut self) {
        if self.bound_program == Some(self.active_shader) {
            return;
        }
        self.backend.bind_program(self.active_shader);
        self.bound_program = Some(self.active_shader);
        self.stats.program_binds += 1;
    }

    /// Opens a batch. A no-op while one is already open.
    pub fn begin_batch(&mut self) {
        if self.phase == BatchPhase::Batching {
            log::debug!(
                "begin_batch with a batch open; keeping {} quads",
                self.batch.quad_count()
            );
            return;
        }
        self.batch.reset();
        self.phase = BatchPhase::Batching;
    }

    /// Closes submission for this batch. Buffers are left untouched.
    pub fn end_batch(&mut self) {
        log::trace!("end_batch: {} quads pending", self.batch.quad_count());
    }

    pub fn draw_quad(&mut self, position: Vec2, size: Vec2, color: Color) {
        self.submit_quad(position, size, color, None);
    }

    pub fn draw_textured_quad(&mut self, position: Vec2, size: Vec2, texture: TextureId) {
        self.submit_quad(position, size, Color::WHITE, Some(texture));
    }

    pub fn submit_quad(&mut self, position: Vec2, size: Vec2, color: Color, texture: Option<TextureId>) {
        self.submit(Quad {
            position,
            size,
            color,
            texture,
        });
    }

    /// Appends one quad, flushing first if the buffer or slot table is full.
    pub fn submit(&mut self, quad: Quad) {
        if self.phase == BatchPhase::Idle {
            if !self.logged_implicit_begin {
                log::debug!("quad submitted without begin_batch; opening a batch");
                self.logged_implicit_begin = true;
            }
            self.begin_batch();
        }

        if self.batch.is_full() {
            self.implicit_flush("vertex buffer full");
        }

        let texture = quad.texture.unwrap_or_else(|| self.backend.blank_texture());
        let slot = match self.batch.slots_mut().resolve(texture).slot() {
            Some(slot) => slot,
            None => {
                self.implicit_flush("texture slots full");
                self.batch.slots_mut().resolve(texture).slot().unwrap_or(0)
            }
        };

        self.batch.push_quad(Vertex::quad(quad.rect(), quad.color, slot));
    }

    fn implicit_flush(&mut self, reason: &str) {
        log::trace!("implicit flush: {reason}");
        self.end_batch();
        self.flush();
        self.begin_batch();
        self.stats.implicit_flushes += 1;
    }

    /// Draws the accumulated quads with one indexed draw call and retires the
    /// batch. An empty batch issues no GPU work.
    pub fn flush(&mut self) {
        if !self.batch.is_empty() {
            self.draw_batch();
        }
        self.batch.reset();
        self.phase = BatchPhase::Idle;
    }

    fn draw_batch(&mut self) {
        self.bind_active_program();

        let viewport = self.backend.viewport();
        self.backend.set_matrix4(uniforms::VIEW_PROJ, &viewport.projection());
        self.backend.set_sampler_array(uniforms::TEXTURES, self.texture_slots());
        self.backend.set_vec4(uniforms::TINT, self.tint.to_array());

        for (slot, texture) in self.batch.slots().occupied() {
            self.backend.bind_texture(slot, texture);
            self.stats.texture_binds += 1;
        }

        self.backend.upload_vertices(self.batch.vertices());
        self.backend.draw_indexed(self.batch.index_count() as u32);

        self.stats.draw_calls += 1;
        self.stats.quads += self.batch.quad_count() as u64;
        self.stats.indices += self.batch.index_count() as u64;
    }
}
