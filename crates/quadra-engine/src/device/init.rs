use crate::gfx::MAX_TEXTURE_SLOTS;

/// Initialization parameters for the GPU layer.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is supported everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference; falls back to a supported mode.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Base limits requested from the adapter. The sampled-texture limit is
    /// raised to `texture_slots` when the adapter allows it.
    pub required_limits: wgpu::Limits,

    /// Texture slots wanted per batch draw call.
    ///
    /// Clamped to `MAX_TEXTURE_SLOTS` and to the adapter's
    /// `max_sampled_textures_per_shader_stage`.
    pub texture_slots: u32,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_limits: wgpu::Limits::default(),
            texture_slots: MAX_TEXTURE_SLOTS as u32,
            desired_maximum_frame_latency: 2,
        }
    }
}
