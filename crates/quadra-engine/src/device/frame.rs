/// One acquired swapchain image, handed back to `Gpu::present`.
///
/// Holding it blocks acquisition of the next frame, so keep it short-lived.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
