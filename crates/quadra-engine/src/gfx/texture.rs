use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{Context, Result};

static NEXT_TEXTURE_ID: AtomicU32 = AtomicU32::new(1);

/// Opaque texture handle.
///
/// Compared by identity: every call to [`TextureId::allocate`] yields a handle
/// no other texture shares, even if two textures hold identical pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureId(u32);

impl TextureId {
    /// Allocates a fresh, process-unique handle.
    pub fn allocate() -> Self {
        TextureId(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// GL-style texture unit table: bind calls land on the active unit.
///
/// The wgpu backend turns the table into a bind group at draw time; units
/// left empty are filled with the blank texture.
#[derive(Debug, Clone)]
pub struct TextureUnits {
    active: usize,
    bound: Vec<Option<TextureId>>,
}

impl TextureUnits {
    pub fn new(count: usize) -> Self {
        Self {
            active: 0,
            bound: vec![None; count],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Selects the unit the next bind applies to. Out-of-range units are ignored.
    pub fn activate(&mut self, unit: usize) {
        if unit < self.bound.len() {
            self.active = unit;
        } else {
            log::warn!("texture unit {unit} out of range (have {})", self.bound.len());
        }
    }

    #[inline]
    pub fn active(&self) -> usize {
        self.active
    }

    /// Binds `id` to the active unit. Rebinding the same texture is harmless.
    pub fn bind(&mut self, id: TextureId) {
        if let Some(slot) = self.bound.get_mut(self.active) {
            *slot = Some(id);
        }
    }

    #[inline]
    pub fn get(&self, unit: usize) -> Option<TextureId> {
        self.bound.get(unit).copied().flatten()
    }

    pub fn clear(&mut self) {
        self.bound.iter_mut().for_each(|b| *b = None);
        self.active = 0;
    }
}

/// One sampled GPU image.
///
/// Sampling is fixed (clamp-to-edge, linear); see [`Texture::sampler_descriptor`].
pub struct Texture {
    id: TextureId,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl Texture {
    /// Pixel format of every batch texture. Sources are sRGB-encoded images.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

    /// Creates a texture from tightly packed, top-row-first RGBA8 pixels.
    ///
    /// Rows are flipped on upload so UV (0, 0) addresses the image's
    /// bottom-left corner, matching the Y-up quad space.
    pub fn from_rgba8(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        width: u32,
        height: u32,
        pixels: &[u8],
        label: &str,
    ) -> Result<Self> {
        anyhow::ensure!(width > 0 && height > 0, "texture {label:?} has zero size");
        let max_dim = device.limits().max_texture_dimension_2d;
        anyhow::ensure!(
            width <= max_dim && height <= max_dim,
            "texture {label:?} is {width}x{height}; device maximum is {max_dim}"
        );
        let expected = rgba8_len(width, height).context("texture size overflows usize")?;
        anyhow::ensure!(
            pixels.len() == expected,
            "texture {label:?}: expected {expected} bytes for {width}x{height} RGBA8, got {}",
            pixels.len()
        );

        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let flipped = flip_rows(pixels, width as usize * 4);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &flipped,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let id = TextureId::allocate();
        log::debug!("texture {label:?} created: {width}x{height} ({id:?})");

        Ok(Self {
            id,
            texture,
            view,
            width,
            height,
        })
    }

    /// The 1×1 opaque white texture substituted for untextured quads.
    pub fn blank(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self> {
        Self::from_rgba8(device, queue, 1, 1, &[255; 4], "quadra blank texture")
    }

    /// Sampler state shared by all batch textures.
    pub fn sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
        wgpu::SamplerDescriptor {
            label: Some("quadra batch sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// Binds this texture on whichever unit is active in `units`.
    #[inline]
    pub fn bind(&self, units: &mut TextureUnits) {
        units.bind(self.id);
    }
}

fn rgba8_len(width: u32, height: u32) -> Option<usize> {
    (width as usize).checked_mul(height as usize)?.checked_mul(4)
}

fn flip_rows(pixels: &[u8], row_bytes: usize) -> Vec<u8> {
    pixels
        .chunks_exact(row_bytes)
        .rev()
        .flatten()
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocated_ids_are_distinct() {
        let a = TextureId::allocate();
        let b = TextureId::allocate();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn units_bind_to_active_unit() {
        let a = TextureId::allocate();
        let b = TextureId::allocate();
        let mut units = TextureUnits::new(4);

        units.bind(a);
        units.activate(2);
        units.bind(b);
        units.bind(b);

        assert_eq!(units.get(0), Some(a));
        assert_eq!(units.get(1), None);
        assert_eq!(units.get(2), Some(b));
        assert_eq!(units.active(), 2);
    }

    #[test]
    fn activating_out_of_range_unit_keeps_previous() {
        let mut units = TextureUnits::new(2);
        units.activate(1);
        units.activate(9);
        assert_eq!(units.active(), 1);
        assert_eq!(units.get(9), None);
    }

    #[test]
    fn clear_unbinds_everything() {
        let mut units = TextureUnits::new(2);
        units.activate(1);
        units.bind(TextureId::allocate());
        units.clear();
        assert_eq!(units.get(1), None);
        assert_eq!(units.active(), 0);
    }

    #[test]
    fn rows_are_flipped_for_y_up_sampling() {
        // 1x2 image: top row red, bottom row blue.
        let pixels = [255, 0, 0, 255, 0, 0, 255, 255];
        assert_eq!(flip_rows(&pixels, 4), vec![0, 0, 255, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn rgba8_len_checks_overflow() {
        assert_eq!(rgba8_len(2, 3), Some(24));
        assert_eq!(rgba8_len(u32::MAX, u32::MAX), None);
    }
}
