use anyhow::Result;

use super::vertex::Vertex;

/// What a [`GpuBuffer`] holds. Decides usage flags and upload encoding.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    /// Interleaved 32-bit float vertex data.
    Vertex,
    /// 16-bit unsigned indices.
    Index,
}

impl BufferKind {
    fn usage(self) -> wgpu::BufferUsages {
        match self {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferKind::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        }
    }

    /// Size in bytes of one encoded element.
    pub fn element_size(self) -> usize {
        match self {
            BufferKind::Vertex => std::mem::size_of::<f32>(),
            BufferKind::Index => std::mem::size_of::<u16>(),
        }
    }
}

/// One GPU buffer plus, for vertex buffers, its attribute description.
///
/// Uploads overwrite the buffer in place; the allocation only grows when an
/// upload no longer fits.
pub struct GpuBuffer {
    kind: BufferKind,
    label: &'static str,
    raw: wgpu::Buffer,
    capacity: u64,
    len: u64,
    stride: u64,
    attributes: Vec<wgpu::VertexAttribute>,
}

impl GpuBuffer {
    pub fn new(device: &wgpu::Device, kind: BufferKind, label: &'static str, capacity: u64) -> Self {
        let capacity = align4(capacity.max(4));
        Self {
            kind,
            label,
            raw: create_raw(device, kind, label, capacity),
            capacity,
            len: 0,
            stride: 0,
            attributes: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// Allocated size in bytes.
    #[inline]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes written by the last upload.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    /// Replaces the buffer contents, encoding `data` according to the buffer
    /// kind: floats as-is for vertex buffers, truncated to `u16` for index buffers.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[f32]) {
        let bytes = encode(self.kind, data);
        self.upload_bytes(device, queue, &bytes);
    }

    pub fn upload_vertices(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, vertices: &[Vertex]) {
        debug_assert_eq!(self.kind, BufferKind::Vertex);
        self.upload_bytes(device, queue, bytemuck::cast_slice(vertices));
    }

    pub fn upload_indices(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, indices: &[u16]) {
        debug_assert_eq!(self.kind, BufferKind::Index);
        self.upload_bytes(device, queue, bytemuck::cast_slice(indices));
    }

    fn upload_bytes(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, bytes: &[u8]) {
        self.len = bytes.len() as u64;
        if bytes.is_empty() {
            return;
        }

        let needed = align4(self.len);
        if let Some(capacity) = regrow(self.capacity, needed) {
            log::debug!("{}: growing {} -> {} bytes", self.label, self.capacity, capacity);
            self.raw = create_raw(device, self.kind, self.label, capacity);
            self.capacity = capacity;
        }

        // Copies must be 4-byte multiples; an odd index count leaves 2 bytes over.
        if bytes.len() % 4 == 0 {
            queue.write_buffer(&self.raw, 0, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(needed as usize, 0);
            queue.write_buffer(&self.raw, 0, &padded);
        }
    }

    /// Describes one float vertex attribute read from this buffer.
    ///
    /// Describing a slot again replaces the previous entry, so callers can
    /// re-describe before every draw.
    pub fn describe_attribute(
        &mut self,
        slot: u32,
        component_count: u32,
        stride: u64,
        offset: u64,
    ) -> Result<()> {
        anyhow::ensure!(
            self.kind == BufferKind::Vertex,
            "{}: attributes only apply to vertex buffers",
            self.label
        );
        put_attribute(&mut self.attributes, slot, component_count, stride, offset)?;
        self.stride = stride;
        Ok(())
    }

    /// Vertex layout assembled from the described attributes.
    pub fn layout(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &self.attributes,
        }
    }

    pub fn attributes(&self) -> &[wgpu::VertexAttribute] {
        &self.attributes
    }

    /// Index format for index buffers.
    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        match self.kind {
            BufferKind::Index => Some(wgpu::IndexFormat::Uint16),
            BufferKind::Vertex => None,
        }
    }

    /// The first `bytes` bytes of the allocation (never empty; wgpu rejects
    /// zero-sized slices).
    pub fn slice(&self, bytes: u64) -> wgpu::BufferSlice<'_> {
        self.raw.slice(..bytes.clamp(4, self.capacity))
    }
}

fn create_raw(device: &wgpu::Device, kind: BufferKind, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: kind.usage(),
        mapped_at_creation: false,
    })
}

fn encode(kind: BufferKind, data: &[f32]) -> Vec<u8> {
    match kind {
        BufferKind::Vertex => bytemuck::cast_slice(data).to_vec(),
        BufferKind::Index => {
            let indices: Vec<u16> = data.iter().map(|&v| v as u16).collect();
            bytemuck::cast_slice(&indices).to_vec()
        }
    }
}

/// Inserts or replaces the attribute for `slot`, keeping the table sorted by
/// shader location.
fn put_attribute(
    attributes: &mut Vec<wgpu::VertexAttribute>,
    slot: u32,
    component_count: u32,
    stride: u64,
    offset: u64,
) -> Result<()> {
    let format = float_format(component_count)?;
    anyhow::ensure!(
        offset + format.size() <= stride,
        "attribute {slot} ({} bytes at {offset}) overruns stride {stride}",
        format.size()
    );

    let attribute = wgpu::VertexAttribute {
        format,
        offset,
        shader_location: slot,
    };
    match attributes.iter_mut().find(|a| a.shader_location == slot) {
        Some(existing) => *existing = attribute,
        None => {
            attributes.push(attribute);
            attributes.sort_by_key(|a| a.shader_location);
        }
    }
    Ok(())
}

fn float_format(component_count: u32) -> Result<wgpu::VertexFormat> {
    Ok(match component_count {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        4 => wgpu::VertexFormat::Float32x4,
        n => anyhow::bail!("unsupported attribute component count {n}"),
    })
}

#[inline]
fn align4(n: u64) -> u64 {
    (n + 3) & !3
}

fn grown_capacity(current: u64, needed: u64) -> u64 {
    needed.next_power_of_two().max(current)
}

/// New allocation size when `needed` bytes no longer fit in `capacity`.
fn regrow(capacity: u64, needed: u64) -> Option<u64> {
    (needed > capacity).then(|| grown_capacity(capacity, needed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_encoding_is_f32() {
        let bytes = encode(BufferKind::Vertex, &[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &1.0f32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &(-2.5f32).to_ne_bytes());
    }

    #[test]
    fn index_encoding_is_u16() {
        let bytes = encode(BufferKind::Index, &[3.0, 0.0, 1.0]);
        assert_eq!(bytes.len(), 3 * BufferKind::Index.element_size());
        let expected: Vec<u8> = [3u16, 0, 1].iter().flat_map(|i| i.to_ne_bytes()).collect();
        assert_eq!(bytes, expected);
    }

    #[test]
    fn float_formats_by_component_count() {
        assert_eq!(float_format(1).unwrap(), wgpu::VertexFormat::Float32);
        assert_eq!(float_format(3).unwrap(), wgpu::VertexFormat::Float32x3);
        assert!(float_format(0).is_err());
        assert!(float_format(5).is_err());
    }

    #[test]
    fn capacity_growth() {
        assert_eq!(align4(6), 8);
        assert_eq!(align4(8), 8);
        assert_eq!(grown_capacity(64, 100), 128);
        assert_eq!(grown_capacity(1024, 100), 1024);
    }

    #[test]
    fn upload_within_capacity_keeps_allocation() {
        assert_eq!(regrow(400, 400), None);
        assert_eq!(regrow(400, 40), None);
    }

    #[test]
    fn oversized_upload_recreates_allocation() {
        assert_eq!(regrow(400, 404), Some(512));
        assert_eq!(regrow(4, 40_000), Some(65_536));
    }

    // ── attributes ────────────────────────────────────────────────────────

    #[test]
    fn redescribing_a_slot_replaces_it() {
        let mut attrs = Vec::new();
        put_attribute(&mut attrs, 0, 3, 40, 0).unwrap();
        put_attribute(&mut attrs, 2, 1, 40, 20).unwrap();
        put_attribute(&mut attrs, 2, 1, 40, 24).unwrap();

        let slot2: Vec<_> = attrs.iter().filter(|a| a.shader_location == 2).collect();
        assert_eq!(slot2.len(), 1);
        assert_eq!(slot2[0].offset, 24);
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn attributes_stay_sorted_by_location() {
        let mut attrs = Vec::new();
        put_attribute(&mut attrs, 3, 4, 40, 24).unwrap();
        put_attribute(&mut attrs, 0, 3, 40, 0).unwrap();
        put_attribute(&mut attrs, 1, 2, 40, 12).unwrap();
        let locations: Vec<_> = attrs.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 3]);
    }

    #[test]
    fn attribute_overrunning_stride_is_rejected() {
        let mut attrs = Vec::new();
        assert!(put_attribute(&mut attrs, 3, 4, 40, 28).is_err());
        assert!(put_attribute(&mut attrs, 0, 0, 40, 0).is_err());
        assert!(attrs.is_empty());
        // Ends exactly at the stride.
        assert!(put_attribute(&mut attrs, 3, 4, 40, 24).is_ok());
    }
}
