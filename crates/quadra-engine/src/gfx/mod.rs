//! Quad batch rendering.
//!
//! Producers submit quads to a [`BatchRenderer`]; it expands them into a shared
//! vertex scratch buffer, assigns each referenced texture a slot, and flushes
//! one indexed draw call whenever the buffer or the slot table fills up (and
//! once more when the producer ends the frame).
//!
//! The renderer talks to the GPU only through [`RenderBackend`]. [`WgpuBackend`]
//! is the production implementation; tests drive the renderer with a
//! recording backend.

mod backend;
mod batch;
mod buffer;
mod renderer;
mod shader;
mod texture;
mod vertex;
mod wgpu_backend;

#[cfg(test)]
pub(crate) mod testing;

/// Upper bound on textures bound by one batch draw call.
pub const MAX_TEXTURE_SLOTS: usize = 32;

pub use backend::RenderBackend;
pub use batch::{BatchState, SlotLookup, TextureSlots};
pub use buffer::{BufferKind, GpuBuffer};
pub use renderer::{BatchConfig, BatchPhase, BatchRenderer, Quad, RenderStats, ShaderKind};
pub use shader::{uniforms, ShaderDesc, ShaderProgram, UniformBlock, UniformDecl, UniformKind};
pub use texture::{Texture, TextureId, TextureUnits};
pub use vertex::{build_quad_indices, Vertex, MAX_QUADS_PER_BATCH, QUAD_INDEX_TEMPLATE};
pub use wgpu_backend::WgpuBackend;
