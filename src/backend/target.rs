//! The `Backend` trait (§4.7): the seam that keeps the GPU resource manager
//! (C5), runtime (C6) and technique/pass executor (C7) independent of any
//! one graphics API. [`super::software::SoftwareBackend`] is the one
//! concrete implementation this crate ships — a reference implementation
//! with real object lifetimes and byte-level semantics, used to exercise
//! C5-C8 without a GPU. Vulkan (`ash`), OpenGL 4 (feature `opengl`) and
//! Direct3D 11 are the seam's intended real-hardware implementers but none
//! ship in this crate yet — see DESIGN.md.

use crate::ast::pass::{SamplerDescriptor, TextureDescriptor};
use crate::error::GpuError;

/// Opaque handle to a backend-owned texture. Concrete backends hand these
/// out from `create_texture` and never interpret them; callers only ever
/// pass them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub u32);

/// Which sRGB variant a view was created for, distinguishing the two views
/// of one sRGB-capable texture (§4.4's texture create policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEncoding {
    Linear,
    Srgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

/// An opaque bundle of whatever the concrete backend needed to save to
/// later restore host state bit-for-bit (§4.6 `technique.begin`/`end`).
/// The Vulkan backend's block is a plain struct of the handles it bound;
/// the GL backend's is the `glGet…` snapshot named in §4.5.
pub trait SavedState: Send {}

/// Everything C4-C7 need from a concrete graphics API.
pub trait Backend {
    type SavedState: SavedState;

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<TextureHandle, GpuError>;

    /// Creates a shader-resource view of `texture` in the requested
    /// encoding. Backends that created only a linear RTV for this texture
    /// (1D/3D, or a format with no sRGB alias) return an error for
    /// `ViewEncoding::Srgb`.
    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
        encoding: ViewEncoding,
    ) -> Result<TextureViewHandle, GpuError>;

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GpuError>;

    fn create_buffer(&mut self, size: u64) -> Result<BufferHandle, GpuError>;

    /// Uploads `data` to `buffer`, starting at offset 0. Equivalent to a
    /// D3D11 discard-map or a GL sub-range buffer write (§4.6 step 1).
    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8]);

    fn compile_shader(&mut self, source: &str, stage: ShaderStage) -> Result<ShaderHandle, GpuError>;

    fn create_pipeline(
        &mut self,
        vertex_shader: ShaderHandle,
        pixel_shader: ShaderHandle,
    ) -> Result<PipelineHandle, GpuError>;

    /// Saves every piece of host state this backend's `end_state` restores
    /// (§4.6 step 1 of `begin`).
    fn begin_state(&mut self) -> Self::SavedState;

    /// Restores state saved by `begin_state`, bit-for-bit.
    fn end_state(&mut self, saved: Self::SavedState);

    fn bind_pipeline(&mut self, pipeline: PipelineHandle);
    fn bind_sampler(&mut self, slot: u32, view: TextureViewHandle, sampler: SamplerHandle);
    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferHandle);

    /// `targets[0]` is the entry bound as the back buffer when `None`.
    fn set_render_targets(&mut self, targets: &[Option<TextureViewHandle>]);
    fn clear_render_target(&mut self, target: TextureViewHandle, color: [f32; 4]);
    fn clear_depth_stencil(&mut self, depth: f32, stencil: u8);
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Issues a non-indexed draw of `vertex_count` vertices,
    /// primitive=triangle-list (§4.6 step 7).
    fn draw(&mut self, vertex_count: u32);
}
