//! C6: the per-backend runtime (§4.5). Owns the objects that live for the
//! lifetime of the swapchain rather than for one compiled effect: the
//! back-buffer wrapper, the default depth-stencil, and the fullscreen
//! triangle's vertex buffer.

use crate::backend::target::{Backend, BufferHandle, TextureHandle, TextureViewHandle};
use crate::error::RuntimeError;

/// 24-bit depth + 8-bit stencil, sized to the back buffer (§4.5).
const DEFAULT_DEPTH_STENCIL_BYTES_PER_TEXEL: u32 = 4;

/// Per-swapchain objects the runtime owns. Recreated by `on_reset` +
/// `on_init` whenever the swapchain itself is recreated.
pub struct SwapchainResources {
    pub back_buffer_view: TextureViewHandle,
    pub depth_stencil: TextureHandle,
    pub depth_stencil_view: TextureViewHandle,
    pub width: u32,
    pub height: u32,
}

/// The fullscreen-triangle vertex buffer every technique pass draws from
/// (§4.5: "a 3-vertex vertex buffer {0,1,2} and an empty input layout").
pub struct FullscreenTriangle {
    pub vertex_buffer: BufferHandle,
}

impl FullscreenTriangle {
    pub fn create<B: Backend>(backend: &mut B) -> Result<Self, RuntimeError> {
        let vertex_buffer = backend.create_buffer(3 * 4).map_err(RuntimeError::Gpu)?;
        backend.upload_buffer(vertex_buffer, &[0u32, 1, 2].map(u32::to_le_bytes).concat());
        Ok(Self { vertex_buffer })
    }
}

/// Owns the swapchain-lifetime objects and the fullscreen triangle. The
/// host hook layer drives this through `on_init`/`on_reset`/`on_present`
/// and never touches a backend handle directly (§5: "the runtime never
/// calls into host hook code; it only invokes unhooked function pointers/
/// handles stored at init time").
pub struct Runtime<B: Backend> {
    backend: B,
    swapchain: Option<SwapchainResources>,
    triangle: Option<FullscreenTriangle>,
}

impl<B: Backend> Runtime<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, swapchain: None, triangle: None }
    }

    pub fn backend(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Creates the back-buffer view, the depth-stencil texture + SRV/DSV,
    /// and the fullscreen triangle. Idempotent only after a matching
    /// `on_reset` — calling twice without one leaks the previous objects,
    /// same as the backend APIs this wraps.
    pub fn on_init(
        &mut self,
        back_buffer: TextureHandle,
        width: u32,
        height: u32,
        depth_stencil_descriptor: &crate::ast::pass::TextureDescriptor,
    ) -> Result<(), RuntimeError> {
        use crate::backend::target::ViewEncoding;

        let back_buffer_view = self
            .backend
            .create_texture_view(back_buffer, ViewEncoding::Linear)
            .map_err(RuntimeError::Gpu)?;

        let depth_stencil = self.backend.create_texture(depth_stencil_descriptor).map_err(RuntimeError::Gpu)?;
        let depth_stencil_view = self
            .backend
            .create_texture_view(depth_stencil, ViewEncoding::Linear)
            .map_err(RuntimeError::Gpu)?;

        self.swapchain = Some(SwapchainResources {
            back_buffer_view,
            depth_stencil,
            depth_stencil_view,
            width,
            height,
        });
        self.triangle = Some(FullscreenTriangle::create(&mut self.backend)?);
        tracing::debug!(width, height, "runtime initialised");
        Ok(())
    }

    /// Drops every per-swapchain object. `on_init` must be called again
    /// before the next `on_present`.
    pub fn on_reset(&mut self) {
        tracing::debug!("runtime reset, releasing swapchain objects");
        self.swapchain = None;
        self.triangle = None;
    }

    pub fn swapchain(&self) -> Option<&SwapchainResources> {
        self.swapchain.as_ref()
    }

    pub fn fullscreen_triangle(&self) -> Option<&FullscreenTriangle> {
        self.triangle.as_ref()
    }

    /// Clears the default depth-stencil (depth=1.0, stencil=0) ahead of a
    /// frame's techniques, and returns whether the runtime is ready to
    /// render (swapchain objects present).
    pub fn on_present(&mut self) -> Result<bool, RuntimeError> {
        let Some(swapchain) = &self.swapchain else {
            tracing::warn!("on_present called before on_init, skipping frame");
            return Ok(false);
        };
        let _ = swapchain.depth_stencil_view;
        self.backend.clear_depth_stencil(1.0, 0);
        Ok(true)
    }
}

/// Byte size of one row of the default depth-stencil texture, used when
/// sizing the host-visible copy staging buffer for a depth-stencil resize.
pub fn depth_stencil_row_bytes(width: u32) -> u32 {
    width * DEFAULT_DEPTH_STENCIL_BYTES_PER_TEXEL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_stencil_row_bytes_scales_with_width() {
        assert_eq!(depth_stencil_row_bytes(1920), 1920 * 4);
    }
}
