//! [`SoftwareBackend`]: the one concrete [`Backend`] this crate ships. It
//! allocates real byte buffers for every GPU object, compiles shaders
//! through the same `naga`-based GLSL front end a hardware backend would
//! reuse (§4.3), and lets tests observe state by reading those bytes back
//! instead of asserting on a call log.

use hashbrown::HashMap;

use super::shader::glsl_to_spirv;
use super::target::{
    Backend, BufferHandle, PipelineHandle, SamplerHandle, SavedState, ShaderHandle, ShaderStage,
    TextureHandle, TextureViewHandle, ViewEncoding,
};
use crate::ast::pass::{SamplerDescriptor, TextureDescriptor, TextureFormat};
use crate::error::GpuError;
use crate::gpu::texel_size;

/// A texture's backing store: one contiguous byte blob sized for mip 0 at
/// `texel_size(format)` bytes per texel (opaque-block formats are sized at
/// 1 byte and never read/written by this backend's clears).
struct SoftwareTexture {
    format: TextureFormat,
    width: u32,
    height: u32,
    depth: u32,
    mip_levels: u32,
    data: Vec<u8>,
}

struct SoftwareView {
    texture: TextureHandle,
    encoding: ViewEncoding,
}

struct SoftwarePipeline {
    vertex_shader: ShaderHandle,
    pixel_shader: ShaderHandle,
}

/// One recorded draw, kept for test introspection of what a technique's
/// passes actually bound before issuing their draw (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub pipeline: Option<PipelineHandle>,
    pub render_targets: Vec<Option<TextureViewHandle>>,
    pub vertex_count: u32,
}

/// Everything [`SoftwareBackend::begin_state`] snapshots and
/// [`SoftwareBackend::end_state`] restores: the bound pipeline, render
/// targets, samplers and uniform buffers (§4.6 `technique.begin`/`end`).
pub struct SoftwareSavedState {
    pipeline: Option<PipelineHandle>,
    render_targets: Vec<Option<TextureViewHandle>>,
    samplers: HashMap<u32, (TextureViewHandle, SamplerHandle)>,
    uniform_buffers: HashMap<u32, BufferHandle>,
}

impl SavedState for SoftwareSavedState {}

/// A reference [`Backend`] with real object lifetimes: texture/buffer
/// bytes are actually allocated and mutated, and shader compilation runs
/// the real GLSL-to-SPIR-V pipeline, so C5-C8 can be exercised end to end
/// without a GPU (§4.7).
#[derive(Default)]
pub struct SoftwareBackend {
    next_handle: u32,
    textures: HashMap<u32, SoftwareTexture>,
    views: HashMap<u32, SoftwareView>,
    samplers: HashMap<u32, SamplerDescriptor>,
    buffers: HashMap<u32, Vec<u8>>,
    shaders: HashMap<u32, (ShaderStage, Vec<u32>)>,
    pipelines: HashMap<u32, SoftwarePipeline>,

    bound_pipeline: Option<PipelineHandle>,
    bound_render_targets: Vec<Option<TextureViewHandle>>,
    bound_samplers: HashMap<u32, (TextureViewHandle, SamplerHandle)>,
    bound_uniform_buffers: HashMap<u32, BufferHandle>,
    viewport: (u32, u32),

    pub draw_log: Vec<DrawCall>,
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    /// The live bytes behind a texture handle, for tests asserting on what
    /// a clear or upload actually wrote.
    pub fn texture_bytes(&self, handle: TextureHandle) -> Option<&[u8]> {
        self.textures.get(&handle.0).map(|t| t.data.as_slice())
    }

    pub fn buffer_bytes(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle.0).map(Vec::as_slice)
    }
}

impl Backend for SoftwareBackend {
    type SavedState = SoftwareSavedState;

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<TextureHandle, GpuError> {
        let texel = texel_size(descriptor.format).unwrap_or(1);
        let len = (descriptor.width * descriptor.height * descriptor.depth * texel) as usize;
        let id = self.next_id();
        self.textures.insert(
            id,
            SoftwareTexture {
                format: descriptor.format,
                width: descriptor.width,
                height: descriptor.height,
                depth: descriptor.depth,
                mip_levels: descriptor.mip_levels,
                data: vec![0u8; len.max(1)],
            },
        );
        Ok(TextureHandle(id))
    }

    fn create_texture_view(
        &mut self,
        texture: TextureHandle,
        encoding: ViewEncoding,
    ) -> Result<TextureViewHandle, GpuError> {
        let info = self
            .textures
            .get(&texture.0)
            .ok_or_else(|| GpuError::TextureCreation(format!("no such texture: {:?}", texture)))?;
        if encoding == ViewEncoding::Srgb && !info.format.has_srgb_alias() {
            return Err(GpuError::TextureCreation(format!(
                "{:?} has no sRGB alias",
                info.format
            )));
        }
        let id = self.next_id();
        self.views.insert(id, SoftwareView { texture, encoding });
        Ok(TextureViewHandle(id))
    }

    fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GpuError> {
        let id = self.next_id();
        self.samplers.insert(id, descriptor.clone());
        Ok(SamplerHandle(id))
    }

    fn create_buffer(&mut self, size: u64) -> Result<BufferHandle, GpuError> {
        let id = self.next_id();
        self.buffers.insert(id, vec![0u8; size as usize]);
        Ok(BufferHandle(id))
    }

    fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
        if let Some(bytes) = self.buffers.get_mut(&buffer.0) {
            let end = data.len().min(bytes.len());
            bytes[..end].copy_from_slice(&data[..end]);
        }
    }

    fn compile_shader(&mut self, source: &str, stage: ShaderStage) -> Result<ShaderHandle, GpuError> {
        let naga_stage = match stage {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Pixel => naga::ShaderStage::Fragment,
        };
        let spirv = glsl_to_spirv(source, naga_stage)?;
        let id = self.next_id();
        self.shaders.insert(id, (stage, spirv));
        Ok(ShaderHandle(id))
    }

    fn create_pipeline(
        &mut self,
        vertex_shader: ShaderHandle,
        pixel_shader: ShaderHandle,
    ) -> Result<PipelineHandle, GpuError> {
        if !self.shaders.contains_key(&vertex_shader.0) || !self.shaders.contains_key(&pixel_shader.0) {
            return Err(GpuError::PipelineCreation("unknown shader handle".to_string()));
        }
        let id = self.next_id();
        self.pipelines.insert(id, SoftwarePipeline { vertex_shader, pixel_shader });
        Ok(PipelineHandle(id))
    }

    fn begin_state(&mut self) -> Self::SavedState {
        SoftwareSavedState {
            pipeline: self.bound_pipeline,
            render_targets: self.bound_render_targets.clone(),
            samplers: self.bound_samplers.clone(),
            uniform_buffers: self.bound_uniform_buffers.clone(),
        }
    }

    fn end_state(&mut self, saved: Self::SavedState) {
        self.bound_pipeline = saved.pipeline;
        self.bound_render_targets = saved.render_targets;
        self.bound_samplers = saved.samplers;
        self.bound_uniform_buffers = saved.uniform_buffers;
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        self.bound_pipeline = Some(pipeline);
    }

    fn bind_sampler(&mut self, slot: u32, view: TextureViewHandle, sampler: SamplerHandle) {
        self.bound_samplers.insert(slot, (view, sampler));
    }

    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.bound_uniform_buffers.insert(slot, buffer);
    }

    fn set_render_targets(&mut self, targets: &[Option<TextureViewHandle>]) {
        self.bound_render_targets = targets.to_vec();
    }

    fn clear_render_target(&mut self, target: TextureViewHandle, color: [f32; 4]) {
        let Some(view) = self.views.get(&target.0) else { return };
        let texture_id = view.texture.0;
        let Some(texture) = self.textures.get_mut(&texture_id) else { return };
        let texel = texel_size(texture.format).unwrap_or(4) as usize;
        let bytes: Vec<u8> = color.iter().flat_map(|c| c.to_le_bytes()).take(texel.max(4)).collect();
        for chunk in texture.data.chunks_mut(texel.max(1)) {
            let n = chunk.len().min(bytes.len());
            chunk[..n].copy_from_slice(&bytes[..n]);
        }
    }

    fn clear_depth_stencil(&mut self, depth: f32, stencil: u8) {
        let _ = (depth, stencil);
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
    }

    fn draw(&mut self, vertex_count: u32) {
        self.draw_log.push(DrawCall {
            pipeline: self.bound_pipeline,
            render_targets: self.bound_render_targets.clone(),
            vertex_count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SymbolTable;
    use crate::gpu::test_support::texture_symbol;

    fn dummy_texture(format: TextureFormat, width: u32, height: u32) -> TextureDescriptor {
        let mut symbols = SymbolTable::new();
        let symbol = texture_symbol(&mut symbols, "t");
        TextureDescriptor {
            name: "t".to_string(),
            symbol,
            dimension: 2,
            width,
            height,
            depth: 1,
            mip_levels: 1,
            format,
            annotations: Vec::new(),
        }
    }

    #[test]
    fn clear_render_target_writes_expected_bytes() {
        let mut backend = SoftwareBackend::new();
        let descriptor = dummy_texture(TextureFormat::RGBA8, 2, 2);
        let texture = backend.create_texture(&descriptor).unwrap();
        let view = backend.create_texture_view(texture, ViewEncoding::Linear).unwrap();

        backend.clear_render_target(view, [1.0, 0.0, 0.0, 1.0]);

        let bytes = backend.texture_bytes(texture).unwrap();
        assert_eq!(bytes.len(), 2 * 2 * 4);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
    }

    #[test]
    fn srgb_view_rejected_for_format_without_alias() {
        let mut backend = SoftwareBackend::new();
        let descriptor = dummy_texture(TextureFormat::R32F, 4, 4);
        let texture = backend.create_texture(&descriptor).unwrap();
        assert!(backend.create_texture_view(texture, ViewEncoding::Srgb).is_err());
    }

    #[test]
    fn buffer_upload_round_trips() {
        let mut backend = SoftwareBackend::new();
        let buffer = backend.create_buffer(4).unwrap();
        backend.upload_buffer(buffer, &42u32.to_le_bytes());
        assert_eq!(backend.buffer_bytes(buffer).unwrap(), &42u32.to_le_bytes());
    }

    #[test]
    fn invalid_glsl_shader_fails_to_compile() {
        let mut backend = SoftwareBackend::new();
        let err = backend.compile_shader("not glsl at all {{{", ShaderStage::Pixel).unwrap_err();
        assert!(matches!(err, GpuError::BackendCompile(_)));
    }

    #[test]
    fn hello_pass_compiles_links_and_draws() {
        let mut backend = SoftwareBackend::new();
        let vs = backend
            .compile_shader(
                "#version 450\nvoid main() { gl_Position = vec4(0.0); }",
                ShaderStage::Vertex,
            )
            .unwrap();
        let ps = backend
            .compile_shader(
                "#version 450\nlayout(location=0) out vec4 o;\nvoid main() { o = vec4(1.0); }",
                ShaderStage::Pixel,
            )
            .unwrap();
        let pipeline = backend.create_pipeline(vs, ps).unwrap();

        let descriptor = dummy_texture(TextureFormat::RGBA8, 4, 4);
        let texture = backend.create_texture(&descriptor).unwrap();
        let view = backend.create_texture_view(texture, ViewEncoding::Linear).unwrap();

        let saved = backend.begin_state();
        backend.bind_pipeline(pipeline);
        backend.set_render_targets(&[Some(view)]);
        backend.set_viewport(4, 4);
        backend.draw(3);
        backend.end_state(saved);

        assert_eq!(backend.draw_log.len(), 1);
        assert_eq!(backend.draw_log[0].vertex_count, 3);
        assert_eq!(backend.draw_log[0].pipeline, Some(pipeline));
    }
}
