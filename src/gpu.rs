//! C5: the per-effect GPU resource manager (§4.4). Owns every GPU object an
//! effect needs — constant buffers, the host-side storage arenas that back
//! them, samplers, shader-resource views and the texture map — behind the
//! [`Backend`](crate::backend::target::Backend) trait, so this layer owns
//! object *lifetimes* rather than any one API's calls.

use hashbrown::HashMap;

use crate::ast::pass::{SamplerDescriptor, TextureDescriptor, TextureFormat};
use crate::ast::{Symbol, SymbolId, SymbolTable};
use crate::backend::layout::{layout_globals, UniformLayout};
use crate::backend::target::{Backend, BufferHandle, SamplerHandle, TextureHandle, TextureViewHandle, ViewEncoding};
use crate::error::GpuError;

/// A constant buffer plus the host-side byte blob that is copied into it on
/// the next upload. Index 0 is always the global-uniform buffer; one
/// additional arena exists per declared struct-uniform block.
struct ConstantArena {
    buffer: BufferHandle,
    bytes: Vec<u8>,
}

/// Two shader-resource views of one texture: linear is always present;
/// `srgb` exists only when the texture's format has an sRGB alias and the
/// texture is 2D (§4.4's texture create policy).
struct TextureViews {
    handle: TextureHandle,
    linear: TextureViewHandle,
    srgb: Option<TextureViewHandle>,
}

/// Owns every GPU object compiled from one effect, generic over the active
/// [`Backend`].
pub struct EffectResources<B: Backend> {
    arenas: Vec<ConstantArena>,
    dirty: bool,
    samplers: HashMap<SymbolId, SamplerHandle>,
    textures: HashMap<SymbolId, TextureViews>,
    _backend: core::marker::PhantomData<B>,
}

impl<B: Backend> EffectResources<B> {
    /// Creates the global-uniform buffer (index 0, laid out by
    /// [`layout_globals`]) and every GPU texture/sampler an effect's
    /// declarations name. Struct-typed uniform blocks are appended as
    /// further arenas by [`Self::declare_struct_uniform`].
    pub fn new(
        backend: &mut B,
        symbols: &SymbolTable,
        uniforms: &[SymbolId],
        textures: &[TextureDescriptor],
        samplers: &[SamplerDescriptor],
    ) -> Result<Self, GpuError> {
        let globals = layout_globals(symbols, uniforms);
        let global_size = globals.iter().map(|(_, l)| u64::from(l.offset + l.size)).max().unwrap_or(0);
        let global_buffer = backend.create_buffer(global_size.max(16))?;

        let mut resources = Self {
            arenas: vec![ConstantArena {
                buffer: global_buffer,
                bytes: vec![0u8; global_size.max(16) as usize],
            }],
            dirty: true,
            samplers: HashMap::new(),
            textures: HashMap::new(),
            _backend: core::marker::PhantomData,
        };

        for descriptor in textures {
            resources.create_texture(backend, descriptor)?;
        }
        for descriptor in samplers {
            let handle = backend.create_sampler(descriptor)?;
            resources.samplers.insert(descriptor.texture, handle);
        }

        tracing::debug!(
            globals_bytes = global_size,
            textures = textures.len(),
            samplers = samplers.len(),
            "effect GPU resources created"
        );
        Ok(resources)
    }

    fn create_texture(&mut self, backend: &mut B, descriptor: &TextureDescriptor) -> Result<(), GpuError> {
        let handle = backend.create_texture(descriptor)?;
        let linear = backend.create_texture_view(handle, ViewEncoding::Linear)?;
        let srgb = if descriptor.dimension == 2 && descriptor.format.has_srgb_alias() {
            Some(backend.create_texture_view(handle, ViewEncoding::Srgb)?)
        } else {
            None
        };
        self.textures.insert(descriptor.symbol, TextureViews { handle, linear, srgb });
        Ok(())
    }

    /// Appends a new constant arena for a struct-typed uniform block,
    /// returning its buffer index (1, 2, … — 0 is reserved for globals).
    pub fn declare_struct_uniform(&mut self, backend: &mut B, size: u32) -> Result<u32, GpuError> {
        let buffer = backend.create_buffer(u64::from(size.max(16)))?;
        self.arenas.push(ConstantArena {
            buffer,
            bytes: vec![0u8; size.max(16) as usize],
        });
        Ok(self.arenas.len() as u32 - 1)
    }

    /// Writes `value` into the global-uniform arena at `layout`'s offset,
    /// marking the arena dirty. This is `Constant::set_value`'s effect on
    /// the resource manager (§6's public effect handle, §5's "mutated only
    /// by set_value" rule).
    pub fn set_value(&mut self, layout: &UniformLayout, value: &[u8]) {
        self.set_value_in_buffer(layout.buffer, layout.offset, value);
    }

    pub fn set_value_in_buffer(&mut self, buffer_index: u32, offset: u32, value: &[u8]) {
        let arena = &mut self.arenas[buffer_index as usize];
        let start = offset as usize;
        let end = start + value.len();
        if end > arena.bytes.len() {
            arena.bytes.resize(end, 0);
        }
        arena.bytes[start..end].copy_from_slice(value);
        self.dirty = true;
    }

    pub fn get_value<'a>(&'a self, layout: &UniformLayout) -> &'a [u8] {
        let arena = &self.arenas[layout.buffer as usize];
        &arena.bytes[layout.offset as usize..(layout.offset + layout.size) as usize]
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Copies every arena to its buffer and clears the dirty flag (§4.6
    /// `pass.render` step 1). A no-op when nothing has changed since the
    /// last upload.
    pub fn upload(&mut self, backend: &mut B) {
        if !self.dirty {
            return;
        }
        for arena in &self.arenas {
            backend.upload_buffer(arena.buffer, &arena.bytes);
        }
        self.dirty = false;
    }

    pub fn buffer(&self, index: u32) -> BufferHandle {
        self.arenas[index as usize].buffer
    }

    pub fn buffer_count(&self) -> u32 {
        self.arenas.len() as u32
    }

    /// The view a sampler slot should bind: the sRGB view iff the sampler
    /// is sRGB-tagged and one exists, otherwise linear (§4.6 step 3).
    pub fn sampler_view(&self, texture: SymbolId, srgb_requested: bool) -> Option<TextureViewHandle> {
        let views = self.textures.get(&texture)?;
        if srgb_requested {
            Some(views.srgb.unwrap_or(views.linear))
        } else {
            Some(views.linear)
        }
    }

    pub fn sampler(&self, texture: SymbolId) -> Option<SamplerHandle> {
        self.samplers.get(&texture).copied()
    }

    pub fn texture_handle(&self, texture: SymbolId) -> Option<TextureHandle> {
        self.textures.get(&texture).map(|v| v.handle)
    }
}

/// Resolves the declared name of a texture/sampler symbol, used by the
/// public effect handle's `list_texture_names`/`list_technique_names`.
pub fn symbol_name(symbols: &SymbolTable, id: SymbolId) -> &str {
    symbols.get(id).name()
}

/// Byte width of `TextureFormat`'s base (non-compressed) texel; used to
/// size host-side upload staging. Compressed formats are sized by their
/// block layout instead and are not covered here.
pub fn texel_size(format: TextureFormat) -> Option<u32> {
    match format {
        TextureFormat::R8 => Some(1),
        TextureFormat::RG8 => Some(2),
        TextureFormat::RGBA8 => Some(4),
        TextureFormat::R32F => Some(4),
        TextureFormat::RGBA16 | TextureFormat::RGBA16F => Some(8),
        TextureFormat::RGBA32F => Some(16),
        TextureFormat::Dxt1 | TextureFormat::Dxt3 | TextureFormat::Dxt5 => None,
        TextureFormat::Latc1 | TextureFormat::Latc2 => None,
        TextureFormat::Unknown => None,
    }
}

/// A minimal [`Backend`] implementation shared by this module's tests and by
/// other crate-internal tests (e.g. the public effect handle's) that need a
/// GPU stand-in without a real device.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::backend::target::{PipelineHandle, SavedState as SavedStateTrait, ShaderHandle, ShaderStage};
    use std::cell::Cell;

    pub(crate) struct NoopSavedState;
    impl SavedStateTrait for NoopSavedState {}

    /// A backend that hands out sequential handles and records every call,
    /// enough to exercise `EffectResources` without a real GPU.
    pub(crate) struct FakeBackend {
        next: Cell<u32>,
        pub uploads: Vec<(u32, Vec<u8>)>,
    }

    impl FakeBackend {
        pub(crate) fn new() -> Self {
            Self { next: Cell::new(0), uploads: Vec::new() }
        }

        fn next_id(&self) -> u32 {
            let id = self.next.get();
            self.next.set(id + 1);
            id
        }
    }

    impl Backend for FakeBackend {
        type SavedState = NoopSavedState;

        fn create_texture(&mut self, _descriptor: &TextureDescriptor) -> Result<TextureHandle, GpuError> {
            Ok(TextureHandle(self.next_id()))
        }

        fn create_texture_view(
            &mut self,
            _texture: TextureHandle,
            _encoding: ViewEncoding,
        ) -> Result<TextureViewHandle, GpuError> {
            Ok(TextureViewHandle(self.next_id()))
        }

        fn create_sampler(&mut self, _descriptor: &SamplerDescriptor) -> Result<SamplerHandle, GpuError> {
            Ok(SamplerHandle(self.next_id()))
        }

        fn create_buffer(&mut self, _size: u64) -> Result<BufferHandle, GpuError> {
            Ok(BufferHandle(self.next_id()))
        }

        fn upload_buffer(&mut self, buffer: BufferHandle, data: &[u8]) {
            self.uploads.push((buffer.0, data.to_vec()));
        }

        fn compile_shader(&mut self, _source: &str, _stage: ShaderStage) -> Result<ShaderHandle, GpuError> {
            Ok(ShaderHandle(self.next_id()))
        }

        fn create_pipeline(&mut self, _vs: ShaderHandle, _ps: ShaderHandle) -> Result<PipelineHandle, GpuError> {
            Ok(PipelineHandle(self.next_id()))
        }

        fn begin_state(&mut self) -> Self::SavedState {
            NoopSavedState
        }

        fn end_state(&mut self, _saved: Self::SavedState) {}

        fn bind_pipeline(&mut self, _pipeline: PipelineHandle) {}
        fn bind_sampler(&mut self, _slot: u32, _view: TextureViewHandle, _sampler: SamplerHandle) {}
        fn bind_uniform_buffer(&mut self, _slot: u32, _buffer: BufferHandle) {}
        fn set_render_targets(&mut self, _targets: &[Option<TextureViewHandle>]) {}
        fn clear_render_target(&mut self, _target: TextureViewHandle, _color: [f32; 4]) {}
        fn clear_depth_stencil(&mut self, _depth: f32, _stencil: u8) {}
        fn set_viewport(&mut self, _width: u32, _height: u32) {}
        fn draw(&mut self, _vertex_count: u32) {}
    }

    pub(crate) fn texture_symbol(symbols: &mut SymbolTable, name: &str) -> SymbolId {
        use crate::ast::symbol::VariableSymbol;
        use crate::ast::ty::{BaseClass, Type};
        use crate::lexer::Location;
        symbols
            .insert(
                Symbol::Variable(VariableSymbol {
                    name: name.to_string(),
                    ty: Type::scalar(BaseClass::Texture2D),
                    semantic: None,
                    annotations: Vec::new(),
                    initializer: None,
                    location: Location::default(),
                }),
                true,
            )
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{texture_symbol, FakeBackend};
    use super::*;

    #[test]
    fn set_value_marks_dirty_and_upload_clears_it() {
        let mut backend = FakeBackend::new();
        let symbols = SymbolTable::new();
        let mut resources = EffectResources::new(&mut backend, &symbols, &[], &[], &[]).unwrap();
        assert!(resources.is_dirty());
        resources.upload(&mut backend);
        assert!(!resources.is_dirty());

        let layout = UniformLayout { buffer: 0, offset: 0, size: 4, element_count: 1 };
        resources.set_value(&layout, &1.0f32.to_le_bytes());
        assert!(resources.is_dirty());
        resources.upload(&mut backend);
        assert!(!resources.is_dirty());
        assert_eq!(resources.get_value(&layout), 1.0f32.to_le_bytes());
    }

    #[test]
    fn rgba8_2d_texture_gets_both_views() {
        let mut backend = FakeBackend::new();
        let mut symbols = SymbolTable::new();
        let tex = texture_symbol(&mut symbols, "ColorTex");
        let descriptor = TextureDescriptor {
            name: "ColorTex".to_string(),
            symbol: tex,
            dimension: 2,
            width: 256,
            height: 256,
            depth: 1,
            mip_levels: 1,
            format: TextureFormat::RGBA8,
            annotations: Vec::new(),
        };
        let resources = EffectResources::new(&mut backend, &symbols, &[], &[descriptor], &[]).unwrap();
        assert!(resources.sampler_view(tex, false).is_some());
        assert!(resources.sampler_view(tex, true).is_some());
        assert_ne!(resources.sampler_view(tex, false), resources.sampler_view(tex, true));
    }

    #[test]
    fn r32f_texture_has_no_srgb_view() {
        let mut backend = FakeBackend::new();
        let mut symbols = SymbolTable::new();
        let tex = texture_symbol(&mut symbols, "DepthTex");
        let descriptor = TextureDescriptor {
            name: "DepthTex".to_string(),
            symbol: tex,
            dimension: 2,
            width: 256,
            height: 256,
            depth: 1,
            mip_levels: 1,
            format: TextureFormat::R32F,
            annotations: Vec::new(),
        };
        let resources = EffectResources::new(&mut backend, &symbols, &[], &[descriptor], &[]).unwrap();
        assert_eq!(resources.sampler_view(tex, false), resources.sampler_view(tex, true));
    }
}
