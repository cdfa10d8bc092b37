//! Pass, texture and sampler descriptors (§3 data model).

use crate::ast::symbol::SymbolId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    R8,
    R32F,
    RG8,
    RGBA8,
    RGBA16,
    RGBA16F,
    RGBA32F,
    Dxt1,
    Dxt3,
    Dxt5,
    Latc1,
    Latc2,
    Unknown,
}

impl TextureFormat {
    /// Textures in these formats have a matching sRGB-encoded alias and
    /// therefore receive a second, sRGB shader-resource view.
    pub fn has_srgb_alias(self) -> bool {
        matches!(
            self,
            TextureFormat::RGBA8 | TextureFormat::Dxt1 | TextureFormat::Dxt3 | TextureFormat::Dxt5
        )
    }
}

#[derive(Debug, Clone)]
pub struct TextureDescriptor {
    pub name: String,
    /// The symbol samplers and pass render-target assignments reference.
    pub symbol: SymbolId,
    pub dimension: u8,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub format: TextureFormat,
    pub annotations: Vec<super::symbol::Annotation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    None,
    Point,
    Linear,
    Anisotropic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Clamp,
    Repeat,
    Mirror,
    Border,
}

#[derive(Debug, Clone)]
pub struct SamplerDescriptor {
    pub name: String,
    pub texture: SymbolId,
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub mip_filter: FilterMode,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub min_lod: f32,
    pub max_lod: f32,
    pub lod_bias: f32,
    pub max_anisotropy: u32,
    pub srgb: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    SrcAlpha,
    InvSrcColor,
    InvSrcAlpha,
    DestColor,
    DestAlpha,
    InvDestColor,
    InvDestAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOp {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunc {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    Invert,
    Incr,
    IncrSat,
    Decr,
    DecrSat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Clone, Copy)]
pub struct BlendState {
    pub enable: bool,
    pub src_rgb: BlendFactor,
    pub dst_rgb: BlendFactor,
    pub op_rgb: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_alpha: BlendOp,
    pub write_mask: u8,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enable: false,
            src_rgb: BlendFactor::One,
            dst_rgb: BlendFactor::Zero,
            op_rgb: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            op_alpha: BlendOp::Add,
            write_mask: 0b1111,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DepthState {
    pub enable: bool,
    pub func: CompareFunc,
    pub write_mask: bool,
}

impl Default for DepthState {
    fn default() -> Self {
        Self {
            enable: true,
            func: CompareFunc::Less,
            write_mask: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StencilState {
    pub enable: bool,
    pub func: CompareFunc,
    pub reference: u8,
    pub read_mask: u8,
    pub write_mask: u8,
    pub op_pass: StencilOp,
    pub op_fail: StencilOp,
    pub op_zfail: StencilOp,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enable: false,
            func: CompareFunc::Always,
            reference: 0,
            read_mask: 0xFF,
            write_mask: 0xFF,
            op_pass: StencilOp::Keep,
            op_fail: StencilOp::Keep,
            op_zfail: StencilOp::Keep,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RasterizerState {
    pub cull: CullMode,
    pub fill: FillMode,
    pub scissor_enable: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            cull: CullMode::None,
            fill: FillMode::Solid,
            scissor_enable: false,
        }
    }
}

/// The complete per-pass state block, built from `VertexShader = …;` style
/// property assignments inside a `pass { … }` block.
#[derive(Debug, Clone)]
pub struct PassState {
    pub vertex_shader: Option<SymbolId>,
    pub pixel_shader: Option<SymbolId>,
    /// `render_targets[0]` is `None` when the pass targets the back buffer.
    pub render_targets: [Option<SymbolId>; 8],
    pub blend: BlendState,
    pub depth: DepthState,
    pub stencil: StencilState,
    pub rasterizer: RasterizerState,
    pub srgb_write: bool,
    pub sample_alpha_to_coverage: bool,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            vertex_shader: None,
            pixel_shader: None,
            render_targets: [None; 8],
            blend: BlendState::default(),
            depth: DepthState::default(),
            stencil: StencilState::default(),
            rasterizer: RasterizerState::default(),
            srgb_write: false,
            sample_alpha_to_coverage: false,
        }
    }
}
