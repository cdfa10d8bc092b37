//! Property-block parsing shared by texture/sampler declarations and pass
//! bodies: `{ Name = value; … }` where `value` is either an identifier
//! naming a known enum member or a literal expression. Enum member lookup
//! is case-insensitive against a fixed map (§4.2, §6).

use std::collections::HashMap;

use crate::ast::pass::{
    AddressMode, BlendFactor, BlendOp, CompareFunc, CullMode, FillMode, FilterMode, StencilOp,
};
use crate::ast::TextureFormat;

fn ci_lookup<'a, T: Copy>(table: &'a [(&'a str, T)], name: &str) -> Option<T> {
    table
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, v)| *v)
}

pub fn filter_mode(name: &str) -> Option<FilterMode> {
    ci_lookup(
        &[
            ("NONE", FilterMode::None),
            ("POINT", FilterMode::Point),
            ("LINEAR", FilterMode::Linear),
            ("ANISOTROPIC", FilterMode::Anisotropic),
        ],
        name,
    )
}

pub fn address_mode(name: &str) -> Option<AddressMode> {
    ci_lookup(
        &[
            ("CLAMP", AddressMode::Clamp),
            ("REPEAT", AddressMode::Repeat),
            ("MIRROR", AddressMode::Mirror),
            ("BORDER", AddressMode::Border),
        ],
        name,
    )
}

pub fn texture_format(name: &str) -> Option<TextureFormat> {
    ci_lookup(
        &[
            ("R8", TextureFormat::R8),
            ("R32F", TextureFormat::R32F),
            ("RG8", TextureFormat::RG8),
            ("RGBA8", TextureFormat::RGBA8),
            ("RGBA16", TextureFormat::RGBA16),
            ("RGBA16F", TextureFormat::RGBA16F),
            ("RGBA32F", TextureFormat::RGBA32F),
            ("DXT1", TextureFormat::Dxt1),
            ("DXT3", TextureFormat::Dxt3),
            ("DXT5", TextureFormat::Dxt5),
            ("LATC1", TextureFormat::Latc1),
            ("LATC2", TextureFormat::Latc2),
        ],
        name,
    )
}

pub fn blend_factor(name: &str) -> Option<BlendFactor> {
    ci_lookup(
        &[
            ("ZERO", BlendFactor::Zero),
            ("ONE", BlendFactor::One),
            ("SRCCOLOR", BlendFactor::SrcColor),
            ("SRCALPHA", BlendFactor::SrcAlpha),
            ("INVSRCCOLOR", BlendFactor::InvSrcColor),
            ("INVSRCALPHA", BlendFactor::InvSrcAlpha),
            ("DESTCOLOR", BlendFactor::DestColor),
            ("DESTALPHA", BlendFactor::DestAlpha),
            ("INVDESTCOLOR", BlendFactor::InvDestColor),
            ("INVDESTALPHA", BlendFactor::InvDestAlpha),
        ],
        name,
    )
}

pub fn blend_op(name: &str) -> Option<BlendOp> {
    ci_lookup(
        &[
            ("ADD", BlendOp::Add),
            ("SUBTRACT", BlendOp::Subtract),
            ("REVSUBTRACT", BlendOp::RevSubtract),
            ("MIN", BlendOp::Min),
            ("MAX", BlendOp::Max),
        ],
        name,
    )
}

pub fn compare_func(name: &str) -> Option<CompareFunc> {
    ci_lookup(
        &[
            ("NEVER", CompareFunc::Never),
            ("LESS", CompareFunc::Less),
            ("EQUAL", CompareFunc::Equal),
            ("LESSEQUAL", CompareFunc::LessEqual),
            ("GREATER", CompareFunc::Greater),
            ("NOTEQUAL", CompareFunc::NotEqual),
            ("GREATEREQUAL", CompareFunc::GreaterEqual),
            ("ALWAYS", CompareFunc::Always),
        ],
        name,
    )
}

pub fn stencil_op(name: &str) -> Option<StencilOp> {
    ci_lookup(
        &[
            ("KEEP", StencilOp::Keep),
            ("ZERO", StencilOp::Zero),
            ("REPLACE", StencilOp::Replace),
            ("INVERT", StencilOp::Invert),
            ("INCR", StencilOp::Incr),
            ("INCRSAT", StencilOp::IncrSat),
            ("DECR", StencilOp::Decr),
            ("DECRSAT", StencilOp::DecrSat),
        ],
        name,
    )
}

pub fn cull_mode(name: &str) -> Option<CullMode> {
    ci_lookup(
        &[
            ("NONE", CullMode::None),
            ("FRONT", CullMode::Front),
            ("BACK", CullMode::Back),
        ],
        name,
    )
}

pub fn fill_mode(name: &str) -> Option<FillMode> {
    ci_lookup(
        &[
            ("SOLID", FillMode::Solid),
            ("WIREFRAME", FillMode::Wireframe),
        ],
        name,
    )
}

/// Case-sensitive table of recognised pass state property names (§6); used
/// only to validate that a property block doesn't assign to an unknown key
/// (diagnostic 3004).
pub fn known_pass_state_keys() -> &'static HashMap<&'static str, ()> {
    use std::sync::OnceLock;
    static KEYS: OnceLock<HashMap<&'static str, ()>> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut map = HashMap::new();
        for key in [
            "VertexShader",
            "PixelShader",
            "RenderTarget0",
            "RenderTarget1",
            "RenderTarget2",
            "RenderTarget3",
            "RenderTarget4",
            "RenderTarget5",
            "RenderTarget6",
            "RenderTarget7",
            "BlendEnable",
            "SrcBlend",
            "DestBlend",
            "BlendOp",
            "BlendOpAlpha",
            "SRGBWriteEnable",
            "DepthEnable",
            "DepthFunc",
            "DepthWriteMask",
            "StencilEnable",
            "StencilRef",
            "StencilReadMask",
            "StencilWriteMask",
            "StencilFunc",
            "StencilPass",
            "StencilFail",
            "StencilZFail",
            "ScissorEnable",
            "CullMode",
            "FillMode",
            "AlphaToCoverageEnable",
        ] {
            map.insert(key, ());
        }
        map
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_lookup_is_case_insensitive() {
        assert_eq!(filter_mode("linear"), Some(FilterMode::Linear));
        assert_eq!(filter_mode("LINEAR"), Some(FilterMode::Linear));
        assert_eq!(filter_mode("bogus"), None);
    }

    #[test]
    fn pass_state_keys_recognise_render_targets() {
        assert!(known_pass_state_keys().contains_key("RenderTarget0"));
        assert!(!known_pass_state_keys().contains_key("RenderTarget8"));
    }
}
