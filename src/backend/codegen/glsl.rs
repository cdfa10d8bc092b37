//! GLSL emission target. Translates the HLSL-flavoured intrinsic
//! vocabulary the parser understands into GLSL equivalents (§4.3): `lerp`
//! -> `mix`, `saturate` -> `clamp(·, 0, 1)`, `frac` -> `fract`, `atan2` ->
//! `atan`, `mul(a, b)` -> `a * b`, `ddx`/`ddy` -> `dFdx`/`dFdy`,
//! `asfloat`/`asint`/`asuint` -> `*BitsTo*`, `f16tof32`/`f32tof16` -> the
//! pack/unpackHalf2x16 bit-shuffle, and the `texNd*` family -> `texture`/
//! `textureLod`/`texelFetch`/`textureGather`/`textureSize`.

use super::Target;
use crate::ast::{BaseClass, Type};

pub struct Glsl;

impl Target for Glsl {
    fn type_name(&self, ty: &Type) -> String {
        glsl_type_name(ty)
    }

    fn intrinsic_call(&self, name: &str, args: &[String]) -> String {
        if let Some(rendered) = texture_intrinsic(name, args) {
            return rendered;
        }
        match name {
            "lerp" => format!("mix({}, {}, {})", args[0], args[1], args[2]),
            "saturate" => format!("clamp({}, 0.0, 1.0)", args[0]),
            "frac" => format!("fract({})", args[0]),
            "atan2" => format!("atan({}, {})", args[0], args[1]),
            "mul" if args.len() == 2 => format!("({} * {})", args[0], args[1]),
            "ddx" => format!("dFdx({})", args[0]),
            "ddy" => format!("dFdy({})", args[0]),
            "ddx_coarse" | "ddx_fine" => format!("dFdx({})", args[0]),
            "ddy_coarse" | "ddy_fine" => format!("dFdy({})", args[0]),
            "asfloat" => format!("uintBitsToFloat({})", args[0]),
            "asint" => format!("floatBitsToInt({})", args[0]),
            "asuint" => format!("floatBitsToUint({})", args[0]),
            "f16tof32" => format!("unpackHalf2x16({}).x", args[0]),
            "f32tof16" => format!("packHalf2x16(vec2({}, 0.0))", args[0]),
            _ => format!("{name}({})", args.join(", ")),
        }
    }

    fn vertex_return(&self, expr: &str) -> String {
        format!(
            "gl_Position = {expr};\n    gl_Position = gl_Position * vec4(1.0, -1.0, 2.0, 1.0) - vec4(0.0, 0.0, gl_Position.w, 0.0);\n    return;\n"
        )
    }

    fn uniform_block(&self, buffer: u32, name: &str, fields: &[(String, Type)]) -> String {
        let mut s = format!("layout(std140, binding = {buffer}) uniform {name}\n{{\n");
        for (field_name, ty) in fields {
            s.push_str(&format!("    {} {field_name};\n", glsl_type_name(ty)));
        }
        s.push_str("};\n");
        s
    }
}

/// Maps the `tex1D`/`tex2D`/`tex3D` intrinsic family (and their `offset`,
/// `lod`, `fetch`, `bias`, `size`, `gather` suffixed siblings) onto GLSL's
/// texture-sampling builtins. Returns `None` for anything not in this
/// family, same shape as [`crate::parser::intrinsics::result_type`]'s
/// name-based dispatch.
fn texture_intrinsic(name: &str, args: &[String]) -> Option<String> {
    if !name.starts_with("tex") {
        return None;
    }
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    Some(if name.ends_with("size") {
        format!("textureSize({}, 0)", arg(0))
    } else if name.contains("gatheroffset") {
        format!("textureGatherOffset({}, {}, {})", arg(0), arg(1), arg(2))
    } else if name.contains("gather") {
        format!("textureGather({}, {})", arg(0), arg(1))
    } else if name.contains("lodoffset") {
        format!("textureLodOffset({}, {}, {}, {})", arg(0), arg(1), arg(2), arg(3))
    } else if name.contains("lod") {
        format!("textureLod({}, {}, {})", arg(0), arg(1), arg(2))
    } else if name.contains("fetch") {
        format!("texelFetch({}, {}, 0)", arg(0), arg(1))
    } else if name.contains("offset") {
        format!("textureOffset({}, {}, {})", arg(0), arg(1), arg(2))
    } else if name.contains("bias") {
        format!("texture({}, {}, {})", arg(0), arg(1), arg(2))
    } else {
        format!("texture({}, {})", arg(0), arg(1))
    })
}

fn glsl_type_name(ty: &Type) -> String {
    let base = match ty.base_class {
        BaseClass::Void => "void",
        BaseClass::Bool => "bool",
        BaseClass::Int => "int",
        BaseClass::Uint => "uint",
        BaseClass::Half | BaseClass::Float => "float",
        BaseClass::Double => "double",
        BaseClass::String => "string",
        BaseClass::Struct => "/* struct */",
        BaseClass::Texture1D | BaseClass::Sampler1D => "sampler1D",
        BaseClass::Texture2D | BaseClass::Sampler2D => "sampler2D",
        BaseClass::Texture3D | BaseClass::Sampler3D => "sampler3D",
    };
    if ty.cols >= 2 {
        format!("mat{}x{}", ty.cols, ty.rows)
    } else if ty.rows > 1 {
        match ty.base_class {
            BaseClass::Bool => format!("bvec{}", ty.rows),
            BaseClass::Int => format!("ivec{}", ty.rows),
            BaseClass::Uint => format!("uvec{}", ty.rows),
            BaseClass::Double => format!("dvec{}", ty.rows),
            _ => format!("vec{}", ty.rows),
        }
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_becomes_mix() {
        let g = Glsl;
        let args = vec!["a".to_string(), "b".to_string(), "t".to_string()];
        assert_eq!(g.intrinsic_call("lerp", &args), "mix(a, b, t)");
    }

    #[test]
    fn mul_two_args_becomes_multiplication() {
        let g = Glsl;
        let args = vec!["m".to_string(), "v".to_string()];
        assert_eq!(g.intrinsic_call("mul", &args), "(m * v)");
    }

    #[test]
    fn tex2d_becomes_texture() {
        let g = Glsl;
        let args = vec!["s".to_string(), "uv".to_string()];
        assert_eq!(g.intrinsic_call("tex2D", &args), "texture(s, uv)");
    }

    #[test]
    fn tex2dlod_becomes_texture_lod() {
        let g = Glsl;
        let args = vec!["s".to_string(), "uv".to_string(), "0.0".to_string()];
        assert_eq!(g.intrinsic_call("tex2Dlod", &args), "textureLod(s, uv, 0.0)");
    }

    #[test]
    fn int_vector_uses_ivec_prefix() {
        let ty = Type::vector(BaseClass::Int, 2);
        assert_eq!(glsl_type_name(&ty), "ivec2");
    }
}
