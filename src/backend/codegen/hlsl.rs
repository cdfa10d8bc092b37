//! HLSL emission target. Shader Model 5-flavoured HLSL is close enough to
//! the shared AST's native vocabulary that this target is mostly a type-name
//! table — intrinsic names, `mul`, `ddx`/`ddy`, `asfloat`/`asint`/`asuint`
//! and `f16tof32`/`f32tof16` are already HLSL-native and pass straight
//! through.

use super::Target;
use crate::ast::{BaseClass, Type};

pub struct Hlsl;

impl Target for Hlsl {
    fn type_name(&self, ty: &Type) -> String {
        hlsl_type_name(ty)
    }

    fn intrinsic_call(&self, name: &str, args: &[String]) -> String {
        format!("{name}({})", args.join(", "))
    }

    fn vertex_return(&self, expr: &str) -> String {
        format!("return {expr};\n")
    }

    fn uniform_block(&self, buffer: u32, name: &str, fields: &[(String, Type)]) -> String {
        let mut s = format!("cbuffer {name} : register(b{buffer})\n{{\n");
        for (field_name, ty) in fields {
            s.push_str(&format!("    {} {field_name};\n", hlsl_type_name(ty)));
        }
        s.push_str("};\n");
        s
    }
}

fn hlsl_type_name(ty: &Type) -> String {
    let base = match ty.base_class {
        BaseClass::Void => "void",
        BaseClass::Bool => "bool",
        BaseClass::Int => "int",
        BaseClass::Uint => "uint",
        BaseClass::Half => "half",
        BaseClass::Float => "float",
        BaseClass::Double => "double",
        BaseClass::String => "string",
        BaseClass::Struct => "/* struct */",
        BaseClass::Texture1D => "Texture1D",
        BaseClass::Texture2D => "Texture2D",
        BaseClass::Texture3D => "Texture3D",
        BaseClass::Sampler1D | BaseClass::Sampler2D | BaseClass::Sampler3D => "SamplerState",
    };
    if ty.cols >= 2 {
        format!("{base}{}x{}", ty.rows, ty.cols)
    } else if ty.rows > 1 {
        format!("{base}{}", ty.rows)
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_type_gets_row_suffix() {
        let ty = Type::vector(BaseClass::Float, 3);
        assert_eq!(hlsl_type_name(&ty), "float3");
    }

    #[test]
    fn matrix_type_gets_rows_by_cols_suffix() {
        let ty = Type::matrix(BaseClass::Float, 4, 4);
        assert_eq!(hlsl_type_name(&ty), "float4x4");
    }

    #[test]
    fn sampler2d_maps_to_sampler_state() {
        let ty = Type::scalar(BaseClass::Sampler2D);
        assert_eq!(hlsl_type_name(&ty), "SamplerState");
    }
}
