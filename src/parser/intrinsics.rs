//! C3: the intrinsic function table. A fixed catalogue of built-in
//! functions keyed by name; overload resolution treats each entry as just
//! another candidate signature alongside user-defined functions.

use crate::ast::{BaseClass, Type};

#[derive(Debug, Clone, Copy)]
pub struct IntrinsicSignature {
    pub name: &'static str,
    pub return_base: BaseClass,
    /// Parameter base classes; shape (scalar/vector/matrix) is taken from
    /// the first matching argument at call-resolution time for the
    /// "any numeric shape" intrinsics (the common case), so only base class
    /// is tabulated here for brevity — genericity over component count is
    /// handled by the caller trying rows 1..=4 for each `arity`.
    pub params: &'static [BaseClass],
    /// Whether this intrinsic can be constant-folded (§4.2 constant folding
    /// subset).
    pub foldable: bool,
}

macro_rules! intrinsic {
    ($name:literal, $ret:ident, [$($p:ident),*], $fold:literal) => {
        IntrinsicSignature {
            name: $name,
            return_base: BaseClass::$ret,
            params: &[$(BaseClass::$p),*],
            foldable: $fold,
        }
    };
}

pub static INTRINSICS: &[IntrinsicSignature] = &[
    intrinsic!("abs", Float, [Float], true),
    intrinsic!("sign", Float, [Float], false),
    intrinsic!("ceil", Float, [Float], true),
    intrinsic!("floor", Float, [Float], true),
    intrinsic!("frac", Float, [Float], false),
    intrinsic!("sqrt", Float, [Float], true),
    intrinsic!("rsqrt", Float, [Float], false),
    intrinsic!("exp", Float, [Float], true),
    intrinsic!("exp2", Float, [Float], false),
    intrinsic!("log", Float, [Float], true),
    intrinsic!("log2", Float, [Float], false),
    intrinsic!("log10", Float, [Float], true),
    intrinsic!("pow", Float, [Float, Float], true),
    intrinsic!("sin", Float, [Float], true),
    intrinsic!("cos", Float, [Float], true),
    intrinsic!("tan", Float, [Float], true),
    intrinsic!("asin", Float, [Float], true),
    intrinsic!("acos", Float, [Float], true),
    intrinsic!("atan", Float, [Float], true),
    intrinsic!("atan2", Float, [Float, Float], true),
    intrinsic!("sinh", Float, [Float], true),
    intrinsic!("cosh", Float, [Float], true),
    intrinsic!("tanh", Float, [Float], true),
    intrinsic!("min", Float, [Float, Float], true),
    intrinsic!("max", Float, [Float, Float], true),
    intrinsic!("clamp", Float, [Float, Float, Float], false),
    intrinsic!("lerp", Float, [Float, Float, Float], false),
    intrinsic!("saturate", Float, [Float], false),
    intrinsic!("step", Float, [Float, Float], false),
    intrinsic!("smoothstep", Float, [Float, Float, Float], false),
    intrinsic!("dot", Float, [Float, Float], false),
    intrinsic!("cross", Float, [Float, Float], false),
    intrinsic!("normalize", Float, [Float], false),
    intrinsic!("length", Float, [Float], false),
    intrinsic!("distance", Float, [Float, Float], false),
    intrinsic!("reflect", Float, [Float, Float], false),
    intrinsic!("refract", Float, [Float, Float, Float], false),
    intrinsic!("transpose", Float, [Float], false),
    intrinsic!("determinant", Float, [Float], false),
    intrinsic!("mul", Float, [Float, Float], false),
    intrinsic!("ddx", Float, [Float], false),
    intrinsic!("ddy", Float, [Float], false),
    intrinsic!("fwidth", Float, [Float], false),
    intrinsic!("asint", Int, [Float], true),
    intrinsic!("asuint", Uint, [Float], true),
    intrinsic!("asfloat", Float, [Int], true),
    intrinsic!("f16tof32", Float, [Uint], false),
    intrinsic!("f32tof16", Uint, [Float], false),
    intrinsic!("all", Bool, [Bool], false),
    intrinsic!("any", Bool, [Bool], false),
    intrinsic!("isnan", Bool, [Float], false),
    intrinsic!("isinf", Bool, [Float], false),
    intrinsic!("mad", Float, [Float, Float, Float], false),
    intrinsic!("tex1D", Float, [Sampler1D, Float], false),
    intrinsic!("tex1Dlod", Float, [Sampler1D, Float], false),
    intrinsic!("tex1Dfetch", Float, [Sampler1D, Int], false),
    intrinsic!("tex1Dsize", Int, [Sampler1D], false),
    intrinsic!("tex2D", Float, [Sampler2D, Float], false),
    intrinsic!("tex2Doffset", Float, [Sampler2D, Float, Int], false),
    intrinsic!("tex2Dlod", Float, [Sampler2D, Float], false),
    intrinsic!("tex2Dlodoffset", Float, [Sampler2D, Float, Int], false),
    intrinsic!("tex2Dfetch", Float, [Sampler2D, Int], false),
    intrinsic!("tex2Dbias", Float, [Sampler2D, Float], false),
    intrinsic!("tex2Dsize", Int, [Sampler2D], false),
    intrinsic!("tex2Dgather", Float, [Sampler2D, Float, Int], false),
    intrinsic!("tex2Dgatheroffset", Float, [Sampler2D, Float, Int, Int], false),
    intrinsic!("tex3D", Float, [Sampler3D, Float], false),
    intrinsic!("tex3Dlod", Float, [Sampler3D, Float], false),
    intrinsic!("tex3Dfetch", Float, [Sampler3D, Int], false),
    intrinsic!("tex3Dsize", Int, [Sampler3D], false),
];

pub fn lookup(name: &str) -> impl Iterator<Item = &'static IntrinsicSignature> {
    INTRINSICS.iter().filter(move |sig| sig.name == name)
}

/// Builds the concrete [`Type`] candidates for an intrinsic signature given
/// the actual argument shapes: scalar intrinsics (base class only tabulated)
/// are generic over component count, so the formal parameter shape is taken
/// to match the corresponding actual argument's shape whenever the argument
/// is itself numeric — this mirrors HLSL's component-wise generic
/// intrinsics without tabulating every arity by hand.
pub fn instantiate(sig: &IntrinsicSignature, actual: &[Type]) -> Vec<Type> {
    sig.params
        .iter()
        .zip(actual)
        .map(|(&base, arg)| {
            if base.is_numeric() && arg.base_class.is_numeric() {
                Type {
                    base_class: base,
                    rows: arg.rows,
                    cols: arg.cols,
                    array_length: 0,
                    qualifiers: Default::default(),
                    definition: None,
                }
            } else {
                Type::scalar(base)
            }
        })
        .collect()
}

/// Computes an intrinsic call's result type from its name and the actual
/// argument types. Most intrinsics are component-wise generic (the result
/// takes the widest argument shape, as tabulated by [`instantiate`]), but a
/// handful have a fixed or reduced shape that the generic rule gets wrong:
/// `tex*` sampling calls always return an RGBA float4, `dot`/`length`/
/// `distance`/`determinant`/`all`/`any` reduce to a scalar, and `cross`
/// always returns a float3.
pub fn result_type(name: &str, arg_types: &[Type]) -> Type {
    if name.starts_with("tex") && !name.ends_with("size") {
        return Type::vector(BaseClass::Float, 4);
    }
    match name {
        "tex1Dsize" => Type::scalar(BaseClass::Int),
        "tex2Dsize" => Type::vector(BaseClass::Int, 2),
        "tex3Dsize" => Type::vector(BaseClass::Int, 3),
        "dot" | "length" | "distance" | "determinant" => Type::scalar(BaseClass::Float),
        "all" | "any" => Type::scalar(BaseClass::Bool),
        "cross" => Type::vector(BaseClass::Float, 3),
        "transpose" => arg_types
            .first()
            .map(|t| Type::matrix(t.base_class, t.cols, t.rows))
            .unwrap_or_else(|| Type::scalar(BaseClass::Float)),
        _ => {
            let widest = arg_types
                .iter()
                .max_by_key(|t| t.components())
                .cloned()
                .unwrap_or_else(|| Type::scalar(BaseClass::Float));
            Type {
                base_class: BaseClass::Float,
                rows: widest.rows,
                cols: widest.cols,
                array_length: 0,
                qualifiers: Default::default(),
                definition: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_overloaded_name() {
        assert!(lookup("tex2D").count() >= 1);
        assert!(lookup("nonexistent").count() == 0);
    }

    #[test]
    fn instantiate_matches_argument_shape() {
        let sig = lookup("abs").next().unwrap();
        let actual = [Type::vector(BaseClass::Float, 3)];
        let params = instantiate(sig, &actual);
        assert_eq!(params[0].rows, 3);
    }
}
