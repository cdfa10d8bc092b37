//! Constant folding (§4.2). Operates on already type-checked [`Node`]s and
//! produces a replacement [`Literal`] node when every operand is itself a
//! literal and the operator is in the foldable subset.

use crate::ast::node::{BinaryOp, UnaryOp};
use crate::ast::{BaseClass, Type};
use crate::lexer::Literal;

/// Numeric value used purely for constant-folding arithmetic, independent of
/// the component count — vectors are folded component-wise by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i32),
    Uint(u32),
    Float(f32),
    Double(f64),
}

impl Scalar {
    pub fn from_literal(lit: &Literal) -> Scalar {
        match *lit {
            Literal::Bool(b) => Scalar::Bool(b),
            Literal::Int(i) => Scalar::Int(i),
            Literal::Uint(u) => Scalar::Uint(u),
            Literal::Float(f) => Scalar::Float(f),
            Literal::Double(d) => Scalar::Double(d),
        }
    }

    pub fn into_literal(self) -> Literal {
        match self {
            Scalar::Bool(b) => Literal::Bool(b),
            Scalar::Int(i) => Literal::Int(i),
            Scalar::Uint(u) => Literal::Uint(u),
            Scalar::Float(f) => Literal::Float(f),
            Scalar::Double(d) => Literal::Double(d),
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Scalar::Bool(b) => b as u8 as f64,
            Scalar::Int(i) => i as f64,
            Scalar::Uint(u) => u as f64,
            Scalar::Float(f) => f as f64,
            Scalar::Double(d) => d,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Scalar::Bool(b) => b as i64,
            Scalar::Int(i) => i as i64,
            Scalar::Uint(u) => u as i64,
            Scalar::Float(f) => f as i64,
            Scalar::Double(d) => d as i64,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            Scalar::Bool(b) => b,
            Scalar::Int(i) => i != 0,
            Scalar::Uint(u) => u != 0,
            Scalar::Float(f) => f != 0.0,
            Scalar::Double(d) => d != 0.0,
        }
    }

    /// Casts this value to `target`, applying the same promotion rules used
    /// by explicit casts elsewhere in the type checker.
    pub fn cast_to(self, target: BaseClass) -> Scalar {
        match target {
            BaseClass::Bool => Scalar::Bool(self.as_bool()),
            BaseClass::Int => Scalar::Int(self.as_i64() as i32),
            BaseClass::Uint => Scalar::Uint(self.as_i64() as u32),
            BaseClass::Half | BaseClass::Float => Scalar::Float(self.as_f64() as f32),
            BaseClass::Double => Scalar::Double(self.as_f64()),
            _ => self,
        }
    }
}

fn promote_pair(a: Scalar, b: Scalar) -> BaseClass {
    fn rank(s: Scalar) -> BaseClass {
        match s {
            Scalar::Bool(_) => BaseClass::Bool,
            Scalar::Int(_) => BaseClass::Int,
            Scalar::Uint(_) => BaseClass::Uint,
            Scalar::Float(_) => BaseClass::Float,
            Scalar::Double(_) => BaseClass::Double,
        }
    }
    let (ra, rb) = (rank(a), rank(b));
    if ra.promotion_rank() >= rb.promotion_rank() {
        ra
    } else {
        rb
    }
}

pub fn fold_unary(op: UnaryOp, operand: Scalar, ty: &Type) -> Option<Scalar> {
    Some(match op {
        UnaryOp::Negate => match operand {
            Scalar::Int(i) => Scalar::Int(-i),
            Scalar::Uint(u) => Scalar::Uint(u.wrapping_neg()),
            Scalar::Float(f) => Scalar::Float(-f),
            Scalar::Double(d) => Scalar::Double(-d),
            Scalar::Bool(_) => return None,
        },
        UnaryOp::Not => Scalar::Bool(!operand.as_bool()),
        UnaryOp::BitNot => match operand {
            Scalar::Int(i) => Scalar::Int(!i),
            Scalar::Uint(u) => Scalar::Uint(!u),
            _ => return None,
        },
        UnaryOp::Cast => operand.cast_to(ty.base_class),
        _ => return None,
    })
}

pub fn fold_binary(op: BinaryOp, lhs: Scalar, rhs: Scalar) -> Option<Scalar> {
    let target = promote_pair(lhs, rhs);
    let (l, r) = (lhs.cast_to(target), rhs.cast_to(target));

    Some(match op {
        BinaryOp::Add => arith(l, r, |a, b| a + b, |a, b| a.wrapping_add(b), |a, b| a + b, |a, b| a + b),
        BinaryOp::Sub => arith(l, r, |a, b| a - b, |a, b| a.wrapping_sub(b), |a, b| a - b, |a, b| a - b),
        BinaryOp::Mul => arith(l, r, |a, b| a * b, |a, b| a.wrapping_mul(b), |a, b| a * b, |a, b| a * b),
        BinaryOp::Div => {
            if r.as_f64() == 0.0 {
                return None;
            }
            arith(l, r, |a, b| a / b, |a, b| a.wrapping_div(b), |a, b| a / b, |a, b| a / b)
        }
        BinaryOp::Mod => {
            if r.as_f64() == 0.0 {
                return None;
            }
            arith(l, r, |a, b| a % b, |a, b| a.wrapping_rem(b), |a, b| a % b, |a, b| a % b)
        }
        BinaryOp::BitAnd => int_only(l, r, |a, b| a & b, |a, b| a & b)?,
        BinaryOp::BitOr => int_only(l, r, |a, b| a | b, |a, b| a | b)?,
        BinaryOp::BitXor => int_only(l, r, |a, b| a ^ b, |a, b| a ^ b)?,
        BinaryOp::Shl => int_only(l, r, |a, b| a << b, |a, b| a << b)?,
        BinaryOp::Shr => int_only(l, r, |a, b| a >> b, |a, b| a >> b)?,
        BinaryOp::Less => Scalar::Bool(l.as_f64() < r.as_f64()),
        BinaryOp::Greater => Scalar::Bool(l.as_f64() > r.as_f64()),
        BinaryOp::LessEqual => Scalar::Bool(l.as_f64() <= r.as_f64()),
        BinaryOp::GreaterEqual => Scalar::Bool(l.as_f64() >= r.as_f64()),
        BinaryOp::Equal => Scalar::Bool(l.as_f64() == r.as_f64()),
        BinaryOp::NotEqual => Scalar::Bool(l.as_f64() != r.as_f64()),
        BinaryOp::And => Scalar::Bool(lhs.as_bool() && rhs.as_bool()),
        BinaryOp::Or => Scalar::Bool(lhs.as_bool() || rhs.as_bool()),
    })
}

fn arith(
    l: Scalar,
    r: Scalar,
    ff: fn(f64, f64) -> f64,
    fi: fn(i32, i32) -> i32,
    fu: fn(u32, u32) -> u32,
    fd: fn(f32, f32) -> f32,
) -> Scalar {
    match (l, r) {
        (Scalar::Int(a), Scalar::Int(b)) => Scalar::Int(fi(a, b)),
        (Scalar::Uint(a), Scalar::Uint(b)) => Scalar::Uint(fu(a, b)),
        (Scalar::Float(a), Scalar::Float(b)) => Scalar::Float(fd(a, b)),
        (Scalar::Double(a), Scalar::Double(b)) => Scalar::Double(ff(a, b)),
        _ => Scalar::Double(ff(l.as_f64(), r.as_f64())),
    }
}

fn int_only(
    l: Scalar,
    r: Scalar,
    fi: fn(i32, i32) -> i32,
    fu: fn(u32, u32) -> u32,
) -> Option<Scalar> {
    Some(match (l, r) {
        (Scalar::Int(a), Scalar::Int(b)) => Scalar::Int(fi(a, b)),
        (Scalar::Uint(a), Scalar::Uint(b)) => Scalar::Uint(fu(a, b)),
        _ => return None,
    })
}

/// Bit-reinterpreting casts, distinct from [`Scalar::cast_to`]'s numeric
/// conversion: `asfloat(0x3F800000)` must yield `1.0`, not `1065353216.0`.
pub fn fold_bitcast(name: &str, arg: Scalar) -> Option<Scalar> {
    Some(match (name, arg) {
        ("asfloat", Scalar::Int(i)) => Scalar::Float(f32::from_bits(i as u32)),
        ("asfloat", Scalar::Uint(u)) => Scalar::Float(f32::from_bits(u)),
        ("asint", Scalar::Float(f)) => Scalar::Int(f.to_bits() as i32),
        ("asuint", Scalar::Float(f)) => Scalar::Uint(f.to_bits()),
        _ => return None,
    })
}

/// Attempts to fold a subset of intrinsic calls with all-literal arguments.
pub fn fold_intrinsic(name: &str, args: &[Scalar]) -> Option<Scalar> {
    if args.len() == 1 {
        if let Some(v) = fold_bitcast(name, args[0]) {
            return Some(v);
        }
    }
    let f = |s: Scalar| s.as_f64();
    let result = match (name, args) {
        ("abs", [a]) => f(*a).abs(),
        ("sqrt", [a]) if f(*a) >= 0.0 => f(*a).sqrt(),
        ("ceil", [a]) => f(*a).ceil(),
        ("floor", [a]) => f(*a).floor(),
        ("exp", [a]) => f(*a).exp(),
        ("log", [a]) if f(*a) > 0.0 => f(*a).ln(),
        ("log10", [a]) if f(*a) > 0.0 => f(*a).log10(),
        ("sin", [a]) => f(*a).sin(),
        ("cos", [a]) => f(*a).cos(),
        ("tan", [a]) => f(*a).tan(),
        ("asin", [a]) => f(*a).asin(),
        ("acos", [a]) => f(*a).acos(),
        ("atan", [a]) => f(*a).atan(),
        ("sinh", [a]) => f(*a).sinh(),
        ("cosh", [a]) => f(*a).cosh(),
        ("tanh", [a]) => f(*a).tanh(),
        ("atan2", [a, b]) => f(*a).atan2(f(*b)),
        ("pow", [a, b]) => f(*a).powf(f(*b)),
        ("min", [a, b]) => f(*a).min(f(*b)),
        ("max", [a, b]) => f(*a).max(f(*b)),
        _ => return None,
    };
    Some(Scalar::Double(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_operator_precedence_arithmetic() {
        // 2 + 3 * 4 -> 14
        let mul = fold_binary(BinaryOp::Mul, Scalar::Int(3), Scalar::Int(4)).unwrap();
        let add = fold_binary(BinaryOp::Add, Scalar::Int(2), mul).unwrap();
        assert_eq!(add, Scalar::Int(14));
    }

    #[test]
    fn asfloat_reinterprets_bits() {
        let folded = fold_bitcast("asfloat", Scalar::Uint(0x3F800000)).unwrap();
        assert_eq!(folded, Scalar::Float(1.0));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        assert!(fold_binary(BinaryOp::Div, Scalar::Int(1), Scalar::Int(0)).is_none());
    }

    #[test]
    fn bitwise_not_requires_integral() {
        assert!(fold_unary(UnaryOp::BitNot, Scalar::Float(1.0), &Type::scalar(BaseClass::Float)).is_none());
    }
}
