//! Uniform buffer layout (§3 Uniform, the std140-equivalent packing rule).
//!
//! Global uniforms are packed into buffer 0 in declaration order;
//! struct-typed uniforms are given their own buffer by the caller (one
//! buffer per struct symbol) and laid out field-by-field with the same
//! rule. The rule itself: a field that fits in whatever is left of the
//! current 16-byte slot packs there; otherwise the cursor advances to the
//! next 16-byte boundary first.

use crate::ast::symbol::VariableSymbol;
use crate::ast::{BaseClass, Symbol, SymbolId, SymbolTable, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLayout {
    pub buffer: u32,
    pub offset: u32,
    pub size: u32,
    pub element_count: u32,
}

fn component_size(base: BaseClass) -> u32 {
    match base {
        BaseClass::Half => 2,
        BaseClass::Double => 8,
        _ => 4,
    }
}

/// Byte size of a single element of `ty`, ignoring array length.
pub fn element_size(ty: &Type) -> u32 {
    u32::from(ty.rows) * u32::from(ty.cols) * component_size(ty.base_class)
}

/// Total byte size of a uniform declaration. Arrays pad each element up to
/// a 16-byte boundary, matching std140 array stride rules.
pub fn declared_size(ty: &Type) -> u32 {
    let elem = element_size(ty);
    if ty.array_length > 0 {
        let stride = elem.div_ceil(16) * 16;
        stride * ty.array_length as u32
    } else {
        elem
    }
}

/// Returns the offset a field of `size` bytes lands at, given `cursor`
/// bytes already consumed: packs into the remainder of the current
/// 16-byte slot if it fits, otherwise rounds up to the next boundary.
pub fn pack16(cursor: u32, size: u32) -> u32 {
    let remaining = 16 - (cursor % 16);
    if size <= remaining {
        cursor
    } else {
        cursor + remaining
    }
}

/// Lays out every non-struct-typed global uniform into buffer 0, in
/// declaration order.
pub fn layout_globals(symbols: &SymbolTable, uniforms: &[SymbolId]) -> Vec<(SymbolId, UniformLayout)> {
    let mut cursor = 0u32;
    let mut out = Vec::with_capacity(uniforms.len());
    for &id in uniforms {
        let Symbol::Variable(VariableSymbol { ty, .. }) = symbols.get(id) else {
            continue;
        };
        if ty.base_class == BaseClass::Struct {
            continue;
        }
        let size = declared_size(ty);
        let offset = pack16(cursor, size);
        cursor = offset + size;
        out.push((
            id,
            UniformLayout {
                buffer: 0,
                offset,
                size,
                element_count: ty.array_length.max(1) as u32,
            },
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::symbol::VariableSymbol;
    use crate::lexer::Location;

    fn push_var(symbols: &mut SymbolTable, name: &str, ty: Type) -> SymbolId {
        symbols
            .insert(
                Symbol::Variable(VariableSymbol {
                    name: name.to_string(),
                    ty,
                    semantic: None,
                    annotations: Vec::new(),
                    initializer: None,
                    location: Location::default(),
                }),
                true,
            )
            .unwrap()
    }

    #[test]
    fn two_floats_share_a_slot() {
        let mut symbols = SymbolTable::new();
        let a = push_var(&mut symbols, "a", Type::scalar(BaseClass::Float));
        let b = push_var(&mut symbols, "b", Type::scalar(BaseClass::Float));
        let layout = layout_globals(&symbols, &[a, b]);
        assert_eq!(layout[0].1.offset, 0);
        assert_eq!(layout[1].1.offset, 4);
    }

    #[test]
    fn field_that_does_not_fit_advances_to_next_slot() {
        let mut symbols = SymbolTable::new();
        let a = push_var(&mut symbols, "a", Type::vector(BaseClass::Float, 3));
        let b = push_var(&mut symbols, "b", Type::vector(BaseClass::Float, 2));
        let layout = layout_globals(&symbols, &[a, b]);
        // `a` takes bytes 0..12, leaving 4 bytes in the slot: `b` needs 8,
        // doesn't fit, so it advances to the next 16-byte boundary.
        assert_eq!(layout[0].1.offset, 0);
        assert_eq!(layout[1].1.offset, 16);
    }

    #[test]
    fn exact_fit_packs_without_padding() {
        let mut symbols = SymbolTable::new();
        let a = push_var(&mut symbols, "a", Type::scalar(BaseClass::Float));
        let b = push_var(&mut symbols, "b", Type::vector(BaseClass::Float, 3));
        let layout = layout_globals(&symbols, &[a, b]);
        assert_eq!(layout[0].1.offset, 0);
        assert_eq!(layout[1].1.offset, 4);
    }

    #[test]
    fn array_elements_pad_to_sixteen_bytes() {
        let mut symbols = SymbolTable::new();
        let mut ty = Type::scalar(BaseClass::Float);
        ty.array_length = 3;
        let a = push_var(&mut symbols, "a", ty);
        let layout = layout_globals(&symbols, &[a]);
        assert_eq!(layout[0].1.size, 48);
    }
}
