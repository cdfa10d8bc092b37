//! The value-type system shared by every AST expression and declaration.

use bitflags::bitflags;

use crate::util::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BaseClass {
    Void,
    Bool,
    Int,
    Uint,
    Half,
    Float,
    Double,
    String,
    Struct,
    Texture1D,
    Texture2D,
    Texture3D,
    Sampler1D,
    Sampler2D,
    Sampler3D,
}

impl BaseClass {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BaseClass::Bool
                | BaseClass::Int
                | BaseClass::Uint
                | BaseClass::Half
                | BaseClass::Float
                | BaseClass::Double
        )
    }

    pub fn is_sampler(self) -> bool {
        matches!(
            self,
            BaseClass::Sampler1D | BaseClass::Sampler2D | BaseClass::Sampler3D
        )
    }

    pub fn is_texture(self) -> bool {
        matches!(
            self,
            BaseClass::Texture1D | BaseClass::Texture2D | BaseClass::Texture3D
        )
    }

    /// Position in the widening lattice `bool < int < uint < half < float < double`,
    /// used by overload ranking and implicit conversion.
    pub fn promotion_rank(self) -> u8 {
        match self {
            BaseClass::Bool => 0,
            BaseClass::Int => 1,
            BaseClass::Uint => 2,
            BaseClass::Half => 3,
            BaseClass::Float => 4,
            BaseClass::Double => 5,
            _ => u8::MAX,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Qualifiers: u32 {
        const EXTERN          = 1 << 0;
        const STATIC          = 1 << 1;
        const UNIFORM         = 1 << 2;
        const CONST           = 1 << 3;
        const VOLATILE        = 1 << 4;
        const PRECISE         = 1 << 5;
        const IN              = 1 << 6;
        const OUT             = 1 << 7;
        const INOUT           = 1 << 8;
        const LINEAR          = 1 << 9;
        const NOPERSPECTIVE   = 1 << 10;
        const CENTROID        = 1 << 11;
        const NOINTERPOLATION = 1 << 12;
        const ROW_MAJOR       = 1 << 13;
        const COLUMN_MAJOR    = 1 << 14;
        const UNORM           = 1 << 15;
        const SNORM           = 1 << 16;
        const GROUPSHARED     = 1 << 17;
    }
}

/// The value type of an expression or declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    pub base_class: BaseClass,
    pub rows: u8,
    pub cols: u8,
    pub array_length: i32,
    pub qualifiers: Qualifiers,
    pub definition: Option<Key>,
}

impl Type {
    pub fn scalar(base_class: BaseClass) -> Self {
        Self {
            base_class,
            rows: 1,
            cols: 1,
            array_length: 0,
            qualifiers: Qualifiers::empty(),
            definition: None,
        }
    }

    pub fn vector(base_class: BaseClass, rows: u8) -> Self {
        debug_assert!((1..=4).contains(&rows));
        Self {
            base_class,
            rows,
            cols: 1,
            array_length: 0,
            qualifiers: Qualifiers::empty(),
            definition: None,
        }
    }

    pub fn matrix(base_class: BaseClass, rows: u8, cols: u8) -> Self {
        debug_assert!((1..=4).contains(&rows) && (2..=4).contains(&cols));
        Self {
            base_class,
            rows,
            cols,
            array_length: 0,
            qualifiers: Qualifiers::empty(),
            definition: None,
        }
    }

    pub fn void() -> Self {
        Self::scalar(BaseClass::Void)
    }

    pub fn is_scalar(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    pub fn is_vector(&self) -> bool {
        self.rows > 1 && self.cols == 1
    }

    pub fn is_matrix(&self) -> bool {
        self.cols >= 2
    }

    pub fn is_array(&self) -> bool {
        self.array_length != 0
    }

    pub fn components(&self) -> u32 {
        self.rows as u32 * self.cols as u32
    }

    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Equality of shape and base class, ignoring qualifiers — used by overload
    /// ranking and assignability checks.
    pub fn shape_eq(&self, other: &Type) -> bool {
        self.base_class == other.base_class
            && self.rows == other.rows
            && self.cols == other.cols
            && self.array_length == other.array_length
            && self.definition == other.definition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_invariants() {
        let sampler = Type::scalar(BaseClass::Sampler2D);
        assert!(sampler.base_class.is_sampler());

        let mat = Type::matrix(BaseClass::Float, 4, 4);
        assert!(mat.is_matrix());
        assert!(mat.cols >= 2);
    }

    #[test]
    fn promotion_lattice_is_monotonic() {
        let ranks = [
            BaseClass::Bool,
            BaseClass::Int,
            BaseClass::Uint,
            BaseClass::Half,
            BaseClass::Float,
            BaseClass::Double,
        ]
        .map(BaseClass::promotion_rank);
        for window in ranks.windows(2) {
            assert!(window[0] < window[1]);
        }
    }
}
