//! Type tags carried by constants, fields, parameters and resources.

use std::fmt;

use smallvec::SmallVec;

/// Scalar data type of a [`Value`](super::value::Value).
///
/// `Bits`, `SInt` and `UInt` form the bits family: they share the same two's-complement storage and
/// differ only in how the logical integer is read back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Bits(u32),
    SInt(u32),
    UInt(u32),
}

impl DataType {
    pub const fn bool() -> Self {
        DataType::Bool
    }

    pub const fn bits(width: u32) -> Self {
        DataType::Bits(width)
    }

    pub const fn sint(width: u32) -> Self {
        DataType::SInt(width)
    }

    pub const fn uint(width: u32) -> Self {
        DataType::UInt(width)
    }

    pub const fn bit_width(self) -> u32 {
        match self {
            DataType::Bool => 1,
            DataType::Bits(width) | DataType::SInt(width) | DataType::UInt(width) => width,
        }
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, DataType::SInt(_))
    }

    pub const fn is_bool(self) -> bool {
        matches!(self, DataType::Bool)
    }

    pub const fn is_bits_family(self) -> bool {
        !self.is_bool()
    }

    /// Same family with a different width. A boolean becomes `Bits<width>` unless the width is 1.
    pub const fn with_bit_width(self, width: u32) -> Self {
        match self {
            DataType::Bool if width == 1 => DataType::Bool,
            DataType::Bool | DataType::Bits(_) => DataType::Bits(width),
            DataType::SInt(_) => DataType::SInt(width),
            DataType::UInt(_) => DataType::UInt(width),
        }
    }

    pub const fn to_bits(self) -> Self {
        DataType::Bits(self.bit_width())
    }

    /// A cast is trivial when both types share the same memory representation, i.e. the same
    /// bit width. No bits change; only the interpretation does.
    pub const fn is_trivial_cast_to(self, other: DataType) -> bool {
        self.bit_width() == other.bit_width()
    }

    /// Number of bits needed to represent `value` as an unsigned index (at least 1).
    pub const fn minimal_required_width_for(value: u64) -> u32 {
        if value == 0 {
            1
        } else {
            u64::BITS - value.leading_zeros()
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "Bool"),
            DataType::Bits(width) => write!(f, "Bits<{width}>"),
            DataType::SInt(width) => write!(f, "SInt<{width}>"),
            DataType::UInt(width) => write!(f, "UInt<{width}>"),
        }
    }
}

/// Type of any [`Constant`](super::constant::Constant).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Data(DataType),
    Tuple(TupleType),
    BitSlice,
    Str,
}

impl Type {
    pub fn as_data(&self) -> Option<DataType> {
        match self {
            Type::Data(ty) => Some(*ty),
            _ => None,
        }
    }
}

impl From<DataType> for Type {
    fn from(value: DataType) -> Self {
        Type::Data(value)
    }
}

impl From<TupleType> for Type {
    fn from(value: TupleType) -> Self {
        Type::Tuple(value)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Data(ty) => write!(f, "{ty}"),
            Type::Tuple(ty) => write!(f, "{ty}"),
            Type::BitSlice => write!(f, "BitSlice"),
            Type::Str => write!(f, "String"),
        }
    }
}

/// Fixed-arity heterogeneous aggregate type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TupleType {
    elements: Vec<Type>,
}

impl TupleType {
    pub fn new(elements: impl IntoIterator<Item = Type>) -> Self {
        Self {
            elements: elements.into_iter().collect(),
        }
    }

    /// `(Bool, Bool, Bool, Bool)`: zero, carry, overflow, negative.
    pub fn status() -> Self {
        Self::new(std::iter::repeat_n(Type::Data(DataType::Bool), 4))
    }

    pub fn elements(&self) -> &[Type] {
        &self.elements
    }

    pub fn arity(&self) -> usize {
        self.elements.len()
    }
}

impl fmt::Display for TupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, element) in self.elements.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{element}")?;
        }
        write!(f, ")")
    }
}

/// Shape of a resource access: address types in, result type out.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RelationType {
    args: SmallVec<[DataType; 2]>,
    result: DataType,
}

impl RelationType {
    pub fn new(args: impl IntoIterator<Item = DataType>, result: DataType) -> Self {
        Self {
            args: args.into_iter().collect(),
            result,
        }
    }

    pub fn args(&self) -> &[DataType] {
        &self.args
    }

    pub fn result(&self) -> DataType {
        self.result
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ") -> {}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_type_names() {
        assert_eq!(DataType::bits(5).to_string(), "Bits<5>");
        assert_eq!(DataType::sint(32).to_string(), "SInt<32>");
        assert_eq!(DataType::bool().to_string(), "Bool");
        assert_eq!(
            TupleType::status().to_string(),
            "(Bool, Bool, Bool, Bool)",
            "status tuple is four booleans"
        );
        let relation = RelationType::new([DataType::bits(5)], DataType::bits(32));
        assert_eq!(relation.to_string(), "(Bits<5>) -> Bits<32>");
    }

    #[test]
    fn trivial_cast_only_depends_on_width() {
        assert!(DataType::sint(8).is_trivial_cast_to(DataType::uint(8)));
        assert!(DataType::bool().is_trivial_cast_to(DataType::bits(1)));
        assert!(!DataType::bits(8).is_trivial_cast_to(DataType::bits(9)));
    }

    #[test]
    fn minimal_width_covers_index() {
        assert_eq!(DataType::minimal_required_width_for(0), 1);
        assert_eq!(DataType::minimal_required_width_for(1), 1);
        assert_eq!(DataType::minimal_required_width_for(31), 5);
        assert_eq!(DataType::minimal_required_width_for(32), 6);
        assert_eq!(DataType::minimal_required_width_for(u64::MAX), 64);
    }

    #[test]
    fn with_bit_width_keeps_family() {
        assert_eq!(DataType::sint(8).with_bit_width(16), DataType::sint(16));
        assert_eq!(DataType::bool().with_bit_width(4), DataType::bits(4));
        assert_eq!(DataType::bool().with_bit_width(1), DataType::bool());
    }
}
