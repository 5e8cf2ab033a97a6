//! Arbitrary-width two's-complement constants.
//!
//! A [`Value`] stores a non-negative bit pattern that never exceeds the width of its [`DataType`].
//! The logical integer is derived from the pattern on demand: booleans and unsigned types read it
//! verbatim, signed types reinterpret it as two's complement. Every operation returns a new value.

mod arith;
mod bitwise;
mod render;
mod status;

pub use arith::{ArithResult, SubMode};
pub use render::Radix;
pub use status::StatusFlags;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, ToPrimitive, Zero};

use crate::model::error::{ModelError, ModelResult};
use crate::model::types::DataType;

/// All-ones pattern of `width` bits.
pub(crate) fn mask(width: u32) -> BigUint {
    (BigUint::one() << width) - BigUint::one()
}

/// Encodes `integer` as a `width`-bit two's-complement pattern (modulo `2^width`).
pub(crate) fn twos_complement(integer: &BigInt, width: u32) -> BigUint {
    let modulus = BigInt::one() << width;
    let mut reduced = integer % &modulus;
    if reduced.sign() == Sign::Minus {
        reduced += &modulus;
    }
    reduced.into_parts().1
}

/// Decodes a `width`-bit pattern, honoring the sign bit only when `signed`.
pub(crate) fn from_twos_complement(pattern: &BigUint, width: u32, signed: bool) -> BigInt {
    let value = BigInt::from(pattern.clone());
    if signed && width > 0 && pattern.bit(u64::from(width - 1)) {
        value - (BigInt::one() << width)
    } else {
        value
    }
}

/// Bits needed to hold `integer` in a plain `Bits<w>` pattern. Non-negative integers need their
/// magnitude only; negative ones need a sign bit on top (`-8` needs 4 bits, `-9` needs 5).
fn required_bits(integer: &BigInt) -> u64 {
    if integer.sign() == Sign::Minus {
        let positive: BigInt = -integer - BigInt::one();
        positive.magnitude().bits() + 1
    } else {
        integer.magnitude().bits()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Value {
    pattern: BigUint,
    ty: DataType,
}

impl Value {
    /// Builds a value from a logical integer, rejecting integers outside the type's range.
    ///
    /// Booleans clamp any non-zero integer to 1. Plain `Bits<w>` accepts `-2^(w-1) ..= 2^w - 1`,
    /// the union of the signed and unsigned ranges; `SInt`/`UInt` check their own min/max.
    pub fn from_integer(integer: impl Into<BigInt>, ty: DataType) -> ModelResult<Self> {
        let integer = integer.into();
        match ty {
            DataType::Bool => {
                let pattern = if integer.is_zero() {
                    BigUint::zero()
                } else {
                    BigUint::one()
                };
                Ok(Self { pattern, ty })
            }
            DataType::Bits(width) => {
                if required_bits(&integer) > u64::from(width) {
                    return Err(ModelError::range(format!(
                        "value {integer} does not fit in type {ty}"
                    ))
                    .with_context("value", &integer)
                    .with_context("type", ty));
                }
                Ok(Self {
                    pattern: twos_complement(&integer, width),
                    ty,
                })
            }
            DataType::SInt(width) | DataType::UInt(width) => {
                let min = Self::min_value_of(ty).integer();
                let max = Self::max_value_of(ty).integer();
                if width == 0 || integer < min || integer > max {
                    return Err(ModelError::range(format!(
                        "value {integer} does not fit in type {ty}"
                    ))
                    .with_context("value", &integer)
                    .with_context("type", ty)
                    .with_context("range", format!("{min} .. {max}")));
                }
                Ok(Self {
                    pattern: twos_complement(&integer, width),
                    ty,
                })
            }
        }
    }

    /// Wraps an existing two's-complement pattern without reinterpreting it.
    pub fn from_twos_complement(pattern: impl Into<BigUint>, ty: DataType) -> ModelResult<Self> {
        let pattern = pattern.into();
        if pattern.bits() > u64::from(ty.bit_width()) {
            return Err(ModelError::range(format!(
                "pattern {pattern:#x} is wider than {} bits",
                ty.bit_width()
            ))
            .with_context("pattern", format!("{pattern:#x}"))
            .with_context("type", ty));
        }
        Ok(Self { pattern, ty })
    }

    /// Constructor for arithmetic results; the pattern is masked to the type width.
    pub(crate) fn from_masked(pattern: BigUint, ty: DataType) -> Self {
        Self {
            pattern: pattern & mask(ty.bit_width()),
            ty,
        }
    }

    pub fn of(integer: i64, ty: DataType) -> ModelResult<Self> {
        Self::from_integer(integer, ty)
    }

    pub fn of_bool(value: bool) -> Self {
        let pattern = if value {
            BigUint::one()
        } else {
            BigUint::zero()
        };
        Self {
            pattern,
            ty: DataType::Bool,
        }
    }

    pub fn zero(ty: DataType) -> Self {
        Self {
            pattern: BigUint::zero(),
            ty,
        }
    }

    pub fn one(ty: DataType) -> ModelResult<Self> {
        Self::from_integer(1, ty)
    }

    /// Largest logical value of `ty` (plain `Bits` is read as unsigned).
    pub fn max_value_of(ty: DataType) -> Self {
        let width = ty.bit_width();
        let pattern = if ty.is_signed() {
            if width == 0 {
                BigUint::zero()
            } else {
                mask(width - 1)
            }
        } else {
            mask(width)
        };
        Self { pattern, ty }
    }

    /// Smallest logical value of `ty`; for signed types this is the `100..0` pattern.
    pub fn min_value_of(ty: DataType) -> Self {
        let width = ty.bit_width();
        let pattern = if ty.is_signed() && width > 0 {
            BigUint::one() << (width - 1)
        } else {
            BigUint::zero()
        };
        Self { pattern, ty }
    }

    pub fn ty(&self) -> DataType {
        self.ty
    }

    pub fn bit_width(&self) -> u32 {
        self.ty.bit_width()
    }

    /// The raw two's-complement pattern, regardless of the type's signedness.
    pub fn unsigned_integer(&self) -> &BigUint {
        &self.pattern
    }

    /// The logical integer this value denotes under its type.
    pub fn integer(&self) -> BigInt {
        match self.ty {
            DataType::Bool => BigInt::from(self.pattern.clone()),
            ty => from_twos_complement(&self.pattern, ty.bit_width(), ty.is_signed()),
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.integer().to_i64()
    }

    pub fn to_u64(&self) -> Option<u64> {
        self.pattern.to_u64()
    }

    pub fn as_bool(&self) -> ModelResult<bool> {
        if !self.ty.is_trivial_cast_to(DataType::Bool) {
            return Err(ModelError::type_mismatch(format!(
                "constant of type {} is not a boolean",
                self.ty
            ))
            .with_context("constant", self));
        }
        Ok(!self.pattern.is_zero())
    }

    pub fn bit(&self, index: u32) -> bool {
        self.pattern.bit(u64::from(index))
    }

    pub fn is_sign_bit(&self) -> bool {
        let width = self.bit_width();
        width > 0 && self.bit(width - 1)
    }

    pub fn is_zero(&self) -> bool {
        self.pattern.is_zero()
    }

    /// Masks the pattern to the target width and retags it.
    ///
    /// This is a reinterpretation: widening zero-fills, narrowing drops high bits, and the sign is
    /// never extended. Use [`Value::sign_extend`] or [`Value::zero_extend`] first when the logical
    /// value has to survive.
    pub fn cast_to(&self, ty: DataType) -> Value {
        Self::from_masked(self.pattern.clone(), ty)
    }

    /// Retags the value with a type of identical width.
    pub fn trivial_cast_to(&self, ty: DataType) -> ModelResult<Value> {
        if !self.ty.is_trivial_cast_to(ty) {
            return Err(ModelError::type_mismatch(format!(
                "trivial cast from {} to {} is not possible",
                self.ty, ty
            ))
            .with_context("constant", self));
        }
        Ok(Self {
            pattern: self.pattern.clone(),
            ty,
        })
    }

    pub fn to_bits(&self) -> Value {
        Self {
            pattern: self.pattern.clone(),
            ty: self.ty.to_bits(),
        }
    }

    /// Compares patterns only, ignoring the type tags.
    pub fn equal_value(&self, other: &Value) -> bool {
        self.pattern == other.pattern
    }

    pub(crate) fn ensure_bits_family(&self, operation: &str) -> ModelResult<()> {
        if !self.ty.is_bits_family() || self.bit_width() == 0 {
            return Err(ModelError::unsupported(format!(
                "{operation} is not defined for type {}",
                self.ty
            ))
            .with_context("constant", self));
        }
        Ok(())
    }

    pub(crate) fn ensure_same_width(&self, other: &Value, operation: &str) -> ModelResult<()> {
        if !self.ty.is_trivial_cast_to(other.ty) {
            return Err(ModelError::type_mismatch(format!(
                "{operation} requires operands of the same width, got {} and {}",
                self.ty, other.ty
            ))
            .with_context("lhs", self)
            .with_context("rhs", other));
        }
        Ok(())
    }
}
