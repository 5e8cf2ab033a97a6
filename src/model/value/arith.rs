use num_bigint::BigInt;

use super::{StatusFlags, Value, mask};
use crate::model::constant::Tuple;
use crate::model::error::{ModelError, ModelResult};
use crate::model::types::DataType;

/// Carry convention of a subtraction with carry/borrow input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubMode {
    /// The flag is a borrow: `a + not(b) + not(c)`, carry out inverted (x86, 68k, Z80).
    X86Like,
    /// The flag is a carry: `a + not(b) + c`, carry out kept (ARM, PowerPC, 6502).
    ArmLike,
}

/// Result of a flag-producing operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArithResult {
    pub result: Value,
    pub flags: StatusFlags,
}

impl ArithResult {
    /// `(result, (zero, carry, overflow, negative))`
    pub fn to_tuple(&self) -> Tuple {
        Tuple::pair(self.result.clone(), self.flags.to_tuple())
    }
}

impl Value {
    /// Adds two values of equal width and computes the ALU status flags.
    ///
    /// * zero: the truncated result is 0
    /// * negative: bit `w-1` of the result
    /// * carry: the untruncated unsigned sum needs more than `w` bits
    /// * overflow: both operands share a sign bit that differs from the result's
    pub fn add(&self, other: &Value) -> ModelResult<ArithResult> {
        self.add_with_carry(other, false)
    }

    pub fn add_with_carry(&self, other: &Value, carry_in: bool) -> ModelResult<ArithResult> {
        self.ensure_bits_family("addition")?;
        self.ensure_same_width(other, "addition")?;

        let width = self.bit_width();
        let mut sum = &self.pattern + &other.pattern;
        if carry_in {
            sum += 1u32;
        }
        let carry = sum.bits() > u64::from(width);
        let result = Value::from_masked(sum, self.ty);

        let negative = result.is_sign_bit();
        let overflow = self.is_sign_bit() == other.is_sign_bit() && self.is_sign_bit() != negative;
        let flags = StatusFlags::from_bools(result.is_zero(), carry, overflow, negative);
        Ok(ArithResult { result, flags })
    }

    /// `a - b` as `a + negate(b)`.
    ///
    /// The carry is the inverse of the addition's carry. Negating the minimal signed pattern yields
    /// the same pattern, so for that subtrahend the addition's overflow is inverted as well.
    pub fn subtract(&self, other: &Value) -> ModelResult<ArithResult> {
        self.ensure_bits_family("subtraction")?;
        self.ensure_same_width(other, "subtraction")?;

        let sum = self.add(&other.negate())?;
        let mut flags = sum.flags;
        flags.toggle(StatusFlags::CARRY);
        if other.pattern == Value::min_value_of(DataType::sint(other.bit_width())).pattern {
            flags.toggle(StatusFlags::OVERFLOW);
        }
        Ok(ArithResult {
            result: sum.result,
            flags,
        })
    }

    /// `a + not(b) + c`, where `c` is derived from `carry_or_borrow` according to `mode`.
    pub fn subtract_with(
        &self,
        other: &Value,
        mode: SubMode,
        carry_or_borrow: bool,
    ) -> ModelResult<ArithResult> {
        self.ensure_bits_family("subtraction")?;
        self.ensure_same_width(other, "subtraction")?;

        let carry_in = match mode {
            SubMode::X86Like => !carry_or_borrow,
            SubMode::ArmLike => carry_or_borrow,
        };
        let mut sum = self.add_with_carry(&other.bitwise_not(), carry_in)?;
        if mode == SubMode::X86Like {
            sum.flags.toggle(StatusFlags::CARRY);
        }
        Ok(sum)
    }

    /// Two's-complement negation, `(~pattern + 1) mod 2^w`.
    ///
    /// The minimal signed pattern negates to itself.
    pub fn negate(&self) -> Value {
        let width = self.bit_width();
        let inverted = &self.pattern ^ mask(width);
        Value::from_masked(inverted + 1u32, self.ty)
    }

    /// Logical negation of a boolean.
    pub fn not(&self) -> ModelResult<Value> {
        if !self.ty.is_bool() {
            return Err(ModelError::unsupported(format!(
                "logical not is only defined for Bool, got {}",
                self.ty
            ))
            .with_context("constant", self));
        }
        Ok(Value::of_bool(self.is_zero()))
    }

    /// Multiplies two values of equal width.
    ///
    /// The long form returns a `SInt<2w>`/`UInt<2w>` product of the operands read with the
    /// requested signedness. The short form keeps the operand type and truncates.
    pub fn multiply(&self, other: &Value, long: bool, signed: bool) -> ModelResult<Value> {
        self.ensure_bits_family("multiplication")?;
        self.ensure_same_width(other, "multiplication")?;

        if long {
            let width = self.bit_width();
            let product = self.integer_as(signed) * other.integer_as(signed);
            let ty = if signed {
                DataType::sint(2 * width)
            } else {
                DataType::uint(2 * width)
            };
            Value::from_integer(product, ty)
        } else {
            Ok(Value::from_masked(&self.pattern * &other.pattern, self.ty))
        }
    }

    /// Truncating division. Division by zero and `min / -1` are evaluation errors.
    pub fn divide(&self, other: &Value, signed: bool) -> ModelResult<Value> {
        let (lhs, rhs, ty) = self.division_operands(other, signed, "division")?;
        let quotient = lhs / rhs;
        Value::from_integer(quotient, ty).map_err(|_| {
            ModelError::evaluation("signed division overflows its result type")
                .with_context("lhs", self)
                .with_context("rhs", other)
        })
    }

    /// Remainder of the truncating division; it carries the sign of the dividend.
    pub fn modulo(&self, other: &Value, signed: bool) -> ModelResult<Value> {
        let (lhs, rhs, ty) = self.division_operands(other, signed, "modulo")?;
        Value::from_integer(lhs % rhs, ty)
    }

    fn division_operands(
        &self,
        other: &Value,
        signed: bool,
        operation: &str,
    ) -> ModelResult<(BigInt, BigInt, DataType)> {
        self.ensure_bits_family(operation)?;
        self.ensure_same_width(other, operation)?;
        if other.is_zero() {
            return Err(ModelError::evaluation(format!("{operation} by zero"))
                .with_context("lhs", self)
                .with_context("rhs", other));
        }
        let width = self.bit_width();
        let ty = if signed {
            DataType::sint(width)
        } else {
            DataType::uint(width)
        };
        Ok((self.integer_as(signed), other.integer_as(signed), ty))
    }

    /// Reads the pattern as a signed or unsigned integer regardless of the type tag.
    pub(crate) fn integer_as(&self, signed: bool) -> BigInt {
        super::from_twos_complement(&self.pattern, self.bit_width(), signed)
    }
}
