use std::cmp::Ordering;

use num_bigint::BigUint;
use num_traits::Zero;

use super::{Value, mask};
use crate::model::bitslice::BitSlice;
use crate::model::error::{ModelError, ModelResult};
use crate::model::types::DataType;

impl Value {
    pub fn bitwise_not(&self) -> Value {
        Value::from_masked(&self.pattern ^ mask(self.bit_width()), self.ty)
    }

    pub fn and(&self, other: &Value) -> ModelResult<Value> {
        self.ensure_same_width(other, "bitwise and")?;
        Ok(Value::from_masked(&self.pattern & &other.pattern, self.ty))
    }

    pub fn or(&self, other: &Value) -> ModelResult<Value> {
        self.ensure_same_width(other, "bitwise or")?;
        Ok(Value::from_masked(&self.pattern | &other.pattern, self.ty))
    }

    pub fn xor(&self, other: &Value) -> ModelResult<Value> {
        self.ensure_same_width(other, "bitwise xor")?;
        Ok(Value::from_masked(&self.pattern ^ &other.pattern, self.ty))
    }

    /// Logical shift left; shifting by the width or more clears the value.
    pub fn lsl(&self, amount: u64) -> Value {
        if amount >= u64::from(self.bit_width()) {
            return Value::zero(self.ty);
        }
        Value::from_masked(&self.pattern << amount, self.ty)
    }

    /// Logical shift right; the amount is taken modulo the width.
    pub fn lsr(&self, amount: u64) -> Value {
        let amount = self.reduce_amount(amount);
        Value::from_masked(&self.pattern >> amount, self.ty)
    }

    /// Arithmetic shift right, filling with the sign bit.
    pub fn asr(&self, amount: u64) -> Value {
        let width = self.bit_width();
        if width == 0 {
            return self.clone();
        }
        let amount = amount.min(u64::from(width));
        let shifted = &self.pattern >> amount;
        if !self.is_sign_bit() {
            return Value::from_masked(shifted, self.ty);
        }
        let fill = mask(width) ^ (mask(width) >> amount);
        Value::from_masked(shifted | fill, self.ty)
    }

    pub fn rol(&self, amount: u64) -> Value {
        let width = self.bit_width();
        let amount = self.reduce_amount(amount);
        if amount == 0 {
            return self.clone();
        }
        let rotated = (&self.pattern << amount) | (&self.pattern >> (u64::from(width) - amount));
        Value::from_masked(rotated, self.ty)
    }

    pub fn ror(&self, amount: u64) -> Value {
        let width = self.bit_width();
        let amount = self.reduce_amount(amount);
        if amount == 0 {
            return self.clone();
        }
        let rotated = (&self.pattern >> amount) | (&self.pattern << (u64::from(width) - amount));
        Value::from_masked(rotated, self.ty)
    }

    fn reduce_amount(&self, amount: u64) -> u64 {
        match u64::from(self.bit_width()) {
            0 => 0,
            width => amount % width,
        }
    }

    pub fn lt(&self, other: &Value, signed: bool) -> ModelResult<Value> {
        self.compare(other, signed, Ordering::is_lt)
    }

    pub fn le(&self, other: &Value, signed: bool) -> ModelResult<Value> {
        self.compare(other, signed, Ordering::is_le)
    }

    pub fn gt(&self, other: &Value, signed: bool) -> ModelResult<Value> {
        self.compare(other, signed, Ordering::is_gt)
    }

    pub fn ge(&self, other: &Value, signed: bool) -> ModelResult<Value> {
        self.compare(other, signed, Ordering::is_ge)
    }

    fn compare(
        &self,
        other: &Value,
        signed: bool,
        predicate: fn(Ordering) -> bool,
    ) -> ModelResult<Value> {
        self.ensure_same_width(other, "comparison")?;
        let ordering = self.integer_as(signed).cmp(&other.integer_as(signed));
        Ok(Value::of_bool(predicate(ordering)))
    }

    /// Keeps the low `ty.bit_width()` bits.
    pub fn truncate(&self, ty: DataType) -> ModelResult<Value> {
        if ty.bit_width() > self.bit_width() {
            return Err(ModelError::type_mismatch(format!(
                "cannot truncate {} to the wider type {}",
                self.ty, ty
            ))
            .with_context("constant", self));
        }
        Ok(Value::from_masked(self.pattern.clone(), ty))
    }

    pub fn zero_extend(&self, ty: DataType) -> ModelResult<Value> {
        self.ensure_not_narrower(ty, "zero extend")?;
        Ok(Value::from_masked(self.pattern.clone(), ty))
    }

    pub fn sign_extend(&self, ty: DataType) -> ModelResult<Value> {
        self.ensure_not_narrower(ty, "sign extend")?;
        if !self.is_sign_bit() {
            return Ok(Value::from_masked(self.pattern.clone(), ty));
        }
        let fill = mask(ty.bit_width()) ^ mask(self.bit_width());
        Ok(Value::from_masked(&self.pattern | fill, ty))
    }

    fn ensure_not_narrower(&self, ty: DataType, operation: &str) -> ModelResult<()> {
        if ty.bit_width() < self.bit_width() {
            return Err(ModelError::type_mismatch(format!(
                "cannot {operation} {} to the narrower type {}",
                self.ty, ty
            ))
            .with_context("constant", self));
        }
        Ok(())
    }

    /// `self` becomes the high part, `other` the low part of a `Bits<w1 + w2>` value.
    pub fn concat(&self, other: &Value) -> Value {
        let ty = DataType::bits(self.bit_width() + other.bit_width());
        let pattern = (&self.pattern << other.bit_width()) | &other.pattern;
        Value::from_masked(pattern, ty)
    }

    /// Gathers the bits addressed by `slice` into a dense `Bits<slice.bit_size()>` value.
    ///
    /// The first declared part becomes the most significant part of the result.
    pub fn slice(&self, slice: &BitSlice) -> ModelResult<Value> {
        if slice.msb() >= self.bit_width() {
            return Err(ModelError::shape(format!(
                "slice {slice} reaches beyond the {} bits of {}",
                self.bit_width(),
                self.ty
            ))
            .with_context("constant", self));
        }
        let mut pattern = BigUint::zero();
        for (target, source) in slice.value_positions().enumerate() {
            if self.bit(source) {
                pattern.set_bit(target as u64, true);
            }
        }
        Ok(Value::from_masked(pattern, DataType::bits(slice.bit_size())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bitslice::Part;

    fn bits(value: i64, width: u32) -> Value {
        Value::of(value, DataType::bits(width)).expect("bits value fits")
    }

    fn sint(value: i64, width: u32) -> Value {
        Value::of(value, DataType::sint(width)).expect("signed value fits")
    }

    #[test]
    fn bitwise_operations_keep_type() {
        let a = bits(0b1100, 4);
        let b = bits(0b1010, 4);
        assert_eq!(a.and(&b).unwrap().to_u64(), Some(0b1000));
        assert_eq!(a.or(&b).unwrap().to_u64(), Some(0b1110));
        assert_eq!(a.xor(&b).unwrap().to_u64(), Some(0b0110));
        assert_eq!(a.bitwise_not().to_u64(), Some(0b0011));
        assert!(a.and(&bits(1, 5)).is_err(), "widths must agree");
    }

    #[test]
    fn shifts_follow_width_rules() {
        let value = bits(0b1001, 4);
        assert_eq!(value.lsl(1).to_u64(), Some(0b0010));
        assert_eq!(value.lsl(4).to_u64(), Some(0), "shifting out every bit clears");
        assert_eq!(value.lsr(1).to_u64(), Some(0b0100));
        assert_eq!(value.lsr(5).to_u64(), Some(0b0100), "lsr amount wraps at the width");
        assert_eq!(value.asr(2).to_u64(), Some(0b1110));
        assert_eq!(value.asr(9).to_u64(), Some(0b1111));
        assert_eq!(value.rol(1).to_u64(), Some(0b0011));
        assert_eq!(value.ror(1).to_u64(), Some(0b1100));
        assert_eq!(value.ror(4), value);
    }

    #[test]
    fn comparisons_honor_signedness() {
        let minus_one = sint(-1, 8);
        let one = sint(1, 8);
        assert_eq!(minus_one.lt(&one, true), Ok(Value::of_bool(true)));
        assert_eq!(minus_one.lt(&one, false), Ok(Value::of_bool(false)));
        assert_eq!(one.ge(&one, true), Ok(Value::of_bool(true)));
        assert_eq!(one.gt(&one, false), Ok(Value::of_bool(false)));
        assert_eq!(one.le(&minus_one, false), Ok(Value::of_bool(true)));
    }

    #[test]
    fn extensions_and_truncation() {
        let value = sint(-2, 4);
        let signed = value.sign_extend(DataType::sint(8)).unwrap();
        assert_eq!(signed.to_i64(), Some(-2));
        let zeroed = value.zero_extend(DataType::sint(8)).unwrap();
        assert_eq!(zeroed.to_i64(), Some(14));
        assert_eq!(bits(0b1100, 4).truncate(DataType::bits(3)).unwrap().to_u64(), Some(0b100));
        assert!(value.truncate(DataType::bits(5)).is_err());
        assert!(value.sign_extend(DataType::bits(3)).is_err());
    }

    #[test]
    fn concat_places_self_high() {
        let joined = bits(0b10, 2).concat(&bits(0b011, 3));
        assert_eq!(joined.ty(), DataType::bits(5));
        assert_eq!(joined.to_u64(), Some(0b10011));
    }

    #[test]
    fn slice_gathers_declared_parts() {
        let word = bits(0b10_1100_0101, 10);
        let slice = BitSlice::new([Part::index(0), Part::new(9, 8).unwrap()]).unwrap();
        let value = word.slice(&slice).unwrap();
        assert_eq!(value.ty(), DataType::bits(3));
        assert_eq!(value.to_u64(), Some(0b1_10), "bit 0 is the high part, bits 9..8 the low part");
        assert!(word.slice(&BitSlice::of(10, 0).unwrap()).is_err());
    }
}
