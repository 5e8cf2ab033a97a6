//! Property tests for the value and layout invariants every backend relies on.

use archmodel::model::bitslice::{BitSlice, Part};
use archmodel::model::error::ModelErrorKind;
use archmodel::model::format::{EncodingBuilder, Field, FormatBuilder};
use archmodel::model::types::DataType;
use archmodel::model::value::Value;
use num_bigint::BigInt;
use proptest::prelude::*;

/// Reduces `raw` into the representable range of a `width`-bit signed integer.
fn signed_in_range(raw: i64, width: u32) -> i64 {
    let shift = 64 - width;
    (raw << shift) >> shift
}

fn unsigned_in_range(raw: u64, width: u32) -> u64 {
    if width == 64 { raw } else { raw & ((1u64 << width) - 1) }
}

/// Descending single-bit parts for every set bit of `mask`.
fn parts_of(mask: u64) -> Vec<Part> {
    (0..64u32)
        .rev()
        .filter(|bit| mask & (1u64 << bit) != 0)
        .map(Part::index)
        .collect()
}

proptest! {
    #[test]
    fn signed_integers_round_trip(raw in any::<i64>(), width in 1u32..=64) {
        let n = signed_in_range(raw, width);
        let value = Value::of(n, DataType::sint(width)).expect("in range by construction");
        prop_assert_eq!(value.integer(), BigInt::from(n));
        prop_assert!(value.unsigned_integer().bits() <= u64::from(width));
    }

    #[test]
    fn unsigned_integers_round_trip(raw in any::<u64>(), width in 1u32..=64) {
        let n = unsigned_in_range(raw, width);
        let value = Value::from_integer(n, DataType::uint(width)).expect("in range");
        prop_assert_eq!(value.integer(), BigInt::from(n));
        prop_assert_eq!(value.to_u64(), Some(n));
    }

    #[test]
    fn out_of_range_integers_are_rejected(width in 1u32..=32) {
        let too_big = 1i64 << (width - 1);
        let err = Value::of(too_big, DataType::sint(width)).expect_err("max + 1 overflows");
        prop_assert_eq!(err.kind(), ModelErrorKind::Range);
    }

    #[test]
    fn plain_bits_accept_the_signed_and_unsigned_ranges(n in -600i64..600, width in 1u32..=9) {
        let fits = n >= -(1i64 << (width - 1)) && n < (1i64 << width);
        let result = Value::of(n, DataType::bits(width));
        prop_assert_eq!(result.is_ok(), fits);
        if let Ok(value) = result {
            prop_assert_eq!(value.to_u64(), Some(unsigned_in_range(n as u64, width)));
        }
    }

    #[test]
    fn patterns_wider_than_the_type_fail(pattern in any::<u64>(), width in 1u32..=64) {
        let result = Value::from_twos_complement(pattern, DataType::bits(width));
        let fits = width == 64 || pattern >> width == 0;
        prop_assert_eq!(result.is_ok(), fits);
    }

    #[test]
    fn arithmetic_stays_within_width(a in any::<u64>(), b in any::<u64>(), width in 1u32..=64) {
        let ty = DataType::bits(width);
        let a = Value::from_integer(unsigned_in_range(a, width), ty).expect("masked");
        let b = Value::from_integer(unsigned_in_range(b, width), ty).expect("masked");
        for result in [
            a.add(&b).expect("same type").result,
            a.subtract(&b).expect("same type").result,
            a.negate(),
            a.lsl(3),
            a.rol(5),
        ] {
            prop_assert!(result.unsigned_integer().bits() <= u64::from(width));
            prop_assert_eq!(result.ty(), ty);
        }
    }

    #[test]
    fn subtraction_matches_negated_addition(
        a in any::<i64>(),
        b in any::<i64>(),
        width in 1u32..=63,
    ) {
        let ty = DataType::sint(width);
        let a = Value::of(signed_in_range(a, width), ty).expect("in range");
        let b = Value::of(signed_in_range(b, width), ty).expect("in range");

        let difference = a.subtract(&b).expect("same type");
        let modulus = BigInt::from(1) << width;
        let reduced = ((a.integer() - b.integer()) % &modulus + &modulus) % &modulus;
        let pattern = reduced.to_biguint().expect("reduced into 0..2^w");
        let expected = Value::from_twos_complement(pattern, ty).expect("fits the width");
        prop_assert_eq!(&difference.result, &expected);

        let via_negation = a.add(&b.negate()).expect("same type");
        prop_assert_eq!(difference.flags.carry(), !via_negation.flags.carry());
    }

    #[test]
    fn negating_the_minimum_is_identity(width in 1u32..=128) {
        let min = Value::min_value_of(DataType::sint(width));
        prop_assert_eq!(min.negate(), min);
    }

    #[test]
    fn normalisation_is_idempotent(mask in 1u64..) {
        let slice = BitSlice::new(parts_of(mask)).expect("disjoint single bits");
        let again = BitSlice::new(slice.parts().iter().copied()).expect("normalised parts");
        prop_assert_eq!(again.parts(), slice.parts());
        prop_assert_eq!(u64::from(slice.bit_size()), u64::from(mask.count_ones()));

        let sizes: u32 = slice.parts().iter().map(Part::size).sum();
        prop_assert_eq!(sizes, slice.bit_size());
        for (idx, part) in slice.parts().iter().enumerate() {
            for other in &slice.parts()[idx + 1..] {
                prop_assert!(!part.is_overlapping(other));
            }
        }

        let ascending: Vec<u32> = slice.iter().collect();
        let expected: Vec<u32> = (0..64).filter(|bit| mask & (1u64 << bit) != 0).collect();
        prop_assert_eq!(ascending, expected);
    }

    #[test]
    fn field_type_must_match_slice_size(msb in 0u32..64, len in 1u32..16, width in 1u32..32) {
        let lsb = msb.saturating_sub(len - 1);
        let slice = BitSlice::of(msb, lsb).expect("msb >= lsb");
        let result = Field::new("f", slice.clone(), DataType::bits(width));
        prop_assert_eq!(result.is_ok(), width == slice.bit_size());
    }

    #[test]
    fn fields_extract_what_was_inserted(word in any::<u32>(), value in 0i64..(1 << 12)) {
        let mut format = FormatBuilder::new("S", 32);
        let high = Part::new(31, 25).expect("range");
        let low = Part::new(11, 7).expect("range");
        let split = BitSlice::new([high, low]).expect("disjoint");
        format.field("imm", split, DataType::bits(12)).expect("12-bit field");
        let format = format.build();
        let field = format.field("imm").expect("declared");

        let word = Value::from_twos_complement(word, DataType::bits(32)).expect("32 bits");
        let value = Value::of(value, DataType::bits(12)).expect("12 bits");
        let inserted = field.insert(&word, &value).expect("fits");
        prop_assert_eq!(field.extract(&inserted).expect("fits"), value);
    }

    #[test]
    fn second_binding_always_fails(first in 0i64..128, second in 0i64..128) {
        let mut format = FormatBuilder::new("F", 16);
        format.bits_field("op", 15, 9).expect("op field");
        let mut encoding = EncodingBuilder::new("I::encoding", format.build());
        encoding.add_integer("op", first).expect("first binding");
        let err = encoding.add_integer("op", second).map(|_| ()).expect_err("second binding");
        prop_assert_eq!(err.kind(), ModelErrorKind::DoubleBinding);
    }
}
