//! Wildcard-aware instruction words.

use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::model::error::{ModelError, ModelResult};
use crate::model::types::DataType;
use crate::model::value::{Value, mask};

/// Byte order used when an instruction word meets memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    /// Assembles `bytes` into a `Bits<8 * len>` word.
    pub fn decode_word(self, bytes: &[u8]) -> Value {
        let pattern = match self {
            Endianness::Little => BigUint::from_bytes_le(bytes),
            Endianness::Big => BigUint::from_bytes_be(bytes),
        };
        Value::from_masked(pattern, DataType::bits(bytes.len() as u32 * 8))
    }
}

/// Fixed bits of an instruction word: `mask` selects the fixed positions, `value` holds them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitPattern {
    width: u32,
    mask: BigUint,
    value: BigUint,
}

impl BitPattern {
    /// A pattern of `width` bits with every position a wildcard.
    pub fn wildcard(width: u32) -> Self {
        Self {
            width,
            mask: BigUint::zero(),
            value: BigUint::zero(),
        }
    }

    /// Fixes bit `index` to `set`. Indices beyond the width are ignored.
    pub(crate) fn fix_bit(&mut self, index: u32, set: bool) {
        if index < self.width {
            self.mask.set_bit(u64::from(index), true);
            self.value.set_bit(u64::from(index), set);
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn mask(&self) -> Value {
        Value::from_masked(self.mask.clone(), DataType::bits(self.width))
    }

    pub fn value(&self) -> Value {
        Value::from_masked(self.value.clone(), DataType::bits(self.width))
    }

    /// Number of fixed bits; more specific patterns win when several match.
    pub fn specificity(&self) -> u64 {
        self.mask.count_ones()
    }

    pub fn is_fixed(&self, index: u32) -> bool {
        self.mask.bit(u64::from(index))
    }

    pub fn is_fully_specified(&self) -> bool {
        self.mask == mask(self.width)
    }

    pub fn matches(&self, word: &Value) -> bool {
        word.bit_width() == self.width && (word.unsigned_integer() & &self.mask) == self.value
    }

    /// True when some word matches both patterns.
    pub fn overlaps(&self, other: &BitPattern) -> bool {
        if self.width != other.width {
            return false;
        }
        let common = &self.mask & &other.mask;
        (&self.value & &common) == (&other.value & &common)
    }

    /// Serialises a fully specified, byte-aligned pattern.
    pub fn to_bytes(&self, endianness: Endianness) -> ModelResult<Vec<u8>> {
        if !self.is_fully_specified() {
            return Err(ModelError::unsupported(format!(
                "pattern {self} still contains wildcards"
            )));
        }
        if self.width % 8 != 0 {
            return Err(ModelError::shape(format!(
                "a {}-bit pattern is not byte aligned",
                self.width
            )));
        }
        let len = (self.width / 8) as usize;
        let mut bytes = self.value.to_bytes_le();
        bytes.resize(len, 0);
        if endianness == Endianness::Big {
            bytes.reverse();
        }
        Ok(bytes)
    }
}

impl fmt::Display for BitPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in (0..self.width).rev() {
            let symbol = if !self.is_fixed(index) {
                '?'
            } else if self.value.bit(u64::from(index)) {
                '1'
            } else {
                '0'
            };
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}
