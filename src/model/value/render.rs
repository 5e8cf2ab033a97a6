use std::fmt;

use super::Value;

/// Numeric base used when rendering a [`Value`] as literal text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Radix {
    Binary,
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub const fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }

    pub const fn prefix(self) -> &'static str {
        match self {
            Radix::Binary => "0b",
            Radix::Decimal => "",
            Radix::Hexadecimal => "0x",
        }
    }

    /// Bits covered by one digit, or `None` when digits do not align with bits.
    const fn bits_per_digit(self) -> Option<u32> {
        match self {
            Radix::Binary => Some(1),
            Radix::Decimal => None,
            Radix::Hexadecimal => Some(4),
        }
    }
}

impl Value {
    /// Renders the stored pattern in `radix`.
    ///
    /// With `padded`, binary output is zero-filled to the bit width and hexadecimal output to the
    /// number of nibbles needed for it. Decimal and boolean output is never padded.
    pub fn to_radix_string(&self, prefix: &str, radix: Radix, padded: bool) -> String {
        let digits = self.unsigned_integer().to_str_radix(radix.base());
        let width = match radix.bits_per_digit() {
            Some(bits) if padded && !self.ty().is_bool() => {
                self.bit_width().div_ceil(bits) as usize
            }
            _ => 0,
        };
        format!("{prefix}{digits:0>width$}")
    }

    pub fn decimal(&self) -> String {
        self.to_radix_string("", Radix::Decimal, false)
    }

    pub fn hexadecimal(&self) -> String {
        self.to_radix_string(Radix::Hexadecimal.prefix(), Radix::Hexadecimal, true)
    }

    pub fn binary(&self) -> String {
        self.to_radix_string(Radix::Binary.prefix(), Radix::Binary, true)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ty().is_bool() {
            return write!(f, "{}", !self.is_zero());
        }
        write!(f, "{}: {}", self.hexadecimal(), self.ty())
    }
}
