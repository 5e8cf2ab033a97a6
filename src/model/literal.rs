//! Numeric literal parser for constants written in description files (`42`, `-3`, `0x1F`,
//! `0b0110011`). Literals are arbitrary precision; binary literals also carry their digit count.

use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};

use crate::model::error::{ModelError, ModelResult};
use crate::model::types::DataType;
use crate::model::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    magnitude: BigUint,
    negative: bool,
    kind: LiteralKind,
    bit_width: Option<u32>,
}

impl Literal {
    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    pub fn integer(&self) -> BigInt {
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        BigInt::from_biguint(sign, self.magnitude.clone())
    }

    pub fn kind(&self) -> LiteralKind {
        self.kind
    }

    /// Digit count of binary literals, which doubles as their declared width.
    pub fn bit_width(&self) -> Option<u32> {
        self.bit_width
    }

    pub fn parse(input: &str) -> Result<Self, LiteralError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LiteralError::Empty);
        }
        let (negative, body) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };
        let mut literal = if let Some(rest) = strip_prefix_ignore_case(body, "0b") {
            Self::parse_radix(rest, 2, LiteralKind::Binary)?
        } else if let Some(rest) = strip_prefix_ignore_case(body, "0o") {
            Self::parse_radix(rest, 8, LiteralKind::Octal)?
        } else if let Some(rest) = strip_prefix_ignore_case(body, "0x") {
            Self::parse_radix(rest, 16, LiteralKind::Hex)?
        } else {
            Self::parse_radix(body, 10, LiteralKind::Decimal)?
        };
        if negative {
            if literal.kind == LiteralKind::Binary {
                return Err(LiteralError::NegativeNotSupported);
            }
            literal.negative = true;
        }
        Ok(literal)
    }

    fn parse_radix(src: &str, radix: u32, kind: LiteralKind) -> Result<Self, LiteralError> {
        let digits = src.replace('_', "");
        if digits.is_empty() {
            return Err(LiteralError::InvalidFormat(src.into()));
        }
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), radix)
            .ok_or_else(|| LiteralError::InvalidFormat(src.into()))?;
        let bit_width = (kind == LiteralKind::Binary).then_some(digits.len() as u32);
        Ok(Literal {
            magnitude,
            negative: false,
            kind,
            bit_width,
        })
    }

    /// Binary literals are taken as raw patterns; every other kind as a logical integer.
    pub fn to_value(&self, ty: DataType) -> ModelResult<Value> {
        match self.kind {
            LiteralKind::Binary => Value::from_twos_complement(self.magnitude.clone(), ty),
            _ => Value::from_integer(self.integer(), ty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Decimal,
    Hex,
    Octal,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    Empty,
    InvalidFormat(String),
    NegativeNotSupported,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralError::Empty => write!(f, "literal is empty"),
            LiteralError::InvalidFormat(token) => write!(f, "invalid literal format: {token}"),
            LiteralError::NegativeNotSupported => {
                write!(f, "negative binary literals are not supported")
            }
        }
    }
}

impl std::error::Error for LiteralError {}

impl From<LiteralError> for ModelError {
    fn from(err: LiteralError) -> Self {
        ModelError::literal(err.to_string())
    }
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    input
        .strip_prefix(prefix)
        .or_else(|| input.strip_prefix(prefix.to_ascii_uppercase().as_str()))
}

impl Value {
    /// Parses `text` as a literal and converts it to `ty`.
    pub fn parse(text: &str, ty: DataType) -> ModelResult<Value> {
        Literal::parse(text)?.to_value(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::error::ModelErrorKind;

    #[test]
    fn parses_decimal_literal() {
        let literal = Literal::parse("42").expect("literal parse");
        assert_eq!(literal.integer(), BigInt::from(42));
        assert_eq!(literal.kind(), LiteralKind::Decimal);
        assert_eq!(literal.bit_width(), None);
    }

    #[test]
    fn binary_literals_carry_width() {
        let literal = Literal::parse("0b0110_011").expect("binary literal");
        assert_eq!(literal.bit_width(), Some(7));
        assert_eq!(literal.magnitude(), &BigUint::from(0b0110011u32));
    }

    #[test]
    fn wide_hex_literals_are_supported() {
        let literal = Literal::parse("0x1_0000_0000_0000_0000").expect("wide literal");
        assert_eq!(literal.magnitude().bits(), 65);
    }

    #[test]
    fn negative_literals_become_signed_values() {
        let value = Value::parse("-3", DataType::sint(8)).expect("fits");
        assert_eq!(value.to_i64(), Some(-3));
        assert_eq!(
            Literal::parse("-0b1"),
            Err(LiteralError::NegativeNotSupported)
        );
    }

    #[test]
    fn malformed_literals_report_errors() {
        assert_eq!(Literal::parse("  "), Err(LiteralError::Empty));
        assert_eq!(
            Literal::parse("0xZZ"),
            Err(LiteralError::InvalidFormat("ZZ".into()))
        );
        let err = Value::parse("0b12", DataType::bits(2)).expect_err("not binary");
        assert_eq!(err.kind(), ModelErrorKind::Literal);
        let err = Value::parse("0b111", DataType::bits(2)).expect_err("pattern too wide");
        assert_eq!(err.kind(), ModelErrorKind::Range);
    }
}
