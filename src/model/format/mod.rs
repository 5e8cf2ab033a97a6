//! Instruction formats: named fields laid over a fixed-width word.
//!
//! A [`Format`] is assembled through [`FormatBuilder`] and frozen behind an `Arc` so encodings
//! and field accesses can share it. Field declaration order is preserved; backends rely on it.

mod access;
mod encoding;
mod pattern;

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use num_bigint::BigUint;

pub use access::FieldAccess;
pub use encoding::{Encoding, EncodingBuilder};
pub use pattern::{BitPattern, Endianness};

use crate::model::behavior::Function;
use crate::model::bitslice::BitSlice;
use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::DataType;
use crate::model::value::Value;

/// A named group of instruction bits with a scalar type of the same width.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    identifier: Identifier,
    slice: BitSlice,
    ty: DataType,
}

impl Field {
    pub fn new(
        identifier: impl Into<Identifier>,
        slice: BitSlice,
        ty: DataType,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        if slice.bit_size() != ty.bit_width() {
            return Err(ModelError::shape(format!(
                "field type {ty} is {} bits wide but its bit slice {slice} covers {} bits",
                ty.bit_width(),
                slice.bit_size()
            ))
            .with_definition(&identifier)
            .with_context("bit slice", &slice));
        }
        Ok(Self {
            identifier,
            slice,
            ty,
        })
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        self.identifier.simple_name()
    }

    pub fn bit_slice(&self) -> &BitSlice {
        &self.slice
    }

    pub fn ty(&self) -> DataType {
        self.ty
    }

    pub fn size(&self) -> u32 {
        self.slice.bit_size()
    }

    /// Gathers the field's bits out of `word` and tags them with the field type.
    pub fn extract(&self, word: &Value) -> ModelResult<Value> {
        word.slice(&self.slice)?
            .trivial_cast_to(self.ty)
            .map_err(|err| err.with_definition(&self.identifier))
    }

    /// Scatters `value` into a copy of `word` at the field's bit positions.
    pub fn insert(&self, word: &Value, value: &Value) -> ModelResult<Value> {
        let value = value
            .trivial_cast_to(self.ty)
            .map_err(|err| err.with_definition(&self.identifier))?;
        if self.slice.msb() >= word.bit_width() {
            return Err(ModelError::shape(format!(
                "field {} at {} does not fit a {}-bit word",
                self.identifier,
                self.slice,
                word.bit_width()
            ))
            .with_definition(&self.identifier));
        }
        let mut pattern: BigUint = word.unsigned_integer().clone();
        for (source, target) in self.slice.value_positions().enumerate() {
            pattern.set_bit(u64::from(target), value.bit(source as u32));
        }
        Ok(Value::from_masked(pattern, word.ty()))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}: {}", self.name(), self.slice, self.ty)
    }
}

/// Immutable instruction layout.
#[derive(Debug)]
pub struct Format {
    identifier: Identifier,
    width: u32,
    fields: Vec<Field>,
    accesses: Vec<FieldAccess>,
    field_index: AHashMap<String, usize>,
    access_index: AHashMap<String, usize>,
}

impl Format {
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Type of a whole instruction word.
    pub fn word_type(&self) -> DataType {
        DataType::bits(self.width)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_index.get(name).map(|&idx| &self.fields[idx])
    }

    pub(crate) fn field_position(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    pub fn field_accesses(&self) -> &[FieldAccess] {
        &self.accesses
    }

    pub fn field_access(&self, name: &str) -> Option<&FieldAccess> {
        self.access_index.get(name).map(|&idx| &self.accesses[idx])
    }

    /// Word bits not covered by any field, ascending.
    pub fn uncovered_bits(&self) -> Vec<u32> {
        (0..self.width)
            .filter(|bit| !self.fields.iter().any(|field| field.slice.contains(*bit)))
            .collect()
    }

    /// Every pair of fields sharing at least one bit, in declaration order.
    pub fn overlapping_fields(&self) -> Vec<(&Field, &Field)> {
        let mut pairs = Vec::new();
        for (idx, first) in self.fields.iter().enumerate() {
            for second in &self.fields[idx + 1..] {
                if first.slice.overlaps(&second.slice) {
                    pairs.push((first, second));
                }
            }
        }
        pairs
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "format {}: Bits<{}> {{", self.identifier, self.width)?;
        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, " {field}")?;
        }
        write!(f, " }}")
    }
}

/// Collects fields and field accesses, then freezes them into a [`Format`].
pub struct FormatBuilder {
    identifier: Identifier,
    width: u32,
    fields: Vec<Field>,
    accesses: Vec<FieldAccess>,
    field_index: AHashMap<String, usize>,
    access_index: AHashMap<String, usize>,
}

impl FormatBuilder {
    pub fn new(identifier: impl Into<Identifier>, width: u32) -> Self {
        Self {
            identifier: identifier.into(),
            width,
            fields: Vec::new(),
            accesses: Vec::new(),
            field_index: AHashMap::new(),
            access_index: AHashMap::new(),
        }
    }

    /// Appends a field named `FORMAT::name`.
    pub fn field(&mut self, name: &str, slice: BitSlice, ty: DataType) -> ModelResult<&mut Self> {
        let identifier = self.identifier.append(name);
        self.ensure_unique(name, &identifier)?;
        if slice.msb() >= self.width {
            return Err(ModelError::shape(format!(
                "field {name}{slice} exceeds the {}-bit format",
                self.width
            ))
            .with_definition(&identifier));
        }
        let field = Field::new(identifier, slice, ty)?;
        self.field_index.insert(name.to_string(), self.fields.len());
        self.fields.push(field);
        Ok(self)
    }

    /// Shorthand for a contiguous `Bits` field.
    pub fn bits_field(&mut self, name: &str, msb: u32, lsb: u32) -> ModelResult<&mut Self> {
        let slice = BitSlice::of(msb, lsb)?;
        let ty = DataType::bits(slice.bit_size());
        self.field(name, slice, ty)
    }

    /// Appends a field access over one of the fields declared so far.
    pub fn field_access(
        &mut self,
        name: &str,
        decode: Function,
        encode: Function,
        predicate: Option<Function>,
    ) -> ModelResult<&mut Self> {
        let identifier = self.identifier.append(name);
        self.ensure_unique(name, &identifier)?;
        let access = FieldAccess::new(identifier, &self.fields, decode, encode, predicate)?;
        self.access_index.insert(name.to_string(), self.accesses.len());
        self.accesses.push(access);
        Ok(self)
    }

    fn ensure_unique(&self, name: &str, identifier: &Identifier) -> ModelResult<()> {
        if self.field_index.contains_key(name) || self.access_index.contains_key(name) {
            return Err(ModelError::shape(format!(
                "'{name}' is declared more than once in format {}",
                self.identifier
            ))
            .with_definition(identifier));
        }
        Ok(())
    }

    pub fn build(self) -> Arc<Format> {
        Arc::new(Format {
            identifier: self.identifier,
            width: self.width,
            fields: self.fields,
            accesses: self.accesses,
            field_index: self.field_index,
            access_index: self.access_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bitslice::Part;
    use crate::model::error::ModelErrorKind;

    fn i_type() -> Arc<Format> {
        let mut builder = FormatBuilder::new("Itype", 32);
        builder
            .bits_field("opcode", 6, 0)
            .and_then(|b| b.bits_field("rd", 11, 7))
            .and_then(|b| b.bits_field("funct3", 14, 12))
            .and_then(|b| b.bits_field("rs1", 19, 15))
            .and_then(|b| b.field("imm", BitSlice::of(31, 20).unwrap(), DataType::sint(12)))
            .expect("I-type fields are valid");
        builder.build()
    }

    #[test]
    fn field_width_must_match_slice() {
        let err = Field::new("imm", BitSlice::of(31, 20).unwrap(), DataType::bits(11))
            .expect_err("12 bits vs Bits<11>");
        assert_eq!(err.kind(), ModelErrorKind::Shape);
        assert_eq!(err.context_value("definition"), Some("imm"));
    }

    #[test]
    fn fields_keep_declaration_order() {
        let format = i_type();
        let names: Vec<&str> = format.fields().iter().map(Field::name).collect();
        assert_eq!(names, ["opcode", "rd", "funct3", "rs1", "imm"]);
        assert_eq!(format.field("rs1").map(|f| f.identifier().name()), Some("Itype::rs1".into()));
        assert!(format.uncovered_bits().is_empty());
        assert!(format.overlapping_fields().is_empty());
    }

    #[test]
    fn extract_and_insert_are_inverse() {
        let format = i_type();
        // addi x1, x2, -1
        let word = Value::from_twos_complement(0xfff1_0093u32, DataType::bits(32)).unwrap();
        let imm = format.field("imm").unwrap();
        let decoded = imm.extract(&word).unwrap();
        assert_eq!(decoded.to_i64(), Some(-1));
        assert_eq!(format.field("rs1").unwrap().extract(&word).unwrap().to_u64(), Some(2));

        let cleared = imm.insert(&word, &Value::zero(DataType::sint(12))).unwrap();
        assert_eq!(cleared.to_u64(), Some(0x0001_0093));
        assert_eq!(imm.insert(&cleared, &decoded).unwrap(), word);
    }

    #[test]
    fn scattered_field_extracts_in_declaration_order() {
        let slice = BitSlice::new([Part::new(7, 6).unwrap(), Part::new(1, 0).unwrap()]).unwrap();
        let field = Field::new("split", slice, DataType::bits(4)).unwrap();
        let word = Value::of(0b1000_0001, DataType::bits(8)).unwrap();
        assert_eq!(field.extract(&word).unwrap().to_u64(), Some(0b1001));
    }

    #[test]
    fn builder_rejects_duplicates_and_out_of_range_fields() {
        let mut builder = FormatBuilder::new("F", 16);
        builder.bits_field("a", 3, 0).unwrap();
        let err = builder.bits_field("a", 7, 4).map(|_| ()).expect_err("duplicate");
        assert_eq!(err.kind(), ModelErrorKind::Shape);
        let err = builder.bits_field("b", 16, 8).map(|_| ()).expect_err("beyond width");
        assert!(err.message().contains("exceeds the 16-bit format"));
    }

    #[test]
    fn overlapping_fields_are_reported() {
        let mut builder = FormatBuilder::new("F", 8);
        builder.bits_field("hi", 7, 4).unwrap();
        builder.bits_field("mid", 5, 2).unwrap();
        let format = builder.build();
        let pairs: Vec<(&str, &str)> = format
            .overlapping_fields()
            .into_iter()
            .map(|(a, b)| (a.name(), b.name()))
            .collect();
        assert_eq!(pairs, [("hi", "mid")]);
        assert_eq!(format.uncovered_bits(), [0, 1]);
    }
}
