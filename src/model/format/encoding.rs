use std::fmt;
use std::sync::Arc;

use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::value::Value;

use super::{BitPattern, Field, Format};

/// Constants an instruction binds to some of its format's fields.
#[derive(Clone, Debug)]
pub struct Encoding {
    identifier: Identifier,
    format: Arc<Format>,
    bindings: Vec<(usize, Value)>,
}

impl Encoding {
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn format(&self) -> &Arc<Format> {
        &self.format
    }

    /// Bound fields with their constants, in binding order.
    pub fn encoded_fields(&self) -> impl Iterator<Item = (&Field, &Value)> + '_ {
        self.bindings
            .iter()
            .map(|(idx, value)| (&self.format.fields()[*idx], value))
    }

    pub fn field_encoding_of(&self, name: &str) -> Option<&Value> {
        let position = self.format.field_position(name)?;
        self.bindings
            .iter()
            .find(|(idx, _)| *idx == position)
            .map(|(_, value)| value)
    }

    pub fn is_encoded(&self, name: &str) -> bool {
        self.field_encoding_of(name).is_some()
    }

    /// Fields left to operands, in format declaration order.
    pub fn non_encoded_fields(&self) -> Vec<&Field> {
        self.format
            .fields()
            .iter()
            .enumerate()
            .filter(|(position, _)| !self.bindings.iter().any(|(idx, _)| idx == position))
            .map(|(_, field)| field)
            .collect()
    }

    /// Scatters every bound constant over an all-wildcard word of the format's width.
    pub fn pattern(&self) -> BitPattern {
        let mut pattern = BitPattern::wildcard(self.format.width());
        for (field, value) in self.encoded_fields() {
            for (source, target) in field.bit_slice().value_positions().enumerate() {
                pattern.fix_bit(target, value.bit(source as u32));
            }
        }
        pattern
    }

    /// Builds a concrete word from the bound constants plus one value per non-encoded field.
    pub fn assemble(&self, operands: &[(&str, Value)]) -> ModelResult<Value> {
        for (name, _) in operands {
            if self.format.field(name).is_none() || self.is_encoded(name) {
                return Err(ModelError::shape(format!(
                    "'{name}' is not an operand field of {}",
                    self.format.identifier()
                ))
                .with_definition(&self.identifier));
            }
        }
        let mut word = self.pattern().value();
        for field in self.non_encoded_fields() {
            let Some((_, value)) = operands.iter().find(|(name, _)| *name == field.name()) else {
                return Err(ModelError::shape(format!(
                    "no operand supplied for field '{}'",
                    field.name()
                ))
                .with_definition(&self.identifier));
            };
            word = field.insert(&word, value)?;
        }
        Ok(word)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding {}: {} {{", self.identifier, self.format.identifier())?;
        for (idx, (field, value)) in self.encoded_fields().enumerate() {
            if idx > 0 {
                write!(f, ",")?;
            }
            write!(f, " {} = {}", field.name(), value.binary())?;
        }
        write!(f, " }}")
    }
}

/// Accumulates field bindings for one instruction.
pub struct EncodingBuilder {
    identifier: Identifier,
    format: Arc<Format>,
    bindings: Vec<(usize, Value)>,
}

impl EncodingBuilder {
    pub fn new(identifier: impl Into<Identifier>, format: Arc<Format>) -> Self {
        Self {
            identifier: identifier.into(),
            format,
            bindings: Vec::new(),
        }
    }

    /// Binds `value` to `field`. The value type must equal the field type exactly.
    pub fn add(&mut self, field: &str, value: Value) -> ModelResult<&mut Self> {
        let Some(position) = self.format.field_position(field) else {
            return Err(ModelError::shape(format!(
                "format {} has no field '{field}'",
                self.format.identifier()
            ))
            .with_definition(&self.identifier));
        };
        let target = &self.format.fields()[position];
        if let Some((_, bound)) = self.bindings.iter().find(|(idx, _)| *idx == position) {
            return Err(ModelError::double_binding(format!(
                "field '{field}' is already encoded"
            ))
            .with_definition(&self.identifier)
            .with_context("bound", bound)
            .with_context("rejected", &value));
        }
        if value.ty() != target.ty() {
            return Err(ModelError::type_mismatch(format!(
                "field '{field}' has type {} but the encoded constant has type {}",
                target.ty(),
                value.ty()
            ))
            .with_definition(&self.identifier));
        }
        for (idx, bound) in &self.bindings {
            let other = &self.format.fields()[*idx];
            if let Some(bit) = conflicting_bit(other, bound, target, &value) {
                return Err(ModelError::double_binding(format!(
                    "field '{field}' fixes bit {bit} differently from field '{}'",
                    other.name()
                ))
                .with_definition(&self.identifier)
                .with_context("bound", bound)
                .with_context("rejected", &value));
            }
        }
        self.bindings.push((position, value));
        Ok(self)
    }

    /// Binds a logical integer converted to the field's own type.
    pub fn add_integer(&mut self, field: &str, integer: i64) -> ModelResult<&mut Self> {
        let ty = self
            .format
            .field(field)
            .map(Field::ty)
            .ok_or_else(|| {
                ModelError::shape(format!(
                    "format {} has no field '{field}'",
                    self.format.identifier()
                ))
                .with_definition(&self.identifier)
            })?;
        let value = Value::from_integer(integer, ty)
            .map_err(|err| err.with_definition(&self.identifier))?;
        self.add(field, value)
    }

    pub fn build(self) -> Encoding {
        Encoding {
            identifier: self.identifier,
            format: self.format,
            bindings: self.bindings,
        }
    }
}

/// Lowest-significance bit of `second` that `first` already fixes to the other value.
fn conflicting_bit(
    first: &Field,
    first_value: &Value,
    second: &Field,
    second_value: &Value,
) -> Option<u32> {
    if !first.bit_slice().overlaps(second.bit_slice()) {
        return None;
    }
    let fixed: Vec<(u32, bool)> = first
        .bit_slice()
        .value_positions()
        .enumerate()
        .map(|(source, target)| (target, first_value.bit(source as u32)))
        .collect();
    second
        .bit_slice()
        .value_positions()
        .enumerate()
        .find_map(|(source, target)| {
            let set = second_value.bit(source as u32);
            fixed
                .iter()
                .any(|&(bit, fixed_set)| bit == target && fixed_set != set)
                .then_some(target)
        })
}
