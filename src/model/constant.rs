//! Constants of every kind: scalar values, tuples, slices and strings.

use std::fmt;

use crate::model::bitslice::BitSlice;
use crate::model::error::{ModelError, ModelResult};
use crate::model::types::{TupleType, Type};
use crate::model::value::{StatusFlags, Value};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constant {
    Value(Value),
    Tuple(Tuple),
    BitSlice(BitSlice),
    Str(String),
}

impl Constant {
    pub fn ty(&self) -> Type {
        match self {
            Constant::Value(value) => Type::Data(value.ty()),
            Constant::Tuple(tuple) => Type::Tuple(tuple.ty().clone()),
            Constant::BitSlice(_) => Type::BitSlice,
            Constant::Str(_) => Type::Str,
        }
    }

    pub fn as_value(&self) -> ModelResult<&Value> {
        match self {
            Constant::Value(value) => Ok(value),
            other => Err(ModelError::type_mismatch(format!(
                "expected a scalar constant, found {}",
                other.ty()
            ))
            .with_context("constant", other)),
        }
    }

    pub fn as_tuple(&self) -> ModelResult<&Tuple> {
        match self {
            Constant::Tuple(tuple) => Ok(tuple),
            other => Err(ModelError::type_mismatch(format!(
                "expected a tuple constant, found {}",
                other.ty()
            ))
            .with_context("constant", other)),
        }
    }
}

impl From<Value> for Constant {
    fn from(value: Value) -> Self {
        Constant::Value(value)
    }
}

impl From<Tuple> for Constant {
    fn from(value: Tuple) -> Self {
        Constant::Tuple(value)
    }
}

impl From<BitSlice> for Constant {
    fn from(value: BitSlice) -> Self {
        Constant::BitSlice(value)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Value(value) => write!(f, "{value}"),
            Constant::Tuple(tuple) => write!(f, "{tuple}"),
            Constant::BitSlice(slice) => write!(f, "{slice}"),
            Constant::Str(text) => write!(f, "{text:?}"),
        }
    }
}

/// Fixed-arity aggregate of constants with a composite type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tuple {
    elements: Vec<Constant>,
    ty: TupleType,
}

impl Tuple {
    /// Builds a tuple whose type is inferred from its elements.
    pub fn new(elements: impl IntoIterator<Item = Constant>) -> Self {
        let elements: Vec<Constant> = elements.into_iter().collect();
        let ty = TupleType::new(elements.iter().map(Constant::ty));
        Self { elements, ty }
    }

    /// Builds a tuple with an explicitly supplied type that must agree with the elements.
    pub fn with_type(
        elements: impl IntoIterator<Item = Constant>,
        ty: TupleType,
    ) -> ModelResult<Self> {
        let tuple = Self::new(elements);
        if tuple.ty != ty {
            return Err(ModelError::type_mismatch(format!(
                "tuple elements have type {} but {ty} was declared",
                tuple.ty
            ))
            .with_context("tuple", &tuple));
        }
        Ok(tuple)
    }

    pub fn pair(first: impl Into<Constant>, second: impl Into<Constant>) -> Self {
        Self::new([first.into(), second.into()])
    }

    /// `(zero, carry, overflow, negative)` as four booleans.
    pub fn status(zero: bool, carry: bool, overflow: bool, negative: bool) -> Self {
        Self::new(
            [zero, carry, overflow, negative]
                .into_iter()
                .map(|flag| Constant::Value(Value::of_bool(flag))),
        )
    }

    pub fn ty(&self) -> &TupleType {
        &self.ty
    }

    pub fn elements(&self) -> &[Constant] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> ModelResult<&Constant> {
        self.elements.get(index).ok_or_else(|| {
            ModelError::shape(format!(
                "tuple index {index} is out of bounds for arity {}",
                self.len()
            ))
            .with_context("tuple", self)
        })
    }

    pub fn value(&self, index: usize) -> ModelResult<&Value> {
        self.get(index)?.as_value()
    }

    pub fn first_value(&self) -> ModelResult<&Value> {
        self.value(0)
    }

    /// Reads the tuple back as status flags; it must be a four-boolean status tuple.
    pub fn to_status_flags(&self) -> ModelResult<StatusFlags> {
        if self.ty != TupleType::status() {
            return Err(ModelError::type_mismatch(format!(
                "expected a status tuple, found {}",
                self.ty
            ))
            .with_context("tuple", self));
        }
        Ok(StatusFlags::from_bools(
            self.value(0)?.as_bool()?,
            self.value(1)?.as_bool()?,
            self.value(2)?.as_bool()?,
            self.value(3)?.as_bool()?,
        ))
    }
}

impl fmt::Display for Tuple {
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
