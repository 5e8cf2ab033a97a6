use std::fmt;
use std::sync::Arc;

use super::RegisterTensor;
use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::DataType;
use crate::model::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CounterKind {
    ProgramCounter,
    GroupCounter,
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterKind::ProgramCounter => write!(f, "program counter"),
            CounterKind::GroupCounter => write!(f, "group counter"),
        }
    }
}

/// Which instruction the counter value refers to relative to the executing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CounterPosition {
    Current,
    Next,
    NextNext,
}

/// Storage a counter lives in. The ISA owns the referenced tensor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CounterTarget {
    Register(Arc<RegisterTensor>),
    RegisterFileElement {
        file: Arc<RegisterTensor>,
        index: Value,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Counter {
    identifier: Identifier,
    kind: CounterKind,
    position: CounterPosition,
    target: CounterTarget,
}

impl Counter {
    pub fn register(
        identifier: impl Into<Identifier>,
        register: Arc<RegisterTensor>,
        position: CounterPosition,
        kind: CounterKind,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        if !register.is_single_register() {
            return Err(ModelError::shape(format!(
                "{kind} must be a single register, '{}' has {} dimensions",
                register.identifier(),
                register.dim_count()
            ))
            .with_definition(&identifier));
        }
        Ok(Self {
            identifier,
            kind,
            position,
            target: CounterTarget::Register(register),
        })
    }

    /// A counter stored in one element of a register file, e.g. `X(15)`.
    pub fn register_file_element(
        identifier: impl Into<Identifier>,
        file: Arc<RegisterTensor>,
        index: Value,
        position: CounterPosition,
        kind: CounterKind,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        let Some(address_type) = file.address_type().filter(|_| file.is_register_file()) else {
            return Err(ModelError::shape(format!(
                "'{}' is not a register file",
                file.identifier()
            ))
            .with_definition(&identifier));
        };
        if !index.ty().is_trivial_cast_to(address_type) {
            return Err(ModelError::type_mismatch(format!(
                "index type {} does not match register file address type {address_type}",
                index.ty()
            ))
            .with_definition(&identifier));
        }
        Ok(Self {
            identifier,
            kind,
            position,
            target: CounterTarget::RegisterFileElement { file, index },
        })
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn kind(&self) -> CounterKind {
        self.kind
    }

    pub fn position(&self) -> CounterPosition {
        self.position
    }

    pub fn target(&self) -> &CounterTarget {
        &self.target
    }

    /// The register tensor holding the counter value.
    pub fn resource(&self) -> &Arc<RegisterTensor> {
        match &self.target {
            CounterTarget::Register(register) => register,
            CounterTarget::RegisterFileElement { file, .. } => file,
        }
    }

    pub fn result_type(&self) -> DataType {
        self.resource().result_type()
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.identifier, self.result_type())?;
        match &self.target {
            CounterTarget::Register(register) if register.identifier() != &self.identifier => {
                write!(f, " = {}", register.identifier())
            }
            CounterTarget::Register(_) => Ok(()),
            CounterTarget::RegisterFileElement { file, index } => {
                write!(f, " = {}({})", file.identifier(), index.decimal())
            }
        }
    }
}
