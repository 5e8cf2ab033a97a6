//! Storage declared by an ISA.
//!
//! Every resource answers the same four questions: whether it is addressed, by what, what one
//! access yields, and the relation between the two. [`Resource`] closes the family so consumers
//! match exhaustively instead of downcasting.

mod artificial;
mod counter;
mod tensor;

use std::fmt;
use std::sync::Arc;

pub use artificial::{ArtificialKind, ArtificialResource};
pub use counter::{Counter, CounterKind, CounterPosition, CounterTarget};
pub use tensor::{Dimension, RegisterTensor, TensorConstraint};

use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::{DataType, RelationType};

/// An unaddressed wire carrying one value per cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signal {
    identifier: Identifier,
    result_type: DataType,
}

impl Signal {
    pub fn new(identifier: impl Into<Identifier>, result_type: DataType) -> Self {
        Self {
            identifier: identifier.into(),
            result_type,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn result_type(&self) -> DataType {
        self.result_type
    }
}

/// Byte- or word-addressed memory with no declared element count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memory {
    identifier: Identifier,
    address_type: DataType,
    word_type: DataType,
}

impl Memory {
    pub fn new(
        identifier: impl Into<Identifier>,
        address_type: DataType,
        word_type: DataType,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        if address_type.is_bool() || word_type.is_bool() {
            return Err(ModelError::type_mismatch(format!(
                "memory must use bits types, got {address_type} -> {word_type}"
            ))
            .with_definition(&identifier));
        }
        Ok(Self {
            identifier,
            address_type,
            word_type,
        })
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn address_type(&self) -> DataType {
        self.address_type
    }

    pub fn word_type(&self) -> DataType {
        self.word_type
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Signal,
    Register,
    RegisterFile,
    RegisterTensor,
    Memory,
    Artificial,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Signal => "signal",
            ResourceKind::Register => "register",
            ResourceKind::RegisterFile => "register file",
            ResourceKind::RegisterTensor => "register tensor",
            ResourceKind::Memory => "memory",
            ResourceKind::Artificial => "artificial resource",
        };
        f.write_str(label)
    }
}

/// Any resource an ISA owns. Cloning shares the underlying definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resource {
    Signal(Arc<Signal>),
    Register(Arc<RegisterTensor>),
    Memory(Arc<Memory>),
    Artificial(Arc<ArtificialResource>),
}

impl Resource {
    pub fn identifier(&self) -> &Identifier {
        match self {
            Resource::Signal(signal) => signal.identifier(),
            Resource::Register(tensor) => tensor.identifier(),
            Resource::Memory(memory) => memory.identifier(),
            Resource::Artificial(artificial) => artificial.identifier(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Signal(_) => ResourceKind::Signal,
            Resource::Register(tensor) if tensor.is_single_register() => ResourceKind::Register,
            Resource::Register(tensor) if tensor.is_register_file() => ResourceKind::RegisterFile,
            Resource::Register(_) => ResourceKind::RegisterTensor,
            Resource::Memory(_) => ResourceKind::Memory,
            Resource::Artificial(_) => ResourceKind::Artificial,
        }
    }

    pub fn has_address(&self) -> bool {
        match self {
            Resource::Signal(_) => false,
            Resource::Register(tensor) => tensor.has_address(),
            Resource::Memory(_) => true,
            Resource::Artificial(artificial) => artificial.has_address(),
        }
    }

    /// Type of the outermost address, `None` for unaddressed resources.
    pub fn address_type(&self) -> Option<DataType> {
        match self {
            Resource::Signal(_) => None,
            Resource::Register(tensor) => tensor.address_type(),
            Resource::Memory(memory) => Some(memory.address_type()),
            Resource::Artificial(artificial) => artificial.address_type(),
        }
    }

    /// Type of a fully addressed access.
    pub fn result_type(&self) -> DataType {
        match self {
            Resource::Signal(signal) => signal.result_type(),
            Resource::Register(tensor) => tensor.result_type(),
            Resource::Memory(memory) => memory.word_type(),
            Resource::Artificial(artificial) => artificial.result_type(),
        }
    }

    /// Type of an access that supplies only `provided` of the address indices.
    pub fn result_type_for(&self, provided: usize) -> ModelResult<DataType> {
        if let Resource::Register(tensor) = self {
            return tensor.result_type_for(provided);
        }
        let max = usize::from(self.has_address());
        if provided > max {
            return Err(ModelError::shape(format!(
                "{provided} indices provided, at most {max} are allowed"
            ))
            .with_definition(self.identifier()));
        }
        Ok(self.result_type())
    }

    pub fn relation_type(&self) -> RelationType {
        match self {
            Resource::Register(tensor) => tensor.relation_type(),
            Resource::Artificial(artificial) => artificial.relation_type(),
            _ => RelationType::new(self.address_type(), self.result_type()),
        }
    }

    pub fn as_register(&self) -> Option<&Arc<RegisterTensor>> {
        match self {
            Resource::Register(tensor) => Some(tensor),
            _ => None,
        }
    }
}

impl From<Signal> for Resource {
    fn from(signal: Signal) -> Self {
        Resource::Signal(Arc::new(signal))
    }
}

impl From<RegisterTensor> for Resource {
    fn from(tensor: RegisterTensor) -> Self {
        Resource::Register(Arc::new(tensor))
    }
}

impl From<Arc<RegisterTensor>> for Resource {
    fn from(tensor: Arc<RegisterTensor>) -> Self {
        Resource::Register(tensor)
    }
}

impl From<Memory> for Resource {
    fn from(memory: Memory) -> Self {
        Resource::Memory(Arc::new(memory))
    }
}

impl From<ArtificialResource> for Resource {
    fn from(artificial: ArtificialResource) -> Self {
        Resource::Artificial(Arc::new(artificial))
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind(), self.identifier(), self.relation_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::error::ModelErrorKind;

    #[test]
    fn signal_has_no_address() {
        let resource = Resource::from(Signal::new("IRQ", DataType::bool()));
        assert!(!resource.has_address());
        assert_eq!(resource.address_type(), None);
        assert_eq!(resource.relation_type().to_string(), "() -> Bool");
        assert_eq!(resource.kind(), ResourceKind::Signal);
    }

    #[test]
    fn memory_relation() {
        let memory = Memory::new("MEM", DataType::bits(32), DataType::bits(8)).unwrap();
        let resource = Resource::from(memory);
        assert!(resource.has_address());
        assert_eq!(resource.address_type(), Some(DataType::bits(32)));
        assert_eq!(resource.result_type_for(1), Ok(DataType::bits(8)));
        let err = resource.result_type_for(2).expect_err("memory has one address");
        assert_eq!(err.kind(), ModelErrorKind::Shape);
        assert_eq!(resource.to_string(), "memory MEM: (Bits<32>) -> Bits<8>");
    }

    #[test]
    fn boolean_memory_is_rejected() {
        let err = Memory::new("MEM", DataType::bool(), DataType::bits(8))
            .expect_err("address must be bits");
        assert_eq!(err.kind(), ModelErrorKind::TypeMismatch);
    }

    #[test]
    fn tensor_kinds() {
        let register = Resource::from(RegisterTensor::register("PC", DataType::bits(32)).unwrap());
        assert_eq!(register.kind(), ResourceKind::Register);
        assert!(!register.has_address());

        let file = Resource::from(
            RegisterTensor::register_file("X", DataType::bits(5), DataType::bits(32)).unwrap(),
        );
        assert_eq!(file.kind(), ResourceKind::RegisterFile);
        assert_eq!(file.to_string(), "register file X: (Bits<5>) -> Bits<32>");

        let tensor = Resource::from(
            RegisterTensor::tensor(
                "V",
                [(DataType::bits(2), 4), (DataType::bits(2), 4), (DataType::bits(4), 8)],
            )
            .unwrap(),
        );
        assert_eq!(tensor.kind(), ResourceKind::RegisterTensor);
        assert_eq!(tensor.result_type_for(1), Ok(DataType::bits(32)));
    }
}
