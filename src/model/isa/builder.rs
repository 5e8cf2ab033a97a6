//! Programmatic construction of an [`Isa`].
//!
//! Every registration is checked eagerly for name clashes so the frozen ISA can index its
//! definitions by qualified name. Cross-definition consistency is left to the verifier.

use std::sync::Arc;

use ahash::AHashMap;

use super::{Instruction, Isa, Slot};
use crate::model::abi::Abi;
use crate::model::error::{ModelError, ModelResult};
use crate::model::format::{EncodingBuilder, Format};
use crate::model::identifier::Identifier;
use crate::model::resource::{Counter, Resource};
use crate::model::value::Value;

/// Collects the definitions of one instruction set.
pub struct IsaBuilder {
    identifier: Identifier,
    formats: Vec<Arc<Format>>,
    resources: Vec<Resource>,
    counters: Vec<Counter>,
    instructions: Vec<Instruction>,
    abis: Vec<Abi>,
    order: Vec<Slot>,
    index: AHashMap<String, Slot>,
}

impl IsaBuilder {
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            formats: Vec::new(),
            resources: Vec::new(),
            counters: Vec::new(),
            instructions: Vec::new(),
            abis: Vec::new(),
            order: Vec::new(),
            index: AHashMap::new(),
        }
    }

    pub fn add_format(&mut self, format: Arc<Format>) -> ModelResult<&mut Self> {
        self.register(format.identifier(), Slot::Format(self.formats.len()))?;
        self.formats.push(format);
        Ok(self)
    }

    pub fn add_resource(&mut self, resource: impl Into<Resource>) -> ModelResult<&mut Self> {
        let resource = resource.into();
        self.register(resource.identifier(), Slot::Resource(self.resources.len()))?;
        self.resources.push(resource);
        Ok(self)
    }

    /// Registers a counter. Whether its register belongs to this ISA is checked on verification.
    pub fn add_counter(&mut self, counter: Counter) -> ModelResult<&mut Self> {
        self.register(counter.identifier(), Slot::Counter(self.counters.len()))?;
        self.counters.push(counter);
        Ok(self)
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> ModelResult<&mut Self> {
        self.ensure_owned_format(instruction.format(), instruction.identifier())?;
        self.register(
            instruction.identifier(),
            Slot::Instruction(self.instructions.len()),
        )?;
        self.instructions.push(instruction);
        Ok(self)
    }

    /// Registers a calling convention. Its registers are checked against the resources on
    /// verification.
    pub fn add_abi(&mut self, abi: Abi) -> ModelResult<&mut Self> {
        self.register(abi.identifier(), Slot::Abi(self.abis.len()))?;
        self.abis.push(abi);
        Ok(self)
    }

    /// Begins an instruction over the registered format `format`; call
    /// [`InstructionBuilder::finish`] to push it.
    pub fn instruction(
        &mut self,
        name: impl Into<Identifier>,
        format: &str,
    ) -> ModelResult<InstructionBuilder<'_>> {
        let identifier = name.into();
        self.ensure_unique(&identifier)?;
        let Some(Slot::Format(idx)) = self.index.get(format).copied() else {
            return Err(ModelError::shape(format!("unknown format '{format}'"))
                .with_definition(&identifier));
        };
        let encoding = EncodingBuilder::new(
            identifier.append("encoding"),
            Arc::clone(&self.formats[idx]),
        );
        Ok(InstructionBuilder {
            builder: self,
            identifier,
            encoding,
        })
    }

    fn ensure_owned_format(&self, format: &Arc<Format>, owner: &Identifier) -> ModelResult<()> {
        if self.formats.iter().any(|owned| Arc::ptr_eq(owned, format)) {
            return Ok(());
        }
        Err(ModelError::shape(format!(
            "format {} is not part of {}",
            format.identifier(),
            self.identifier
        ))
        .with_definition(owner))
    }

    fn ensure_unique(&self, identifier: &Identifier) -> ModelResult<()> {
        if self.index.contains_key(&identifier.name()) {
            return Err(ModelError::shape(format!(
                "'{identifier}' is defined more than once in {}",
                self.identifier
            ))
            .with_definition(identifier));
        }
        Ok(())
    }

    fn register(&mut self, identifier: &Identifier, slot: Slot) -> ModelResult<()> {
        self.ensure_unique(identifier)?;
        self.index.insert(identifier.name(), slot);
        self.order.push(slot);
        Ok(())
    }

    pub fn build(self) -> Isa {
        Isa {
            identifier: self.identifier,
            formats: self.formats,
            resources: self.resources,
            counters: self.counters,
            instructions: self.instructions,
            abis: self.abis,
            order: self.order,
            index: self.index,
        }
    }
}

/// Binds the constant fields of one instruction before handing it back to the [`IsaBuilder`].
pub struct InstructionBuilder<'a> {
    builder: &'a mut IsaBuilder,
    identifier: Identifier,
    encoding: EncodingBuilder,
}

impl<'a> InstructionBuilder<'a> {
    pub fn bind(mut self, field: &str, value: Value) -> ModelResult<Self> {
        self.encoding.add(field, value)?;
        Ok(self)
    }

    /// Binds a logical integer converted to the field's type.
    pub fn bind_integer(mut self, field: &str, integer: i64) -> ModelResult<Self> {
        self.encoding.add_integer(field, integer)?;
        Ok(self)
    }

    /// Completes the instruction and pushes it into the owning builder.
    pub fn finish(self) -> &'a mut IsaBuilder {
        let slot = Slot::Instruction(self.builder.instructions.len());
        self.builder.index.insert(self.identifier.name(), slot);
        self.builder.order.push(slot);
        self.builder
            .instructions
            .push(Instruction::new(self.identifier, self.encoding.build()));
        self.builder
    }
}
