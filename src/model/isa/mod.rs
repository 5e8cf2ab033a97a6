//! The instruction set container: owner of every format, resource, counter, instruction and ABI.
//!
//! An [`Isa`] is produced by [`IsaBuilder`] and never changes afterwards. Everything else in the
//! model refers to the definitions it owns; [`Isa::definitions`] walks them in declaration order
//! and [`Isa::verify`] runs the cross-definition checks of [`Verifier`].

mod builder;
mod validator;

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

pub use builder::{InstructionBuilder, IsaBuilder};
pub use validator::Verifier;

use crate::model::abi::Abi;
use crate::model::diagnostic::ModelDiagnostic;
use crate::model::error::VerifyError;
use crate::model::format::{BitPattern, Encoding, Field, FieldAccess, Format};
use crate::model::identifier::Identifier;
use crate::model::resource::{Counter, Resource};
use crate::model::value::Value;

/// A named encoding over one format.
#[derive(Clone, Debug)]
pub struct Instruction {
    identifier: Identifier,
    encoding: Encoding,
    pattern: BitPattern,
}

impl Instruction {
    pub fn new(identifier: impl Into<Identifier>, encoding: Encoding) -> Self {
        let pattern = encoding.pattern();
        Self {
            identifier: identifier.into(),
            encoding,
            pattern,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn format(&self) -> &Arc<Format> {
        self.encoding.format()
    }

    pub fn pattern(&self) -> &BitPattern {
        &self.pattern
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instruction {}: {} = {}",
            self.identifier,
            self.format().identifier(),
            self.pattern
        )
    }
}

/// Borrowed view of any definition the ISA owns.
#[derive(Clone, Copy, Debug)]
pub enum DefinitionRef<'a> {
    Format(&'a Format),
    Field(&'a Field),
    FieldAccess(&'a FieldAccess),
    Resource(&'a Resource),
    Counter(&'a Counter),
    Instruction(&'a Instruction),
    Encoding(&'a Encoding),
    Abi(&'a Abi),
}

impl<'a> DefinitionRef<'a> {
    pub fn identifier(&self) -> &'a Identifier {
        match *self {
            DefinitionRef::Format(format) => format.identifier(),
            DefinitionRef::Field(field) => field.identifier(),
            DefinitionRef::FieldAccess(access) => access.identifier(),
            DefinitionRef::Resource(resource) => resource.identifier(),
            DefinitionRef::Counter(counter) => counter.identifier(),
            DefinitionRef::Instruction(instruction) => instruction.identifier(),
            DefinitionRef::Encoding(encoding) => encoding.identifier(),
            DefinitionRef::Abi(abi) => abi.identifier(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            DefinitionRef::Format(_) => "format",
            DefinitionRef::Field(_) => "field",
            DefinitionRef::FieldAccess(_) => "field access",
            DefinitionRef::Resource(_) => "resource",
            DefinitionRef::Counter(_) => "counter",
            DefinitionRef::Instruction(_) => "instruction",
            DefinitionRef::Encoding(_) => "encoding",
            DefinitionRef::Abi(_) => "abi",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Format(usize),
    Resource(usize),
    Counter(usize),
    Instruction(usize),
    Abi(usize),
}

/// Immutable instruction set architecture.
#[derive(Debug)]
pub struct Isa {
    identifier: Identifier,
    formats: Vec<Arc<Format>>,
    resources: Vec<Resource>,
    counters: Vec<Counter>,
    instructions: Vec<Instruction>,
    abis: Vec<Abi>,
    order: Vec<Slot>,
    index: AHashMap<String, Slot>,
}

impl Isa {
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn formats(&self) -> &[Arc<Format>] {
        &self.formats
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn counters(&self) -> &[Counter] {
        &self.counters
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn abis(&self) -> &[Abi] {
        &self.abis
    }

    pub fn format(&self, name: &str) -> Option<&Arc<Format>> {
        match self.index.get(name)? {
            Slot::Format(idx) => Some(&self.formats[*idx]),
            _ => None,
        }
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        match self.index.get(name)? {
            Slot::Resource(idx) => Some(&self.resources[*idx]),
            _ => None,
        }
    }

    pub fn counter(&self, name: &str) -> Option<&Counter> {
        match self.index.get(name)? {
            Slot::Counter(idx) => Some(&self.counters[*idx]),
            _ => None,
        }
    }

    pub fn instruction(&self, name: &str) -> Option<&Instruction> {
        match self.index.get(name)? {
            Slot::Instruction(idx) => Some(&self.instructions[*idx]),
            _ => None,
        }
    }

    pub fn abi(&self, name: &str) -> Option<&Abi> {
        match self.index.get(name)? {
            Slot::Abi(idx) => Some(&self.abis[*idx]),
            _ => None,
        }
    }

    /// Looks up any definition by qualified name, including format members (`Rtype::rs1`).
    pub fn lookup(&self, name: &str) -> Option<DefinitionRef<'_>> {
        if let Some(slot) = self.index.get(name) {
            return Some(self.slot_ref(*slot));
        }
        let (scope, member) = name.rsplit_once("::")?;
        let format = self.format(scope)?;
        format
            .field(member)
            .map(DefinitionRef::Field)
            .or_else(|| format.field_access(member).map(DefinitionRef::FieldAccess))
    }

    fn slot_ref(&self, slot: Slot) -> DefinitionRef<'_> {
        match slot {
            Slot::Format(idx) => DefinitionRef::Format(&self.formats[idx]),
            Slot::Resource(idx) => DefinitionRef::Resource(&self.resources[idx]),
            Slot::Counter(idx) => DefinitionRef::Counter(&self.counters[idx]),
            Slot::Instruction(idx) => DefinitionRef::Instruction(&self.instructions[idx]),
            Slot::Abi(idx) => DefinitionRef::Abi(&self.abis[idx]),
        }
    }

    /// Every definition in declaration order. Formats are followed by their fields and field
    /// accesses, instructions by their encoding.
    pub fn definitions(&self) -> Vec<DefinitionRef<'_>> {
        let mut definitions = Vec::new();
        for slot in &self.order {
            definitions.push(self.slot_ref(*slot));
            match *slot {
                Slot::Format(idx) => {
                    let format = &self.formats[idx];
                    definitions.extend(format.fields().iter().map(DefinitionRef::Field));
                    definitions.extend(
                        format
                            .field_accesses()
                            .iter()
                            .map(DefinitionRef::FieldAccess),
                    );
                }
                Slot::Instruction(idx) => {
                    definitions.push(DefinitionRef::Encoding(self.instructions[idx].encoding()));
                }
                Slot::Resource(_) | Slot::Counter(_) | Slot::Abi(_) => {}
            }
        }
        definitions
    }

    /// The most specific instruction whose pattern matches `word`; earlier declarations win ties.
    pub fn decode(&self, word: &Value) -> Option<&Instruction> {
        let mut best: Option<&Instruction> = None;
        for instruction in &self.instructions {
            if !instruction.pattern.matches(word) {
                continue;
            }
            let better = best.is_none_or(|current| {
                instruction.pattern.specificity() > current.pattern.specificity()
            });
            if better {
                best = Some(instruction);
            }
        }
        best
    }

    /// Runs the [`Verifier`]; warnings are returned, errors fail the call.
    pub fn verify(&self) -> Result<Vec<ModelDiagnostic>, VerifyError> {
        Verifier::new().verify(self)
    }
}
