//! Calling convention of an instruction set: which register-file elements hold the special
//! pointers, which are saved by whom and which carry arguments and results.
//!
//! An [`Abi`] only refers to registers. The register files themselves belong to the [`Isa`]
//! (see [`crate::model::isa`]); the verifier checks that every referenced file is one of them.
//!
//! [`Isa`]: crate::model::isa::Isa

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::resource::RegisterTensor;

/// Spill alignment of a register or of the stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    #[default]
    None,
    HalfWord,
    Word,
    DoubleWord,
}

impl Alignment {
    /// Alignment in bytes; `None` imposes no alignment.
    pub const fn bytes(self) -> Option<u32> {
        match self {
            Alignment::None => None,
            Alignment::HalfWord => Some(4),
            Alignment::Word => Some(8),
            Alignment::DoubleWord => Some(16),
        }
    }

    pub const fn bits(self) -> Option<u32> {
        match self.bytes() {
            Some(bytes) => Some(bytes * 8),
            None => None,
        }
    }
}

/// One element of a register file, e.g. RISC-V `X11`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterRef {
    file: Arc<RegisterTensor>,
    index: u64,
    alignment: Alignment,
}

impl RegisterRef {
    /// Fails unless `file` is a register file with an element at `index`.
    pub fn new(file: Arc<RegisterTensor>, index: u64, alignment: Alignment) -> ModelResult<Self> {
        if !file.is_register_file() {
            return Err(ModelError::shape(format!(
                "'{}' is not a register file",
                file.identifier()
            ))
            .with_context("index", index));
        }
        let size = file.outermost_dim().size();
        if index >= size {
            return Err(ModelError::range(format!(
                "register file '{}' has {size} elements, index {index} is out of range",
                file.identifier()
            ))
            .with_context("index", index));
        }
        Ok(Self {
            file,
            index,
            alignment,
        })
    }

    pub fn file(&self) -> &Arc<RegisterTensor> {
        &self.file
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    /// Same file and element, regardless of alignment.
    pub fn same_element(&self, other: &RegisterRef) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.index == other.index
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file.identifier().simple_name(), self.index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerRole {
    ReturnAddress,
    StackPointer,
    FramePointer,
    GlobalPointer,
    ThreadPointer,
}

impl fmt::Display for PointerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerRole::ReturnAddress => write!(f, "return address"),
            PointerRole::StackPointer => write!(f, "stack pointer"),
            PointerRole::FramePointer => write!(f, "frame pointer"),
            PointerRole::GlobalPointer => write!(f, "global pointer"),
            PointerRole::ThreadPointer => write!(f, "thread pointer"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Abi {
    identifier: Identifier,
    return_address: RegisterRef,
    stack_pointer: RegisterRef,
    frame_pointer: RegisterRef,
    global_pointer: RegisterRef,
    thread_pointer: Option<RegisterRef>,
    aliases: Vec<(RegisterRef, Vec<String>)>,
    alias_index: AHashMap<String, usize>,
    caller_saved: Vec<RegisterRef>,
    callee_saved: Vec<RegisterRef>,
    argument_registers: Vec<RegisterRef>,
    return_registers: Vec<RegisterRef>,
    stack_alignment: Alignment,
    transient_stack_alignment: Alignment,
    register_file_alignment: Vec<(Arc<RegisterTensor>, Alignment)>,
}

impl Abi {
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn return_address(&self) -> &RegisterRef {
        &self.return_address
    }

    pub fn stack_pointer(&self) -> &RegisterRef {
        &self.stack_pointer
    }

    pub fn frame_pointer(&self) -> &RegisterRef {
        &self.frame_pointer
    }

    pub fn global_pointer(&self) -> &RegisterRef {
        &self.global_pointer
    }

    pub fn thread_pointer(&self) -> Option<&RegisterRef> {
        self.thread_pointer.as_ref()
    }

    pub fn pointer(&self, role: PointerRole) -> Option<&RegisterRef> {
        match role {
            PointerRole::ReturnAddress => Some(&self.return_address),
            PointerRole::StackPointer => Some(&self.stack_pointer),
            PointerRole::FramePointer => Some(&self.frame_pointer),
            PointerRole::GlobalPointer => Some(&self.global_pointer),
            PointerRole::ThreadPointer => self.thread_pointer.as_ref(),
        }
    }

    pub fn caller_saved(&self) -> &[RegisterRef] {
        &self.caller_saved
    }

    pub fn callee_saved(&self) -> &[RegisterRef] {
        &self.callee_saved
    }

    pub fn argument_registers(&self) -> &[RegisterRef] {
        &self.argument_registers
    }

    pub fn return_registers(&self) -> &[RegisterRef] {
        &self.return_registers
    }

    pub fn stack_alignment(&self) -> Alignment {
        self.stack_alignment
    }

    /// Alignment the stack keeps at every instruction, not only at call boundaries.
    pub fn transient_stack_alignment(&self) -> Alignment {
        self.transient_stack_alignment
    }

    pub fn register_file_alignment(&self, file: &Arc<RegisterTensor>) -> Alignment {
        self.register_file_alignment
            .iter()
            .find(|(owned, _)| Arc::ptr_eq(owned, file))
            .map(|(_, alignment)| *alignment)
            .unwrap_or_default()
    }

    pub fn aliases(&self) -> &[(RegisterRef, Vec<String>)] {
        &self.aliases
    }

    /// Assembly names of `register`, e.g. `a0` for `X10`.
    pub fn aliases_of(&self, register: &RegisterRef) -> &[String] {
        self.aliases
            .iter()
            .find(|(aliased, _)| aliased.same_element(register))
            .map(|(_, names)| names.as_slice())
            .unwrap_or_default()
    }

    pub fn register_by_alias(&self, alias: &str) -> Option<&RegisterRef> {
        self.alias_index
            .get(alias)
            .map(|&idx| &self.aliases[idx].0)
    }

    /// Every register reference with a short description of where it is used.
    pub fn register_refs(&self) -> Vec<(String, &RegisterRef)> {
        let mut refs = Vec::new();
        for role in [
            PointerRole::ReturnAddress,
            PointerRole::StackPointer,
            PointerRole::FramePointer,
            PointerRole::GlobalPointer,
            PointerRole::ThreadPointer,
        ] {
            if let Some(register) = self.pointer(role) {
                refs.push((role.to_string(), register));
            }
        }
        let lists = [
            ("caller-saved register", &self.caller_saved),
            ("callee-saved register", &self.callee_saved),
            ("argument register", &self.argument_registers),
            ("return register", &self.return_registers),
        ];
        for (usage, registers) in lists {
            refs.extend(registers.iter().map(|register| (usage.to_string(), register)));
        }
        refs.extend(
            self.aliases
                .iter()
                .map(|(register, _)| ("aliased register".to_string(), register)),
        );
        refs
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "abi {}: ra = {}, sp = {}, fp = {}, gp = {}",
            self.identifier,
            self.return_address,
            self.stack_pointer,
            self.frame_pointer,
            self.global_pointer
        )?;
        if let Some(tp) = &self.thread_pointer {
            write!(f, ", tp = {tp}")?;
        }
        Ok(())
    }
}

/// Collects an [`Abi`]; the four mandatory pointers are checked by [`AbiBuilder::build`].
pub struct AbiBuilder {
    identifier: Identifier,
    pointers: AHashMap<PointerRole, RegisterRef>,
    aliases: Vec<(RegisterRef, Vec<String>)>,
    alias_index: AHashMap<String, usize>,
    caller_saved: Vec<RegisterRef>,
    callee_saved: Vec<RegisterRef>,
    argument_registers: Vec<RegisterRef>,
    return_registers: Vec<RegisterRef>,
    stack_alignment: Alignment,
    transient_stack_alignment: Alignment,
    register_file_alignment: Vec<(Arc<RegisterTensor>, Alignment)>,
}

impl AbiBuilder {
    pub fn new(identifier: impl Into<Identifier>) -> Self {
        Self {
            identifier: identifier.into(),
            pointers: AHashMap::new(),
            aliases: Vec::new(),
            alias_index: AHashMap::new(),
            caller_saved: Vec::new(),
            callee_saved: Vec::new(),
            argument_registers: Vec::new(),
            return_registers: Vec::new(),
            stack_alignment: Alignment::None,
            transient_stack_alignment: Alignment::None,
            register_file_alignment: Vec::new(),
        }
    }

    pub fn pointer(&mut self, role: PointerRole, register: RegisterRef) -> ModelResult<&mut Self> {
        if let Some(previous) = self.pointers.get(&role) {
            return Err(ModelError::double_binding(format!("{role} is already assigned"))
                .with_definition(&self.identifier)
                .with_context("bound", previous)
                .with_context("rejected", &register));
        }
        self.pointers.insert(role, register);
        Ok(self)
    }

    /// Adds an assembly name for `register`. Names are unique across the whole ABI.
    pub fn alias(&mut self, register: &RegisterRef, name: &str) -> ModelResult<&mut Self> {
        if let Some(&idx) = self.alias_index.get(name) {
            return Err(ModelError::double_binding(format!(
                "alias '{name}' already names {}",
                self.aliases[idx].0
            ))
            .with_definition(&self.identifier)
            .with_context("rejected", register));
        }
        let idx = match self
            .aliases
            .iter()
            .position(|(aliased, _)| aliased.same_element(register))
        {
            Some(idx) => idx,
            None => {
                self.aliases.push((register.clone(), Vec::new()));
                self.aliases.len() - 1
            }
        };
        self.aliases[idx].1.push(name.to_string());
        self.alias_index.insert(name.to_string(), idx);
        Ok(self)
    }

    pub fn caller_saved(&mut self, registers: impl IntoIterator<Item = RegisterRef>) -> &mut Self {
        self.caller_saved.extend(registers);
        self
    }

    pub fn callee_saved(&mut self, registers: impl IntoIterator<Item = RegisterRef>) -> &mut Self {
        self.callee_saved.extend(registers);
        self
    }

    pub fn arguments(&mut self, registers: impl IntoIterator<Item = RegisterRef>) -> &mut Self {
        self.argument_registers.extend(registers);
        self
    }

    pub fn returns(&mut self, registers: impl IntoIterator<Item = RegisterRef>) -> &mut Self {
        self.return_registers.extend(registers);
        self
    }

    pub fn stack_alignment(&mut self, alignment: Alignment, transient: Alignment) -> &mut Self {
        self.stack_alignment = alignment;
        self.transient_stack_alignment = transient;
        self
    }

    pub fn register_file_alignment(
        &mut self,
        file: Arc<RegisterTensor>,
        alignment: Alignment,
    ) -> &mut Self {
        self.register_file_alignment.push((file, alignment));
        self
    }

    pub fn build(mut self) -> ModelResult<Abi> {
        let mut take = |role: PointerRole| {
            self.pointers.remove(&role).ok_or_else(|| {
                ModelError::shape(format!("abi does not define a {role}"))
                    .with_definition(&self.identifier)
            })
        };
        let return_address = take(PointerRole::ReturnAddress)?;
        let stack_pointer = take(PointerRole::StackPointer)?;
        let frame_pointer = take(PointerRole::FramePointer)?;
        let global_pointer = take(PointerRole::GlobalPointer)?;
        let thread_pointer = self.pointers.remove(&PointerRole::ThreadPointer);
        Ok(Abi {
            identifier: self.identifier,
            return_address,
            stack_pointer,
            frame_pointer,
            global_pointer,
            thread_pointer,
            aliases: self.aliases,
            alias_index: self.alias_index,
            caller_saved: self.caller_saved,
            callee_saved: self.callee_saved,
            argument_registers: self.argument_registers,
            return_registers: self.return_registers,
            stack_alignment: self.stack_alignment,
            transient_stack_alignment: self.transient_stack_alignment,
            register_file_alignment: self.register_file_alignment,
        })
    }
}
