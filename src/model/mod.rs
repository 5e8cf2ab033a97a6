//! Architecture model core.
//!
//! Leaves first: [`types`], [`value`] and [`bitslice`] have no model dependencies, [`constant`]
//! bundles values into tuples, [`behavior`] describes the small functions attached to field
//! accesses and artificial resources, [`resource`] and [`format`] describe storage and
//! instruction layouts, [`abi`] names the calling-convention registers, and [`isa`] owns all of
//! them.

pub mod abi;
pub mod behavior;
pub mod bitslice;
pub mod constant;
pub mod diagnostic;
pub mod error;
pub mod format;
pub mod identifier;
pub mod isa;
pub mod literal;
pub mod resource;
pub mod types;
pub mod value;

pub use abi::{Abi, AbiBuilder, RegisterRef};
pub use bitslice::{BitSlice, Part};
pub use constant::{Constant, Tuple};
pub use error::{ModelError, ModelErrorKind, ModelResult, VerifyError};
pub use format::{BitPattern, Encoding, EncodingBuilder, Field, FieldAccess, Format, FormatBuilder};
pub use identifier::Identifier;
pub use isa::{Instruction, Isa, IsaBuilder};
pub use resource::{ArtificialResource, Counter, Memory, RegisterTensor, Resource, Signal};
pub use types::{DataType, RelationType, TupleType, Type};
pub use value::{ArithResult, Radix, StatusFlags, SubMode, Value};
