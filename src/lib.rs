//! Bit-exact value and structural-encoding model for processor description compilers.
//!
//! The [`model`] module holds the entities every backend reads: arbitrary-width constants with
//! ALU flag arithmetic, bit slices describing instruction field layouts, resources, formats and
//! encodings. Everything is immutable after construction and every invariant violation surfaces
//! as a [`model::error::ModelError`].

pub mod model;
