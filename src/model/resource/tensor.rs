use smallvec::SmallVec;

use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::{DataType, RelationType};
use crate::model::value::Value;

/// One axis of a [`RegisterTensor`]: `size` elements addressed by values of `index_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    index: usize,
    index_type: DataType,
    size: u64,
}

impl Dimension {
    /// Fails when `size` is 0 or `index_type` is too narrow to address element `size - 1`.
    pub fn new(index: usize, index_type: DataType, size: u64) -> ModelResult<Self> {
        if size < 1 {
            return Err(ModelError::shape(format!(
                "dimension {index} must have at least one element"
            ))
            .with_context("index type", index_type));
        }
        let required = DataType::minimal_required_width_for(size - 1);
        if index_type.bit_width() < required {
            return Err(ModelError::shape(format!(
                "index type {index_type} cannot address {size} elements of dimension {index}"
            ))
            .with_context("required width", required));
        }
        Ok(Self {
            index,
            index_type,
            size,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn index_type(&self) -> DataType {
        self.index_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Statically fixes the value read at `indices`, e.g. `X(0) = 0`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorConstraint {
    indices: SmallVec<[Value; 2]>,
    value: Value,
}

impl TensorConstraint {
    pub fn new(indices: impl IntoIterator<Item = Value>, value: Value) -> Self {
        Self {
            indices: indices.into_iter().collect(),
            value,
        }
    }

    pub fn indices(&self) -> &[Value] {
        &self.indices
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// Register storage with N dimensions, outermost first.
///
/// All but the innermost dimension are addressed by an access; the innermost dimension gives
/// the width of one element. A plain register has one dimension (`register X: Bits<32>` is
/// `[(Bits<5>, 32)]`), a register file two (`Bits<5> -> Bits<64>` is
/// `[(Bits<5>, 32), (Bits<6>, 64)]`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterTensor {
    identifier: Identifier,
    dimensions: SmallVec<[Dimension; 2]>,
    element_width: u32,
    constraints: Vec<TensorConstraint>,
}

impl RegisterTensor {
    pub fn tensor(
        identifier: impl Into<Identifier>,
        dimensions: impl IntoIterator<Item = (DataType, u64)>,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        let dimensions = dimensions
            .into_iter()
            .enumerate()
            .map(|(index, (index_type, size))| Dimension::new(index, index_type, size))
            .collect::<ModelResult<SmallVec<[Dimension; 2]>>>()
            .map_err(|err| err.with_definition(&identifier))?;
        let Some(innermost) = dimensions.last() else {
            return Err(ModelError::shape("register tensor requires at least one dimension")
                .with_definition(&identifier));
        };
        let element_width = u32::try_from(innermost.size).map_err(|_| {
            ModelError::shape(format!(
                "element width {} exceeds the supported range",
                innermost.size
            ))
            .with_definition(&identifier)
        })?;
        Ok(Self {
            identifier,
            dimensions,
            element_width,
            constraints: Vec::new(),
        })
    }

    /// A single register holding one value of `ty`.
    pub fn register(identifier: impl Into<Identifier>, ty: DataType) -> ModelResult<Self> {
        Self::tensor(identifier, [element_dimension(ty)])
    }

    /// `2^w(address_type)` registers of `result_type`.
    pub fn register_file(
        identifier: impl Into<Identifier>,
        address_type: DataType,
        result_type: DataType,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        let count = 1u64.checked_shl(address_type.bit_width()).ok_or_else(|| {
            ModelError::shape(format!(
                "address type {address_type} is too wide for a register file"
            ))
            .with_definition(&identifier)
        })?;
        Self::tensor(identifier, [(address_type, count), element_dimension(result_type)])
    }

    /// Attaches constraints after checking them against the tensor's shape.
    pub fn with_constraints(
        mut self,
        constraints: impl IntoIterator<Item = TensorConstraint>,
    ) -> ModelResult<Self> {
        let constraints: Vec<TensorConstraint> = constraints.into_iter().collect();
        for constraint in &constraints {
            self.verify_constraint(constraint)?;
        }
        self.constraints = constraints;
        Ok(self)
    }

    fn verify_constraint(&self, constraint: &TensorConstraint) -> ModelResult<()> {
        let index_types: SmallVec<[DataType; 2]> =
            constraint.indices().iter().map(Value::ty).collect();
        self.ensure_matching_index_types(&index_types)?;
        for (index, dimension) in constraint.indices().iter().zip(&self.dimensions) {
            let in_range = index.to_u64().is_some_and(|idx| idx < dimension.size);
            if !in_range {
                return Err(ModelError::range(format!(
                    "constraint index {index} exceeds dimension {} of size {}",
                    dimension.index, dimension.size
                ))
                .with_definition(&self.identifier));
            }
        }
        let expected = self.result_type_for(constraint.indices().len())?;
        if !constraint.value().ty().is_trivial_cast_to(expected) {
            return Err(ModelError::type_mismatch(format!(
                "constraint value type {} cannot be cast to result type {expected}",
                constraint.value().ty()
            ))
            .with_definition(&self.identifier));
        }
        Ok(())
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn dim_count(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// The dimensions an access can index, i.e. all but the innermost.
    pub fn index_dimensions(&self) -> &[Dimension] {
        &self.dimensions[..self.max_access_indices()]
    }

    pub fn max_access_indices(&self) -> usize {
        self.dim_count() - 1
    }

    pub fn is_single_register(&self) -> bool {
        self.dim_count() == 1
    }

    pub fn is_register_file(&self) -> bool {
        self.dim_count() == 2
    }

    pub fn outermost_dim(&self) -> &Dimension {
        &self.dimensions[0]
    }

    pub fn innermost_dim(&self) -> &Dimension {
        &self.dimensions[self.dim_count() - 1]
    }

    pub fn constraints(&self) -> &[TensorConstraint] {
        &self.constraints
    }

    pub fn index_types(&self) -> SmallVec<[DataType; 2]> {
        self.index_dimensions()
            .iter()
            .map(Dimension::index_type)
            .collect()
    }

    pub fn has_address(&self) -> bool {
        self.dim_count() > 1
    }

    /// Index type of the outermost dimension, if the tensor is addressed at all.
    pub fn address_type(&self) -> Option<DataType> {
        self.has_address()
            .then(|| self.outermost_dim().index_type())
    }

    /// Width of one element: `Bits<innermost size>`.
    pub fn result_type(&self) -> DataType {
        DataType::bits(self.element_width)
    }

    /// `Bits` type spanning every dimension not addressed by `provided` indices.
    ///
    /// Addressing the outer dimension of `Bits<8><4><32>` once yields `Bits<128>`.
    pub fn result_type_for(&self, provided: usize) -> ModelResult<DataType> {
        if provided >= self.dim_count() {
            return Err(ModelError::shape(format!(
                "{provided} indices provided, at most {} are allowed",
                self.max_access_indices()
            ))
            .with_definition(&self.identifier));
        }
        let width = self.dimensions[provided..]
            .iter()
            .try_fold(1u64, |acc, dim| acc.checked_mul(dim.size))
            .and_then(|width| u32::try_from(width).ok())
            .ok_or_else(|| {
                ModelError::shape("result width exceeds the supported range")
                    .with_definition(&self.identifier)
            })?;
        Ok(DataType::bits(width))
    }

    pub fn relation_type(&self) -> RelationType {
        RelationType::new(self.index_types(), self.result_type())
    }

    /// Indices of the first constraint that pins its element to zero.
    pub fn zero_register(&self) -> Option<&[Value]> {
        self.constraints
            .iter()
            .find(|constraint| constraint.value().is_zero())
            .map(TensorConstraint::indices)
    }

    /// Name of register `index` of a register file, e.g. `X5`.
    pub fn generate_name(&self, index: u64) -> ModelResult<String> {
        if !self.is_register_file() {
            return Err(ModelError::unsupported(
                "register names can only be generated for register files",
            )
            .with_definition(&self.identifier));
        }
        Ok(format!("{}{index}", self.identifier.simple_name()))
    }

    pub fn ensure_matching_index_types(&self, provided: &[DataType]) -> ModelResult<()> {
        if provided.len() > self.max_access_indices() {
            return Err(ModelError::shape(format!(
                "too many indices provided, max is {}, got {}",
                self.max_access_indices(),
                provided.len()
            ))
            .with_definition(&self.identifier));
        }
        for (provided, dimension) in provided.iter().zip(&self.dimensions) {
            if !provided.is_trivial_cast_to(dimension.index_type) {
                return Err(ModelError::type_mismatch(format!(
                    "index type {provided} does not match {} of dimension {}",
                    dimension.index_type, dimension.index
                ))
                .with_definition(&self.identifier));
            }
        }
        Ok(())
    }
}

fn element_dimension(ty: DataType) -> (DataType, u64) {
    let width = u64::from(ty.bit_width());
    let index_width = DataType::minimal_required_width_for(width.saturating_sub(1));
    (DataType::bits(index_width), width)
}
