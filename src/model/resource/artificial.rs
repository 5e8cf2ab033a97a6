use crate::model::behavior::{Function, Procedure};
use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::{DataType, RelationType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtificialKind {
    /// Alias of (part of) a register file.
    RegisterFileAlias,
    /// User-defined read/write pair, e.g. memory-mapped I/O.
    Custom,
}

/// A resource realised by a read function and a write procedure.
///
/// Without an address the read function takes no parameter and the write procedure takes the
/// value. With an address the read function takes it and the write procedure takes it first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtificialResource {
    identifier: Identifier,
    kind: ArtificialKind,
    inner: Option<Identifier>,
    address_type: Option<DataType>,
    result_type: DataType,
    read: Function,
    write: Procedure,
}

impl ArtificialResource {
    pub fn new(
        identifier: impl Into<Identifier>,
        kind: ArtificialKind,
        inner: Option<Identifier>,
        address_type: Option<DataType>,
        result_type: DataType,
        read: Function,
        write: Procedure,
    ) -> ModelResult<Self> {
        let resource = Self {
            identifier: identifier.into(),
            kind,
            inner,
            address_type,
            result_type,
            read,
            write,
        };
        resource.verify()?;
        Ok(resource)
    }

    fn verify(&self) -> ModelResult<()> {
        let read_params = self.read.params();
        let write_params = self.write.params();
        let expected_read = usize::from(self.address_type.is_some());
        if read_params.len() != expected_read {
            return Err(self.error(ModelError::shape(format!(
                "read function must take {expected_read} parameter(s), takes {}",
                read_params.len()
            ))));
        }
        if write_params.len() != read_params.len() + 1 {
            return Err(self.error(ModelError::shape(format!(
                "write procedure must take {} parameter(s), takes {}",
                read_params.len() + 1,
                write_params.len()
            ))));
        }
        self.ensure_castable("read result", self.read.return_type(), self.result_type)?;
        let value_param = &write_params[write_params.len() - 1];
        self.ensure_castable("write value", value_param.ty, self.result_type)?;
        if let Some(address_type) = self.address_type {
            self.ensure_castable("read address", read_params[0].ty, address_type)?;
            self.ensure_castable("write address", write_params[0].ty, address_type)?;
        }
        Ok(())
    }

    fn ensure_castable(&self, role: &str, actual: DataType, expected: DataType) -> ModelResult<()> {
        if actual.is_trivial_cast_to(expected) {
            return Ok(());
        }
        Err(self.error(ModelError::type_mismatch(format!(
            "{role} type {actual} cannot be cast to {expected}"
        ))))
    }

    fn error(&self, err: ModelError) -> ModelError {
        err.with_definition(&self.identifier)
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn kind(&self) -> ArtificialKind {
        self.kind
    }

    /// The wrapped resource, if any.
    pub fn inner(&self) -> Option<&Identifier> {
        self.inner.as_ref()
    }

    pub fn read_function(&self) -> &Function {
        &self.read
    }

    pub fn write_procedure(&self) -> &Procedure {
        &self.write
    }

    pub fn has_address(&self) -> bool {
        self.address_type.is_some()
    }

    pub fn address_type(&self) -> Option<DataType> {
        self.address_type
    }

    pub fn result_type(&self) -> DataType {
        self.result_type
    }

    pub fn relation_type(&self) -> RelationType {
        RelationType::new(self.address_type, self.result_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::behavior::{Expr, Parameter, WriteStatement};
    use crate::model::error::ModelErrorKind;

    fn alias_read(return_type: DataType) -> Function {
        Function::new(
            "A::read",
            [Parameter::new("index", DataType::bits(3))],
            return_type,
            Expr::read("X", vec![Expr::zero_extend(Expr::param("index"), DataType::bits(5))]),
        )
    }

    fn alias_write(params: Vec<Parameter>) -> Procedure {
        Procedure::new(
            "A::write",
            params,
            vec![WriteStatement {
                resource: "X".into(),
                address: vec![Expr::zero_extend(Expr::param("index"), DataType::bits(5))],
                value: Expr::param("value"),
            }],
        )
    }

    #[test]
    fn alias_of_register_file_verifies() {
        let alias = ArtificialResource::new(
            "A",
            ArtificialKind::RegisterFileAlias,
            Some("X".into()),
            Some(DataType::bits(3)),
            DataType::bits(32),
            alias_read(DataType::bits(32)),
            alias_write(vec![
                Parameter::new("index", DataType::bits(3)),
                Parameter::new("value", DataType::bits(32)),
            ]),
        )
        .unwrap();
        assert!(alias.has_address());
        assert_eq!(alias.relation_type().to_string(), "(Bits<3>) -> Bits<32>");
        assert_eq!(alias.inner().map(Identifier::name), Some("X".to_string()));
    }

    #[test]
    fn write_procedure_needs_one_more_parameter() {
        let err = ArtificialResource::new(
            "A",
            ArtificialKind::RegisterFileAlias,
            None,
            Some(DataType::bits(3)),
            DataType::bits(32),
            alias_read(DataType::bits(32)),
            alias_write(vec![Parameter::new("value", DataType::bits(32))]),
        )
        .expect_err("address parameter missing");
        assert_eq!(err.kind(), ModelErrorKind::Shape);
        assert_eq!(err.context_value("definition"), Some("A"));
    }

    #[test]
    fn read_result_must_match() {
        let err = ArtificialResource::new(
            "A",
            ArtificialKind::Custom,
            None,
            Some(DataType::bits(3)),
            DataType::bits(32),
            alias_read(DataType::bits(16)),
            alias_write(vec![
                Parameter::new("index", DataType::bits(3)),
                Parameter::new("value", DataType::bits(32)),
            ]),
        )
        .expect_err("read returns 16 bits");
        assert_eq!(err.kind(), ModelErrorKind::TypeMismatch);
        assert!(err.message().starts_with("read result type Bits<16>"));
    }
}
