use std::fmt;

use crate::model::behavior::{Bindings, Function, NoResourceReader};
use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::DataType;
use crate::model::value::Value;

use super::Field;

/// A derived view of one format field, e.g. a scaled branch offset.
///
/// `decode` reads the target field and produces the derived value, `encode` maps a derived value
/// back to field bits and the optional `predicate` tells whether a derived value is encodable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldAccess {
    identifier: Identifier,
    target: Field,
    decode: Function,
    encode: Function,
    predicate: Option<Function>,
}

impl FieldAccess {
    /// Resolves the target among `fields` from the single field the decode body references.
    pub fn new(
        identifier: impl Into<Identifier>,
        fields: &[Field],
        decode: Function,
        encode: Function,
        predicate: Option<Function>,
    ) -> ModelResult<Self> {
        let identifier = identifier.into();
        let target = resolve_target(&identifier, fields, &decode)?;

        if !decode.params().is_empty() {
            return Err(ModelError::shape(format!(
                "decode function must not take parameters, takes {}",
                decode.params().len()
            ))
            .with_definition(&identifier));
        }
        if encode.params().len() != 1 {
            return Err(ModelError::shape(format!(
                "encode function must take exactly one parameter, takes {}",
                encode.params().len()
            ))
            .with_definition(&identifier));
        }
        if !encode.return_type().is_trivial_cast_to(target.ty()) {
            return Err(ModelError::type_mismatch(format!(
                "encode function returns {} which cannot be cast to field type {}",
                encode.return_type(),
                target.ty()
            ))
            .with_definition(&identifier)
            .with_context("field", target.identifier()));
        }
        if let Some(predicate) = &predicate {
            if predicate.params().len() != 1 || predicate.return_type() != DataType::Bool {
                return Err(ModelError::type_mismatch(
                    "predicate must take one parameter and return Bool",
                )
                .with_definition(&identifier));
            }
        }

        Ok(Self {
            identifier,
            target,
            decode,
            encode,
            predicate,
        })
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn name(&self) -> &str {
        self.identifier.simple_name()
    }

    pub fn target(&self) -> &Field {
        &self.target
    }

    pub fn decode_function(&self) -> &Function {
        &self.decode
    }

    pub fn encode_function(&self) -> &Function {
        &self.encode
    }

    pub fn predicate(&self) -> Option<&Function> {
        self.predicate.as_ref()
    }

    /// Type of the derived value.
    pub fn ty(&self) -> DataType {
        self.decode.return_type()
    }

    /// Extracts the target field from `word` and runs the decode function on it.
    pub fn decode(&self, word: &Value) -> ModelResult<Value> {
        let field = self.target.extract(word)?;
        let bindings = Bindings::new().with_field(self.target.name(), field);
        self.decode.evaluate_with(&bindings, NoResourceReader)
    }

    /// Produces the field value that decodes back to `value`.
    pub fn encode(&self, value: &Value) -> ModelResult<Value> {
        self.encode
            .call(std::slice::from_ref(value))?
            .trivial_cast_to(self.target.ty())
    }

    /// Runs the predicate; without one every value is valid.
    pub fn is_valid(&self, value: &Value) -> ModelResult<bool> {
        match &self.predicate {
            Some(predicate) => predicate.call(std::slice::from_ref(value))?.as_bool(),
            None => Ok(true),
        }
    }
}

impl fmt::Display for FieldAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}: {}", self.target.name(), self.name(), self.ty())
    }
}

fn resolve_target(
    identifier: &Identifier,
    fields: &[Field],
    decode: &Function,
) -> ModelResult<Field> {
    let mut referenced: Vec<&str> = Vec::new();
    for field_ref in decode.body().field_refs() {
        let name = field_ref.simple_name();
        if !referenced.contains(&name) {
            referenced.push(name);
        }
    }
    let [name] = referenced.as_slice() else {
        return Err(ModelError::shape(format!(
            "field access must reference exactly one format field, found {}",
            referenced.len()
        ))
        .with_definition(identifier)
        .with_context("fields", referenced.join(", ")));
    };
    fields
        .iter()
        .find(|field| field.name() == *name)
        .cloned()
        .ok_or_else(|| {
            ModelError::shape(format!("field access references unknown field '{name}'"))
                .with_definition(identifier)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::behavior::{BinaryOp, Expr, Parameter};
    use crate::model::bitslice::BitSlice;
    use crate::model::error::ModelErrorKind;

    fn offset_field() -> Field {
        Field::new("B::offset", BitSlice::of(15, 4).unwrap(), DataType::sint(12)).unwrap()
    }

    fn scaled_decode() -> Function {
        Function::new(
            "B::target::decode",
            [],
            DataType::sint(13),
            Expr::binary(
                BinaryOp::Lsl,
                Expr::sign_extend(Expr::field("offset"), DataType::sint(13)),
                Expr::constant(Value::of(1, DataType::bits(4)).unwrap()),
            ),
        )
    }

    fn scaled_encode(return_type: DataType) -> Function {
        Function::new(
            "B::target::encode",
            [Parameter::new("target", DataType::sint(13))],
            return_type,
            Expr::truncate(
                Expr::binary(
                    BinaryOp::Asr,
                    Expr::param("target"),
                    Expr::constant(Value::of(1, DataType::bits(4)).unwrap()),
                ),
                DataType::sint(12),
            ),
        )
    }

    fn even_predicate() -> Function {
        Function::new(
            "B::target::predicate",
            [Parameter::new("target", DataType::sint(13))],
            DataType::Bool,
            Expr::binary(
                BinaryOp::Eq,
                Expr::binary(
                    BinaryOp::And,
                    Expr::param("target"),
                    Expr::constant(Value::of(1, DataType::sint(13)).unwrap()),
                ),
                Expr::constant(Value::zero(DataType::sint(13))),
            ),
        )
    }

    #[test]
    fn decodes_and_encodes_scaled_offset() {
        let access = FieldAccess::new(
            "B::target",
            &[offset_field()],
            scaled_decode(),
            scaled_encode(DataType::sint(12)),
            Some(even_predicate()),
        )
        .expect("field access is well formed");
        assert_eq!(access.target().name(), "offset");

        // offset = -2 (0xffe) in bits 15..4
        let word = Value::from_twos_complement(0xffe0u32, DataType::bits(16)).unwrap();
        let decoded = access.decode(&word).unwrap();
        assert_eq!(decoded.to_i64(), Some(-4));
        assert_eq!(access.encode(&decoded).unwrap().to_i64(), Some(-2));
        assert_eq!(access.is_valid(&decoded), Ok(true));
        let odd = Value::of(-3, DataType::sint(13)).unwrap();
        assert_eq!(access.is_valid(&odd), Ok(false));
    }

    #[test]
    fn decode_must_reference_exactly_one_field() {
        let encode = scaled_encode(DataType::sint(12));
        let none = Function::new(
            "A::decode",
            [],
            DataType::bits(4),
            Expr::constant(Value::zero(DataType::bits(4))),
        );
        let err = FieldAccess::new("A", &[offset_field()], none, encode.clone(), None)
            .expect_err("no field referenced");
        assert_eq!(err.kind(), ModelErrorKind::Shape);

        let two = Function::new(
            "A::decode",
            [],
            DataType::bits(24),
            Expr::concat(Expr::field("offset"), Expr::field("other")),
        );
        let err = FieldAccess::new("A", &[offset_field()], two, encode, None)
            .expect_err("two fields referenced");
        assert!(err.message().ends_with("found 2"));
    }

    #[test]
    fn encode_result_must_fit_target() {
        let err = FieldAccess::new(
            "B::target",
            &[offset_field()],
            scaled_decode(),
            scaled_encode(DataType::sint(13)),
            None,
        )
        .expect_err("13-bit encode result for a 12-bit field");
        assert_eq!(err.kind(), ModelErrorKind::TypeMismatch);
        assert_eq!(err.context_value("field"), Some("B::offset"));
    }
}
