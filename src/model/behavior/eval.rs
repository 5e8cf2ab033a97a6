//! Expression evaluation over [`Value`]s.

use ahash::AHashMap;

use super::{BinaryOp, Expr, UnaryOp};
use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::value::Value;

/// Values visible to an expression, keyed by simple name.
#[derive(Clone, Debug, Default)]
pub struct Bindings {
    parameters: AHashMap<String, Value>,
    fields: AHashMap<String, Value>,
    field_accesses: AHashMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn bind_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn bind_field_access(&mut self, name: impl Into<String>, value: Value) {
        self.field_accesses.insert(name.into(), value);
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind_parameter(name, value);
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind_field(name, value);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field_access(&self, name: &str) -> Option<&Value> {
        self.field_accesses.get(name)
    }
}

/// Supplies resource contents to `Read` nodes.
pub trait ResourceReader {
    fn read(&mut self, resource: &Identifier, address: &[Value]) -> ModelResult<Value>;
}

/// Default reader for pure contexts: every resource read is an error.
pub struct NoResourceReader;

impl ResourceReader for NoResourceReader {
    fn read(&mut self, resource: &Identifier, _address: &[Value]) -> ModelResult<Value> {
        Err(ModelError::evaluation(format!(
            "reading resource '{resource}' requires a resource reader"
        )))
    }
}

impl<R: ResourceReader + ?Sized> ResourceReader for &mut R {
    fn read(&mut self, resource: &Identifier, address: &[Value]) -> ModelResult<Value> {
        (**self).read(resource, address)
    }
}

/// Stateless evaluator that resolves `Expr` nodes against a set of bindings. Values are cloned
/// out of the bindings so callers keep ownership of the originals.
pub struct Evaluator<'b, R: ResourceReader> {
    bindings: &'b Bindings,
    reader: R,
}

impl<'b> Evaluator<'b, NoResourceReader> {
    pub fn new(bindings: &'b Bindings) -> Self {
        Self {
            bindings,
            reader: NoResourceReader,
        }
    }
}

impl<'b, R> Evaluator<'b, R>
where
    R: ResourceReader,
{
    pub fn with_reader(bindings: &'b Bindings, reader: R) -> Self {
        Self { bindings, reader }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> ModelResult<Value> {
        self.eval(expr)
    }

    fn eval(&mut self, expr: &Expr) -> ModelResult<Value> {
        match expr {
            Expr::Constant(value) => Ok(value.clone()),
            Expr::Parameter(name) => {
                lookup(self.bindings.parameter(name.simple_name()), "parameter", name)
            }
            Expr::Field(name) => lookup(self.bindings.field(name.simple_name()), "field", name),
            Expr::FieldAccess(name) => lookup(
                self.bindings.field_access(name.simple_name()),
                "field access",
                name,
            ),
            Expr::Read { resource, address } => {
                let mut indices = Vec::with_capacity(address.len());
                for expr in address {
                    indices.push(self.eval(expr)?);
                }
                self.reader.read(resource, &indices)
            }
            Expr::Unary { op, operand } => self.evaluate_unary(*op, operand),
            Expr::Binary { op, lhs, rhs } => self.evaluate_binary(*op, lhs, rhs),
            Expr::Slice { expr, slice } => self.eval(expr)?.slice(slice),
            Expr::Cast { expr, ty } => Ok(self.eval(expr)?.cast_to(*ty)),
            Expr::Truncate { expr, ty } => self.eval(expr)?.truncate(*ty),
            Expr::ZeroExtend { expr, ty } => self.eval(expr)?.zero_extend(*ty),
            Expr::SignExtend { expr, ty } => self.eval(expr)?.sign_extend(*ty),
            Expr::Concat { high, low } => {
                let high = self.eval(high)?;
                let low = self.eval(low)?;
                Ok(high.concat(&low))
            }
            Expr::Select {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition)?.as_bool()? {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn evaluate_unary(&mut self, op: UnaryOp, operand: &Expr) -> ModelResult<Value> {
        let value = self.eval(operand)?;
        match op {
            UnaryOp::Neg => Ok(value.negate()),
            UnaryOp::BitNot => Ok(value.bitwise_not()),
            UnaryOp::Not => value.not(),
        }
    }

    fn evaluate_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> ModelResult<Value> {
        match op {
            BinaryOp::LogicalOr => {
                if self.eval(lhs)?.as_bool()? {
                    Ok(Value::of_bool(true))
                } else {
                    Ok(Value::of_bool(self.eval(rhs)?.as_bool()?))
                }
            }
            BinaryOp::LogicalAnd => {
                if !self.eval(lhs)?.as_bool()? {
                    Ok(Value::of_bool(false))
                } else {
                    Ok(Value::of_bool(self.eval(rhs)?.as_bool()?))
                }
            }
            _ => {
                let left = self.eval(lhs)?;
                let right = self.eval(rhs)?;
                apply_binary(op, &left, &right)
            }
        }
    }
}

fn lookup(value: Option<&Value>, kind: &str, name: &Identifier) -> ModelResult<Value> {
    value
        .cloned()
        .ok_or_else(|| ModelError::evaluation(format!("unbound {kind} '{name}'")))
}

fn shift_amount(value: &Value) -> u64 {
    value.to_u64().unwrap_or(u64::MAX)
}

fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> ModelResult<Value> {
    match op {
        BinaryOp::Add => Ok(left.add(right)?.result),
        BinaryOp::Sub => Ok(left.subtract(right)?.result),
        BinaryOp::Mul => left.multiply(right, false, false),
        BinaryOp::SMull => left.multiply(right, true, true),
        BinaryOp::UMull => left.multiply(right, true, false),
        BinaryOp::SDiv => left.divide(right, true),
        BinaryOp::UDiv => left.divide(right, false),
        BinaryOp::SMod => left.modulo(right, true),
        BinaryOp::UMod => left.modulo(right, false),
        BinaryOp::And => left.and(right),
        BinaryOp::Or => left.or(right),
        BinaryOp::Xor => left.xor(right),
        BinaryOp::Lsl => Ok(left.lsl(shift_amount(right))),
        BinaryOp::Lsr => Ok(left.lsr(shift_amount(right))),
        BinaryOp::Asr => Ok(left.asr(shift_amount(right))),
        BinaryOp::Rol => Ok(left.rol(shift_amount(right))),
        BinaryOp::Ror => Ok(left.ror(shift_amount(right))),
        BinaryOp::Eq => {
            left.ensure_same_width(right, "equality")?;
            Ok(Value::of_bool(left.equal_value(right)))
        }
        BinaryOp::Ne => {
            left.ensure_same_width(right, "inequality")?;
            Ok(Value::of_bool(!left.equal_value(right)))
        }
        BinaryOp::Slt => left.lt(right, true),
        BinaryOp::Sle => left.le(right, true),
        BinaryOp::Sgt => left.gt(right, true),
        BinaryOp::Sge => left.ge(right, true),
        BinaryOp::Ult => left.lt(right, false),
        BinaryOp::Ule => left.le(right, false),
        BinaryOp::Ugt => left.gt(right, false),
        BinaryOp::Uge => left.ge(right, false),
        BinaryOp::LogicalAnd => Ok(Value::of_bool(left.as_bool()? && right.as_bool()?)),
        BinaryOp::LogicalOr => Ok(Value::of_bool(left.as_bool()? || right.as_bool()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bitslice::BitSlice;
    use crate::model::error::ModelErrorKind;
    use crate::model::types::DataType;

    fn bits(value: i64, width: u32) -> Value {
        Value::of(value, DataType::bits(width)).expect("bits value fits")
    }

    struct Registers(Vec<Value>);

    impl ResourceReader for Registers {
        fn read(&mut self, resource: &Identifier, address: &[Value]) -> ModelResult<Value> {
            assert_eq!(resource.name(), "X");
            let index = address[0].to_u64().expect("small index") as usize;
            Ok(self.0[index].clone())
        }
    }

    #[test]
    fn evaluates_constants_and_fields() {
        let bindings = Bindings::new().with_field("rs1", bits(5, 5));
        let mut evaluator = Evaluator::new(&bindings);
        let expr = Expr::binary(BinaryOp::Add, Expr::field("rs1"), Expr::constant(bits(3, 5)));
        assert_eq!(evaluator.evaluate(&expr).unwrap(), bits(8, 5));
    }

    #[test]
    fn unbound_names_fail() {
        let bindings = Bindings::new();
        let mut evaluator = Evaluator::new(&bindings);
        let err = evaluator
            .evaluate(&Expr::param("imm"))
            .expect_err("nothing is bound");
        assert_eq!(err.kind(), ModelErrorKind::Evaluation);
        assert_eq!(err.message(), "unbound parameter 'imm'");
    }

    #[test]
    fn logical_ops_short_circuit() {
        let bindings = Bindings::new()
            .with_parameter("truthy", Value::of_bool(true))
            .with_parameter("falsy", Value::of_bool(false));
        let mut evaluator = Evaluator::new(&bindings);
        let missing = || Expr::param("missing");
        let or_expr = Expr::binary(BinaryOp::LogicalOr, Expr::param("truthy"), missing());
        assert_eq!(evaluator.evaluate(&or_expr), Ok(Value::of_bool(true)));
        let and_expr = Expr::binary(BinaryOp::LogicalAnd, Expr::param("falsy"), missing());
        assert_eq!(evaluator.evaluate(&and_expr), Ok(Value::of_bool(false)));
    }

    #[test]
    fn applies_bit_slices_and_extensions() {
        let bindings = Bindings::new();
        let mut evaluator = Evaluator::new(&bindings);
        let expr = Expr::sign_extend(
            Expr::slice(Expr::constant(bits(0b110110, 6)), BitSlice::of(4, 2).unwrap()),
            DataType::sint(8),
        );
        assert_eq!(evaluator.evaluate(&expr).unwrap().to_i64(), Some(-3));
    }

    #[test]
    fn reads_go_through_the_reader() {
        let bindings = Bindings::new().with_field("rs1", bits(1, 5));
        let expr = Expr::read("X", vec![Expr::field("rs1")]);
        let registers = Registers(vec![bits(0, 32), bits(99, 32)]);
        let mut evaluator = Evaluator::with_reader(&bindings, registers);
        assert_eq!(evaluator.evaluate(&expr).unwrap(), bits(99, 32));

        let err = Evaluator::new(&bindings)
            .evaluate(&expr)
            .expect_err("no reader attached");
        assert!(err.message().contains("requires a resource reader"));
    }

    #[test]
    fn division_by_zero_surfaces_as_evaluation_error() {
        let bindings = Bindings::new();
        let (four, zero) = (Expr::constant(bits(4, 8)), Expr::constant(bits(0, 8)));
        let expr = Expr::binary(BinaryOp::UDiv, four, zero);
        let err = Evaluator::new(&bindings).evaluate(&expr).expect_err("divide by zero");
        assert_eq!(err.kind(), ModelErrorKind::Evaluation);
    }
}
