//! Pure behavior attached to model definitions: the decode/encode/predicate functions of field
//! accesses and the read function/write procedure pair of artificial resources.
//!
//! Bodies are small expression trees evaluated over [`Value`]s by [`Evaluator`]. Format fields
//! appear as [`Expr::Field`] nodes so a field access can find the field it is derived from.

mod eval;

pub use eval::{Bindings, Evaluator, NoResourceReader, ResourceReader};

use std::fmt;

use smallvec::SmallVec;

use crate::model::bitslice::BitSlice;
use crate::model::error::{ModelError, ModelResult};
use crate::model::identifier::Identifier;
use crate::model::types::DataType;
use crate::model::value::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub identifier: Identifier,
    pub ty: DataType,
}

impl Parameter {
    pub fn new(identifier: impl Into<Identifier>, ty: DataType) -> Self {
        Self {
            identifier: identifier.into(),
            ty,
        }
    }

    pub fn name(&self) -> &str {
        self.identifier.simple_name()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Two's-complement negation.
    Neg,
    /// Bitwise complement.
    BitNot,
    /// Boolean negation.
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SMull,
    UMull,
    SDiv,
    UDiv,
    SMod,
    UMod,
    And,
    Or,
    Xor,
    Lsl,
    Lsr,
    Asr,
    Rol,
    Ror,
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::SMull => "*#s",
            BinaryOp::UMull => "*#u",
            BinaryOp::SDiv => "/s",
            BinaryOp::UDiv => "/u",
            BinaryOp::SMod => "%s",
            BinaryOp::UMod => "%u",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Lsl => "<<",
            BinaryOp::Lsr => ">>",
            BinaryOp::Asr => ">>s",
            BinaryOp::Rol => "<<>",
            BinaryOp::Ror => "<>>",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Slt => "<s",
            BinaryOp::Sle => "<=s",
            BinaryOp::Sgt => ">s",
            BinaryOp::Sge => ">=s",
            BinaryOp::Ult => "<u",
            BinaryOp::Ule => "<=u",
            BinaryOp::Ugt => ">u",
            BinaryOp::Uge => ">=u",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expr {
    Constant(Value),
    /// Reference to a parameter of the enclosing function or procedure.
    Parameter(Identifier),
    /// Reference to a format field; this is the instruction-parameter node.
    Field(Identifier),
    /// Reference to the decoded value of a field access.
    FieldAccess(Identifier),
    Read {
        resource: Identifier,
        address: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Slice {
        expr: Box<Expr>,
        slice: BitSlice,
    },
    /// Masking reinterpretation, see [`Value::cast_to`].
    Cast {
        expr: Box<Expr>,
        ty: DataType,
    },
    Truncate {
        expr: Box<Expr>,
        ty: DataType,
    },
    ZeroExtend {
        expr: Box<Expr>,
        ty: DataType,
    },
    SignExtend {
        expr: Box<Expr>,
        ty: DataType,
    },
    Concat {
        high: Box<Expr>,
        low: Box<Expr>,
    },
    Select {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn constant(value: Value) -> Self {
        Expr::Constant(value)
    }

    pub fn param(name: impl Into<Identifier>) -> Self {
        Expr::Parameter(name.into())
    }

    pub fn field(name: impl Into<Identifier>) -> Self {
        Expr::Field(name.into())
    }

    pub fn field_access(name: impl Into<Identifier>) -> Self {
        Expr::FieldAccess(name.into())
    }

    pub fn read(resource: impl Into<Identifier>, address: Vec<Expr>) -> Self {
        Expr::Read {
            resource: resource.into(),
            address,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn slice(expr: Expr, slice: BitSlice) -> Self {
        Expr::Slice {
            expr: Box::new(expr),
            slice,
        }
    }

    pub fn cast(expr: Expr, ty: DataType) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            ty,
        }
    }

    pub fn truncate(expr: Expr, ty: DataType) -> Self {
        Expr::Truncate {
            expr: Box::new(expr),
            ty,
        }
    }

    pub fn zero_extend(expr: Expr, ty: DataType) -> Self {
        Expr::ZeroExtend {
            expr: Box::new(expr),
            ty,
        }
    }

    pub fn sign_extend(expr: Expr, ty: DataType) -> Self {
        Expr::SignExtend {
            expr: Box::new(expr),
            ty,
        }
    }

    pub fn concat(high: Expr, low: Expr) -> Self {
        Expr::Concat {
            high: Box::new(high),
            low: Box::new(low),
        }
    }

    pub fn select(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Select {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Direct children in evaluation order.
    fn children(&self) -> SmallVec<[&Expr; 3]> {
        match self {
            Expr::Constant(_) | Expr::Parameter(_) | Expr::Field(_) | Expr::FieldAccess(_) => {
                SmallVec::new()
            }
            Expr::Read { address, .. } => address.iter().collect(),
            Expr::Unary { operand, .. } => SmallVec::from_slice(&[operand.as_ref()]),
            Expr::Binary { lhs, rhs, .. } => SmallVec::from_slice(&[lhs.as_ref(), rhs.as_ref()]),
            Expr::Slice { expr, .. }
            | Expr::Cast { expr, .. }
            | Expr::Truncate { expr, .. }
            | Expr::ZeroExtend { expr, .. }
            | Expr::SignExtend { expr, .. } => SmallVec::from_slice(&[expr.as_ref()]),
            Expr::Concat { high, low } => SmallVec::from_slice(&[high.as_ref(), low.as_ref()]),
            Expr::Select {
                condition,
                then,
                otherwise,
            } => SmallVec::from_slice(&[condition.as_ref(), then.as_ref(), otherwise.as_ref()]),
        }
    }

    /// Distinct format fields referenced anywhere in the tree, in first-visit order.
    pub fn field_refs(&self) -> Vec<&Identifier> {
        let mut refs = Vec::new();
        self.collect_field_refs(&mut refs);
        refs
    }

    fn collect_field_refs<'a>(&'a self, refs: &mut Vec<&'a Identifier>) {
        if let Expr::Field(identifier) = self {
            if !refs.contains(&identifier) {
                refs.push(identifier);
            }
        }
        for child in self.children() {
            child.collect_field_refs(refs);
        }
    }

    /// Resources read anywhere in the tree, in first-visit order.
    pub fn resource_reads(&self) -> Vec<&Identifier> {
        let mut reads = Vec::new();
        self.collect_reads(&mut reads);
        reads
    }

    fn collect_reads<'a>(&'a self, reads: &mut Vec<&'a Identifier>) {
        if let Expr::Read { resource, .. } = self {
            if !reads.contains(&resource) {
                reads.push(resource);
            }
        }
        for child in self.children() {
            child.collect_reads(reads);
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Parameter(name) | Expr::Field(name) | Expr::FieldAccess(name) => {
                write!(f, "{name}")
            }
            Expr::Read { resource, address } => {
                write!(f, "{resource}(")?;
                for (idx, expr) in address.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{expr}")?;
                }
                write!(f, ")")
            }
            Expr::Unary { op, operand } => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::BitNot => "~",
                    UnaryOp::Not => "!",
                };
                write!(f, "{symbol}{operand}")
            }
            Expr::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Slice { expr, slice } => write!(f, "{expr}{slice}"),
            Expr::Cast { expr, ty } => write!(f, "{expr} as {ty}"),
            Expr::Truncate { expr, ty } => write!(f, "truncate({expr}, {ty})"),
            Expr::ZeroExtend { expr, ty } => write!(f, "zext({expr}, {ty})"),
            Expr::SignExtend { expr, ty } => write!(f, "sext({expr}, {ty})"),
            Expr::Concat { high, low } => write!(f, "({high} :: {low})"),
            Expr::Select {
                condition,
                then,
                otherwise,
            } => write!(f, "if {condition} then {then} else {otherwise}"),
        }
    }
}

/// A pure function with a single expression body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    identifier: Identifier,
    params: SmallVec<[Parameter; 2]>,
    return_type: DataType,
    body: Expr,
}

impl Function {
    pub fn new(
        identifier: impl Into<Identifier>,
        params: impl IntoIterator<Item = Parameter>,
        return_type: DataType,
        body: Expr,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            params: params.into_iter().collect(),
            return_type,
            body,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn return_type(&self) -> DataType {
        self.return_type
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Binds `args` to the parameters and evaluates the body without resource access.
    pub fn call(&self, args: &[Value]) -> ModelResult<Value> {
        let bindings = self.bind(args, Bindings::new())?;
        self.evaluate_with(&bindings, NoResourceReader)
    }

    /// Evaluates the body under `bindings`, which must already hold every referenced name.
    pub fn evaluate_with<R: ResourceReader>(
        &self,
        bindings: &Bindings,
        reader: R,
    ) -> ModelResult<Value> {
        let result = Evaluator::with_reader(bindings, reader)
            .evaluate(&self.body)
            .map_err(|err| err.with_definition(&self.identifier))?;
        result.trivial_cast_to(self.return_type).map_err(|_| {
            ModelError::type_mismatch(format!(
                "function returns {} but its body produced {}",
                self.return_type,
                result.ty()
            ))
            .with_definition(&self.identifier)
        })
    }

    /// Adds `args` to `bindings` under the parameter names, checking arity and widths.
    pub fn bind(&self, args: &[Value], bindings: Bindings) -> ModelResult<Bindings> {
        bind_params(&self.identifier, &self.params, args, bindings)
    }
}

fn bind_params(
    identifier: &Identifier,
    params: &[Parameter],
    args: &[Value],
    mut bindings: Bindings,
) -> ModelResult<Bindings> {
    if params.len() != args.len() {
        return Err(ModelError::shape(format!(
            "expected {} argument(s), got {}",
            params.len(),
            args.len()
        ))
        .with_definition(identifier));
    }
    for (param, arg) in params.iter().zip(args) {
        let value = arg.trivial_cast_to(param.ty).map_err(|err| {
            err.with_context("parameter", &param.identifier)
                .with_definition(identifier)
        })?;
        bindings.bind_parameter(param.name(), value);
    }
    Ok(bindings)
}

/// A single resource write performed by a procedure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteStatement {
    pub resource: Identifier,
    pub address: Vec<Expr>,
    pub value: Expr,
}

/// The write effect a procedure would perform, with every expression evaluated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteEffect {
    pub resource: Identifier,
    pub address: Vec<Value>,
    pub value: Value,
}

/// A side-effecting behavior made of resource writes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Procedure {
    identifier: Identifier,
    params: SmallVec<[Parameter; 2]>,
    writes: Vec<WriteStatement>,
}

impl Procedure {
    pub fn new(
        identifier: impl Into<Identifier>,
        params: impl IntoIterator<Item = Parameter>,
        writes: Vec<WriteStatement>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            params: params.into_iter().collect(),
            writes,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn writes(&self) -> &[WriteStatement] {
        &self.writes
    }

    /// Evaluates the procedure and returns its writes in statement order; nothing is mutated.
    pub fn effects<R: ResourceReader>(
        &self,
        args: &[Value],
        reader: R,
    ) -> ModelResult<Vec<WriteEffect>> {
        let bindings = bind_params(&self.identifier, &self.params, args, Bindings::new())?;
        let mut evaluator = Evaluator::with_reader(&bindings, reader);
        let mut effects = Vec::with_capacity(self.writes.len());
        for write in &self.writes {
            let mut address = Vec::with_capacity(write.address.len());
            for expr in &write.address {
                address.push(
                    evaluator
                        .evaluate(expr)
                        .map_err(|err| err.with_definition(&self.identifier))?,
                );
            }
            let value = evaluator
                .evaluate(&write.value)
                .map_err(|err| err.with_definition(&self.identifier))?;
            effects.push(WriteEffect {
                resource: write.resource.clone(),
                address,
                value,
            });
        }
        Ok(effects)
    }
}
