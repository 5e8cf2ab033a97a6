use std::fmt;

use crate::model::diagnostic::{ModelDiagnostic, SourceSpan};
use crate::model::identifier::Identifier;

pub type ModelResult<T> = Result<T, ModelError>;

/// Failure taxonomy of the core. None of these are recovered locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelErrorKind {
    /// A logical integer or two's-complement pattern does not fit its declared type.
    Range,
    /// A structural invariant does not hold (empty/overlapping slices, width disagreement, ...).
    Shape,
    /// An encoding binds a second constant to the same field.
    DoubleBinding,
    /// Two types that must agree do not.
    TypeMismatch,
    /// The operation is not defined for the operand types.
    Unsupported,
    /// Evaluating a behavior expression failed (division by zero, unbound name, ...).
    Evaluation,
    /// A literal could not be parsed.
    Literal,
}

impl ModelErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ModelErrorKind::Range => "model.range",
            ModelErrorKind::Shape => "model.shape",
            ModelErrorKind::DoubleBinding => "model.double-binding",
            ModelErrorKind::TypeMismatch => "model.type-mismatch",
            ModelErrorKind::Unsupported => "model.unsupported",
            ModelErrorKind::Evaluation => "model.evaluation",
            ModelErrorKind::Literal => "model.literal",
        }
    }
}

impl fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModelErrorKind::Range => "range",
            ModelErrorKind::Shape => "shape",
            ModelErrorKind::DoubleBinding => "double binding",
            ModelErrorKind::TypeMismatch => "type mismatch",
            ModelErrorKind::Unsupported => "unsupported operation",
            ModelErrorKind::Evaluation => "evaluation",
            ModelErrorKind::Literal => "literal",
        };
        f.write_str(label)
    }
}

/// A typed failure plus the objects involved, rendered as `with key: value` lines.
///
/// Source locations are attached by whoever knows them; the core only fills the span in when the
/// violating definition already carries one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelError {
    kind: ModelErrorKind,
    message: String,
    context: Vec<(String, String)>,
    span: Option<SourceSpan>,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            context: Vec::new(),
            span: None,
        }
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Range, message)
    }

    pub fn shape(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Shape, message)
    }

    pub fn double_binding(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::DoubleBinding, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::TypeMismatch, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Unsupported, message)
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Evaluation, message)
    }

    pub fn literal(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::Literal, message)
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.context.push((key.into(), value.to_string()));
        self
    }

    /// Records the definition as context and borrows its span if none is attached yet.
    pub fn with_definition(mut self, identifier: &Identifier) -> Self {
        if self.span.is_none() {
            self.span = identifier.span().cloned();
        }
        self.with_context("definition", identifier)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn kind(&self) -> ModelErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    /// Context entries are folded into the message, `definition` becomes the diagnostic's subject.
    pub fn to_diagnostic(&self) -> ModelDiagnostic {
        let mut message = self.message.clone();
        for (key, value) in self.context.iter().filter(|(key, _)| *key != "definition") {
            message.push_str(&format!("; {key}: {value}"));
        }
        let mut diagnostic = ModelDiagnostic::construction(self.kind, message, self.span.clone());
        diagnostic.definition = self.context_value("definition").map(str::to_string);
        diagnostic
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)?;
        for (key, value) in &self.context {
            write!(f, "\n\twith {key}:\t{value}")?;
        }
        if let Some(span) = &self.span {
            write!(f, "\n\twith location:\t{span}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ModelError {}

/// Every error-level diagnostic collected while verifying an [`Isa`](super::isa::Isa).
#[derive(Debug, Clone)]
pub struct VerifyError {
    pub diagnostics: Vec<ModelDiagnostic>,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "verification produced {} error(s):", self.diagnostics.len())?;
        for diag in &self.diagnostics {
            writeln!(f, "  - {}", diag.format_human())?;
        }
        Ok(())
    }
}

impl std::error::Error for VerifyError {}
