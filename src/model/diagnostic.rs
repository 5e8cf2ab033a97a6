//! Findings handed to the surrounding pipeline instead of log lines.
//!
//! Construction failures become diagnostics through
//! [`ModelError::to_diagnostic`](super::error::ModelError::to_diagnostic). The ISA verifier reports
//! one [`Rule`] per finding; the rule fixes both the stable code and the severity, so a check
//! cannot report the same problem as an error in one place and a warning in another.

use std::fmt;
use std::path::PathBuf;

use crate::model::error::ModelErrorKind;
use crate::model::identifier::Identifier;

/// 1-based line and column inside a description file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Region `[start, end)` of the file a definition was written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub path: PathBuf,
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn new(path: PathBuf, start: SourcePosition, end: SourcePosition) -> Self {
        Self { path, start, end }
    }

    pub fn point(path: PathBuf, position: SourcePosition) -> Self {
        Self::new(path, position, position)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticPhase {
    Construction,
    Verification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// Cross-definition checks of the ISA verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Two instruction patterns match a common word and neither refines the other.
    AmbiguousEncoding,
    /// A tensor constraint pins the same indices to two different values.
    ConflictingConstraint,
    /// A counter lives in a register the ISA does not own.
    UnownedCounterResource,
    /// An artificial resource wraps a resource the ISA does not own.
    UnknownInnerResource,
    /// An ABI refers to a register file the ISA does not own.
    UnownedAbiRegister,
    UncoveredBits,
    OverlappingFields,
    DuplicateConstraint,
    /// An instruction whose encoding fixes no bit at all.
    EmptyEncoding,
    /// A register listed as both caller-saved and callee-saved.
    AbiSavedTwice,
}

impl Rule {
    pub const ALL: [Rule; 10] = [
        Rule::AmbiguousEncoding,
        Rule::ConflictingConstraint,
        Rule::UnownedCounterResource,
        Rule::UnknownInnerResource,
        Rule::UnownedAbiRegister,
        Rule::UncoveredBits,
        Rule::OverlappingFields,
        Rule::DuplicateConstraint,
        Rule::EmptyEncoding,
        Rule::AbiSavedTwice,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            Rule::AmbiguousEncoding => "verify.ambiguous-encoding",
            Rule::ConflictingConstraint => "verify.conflicting-constraint",
            Rule::UnownedCounterResource => "verify.unowned-counter-resource",
            Rule::UnknownInnerResource => "verify.unknown-inner-resource",
            Rule::UnownedAbiRegister => "verify.unowned-abi-register",
            Rule::UncoveredBits => "verify.uncovered-bits",
            Rule::OverlappingFields => "verify.overlapping-fields",
            Rule::DuplicateConstraint => "verify.duplicate-constraint",
            Rule::EmptyEncoding => "verify.empty-encoding",
            Rule::AbiSavedTwice => "verify.abi-saved-twice",
        }
    }

    pub const fn level(self) -> DiagnosticLevel {
        match self {
            Rule::AmbiguousEncoding
            | Rule::ConflictingConstraint
            | Rule::UnownedCounterResource
            | Rule::UnknownInnerResource
            | Rule::UnownedAbiRegister => DiagnosticLevel::Error,
            Rule::UncoveredBits
            | Rule::OverlappingFields
            | Rule::DuplicateConstraint
            | Rule::EmptyEncoding
            | Rule::AbiSavedTwice => DiagnosticLevel::Warning,
        }
    }
}

/// Where a diagnostic came from: a rejected construction or a verifier rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    Construction(ModelErrorKind),
    Verification(Rule),
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::Construction(kind) => kind.code(),
            DiagnosticCode::Verification(rule) => rule.code(),
        }
    }

    pub fn level(self) -> DiagnosticLevel {
        match self {
            DiagnosticCode::Construction(_) => DiagnosticLevel::Error,
            DiagnosticCode::Verification(rule) => rule.level(),
        }
    }

    pub fn phase(self) -> DiagnosticPhase {
        match self {
            DiagnosticCode::Construction(_) => DiagnosticPhase::Construction,
            DiagnosticCode::Verification(_) => DiagnosticPhase::Verification,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDiagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    /// Qualified name of the definition the finding is about.
    pub definition: Option<String>,
    pub span: Option<SourceSpan>,
}

impl ModelDiagnostic {
    pub fn construction(
        kind: ModelErrorKind,
        message: impl Into<String>,
        span: Option<SourceSpan>,
    ) -> Self {
        Self {
            code: DiagnosticCode::Construction(kind),
            message: message.into(),
            definition: None,
            span,
        }
    }

    /// A verifier finding about `definition`; the span is taken from the identifier.
    pub fn verification(rule: Rule, message: impl Into<String>, definition: &Identifier) -> Self {
        Self {
            code: DiagnosticCode::Verification(rule),
            message: message.into(),
            definition: Some(definition.name()),
            span: definition.span().cloned(),
        }
    }

    pub fn level(&self) -> DiagnosticLevel {
        self.code.level()
    }

    pub fn phase(&self) -> DiagnosticPhase {
        self.code.phase()
    }

    pub fn is_error(&self) -> bool {
        self.level() == DiagnosticLevel::Error
    }

    /// `warning[verify.uncovered-bits]: bits [3..0] of format 'G' ... @ rv32i.vadl:12:3`
    pub fn format_human(&self) -> String {
        let location = match (&self.span, &self.definition) {
            (Some(span), _) => span.to_string(),
            (None, Some(definition)) => definition.clone(),
            (None, None) => "<unknown>".to_string(),
        };
        format!("{}[{}]: {} @ {location}", self.level(), self.code, self.message)
    }
}

impl fmt::Display for ModelDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_human())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_findings_take_level_and_span_from_rule_and_definition() {
        let span = SourceSpan::point(PathBuf::from("rv32i.vadl"), SourcePosition::new(12, 3));
        let format = Identifier::from("R").with_span(span);
        let diag = ModelDiagnostic::verification(
            Rule::UncoveredBits,
            "bits [14..12] of format 'R' are not covered by any field",
            &format,
        );
        assert_eq!(
            diag.format_human(),
            "warning[verify.uncovered-bits]: bits [14..12] of format 'R' are not covered by any \
             field @ rv32i.vadl:12:3"
        );
        assert!(!diag.is_error());
        assert_eq!(diag.phase(), DiagnosticPhase::Verification);
        assert_eq!(diag.definition.as_deref(), Some("R"));
    }

    #[test]
    fn location_falls_back_to_definition_name() {
        let diag = ModelDiagnostic::verification(
            Rule::AmbiguousEncoding,
            "encodings collide",
            &Identifier::from("RV32I::ADD"),
        );
        assert!(diag.is_error());
        assert!(diag.format_human().ends_with("@ RV32I::ADD"));

        let diag = ModelDiagnostic::construction(ModelErrorKind::Range, "too wide", None);
        assert_eq!(diag.format_human(), "error[model.range]: too wide @ <unknown>");
    }

    #[test]
    fn rule_codes_are_unique_and_namespaced() {
        let mut codes: Vec<&str> = Rule::ALL.iter().map(|rule| rule.code()).collect();
        assert!(codes.iter().all(|code| code.starts_with("verify.")));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), Rule::ALL.len());
    }
}
