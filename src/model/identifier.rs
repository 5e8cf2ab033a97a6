//! Qualified names shared by every model definition.

use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

use super::diagnostic::SourceSpan;

/// `::`-separated qualified name (e.g. `RV32I::Rtype::rs1`) with an optional source span.
///
/// Equality and hashing only look at the name parts.
#[derive(Clone, Debug)]
pub struct Identifier {
    parts: SmallVec<[String; 3]>,
    span: Option<SourceSpan>,
}

impl Identifier {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            parts: parts.into_iter().map(|part| normalize_part(part.as_ref())).collect(),
            span: None,
        }
    }

    /// Splits a qualified name on `::`.
    pub fn parse(qualified: &str) -> Self {
        Self::new(qualified.split("::"))
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn span(&self) -> Option<&SourceSpan> {
        self.span.as_ref()
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn name(&self) -> String {
        self.parts.join("::")
    }

    pub fn simple_name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or("")
    }

    /// Joins the parts with `_`, the form emitters use for generated symbols.
    pub fn lower(&self) -> String {
        self.parts.join("_")
    }

    pub fn append(&self, part: &str) -> Self {
        let mut parts = self.parts.clone();
        parts.push(normalize_part(part));
        Self {
            parts,
            span: self.span.clone(),
        }
    }

    pub fn prepend(&self, scope: &Identifier) -> Self {
        let mut parts = scope.parts.clone();
        parts.extend(self.parts.iter().cloned());
        Self {
            parts,
            span: self.span.clone(),
        }
    }

    pub fn extend_simple_name(&self, suffix: &str) -> Self {
        let mut parts = self.parts.clone();
        if let Some(last) = parts.last_mut() {
            last.push_str(suffix);
        }
        Self {
            parts,
            span: self.span.clone(),
        }
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::parse(value)
    }
}

fn normalize_part(part: &str) -> String {
    let trimmed = part.trim();
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    trimmed.to_string()
}
