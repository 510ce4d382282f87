use std::fmt::{Display, Formatter};

/// Failure reading input before any line reaches the parser.
///
/// Parsing itself is fail-soft and never produces an error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid UTF-8 input: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),
}

/// A non-fatal note about a line the parser skipped or only partly handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    pub(crate) fn new(line: u32, kind: DiagnosticKind) -> Self {
        Self { line, kind }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The line has content but no `=`; it was skipped.
    MissingSeparator,
    /// Substitution stopped after the configured number of replacements.
    /// `name` is the reference that was still pending.
    SubstitutionLimit { name: String },
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "missing `=` separator, line skipped"),
            Self::SubstitutionLimit { name } => {
                write!(f, "substitution limit reached while expanding `${name}`")
            }
        }
    }
}
