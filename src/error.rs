//! The codec's typed error hierarchy.
//!
//! The teacher (`tomllib::types::TOMLError`/`ParseError`) carried a key, a
//! line and column (column reporting was permanently stubbed to zero) and a
//! message per variant. This module keeps that same "carry enough to point
//! at the problem" shape, but actually tracks column, and renders a
//! three-line context window the way a production diagnostic tool would.

use std::fmt;

use thiserror::Error;

use crate::position::Span;

/// A single path segment used to describe where, on the *target* side, a
/// conversion or target error occurred (there is no document `Span` to point
/// to once we're talking about the host value's shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Field(name) => write!(f, ".{}", name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A dotted/bracketed path into the target value, e.g. `products[1].color`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetPath(pub Vec<PathSegment>);

impl TargetPath {
    pub fn root() -> Self {
        TargetPath(Vec::new())
    }

    pub fn push(&self, segment: PathSegment) -> Self {
        let mut path = self.0.clone();
        path.push(segment);
        TargetPath(path)
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            if i == 0 {
                if let PathSegment::Field(name) = seg {
                    write!(f, "{}", name)?;
                    continue;
                }
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

/// A missing-field or missing-table condition recorded by strict-mode
/// decoding (§4.3, §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrictViolation {
    /// A key existed in the document but no field on the target claimed it.
    UnmappedKey { path: TargetPath, span: Span },
    /// A field existed on the target but no key in the document supplied it.
    UntouchedField { path: TargetPath },
}

impl fmt::Display for StrictViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrictViolation::UnmappedKey { path, span } => {
                write!(f, "unmapped key `{}` at {}", path, span)
            }
            StrictViolation::UntouchedField { path } => {
                write!(f, "missing field `{}`", path)
            }
        }
    }
}

/// The single error type returned from every fallible entry point in this
/// crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("lexical error at {span}: {message}")]
    Lexical { span: Span, message: String },

    #[error("grammar error at {span}: {message}")]
    Grammar { span: Span, message: String },

    #[error("structural error at {span}: {message}")]
    Structural { span: Span, message: String },

    #[error("cannot convert document value at `{path}` to target type: {message}")]
    Conversion { path: TargetPath, message: String },

    #[error("invalid decode/encode target at `{path}`: {message}")]
    Target { path: TargetPath, message: String },

    #[error("strict mode found {} violation(s): {}", .0.len(), render_violations(.0))]
    StrictMissing(Vec<StrictViolation>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised internally by [`crate::ser`]'s `serialize_none` and caught by
    /// the enclosing `SerializeMap`/`SerializeStruct` impl to implement
    /// §4.5 rule 10's "omit empty" behavior — TOML has no null, so an
    /// `Option::None` field is dropped rather than encoded. Never escapes
    /// [`crate::ser`]; a caller who sees this variant has found a bug.
    #[error("internal: a None value reached a context that does not catch it")]
    OmittedNone,
}

fn render_violations(violations: &[StrictViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl Error {
    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Error::Lexical { span, message: message.into() }
    }

    pub fn grammar(span: Span, message: impl Into<String>) -> Self {
        Error::Grammar { span, message: message.into() }
    }

    pub fn structural(span: Span, message: impl Into<String>) -> Self {
        Error::Structural { span, message: message.into() }
    }

    pub fn conversion(path: TargetPath, message: impl Into<String>) -> Self {
        Error::Conversion { path, message: message.into() }
    }

    pub fn target(path: TargetPath, message: impl Into<String>) -> Self {
        Error::Target { path, message: message.into() }
    }

    /// The document span this error points at, if any (strict/target/I-O
    /// errors have no document location).
    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Lexical { span, .. } | Error::Grammar { span, .. } | Error::Structural { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Render this error together with up to three lines of surrounding
    /// context from `source`, with a `~` highlight under the offending
    /// lexeme. Falls back to plain `Display` when the error carries no span.
    pub fn render(&self, source: &str) -> String {
        let span = match self.span() {
            Some(span) => span,
            None => return self.to_string(),
        };
        let lines: Vec<&str> = source.split('\n').collect();
        let target_line = span.start.line as usize;
        let first = target_line.saturating_sub(3).max(1);
        let last = (target_line + 2).min(lines.len());

        let mut out = String::new();
        out.push_str(&self.to_string());
        out.push('\n');
        for lineno in first..=last {
            let text = lines.get(lineno - 1).copied().unwrap_or("");
            out.push_str(&format!("{:>5} | {}\n", lineno, text));
            if lineno == target_line {
                let start_col = span.start.column as usize;
                let width = if span.end.line == span.start.line {
                    (span.end.column as usize).saturating_sub(start_col).max(1)
                } else {
                    1
                };
                out.push_str("      | ");
                out.push_str(&" ".repeat(start_col.saturating_sub(1)));
                out.push_str(&"~".repeat(width));
                out.push('\n');
            }
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// `serde`'s data model has no notion of a document span or a target path,
/// so an error raised from inside a `Visitor`/`Serialize` impl (rather than
/// from one of [`crate::de`]/[`crate::ser`]'s own call sites, which attach a
/// real [`TargetPath`]) is reported against the root path.
impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::conversion(TargetPath::root(), msg.to_string())
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::conversion(TargetPath::root(), msg.to_string())
    }
}
