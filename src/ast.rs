//! The syntax tree produced by [`crate::parser`] (§3, §4.2).
//!
//! The teacher builds a format-preserving tree of `NLExpression`/`Expression`
//! nodes (`toml.rs`) that carries whitespace, comments, and raw source
//! alongside every value so the document could later be rewritten byte-for-
//! byte. This codec has no such round-trip requirement (§1 Non-goals), so
//! `Node` keeps only what the structural validator and decoder need: the
//! expression's kind, its source span, and its parsed payload.

use crate::datetime::Datetime;
use crate::position::Span;

/// One segment of a dotted key (`a.b.c` is three segments).
#[derive(Debug, Clone, PartialEq)]
pub struct KeySegment {
    pub name: String,
    pub span: Span,
}

/// A possibly-dotted key as it appeared in the source, left-to-right.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub segments: Vec<KeySegment>,
    pub span: Span,
}

impl Key {
    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        let name = name.into();
        Key { segments: vec![KeySegment { name, span }], span }
    }
}

/// A scalar or composite value literal, already resolved into its semantic
/// form (escapes unescaped, digits parsed, date/time validated).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Datetime(Datetime),
    Array(Vec<Node>),
    InlineTable(Vec<(Key, Node)>),
}

/// One parsed construct in the document, in source order.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// `key = value`
    KeyValue { key: Key, value: Box<Node> },
    /// `[key]`
    Table { key: Key },
    /// `[[key]]`
    ArrayTable { key: Key },
    /// A resolved value literal, used as the payload of a `KeyValue`, or
    /// nested inside `Array`/`InlineTable` literals.
    Value(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node { kind, span }
    }

    pub fn value(literal: Literal, span: Span) -> Self {
        Node { kind: NodeKind::Value(literal), span }
    }
}

/// The top-level parse result: every expression in the document, in the
/// order they appeared. Blank lines and comments are not represented —
/// they carry no structural meaning (§1 Non-goals excludes round-tripping).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub expressions: Vec<Node>,
}
