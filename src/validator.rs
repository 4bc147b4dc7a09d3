//! The structural validator ("tracker"), §4.3.
//!
//! The teacher enforces duplicate-key/duplicate-table rules ad hoc while it
//! mutates its format-preserving tree (`ParseError::DuplicateKey`,
//! `ParseError::InvalidTable` in `types.rs`). This module pulls that
//! enforcement out into its own pass: it walks the [`crate::ast::Document`]
//! produced by [`crate::parser::Parser`] expression by expression, in
//! document order, and builds the canonical [`crate::value::Value`] tree
//! while tracking the two sets §4.3 names — `explicit-tables` and
//! `closed-containers` — so every duplicate-definition form is caught in one
//! place instead of scattered across mutation call sites.

use std::collections::HashSet;

use indexmap::IndexMap;
use log::debug;

use crate::ast::{Document, Key, Literal, Node, NodeKind};
use crate::error::Error;
use crate::position::Span;
use crate::value::{Table, Value};

/// One element of an array-of-tables, tracked separately from `Value` so
/// the validator can keep appending to the *current* element while still
/// exposing completed elements to the rest of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    /// A table opened implicitly (by a dotted key or as a header prefix)
    /// or explicitly with `[key]`.
    Table,
    /// The array itself (not one of its elements) created by `[[key]]`.
    ArrayOfTables,
}

/// Tracks the two auxiliary sets from §4.3 plus the document tree under
/// construction. Key paths are joined with `\u{0}` (a byte that can never
/// appear in a parsed key segment) so they can be compared and hashed as
/// plain strings without re-deriving the path from the tree on every check.
pub struct Validator {
    root: Value,
    /// Key paths opened by a `[...]` header.
    explicit_tables: HashSet<String>,
    /// Key paths whose contents are frozen: inline tables, `[...]` literal
    /// arrays, and the non-final prefix segments of an array-of-tables path.
    closed_containers: HashSet<String>,
    /// Table paths that came into existence as a dotted-key prefix (`b.c =
    /// 1` implicitly creates table `b`). Per the TOML spec, such a table may
    /// not later be reopened with a `[...]` header, though a *sub*-table of
    /// it may (`[a.b.d]` is fine even though `[a.b]` would not be).
    dotted_tables: HashSet<String>,
    /// What kind of container lives at each known table/array-table path,
    /// used only to produce clearer error messages.
    container_kinds: IndexMap<String, ContainerKind>,
}

impl Validator {
    pub fn new() -> Self {
        Validator {
            root: Value::Table(Table::new()),
            explicit_tables: HashSet::new(),
            closed_containers: HashSet::new(),
            dotted_tables: HashSet::new(),
            container_kinds: IndexMap::new(),
        }
    }

    /// Validate and materialize a parsed document into a [`Value::Table`]
    /// (§3 "Document tree (post-validation)").
    pub fn build(document: &Document) -> Result<Value, Error> {
        debug!("validating {} top-level expressions", document.expressions.len());
        let mut validator = Validator::new();
        let mut scope: Vec<String> = Vec::new();
        for expr in &document.expressions {
            validator.apply(expr, &mut scope)?;
        }
        Ok(validator.root)
    }

    fn apply(&mut self, expr: &Node, scope: &mut Vec<String>) -> Result<(), Error> {
        match &expr.kind {
            NodeKind::KeyValue { key, value } => {
                let path = full_path(scope, key);
                self.insert_leaf(&path, scope.len(), resolve(value)?, expr.span)?;
                Ok(())
            }
            NodeKind::Table { key } => {
                let path = key_path(key);
                self.open_table(&path, expr.span)?;
                *scope = path;
                Ok(())
            }
            NodeKind::ArrayTable { key } => {
                let path = key_path(key);
                self.open_array_table(&path, expr.span)?;
                *scope = path;
                Ok(())
            }
            NodeKind::Value(_) => unreachable!("top-level expressions are never bare values"),
        }
    }

    /// `[K]` (§4.3 table): require `K` is not already explicit; walk/create
    /// implicit tables along the prefix; the final table becomes explicit.
    fn open_table(&mut self, path: &[String], span: Span) -> Result<(), Error> {
        let joined = join(path);
        if self.explicit_tables.contains(&joined) {
            return Err(Error::structural(span, format!("table `{}` is defined more than once", joined)));
        }
        if self.closed_containers.contains(&joined) {
            return Err(Error::structural(span, format!("`{}` is closed and cannot be reopened as a table", joined)));
        }
        if self.dotted_tables.contains(&joined) {
            return Err(Error::structural(span, format!("`{}` was already defined via a dotted key and cannot be reopened as a table", joined)));
        }
        if self.container_kinds.get(&joined).copied() == Some(ContainerKind::ArrayOfTables) {
            return Err(Error::structural(span, format!("`{}` is an array of tables and cannot be reopened as a table", joined)));
        }
        self.ensure_path_is_walkable_table(path, span)?;
        self.explicit_tables.insert(joined.clone());
        self.container_kinds.insert(joined, ContainerKind::Table);
        Ok(())
    }

    /// `[[K]]` (§4.3 array-table): walk/create implicit tables along the
    /// prefix; append a fresh table to the array at `K`, creating the array
    /// on first use.
    fn open_array_table(&mut self, path: &[String], span: Span) -> Result<(), Error> {
        let (prefix, last) = path.split_at(path.len() - 1);
        let last = &last[0];

        if !prefix.is_empty() {
            self.ensure_path_is_walkable_table(prefix, span)?;
        }

        let joined = join(path);
        if self.closed_containers.contains(&joined) {
            return Err(Error::structural(span, format!("`{}` is a fixed array and cannot be extended", joined)));
        }
        if self.explicit_tables.contains(&joined) {
            return Err(Error::structural(span, format!("`{}` is already a table, not an array of tables", joined)));
        }

        let container = self.container_at_mut(prefix)?;
        let table = match container {
            Value::Table(t) => t,
            _ => return Err(Error::structural(span, format!("`{}` is not a table", join(prefix)))),
        };
        match table.get_mut(last.as_str()) {
            Some(Value::Array(elements)) => {
                if !self.container_kinds.get(&joined).copied().map(|k| k == ContainerKind::ArrayOfTables).unwrap_or(true) {
                    return Err(Error::structural(span, format!("`{}` is not an array of tables", joined)));
                }
                elements.push(Value::Table(Table::new()));
            }
            Some(_) => {
                return Err(Error::structural(span, format!("`{}` is already defined as a non-array value", joined)));
            }
            None => {
                table.insert(last.clone(), Value::Array(vec![Value::Table(Table::new())]));
                self.container_kinds.insert(joined, ContainerKind::ArrayOfTables);
            }
        }
        Ok(())
    }

    /// `K = V` within the current scope (§4.3 key-value): walk/create
    /// implicit tables for every prefix of the full path, then insert the
    /// leaf, failing if it already exists.
    ///
    /// `scope_len` marks where the enclosing `[table]` scope's own path ends
    /// and the key's own (possibly dotted) segments begin: only the latter
    /// portion of `prefix` is recorded as dotted-key-created, since a
    /// scope's own implicit tables came from a header, not from this key.
    fn insert_leaf(&mut self, path: &[String], scope_len: usize, value: Value, span: Span) -> Result<(), Error> {
        let (prefix, last) = path.split_at(path.len() - 1);
        let last = &last[0];

        for i in 0..prefix.len() {
            let sub = &prefix[..=i];
            let joined = join(sub);
            if self.closed_containers.contains(&joined) {
                return Err(Error::structural(span, format!("`{}` is closed and cannot be extended", joined)));
            }
        }

        for i in scope_len..prefix.len() {
            self.dotted_tables.insert(join(&path[..=i]));
        }

        let container = self.container_at_mut(prefix)?;
        let table = match container {
            Value::Table(t) => t,
            _ => return Err(Error::structural(span, format!("`{}` is not a table", join(prefix)))),
        };
        if table.contains_key(last.as_str()) {
            let full = join(path);
            return Err(Error::structural(span, format!("key `{}` is defined more than once", full)));
        }
        // A literal array or an inline table is frozen on construction
        // (§3): neither may later be extended by `[[path]]` or a header.
        if matches!(value, Value::Array(_) | Value::Table(_)) {
            self.closed_containers.insert(join(path));
        }
        table.insert(last.clone(), value);
        Ok(())
    }

    /// Walk `path` from the root, creating any missing implicit tables,
    /// erroring if an existing entry along the way is a leaf, an array, or
    /// an array-of-tables (only a plain table may be walked through).
    fn ensure_path_is_walkable_table(&mut self, path: &[String], span: Span) -> Result<(), Error> {
        let mut node = &mut self.root;
        for (i, segment) in path.iter().enumerate() {
            let table = match node {
                Value::Table(t) => t,
                _ => {
                    return Err(Error::structural(span, format!("`{}` is not a table", join(&path[..i]))));
                }
            };
            node = table.entry(segment.clone()).or_insert_with(|| Value::Table(Table::new()));
            if let Value::Array(elements) = node {
                node = elements.last_mut().ok_or_else(|| {
                    Error::structural(span, format!("`{}` is an empty array of tables", join(&path[..=i])))
                })?;
            }
        }
        if !matches!(node, Value::Table(_)) {
            return Err(Error::structural(span, format!("`{}` is not a table", join(path))));
        }
        Ok(())
    }

    /// Resolve `path` (a table/array-table prefix that must already exist,
    /// having been walked by a previous header) to its current container,
    /// descending into the last element of any array-of-tables along the
    /// way, same as [`Self::ensure_path_is_walkable_table`] but read-only
    /// except for the final borrow.
    fn container_at_mut(&mut self, path: &[String]) -> Result<&mut Value, Error> {
        let mut node = &mut self.root;
        for segment in path {
            let table = match node {
                Value::Table(t) => t,
                _ => return Err(Error::structural(Span::point(Default::default(), 0), "not a table".to_string())),
            };
            node = table.entry(segment.clone()).or_insert_with(|| Value::Table(Table::new()));
            if let Value::Array(elements) = node {
                if elements.is_empty() {
                    elements.push(Value::Table(Table::new()));
                }
                node = elements.last_mut().unwrap();
            }
        }
        Ok(node)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Validator::new()
    }
}

fn key_path(key: &Key) -> Vec<String> {
    key.segments.iter().map(|s| s.name.clone()).collect()
}

fn full_path(scope: &[String], key: &Key) -> Vec<String> {
    let mut path = scope.to_vec();
    path.extend(key_path(key));
    path
}

fn join(path: &[String]) -> String {
    path.join("\u{0}")
}

/// Resolve a value node (already parsed down to a [`Literal`]) into a
/// [`Value`], recursing into arrays and inline tables. Inline-table members
/// are checked for intra-table key uniqueness (§3 "all key segments in a
/// table must be unique"); nested headers can never reach into them because
/// the caller marks the whole inline table as a closed container.
fn resolve(node: &Node) -> Result<Value, Error> {
    match &node.kind {
        NodeKind::Value(literal) => resolve_literal(literal, node.span),
        _ => unreachable!("value nodes only ever wrap NodeKind::Value"),
    }
}

fn resolve_literal(literal: &Literal, span: Span) -> Result<Value, Error> {
    match literal {
        Literal::String(s) => Ok(Value::String(s.clone())),
        Literal::Integer(i) => Ok(Value::Integer(*i)),
        Literal::Float(f) => Ok(Value::Float(*f)),
        Literal::Boolean(b) => Ok(Value::Boolean(*b)),
        Literal::Datetime(dt) => Ok(Value::Datetime(*dt)),
        Literal::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                values.push(resolve(item)?);
            }
            Ok(Value::Array(values))
        }
        Literal::InlineTable(entries) => {
            // Dotted keys are permitted here (TOML 1.0 allows `{ a.b = 1 }`):
            // walk/create the intra-inline-table prefix tables exactly as a
            // top-level dotted key would, rooted at this inline table rather
            // than the document root. Reusing an existing leaf as a prefix,
            // or a prefix as a leaf, is still rejected below.
            let mut table = Table::new();
            for (key, value_node) in entries {
                let segments: Vec<&str> = key.segments.iter().map(|s| s.name.as_str()).collect();
                let (prefix, last) = segments.split_at(segments.len() - 1);
                let last = last[0];

                let mut node = &mut table;
                let mut joined = String::new();
                for segment in prefix {
                    if !joined.is_empty() {
                        joined.push('.');
                    }
                    joined.push_str(segment);
                    let entry = node.entry((*segment).to_string()).or_insert_with(|| Value::Table(Table::new()));
                    node = match entry {
                        Value::Table(t) => t,
                        _ => return Err(Error::structural(key.span, format!("key `{}` is defined more than once in this inline table", joined))),
                    };
                }
                if node.contains_key(last) {
                    let full = if joined.is_empty() { last.to_string() } else { format!("{}.{}", joined, last) };
                    return Err(Error::structural(key.span, format!("key `{}` is defined more than once in this inline table", full)));
                }
                let resolved = resolve(value_node)?;
                node.insert(last.to_string(), resolved);
            }
            let _ = span;
            Ok(Value::Table(table))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn build(src: &str) -> Result<Value, Error> {
        let doc = Parser::parse(src).unwrap();
        Validator::build(&doc)
    }

    #[test]
    fn rejects_duplicate_key() {
        assert!(build("a = 1\na = 2\n").is_err());
    }

    #[test]
    fn rejects_duplicate_table() {
        assert!(build("[a]\n[a]\n").is_err());
    }

    #[test]
    fn rejects_dotted_key_then_header() {
        assert!(build("[a]\nb.c = 1\n[a.b]\n").is_err());
    }

    #[test]
    fn allows_subtable_header_under_dotted_table() {
        // `[a.b]` is disallowed (it *is* the dotted-key table) but `[a.b.d]`
        // defines a sub-table within it, which the spec explicitly permits.
        assert!(build("[a]\nb.c = 1\n[a.b.d]\n").is_ok());
    }

    #[test]
    fn rejects_array_table_after_table_header() {
        assert!(build("[[a]]\n[a]\n").is_err());
    }

    #[test]
    fn accepts_implicit_then_explicit_in_different_order() {
        // `[x.y]` then `[x]` is fine: `x` was only ever implicit until here.
        assert!(build("[x.y]\n[x]\n").is_ok());
    }

    #[test]
    fn array_of_tables_appends_elements() {
        let v = build("[[fruit]]\nname = \"apple\"\n[[fruit]]\nname = \"pear\"\n").unwrap();
        let fruit = v.as_table().unwrap().get("fruit").unwrap().as_array().unwrap();
        assert_eq!(fruit.len(), 2);
    }

    #[test]
    fn rejects_literal_array_extension_via_array_table() {
        assert!(build("a = [1, 2]\n[[a]]\n").is_err());
    }

    #[test]
    fn rejects_inline_table_extension() {
        assert!(build("a = { x = 1 }\n[a]\n").is_err());
    }

    #[test]
    fn allows_dotted_keys_inside_inline_table() {
        let v = build("a = { b.c = 1, b.d = 2 }\n").unwrap();
        let b = v.as_table().unwrap().get("a").unwrap().as_table().unwrap().get("b").unwrap().as_table().unwrap();
        assert_eq!(b.get("c").unwrap().as_integer(), Some(1));
        assert_eq!(b.get("d").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn rejects_inline_table_dotted_key_reusing_leaf_as_prefix() {
        assert!(build("a = { b = 1, b.c = 2 }\n").is_err());
    }

    #[test]
    fn rejects_inline_table_dotted_key_reusing_prefix_as_leaf() {
        assert!(build("a = { b.c = 1, b = 2 }\n").is_err());
    }
}
