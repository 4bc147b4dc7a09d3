//! The Encoder (§4.5): walks a caller-provided value graph (any
//! `serde::Serialize`) and emits a canonical TOML document.
//!
//! Like [`crate::de`], this module leans on `serde`'s reflection seam rather
//! than a bespoke one: `#[derive(Serialize)]` already supplies the
//! `for_each_field` the spec describes, so this module only has to provide a
//! `serde::Serializer` that builds the intermediate [`Value`] tree, and a
//! separate renderer that walks that tree into canonical TOML text. Grounded
//! on the historical `toml-rs` `Encoder`/`encode_str` shape
//! (`examples/other_examples/a267bc1a_toml-rs-toml-rs__src-lib.rs.rs`) and,
//! for the string/float escaping conventions, `facet-toml`'s hand-written
//! `TomlSerializer`
//! (`examples/other_examples/a38ab670_facet-rs-facet__facet-toml-src-serializer.rs.rs`).

use log::debug;
use serde::ser::{
    Impossible, Serialize, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant,
    SerializeTuple, SerializeTupleStruct, SerializeTupleVariant, Serializer as SerdeSerializer,
};

use crate::datetime::{Datetime, MARKER_FIELD, MARKER_NAME};
use crate::error::{Error, TargetPath};
use crate::value::{Table, Value};

/// Encoder configuration (§6 `Serializer::new`). `sort_keys` governs §4.5
/// rule 9's "maps in a caller-selected order": `true` (the default) sorts a
/// `serialize_map` table's keys ascending before emission; `false` preserves
/// the order the caller's `Serialize` impl supplied them in ("preserve
/// insertion" mode). Record (struct) fields always keep their declaration
/// order regardless of this setting — only `serialize_map` tables are
/// affected, since a `#[derive(Serialize)]` struct has no other order to
/// preserve or sort by.
///
/// `tag_name` is accepted for parity with [`crate::de::Options`] but has no
/// effect on emission: there is no second attribute namespace to label, only
/// the decoder's strict-mode bookkeeping reads it. `multiline` forces every
/// string (not only ones containing an embedded newline) into `"""..."""`
/// form. `arrays_one_per_line` renders inline arrays with one element per
/// line, indented two spaces per nesting level, instead of the default
/// single-line `[a, b, c]` form.
#[derive(Debug, Clone)]
pub struct Options {
    pub sort_keys: bool,
    pub tag_name: String,
    pub multiline: bool,
    pub arrays_one_per_line: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { sort_keys: true, tag_name: "toml".to_string(), multiline: false, arrays_one_per_line: false }
    }
}

impl Options {
    pub fn sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    /// `true` sorts map keys ascending (the default); `false` preserves
    /// caller/insertion order — the inverse of `sort_keys`, spelled the way
    /// §6 names it (`preserve_order`).
    pub fn preserve_order(mut self, preserve: bool) -> Self {
        self.sort_keys = !preserve;
        self
    }

    pub fn tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.tag_name = tag_name.into();
        self
    }

    pub fn multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    pub fn inline_arrays_one_per_line(mut self, one_per_line: bool) -> Self {
        self.arrays_one_per_line = one_per_line;
        self
    }
}

/// Fluent builder mirroring §6's `tomlcodec::Serializer::new()` surface;
/// a thin wrapper over [`Options`] and [`to_string_with_options`].
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    options: Options,
}

impl Serializer {
    pub fn new() -> Self {
        Serializer { options: Options::default() }
    }

    pub fn preserve_order(mut self, preserve: bool) -> Self {
        self.options = self.options.preserve_order(preserve);
        self
    }

    pub fn tag_name(mut self, tag_name: impl Into<String>) -> Self {
        self.options = self.options.tag_name(tag_name);
        self
    }

    pub fn multiline(mut self, multiline: bool) -> Self {
        self.options = self.options.multiline(multiline);
        self
    }

    pub fn inline_arrays_one_per_line(mut self, one_per_line: bool) -> Self {
        self.options = self.options.inline_arrays_one_per_line(one_per_line);
        self
    }

    pub fn serialize<T: Serialize + ?Sized>(self, value: &T) -> Result<String, Error> {
        to_string_with_options(value, self.options)
    }
}

/// Serialize `value` to a canonical TOML string (§6 `encode(target) -> bytes`).
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, Error> {
    to_string_with_options(value, Options::default())
}

/// Same as [`to_string`], with explicit [`Options`].
pub fn to_string_with_options<T: Serialize + ?Sized>(value: &T, options: Options) -> Result<String, Error> {
    debug!("encoding document (sort_keys = {})", options.sort_keys);
    let value = to_value_with_options(value, options)?;
    let table = match &value {
        Value::Table(t) => t,
        other => {
            return Err(Error::target(
                TargetPath::root(),
                format!("the top-level value must be a table, found {}", other.type_name()),
            ));
        }
    };
    let mut out = String::new();
    write_table_body(&mut out, table, &[], &options, 0)?;
    Ok(out)
}

/// Same as [`to_string`], returning the encoded bytes.
pub fn to_vec<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    to_string(value).map(String::into_bytes)
}

/// Serialize `value` into the intermediate [`Value`] tree without rendering
/// it to text, e.g. to inspect or further transform a document before
/// emitting it.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    to_value_with_options(value, Options::default())
}

pub fn to_value_with_options<T: Serialize + ?Sized>(value: &T, options: Options) -> Result<Value, Error> {
    value.serialize(ValueSerializer { options: &options, depth: 0 })
}

/// A generous ceiling on nesting depth, the only defense this codec has
/// against a cyclic `Serialize` graph (§4.5 "cyclic graphs ... are fatal"):
/// `serde`'s data model carries no node identity, so there is no way to
/// detect a cycle directly — only to bound how far a walk is allowed to run.
const MAX_DEPTH: usize = 128;

#[derive(Clone, Copy)]
struct ValueSerializer<'a> {
    options: &'a Options,
    depth: usize,
}

impl<'a> ValueSerializer<'a> {
    fn nested(&self) -> Result<Self, Error> {
        if self.depth >= MAX_DEPTH {
            return Err(Error::target(
                TargetPath::root(),
                "exceeded maximum nesting depth while encoding (possible cyclic graph)".to_string(),
            ));
        }
        Ok(ValueSerializer { options: self.options, depth: self.depth + 1 })
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::target(TargetPath::root(), message.into())
    }
}

impl<'a> SerdeSerializer for ValueSerializer<'a> {
    type Ok = Value;
    type Error = Error;
    type SerializeSeq = SeqSerializer<'a>;
    type SerializeTuple = SeqSerializer<'a>;
    type SerializeTupleStruct = SeqSerializer<'a>;
    type SerializeTupleVariant = TupleVariantSerializer<'a>;
    type SerializeMap = MapSerializer<'a>;
    type SerializeStruct = StructSerializer<'a>;
    type SerializeStructVariant = StructVariantSerializer<'a>;

    fn serialize_bool(self, v: bool) -> Result<Value, Error> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, Error> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, Error> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, Error> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, Error> {
        Ok(Value::Integer(v))
    }

    fn serialize_i128(self, v: i128) -> Result<Value, Error> {
        i64::try_from(v).map(Value::Integer).map_err(|_| self.err(format!("{} does not fit in a 64-bit integer", v)))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, Error> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, Error> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, Error> {
        Ok(Value::Integer(v as i64))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, Error> {
        i64::try_from(v).map(Value::Integer).map_err(|_| self.err(format!("{} does not fit in a 64-bit integer", v)))
    }

    fn serialize_u128(self, v: u128) -> Result<Value, Error> {
        i64::try_from(v).map(Value::Integer).map_err(|_| self.err(format!("{} does not fit in a 64-bit integer", v)))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, Error> {
        Ok(Value::Float(v as f64))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, Error> {
        Ok(Value::Float(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, Error> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Value, Error> {
        Err(self.err("TOML has no byte-string type; encode as a string or an array of integers"))
    }

    fn serialize_none(self) -> Result<Value, Error> {
        Err(Error::OmittedNone)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, Error> {
        Err(self.err("TOML has no unit/null type"))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Error> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(self, _name: &'static str, _variant_index: u32, variant: &'static str) -> Result<Value, Error> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<Value, Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, Error> {
        let inner = value.serialize(self.nested()?)?;
        let mut table = Table::new();
        table.insert(variant.to_string(), inner);
        Ok(Value::Table(table))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SeqSerializer<'a>, Error> {
        Ok(SeqSerializer { items: Vec::with_capacity(len.unwrap_or(0)), child: self.nested()? })
    }

    fn serialize_tuple(self, len: usize) -> Result<SeqSerializer<'a>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SeqSerializer<'a>, Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<TupleVariantSerializer<'a>, Error> {
        Ok(TupleVariantSerializer { variant, items: Vec::with_capacity(len), child: self.nested()? })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<MapSerializer<'a>, Error> {
        Ok(MapSerializer { sort: self.options.sort_keys, entries: Vec::new(), pending_key: None, child: self.nested()? })
    }

    fn serialize_struct(self, name: &'static str, len: usize) -> Result<StructSerializer<'a>, Error> {
        if name == MARKER_NAME {
            return Err(self.err("internal: datetime marker struct routed through the generic struct path"));
        }
        let _ = len;
        Ok(StructSerializer { table: Table::new(), child: self.nested()?, datetime: None })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<StructVariantSerializer<'a>, Error> {
        Ok(StructVariantSerializer { variant, table: Table::new(), child: self.nested()? })
    }
}

/// A minimal serializer used only to turn a `serialize_map` key, or the
/// datetime marker struct's hidden field, into a `String` — `serde`'s
/// `SerializeMap::serialize_key` accepts any `Serialize`, but TOML keys (and
/// this codec's one non-scalar-in-disguise, [`Datetime`]) are always scalars
/// underneath.
struct ScalarStringSerializer;

impl SerdeSerializer for ScalarStringSerializer {
    type Ok = String;
    type Error = Error;
    type SerializeSeq = Impossible<String, Error>;
    type SerializeTuple = Impossible<String, Error>;
    type SerializeTupleStruct = Impossible<String, Error>;
    type SerializeTupleVariant = Impossible<String, Error>;
    type SerializeMap = Impossible<String, Error>;
    type SerializeStruct = Impossible<String, Error>;
    type SerializeStructVariant = Impossible<String, Error>;

    fn serialize_bool(self, v: bool) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_i8(self, v: i8) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_i16(self, v: i16) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_i32(self, v: i32) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_i64(self, v: i64) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_u8(self, v: u8) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_u16(self, v: u16) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_u32(self, v: u32) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_u64(self, v: u64) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_f32(self, v: f32) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_f64(self, v: f64) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_char(self, v: char) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_str(self, v: &str) -> Result<String, Error> {
        Ok(v.to_string())
    }
    fn serialize_bytes(self, _v: &[u8]) -> Result<String, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_none(self) -> Result<String, Error> {
        Err(Error::target(TargetPath::root(), "map keys cannot be null".to_string()))
    }
    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<String, Error> {
        value.serialize(self)
    }
    fn serialize_unit(self) -> Result<String, Error> {
        Err(Error::target(TargetPath::root(), "map keys cannot be unit".to_string()))
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<String, Error> {
        self.serialize_unit()
    }
    fn serialize_unit_variant(self, _name: &'static str, _idx: u32, variant: &'static str) -> Result<String, Error> {
        Ok(variant.to_string())
    }
    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<String, Error> {
        value.serialize(self)
    }
    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _idx: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<String, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _idx: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeStruct, Error> {
        if name == MARKER_NAME {
            return Err(Error::target(TargetPath::root(), "a datetime cannot itself be used as a map key".to_string()));
        }
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _idx: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Error> {
        Err(Error::target(TargetPath::root(), "map keys must be strings or string-convertible scalars".to_string()))
    }
}

struct SeqSerializer<'a> {
    items: Vec<Value>,
    child: ValueSerializer<'a>,
}

impl<'a> SeqSerializer<'a> {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        match value.serialize(self.child) {
            Ok(v) => {
                self.items.push(v);
                Ok(())
            }
            Err(Error::OmittedNone) => Err(Error::target(TargetPath::root(), "TOML arrays cannot contain a null element".to_string())),
            Err(e) => Err(e),
        }
    }
}

impl<'a> SerializeSeq for SeqSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl<'a> SerializeTuple for SeqSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

impl<'a> SerializeTupleStruct for SeqSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        self.push(value)
    }

    fn end(self) -> Result<Value, Error> {
        Ok(Value::Array(self.items))
    }
}

struct TupleVariantSerializer<'a> {
    variant: &'static str,
    items: Vec<Value>,
    child: ValueSerializer<'a>,
}

impl<'a> SerializeTupleVariant for TupleVariantSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        match value.serialize(self.child) {
            Ok(v) => {
                self.items.push(v);
                Ok(())
            }
            Err(Error::OmittedNone) => Err(Error::target(TargetPath::root(), "TOML arrays cannot contain a null element".to_string())),
            Err(e) => Err(e),
        }
    }

    fn end(self) -> Result<Value, Error> {
        let mut table = Table::new();
        table.insert(self.variant.to_string(), Value::Array(self.items));
        Ok(Value::Table(table))
    }
}

struct MapSerializer<'a> {
    sort: bool,
    entries: Vec<(String, Value)>,
    pending_key: Option<String>,
    child: ValueSerializer<'a>,
}

impl<'a> SerializeMap for MapSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Error> {
        let key = key.serialize(ScalarStringSerializer)?;
        if key.contains('\n') || key.contains('\r') {
            return Err(Error::target(TargetPath::root(), format!("map key `{}` contains an embedded newline", key)));
        }
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let key = self.pending_key.take().expect("serialize_value called before serialize_key");
        match value.serialize(self.child) {
            Ok(v) => {
                self.entries.push((key, v));
                Ok(())
            }
            // §4.5 rule 10: an absent optional map value is simply omitted.
            Err(Error::OmittedNone) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn end(self) -> Result<Value, Error> {
        let mut entries = self.entries;
        if self.sort {
            entries.sort_by(|a, b| a.0.cmp(&b.0));
        }
        let mut table = Table::new();
        for (k, v) in entries {
            table.insert(k, v);
        }
        Ok(Value::Table(table))
    }
}

struct StructSerializer<'a> {
    table: Table,
    child: ValueSerializer<'a>,
    /// Set only while serializing the hidden field of a [`Datetime`]'s
    /// marker struct (`serialize_struct` short-circuits before constructing
    /// this type in that case — see [`ValueSerializer::serialize_struct`] —
    /// this field exists so the type can still be constructed uniformly by
    /// [`datetime_struct`] below without a second struct definition).
    datetime: Option<String>,
}

impl<'a> SerializeStruct for StructSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        if self.datetime.is_some() || key == MARKER_FIELD {
            let text = value.serialize(ScalarStringSerializer)?;
            self.datetime = Some(text);
            return Ok(());
        }
        match value.serialize(self.child) {
            Ok(v) => {
                self.table.insert(key.to_string(), v);
                Ok(())
            }
            Err(Error::OmittedNone) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        if let Some(text) = self.datetime {
            return text.parse::<Datetime>().map(Value::Datetime).map_err(|e| Error::target(TargetPath::root(), e));
        }
        Ok(Value::Table(self.table))
    }
}

struct StructVariantSerializer<'a> {
    variant: &'static str,
    table: Table,
    child: ValueSerializer<'a>,
}

impl<'a> SerializeStructVariant for StructVariantSerializer<'a> {
    type Ok = Value;
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Error> {
        match value.serialize(self.child) {
            Ok(v) => {
                self.table.insert(key.to_string(), v);
                Ok(())
            }
            Err(Error::OmittedNone) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn skip_field(&mut self, _key: &'static str) -> Result<(), Error> {
        Ok(())
    }

    fn end(self) -> Result<Value, Error> {
        let mut outer = Table::new();
        outer.insert(self.variant.to_string(), Value::Table(self.table));
        Ok(Value::Table(outer))
    }
}

// --- Canonical text rendering (§4.5 rules 1-10) --------------------------

/// Render `table`'s own entries at `path`: scalars (and anything that isn't
/// a "pure" table/array-of-tables) first as `key = value` lines, then every
/// nested table or array-of-tables as a header block (§4.5 rules 2-3). TOML
/// requires this split — once a `[header]` line is written, bare keys that
/// follow belong to the new header, not the enclosing table — so it applies
/// at every nesting level, not only the document root.
fn write_table_body(out: &mut String, table: &Table, path: &[String], options: &Options, depth: usize) -> Result<(), Error> {
    for (key, value) in table {
        if is_header_form(value) {
            continue;
        }
        out.push_str(&format_key(key));
        out.push_str(" = ");
        write_inline_value(out, value, options, depth)?;
        out.push('\n');
    }

    for (key, value) in table {
        let mut child_path = path.to_vec();
        child_path.push(key.clone());
        match value {
            Value::Table(t) => {
                out.push('\n');
                out.push_str("[");
                out.push_str(&format_path(&child_path));
                out.push_str("]\n");
                write_table_body(out, t, &child_path, options, depth)?;
            }
            Value::Array(items) if is_header_form(value) => {
                for item in items {
                    let element = item.as_table().expect("is_header_form guarantees every element is a table");
                    out.push('\n');
                    out.push_str("[[");
                    out.push_str(&format_path(&child_path));
                    out.push_str("]]\n");
                    write_table_body(out, element, &child_path, options, depth)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// A table, or a non-empty array whose every element is a table, can be
/// rendered with `[path]`/`[[path]]` headers. Anything else (a scalar, an
/// empty array, or an array mixing tables with non-tables) is rendered
/// inline instead, since TOML's header syntax cannot express it.
fn is_header_form(value: &Value) -> bool {
    match value {
        Value::Table(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(|v| matches!(v, Value::Table(_))),
        _ => false,
    }
}

/// Render `value` in the context of a `key = ...` line, an array element, or
/// an inline table entry — i.e. never as a header. A table or
/// array-of-tables reached here (because it's nested inside a non-uniform
/// array, or an array-of-arrays) falls back to inline-table/array syntax,
/// the only form TOML's grammar allows in that position (§4.5 rule 8).
fn write_inline_value(out: &mut String, value: &Value, options: &Options, depth: usize) -> Result<(), Error> {
    match value {
        Value::String(s) => out.push_str(&format_string(s, options.multiline)),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Datetime(dt) => out.push_str(&dt.to_string()),
        Value::Array(items) => {
            if options.arrays_one_per_line && !items.is_empty() {
                let indent = "  ".repeat(depth + 1);
                out.push_str("[\n");
                for item in items {
                    out.push_str(&indent);
                    write_inline_value(out, item, options, depth + 1)?;
                    out.push_str(",\n");
                }
                out.push_str(&"  ".repeat(depth));
                out.push(']');
            } else {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_inline_value(out, item, options, depth)?;
                }
                out.push(']');
            }
        }
        Value::Table(t) => {
            if t.is_empty() {
                out.push_str("{}");
            } else {
                out.push_str("{ ");
                for (i, (k, v)) in t.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&format_key(k));
                    out.push_str(" = ");
                    write_inline_value(out, v, options, depth)?;
                }
                out.push_str(" }");
            }
        }
    }
    Ok(())
}

fn format_path(path: &[String]) -> String {
    path.iter().map(|s| format_key(s)).collect::<Vec<_>>().join(".")
}

/// §4.5 rule 4: bare if it matches the unquoted-key grammar, else
/// literal-quoted if it contains no `'` nor newline, else basic-quoted with
/// escapes applied.
fn format_key(key: &str) -> String {
    if is_bare_key(key) {
        key.to_string()
    } else if !key.contains('\'') && !key.contains('\n') && !key.contains('\r') {
        format!("'{}'", key)
    } else {
        format_basic_quoted(key)
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// §4.5 rule 5 / §9's resolution of the original's undecided multi-line
/// policy: a string containing at least one newline is emitted in
/// multi-line basic form (unless it would itself trigger TOML's
/// immediate-leading-newline trim rule, in which case falling back to an
/// escaped single-line form is the only way to round-trip it exactly);
/// everything else prefers the literal-quoted form and falls back to
/// basic-quoted with escapes only when the content forces it. `force_multiline`
/// (§6 `Serializer::multiline`) widens the first case to every string, not
/// only ones already containing a newline.
fn format_string(s: &str, force_multiline: bool) -> String {
    if (force_multiline || s.contains('\n')) && !s.starts_with('\n') {
        return format_multiline_basic(s);
    }
    if !s.contains('\'') && !s.chars().any(|c| c.is_control()) {
        format!("'{}'", s)
    } else {
        format_basic_quoted(s)
    }
}

/// Render `s` as `"""..."""`. Runs of three or more literal `"` are broken
/// up by escaping one quote, so the body never accidentally contains the
/// closing delimiter; `\r` and other control characters (besides `\t` and
/// the newlines the form exists to carry) are still escaped.
fn format_multiline_basic(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 6);
    out.push_str("\"\"\"");
    let mut quote_run = 0u8;
    for c in s.chars() {
        match c {
            '"' => {
                quote_run += 1;
                if quote_run >= 3 {
                    out.push_str("\\\"");
                    quote_run = 0;
                } else {
                    out.push('"');
                }
            }
            '\\' => {
                out.push_str("\\\\");
                quote_run = 0;
            }
            '\n' | '\t' => {
                out.push(c);
                quote_run = 0;
            }
            '\r' => {
                out.push_str("\\r");
                quote_run = 0;
            }
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04X}", c as u32));
                quote_run = 0;
            }
            c => {
                out.push(c);
                quote_run = 0;
            }
        }
    }
    out.push_str("\"\"\"");
    out
}

fn format_basic_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// §4.5 rule 6: `inf`/`nan` as the grammar literals; finite values round-trip
/// losslessly because Rust's `f64::to_string` already produces the shortest
/// decimal that reads back to the same bit pattern. A trailing `.0` is added
/// when that shortest form has neither a `.` nor an exponent, since TOML's
/// float grammar requires one to distinguish a float from an integer.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf".to_string() } else { "-inf".to_string() };
    }
    let mut s = f.to_string();
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[test]
    fn encodes_simple_document() {
        #[derive(Serialize)]
        struct Owner {
            name: String,
        }
        #[derive(Serialize)]
        struct Doc {
            title: String,
            owner: Owner,
        }
        let doc = Doc { title: "TOML Example".to_string(), owner: Owner { name: "Tom".to_string() } };
        let out = to_string(&doc).unwrap();
        assert_eq!(out, "title = \"TOML Example\"\n\n[owner]\nname = \"Tom\"\n");
    }

    #[test]
    fn encodes_array_of_tables() {
        #[derive(Serialize)]
        struct Product {
            name: String,
        }
        #[derive(Serialize)]
        struct Doc {
            products: Vec<Product>,
        }
        let doc = Doc { products: vec![Product { name: "Hammer".to_string() }, Product { name: "Nail".to_string() }] };
        let out = to_string(&doc).unwrap();
        assert_eq!(out, "\n[[products]]\nname = \"Hammer\"\n\n[[products]]\nname = \"Nail\"\n");
    }

    #[test]
    fn skips_none_fields() {
        #[derive(Serialize)]
        struct Doc {
            a: i64,
            b: Option<i64>,
        }
        let out = to_string(&Doc { a: 1, b: None }).unwrap();
        assert_eq!(out, "a = 1\n");
    }

    #[test]
    fn sorts_map_keys_by_default() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert("zebra".to_string(), 1);
        map.insert("apple".to_string(), 2);
        let out = to_string(&map).unwrap();
        assert_eq!(out, "apple = 2\nzebra = 1\n");
    }

    #[test]
    fn rejects_non_table_top_level() {
        assert!(to_string(&5).is_err());
    }

    #[test]
    fn encodes_datetime() {
        use crate::datetime::Datetime;
        #[derive(Serialize)]
        struct Doc {
            dob: Datetime,
        }
        let dob: Datetime = "1979-05-27T07:32:00Z".parse().unwrap();
        let out = to_string(&Doc { dob }).unwrap();
        assert_eq!(out, "dob = 1979-05-27T07:32:00Z\n");
    }

    #[test]
    fn quotes_keys_that_are_not_bare() {
        assert_eq!(format_key("plain_key"), "plain_key");
        assert_eq!(format_key("has space"), "'has space'");
        assert_eq!(format_key("can't"), "\"can't\"");
    }

    #[test]
    fn emits_multiline_basic_string_for_embedded_newline() {
        assert_eq!(format_string("line one\nline two", false), "\"\"\"line one\nline two\"\"\"");
        // A leading newline would be silently trimmed by a parser reading it
        // back, so that case falls back to an escaped single-line form.
        assert_eq!(format_string("\nstarts with newline", false), "\"\\nstarts with newline\"");
    }

    #[test]
    fn multiline_option_forces_triple_quoting_even_without_newline() {
        assert_eq!(format_string("plain", false), "'plain'");
        assert_eq!(format_string("plain", true), "\"\"\"plain\"\"\"");
    }

    #[test]
    fn inline_arrays_one_per_line_renders_each_element_indented() {
        #[derive(Serialize)]
        struct Doc {
            values: Vec<i64>,
        }
        let options = Options::default().inline_arrays_one_per_line(true);
        let out = to_string_with_options(&Doc { values: vec![1, 2, 3] }, options).unwrap();
        assert_eq!(out, "values = [\n  1,\n  2,\n  3,\n]\n");
    }

    #[test]
    fn preserve_order_keeps_map_insertion_order() {
        use indexmap::IndexMap;
        let mut map = IndexMap::new();
        map.insert("zebra".to_string(), 1);
        map.insert("apple".to_string(), 2);
        let options = Options::default().preserve_order(true);
        let out = to_string_with_options(&map, options).unwrap();
        assert_eq!(out, "zebra = 1\napple = 2\n");
    }

    #[test]
    fn fluent_serializer_builder_applies_options() {
        let out = Serializer::new().preserve_order(true).serialize(&5).unwrap_err();
        assert!(matches!(out, Error::Target { .. }));
    }

    #[test]
    fn formats_float_with_trailing_zero() {
        assert_eq!(format_float(4.0), "4.0");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NAN), "nan");
    }

    #[test]
    fn externally_tags_enum_variants() {
        #[derive(Serialize)]
        enum Shape {
            Circle { radius: f64 },
        }
        #[derive(Serialize)]
        struct Doc {
            shape: Shape,
        }
        let out = to_string(&Doc { shape: Shape::Circle { radius: 2.0 } }).unwrap();
        assert_eq!(out, "\n[shape]\n\n[shape.Circle]\nradius = 2.0\n");
    }
}
