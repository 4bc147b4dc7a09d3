//! A TOML 1.0 parser, structural validator, and `serde`-based encoder/decoder.
//!
//! The pipeline is the usual compiler-style one: [`scanner`] supplies the
//! lexical primitives, [`parser`] assembles them into a syntax tree
//! ([`ast::Document`]), [`validator`] walks that tree enforcing TOML's
//! table/array-table uniqueness rules and produces an owned [`Value`] tree,
//! and [`de`]/[`ser`] bind that tree to and from a caller's own types via
//! `serde`.
//!
//! Most callers only need the two top-level functions:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct Config {
//!     name: String,
//!     retries: i64,
//! }
//!
//! let doc = "name = \"agent\"\nretries = 3\n";
//! let config: Config = tomlcodec::from_str(doc).unwrap();
//! assert_eq!(config.name, "agent");
//!
//! let rendered = tomlcodec::to_string(&config).unwrap();
//! assert_eq!(rendered, doc);
//! ```
//!
//! Decoding into the dynamic [`Value`] tree works the same way, for callers
//! who don't know a document's shape up front:
//!
//! ```
//! let value: tomlcodec::Value = tomlcodec::from_str("[owner]\nname = \"Tom\"\n").unwrap();
//! let owner = value.as_table().unwrap().get("owner").unwrap();
//! assert_eq!(owner.as_table().unwrap().get("name").unwrap().as_str(), Some("Tom"));
//! ```
//!
//! Strict decoding (reject unmapped keys and untouched fields, §4.3/§4.4) and
//! encoder key-ordering are both available through the `_with_options`
//! variants and their [`de::Options`]/[`ser::Options`] builders:
//!
//! ```
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Doc {
//!     a: i64,
//! }
//!
//! let err = tomlcodec::from_str_with_options::<Doc>(
//!     "a = 1\nb = 2\n",
//!     tomlcodec::de::Options::default().strict(true),
//! )
//! .unwrap_err();
//! assert!(matches!(err, tomlcodec::Error::StrictMissing(_)));
//! ```
//!
//! [`Deserializer`] and [`Serializer`] offer the same options as a fluent
//! builder, for callers who prefer chaining over constructing an `Options`
//! value up front:
//!
//! ```
//! # use serde::Deserialize;
//! # #[derive(Deserialize)]
//! # struct Doc { a: i64 }
//! let err = tomlcodec::Deserializer::new("a = 1\nb = 2\n")
//!     .strict(true)
//!     .deserialize::<Doc>()
//!     .unwrap_err();
//! assert!(matches!(err, tomlcodec::Error::StrictMissing(_)));
//! ```

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::manual_strip)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::non_ascii_literal)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::too_many_lines)]

pub mod ast;
pub mod datetime;
pub mod de;
pub mod error;
mod internals;
mod position;
pub mod scanner;
pub mod parser;
pub mod ser;
pub mod validator;
pub mod value;

pub use datetime::Datetime;
pub use de::{from_str, from_str_with_options, from_value, from_value_with_options, Deserializer};
pub use error::{Error, Result};
pub use ser::{to_string, to_string_with_options, to_value, to_value_with_options, to_vec, Serializer};
pub use value::{Table, Value};

/// Parse and structurally validate `input`, without binding it to a target
/// type. Equivalent to the `scan` + `parse` + `validate` stages of the
/// pipeline with no `de`/`ser` step attached — most callers want
/// [`from_str`] instead.
pub fn parse(input: &str) -> Result<Value> {
    let document = parser::Parser::parse(input)?;
    validator::Validator::build(&document)
}
