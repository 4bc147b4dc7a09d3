//! Reads a TOML document on stdin and writes its tagged-JSON form on
//! stdout: every leaf becomes `{"type": <kind>, "value": <string>}`,
//! arrays recurse as plain JSON arrays, and tables become plain JSON
//! objects. This is the language-agnostic boundary format the
//! compliance suite trades in.
//!
//! Grounded on the teacher's `tomlkit` binary for the stdin/stdout/
//! `env_logger::init()` shape; the tagged-leaf convention follows §6's
//! description of the compliance boundary. Built on `serde_json` for
//! the output encoding.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use tomlcodec::{Datetime, Value};

fn leaf(kind: &str, value: String) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert("type".to_string(), serde_json::Value::String(kind.to_string()));
    obj.insert("value".to_string(), serde_json::Value::String(value));
    serde_json::Value::Object(obj)
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "inf".to_string() } else { "-inf".to_string() }
    } else {
        f.to_string()
    }
}

fn to_tagged_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => leaf("string", s.clone()),
        Value::Integer(i) => leaf("integer", i.to_string()),
        Value::Float(f) => leaf("float", format_float(*f)),
        Value::Boolean(b) => leaf("boolean", b.to_string()),
        Value::Datetime(dt) => {
            let kind = match dt {
                Datetime::OffsetDateTime(_) => "datetime",
                Datetime::LocalDateTime(_) => "datetime-local",
                Datetime::LocalDate(_) => "date-local",
                Datetime::LocalTime(_) => "time-local",
            };
            leaf(kind, dt.to_string())
        }
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_tagged_json).collect()),
        Value::Table(table) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in table {
                obj.insert(k.clone(), to_tagged_json(v));
            }
            serde_json::Value::Object(obj)
        }
    }
}

fn main() -> ExitCode {
    let _ = env_logger::init();

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("toml2json: failed to read stdin: {}", e);
        return ExitCode::from(2);
    }

    let value = match tomlcodec::parse(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("toml2json: {}", e.render(&input));
            return ExitCode::from(1);
        }
    };

    let json = to_tagged_json(&value);
    let rendered = match serde_json::to_string_pretty(&json) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("toml2json: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = writeln!(io::stdout(), "{}", rendered) {
        eprintln!("toml2json: failed to write stdout: {}", e);
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
