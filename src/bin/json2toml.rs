//! Reads the tagged-JSON form on stdin (the inverse of `toml2json`) and
//! writes a canonical TOML document on stdout.
//!
//! Grounded on the teacher's `tomlkit` binary for the stdin/stdout/
//! `env_logger::init()` shape.

use std::io::{self, Read, Write};
use std::process::ExitCode;

use tomlcodec::Value;

fn from_tagged_json(json: &serde_json::Value) -> Result<Value, String> {
    match json {
        serde_json::Value::Array(items) => {
            items.iter().map(from_tagged_json).collect::<Result<Vec<_>, _>>().map(Value::Array)
        }
        serde_json::Value::Object(obj) => {
            if obj.len() == 2 {
                if let (Some(serde_json::Value::String(kind)), Some(serde_json::Value::String(text))) =
                    (obj.get("type"), obj.get("value"))
                {
                    return leaf_from_kind(kind, text);
                }
            }
            let mut table = tomlcodec::Table::new();
            for (k, v) in obj {
                table.insert(k.clone(), from_tagged_json(v)?);
            }
            Ok(Value::Table(table))
        }
        other => Err(format!("expected a tagged leaf, array, or table, found {}", other)),
    }
}

fn leaf_from_kind(kind: &str, text: &str) -> Result<Value, String> {
    match kind {
        "string" => Ok(Value::String(text.to_string())),
        "integer" => text.parse::<i64>().map(Value::Integer).map_err(|e| e.to_string()),
        "float" => match text {
            "nan" => Ok(Value::Float(f64::NAN)),
            "inf" => Ok(Value::Float(f64::INFINITY)),
            "-inf" => Ok(Value::Float(f64::NEG_INFINITY)),
            _ => text.parse::<f64>().map(Value::Float).map_err(|e| e.to_string()),
        },
        "boolean" => text.parse::<bool>().map(Value::Boolean).map_err(|e| e.to_string()),
        "datetime" | "datetime-local" | "date-local" | "time-local" => {
            text.parse::<tomlcodec::Datetime>().map(Value::Datetime).map_err(|e| e.to_string())
        }
        other => Err(format!("unrecognized tagged leaf type `{}`", other)),
    }
}

fn main() -> ExitCode {
    let _ = env_logger::init();

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("json2toml: failed to read stdin: {}", e);
        return ExitCode::from(2);
    }

    let json: serde_json::Value = match serde_json::from_str(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("json2toml: {}", e);
            return ExitCode::from(1);
        }
    };

    let value = match from_tagged_json(&json) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("json2toml: {}", e);
            return ExitCode::from(1);
        }
    };

    let rendered = match tomlcodec::to_string(&value) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("json2toml: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = io::stdout().write_all(rendered.as_bytes()) {
        eprintln!("json2toml: failed to write stdout: {}", e);
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
