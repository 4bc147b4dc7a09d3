//! Reads a TOML document on stdin and writes it back out canonicalized
//! (sorted keys, normalized string/float/datetime forms) on stdout.
//!
//! Grounded on the teacher's `tomlkit` binary: `env_logger::init()` up
//! front, stdin/stdout as the whole interface, non-zero exit on failure.

use std::io::{self, Read, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let _ = env_logger::init();

    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("tomlfmt: failed to read stdin: {}", e);
        return ExitCode::from(2);
    }

    let value = match tomlcodec::parse(&input) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("tomlfmt: {}", e.render(&input));
            return ExitCode::from(1);
        }
    };

    let rendered = match tomlcodec::to_string(&value) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("tomlfmt: {}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = io::stdout().write_all(rendered.as_bytes()) {
        eprintln!("tomlfmt: failed to write stdout: {}", e);
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
