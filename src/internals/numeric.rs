//! Underscore-stripping and base-aware integer/float parsing (§4.1).
//!
//! The teacher keeps `Value::Integer`/`Value::Float` as `Cow<str>` and
//! re-validates them lazily with its own `nom` grammar (`types.rs::validate`).
//! This codec materializes values eagerly during parsing, so the underscore
//! rules are enforced once, here, rather than re-derived at every `validate()`
//! call site.

/// Validate and strip `_` digit-group separators from a numeric literal's
/// digit run. `_` may not be leading, trailing, or doubled, and must be
/// directly between two digits of the given `radix`.
pub fn strip_underscores(digits: &str, radix: u32) -> Result<String, String> {
    if digits.is_empty() {
        return Err("empty digit run".to_string());
    }
    let chars: Vec<char> = digits.chars().collect();
    if chars.first() == Some(&'_') || chars.last() == Some(&'_') {
        return Err("underscore may not lead or trail a digit run".to_string());
    }
    let mut out = String::with_capacity(digits.len());
    let mut prev_was_underscore = false;
    for &c in &chars {
        if c == '_' {
            if prev_was_underscore {
                return Err("doubled underscore in digit run".to_string());
            }
            prev_was_underscore = true;
            continue;
        }
        if c.to_digit(radix).is_none() {
            return Err(format!("`{}` is not a valid base-{} digit", c, radix));
        }
        prev_was_underscore = false;
        out.push(c);
    }
    Ok(out)
}

/// Parse a TOML integer literal (`1_000_000`, `0xDEADBEEF`, `0o17`,
/// `0b101`, `-42`, `+7`) into an `i64`.
pub fn parse_integer(lexeme: &str) -> Result<i64, String> {
    let (sign, rest) = match lexeme.as_bytes().first() {
        Some(b'-') => (-1i64, &lexeme[1..]),
        Some(b'+') => (1i64, &lexeme[1..]),
        _ => (1i64, lexeme),
    };

    if let Some(hex) = rest.strip_prefix("0x") {
        let digits = strip_underscores(hex, 16)?;
        return i64::from_str_radix(&digits, 16)
            .map(|v| v * sign)
            .map_err(|e| e.to_string());
    }
    if let Some(oct) = rest.strip_prefix("0o") {
        let digits = strip_underscores(oct, 8)?;
        return i64::from_str_radix(&digits, 8)
            .map(|v| v * sign)
            .map_err(|e| e.to_string());
    }
    if let Some(bin) = rest.strip_prefix("0b") {
        let digits = strip_underscores(bin, 2)?;
        return i64::from_str_radix(&digits, 2)
            .map(|v| v * sign)
            .map_err(|e| e.to_string());
    }
    if rest.len() > 1 && rest.starts_with('0') {
        return Err("leading zeros are not permitted in decimal integers".to_string());
    }
    let digits = strip_underscores(rest, 10)?;
    digits.parse::<i64>().map(|v| v * sign).map_err(|e| e.to_string())
}

/// Parse a TOML float literal, including `inf`/`-inf`/`+inf`/`nan`/`-nan`/`+nan`.
pub fn parse_float(lexeme: &str) -> Result<f64, String> {
    match lexeme {
        "inf" | "+inf" => return Ok(f64::INFINITY),
        "-inf" => return Ok(f64::NEG_INFINITY),
        "nan" | "+nan" => return Ok(f64::NAN),
        "-nan" => return Ok(-f64::NAN),
        _ => {}
    }
    let (sign, rest) = match lexeme.as_bytes().first() {
        Some(b'-') => ("-", &lexeme[1..]),
        Some(b'+') => ("", &lexeme[1..]),
        _ => ("", lexeme),
    };
    let mut cleaned = String::with_capacity(lexeme.len());
    cleaned.push_str(sign);
    let mut saw_digit_group = false;
    for part in split_float_parts(rest)? {
        match part {
            FloatPart::Digits(d) => {
                cleaned.push_str(&strip_underscores(d, 10)?);
                saw_digit_group = true;
            }
            FloatPart::Literal(l) => cleaned.push_str(l),
        }
    }
    if !saw_digit_group {
        return Err("float literal has no digits".to_string());
    }
    cleaned.parse::<f64>().map_err(|e| e.to_string())
}

enum FloatPart<'a> {
    Digits(&'a str),
    Literal(&'a str),
}

fn split_float_parts(rest: &str) -> Result<Vec<FloatPart<'_>>, String> {
    let mut parts = Vec::new();
    let bytes = rest.as_bytes();
    let mut i = 0;
    let digit_run = |from: usize| -> usize {
        let mut j = from;
        while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b'_') {
            j += 1;
        }
        j
    };
    let start = i;
    i = digit_run(i);
    if i == start {
        return Err("float literal must start with digits".to_string());
    }
    let int_part = &rest[start..i];
    if int_part.len() > 1 && int_part.as_bytes()[0] == b'0' {
        return Err("leading zeros are not permitted in the integer part of a float".to_string());
    }
    parts.push(FloatPart::Digits(int_part));

    if i < bytes.len() && bytes[i] == b'.' {
        parts.push(FloatPart::Literal("."));
        i += 1;
        let start = i;
        i = digit_run(i);
        if i == start {
            return Err("fractional part must have at least one digit".to_string());
        }
        parts.push(FloatPart::Digits(&rest[start..i]));
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        parts.push(FloatPart::Literal(&rest[i..i + 1]));
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            parts.push(FloatPart::Literal(&rest[i..i + 1]));
            i += 1;
        }
        let start = i;
        i = digit_run(i);
        if i == start {
            return Err("exponent must have at least one digit".to_string());
        }
        parts.push(FloatPart::Digits(&rest[start..i]));
    }

    if i != bytes.len() {
        return Err(format!("unexpected trailing characters `{}` in float literal", &rest[i..]));
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bases() {
        assert_eq!(parse_integer("0xDEADBEEF").unwrap(), 3735928559);
        assert_eq!(parse_integer("0o17").unwrap(), 15);
        assert_eq!(parse_integer("0b101").unwrap(), 5);
        assert_eq!(parse_integer("1_000_000").unwrap(), 1_000_000);
        assert_eq!(parse_integer("-42").unwrap(), -42);
    }

    #[test]
    fn rejects_malformed_underscores() {
        assert!(parse_integer("_1").is_err());
        assert!(parse_integer("1_").is_err());
        assert!(parse_integer("1__2").is_err());
    }

    #[test]
    fn rejects_leading_zero_in_float_integer_part() {
        assert!(parse_float("01.5").is_err());
        assert!(parse_float("00e10").is_err());
        assert!(parse_float("0.5").is_ok());
        assert!(parse_float("0e10").is_ok());
    }

    #[test]
    fn parses_floats() {
        assert_eq!(parse_float("3.14").unwrap(), 3.14);
        assert_eq!(parse_float("5e+22").unwrap(), 5e22);
        assert_eq!(parse_float("1_000.5").unwrap(), 1000.5);
        assert!(parse_float("inf").unwrap().is_infinite());
        assert!(parse_float("-nan").unwrap().is_nan());
    }
}
