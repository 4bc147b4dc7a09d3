//! Escape-sequence resolution for basic and multi-line basic strings (§4.1).

/// Resolve the escape sequences in the body of a basic string (single-line
/// or multi-line, with multi-line's line-continuation handled by the caller
/// before this function sees the text — see
/// [`crate::scanner::scan_multiline_basic`]).
///
/// `body` must already have had the surrounding quotes stripped, and must
/// not contain raw (un-escaped) newlines unless `allow_newlines` is set.
pub fn unescape_basic(body: &str, allow_newlines: bool) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let escape = chars.next().ok_or_else(|| "unterminated escape sequence".to_string())?;
                match escape {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    'b' => out.push('\u{0008}'),
                    'f' => out.push('\u{000C}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => out.push(read_hex_escape(&mut chars, 4)?),
                    'U' => out.push(read_hex_escape(&mut chars, 8)?),
                    other => return Err(format!("invalid escape sequence `\\{}`", other)),
                }
            }
            '\n' if !allow_newlines => {
                return Err("unescaped newline in single-line string".to_string());
            }
            '\r' => {
                if !allow_newlines || chars.peek() != Some(&'\n') {
                    return Err("bare carriage return is not a valid newline in a string".to_string());
                }
                out.push('\r');
            }
            c if is_disallowed_control(c) => {
                return Err(format!("disallowed control character U+{:04X} in string", c as u32));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

/// A literal string (single- or multi-line) contains no escapes at all;
/// this only validates that it has no disallowed control characters.
pub fn validate_literal(body: &str, allow_newlines: bool) -> Result<(), String> {
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            if !allow_newlines {
                return Err("unescaped newline in single-line literal string".to_string());
            }
            continue;
        }
        if c == '\r' {
            if !allow_newlines || chars.peek() != Some(&'\n') {
                return Err("bare carriage return is not a valid newline in a string".to_string());
            }
            continue;
        }
        if is_disallowed_control(c) {
            return Err(format!("disallowed control character U+{:04X} in string", c as u32));
        }
    }
    Ok(())
}

/// Control characters other than tab and the newline characters themselves
/// are never permitted raw inside a string (§4.1); `\r` is handled by its
/// callers above since it is only ever valid as half of a `\r\n` pair.
fn is_disallowed_control(c: char) -> bool {
    let code = c as u32;
    (code <= 0x1F && c != '\t' && c != '\n') || code == 0x7F
}

fn read_hex_escape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, digits: usize) -> Result<char, String> {
    let mut value: u32 = 0;
    for _ in 0..digits {
        let d = chars
            .next()
            .ok_or_else(|| "unterminated unicode escape".to_string())?;
        let digit = d.to_digit(16).ok_or_else(|| format!("invalid hex digit `{}` in unicode escape", d))?;
        value = value * 16 + digit;
    }
    char::from_u32(value).ok_or_else(|| format!("U+{:04X} is not a valid unicode scalar value", value))
}

/// Resolve escapes and line-continuations in a multi-line basic string body
/// in a single pass.
///
/// A line-continuation (`\` followed only by whitespace up to the next
/// newline, §4.1: "skip LF and all following ws until non-ws") can only
/// start at a `\` that is not itself the second half of an escape pair —
/// running continuation-stripping as a separate pass before
/// [`unescape_basic`] (as an earlier version of this function did) loses
/// that distinction: in `"""a\\<LF>b"""` the *first* backslash escapes the
/// second, so the newline right after is an ordinary unescaped newline, not
/// a continuation. Resolving both in one pass, where an escaped `\\`
/// consumes both characters before the continuation check ever runs again,
/// keeps that straight.
pub fn unescape_multiline_basic(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                // Is this `\` followed (possibly after trailing line
                // whitespace) by a newline? If so it's a continuation, not
                // an escape sequence.
                let mut lookahead = chars.clone();
                let mut only_ws_then_nl = false;
                let mut consumed = 0usize;
                while let Some(&n) = lookahead.peek() {
                    if n == ' ' || n == '\t' {
                        lookahead.next();
                        consumed += 1;
                        continue;
                    }
                    if n == '\n' || n == '\r' {
                        only_ws_then_nl = true;
                    }
                    break;
                }
                if only_ws_then_nl {
                    for _ in 0..consumed {
                        chars.next();
                    }
                    if chars.peek() == Some(&'\r') {
                        chars.next();
                    }
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    while let Some(&n) = chars.peek() {
                        if n == ' ' || n == '\t' || n == '\n' || n == '\r' {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    continue;
                }
                let escape = chars.next().ok_or_else(|| "unterminated escape sequence".to_string())?;
                match escape {
                    '"' => out.push('"'),
                    '\\' => out.push('\\'),
                    'b' => out.push('\u{0008}'),
                    'f' => out.push('\u{000C}'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'u' => out.push(read_hex_escape(&mut chars, 4)?),
                    'U' => out.push(read_hex_escape(&mut chars, 8)?),
                    other => return Err(format!("invalid escape sequence `\\{}`", other)),
                }
            }
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    return Err("bare carriage return is not a valid newline in a string".to_string());
                }
                out.push('\r');
            }
            c if is_disallowed_control(c) => {
                return Err(format!("disallowed control character U+{:04X} in string", c as u32));
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_simple_escapes() {
        assert_eq!(unescape_basic(r#"a\tb\nc"#, false).unwrap(), "a\tb\nc");
    }

    #[test]
    fn resolves_unicode_escapes() {
        assert_eq!(unescape_basic(r"é", false).unwrap(), "\u{00e9}");
        assert_eq!(unescape_basic(r"\U0001F600", false).unwrap(), "\u{1F600}");
    }

    #[test]
    fn rejects_unknown_escape() {
        assert!(unescape_basic(r"\q", false).is_err());
    }

    #[test]
    fn rejects_bare_carriage_return() {
        assert!(unescape_basic("a\rb", false).is_err());
        assert!(unescape_basic("a\rb", true).is_err());
        assert!(validate_literal("a\rb", true).is_err());
    }

    #[test]
    fn allows_crlf_in_multiline_strings() {
        assert_eq!(unescape_basic("a\r\nb", true).unwrap(), "a\r\nb");
        assert!(validate_literal("a\r\nb", true).is_ok());
    }

    #[test]
    fn rejects_control_characters() {
        assert!(unescape_basic("a\u{0001}b", false).is_err());
    }

    #[test]
    fn strips_line_continuation() {
        assert_eq!(unescape_multiline_basic("\\\nTest").unwrap(), "Test");
        assert_eq!(unescape_multiline_basic("A\\\n   B").unwrap(), "AB");
    }

    #[test]
    fn escaped_backslash_before_newline_is_not_a_continuation() {
        // The first `\` escapes the second; the LF that follows is an
        // ordinary unescaped newline, not a line-continuation marker.
        assert_eq!(unescape_multiline_basic("a\\\\\nb").unwrap(), "a\\\nb");
    }

    #[test]
    fn escaped_backslash_then_escape_char_is_not_swallowed() {
        assert_eq!(unescape_multiline_basic("a\\\\nb").unwrap(), "a\\nb");
    }
}
