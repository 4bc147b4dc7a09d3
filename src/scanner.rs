//! Byte/char-level lexical recognizers (§4.1).
//!
//! The teacher wrote its lexical layer as `nom` 1.x macros (`method!`,
//! `chain!`, `re_find!`) in `toml.rs`/`internals/util.rs`. `nom` 1.x is long
//! retired; this module is the same family of recognizers rebuilt on `nom`
//! 7's function-combinator API. Each `scan_*` function takes the remaining
//! input and returns the unconsumed remainder plus the recognized slice,
//! exactly as the teacher's macros did — only the combinator style changed.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while, take_while1, take_while_m_n};
use nom::character::complete::{char, one_of};
use nom::combinator::{opt, recognize};
use nom::multi::{many0, many1};
use nom::sequence::{pair, tuple};
use nom::IResult;

/// Horizontal whitespace: space and tab only (TOML never treats other
/// characters as insignificant whitespace).
pub fn scan_whitespace(input: &str) -> IResult<&str, &str> {
    take_while1(|c| c == ' ' || c == '\t')(input)
}

pub fn scan_optional_whitespace(input: &str) -> IResult<&str, &str> {
    take_while(|c| c == ' ' || c == '\t')(input)
}

/// `\r\n` or `\n`. A bare `\r` is never a valid newline on its own.
pub fn scan_newline(input: &str) -> IResult<&str, &str> {
    alt((tag("\r\n"), tag("\n")))(input)
}

/// `#` through end of line, not including the newline itself.
pub fn scan_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('#'), take_while(is_comment_char)))(input)
}

fn is_comment_char(c: char) -> bool {
    c == '\t' || ('\u{20}'..='\u{10FFFF}').contains(&c) && c != '\u{7f}'
}

/// A bare (unquoted) key: one or more of `A-Za-z0-9_-`.
pub fn scan_unquoted_key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-')(input)
}

/// A single-line basic string, quotes included in the returned span; the
/// body (quotes excluded) still needs [`crate::internals::escape::unescape_basic`].
pub fn scan_basic_string(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('"'),
        many0(alt((
            recognize(pair(char('\\'), take_while_m_n(1, 1, |_| true))),
            take_while1(|c| c != '"' && c != '\\' && c != '\n'),
        ))),
        char('"'),
    )))(input)
}

/// A single-line literal string: `'...'`, no escapes at all.
pub fn scan_literal_string(input: &str) -> IResult<&str, &str> {
    recognize(tuple((char('\''), take_while(|c| c != '\'' && c != '\n'), char('\''))))(input)
}

/// A multi-line basic string: `"""..."""`. The closing delimiter is the
/// first `"""` not itself preceded by an unescaped backslash-quote run;
/// a simple greedy-to-next-`"""` search is sufficient because `\"""` only
/// arises from an escaped quote followed by two literal quote characters,
/// which this scanner's caller resolves during unescaping, not here.
pub fn scan_multiline_basic_string(input: &str) -> IResult<&str, &str> {
    let rest = input.strip_prefix("\"\"\"").ok_or_else(|| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
    })?;
    let bytes = rest.as_bytes();
    let mut idx = 0;
    loop {
        if idx + 3 <= bytes.len() && &bytes[idx..idx + 3] == b"\"\"\"" {
            // Allow up to two extra trailing quotes to belong to the body
            // (`""""""` closing after content ending in `""`), per the
            // TOML grammar's "at most five quotes in a row" allowance.
            let mut close_end = idx + 3;
            while close_end < bytes.len() && bytes[close_end] == b'"' && close_end - idx < 5 {
                close_end += 1;
            }
            let consumed = 3 + close_end;
            return Ok((&input[consumed..], &input[..consumed]));
        }
        if idx >= bytes.len() {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)));
        }
        if bytes[idx] == b'\\' {
            idx += 2;
        } else {
            idx += 1;
        }
    }
}

/// A multi-line literal string: `'''...'''`.
pub fn scan_multiline_literal_string(input: &str) -> IResult<&str, &str> {
    let rest = input.strip_prefix("'''").ok_or_else(|| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag))
    })?;
    let bytes = rest.as_bytes();
    let mut idx = 0;
    loop {
        if idx + 3 <= bytes.len() && &bytes[idx..idx + 3] == b"'''" {
            let mut close_end = idx + 3;
            while close_end < bytes.len() && bytes[close_end] == b'\'' && close_end - idx < 5 {
                close_end += 1;
            }
            let consumed = 3 + close_end;
            return Ok((&input[consumed..], &input[..consumed]));
        }
        if idx >= bytes.len() {
            return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Eof)));
        }
        idx += 1;
    }
}

/// `true` or `false`.
pub fn scan_boolean(input: &str) -> IResult<&str, &str> {
    alt((tag("true"), tag("false")))(input)
}

fn digits1(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_digit())(input)
}

fn digit_group(input: &str) -> IResult<&str, &str> {
    recognize(pair(digits1, many0(pair(char('_'), digits1))))(input)
}

/// A date component: `YYYY-MM-DD`.
pub fn scan_date(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        char('-'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        char('-'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
    )))(input)
}

/// A time component: `HH:MM:SS[.fraction]`.
pub fn scan_time(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        char(':'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        char(':'),
        take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while1(|c: char| c.is_ascii_digit()))),
    )))(input)
}

/// A UTC offset: `Z`/`z`, or `+HH:MM`/`-HH:MM`.
pub fn scan_offset(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(one_of("Zz")),
        recognize(tuple((
            one_of("+-"),
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
            char(':'),
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
        ))),
    ))(input)
}

/// The full lexeme for any of the four date/time variants; the caller
/// distinguishes which variant matched by which pieces parsed.
pub fn scan_datetime(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        scan_date,
        opt(tuple((alt((char('T'), char('t'), char(' '))), scan_time, opt(scan_offset)))),
    )))(input)
}

/// A bare time-only literal, `HH:MM:SS[.fraction]`, with no date portion.
pub fn scan_time_only(input: &str) -> IResult<&str, &str> {
    scan_time(input)
}

/// An integer literal: decimal, or `0x`/`0o`/`0b` prefixed.
pub fn scan_integer(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((
            recognize(pair(tag("0x"), many1(alt((take_while_m_n(1, 1, |c: char| c.is_ascii_hexdigit()), tag("_")))))),
            recognize(pair(tag("0o"), many1(alt((take_while_m_n(1, 1, |c: char| ('0'..='7').contains(&c)), tag("_")))))),
            recognize(pair(tag("0b"), many1(alt((take_while_m_n(1, 1, |c: char| c == '0' || c == '1'), tag("_")))))),
            digit_group,
        )),
    )))(input)
}

/// A float literal, including `inf`/`nan` specials.
pub fn scan_float(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(opt(one_of("+-")), alt((tag("inf"), tag("nan"))))),
        recognize(tuple((
            opt(one_of("+-")),
            digit_group,
            alt((
                recognize(tuple((char('.'), digit_group, opt(tuple((one_of("eE"), opt(one_of("+-")), digit_group)))))),
                recognize(tuple((one_of("eE"), opt(one_of("+-")), digit_group))),
            )),
        ))),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_bare_key() {
        assert_eq!(scan_unquoted_key("foo_bar-1 =").unwrap().1, "foo_bar-1");
    }

    #[test]
    fn scans_basic_string_with_escape() {
        let (rest, lex) = scan_basic_string(r#""a\"b" rest"#).unwrap();
        assert_eq!(lex, r#""a\"b""#);
        assert_eq!(rest, " rest");
    }

    #[test]
    fn scans_multiline_basic_string() {
        let (rest, lex) = scan_multiline_basic_string("\"\"\"hi\nthere\"\"\" x").unwrap();
        assert_eq!(lex, "\"\"\"hi\nthere\"\"\"");
        assert_eq!(rest, " x");
    }

    #[test]
    fn scans_datetime_variants() {
        assert_eq!(scan_datetime("1979-05-27T07:32:00Z").unwrap().1, "1979-05-27T07:32:00Z");
        assert_eq!(scan_datetime("1979-05-27").unwrap().1, "1979-05-27");
    }

    #[test]
    fn scans_integer_bases() {
        assert_eq!(scan_integer("0xDEAD_BEEF rest").unwrap().1, "0xDEAD_BEEF");
        assert_eq!(scan_integer("-42").unwrap().1, "-42");
    }

    #[test]
    fn scans_float_literal() {
        assert_eq!(scan_float("5e+22").unwrap().1, "5e+22");
        assert_eq!(scan_float("3.14").unwrap().1, "3.14");
        assert_eq!(scan_float("-inf").unwrap().1, "-inf");
    }
}
