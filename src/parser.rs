//! The grammar-level driver: turns scanner lexemes into an [`ast::Document`] (§4.2).
//!
//! The teacher's grammar (`toml.rs`) is a single `nom` 1.x macro chain that
//! both recognizes and builds its tree in one pass. This parser keeps that
//! same "recognize, then immediately build" discipline but is written as a
//! plain recursive-descent walk over the input, calling out to
//! [`crate::scanner`] for lexeme recognition and [`crate::internals`] for
//! value resolution — `nom`'s combinators are a poor fit for the
//! line/column bookkeeping §4.1 requires, so only the leaf-level scanning
//! uses `nom` directly, same division of labor the teacher drew between
//! `toml.rs` (grammar) and `internals/util.rs` (low-level recognizers).

use log::debug;

use crate::ast::{Document, Key, KeySegment, Literal, Node, NodeKind};
use crate::datetime::{Datetime, Instant, LocalDate, LocalDateTime, LocalTime, Offset};
use crate::error::Error;
use crate::internals::escape::{unescape_basic, unescape_multiline_basic, validate_literal};
use crate::internals::numeric::{parse_float, parse_integer};
use crate::position::{Position, Span};
use crate::scanner;

/// A marker captured at the start of a multi-token construct (a full
/// expression, a dotted key) so its span can be closed off once parsing
/// finishes, without having to replay the consumed text through
/// [`Span::of`].
#[derive(Clone, Copy)]
struct Mark {
    pos: Position,
    byte_offset: usize,
}

pub struct Parser<'a> {
    input: &'a str,
    rest: &'a str,
    pos: Position,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input, rest: input, pos: Position::start() }
    }

    /// Parse a complete document (§4.2's top-level loop).
    pub fn parse(input: &'a str) -> Result<Document, Error> {
        debug!("parsing document of {} bytes", input.len());
        let mut parser = Parser::new(input);
        let mut document = Document::default();
        parser.skip_ws_nl_comments();
        while !parser.rest.is_empty() {
            let expr = parser.parse_expression()?;
            document.expressions.push(expr);
            parser.skip_ws_nl_comments();
        }
        debug!("parsed {} top-level expressions", document.expressions.len());
        Ok(document)
    }

    fn current_span(&self, lexeme: &str, start: Position) -> Span {
        let byte_start = self.byte_offset();
        Span::of(self.input, byte_start, lexeme, start)
    }

    fn byte_offset(&self) -> usize {
        self.input.len() - self.rest.len()
    }

    fn mark(&self) -> Mark {
        Mark { pos: self.pos, byte_offset: self.byte_offset() }
    }

    /// Close the span of a multi-token construct that started at `mark`,
    /// ending at the parser's current position.
    fn span_since(&self, mark: Mark) -> Span {
        Span::new(mark.pos, self.pos, mark.byte_offset, self.byte_offset())
    }

    fn advance(&mut self, lexeme: &str) {
        self.pos.advance(lexeme);
        self.rest = &self.rest[lexeme.len()..];
    }

    fn skip_ws_nl_comments(&mut self) {
        loop {
            if let Ok((rest, ws)) = scanner::scan_whitespace(self.rest) {
                self.pos.advance(ws);
                self.rest = rest;
                continue;
            }
            if let Ok((rest, nl)) = scanner::scan_newline(self.rest) {
                self.pos.advance(nl);
                self.rest = rest;
                continue;
            }
            if let Ok((rest, c)) = scanner::scan_comment(self.rest) {
                self.pos.advance(c);
                self.rest = rest;
                continue;
            }
            break;
        }
    }

    fn skip_inline_ws(&mut self) {
        if let Ok((rest, ws)) = scanner::scan_optional_whitespace(self.rest) {
            self.pos.advance(ws);
            self.rest = rest;
        }
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        let span = Span::point(self.pos, self.byte_offset());
        Error::grammar(span, message)
    }

    fn expect_char(&mut self, c: char) -> Result<(), Error> {
        if self.rest.starts_with(c) {
            self.pos.advance(&self.rest[..c.len_utf8()]);
            self.rest = &self.rest[c.len_utf8()..];
            Ok(())
        } else {
            Err(self.error_here(format!("expected `{}`", c)))
        }
    }

    /// `[key]`, `[[key]]`, or `key = value`.
    fn parse_expression(&mut self) -> Result<Node, Error> {
        let mark = self.mark();
        if self.rest.starts_with("[[") {
            self.advance("[[");
            self.skip_inline_ws();
            let key = self.parse_key()?;
            self.skip_inline_ws();
            if !self.rest.starts_with("]]") {
                return Err(self.error_here("expected `]]` closing array-of-tables header"));
            }
            self.advance("]]");
            self.skip_trailing_line()?;
            let span = self.span_since(mark);
            return Ok(Node::new(NodeKind::ArrayTable { key }, span));
        }
        if self.rest.starts_with('[') {
            self.advance("[");
            self.skip_inline_ws();
            let key = self.parse_key()?;
            self.skip_inline_ws();
            if !self.rest.starts_with(']') {
                return Err(self.error_here("expected `]` closing table header"));
            }
            self.advance("]");
            self.skip_trailing_line()?;
            let span = self.span_since(mark);
            return Ok(Node::new(NodeKind::Table { key }, span));
        }
        let key = self.parse_key()?;
        self.skip_inline_ws();
        self.expect_char('=')?;
        self.skip_inline_ws();
        let value = self.parse_value()?;
        self.skip_trailing_line()?;
        let span = self.span_since(mark);
        Ok(Node::new(NodeKind::KeyValue { key, value: Box::new(value) }, span))
    }

    /// Consumes trailing inline whitespace, an optional comment, and the
    /// line-ending newline (or end of input).
    fn skip_trailing_line(&mut self) -> Result<(), Error> {
        self.skip_inline_ws();
        if let Ok((rest, c)) = scanner::scan_comment(self.rest) {
            self.pos.advance(c);
            self.rest = rest;
        }
        if self.rest.is_empty() {
            return Ok(());
        }
        if let Ok((rest, nl)) = scanner::scan_newline(self.rest) {
            self.pos.advance(nl);
            self.rest = rest;
            return Ok(());
        }
        Err(self.error_here("expected newline or end of input after expression"))
    }

    fn parse_key(&mut self) -> Result<Key, Error> {
        let mark = self.mark();
        let mut segments = vec![self.parse_key_segment()?];
        loop {
            self.skip_inline_ws();
            if self.rest.starts_with('.') {
                self.advance(".");
                self.skip_inline_ws();
                segments.push(self.parse_key_segment()?);
            } else {
                break;
            }
        }
        let span = self.span_since(mark);
        Ok(Key { segments, span })
    }

    fn parse_key_segment(&mut self) -> Result<KeySegment, Error> {
        let start = self.pos;
        if self.rest.starts_with('"') {
            let (rest, lex) = scanner::scan_basic_string(self.rest)
                .map_err(|_| self.error_here("invalid quoted key"))?;
            let body = &lex[1..lex.len() - 1];
            let name = unescape_basic(body, false).map_err(|m| self.error_here(m))?;
            let span = self.current_span(lex, start);
            self.advance_raw(lex, rest);
            return Ok(KeySegment { name, span });
        }
        if self.rest.starts_with('\'') {
            let (rest, lex) = scanner::scan_literal_string(self.rest)
                .map_err(|_| self.error_here("invalid quoted key"))?;
            let name = lex[1..lex.len() - 1].to_string();
            let span = self.current_span(lex, start);
            self.advance_raw(lex, rest);
            return Ok(KeySegment { name, span });
        }
        let (rest, lex) = scanner::scan_unquoted_key(self.rest)
            .map_err(|_| self.error_here("expected a key"))?;
        let span = self.current_span(lex, start);
        self.advance_raw(lex, rest);
        Ok(KeySegment { name: lex.to_string(), span })
    }

    fn advance_raw(&mut self, lexeme: &str, rest: &'a str) {
        self.pos.advance(lexeme);
        self.rest = rest;
    }

    fn parse_value(&mut self) -> Result<Node, Error> {
        let start = self.pos;
        if self.rest.starts_with('"') {
            return self.parse_basic_or_multiline_basic_string(start);
        }
        if self.rest.starts_with('\'') {
            return self.parse_literal_or_multiline_literal_string(start);
        }
        if self.rest.starts_with('[') {
            return self.parse_array(start);
        }
        if self.rest.starts_with('{') {
            return self.parse_inline_table(start);
        }
        if let Ok((_, lex)) = scanner::scan_boolean(self.rest) {
            // Guard against matching a key like `truest`.
            let tail = &self.rest[lex.len()..];
            if tail.chars().next().map(|c| c.is_ascii_alphanumeric() || c == '_').unwrap_or(false) {
                return Err(self.error_here("invalid value"));
            }
            let value = lex == "true";
            let span = self.current_span(lex, start);
            self.advance(lex);
            return Ok(Node::value(Literal::Boolean(value), span));
        }
        self.parse_number_or_datetime(start)
    }

    fn parse_basic_or_multiline_basic_string(&mut self, start: Position) -> Result<Node, Error> {
        if self.rest.starts_with("\"\"\"") {
            let (rest, lex) = scanner::scan_multiline_basic_string(self.rest)
                .map_err(|_| self.error_here("unterminated multi-line basic string"))?;
            let span = self.current_span(lex, start);
            let mut body = lex[3..lex.len() - 3].to_string();
            if body.starts_with('\n') {
                body.remove(0);
            } else if body.starts_with("\r\n") {
                body.remove(0);
                body.remove(0);
            }
            let text = unescape_multiline_basic(&body).map_err(|m| self.error_here(m))?;
            self.advance_raw(lex, rest);
            return Ok(Node::value(Literal::String(text), span));
        }
        let (rest, lex) = scanner::scan_basic_string(self.rest)
            .map_err(|_| self.error_here("unterminated basic string"))?;
        let span = self.current_span(lex, start);
        let body = &lex[1..lex.len() - 1];
        let text = unescape_basic(body, false).map_err(|m| self.error_here(m))?;
        self.advance_raw(lex, rest);
        Ok(Node::value(Literal::String(text), span))
    }

    fn parse_literal_or_multiline_literal_string(&mut self, start: Position) -> Result<Node, Error> {
        if self.rest.starts_with("'''") {
            let (rest, lex) = scanner::scan_multiline_literal_string(self.rest)
                .map_err(|_| self.error_here("unterminated multi-line literal string"))?;
            let span = self.current_span(lex, start);
            let mut body = lex[3..lex.len() - 3].to_string();
            if body.starts_with('\n') {
                body.remove(0);
            } else if body.starts_with("\r\n") {
                body.remove(0);
                body.remove(0);
            }
            validate_literal(&body, true).map_err(|m| self.error_here(m))?;
            self.advance_raw(lex, rest);
            return Ok(Node::value(Literal::String(body), span));
        }
        let (rest, lex) = scanner::scan_literal_string(self.rest)
            .map_err(|_| self.error_here("unterminated literal string"))?;
        let span = self.current_span(lex, start);
        let body = lex[1..lex.len() - 1].to_string();
        validate_literal(&body, false).map_err(|m| self.error_here(m))?;
        self.advance_raw(lex, rest);
        Ok(Node::value(Literal::String(body), span))
    }

    fn parse_array(&mut self, start: Position) -> Result<Node, Error> {
        let mark = Mark { pos: start, byte_offset: self.byte_offset() };
        self.advance("[");
        let mut items = Vec::new();
        loop {
            self.skip_array_ws_and_comments();
            if self.rest.starts_with(']') {
                self.advance("]");
                break;
            }
            let value = self.parse_value()?;
            items.push(value);
            self.skip_array_ws_and_comments();
            if self.rest.starts_with(',') {
                self.advance(",");
                continue;
            }
            self.skip_array_ws_and_comments();
            if self.rest.starts_with(']') {
                self.advance("]");
                break;
            }
            return Err(self.error_here("expected `,` or `]` in array"));
        }
        let span = self.span_since(mark);
        Ok(Node::value(Literal::Array(items), span))
    }

    /// Arrays permit newlines and comments between elements (§4.1), unlike
    /// the single-line-only whitespace rule for keys and inline tables.
    fn skip_array_ws_and_comments(&mut self) {
        self.skip_ws_nl_comments();
    }

    fn parse_inline_table(&mut self, start: Position) -> Result<Node, Error> {
        let mark = Mark { pos: start, byte_offset: self.byte_offset() };
        self.advance("{");
        self.skip_inline_ws();
        let mut entries = Vec::new();
        if self.rest.starts_with('}') {
            self.advance("}");
            let span = self.span_since(mark);
            return Ok(Node::value(Literal::InlineTable(entries), span));
        }
        loop {
            self.skip_inline_ws();
            let key = self.parse_key()?;
            self.skip_inline_ws();
            self.expect_char('=')?;
            self.skip_inline_ws();
            let value = self.parse_value()?;
            entries.push((key, value));
            self.skip_inline_ws();
            if self.rest.starts_with(',') {
                self.advance(",");
                continue;
            }
            break;
        }
        self.skip_inline_ws();
        if !self.rest.starts_with('}') {
            return Err(self.error_here("expected `}` closing inline table"));
        }
        self.advance("}");
        let span = self.span_since(mark);
        Ok(Node::value(Literal::InlineTable(entries), span))
    }

    /// Numbers and date/times share a first character set (`0`-`9`, `+`,
    /// `-`), so this dispatches on which full lexeme the input actually
    /// matches, preferring the longest/most specific recognizer — a
    /// date always wins over an integer because `scan_date` requires the
    /// `YYYY-MM-DD` shape an integer can't produce.
    fn parse_number_or_datetime(&mut self, start: Position) -> Result<Node, Error> {
        if let Ok((_, lex)) = scanner::scan_datetime(self.rest) {
            if lex.len() >= "YYYY-MM-DD".len() && looks_like_date(lex) {
                return self.parse_datetime(start, lex);
            }
        }
        if let Ok((_, lex)) = scanner::scan_time_only(self.rest) {
            if looks_like_time_only(self.rest, lex) {
                return self.parse_time_only(start, lex);
            }
        }
        if let Ok((_, lex)) = scanner::scan_float(self.rest) {
            let int_lex = scanner::scan_integer(self.rest).map(|(_, l)| l).unwrap_or("");
            if lex.len() >= int_lex.len() {
                let value = parse_float(lex).map_err(|m| self.error_here(m))?;
                let span = self.current_span(lex, start);
                self.advance(lex);
                return Ok(Node::value(Literal::Float(value), span));
            }
        }
        if let Ok((_, lex)) = scanner::scan_integer(self.rest) {
            let value = parse_integer(lex).map_err(|m| self.error_here(m))?;
            let span = self.current_span(lex, start);
            self.advance(lex);
            return Ok(Node::value(Literal::Integer(value), span));
        }
        Err(self.error_here("expected a value"))
    }

    fn parse_datetime(&mut self, start: Position, lex: &'a str) -> Result<Node, Error> {
        let date = parse_local_date(&lex[0..10]).map_err(|m| self.error_here(m))?;
        if lex.len() == 10 {
            let span = self.current_span(lex, start);
            self.advance(lex);
            return Ok(Node::value(Literal::Datetime(Datetime::LocalDate(date)), span));
        }
        let time_and_offset = &lex[11..];
        let (time_str, offset_str) = split_time_offset(time_and_offset);
        let time = parse_local_time(time_str).map_err(|m| self.error_here(m))?;
        let date_time = LocalDateTime { date, time };
        let span = self.current_span(lex, start);
        let literal = match offset_str {
            Some(off) => {
                let offset = parse_offset(off).map_err(|m| self.error_here(m))?;
                Literal::Datetime(Datetime::OffsetDateTime(Instant { date_time, offset }))
            }
            None => Literal::Datetime(Datetime::LocalDateTime(date_time)),
        };
        self.advance(lex);
        Ok(Node::value(literal, span))
    }

    fn parse_time_only(&mut self, start: Position, lex: &'a str) -> Result<Node, Error> {
        let time = parse_local_time(lex).map_err(|m| self.error_here(m))?;
        let span = self.current_span(lex, start);
        self.advance(lex);
        Ok(Node::value(Literal::Datetime(Datetime::LocalTime(time)), span))
    }
}

fn looks_like_date(lex: &str) -> bool {
    let bytes = lex.as_bytes();
    bytes.len() >= 10 && bytes[4] == b'-' && bytes[7] == b'-'
}

fn looks_like_time_only(full_rest: &str, lex: &str) -> bool {
    // A bare time is only a bare time if it is not immediately followed by
    // being part of a longer date lexeme (already ruled out by caller order).
    let _ = full_rest;
    lex.len() >= 8
}

fn split_time_offset(s: &str) -> (&str, Option<&str>) {
    if let Some(idx) = s.find(|c| c == 'Z' || c == 'z' || c == '+') {
        return (&s[..idx], Some(&s[idx..]));
    }
    // A `-` offset only counts past the fixed HH:MM:SS[.frac] prefix.
    if s.len() > 8 {
        if let Some(rel) = s[8..].find('-') {
            let idx = 8 + rel;
            return (&s[..idx], Some(&s[idx..]));
        }
    }
    (s, None)
}

fn parse_local_date(s: &str) -> Result<LocalDate, String> {
    let year: u16 = s[0..4].parse().map_err(|_| "invalid year".to_string())?;
    let month: u8 = s[5..7].parse().map_err(|_| "invalid month".to_string())?;
    let day: u8 = s[8..10].parse().map_err(|_| "invalid day".to_string())?;
    LocalDate::new(year, month, day)
}

fn parse_local_time(s: &str) -> Result<LocalTime, String> {
    let hour: u8 = s[0..2].parse().map_err(|_| "invalid hour".to_string())?;
    let minute: u8 = s[3..5].parse().map_err(|_| "invalid minute".to_string())?;
    let second: u8 = s[6..8].parse().map_err(|_| "invalid second".to_string())?;
    let nanosecond = if s.len() > 8 && s.as_bytes()[8] == b'.' {
        LocalTime::parse_fraction(&s[9..])
    } else {
        0
    };
    LocalTime::new(hour, minute, second, nanosecond)
}

fn parse_offset(s: &str) -> Result<Offset, String> {
    if s.eq_ignore_ascii_case("z") {
        return Ok(Offset::Zulu);
    }
    let positive = s.starts_with('+');
    let hours: u8 = s[1..3].parse().map_err(|_| "invalid offset hour".to_string())?;
    let minutes: u8 = s[4..6].parse().map_err(|_| "invalid offset minute".to_string())?;
    Offset::new(positive, hours, minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_keyvals() {
        let doc = Parser::parse("a = 1\nb = \"x\"\n").unwrap();
        assert_eq!(doc.expressions.len(), 2);
    }

    #[test]
    fn parses_table_header() {
        let doc = Parser::parse("[a.b]\nc = true\n").unwrap();
        assert!(matches!(doc.expressions[0].kind, NodeKind::Table { .. }));
    }

    #[test]
    fn parses_array_of_tables() {
        let doc = Parser::parse("[[fruit]]\nname = \"apple\"\n[[fruit]]\nname = \"pear\"\n").unwrap();
        let count = doc.expressions.iter().filter(|n| matches!(n.kind, NodeKind::ArrayTable { .. })).count();
        assert_eq!(count, 2);
    }

    #[test]
    fn parses_inline_table_and_array() {
        let doc = Parser::parse("point = { x = 1, y = 2 }\nlist = [1, 2, 3]\n").unwrap();
        assert_eq!(doc.expressions.len(), 2);
    }

    #[test]
    fn parses_offset_datetime() {
        let doc = Parser::parse("odt = 1979-05-27T07:32:00Z\n").unwrap();
        match &doc.expressions[0].kind {
            NodeKind::KeyValue { value, .. } => match &value.kind {
                NodeKind::Value(Literal::Datetime(Datetime::OffsetDateTime(_))) => {}
                other => panic!("unexpected node: {:?}", other),
            },
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn rejects_trailing_garbage_after_value() {
        assert!(Parser::parse("a = 1 2\n").is_err());
    }
}
