//! The four date/time variants (§3, Glossary).
//!
//! The teacher represents dates and times as `Cow<str>`-backed `Date`/`Time`/
//! `DateTime`/`TimeOffset`/`TimeOffsetAmount` structs (`types.rs`), each with
//! its own hand-written `validate()`. This module keeps that same family of
//! types — a local date, a local time, and an offset wrapping a local
//! date-time — but stores validated numeric fields instead of re-parsing
//! strings on every comparison, and folds the four document-level variants
//! (local date, local time, local date-time, offset date-time) into one
//! `Datetime` enum matching §3's "four date/time variants" directly.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl LocalDate {
    pub fn new(year: u16, month: u8, day: u8) -> Result<Self, String> {
        if !(1..=12).contains(&month) {
            return Err(format!("month {} is out of range 1..=12", month));
        }
        let max_day = days_in_month(year, month);
        if day == 0 || day > max_day {
            return Err(format!("day {} is out of range 1..={} for {}-{:02}", day, max_day, year, month));
        }
        Ok(LocalDate { year, month, day })
    }
}

fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

impl fmt::Display for LocalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// `HH:MM:SS[.fraction]`, with fractional-second precision capped at
/// nanoseconds (§4.1's "reasonable precision cap").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Nanoseconds past `second`, 0..=999_999_999. Digits beyond the ninth
    /// in the source literal are truncated, not rounded (§9).
    pub nanosecond: u32,
}

impl LocalTime {
    pub fn new(hour: u8, minute: u8, second: u8, nanosecond: u32) -> Result<Self, String> {
        if hour > 23 {
            return Err(format!("hour {} is out of range 0..=23", hour));
        }
        if minute > 59 {
            return Err(format!("minute {} is out of range 0..=59", minute));
        }
        // Leap seconds (second == 60) are accepted by the RFC 3339 grammar
        // TOML reuses, but not otherwise validated.
        if second > 60 {
            return Err(format!("second {} is out of range 0..=60", second));
        }
        if nanosecond > 999_999_999 {
            return Err("nanosecond must be < 1_000_000_000".to_string());
        }
        Ok(LocalTime { hour, minute, second, nanosecond })
    }

    /// Parse a `.`-prefixed fractional-seconds literal (the digits after the
    /// dot, without the dot itself), truncating past nine digits.
    pub fn parse_fraction(digits: &str) -> u32 {
        let truncated = if digits.len() > 9 { &digits[..9] } else { digits };
        let padded = format!("{:0<9}", truncated);
        padded.parse::<u32>().unwrap_or(0)
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)?;
        if self.nanosecond != 0 {
            let mut frac = format!("{:09}", self.nanosecond);
            while frac.ends_with('0') {
                frac.pop();
            }
            write!(f, ".{}", frac)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalDateTime {
    pub date: LocalDate,
    pub time: LocalTime,
}

impl fmt::Display for LocalDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}

/// Offset from UTC: either Zulu (`Z`) or a signed `HH:MM` amount, mirroring
/// the teacher's `TimeOffset`/`TimeOffsetAmount` split (`types.rs`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Offset {
    Zulu,
    HoursMinutes { positive: bool, hours: u8, minutes: u8 },
}

impl Offset {
    pub fn new(positive: bool, hours: u8, minutes: u8) -> Result<Self, String> {
        if hours > 23 {
            return Err(format!("offset hour {} is out of range 0..=23", hours));
        }
        if minutes > 59 {
            return Err(format!("offset minute {} is out of range 0..=59", minutes));
        }
        Ok(Offset::HoursMinutes { positive, hours, minutes })
    }

    /// Total offset in minutes, positive east of UTC.
    pub fn total_minutes(&self) -> i32 {
        match self {
            Offset::Zulu => 0,
            Offset::HoursMinutes { positive, hours, minutes } => {
                let total = *hours as i32 * 60 + *minutes as i32;
                if *positive {
                    total
                } else {
                    -total
                }
            }
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Zulu => write!(f, "Z"),
            Offset::HoursMinutes { positive, hours, minutes } => {
                write!(f, "{}{:02}:{:02}", if *positive { '+' } else { '-' }, hours, minutes)
            }
        }
    }
}

/// An offset-tagged instant: a local date-time plus its UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    pub date_time: LocalDateTime,
    pub offset: Offset,
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.date_time, self.offset)
    }
}

/// The document-level sum of the four date/time variants (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Datetime {
    OffsetDateTime(Instant),
    LocalDateTime(LocalDateTime),
    LocalDate(LocalDate),
    LocalTime(LocalTime),
}

impl fmt::Display for Datetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datetime::OffsetDateTime(v) => write!(f, "{}", v),
            Datetime::LocalDateTime(v) => write!(f, "{}", v),
            Datetime::LocalDate(v) => write!(f, "{}", v),
            Datetime::LocalTime(v) => write!(f, "{}", v),
        }
    }
}

impl FromStr for LocalDate {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        parse_date(s)
    }
}

impl FromStr for LocalTime {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        parse_time(s)
    }
}

impl FromStr for LocalDateTime {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        if s.len() < 11 || !matches!(s.as_bytes().get(10), Some(b'T') | Some(b't') | Some(b' ')) {
            return Err(format!("`{}` is not a local date-time", s));
        }
        let date = parse_date(&s[..10])?;
        let time = parse_time(&s[11..])?;
        Ok(LocalDateTime { date, time })
    }
}

impl FromStr for Instant {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        let (body, offset) = split_offset(s).ok_or_else(|| format!("`{}` has no UTC offset", s))?;
        let date_time: LocalDateTime = body.parse()?;
        Ok(Instant { date_time, offset: parse_offset(offset)? })
    }
}

/// Parse any of the four canonical forms this module's own [`fmt::Display`]
/// impls produce — used to round-trip a `Datetime` through the hidden
/// string field the `serde` marker-struct convention below ferries it in.
impl FromStr for Datetime {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String> {
        let looks_like_date = s.len() >= 10 && s.as_bytes().get(4) == Some(&b'-') && s.as_bytes().get(7) == Some(&b'-');
        if !looks_like_date {
            return Ok(Datetime::LocalTime(parse_time(s)?));
        }
        if s.len() == 10 {
            return Ok(Datetime::LocalDate(parse_date(s)?));
        }
        if split_offset(s).is_some() {
            return Ok(Datetime::OffsetDateTime(s.parse()?));
        }
        Ok(Datetime::LocalDateTime(s.parse()?))
    }
}

fn parse_date(s: &str) -> Result<LocalDate, String> {
    if s.len() != 10 || s.as_bytes()[4] != b'-' || s.as_bytes()[7] != b'-' {
        return Err(format!("`{}` is not a local date", s));
    }
    let year: u16 = s[0..4].parse().map_err(|_| "invalid year".to_string())?;
    let month: u8 = s[5..7].parse().map_err(|_| "invalid month".to_string())?;
    let day: u8 = s[8..10].parse().map_err(|_| "invalid day".to_string())?;
    LocalDate::new(year, month, day)
}

fn parse_time(s: &str) -> Result<LocalTime, String> {
    if s.len() < 8 || s.as_bytes()[2] != b':' || s.as_bytes()[5] != b':' {
        return Err(format!("`{}` is not a local time", s));
    }
    let hour: u8 = s[0..2].parse().map_err(|_| "invalid hour".to_string())?;
    let minute: u8 = s[3..5].parse().map_err(|_| "invalid minute".to_string())?;
    let second: u8 = s[6..8].parse().map_err(|_| "invalid second".to_string())?;
    let nanosecond = if s.len() > 8 {
        if s.as_bytes()[8] != b'.' {
            return Err(format!("`{}` has trailing characters after seconds", s));
        }
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
    let bytes = s.as_bytes();
    if s.len() != 6 || (bytes[0] != b'+' && bytes[0] != b'-') || bytes[3] != b':' {
        return Err(format!("`{}` is not a UTC offset", s));
    }
    let positive = bytes[0] == b'+';
    let hours: u8 = s[1..3].parse().map_err(|_| "invalid offset hour".to_string())?;
    let minutes: u8 = s[4..6].parse().map_err(|_| "invalid offset minute".to_string())?;
    Offset::new(positive, hours, minutes)
}

/// Split a `local-date-time` string into its body and trailing offset, if
/// any (`Z`/`z` or a signed `HH:MM`, which can only start at or past index
/// 19, after the fixed-width date-time prefix).
fn split_offset(s: &str) -> Option<(&str, &str)> {
    if s.len() < 19 {
        return None;
    }
    if s.ends_with('Z') || s.ends_with('z') {
        return Some((&s[..s.len() - 1], &s[s.len() - 1..]));
    }
    if s.len() >= 25 {
        let idx = s.len() - 6;
        let c = s.as_bytes()[idx];
        if c == b'+' || c == b'-' {
            return Some((&s[..idx], &s[idx..]));
        }
    }
    None
}

/// The private struct/field name real-world TOML serde integrations (the
/// `toml`/`toml_edit` lineage this crate's `Datetime` descends from, per
/// `examples/other_examples/a267bc1a_toml-rs-toml-rs__src-lib.rs.rs`) use to
/// smuggle a non-map value through `serde`'s struct hooks: the `Serializer`
/// in [`crate::ser`] and the `Deserializer` in [`crate::de`] both recognize
/// this exact name and short-circuit to/from [`Value::Datetime`][crate::value::Value::Datetime]
/// instead of emitting/expecting an actual one-field struct.
pub const MARKER_NAME: &str = "$__toml_private_datetime";
pub(crate) const MARKER_FIELD: &str = "$__toml_private_datetime";

impl Serialize for Datetime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct(MARKER_NAME, 1)?;
        s.serialize_field(MARKER_FIELD, &self.to_string())?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Datetime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DatetimeVisitor;

        impl<'de> Visitor<'de> for DatetimeVisitor {
            type Value = Datetime;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a TOML datetime")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Datetime, A::Error> {
                let value: DatetimeFromString = map
                    .next_value()
                    .map_err(|_| de::Error::custom("datetime field is missing"))?;
                Ok(value.value)
            }
        }

        const FIELDS: [&str; 1] = [MARKER_FIELD];
        deserializer.deserialize_struct(MARKER_NAME, &FIELDS, DatetimeVisitor)
    }
}

struct DatetimeFromString {
    value: Datetime,
}

impl<'de> Deserialize<'de> for DatetimeFromString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;
        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = DatetimeFromString;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a TOML datetime string")
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<DatetimeFromString, E> {
                s.parse::<Datetime>().map(|value| DatetimeFromString { value }).map_err(de::Error::custom)
            }
        }
        deserializer.deserialize_str(FieldVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_dates() {
        assert!(LocalDate::new(2021, 2, 29).is_err());
        assert!(LocalDate::new(2020, 2, 29).is_ok());
        assert!(LocalDate::new(2021, 13, 1).is_err());
    }

    #[test]
    fn rejects_invalid_times() {
        assert!(LocalTime::new(24, 0, 0, 0).is_err());
        assert!(LocalTime::new(23, 60, 0, 0).is_err());
    }

    #[test]
    fn truncates_fraction_past_nanos() {
        assert_eq!(LocalTime::parse_fraction("123456789999"), 123_456_789);
    }

    #[test]
    fn displays_rfc3339() {
        let instant = Instant {
            date_time: LocalDateTime {
                date: LocalDate::new(1979, 5, 27).unwrap(),
                time: LocalTime::new(7, 32, 0, 0).unwrap(),
            },
            offset: Offset::Zulu,
        };
        assert_eq!(instant.to_string(), "1979-05-27T07:32:00Z");
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        let cases = ["1979-05-27", "07:32:00.999999", "1979-05-27T07:32:00", "1979-05-27T00:32:00-07:00"];
        for case in cases {
            let dt: Datetime = case.parse().unwrap();
            assert_eq!(dt.to_string(), case);
        }
    }
}
