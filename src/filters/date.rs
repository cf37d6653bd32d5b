//! `dateFormat` filter: PHP `date()` style formatting.
//!
//! ```text
//! {{ post.published | dateFormat(format="D, d M Y") }}
//! ```
//!
//! The PHP format string is translated into a chrono strftime layout.
//! Tokens chrono has no specifier for (`S`, `z`, `t`, `L`, `B`, `e`, `T`, `I`,
//! `Z`, `p`)
//! are computed from the value and spliced into the layout as literals.
//! A backslash makes the next character literal; any other character that is
//! not a token is copied through.

use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use tera::{Filter, Value};

use crate::constants::DATE_FORMAT_FILTER_NAME;
use crate::error::FilterError;

/// Values a PHP token produces that chrono cannot express directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derived {
    /// `S`: st, nd, rd or th
    OrdinalSuffix,
    /// `z`: day of the year, starting at 0
    DayOfYear,
    /// `t`: days in the month
    DaysInMonth,
    /// `L`: 1 in a leap year, else 0
    LeapYear,
    /// `B`: Swatch Internet time
    SwatchBeat,
    /// `I`: daylight saving flag; fixed offsets never observe DST
    DaylightSaving,
    /// `Z`: offset in seconds
    OffsetSeconds,
    /// `p`: like `P` but `Z` for UTC
    OffsetOrZulu,
    /// `e`, `T`: `UTC` for a zero offset, otherwise `+hh:mm`
    ZoneName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Layout(&'static str),
    Literal(char),
    Derived(Derived),
}

fn translate_token(token: char) -> Option<Piece> {
    let layout = match token {
        // Day
        'd' => "%d",
        'D' => "%a",
        'j' => "%-d",
        'l' => "%A",
        'N' => "%u",
        'w' => "%w",
        'S' => return Some(Piece::Derived(Derived::OrdinalSuffix)),
        'z' => return Some(Piece::Derived(Derived::DayOfYear)),
        // Week
        'W' => "%V",
        // Month
        'F' => "%B",
        'm' => "%m",
        'M' => "%b",
        'n' => "%-m",
        't' => return Some(Piece::Derived(Derived::DaysInMonth)),
        // Year
        'L' => return Some(Piece::Derived(Derived::LeapYear)),
        'o' => "%G",
        'Y' => "%Y",
        'y' => "%y",
        // Time
        'a' => "%P",
        'A' => "%p",
        'B' => return Some(Piece::Derived(Derived::SwatchBeat)),
        'g' => "%-I",
        'G' => "%-H",
        'h' => "%I",
        'H' => "%H",
        'i' => "%M",
        's' => "%S",
        'u' => "%6f",
        'v' => "%3f",
        // Timezone
        'e' | 'T' => return Some(Piece::Derived(Derived::ZoneName)),
        'I' => return Some(Piece::Derived(Derived::DaylightSaving)),
        'O' => "%z",
        'P' => "%:z",
        'p' => return Some(Piece::Derived(Derived::OffsetOrZulu)),
        'Z' => return Some(Piece::Derived(Derived::OffsetSeconds)),
        // Full date/time
        'c' => "%Y-%m-%dT%H:%M:%S%:z",
        'r' => "%a, %d %b %Y %H:%M:%S %z",
        'U' => "%s",
        _ => return None,
    };
    Some(Piece::Layout(layout))
}

/// A parsed PHP date format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpDateFormat {
    pieces: Vec<Piece>,
}

impl PhpDateFormat {
    /// Translate a PHP format string.
    pub fn parse(format: &str) -> Self {
        let mut pieces = Vec::with_capacity(format.len());
        let mut chars = format.chars();

        while let Some(c) = chars.next() {
            if c == '\\' {
                // A trailing backslash has nothing to escape and is kept as-is.
                pieces.push(Piece::Literal(chars.next().unwrap_or('\\')));
                continue;
            }
            pieces.push(translate_token(c).unwrap_or(Piece::Literal(c)));
        }

        Self {
            pieces,
        }
    }

    /// The equivalent strftime layout, when every token has a strftime
    /// specifier. `None` if the format needs values computed per date.
    pub fn strftime(&self) -> Option<String> {
        let mut layout = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Layout(spec) => layout.push_str(spec),
                Piece::Literal(c) => push_literal(&mut layout, *c),
                Piece::Derived(_) => return None,
            }
        }
        Some(layout)
    }

    /// Format a date/time value.
    pub fn format<Tz>(&self, datetime: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut layout = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Layout(spec) => layout.push_str(spec),
                Piece::Literal(c) => push_literal(&mut layout, *c),
                Piece::Derived(derived) => {
                    for c in derive(*derived, datetime).chars() {
                        push_literal(&mut layout, c);
                    }
                }
            }
        }
        datetime.format(&layout).to_string()
    }
}

fn push_literal(layout: &mut String, c: char) {
    if c == '%' {
        layout.push_str("%%");
    } else {
        layout.push(c);
    }
}

fn derive<Tz: TimeZone>(derived: Derived, datetime: &DateTime<Tz>) -> String {
    let offset_seconds = datetime.offset().fix().local_minus_utc();
    match derived {
        Derived::OrdinalSuffix => ordinal_suffix(datetime.day()).to_string(),
        Derived::DayOfYear => datetime.ordinal0().to_string(),
        Derived::DaysInMonth => days_in_month(datetime.year(), datetime.month()).to_string(),
        Derived::LeapYear => {
            let leap = NaiveDate::from_ymd_opt(datetime.year(), 2, 29).is_some();
            u8::from(leap).to_string()
        }
        Derived::SwatchBeat => {
            // Biel Mean Time is UTC+1.
            let utc = datetime.with_timezone(&Utc);
            let seconds = (utc.num_seconds_from_midnight() + 3600) % 86_400;
            format!("{:03}", seconds * 1000 / 86_400)
        }
        Derived::DaylightSaving => "0".to_string(),
        Derived::OffsetSeconds => offset_seconds.to_string(),
        Derived::OffsetOrZulu if offset_seconds == 0 => "Z".to_string(),
        Derived::ZoneName if offset_seconds == 0 => "UTC".to_string(),
        Derived::OffsetOrZulu | Derived::ZoneName => {
            let sign = if offset_seconds < 0 { '-' } else { '+' };
            let minutes = offset_seconds.abs() / 60;
            format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
        }
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// Read a template value as a date/time.
///
/// Accepts RFC 3339 strings, `YYYY-MM-DD HH:MM:SS` (space or `T`, optional
/// fraction, taken as UTC), bare `YYYY-MM-DD` dates (midnight UTC) and
/// integer Unix timestamps.
pub(crate) fn parse_datetime(value: &Value) -> Result<DateTime<FixedOffset>, FilterError> {
    let mismatch = || FilterError::TypeMismatch {
        filter: DATE_FORMAT_FILTER_NAME,
        expected: "a date/time value",
        found: describe(value),
    };

    match value {
        Value::String(s) => {
            if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
                return Ok(datetime);
            }
            for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
                    return Ok(naive.and_utc().fixed_offset());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().fixed_offset())
                .ok_or_else(mismatch)
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|seconds| DateTime::<Utc>::from_timestamp(seconds, 0))
            .map(|datetime| datetime.fixed_offset())
            .ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(n) => format!("the number {n}"),
        Value::String(s) => format!("the string {s:?}"),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// The `dateFormat` filter.
///
/// Takes a required `format` argument holding a PHP date format string.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateFormat;

impl Filter for DateFormat {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let format = match args.get("format") {
            Some(Value::String(format)) => format,
            Some(other) => {
                return Err(FilterError::TypeMismatch {
                    filter: DATE_FORMAT_FILTER_NAME,
                    expected: "a string `format` argument",
                    found: describe(other),
                }
                .into());
            }
            None => {
                return Err(FilterError::MissingArgument {
                    filter: DATE_FORMAT_FILTER_NAME,
                    argument: "format",
                }
                .into());
            }
        };

        let datetime = parse_datetime(value)?;
        Ok(Value::String(PhpDateFormat::parse(format).format(&datetime)))
    }

    fn is_safe(&self) -> bool {
        true
    }
}
