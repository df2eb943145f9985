//! Partial dates and date-times as FHIR writes them.
//!
//! FHIR allows `date` values of year, year-month or day precision and
//! `dateTime` values additionally with a time and optional offset. Values keep
//! their precision and their written offset so that `2020-01-01T10:00:00+01:00`
//! and `2020-01-01T09:00:00Z` stay distinct values.

use crate::error::{Error, Result};
use crate::hash::{HashSink, SCALAR_DATE, SCALAR_LOCAL_DATE_TIME, SCALAR_OFFSET_DATE_TIME,
    SCALAR_YEAR, SCALAR_YEAR_MONTH};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateValue {
    Year(i32),
    YearMonth(i32, u32),
    Date(NaiveDate),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DateTimeValue {
    Year(i32),
    YearMonth(i32, u32),
    Date(NaiveDate),
    /// Date and time without an offset.
    Local(NaiveDateTime),
    /// Local date and time with the offset in seconds east of UTC.
    Offset(NaiveDateTime, i32),
}

impl DateValue {
    pub(crate) fn hash_into(&self, sink: &mut dyn HashSink) {
        match *self {
            DateValue::Year(year) => hash_year(sink, year),
            DateValue::YearMonth(year, month) => hash_year_month(sink, year, month),
            DateValue::Date(date) => hash_date(sink, date),
        }
    }
}

impl DateTimeValue {
    pub(crate) fn hash_into(&self, sink: &mut dyn HashSink) {
        match *self {
            DateTimeValue::Year(year) => hash_year(sink, year),
            DateTimeValue::YearMonth(year, month) => hash_year_month(sink, year, month),
            DateTimeValue::Date(date) => hash_date(sink, date),
            DateTimeValue::Local(dt) => {
                sink.put_byte(SCALAR_LOCAL_DATE_TIME);
                hash_date_time_fields(sink, dt);
            }
            DateTimeValue::Offset(dt, offset) => {
                sink.put_byte(SCALAR_OFFSET_DATE_TIME);
                hash_date_time_fields(sink, dt);
                sink.put_i32(offset);
            }
        }
    }
}

fn hash_year(sink: &mut dyn HashSink, year: i32) {
    sink.put_byte(SCALAR_YEAR);
    sink.put_i32(year);
}

fn hash_year_month(sink: &mut dyn HashSink, year: i32, month: u32) {
    sink.put_byte(SCALAR_YEAR_MONTH);
    sink.put_i32(year);
    sink.put_i32(month as i32);
}

fn hash_date(sink: &mut dyn HashSink, date: NaiveDate) {
    sink.put_byte(SCALAR_DATE);
    sink.put_i32(date.year());
    sink.put_i32(date.month() as i32);
    sink.put_i32(date.day() as i32);
}

fn hash_date_time_fields(sink: &mut dyn HashSink, dt: NaiveDateTime) {
    sink.put_i32(dt.year());
    sink.put_i32(dt.month() as i32);
    sink.put_i32(dt.day() as i32);
    sink.put_i32(dt.hour() as i32);
    sink.put_i32(dt.minute() as i32);
    sink.put_i32(dt.second() as i32);
    sink.put_i32(dt.nanosecond() as i32);
}

impl From<DateValue> for DateTimeValue {
    fn from(value: DateValue) -> Self {
        match value {
            DateValue::Year(year) => DateTimeValue::Year(year),
            DateValue::YearMonth(year, month) => DateTimeValue::YearMonth(year, month),
            DateValue::Date(date) => DateTimeValue::Date(date),
        }
    }
}

impl FromStr for DateValue {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        parse_date(input).ok_or_else(|| Error::validation("date", format!("`{input}`")))
    }
}

impl FromStr for DateTimeValue {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        parse_date_time(input).ok_or_else(|| Error::validation("dateTime", format!("`{input}`")))
    }
}

fn parse_date(input: &str) -> Option<DateValue> {
    let s = input.trim();
    match s.len() {
        4 => {
            let date = NaiveDate::parse_from_str(&format!("{}-01-01", s), "%Y-%m-%d").ok()?;
            Some(DateValue::Year(date.year()))
        }
        7 => {
            let date = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()?;
            Some(DateValue::YearMonth(date.year(), date.month()))
        }
        10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(DateValue::Date),
        _ => None,
    }
}

fn parse_date_time(input: &str) -> Option<DateTimeValue> {
    let raw = input.trim();

    let Some((date_part, rest)) = raw.split_once('T') else {
        return Some(match parse_date(raw)? {
            DateValue::Year(y) => DateTimeValue::Year(y),
            DateValue::YearMonth(y, m) => DateTimeValue::YearMonth(y, m),
            DateValue::Date(d) => DateTimeValue::Date(d),
        });
    };

    let DateValue::Date(date) = parse_date(date_part)? else {
        return None;
    };
    let (time_part, offset) = parse_offset(rest)?;
    let local = NaiveDateTime::new(date, parse_time(time_part)?);

    Some(match offset {
        Some(secs) => DateTimeValue::Offset(local, secs),
        None => DateTimeValue::Local(local),
    })
}

fn parse_offset(rest: &str) -> Option<(&str, Option<i32>)> {
    if let Some(stripped) = rest.strip_suffix('Z') {
        return Some((stripped, Some(0)));
    }

    if let Some(pos) = rest.rfind(['+', '-']) {
        let (time, tz) = rest.split_at(pos);
        if tz.len() != 6 || !tz.is_ascii() || tz.as_bytes()[3] != b':' {
            return None;
        }
        let sign = if tz.starts_with('-') { -1 } else { 1 };
        let hours: i32 = tz[1..3].parse().ok()?;
        let minutes: i32 = tz[4..6].parse().ok()?;
        if hours > 14 || minutes > 59 {
            return None;
        }
        return Some((time, Some(sign * (hours * 3600 + minutes * 60))));
    }

    Some((rest, None))
}

fn parse_time(time_part: &str) -> Option<NaiveTime> {
    let (main, frac) = match time_part.split_once('.') {
        Some((main, frac)) => (main, Some(frac)),
        None => (time_part, None),
    };

    let parts: Vec<&str> = main.split(':').collect();
    let [hh, mm, ss] = parts.as_slice() else {
        return None;
    };
    if hh.len() != 2 || mm.len() != 2 || ss.len() != 2 {
        return None;
    }

    let hour: u32 = hh.parse().ok()?;
    let minute: u32 = mm.parse().ok()?;
    let second: u32 = ss.parse().ok()?;

    let nanos: u32 = match frac {
        Some(frac) => {
            if frac.is_empty() || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            format!("{:0<9}", frac).parse().ok()?
        }
        None => 0,
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Year(y) => write!(f, "{y:04}"),
            DateValue::YearMonth(y, m) => write!(f, "{y:04}-{m:02}"),
            DateValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateTimeValue::Year(y) => write!(f, "{y:04}"),
            DateTimeValue::YearMonth(y, m) => write!(f, "{y:04}-{m:02}"),
            DateTimeValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            DateTimeValue::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            DateTimeValue::Offset(dt, offset) => {
                write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f"))?;
                if *offset == 0 {
                    return f.write_str("Z");
                }
                let sign = if *offset < 0 { '-' } else { '+' };
                let abs = offset.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_keep_precision() {
        assert_eq!("2020".parse::<DateValue>().unwrap(), DateValue::Year(2020));
        assert_eq!(
            "2020-02".parse::<DateValue>().unwrap(),
            DateValue::YearMonth(2020, 2)
        );
        assert_eq!("2020-02-29".parse::<DateValue>().unwrap().to_string(), "2020-02-29");
        assert!("2021-02-29".parse::<DateValue>().is_err());
        assert!("20-1-1".parse::<DateValue>().is_err());
    }

    #[test]
    fn date_times_keep_offset() {
        let plus_one: DateTimeValue = "2020-01-01T10:00:00+01:00".parse().unwrap();
        let utc: DateTimeValue = "2020-01-01T09:00:00Z".parse().unwrap();
        assert_ne!(plus_one, utc);
        assert_eq!(plus_one.to_string(), "2020-01-01T10:00:00+01:00");
        assert_eq!(utc.to_string(), "2020-01-01T09:00:00Z");
    }

    #[test]
    fn fractional_seconds() {
        let value: DateTimeValue = "2020-01-01T10:00:00.125-05:30".parse().unwrap();
        assert_eq!(value.to_string(), "2020-01-01T10:00:00.125-05:30");
        let DateTimeValue::Offset(dt, offset) = value else {
            panic!("expected an offset date-time");
        };
        assert_eq!(dt.nanosecond(), 125_000_000);
        assert_eq!(offset, -(5 * 3600 + 30 * 60));
    }

    #[test]
    fn malformed_date_times_are_rejected() {
        for input in ["2020-01-01T10", "2020-01T10:00:00Z", "2020-01-01T10:00:00+0100", ""] {
            assert!(input.parse::<DateTimeValue>().is_err(), "{input}");
        }
    }

    #[test]
    fn date_only_date_time() {
        assert_eq!(
            "2020-05".parse::<DateTimeValue>().unwrap(),
            DateTimeValue::YearMonth(2020, 5)
        );
    }
}
