// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Typed property values as defined in RFC 5545 Section 3.3.
//!
//! A [`Value`] is always parsed with a known [`ValueKind`]: either the
//! default kind of its property or the one given by a `VALUE=` parameter.

mod datetime;
mod duration;
mod miscellaneous;
mod period;
mod text;

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::str::FromStr;

use jiff::civil;

use crate::error::Error;
use crate::keyword::{
    KW_BINARY, KW_BOOLEAN, KW_CAL_ADDRESS, KW_DATE, KW_DATETIME, KW_DURATION, KW_FALSE, KW_FLOAT,
    KW_INTEGER, KW_PERIOD, KW_RECUR, KW_TEXT, KW_TIME, KW_TRUE, KW_URI, KW_UTC_OFFSET, KW_X,
};
use crate::recur::RecurrenceRule;

pub use crate::value::datetime::{
    ValueDate, ValueDateTime, ValueTime, ValueUtcOffset, value_date, value_date_time, value_time,
    value_utc_offset,
};
pub use crate::value::duration::{ValueDuration, value_duration};
pub(crate) use crate::value::miscellaneous::{ValueExpected, parse_complete, sign, value_u32};
pub use crate::value::miscellaneous::{value_binary, value_boolean, value_float, value_integer};
pub use crate::value::period::{ValuePeriod, value_period};
pub use crate::value::text::{escape_text, split_unescaped, unescape_text};

impl_kind_mapping! {
    /// The value data types of RFC 5545 Section 3.3.
    enum ValueKind {
        /// BINARY, base64 encoded
        Binary => KW_BINARY,
        /// BOOLEAN
        Boolean => KW_BOOLEAN,
        /// CAL-ADDRESS
        CalAddress => KW_CAL_ADDRESS,
        /// DATE
        Date => KW_DATE,
        /// DATE-TIME
        DateTime => KW_DATETIME,
        /// DURATION
        Duration => KW_DURATION,
        /// FLOAT
        Float => KW_FLOAT,
        /// INTEGER
        Integer => KW_INTEGER,
        /// PERIOD
        Period => KW_PERIOD,
        /// RECUR
        Recur => KW_RECUR,
        /// TEXT
        Text => KW_TEXT,
        /// TIME
        Time => KW_TIME,
        /// URI
        Uri => KW_URI,
        /// UTC-OFFSET
        UtcOffset => KW_UTC_OFFSET,
        /// Experimental or unknown data, kept as raw text
        X => KW_X,
    }
}

/// A parsed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Base64 text, validated but not decoded
    Binary(String),
    /// Boolean
    Boolean(bool),
    /// Calendar user address, usually a `mailto:` URI
    CalAddress(String),
    /// Date
    Date(ValueDate),
    /// Date-time, floating or UTC
    DateTime(ValueDateTime),
    /// Duration
    Duration(ValueDuration),
    /// Float
    Float(f64),
    /// Integer
    Integer(i32),
    /// Period of time
    Period(ValuePeriod),
    /// Recurrence rule
    Recur(Box<RecurrenceRule>),
    /// Text, unescaped
    Text(String),
    /// Time of day
    Time(ValueTime),
    /// URI
    Uri(String),
    /// UTC offset
    UtcOffset(ValueUtcOffset),
    /// Raw text of an unknown or experimental value type
    X(String),
}

impl Value {
    /// Parses `text` as a value of the given kind.
    ///
    /// `TEXT` values are unescaped. A `DATE-TIME` that is a bare date is
    /// accepted as a `DATE`.
    ///
    /// # Errors
    /// Returns [`Error::MalformedData`] if `text` is not valid for `kind`.
    pub fn parse(kind: ValueKind, text: &str) -> Result<Self, Error> {
        Ok(match kind {
            ValueKind::Binary => {
                parse_complete(value_binary(), text, KW_BINARY)?;
                Value::Binary(text.to_string())
            }
            ValueKind::Boolean => Value::Boolean(parse_complete(value_boolean(), text, KW_BOOLEAN)?),
            ValueKind::CalAddress => Value::CalAddress(text.to_string()),
            ValueKind::Date => Value::Date(parse_complete(value_date(), text, KW_DATE)?),
            ValueKind::DateTime => match parse_complete(value_date_time(), text, KW_DATETIME) {
                Ok(v) => Value::DateTime(v),
                Err(err) => match parse_complete(value_date(), text, KW_DATE) {
                    Ok(date) => Value::Date(date),
                    Err(_) => return Err(err),
                },
            },
            ValueKind::Duration => {
                Value::Duration(parse_complete(value_duration(), text, KW_DURATION)?)
            }
            ValueKind::Float => Value::Float(parse_complete(value_float(), text, KW_FLOAT)?),
            ValueKind::Integer => Value::Integer(parse_complete(value_integer(), text, KW_INTEGER)?),
            ValueKind::Period => Value::Period(parse_complete(value_period(), text, KW_PERIOD)?),
            ValueKind::Recur => Value::Recur(Box::new(RecurrenceRule::from_str(text)?)),
            ValueKind::Text => Value::Text(unescape_text(text)),
            ValueKind::Time => Value::Time(parse_complete(value_time(), text, KW_TIME)?),
            ValueKind::Uri => Value::Uri(text.to_string()),
            ValueKind::UtcOffset => {
                Value::UtcOffset(parse_complete(value_utc_offset(), text, KW_UTC_OFFSET)?)
            }
            ValueKind::X => Value::X(text.to_string()),
        })
    }

    /// The data type of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Binary(_) => ValueKind::Binary,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::CalAddress(_) => ValueKind::CalAddress,
            Value::Date(_) => ValueKind::Date,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::Duration(_) => ValueKind::Duration,
            Value::Float(_) => ValueKind::Float,
            Value::Integer(_) => ValueKind::Integer,
            Value::Period(_) => ValueKind::Period,
            Value::Recur(_) => ValueKind::Recur,
            Value::Text(_) => ValueKind::Text,
            Value::Time(_) => ValueKind::Time,
            Value::Uri(_) => ValueKind::Uri,
            Value::UtcOffset(_) => ValueKind::UtcOffset,
            Value::X(_) => ValueKind::X,
        }
    }

    /// The unescaped text of a text-like value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Binary(s)
            | Value::CalAddress(s)
            | Value::Text(s)
            | Value::Uri(s)
            | Value::X(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an `INTEGER`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// The duration content, if this is a `DURATION`.
    #[must_use]
    pub fn as_duration(&self) -> Option<ValueDuration> {
        match self {
            Value::Duration(v) => Some(*v),
            _ => None,
        }
    }

    /// The recurrence rule, if this is a `RECUR`.
    #[must_use]
    pub fn as_recur(&self) -> Option<&RecurrenceRule> {
        match self {
            Value::Recur(rule) => Some(rule),
            _ => None,
        }
    }

    /// Compares two values by their kind-specific ordering.
    ///
    /// Values of different kinds are [`Comparison::NotEqual`], except a
    /// `DATE` against a `DATE-TIME` (compared chronologically, the date at
    /// midnight) and `INTEGER` against `FLOAT`.
    ///
    /// Two `DATE-TIME`s compare by wall clock when both are UTC or both are
    /// not. A UTC time against a floating or zoned one has no common clock
    /// without the `TZID` and is [`Comparison::Unordered`]; a caller that
    /// knows the zone compares [`crate::CalTime`]s instead.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Comparison {
        use Value as V;

        match (self, other) {
            (V::Date(a), V::Date(b)) => a.cmp(b).into(),
            (V::DateTime(a), V::DateTime(b)) if a.is_utc() != b.is_utc() => Comparison::Unordered,
            (V::DateTime(a), V::DateTime(b)) => a.civil().cmp(&b.civil()).into(),
            (V::Date(a), V::DateTime(b)) => at_midnight(*a).cmp(&b.civil()).into(),
            (V::DateTime(a), V::Date(b)) => a.civil().cmp(&at_midnight(*b)).into(),
            (V::Integer(a), V::Integer(b)) => a.cmp(b).into(),
            (V::Float(a), V::Float(b)) => compare_floats(*a, *b),
            (V::Integer(a), V::Float(b)) => compare_floats(f64::from(*a), *b),
            (V::Float(a), V::Integer(b)) => compare_floats(*a, f64::from(*b)),
            (V::Boolean(a), V::Boolean(b)) => equality(a == b),
            (V::Duration(a), V::Duration(b)) => a.as_seconds().cmp(&b.as_seconds()).into(),
            (V::Period(a), V::Period(b)) => {
                let start = a.start().civil().cmp(&b.start().civil());
                start.then_with(|| period_end_seconds(a).cmp(&period_end_seconds(b))).into()
            }
            (V::Time(a), V::Time(b)) => a.seconds_of_day().cmp(&b.seconds_of_day()).into(),
            (V::UtcOffset(a), V::UtcOffset(b)) => a.seconds().cmp(&b.seconds()).into(),
            (V::Recur(a), V::Recur(b)) => equality(a == b),
            (V::Binary(a), V::Binary(b))
            | (V::CalAddress(a), V::CalAddress(b))
            | (V::Text(a), V::Text(b))
            | (V::Uri(a), V::Uri(b))
            | (V::X(a), V::X(b)) => a.cmp(b).into(),
            _ => Comparison::NotEqual,
        }
    }
}

fn at_midnight(date: ValueDate) -> civil::DateTime {
    date.civil().to_datetime(civil::Time::midnight())
}

fn compare_floats(a: f64, b: f64) -> Comparison {
    a.partial_cmp(&b).map_or(Comparison::Unordered, Comparison::from)
}

fn equality(eq: bool) -> Comparison {
    if eq {
        Comparison::Equal
    } else {
        Comparison::NotEqual
    }
}

fn period_end_seconds(period: &ValuePeriod) -> i64 {
    let start = period.start().civil();
    match period {
        ValuePeriod::Explicit { end, .. } => start.duration_until(end.civil()).as_secs(),
        ValuePeriod::Duration { duration, .. } => duration.as_seconds(),
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Binary(s) | Value::CalAddress(s) | Value::Uri(s) | Value::X(s) => f.write_str(s),
            Value::Boolean(true) => f.write_str(KW_TRUE),
            Value::Boolean(false) => f.write_str(KW_FALSE),
            Value::Date(v) => v.fmt(f),
            Value::DateTime(v) => v.fmt(f),
            Value::Duration(v) => v.fmt(f),
            Value::Float(v) => v.fmt(f),
            Value::Integer(v) => v.fmt(f),
            Value::Period(v) => v.fmt(f),
            Value::Recur(v) => v.fmt(f),
            Value::Text(s) => f.write_str(&escape_text(s)),
            Value::Time(v) => v.fmt(f),
            Value::UtcOffset(v) => v.fmt(f),
        }
    }
}

impl From<ValueDate> for Value {
    fn from(value: ValueDate) -> Self {
        Value::Date(value)
    }
}

impl From<ValueDateTime> for Value {
    fn from(value: ValueDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl From<ValueDuration> for Value {
    fn from(value: ValueDuration) -> Self {
        Value::Duration(value)
    }
}

impl From<RecurrenceRule> for Value {
    fn from(value: RecurrenceRule) -> Self {
        Value::Recur(Box::new(value))
    }
}

/// Outcome of comparing two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Left sorts before right
    Less,
    /// Values are equal
    Equal,
    /// Left sorts after right
    Greater,
    /// Values differ and have no ordering
    NotEqual,
    /// Values cannot be compared, such as NaN floats
    Unordered,
}

impl From<Ordering> for Comparison {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => Comparison::Less,
            Ordering::Equal => Comparison::Equal,
            Ordering::Greater => Comparison::Greater,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_by_kind() {
        assert_eq!(
            Value::parse(ValueKind::Integer, "-3").expect("Failed to parse integer"),
            Value::Integer(-3)
        );
        assert_eq!(
            Value::parse(ValueKind::Text, r"a\, b\nc").expect("Failed to parse text"),
            Value::Text("a, b\nc".to_string())
        );
        assert_eq!(
            Value::parse(ValueKind::Boolean, "false").expect("Failed to parse boolean"),
            Value::Boolean(false)
        );
        assert!(Value::parse(ValueKind::Integer, "ten").is_err());
        assert!(Value::parse(ValueKind::Binary, "abc").is_err());
    }

    #[test]
    fn bare_date_is_accepted_for_date_time() {
        let value = Value::parse(ValueKind::DateTime, "20250101").expect("Failed to parse date");
        assert_eq!(value.kind(), ValueKind::Date);
        assert!(Value::parse(ValueKind::DateTime, "2025-01-01").is_err());
    }

    #[test]
    fn value_kind_names_round_trip() {
        for kind in [ValueKind::DateTime, ValueKind::CalAddress, ValueKind::UtcOffset] {
            assert_eq!(kind.name().parse::<ValueKind>(), Ok(kind));
        }
        assert_eq!("date-time".parse::<ValueKind>(), Ok(ValueKind::DateTime));
        assert!("X-UNKNOWN".parse::<ValueKind>().is_err());
    }

    #[test]
    fn displays_text_escaped() {
        let value = Value::Text("a;b,c\\d".to_string());
        assert_eq!(value.to_string(), r"a\;b\,c\\d");
        assert_eq!(Value::Boolean(true).to_string(), "TRUE");
    }

    #[test]
    fn compares_values() {
        let parse = |kind, s| Value::parse(kind, s).expect("Failed to parse value");

        assert_eq!(
            parse(ValueKind::Integer, "1").compare(&parse(ValueKind::Integer, "2")),
            Comparison::Less
        );
        assert_eq!(
            parse(ValueKind::Text, "b").compare(&parse(ValueKind::Text, "a")),
            Comparison::Greater
        );
        assert_eq!(
            parse(ValueKind::Date, "20250101")
                .compare(&parse(ValueKind::DateTime, "20250101T000001")),
            Comparison::Less
        );
        assert_eq!(
            parse(ValueKind::DateTime, "20250101T090000Z")
                .compare(&parse(ValueKind::DateTime, "20250101T080000Z")),
            Comparison::Greater
        );
        assert_eq!(
            parse(ValueKind::DateTime, "20250101T090000Z")
                .compare(&parse(ValueKind::DateTime, "20250101T090000")),
            Comparison::Unordered
        );
        assert_eq!(
            parse(ValueKind::Duration, "P1D").compare(&parse(ValueKind::Duration, "PT24H")),
            Comparison::Equal
        );
        assert_eq!(
            Value::Float(f64::NAN).compare(&Value::Float(1.0)),
            Comparison::Unordered
        );
        assert_eq!(
            Value::Boolean(true).compare(&Value::Boolean(false)),
            Comparison::NotEqual
        );
        assert_eq!(
            parse(ValueKind::Text, "1").compare(&parse(ValueKind::Integer, "1")),
            Comparison::NotEqual
        );
    }
}
