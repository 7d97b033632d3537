// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Date, time, date-time and UTC offset values (RFC 5545 Sections 3.3.4,
//! 3.3.5, 3.3.12 and 3.3.14).

use std::fmt::{self, Display};

use chumsky::Parser;
use chumsky::extra::ParserExtra;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use jiff::civil;

use crate::value::miscellaneous::{
    ValueExpected, i8_0_1, i8_0_2, i8_0_9, i8_1_2, i8_1_9, i16_0_9, u8_0_1, u8_0_3, u8_0_5, u8_0_9,
};

/// Date value in the iCalendar format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueDate {
    /// Year component.
    pub year: i16,

    /// Month component, 1-12.
    pub month: i8,

    /// Day component, 1-31.
    pub day: i8,
}

impl ValueDate {
    /// Convert to `jiff::civil::Date`.
    #[must_use]
    pub fn civil(self) -> civil::Date {
        civil::date(self.year, self.month, self.day)
    }
}

impl From<civil::Date> for ValueDate {
    fn from(date: civil::Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl Display for ValueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// date               = date-value
///
/// date-value         = date-fullyear date-month date-mday
/// date-fullyear      = 4DIGIT
/// date-month         = 2DIGIT        ;01-12
/// date-mday          = 2DIGIT        ;01-28, 01-29, 01-30, 01-31
///                                    ;based on month/year
/// ```
pub fn value_date<'src, I, E>() -> impl Parser<'src, I, ValueDate, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    let year = i16_0_9()
        .then(i16_0_9())
        .then(i16_0_9())
        .then(i16_0_9())
        .map(|(((a, b), c), d)| 1000 * a + 100 * b + 10 * c + d);

    let month = choice((
        just('0').ignore_then(i8_1_9()),
        just('1').ignore_then(i8_0_2()).map(|b| 10 + b),
    ));

    let day = choice((
        just('0').ignore_then(i8_1_9()),
        i8_1_2().then(i8_0_9()).map(|(a, b)| 10 * a + b),
        just('3').ignore_then(i8_0_1()).map(|b| 30 + b),
    ));

    year.then(month)
        .then(day)
        .try_map(|((year, month), day), span| {
            if civil::Date::new(year, month, day).is_err() {
                Err(E::Error::expected_found([ValueExpected::Date], None, span))
            } else {
                Ok(ValueDate { year, month, day })
            }
        })
}

/// Time value defined in the RFC 5545 Section 3.3.12.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueTime {
    /// Hour component, 0-23.
    pub hour: u8,

    /// Minute component, 0-59.
    pub minute: u8,

    /// Second component, 0-60 (60 for leap second).
    pub second: u8,

    /// Whether the time is in UTC (indicated by a trailing 'Z').
    pub utc: bool,
}

impl ValueTime {
    /// Create a new `ValueTime` from components.
    #[must_use]
    pub const fn new(hour: u8, minute: u8, second: u8, utc: bool) -> Self {
        Self {
            hour,
            minute,
            second,
            utc,
        }
    }

    /// Convert to `jiff::civil::Time`.
    ///
    /// A leap second is contracted to second 59.
    #[must_use]
    #[expect(clippy::cast_possible_wrap)]
    pub fn civil(self) -> civil::Time {
        civil::time(
            self.hour as i8,
            self.minute as i8,
            self.second.min(59) as i8,
            0,
        )
    }

    /// Seconds since midnight, used for ordering.
    #[must_use]
    pub fn seconds_of_day(self) -> u32 {
        u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second)
    }
}

impl Display for ValueTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}{:02}{:02}", self.hour, self.minute, self.second)?;
        if self.utc {
            write!(f, "Z")?;
        }
        Ok(())
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// time         = time-hour time-minute time-second [time-utc]
///
/// time-hour    = 2DIGIT        ;00-23
/// time-minute  = 2DIGIT        ;00-59
/// time-second  = 2DIGIT        ;00-60
/// ;The "60" value is used to account for positive "leap" seconds.
///
/// time-utc     = "Z"
/// ```
pub fn value_time<'src, I, E>() -> impl Parser<'src, I, ValueTime, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    time_hour()
        .then(time_minute())
        .then(time_second())
        .then(just('Z').or_not())
        .map(|(((hour, minute), second), utc)| ValueTime::new(hour, minute, second, utc.is_some()))
}

/// Date-Time value defined in the RFC 5545 Section 3.3.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueDateTime {
    /// Date component.
    pub date: ValueDate,

    /// Time component.
    pub time: ValueTime,
}

impl ValueDateTime {
    /// Create a date-time from its parts.
    #[must_use]
    pub const fn new(date: ValueDate, time: ValueTime) -> Self {
        Self { date, time }
    }

    /// Build from a civil date-time, marking it UTC or not.
    #[must_use]
    #[expect(clippy::cast_sign_loss)]
    pub fn from_civil(dt: civil::DateTime, utc: bool) -> Self {
        Self {
            date: dt.date().into(),
            time: ValueTime::new(dt.hour() as u8, dt.minute() as u8, dt.second() as u8, utc),
        }
    }

    /// Convert to `jiff::civil::DateTime`.
    #[must_use]
    pub fn civil(self) -> civil::DateTime {
        self.date.civil().to_datetime(self.time.civil())
    }

    /// Whether the time carries the UTC designator.
    #[must_use]
    pub const fn is_utc(self) -> bool {
        self.time.utc
    }
}

impl Display for ValueDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}T{}", self.date, self.time)
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// date-time  = date "T" time ;As specified in the DATE and TIME
/// ```
pub fn value_date_time<'src, I, E>() -> impl Parser<'src, I, ValueDateTime, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    value_date()
        .then_ignore(just('T'))
        .then(value_time())
        .map(|(date, time)| ValueDateTime { date, time })
}

/// UTC Offset Value defined in RFC 5545 Section 3.3.14
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueUtcOffset {
    /// Whether the offset is positive
    pub positive: bool,

    /// Hour, 0-23
    pub hour: u8,

    /// Minute, 0-59
    pub minute: u8,

    /// Second, 0-60, optional
    pub second: Option<u8>,
}

impl ValueUtcOffset {
    /// Signed offset in seconds.
    #[must_use]
    pub fn seconds(self) -> i32 {
        let abs = i32::from(self.hour) * 3600
            + i32::from(self.minute) * 60
            + i32::from(self.second.unwrap_or(0));
        if self.positive { abs } else { -abs }
    }
}

impl Display for ValueUtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.positive { '+' } else { '-' };
        write!(f, "{sign}{:02}{:02}", self.hour, self.minute)?;
        if let Some(second) = self.second {
            write!(f, "{second:02}")?;
        }
        Ok(())
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// utc-offset = time-numzone
///
/// time-numzone = ("+" / "-") time-hour time-minute [time-second]
/// ```
pub fn value_utc_offset<'src, I, E>() -> impl Parser<'src, I, ValueUtcOffset, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    select! { c @ ('+' | '-') => c }
        .then(time_hour())
        .then(time_minute())
        .then(time_second().or_not())
        .map(|(((sign, hour), minute), second)| ValueUtcOffset {
            positive: !matches!(sign, '-'),
            hour,
            minute,
            second,
        })
}

fn time_hour<'src, I, E>() -> impl Parser<'src, I, u8, E> + Copy
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    choice((
        u8_0_1().then(u8_0_9()).map(|(a, b)| 10 * a + b),
        just('2').ignore_then(u8_0_3()).map(|b| 20 + b),
    ))
}

fn time_minute<'src, I, E>() -> impl Parser<'src, I, u8, E> + Copy
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    u8_0_5().then(u8_0_9()).map(|(a, b)| 10 * a + b)
}

fn time_second<'src, I, E>() -> impl Parser<'src, I, u8, E> + Copy
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    choice((
        u8_0_5().then(u8_0_9()).map(|(a, b)| 10 * a + b),
        just('6').ignore_then(just('0').ignored().to(60)), // leap second
    ))
}

#[cfg(test)]
mod tests {
    use chumsky::input::Stream;

    use super::*;

    #[test]
    fn parses_date() {
        fn parse(src: &str) -> Result<ValueDate, Vec<Rich<'_, char>>> {
            let stream = Stream::from_iter(src.chars());
            value_date::<'_, _, extra::Err<_>>()
                .parse(stream)
                .into_result()
        }

        #[rustfmt::skip]
        let success_cases = [
            ("19970714", ValueDate { year: 1997, month: 7, day: 14 }),
            ("20000229", ValueDate { year: 2000, month: 2, day: 29 }), // leap year
        ];
        for (src, expected) in success_cases {
            assert_eq!(parse(src).unwrap(), expected);
            assert_eq!(expected.to_string(), src);
        }

        let fail_cases = [
            "20241301",  // invalid month
            "20240001",  // invalid month
            "19970230",  // no such day
            "abcd1234",  // invalid characters
            "202401011", // invalid length
        ];
        for src in fail_cases {
            assert!(parse(src).is_err(), "Parse {src} should fail");
        }
    }

    #[test]
    fn parses_date_time() {
        fn parse(src: &str) -> Result<ValueDateTime, Vec<Rich<'_, char>>> {
            let stream = Stream::from_iter(src.chars());
            value_date_time::<'_, _, extra::Err<_>>()
                .parse(stream)
                .into_result()
        }

        let local = parse("19970714T133000").unwrap();
        assert!(!local.is_utc());
        assert_eq!(local.civil(), civil::datetime(1997, 7, 14, 13, 30, 0, 0));
        assert_eq!(local.to_string(), "19970714T133000");

        let utc = parse("19980119T070000Z").unwrap();
        assert!(utc.is_utc());
        assert_eq!(utc.to_string(), "19980119T070000Z");

        // leap second is kept in the value but contracted for arithmetic
        let leap = parse("19970630T235960Z").unwrap();
        assert_eq!(leap.time.second, 60);
        assert_eq!(leap.civil().second(), 59);

        for src in ["19980119T230000-0800", "19970714 133000", "19970714T250000"] {
            assert!(parse(src).is_err(), "Parse {src} should fail");
        }
    }

    #[test]
    fn parses_utc_offset() {
        fn parse(src: &str) -> Result<ValueUtcOffset, Vec<Rich<'_, char>>> {
            let stream = Stream::from_iter(src.chars());
            value_utc_offset::<'_, _, extra::Err<_>>()
                .parse(stream)
                .into_result()
        }

        let offset = parse("-0500").unwrap();
        assert_eq!(offset.seconds(), -5 * 3600);
        assert_eq!(offset.to_string(), "-0500");

        let offset = parse("+123456").unwrap();
        assert_eq!(offset.seconds(), 12 * 3600 + 34 * 60 + 56);

        for src in ["0500", "+2400", "-1260", ""] {
            assert!(parse(src).is_err(), "Parse {src} should fail");
        }
    }

    #[test]
    fn converts_from_civil() {
        let dt = civil::datetime(2025, 3, 9, 9, 5, 7, 0);
        let value = ValueDateTime::from_civil(dt, true);
        assert_eq!(value.to_string(), "20250309T090507Z");
        assert_eq!(value.civil(), dt);
    }
}
