// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Duration value type parser as defined in RFC 5545 Section 3.3.6.

use std::fmt::{self, Display};

use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::value::miscellaneous::{ValueExpected, value_u32};

/// Duration Value defined in RFC 5545 Section 3.3.6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueDuration {
    /// Date and Time Duration
    DateTime {
        /// Whether the duration is positive
        positive: bool,
        /// Day Duration
        day: u32,
        /// Hour Duration
        hour: u32,
        /// Minute Duration
        minute: u32,
        /// Second Duration
        second: u32,
    },

    /// Week Duration
    Week {
        /// Whether the duration is positive
        positive: bool,
        /// Week Duration
        week: u32,
    },
}

impl Default for ValueDuration {
    fn default() -> Self {
        Self::DateTime {
            positive: true,
            day: 0,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl ValueDuration {
    /// Builds a duration of `seconds` exact seconds, split into
    /// hours/minutes/seconds (never days, which are nominal).
    #[must_use]
    pub fn from_seconds(seconds: i64) -> Self {
        let positive = seconds >= 0;
        let abs = seconds.unsigned_abs();
        let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
        Self::DateTime {
            positive,
            day: 0,
            hour: clamp(abs / 3600),
            minute: clamp(abs % 3600 / 60),
            second: clamp(abs % 60),
        }
    }

    /// Whether the duration runs forward in time.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        match self {
            Self::DateTime { positive, .. } | Self::Week { positive, .. } => positive,
        }
    }

    /// Signed number of nominal days (weeks count as seven days).
    ///
    /// Nominal days are applied to the wall clock and keep the local time
    /// of day across daylight saving transitions.
    #[must_use]
    pub fn nominal_days(self) -> i64 {
        let (positive, days) = match self {
            Self::DateTime { positive, day, .. } => (positive, i64::from(day)),
            Self::Week { positive, week } => (positive, i64::from(week) * 7),
        };
        if positive { days } else { -days }
    }

    /// Signed number of exact seconds from the hour, minute and second fields.
    #[must_use]
    pub fn exact_seconds(self) -> i64 {
        match self {
            Self::DateTime {
                positive,
                hour,
                minute,
                second,
                ..
            } => {
                let secs = i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second);
                if positive { secs } else { -secs }
            }
            Self::Week { .. } => 0,
        }
    }

    /// Total length in seconds, counting a nominal day as 86 400 seconds.
    #[must_use]
    pub fn as_seconds(self) -> i64 {
        self.nominal_days() * 86_400 + self.exact_seconds()
    }
}

impl Display for ValueDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_positive() {
            write!(f, "-")?;
        }
        match *self {
            Self::Week { week, .. } => write!(f, "P{week}W"),
            Self::DateTime {
                day,
                hour,
                minute,
                second,
                ..
            } => {
                write!(f, "P")?;
                if day > 0 {
                    write!(f, "{day}D")?;
                }
                if hour == 0 && minute == 0 && second == 0 {
                    return if day == 0 { write!(f, "T0S") } else { Ok(()) };
                }
                write!(f, "T")?;
                if hour > 0 {
                    write!(f, "{hour}H")?;
                }
                // dur-hour only allows a seconds part after a minutes part
                if minute > 0 || (hour > 0 && second > 0) {
                    write!(f, "{minute}M")?;
                }
                if second > 0 {
                    write!(f, "{second}S")?;
                }
                Ok(())
            }
        }
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// dur-value  = (["+"] / "-") "P" (dur-date / dur-time / dur-week)
///
/// dur-date   = dur-day [dur-time]
/// dur-time   = "T" (dur-hour / dur-minute / dur-second)
/// dur-week   = 1*DIGIT "W"
/// dur-hour   = 1*DIGIT "H" [dur-minute]
/// dur-minute = 1*DIGIT "M" [dur-second]
/// dur-second = 1*DIGIT "S"
/// dur-day    = 1*DIGIT "D"
/// ```
pub fn value_duration<'src, I, E>() -> impl Parser<'src, I, ValueDuration, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    // case-sensitive
    let int = value_u32();

    let week = int.clone().then_ignore(just('W'));

    let second_val = int.clone().then_ignore(just('S'));
    let minute_val = int.clone().then_ignore(just('M'));
    let hour_val = int.clone().then_ignore(just('H'));

    // dur-second = 1*DIGIT "S"
    let second_only = second_val.clone().map(|s| (0, 0, s));

    // dur-minute = 1*DIGIT "M" [dur-second]
    let minute_with_second = minute_val
        .clone()
        .then(second_val.clone().or_not())
        .map(|(m, s)| (0, m, s.unwrap_or(0)));

    // dur-hour = 1*DIGIT "H" [dur-minute]
    let hour_with_minute = hour_val
        .then(minute_val.then(second_val.or_not()).or_not())
        .map(|(h, opt_ms)| match opt_ms {
            Some((m, opt_s)) => (h, m, opt_s.unwrap_or(0)),
            None => (h, 0, 0),
        });

    // dur-time = "T" (dur-hour / dur-minute / dur-second)
    let time = just('T').ignore_then(choice((hour_with_minute, minute_with_second, second_only)));

    let day = int.then_ignore(just('D'));
    let date = day.then(time.clone().or_not());

    let sign = select! { c @ ('+' | '-') => c }
        .or_not()
        .map(|sign| !matches!(sign, Some('-')));
    let prefix = sign.then_ignore(just('P'));
    choice((
        prefix.clone().then(date).map(|(positive, (day, time))| {
            let (hour, minute, second) = time.unwrap_or((0, 0, 0));
            ValueDuration::DateTime {
                positive,
                day,
                hour,
                minute,
                second,
            }
        }),
        prefix
            .clone()
            .then(time)
            .map(|(positive, (hour, minute, second))| ValueDuration::DateTime {
                positive,
                day: 0,
                hour,
                minute,
                second,
            }),
        prefix
            .then(week)
            .map(|(positive, week)| ValueDuration::Week { positive, week }),
    ))
}

#[cfg(test)]
mod tests {
    use chumsky::extra;
    use chumsky::input::Stream;

    use super::*;

    fn parse(src: &str) -> Result<ValueDuration, Vec<Rich<'_, char>>> {
        let stream = Stream::from_iter(src.chars());
        value_duration::<'_, _, extra::Err<_>>()
            .parse(stream)
            .into_result()
    }

    #[test]
    fn parses_duration() {
        use ValueDuration::{DateTime, Week};

        #[rustfmt::skip]
        let success_cases = [
            // examples from RFC 5545 Section 3.3.6
            ("P15DT5H0M20S", DateTime { positive: true, day: 15, hour: 5, minute: 0, second: 20 }),
            ("P2W",  Week { positive: true,  week: 2 }),
            // extra tests
            ("-P1W", Week { positive: false, week: 1 }),
            ("-PT10H11M12S", DateTime { positive: false, day: 0, hour: 10, minute: 11, second: 12 }),
            ("PT15M",        DateTime { positive: true,  day: 0, hour:  0, minute: 15, second:  0 }),
            ("P1D",          DateTime { positive: true,  day: 1, hour:  0, minute:  0, second:  0 }),
        ];
        for (src, expected) in success_cases {
            assert_eq!(parse(src).unwrap(), expected, "Failed to parse: {src}");
        }

        for src in ["P", "PT", "P3X", "P-3W", "P3DT4H5M6", "3W"] {
            assert!(parse(src).is_err(), "Parse {src} should fail");
        }
    }

    #[test]
    fn formats_duration_in_grammar_order() {
        for src in ["P15DT5H0M20S", "P2W", "-PT15M", "P1D", "PT0S", "PT1H"] {
            let value = parse(src).unwrap();
            assert_eq!(value.to_string(), src);
        }
    }

    #[test]
    fn splits_nominal_and_exact_parts() {
        let value = parse("-P1DT2H").unwrap();
        assert_eq!(value.nominal_days(), -1);
        assert_eq!(value.exact_seconds(), -7200);
        assert_eq!(value.as_seconds(), -(86_400 + 7200));

        let value = parse("P2W").unwrap();
        assert_eq!(value.nominal_days(), 14);
        assert_eq!(value.exact_seconds(), 0);

        assert_eq!(ValueDuration::from_seconds(-3725).to_string(), "-PT1H2M5S");
    }
}
