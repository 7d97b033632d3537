// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Period value type parser as defined in RFC 5545 Section 3.3.9.

use std::fmt::{self, Display};

use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::value::datetime::{ValueDateTime, value_date_time};
use crate::value::duration::{ValueDuration, value_duration};
use crate::value::miscellaneous::ValueExpected;

/// Period of Time value defined in RFC 5545 Section 3.3.9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValuePeriod {
    /// Explicit period with start and end date-time
    ///
    /// Format: `date-time "/" date-time`
    Explicit {
        /// Start date-time
        start: ValueDateTime,

        /// End date-time
        end: ValueDateTime,
    },

    /// Period with start date-time and duration
    ///
    /// Format: `date-time "/" dur-value`
    Duration {
        /// Start date-time
        start: ValueDateTime,

        /// Duration
        duration: ValueDuration,
    },
}

impl ValuePeriod {
    /// Start of the period.
    #[must_use]
    pub const fn start(&self) -> ValueDateTime {
        match self {
            Self::Explicit { start, .. } | Self::Duration { start, .. } => *start,
        }
    }
}

impl Display for ValuePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit { start, end } => write!(f, "{start}/{end}"),
            Self::Duration { start, duration } => write!(f, "{start}/{duration}"),
        }
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// period     = period-explicit / period-start
///
/// period-explicit = date-time "/" date-time
/// period-start = date-time "/" dur-value
/// ```
pub fn value_period<'src, I, E>() -> impl Parser<'src, I, ValuePeriod, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    // Both date-times must have the same UTC flag (both UTC or both floating)
    let explicit = value_date_time()
        .then_ignore(just('/'))
        .then(value_date_time())
        .try_map(|(start, end), span| {
            if start.time.utc == end.time.utc {
                Ok(ValuePeriod::Explicit { start, end })
            } else {
                Err(E::Error::expected_found(
                    [ValueExpected::MismatchedTimezone],
                    None,
                    span,
                ))
            }
        });

    let start = value_date_time()
        .then_ignore(just('/'))
        .then(value_duration())
        .map(|(start, duration)| ValuePeriod::Duration { start, duration });

    choice((explicit, start))
}

#[cfg(test)]
mod tests {
    use chumsky::extra;
    use chumsky::input::Stream;

    use super::*;

    fn parse(src: &str) -> Result<ValuePeriod, Vec<Rich<'_, char>>> {
        let stream = Stream::from_iter(src.chars());
        value_period::<'_, _, extra::Err<_>>()
            .parse(stream)
            .into_result()
    }

    #[test]
    fn parses_period() {
        // examples from RFC 5545 Section 3.3.9
        for src in ["19970101T180000Z/19970102T070000Z", "19970101T180000Z/PT5H30M"] {
            let period = parse(src).unwrap();
            assert_eq!(period.to_string(), src);
            assert_eq!(period.start().to_string(), "19970101T180000Z");
        }

        for src in [
            "19970101T180000Z/19970102T070000", // mixed UTC flag
            "19970101T180000Z",
            "19970101/19970102",
        ] {
            assert!(parse(src).is_err(), "Parse {src} should fail");
        }
    }
}
