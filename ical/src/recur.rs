// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Recurrence rules (RFC 5545 Section 3.3.10) and their expansion.

mod iterator;
mod occurrence;
mod rule;

use jiff::Timestamp;

pub use crate::recur::iterator::{IteratorState, RecurrenceIterator};
pub use crate::recur::occurrence::{Occurrence, foreach_occurrence_in_range};
pub use crate::recur::rule::{
    Frequency, MonthNum, RecurrenceRule, RuleEnd, Until, WeekdayNum, value_recur,
    weekday_keyword,
};

use crate::environment::Environment;
use crate::error::Error;
use crate::time::CalTime;

/// Expands `rule` from `start` eagerly, returning at most `max` instances.
///
/// # Errors
///
/// Fails like [`RecurrenceIterator::new`].
pub fn expand_bounded(
    rule: &RecurrenceRule,
    start: &CalTime,
    max: usize,
    env: &Environment,
) -> Result<Vec<CalTime>, Error> {
    Ok(RecurrenceIterator::new(rule, start, env)?.take(max).collect())
}

/// Expands the rule text `rule` from the UTC instant `start`, returning at
/// most `count` instants.
///
/// # Errors
///
/// Returns [`Error::MalformedData`] if the rule text does not parse, or
/// fails like [`RecurrenceIterator::new`].
pub fn expand_timestamps(
    rule: &str,
    start: Timestamp,
    count: usize,
    env: &Environment,
) -> Result<Vec<Timestamp>, Error> {
    let rule: RecurrenceRule = rule.parse()?;
    let start = CalTime::from_timestamp(start);
    Ok(RecurrenceIterator::new(&rule, &start, env)?
        .take(count)
        .map(|t| t.instant(env))
        .collect())
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;

    use super::*;

    #[test]
    fn bounded_expansion_stops_at_max() {
        let env = Environment::default();
        let rule: RecurrenceRule = "FREQ=DAILY".parse().expect("Failed to parse rule");
        let start = CalTime::utc(datetime(2025, 1, 1, 0, 0, 0, 0));
        let times = expand_bounded(&rule, &start, 5, &env).expect("Failed to expand");
        assert_eq!(times.len(), 5);
        assert_eq!(times.last().map(CalTime::civil), Some(datetime(2025, 1, 5, 0, 0, 0, 0)));
    }

    #[test]
    fn timestamp_expansion() {
        let env = Environment::default();
        let start: Timestamp = "2025-01-01T00:00:00Z".parse().expect("Failed to parse start");
        let times =
            expand_timestamps("FREQ=HOURLY;INTERVAL=6", start, 3, &env).expect("Failed to expand");
        let hours: Vec<i64> = times
            .iter()
            .map(|t| start.duration_until(*t).as_hours())
            .collect();
        assert_eq!(hours, vec![0, 6, 12]);

        assert!(expand_timestamps("FREQ=SOMETIMES", start, 3, &env).is_err());
    }
}
