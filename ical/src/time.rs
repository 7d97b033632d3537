// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Zone-aware calendar time.
//!
//! A [`CalTime`] is a civil date or date-time together with the zone it is
//! expressed in. Instants are resolved lazily through the [`Environment`]'s
//! time zone provider, so a `TZID` never has to be known at parse time.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use jiff::civil::{self, DateTime};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Span as JiffSpan, Timestamp};

use crate::environment::Environment;
use crate::error::Error;
use crate::property::Property;
use crate::value::{Value, ValueDate, ValueDateTime, ValueDuration};

/// The zone a calendar time is expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Local time wherever the reader is; resolved as UTC when an instant is needed
    Floating,
    /// Coordinated universal time
    Utc,
    /// Named zone, resolved through the time zone provider
    Tzid(String),
}

/// A date or date-time in a zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalTime {
    civil: DateTime,
    is_date: bool,
    zone: Zone,
}

impl CalTime {
    /// A floating all-day date.
    #[must_use]
    pub fn from_date(date: civil::Date) -> Self {
        Self {
            civil: date.to_datetime(civil::Time::midnight()),
            is_date: true,
            zone: Zone::Floating,
        }
    }

    /// A floating date-time.
    #[must_use]
    pub fn floating(civil: DateTime) -> Self {
        Self {
            civil,
            is_date: false,
            zone: Zone::Floating,
        }
    }

    /// A UTC date-time.
    #[must_use]
    pub fn utc(civil: DateTime) -> Self {
        Self {
            civil,
            is_date: false,
            zone: Zone::Utc,
        }
    }

    /// A date-time in the named zone.
    #[must_use]
    pub fn zoned(civil: DateTime, tzid: impl Into<String>) -> Self {
        Self {
            civil,
            is_date: false,
            zone: Zone::Tzid(tzid.into()),
        }
    }

    /// The UTC date-time of an instant.
    #[must_use]
    pub fn from_timestamp(ts: Timestamp) -> Self {
        Self::utc(ts.to_zoned(TimeZone::UTC).datetime())
    }

    /// Builds a time from a `DATE` or `DATE-TIME` value, with the `TZID`
    /// of its property if any. A UTC value ignores the `TZID`.
    #[must_use]
    pub fn from_value(value: &Value, tzid: Option<&str>) -> Option<Self> {
        match value {
            Value::Date(date) => Some(Self::from_date(date.civil())),
            Value::DateTime(dt) if dt.is_utc() => Some(Self::utc(dt.civil())),
            Value::DateTime(dt) => Some(match tzid {
                Some(tzid) => Self::zoned(dt.civil(), tzid),
                None => Self::floating(dt.civil()),
            }),
            Value::Period(period) => Self::from_value(&Value::DateTime(period.start()), tzid),
            _ => None,
        }
    }

    /// Reads the time of a date-valued property such as `DTSTART`.
    #[must_use]
    pub fn from_property(property: &Property) -> Option<Self> {
        Self::from_value(property.value()?, property.tzid())
    }

    /// The value this time serializes to. The zone travels separately as a
    /// `TZID` parameter.
    #[must_use]
    pub fn to_value(&self) -> Value {
        if self.is_date {
            Value::Date(ValueDate::from(self.civil.date()))
        } else {
            Value::DateTime(ValueDateTime::from_civil(self.civil, self.zone == Zone::Utc))
        }
    }

    /// Wall-clock date-time.
    #[must_use]
    pub const fn civil(&self) -> DateTime {
        self.civil
    }

    /// Wall-clock date.
    #[must_use]
    pub fn civil_date(&self) -> civil::Date {
        self.civil.date()
    }

    /// Whether this is an all-day `DATE`.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        self.is_date
    }

    /// The zone of this time.
    #[must_use]
    pub const fn zone(&self) -> &Zone {
        &self.zone
    }

    /// The `TZID`, for times in a named zone.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match &self.zone {
            Zone::Tzid(tzid) => Some(tzid),
            Zone::Floating | Zone::Utc => None,
        }
    }

    /// Whether this time is in UTC.
    #[must_use]
    pub fn is_utc(&self) -> bool {
        self.zone == Zone::Utc
    }

    /// The same zone and precision with another wall-clock time.
    #[must_use]
    pub fn with_civil(&self, civil: DateTime) -> Self {
        Self {
            civil,
            is_date: self.is_date,
            zone: self.zone.clone(),
        }
    }

    /// Resolves the zone. Unknown zones and floating times resolve to UTC.
    #[must_use]
    pub fn time_zone(&self, env: &Environment) -> TimeZone {
        match &self.zone {
            Zone::Tzid(tzid) => env.lookup_timezone(tzid).unwrap_or_else(|| {
                tracing::debug!(tzid, "unknown time zone, treating the time as UTC");
                TimeZone::UTC
            }),
            Zone::Floating | Zone::Utc => TimeZone::UTC,
        }
    }

    /// The instant this time denotes.
    ///
    /// Wall-clock times that fall in a gap or a fold resolve the way RFC
    /// 5545 prescribes: a gap moves forward by its length, a fold takes the
    /// earlier instant.
    #[must_use]
    pub fn instant(&self, env: &Environment) -> Timestamp {
        to_timestamp(self.civil, &self.time_zone(env))
    }

    /// Orders two times. Two dates, or two floating times, compare by wall
    /// clock; anything else compares by instant.
    #[must_use]
    pub fn compare(&self, other: &CalTime, env: &Environment) -> Ordering {
        if self.is_date && other.is_date {
            return self.civil.date().cmp(&other.civil.date());
        }
        if self.zone == other.zone && !matches!(self.zone, Zone::Tzid(_)) {
            return self.civil.cmp(&other.civil);
        }
        self.instant(env).cmp(&other.instant(env))
    }

    /// Adds a duration.
    ///
    /// Days and weeks are nominal and move the wall clock, keeping the local
    /// time across a daylight saving change. Hours, minutes and seconds are
    /// exact and move the instant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadArgument`] when the result is outside the
    /// supported range of years.
    pub fn add_duration(&self, duration: ValueDuration, env: &Environment) -> Result<Self, Error> {
        let overflow =
            |_: jiff::Error| Error::BadArgument(format!("{self} + {duration} is out of range"));

        let mut civil = self.civil;
        let days = duration.nominal_days();
        if days != 0 {
            civil = civil.checked_add(JiffSpan::new().days(days)).map_err(overflow)?;
        }

        let seconds = duration.exact_seconds();
        if seconds == 0 {
            return Ok(self.with_civil(civil));
        }

        let delta = SignedDuration::from_secs(seconds);
        let civil = match &self.zone {
            Zone::Tzid(_) => {
                let tz = self.time_zone(env);
                let instant = to_timestamp(civil, &tz).checked_add(delta).map_err(overflow)?;
                instant.to_zoned(tz).datetime()
            }
            Zone::Floating | Zone::Utc => civil.checked_add(delta).map_err(overflow)?,
        };
        Ok(Self {
            civil,
            is_date: false,
            zone: self.zone.clone(),
        })
    }

    /// Exact elapsed time from `self` to `other`.
    #[must_use]
    pub fn duration_until(&self, other: &CalTime, env: &Environment) -> SignedDuration {
        self.instant(env).duration_until(other.instant(env))
    }
}

impl Display for CalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_value().fmt(f)?;
        if let Zone::Tzid(tzid) = &self.zone {
            write!(f, "[{tzid}]")?;
        }
        Ok(())
    }
}

/// Resolves a wall-clock time in `tz`, saturating at the ends of the
/// supported range.
pub(crate) fn to_timestamp(civil: DateTime, tz: &TimeZone) -> Timestamp {
    tz.to_ambiguous_timestamp(civil)
        .compatible()
        .unwrap_or_else(|_| {
            if civil.year() < 0 {
                Timestamp::MIN
            } else {
                Timestamp::MAX
            }
        })
}

/// A stretch of absolute time, as used for free/busy reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    /// Inclusive start
    pub start: Timestamp,
    /// Exclusive end
    pub end: Timestamp,
    /// Whether the time is blocked
    pub is_busy: bool,
}

impl Span {
    /// Whether the span shares any time with `[start, end)`. An empty span
    /// overlaps a range that contains its start.
    #[must_use]
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        if self.start == self.end {
            return self.start >= start && self.start < end;
        }
        self.start < end && self.end > start
    }

    /// The part of the span inside `[start, end)`.
    #[must_use]
    pub fn clip(&self, start: Timestamp, end: Timestamp) -> Self {
        Self {
            start: self.start.max(start),
            end: self.end.min(end).max(self.start.max(start)),
            is_busy: self.is_busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;
    use crate::value::{Value, ValueKind};

    fn duration(text: &str) -> ValueDuration {
        Value::parse(ValueKind::Duration, text)
            .ok()
            .and_then(|v| v.as_duration())
            .expect("Failed to parse duration")
    }

    #[test]
    fn nominal_day_keeps_local_time_across_fall_back() {
        let env = Environment::new();
        let start = CalTime::zoned(datetime(2022, 11, 5, 23, 0, 0, 0), "America/New_York");

        let one_day = start
            .add_duration(duration("P1D"), &env)
            .expect("Failed to add P1D");
        assert_eq!(one_day.civil(), datetime(2022, 11, 6, 23, 0, 0, 0));
        assert_eq!(start.duration_until(&one_day, &env).as_hours(), 25);

        let day_of_hours = start
            .add_duration(duration("PT24H"), &env)
            .expect("Failed to add PT24H");
        assert_eq!(day_of_hours.civil(), datetime(2022, 11, 6, 22, 0, 0, 0));
        assert_eq!(start.duration_until(&day_of_hours, &env).as_hours(), 24);
    }

    #[test]
    fn nominal_day_keeps_local_time_across_spring_forward() {
        let env = Environment::new();
        let start = CalTime::zoned(datetime(2025, 3, 8, 9, 0, 0, 0), "America/New_York");
        let next = start
            .add_duration(duration("P1D"), &env)
            .expect("Failed to add P1D");
        assert_eq!(next.civil(), datetime(2025, 3, 9, 9, 0, 0, 0));
        assert_eq!(start.duration_until(&next, &env).as_hours(), 23);
    }

    #[test]
    fn resolves_instants_by_zone() {
        let env = Environment::new();
        let civil = datetime(2025, 6, 1, 12, 0, 0, 0);

        let utc = CalTime::utc(civil);
        let floating = CalTime::floating(civil);
        let berlin = CalTime::zoned(civil, "Europe/Berlin");
        let unknown = CalTime::zoned(civil, "Mars/Olympus_Mons");

        assert_eq!(utc.instant(&env), floating.instant(&env));
        assert_eq!(unknown.instant(&env), utc.instant(&env));
        assert_eq!(berlin.duration_until(&utc, &env).as_hours(), 2);
        assert_eq!(berlin.compare(&utc, &env), Ordering::Less);
    }

    #[test]
    fn converts_to_and_from_values() {
        let value = Value::parse(ValueKind::DateTime, "20250102T030405Z").expect("Failed to parse");
        let time = CalTime::from_value(&value, Some("Europe/Berlin")).expect("Not a time");
        assert!(time.is_utc(), "UTC values ignore TZID");
        assert_eq!(time.to_value(), value);

        let date = CalTime::from_date(date(2025, 1, 2));
        assert!(date.is_date());
        assert_eq!(date.to_value().to_string(), "20250102");
        assert_eq!(date.to_string(), "20250102");
    }

    #[test]
    fn spans_overlap_and_clip() {
        let ts = |h| {
            datetime(2025, 1, 1, h, 0, 0, 0)
                .to_zoned(TimeZone::UTC)
                .expect("Failed to resolve")
                .timestamp()
        };
        let span = Span {
            start: ts(9),
            end: ts(11),
            is_busy: true,
        };
        assert!(span.overlaps(ts(10), ts(12)));
        assert!(!span.overlaps(ts(11), ts(12)));

        let clipped = span.clip(ts(10), ts(12));
        assert_eq!((clipped.start, clipped.end), (ts(10), ts(11)));
    }
}
