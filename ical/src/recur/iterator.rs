// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Lazy expansion of a recurrence rule into instances.
//!
//! Daily and longer periods of the rule's frequency are walked in the
//! wall-clock time of `DTSTART`; hourly and shorter periods step on the
//! absolute timeline, so a daylight saving change neither repeats nor drops
//! an instance. Each period is expanded into a candidate set by the BY-rule
//! parts, narrowed by `BYSETPOS`, and drained in order.

use std::collections::VecDeque;

use jiff::civil::{Date, DateTime, Time, Weekday};
use jiff::tz::TimeZone;
use jiff::{SignedDuration, Span as JiffSpan, Timestamp};

use crate::environment::{ByRulePolicy, Environment};
use crate::error::Error;
use crate::keyword::{
    KW_RRULE_BYDAY, KW_RRULE_BYMONTHDAY, KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY,
};
use crate::recur::rule::{Frequency, MonthNum, RecurrenceRule, Until, WeekdayNum};
use crate::time::{CalTime, to_timestamp};

/// Where an iterator stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IteratorState {
    /// Nothing returned yet
    Initialized,
    /// The last instance returned
    Positioned(CalTime),
    /// No further instances; stays so
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
enum Bound {
    Date(Date),
    Civil(DateTime),
    Instant(Timestamp),
}

/// A wall-clock time and the instant it stands for in the iteration zone.
///
/// The two disagree only on the second pass through a repeated hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Moment {
    civil: DateTime,
    instant: Timestamp,
}

impl Moment {
    fn resolve(civil: DateTime, tz: &TimeZone) -> Self {
        Self {
            civil,
            instant: to_timestamp(civil, tz),
        }
    }

    fn at(instant: Timestamp, tz: &TimeZone) -> Self {
        Self {
            civil: instant.to_zoned(tz.clone()).datetime(),
            instant,
        }
    }
}

/// How far the next period may jump when the current one failed a filter
/// coarser than the frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    None,
    NextDay,
    NextHour,
    NextMinute,
}

/// Iterator over the instances of a recurrence rule.
///
/// The first instance is always `DTSTART` itself, counted toward `COUNT`.
/// Later instances are strictly increasing by instant. The iterator stops after
/// `COUNT` instances, at the first instance past `UNTIL`, when dates leave
/// the supported range, or after the environment's bound of consecutive
/// periods without any instance.
#[derive(Debug, Clone)]
pub struct RecurrenceIterator {
    rule: RecurrenceRule,
    dtstart: CalTime,
    tz: TimeZone,
    until: Option<Bound>,
    hours: Vec<i8>,
    minutes: Vec<i8>,
    seconds: Vec<i8>,
    state: IteratorState,
    period: Option<Moment>,
    pending: VecDeque<Moment>,
    last: Timestamp,
    emitted: u32,
    idle_periods: u32,
    max_idle_periods: u32,
}

impl RecurrenceIterator {
    /// Prepares iteration of `rule` starting at `dtstart`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] when a part is out of range, or when
    /// a BY-rule part is invalid for the frequency and the environment's
    /// [`ByRulePolicy`] is `Reject`.
    pub fn new(rule: &RecurrenceRule, dtstart: &CalTime, env: &Environment) -> Result<Self, Error> {
        rule.validate()?;
        let rule = normalize(rule, dtstart, env.by_rule_policy())?;
        let start = dtstart.civil();
        let tz = dtstart.time_zone(env);

        let until = rule.until().map(|until| match until {
            Until::Date(date) => Bound::Date(date.civil()),
            Until::DateTime(dt) if dt.is_utc() => {
                Bound::Instant(to_timestamp(dt.civil(), &TimeZone::UTC))
            }
            Until::DateTime(dt) => Bound::Civil(dt.civil()),
        });

        let sorted = |values: &[u8]| {
            let mut values: Vec<i8> = values.iter().filter_map(|v| i8::try_from(*v).ok()).collect();
            values.sort_unstable();
            values.dedup();
            values
        };

        Ok(Self {
            hours: sorted(&rule.by_hour),
            minutes: sorted(&rule.by_minute),
            seconds: sorted(&rule.by_second),
            period: Some(Moment::resolve(period_start(rule.freq, start, rule.week_start), &tz)),
            last: to_timestamp(start, &tz),
            tz,
            until,
            rule,
            dtstart: dtstart.clone(),
            state: IteratorState::Initialized,
            pending: VecDeque::new(),
            emitted: 0,
            idle_periods: 0,
            max_idle_periods: env.max_idle_periods(),
        })
    }

    /// The rule being expanded, after implicit parts were filled in.
    #[must_use]
    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &IteratorState {
        &self.state
    }

    /// Returns the next instance, or `None` once exhausted.
    pub fn next_instance(&mut self) -> Option<CalTime> {
        loop {
            match self.state {
                IteratorState::Exhausted => return None,
                IteratorState::Initialized => {
                    self.emitted = 1;
                    self.state = IteratorState::Positioned(self.dtstart.clone());
                    return Some(self.dtstart.clone());
                }
                IteratorState::Positioned(_) => {}
            }

            if self.rule.count().is_some_and(|count| self.emitted >= count) {
                return self.exhaust();
            }

            if let Some(candidate) = self.pending.pop_front() {
                if self.beyond_until(candidate) {
                    return self.exhaust();
                }
                self.emitted += 1;
                self.last = candidate.instant;
                let instance = self.instance_at(candidate);
                self.state = IteratorState::Positioned(instance.clone());
                return Some(instance);
            }

            if !self.refill() {
                return self.exhaust();
            }
        }
    }

    fn instance_at(&self, moment: Moment) -> CalTime {
        // The later pass through a repeated hour has no wall-clock form in its zone
        if !self.dtstart.is_date() && to_timestamp(moment.civil, &self.tz) != moment.instant {
            return CalTime::from_timestamp(moment.instant);
        }
        self.dtstart.with_civil(moment.civil)
    }

    fn exhaust(&mut self) -> Option<CalTime> {
        self.state = IteratorState::Exhausted;
        self.pending.clear();
        None
    }

    /// Expands the next period into `pending`. Returns `false` when no period is left.
    fn refill(&mut self) -> bool {
        let Some(period) = self.period else {
            return false;
        };

        if self.idle_periods >= self.max_idle_periods {
            tracing::warn!(
                rule = %self.rule,
                periods = self.idle_periods,
                "recurrence rule produced no instance for too many periods, stopping"
            );
            return false;
        }

        // Week-numbered years may start in the previous calendar year
        let week_numbered = self.rule.freq == Frequency::Yearly && !self.rule.by_week_no.is_empty();
        if !week_numbered && self.beyond_until(period) {
            return false;
        }

        let (candidates, skip) = self.expand(period);
        let before = self.pending.len();
        let last = self.last;
        self.pending
            .extend(candidates.into_iter().filter(|candidate| candidate.instant > last));

        if self.pending.len() == before {
            self.idle_periods += 1;
        } else {
            self.idle_periods = 0;
        }

        self.period = self.next_period(period, skip);
        true
    }

    fn beyond_until(&self, candidate: Moment) -> bool {
        match self.until {
            None => false,
            Some(Bound::Date(date)) => candidate.civil.date() > date,
            Some(Bound::Civil(until)) => candidate.civil > until,
            Some(Bound::Instant(until)) => candidate.instant > until,
        }
    }

    fn next_period(&self, period: Moment, skip: Skip) -> Option<Moment> {
        let interval = i64::from(self.rule.interval);
        let calendar_step = match self.rule.freq {
            Frequency::Yearly => Some(JiffSpan::new().try_years(interval)),
            Frequency::Monthly => Some(JiffSpan::new().try_months(interval)),
            Frequency::Weekly => Some(JiffSpan::new().try_weeks(interval)),
            Frequency::Daily => Some(JiffSpan::new().try_days(interval)),
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly => None,
        };
        if let Some(step) = calendar_step {
            let civil = period.civil.checked_add(step.ok()?).ok()?;
            return Some(Moment::resolve(civil, &self.tz));
        }

        let unit = match self.rule.freq {
            Frequency::Hourly => 3600,
            Frequency::Minutely => 60,
            _ => 1,
        };

        let step = interval.checked_mul(unit)?;
        let civil = period.civil;
        let boundary = match skip {
            Skip::None => None,
            Skip::NextDay => civil.date().tomorrow().ok().map(|d| d.to_datetime(Time::midnight())),
            Skip::NextHour => civil
                .with()
                .minute(0)
                .second(0)
                .build()
                .ok()
                .and_then(|dt| dt.checked_add(SignedDuration::from_hours(1)).ok()),
            Skip::NextMinute => civil
                .with()
                .second(0)
                .build()
                .ok()
                .and_then(|dt| dt.checked_add(SignedDuration::from_mins(1)).ok()),
        };

        let steps = match boundary {
            Some(boundary) => {
                let gap = period
                    .instant
                    .duration_until(to_timestamp(boundary, &self.tz))
                    .as_secs();
                ((gap + step - 1) / step).max(1)
            }
            None if skip == Skip::None => 1,
            None => return None,
        };
        let instant = period
            .instant
            .checked_add(SignedDuration::from_secs(steps.checked_mul(step)?))
            .ok()?;
        Some(Moment::at(instant, &self.tz))
    }

    /// Candidate instances of one period, sorted, before the `DTSTART` and
    /// progress filters.
    fn expand(&self, period: Moment) -> (Vec<Moment>, Skip) {
        let rule = &self.rule;
        let anchor = period;
        let period = period.civil;
        let sub_daily = matches!(
            rule.freq,
            Frequency::Hourly | Frequency::Minutely | Frequency::Secondly
        );

        let dates: Vec<Date> = match rule.freq {
            Frequency::Yearly if !rule.by_week_no.is_empty() => {
                self.week_numbered_dates(period.year())
            }
            Frequency::Yearly => {
                let first = period.date().first_of_year();
                days_from(first, usize::try_from(first.days_in_year()).unwrap_or(0))
            }
            Frequency::Monthly => {
                let first = period.date().first_of_month();
                days_from(first, usize::try_from(first.days_in_month()).unwrap_or(0))
            }
            Frequency::Weekly => days_from(period.date(), 7),
            _ => vec![period.date()],
        };
        let dates: Vec<Date> = dates.into_iter().filter(|d| self.date_matches(*d)).collect();
        if dates.is_empty() {
            return (Vec::new(), if sub_daily { Skip::NextDay } else { Skip::None });
        }

        let times = if self.dtstart.is_date() {
            vec![Time::midnight()]
        } else {
            let start = self.dtstart.civil();
            let fixed = |current: i8, by: &[i8]| match by.is_empty() || by.contains(&current) {
                true => vec![current],
                false => Vec::new(),
            };
            let free = |default: i8, by: &[i8]| match by.is_empty() {
                true => vec![default],
                false => by.to_vec(),
            };

            let hours = match sub_daily {
                true => fixed(period.hour(), &self.hours),
                false => free(start.hour(), &self.hours),
            };
            if hours.is_empty() {
                return (Vec::new(), Skip::NextHour);
            }
            let minutes = match rule.freq {
                Frequency::Minutely | Frequency::Secondly => fixed(period.minute(), &self.minutes),
                _ => free(start.minute(), &self.minutes),
            };
            if minutes.is_empty() {
                return (Vec::new(), Skip::NextMinute);
            }
            let seconds = match rule.freq {
                Frequency::Secondly => fixed(period.second(), &self.seconds),
                _ => free(start.second(), &self.seconds),
            };

            let mut times = Vec::with_capacity(hours.len() * minutes.len() * seconds.len());
            for &h in &hours {
                for &m in &minutes {
                    // Leap seconds (60) do not exist on the civil clock
                    times.extend(seconds.iter().filter_map(|&s| Time::new(h, m, s, 0).ok()));
                }
            }
            times
        };

        let mut set: Vec<DateTime> = dates
            .iter()
            .flat_map(|date| times.iter().map(|time| date.to_datetime(*time)))
            .collect();
        set.sort_unstable();
        set.dedup();

        if !rule.by_set_pos.is_empty() {
            let len = i32::try_from(set.len()).unwrap_or(i32::MAX);
            let mut picked: Vec<DateTime> = rule
                .by_set_pos
                .iter()
                .filter_map(|&pos| {
                    let pos = i32::from(pos);
                    let index = if pos > 0 { pos - 1 } else { len + pos };
                    usize::try_from(index).ok().and_then(|i| set.get(i)).copied()
                })
                .collect();
            picked.sort_unstable();
            picked.dedup();
            set = picked;
        }

        // Sub-daily candidates keep the offset of their period
        let moments = set
            .into_iter()
            .filter_map(|civil| match sub_daily {
                true => anchor
                    .instant
                    .checked_add(anchor.civil.duration_until(civil))
                    .ok()
                    .map(|instant| Moment { civil, instant }),
                false => Some(Moment::resolve(civil, &self.tz)),
            })
            .collect();
        (moments, Skip::None)
    }

    fn date_matches(&self, date: Date) -> bool {
        let rule = &self.rule;

        if !rule.by_month.is_empty()
            && !rule
                .by_month
                .iter()
                .any(|m| !m.leap && i8::try_from(m.month).is_ok_and(|month| month == date.month()))
        {
            return false;
        }

        if !rule.by_year_day.is_empty() {
            let (day, len) = (date.day_of_year(), date.days_in_year());
            if !rule.by_year_day.iter().any(|&n| ordinal_matches(n, day, len)) {
                return false;
            }
        }

        if !rule.by_month_day.is_empty() {
            let (day, len) = (i16::from(date.day()), i16::from(date.days_in_month()));
            if !rule
                .by_month_day
                .iter()
                .any(|&n| ordinal_matches(i16::from(n), day, len))
            {
                return false;
            }
        }

        rule.by_day.is_empty() || rule.by_day.iter().any(|wd| self.weekday_matches(*wd, date))
    }

    fn weekday_matches(&self, weekday: WeekdayNum, date: Date) -> bool {
        if date.weekday() != weekday.weekday {
            return false;
        }
        let Some(ordinal) = weekday.ordinal else {
            return true;
        };

        let within_month = self.rule.freq == Frequency::Monthly || !self.rule.by_month.is_empty();
        let (index, len) = match within_month {
            true => (i16::from(date.day()), i16::from(date.days_in_month())),
            false => (date.day_of_year(), date.days_in_year()),
        };
        let ordinal = i16::from(ordinal);
        match ordinal > 0 {
            true => (index - 1) / 7 + 1 == ordinal,
            false => (len - index) / 7 + 1 == -ordinal,
        }
    }

    /// Days of the week-numbering `year` whose week number is selected.
    fn week_numbered_dates(&self, year: i16) -> Vec<Date> {
        let wkst = self.rule.week_start;
        let (Some(start), Some(next)) = (
            week_one_start(year, wkst),
            year.checked_add(1).and_then(|next| week_one_start(next, wkst)),
        ) else {
            return Vec::new();
        };

        let days: Vec<Date> = start
            .series(JiffSpan::new().days(1))
            .take_while(|d| *d < next)
            .collect();
        let weeks = i32::try_from(days.len() / 7).unwrap_or(0);

        days.into_iter()
            .enumerate()
            .filter(|(i, _)| {
                let week = i32::try_from(i / 7 + 1).unwrap_or(0);
                self.rule.by_week_no.iter().any(|&n| {
                    let n = i32::from(n);
                    n == week || n == week - weeks - 1
                })
            })
            .map(|(_, d)| d)
            .collect()
    }
}

impl Iterator for RecurrenceIterator {
    type Item = CalTime;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_instance()
    }
}

fn ordinal_matches(n: i16, index: i16, len: i16) -> bool {
    if n > 0 { n == index } else { len + n + 1 == index }
}

fn days_from(first: Date, n: usize) -> Vec<Date> {
    first.series(JiffSpan::new().days(1)).take(n).collect()
}

/// First day of week 1: the first week starting on `wkst` with at least
/// four days in `year`.
fn week_one_start(year: i16, wkst: Weekday) -> Option<Date> {
    let jan1 = Date::new(year, 1, 1).ok()?;
    let offset = i64::from(jan1.weekday().since(wkst));
    let delta = if offset <= 3 { -offset } else { 7 - offset };
    jan1.checked_add(JiffSpan::new().days(delta)).ok()
}

/// The start of the period of `freq` that contains `start`.
fn period_start(freq: Frequency, start: DateTime, wkst: Weekday) -> DateTime {
    let date = start.date();
    let midnight = |d: Date| d.to_datetime(Time::midnight());
    match freq {
        Frequency::Yearly => midnight(date.first_of_year()),
        Frequency::Monthly => midnight(date.first_of_month()),
        Frequency::Weekly => {
            let back = i64::from(date.weekday().since(wkst));
            midnight(date.checked_sub(JiffSpan::new().days(back)).unwrap_or(date))
        }
        Frequency::Daily => midnight(date),
        Frequency::Hourly => start
            .with()
            .minute(0)
            .second(0)
            .subsec_nanosecond(0)
            .build()
            .unwrap_or(start),
        Frequency::Minutely => start
            .with()
            .second(0)
            .subsec_nanosecond(0)
            .build()
            .unwrap_or(start),
        Frequency::Secondly => start,
    }
}

fn invalid_part(policy: ByRulePolicy, freq: Frequency, part: &str) -> Result<(), Error> {
    match policy {
        ByRulePolicy::Reject => Err(Error::malformed(format!(
            "{part} is not valid with FREQ={freq}"
        ))),
        ByRulePolicy::Ignore => {
            tracing::debug!(part, %freq, "ignoring rule part that is invalid for the frequency");
            Ok(())
        }
    }
}

/// Applies the BY-rule policy and fills in the parts implied by `DTSTART`.
fn normalize(
    rule: &RecurrenceRule,
    dtstart: &CalTime,
    policy: ByRulePolicy,
) -> Result<RecurrenceRule, Error> {
    let mut rule = rule.clone();
    let freq = rule.freq;

    if !rule.by_week_no.is_empty() && freq != Frequency::Yearly {
        invalid_part(policy, freq, KW_RRULE_BYWEEKNO)?;
        rule.by_week_no.clear();
    }
    if !rule.by_year_day.is_empty()
        && matches!(freq, Frequency::Daily | Frequency::Weekly | Frequency::Monthly)
    {
        invalid_part(policy, freq, KW_RRULE_BYYEARDAY)?;
        rule.by_year_day.clear();
    }
    if !rule.by_month_day.is_empty() && freq == Frequency::Weekly {
        invalid_part(policy, freq, KW_RRULE_BYMONTHDAY)?;
        rule.by_month_day.clear();
    }

    let ordinals_allowed = freq == Frequency::Monthly
        || (freq == Frequency::Yearly && rule.by_week_no.is_empty());
    if !ordinals_allowed && rule.by_day.iter().any(|d| d.ordinal.is_some()) {
        invalid_part(policy, freq, KW_RRULE_BYDAY)?;
        for day in &mut rule.by_day {
            day.ordinal = None;
        }
        rule.by_day.dedup();
    }

    if !rule.by_set_pos.is_empty() && !rule.has_by_parts() {
        invalid_part(policy, freq, KW_RRULE_BYSETPOS)?;
        rule.by_set_pos.clear();
    }

    let start = dtstart.civil();
    let no_day_parts = rule.by_year_day.is_empty()
        && rule.by_month_day.is_empty()
        && rule.by_day.is_empty();
    if no_day_parts && rule.by_week_no.is_empty() {
        match freq {
            Frequency::Yearly => {
                if rule.by_month.is_empty() {
                    let month = u8::try_from(start.month()).unwrap_or(1);
                    rule.by_month = vec![MonthNum::from(month)];
                }
                rule.by_month_day = vec![start.day()];
            }
            Frequency::Monthly => rule.by_month_day = vec![start.day()],
            Frequency::Weekly => rule.by_day = vec![WeekdayNum::every(start.weekday())],
            _ => {}
        }
    } else if no_day_parts {
        rule.by_day = vec![WeekdayNum::every(start.weekday())];
    }

    Ok(rule)
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;

    fn expand(rule: &str, dtstart: CalTime, max: usize) -> Vec<DateTime> {
        let rule: RecurrenceRule = rule.parse().expect("Failed to parse rule");
        let env = Environment::new();
        RecurrenceIterator::new(&rule, &dtstart, &env)
            .expect("Failed to build iterator")
            .take(max)
            .map(|t| t.civil())
            .collect()
    }

    fn at(y: i16, m: i8, d: i8, h: i8, min: i8) -> DateTime {
        datetime(y, m, d, h, min, 0, 0)
    }

    #[test]
    fn daily_with_count() {
        let got = expand("FREQ=DAILY;COUNT=3", CalTime::utc(at(2025, 1, 1, 0, 0)), 10);
        assert_eq!(got, vec![at(2025, 1, 1, 0, 0), at(2025, 1, 2, 0, 0), at(2025, 1, 3, 0, 0)]);
    }

    #[test]
    fn dtstart_is_first_even_when_rule_does_not_match_it() {
        // 2025-01-01 is a Wednesday
        let got = expand("FREQ=WEEKLY;BYDAY=TU;COUNT=2", CalTime::utc(at(2025, 1, 1, 9, 0)), 10);
        assert_eq!(got, vec![at(2025, 1, 1, 9, 0), at(2025, 1, 7, 9, 0)]);
    }

    #[test]
    fn monthly_by_month_day_skips_short_months() {
        let got = expand("FREQ=MONTHLY;BYMONTHDAY=30;COUNT=3", CalTime::floating(at(2025, 1, 30, 8, 0)), 10);
        assert_eq!(got, vec![at(2025, 1, 30, 8, 0), at(2025, 3, 30, 8, 0), at(2025, 4, 30, 8, 0)]);
    }

    #[test]
    fn monthly_default_day_skips_missing_dates() {
        let got = expand("FREQ=MONTHLY;COUNT=3", CalTime::floating(at(2025, 1, 31, 8, 0)), 10);
        assert_eq!(got, vec![at(2025, 1, 31, 8, 0), at(2025, 3, 31, 8, 0), at(2025, 5, 31, 8, 0)]);
    }

    #[test]
    fn until_is_inclusive() {
        let got = expand(
            "FREQ=DAILY;UNTIL=20250103T090000Z",
            CalTime::utc(at(2025, 1, 1, 9, 0)),
            10,
        );
        assert_eq!(got.len(), 3);

        let got = expand("FREQ=DAILY;UNTIL=20250103", CalTime::from_date(date(2025, 1, 1)), 10);
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn last_weekday_of_month_with_set_pos() {
        // Last work day of the month
        let got = expand(
            "FREQ=MONTHLY;BYDAY=MO,TU,WE,TH,FR;BYSETPOS=-1;COUNT=3",
            CalTime::floating(at(2025, 1, 31, 17, 0)),
            10,
        );
        assert_eq!(got, vec![at(2025, 1, 31, 17, 0), at(2025, 2, 28, 17, 0), at(2025, 3, 31, 17, 0)]);
    }

    #[test]
    fn yearly_nth_weekday() {
        // US Thanksgiving: fourth Thursday of November
        let got = expand(
            "FREQ=YEARLY;BYMONTH=11;BYDAY=4TH;COUNT=3",
            CalTime::floating(at(2024, 11, 28, 12, 0)),
            10,
        );
        assert_eq!(got, vec![at(2024, 11, 28, 12, 0), at(2025, 11, 27, 12, 0), at(2026, 11, 26, 12, 0)]);
    }

    #[test]
    fn yearly_week_number() {
        // Monday of ISO week 1; 2026-W01 starts on 2025-12-29
        let got = expand(
            "FREQ=YEARLY;BYWEEKNO=1;BYDAY=MO;COUNT=3",
            CalTime::floating(at(2024, 12, 30, 0, 0)),
            10,
        );
        assert_eq!(got, vec![at(2024, 12, 30, 0, 0), at(2025, 12, 29, 0, 0), at(2027, 1, 4, 0, 0)]);
    }

    #[test]
    fn hourly_with_by_hour_jumps_ahead() {
        let got = expand(
            "FREQ=HOURLY;INTERVAL=5;BYHOUR=9,10;COUNT=4",
            CalTime::floating(at(2025, 1, 1, 9, 0)),
            10,
        );
        // 09:00, then every 5 hours: 14, 19, 00, 05, 10, ...
        assert_eq!(got[1], at(2025, 1, 2, 10, 0));
        assert_eq!(got.len(), 4);
    }

    #[test]
    fn leap_months_never_match() {
        let rule: RecurrenceRule = "FREQ=YEARLY;BYMONTH=5L".parse().expect("Failed to parse rule");
        let env = Environment::new().with_max_idle_periods(20);
        let mut iter = RecurrenceIterator::new(&rule, &CalTime::floating(at(2025, 5, 1, 0, 0)), &env)
            .expect("Failed to build iterator");
        assert_eq!(iter.next().map(|t| t.civil()), Some(at(2025, 5, 1, 0, 0)));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.state(), &IteratorState::Exhausted);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn invalid_by_parts_follow_policy() {
        let rule: RecurrenceRule = "FREQ=DAILY;BYWEEKNO=3;COUNT=2".parse().expect("Failed to parse");
        let start = CalTime::floating(at(2025, 1, 1, 0, 0));

        let err = RecurrenceIterator::new(&rule, &start, &Environment::new())
            .expect_err("Reject policy should refuse the rule");
        assert_eq!(err.kind(), crate::ErrorKind::MalformedData);

        let env = Environment::new().with_by_rule_policy(ByRulePolicy::Ignore);
        let got: Vec<_> = RecurrenceIterator::new(&rule, &start, &env)
            .expect("Ignore policy should drop the part")
            .map(|t| t.civil())
            .collect();
        assert_eq!(got, vec![at(2025, 1, 1, 0, 0), at(2025, 1, 2, 0, 0)]);
    }

    #[test]
    fn set_pos_alone_is_invalid() {
        let rule: RecurrenceRule = "FREQ=MONTHLY;BYSETPOS=1".parse().expect("Failed to parse");
        let start = CalTime::floating(at(2025, 1, 1, 0, 0));
        assert!(RecurrenceIterator::new(&rule, &start, &Environment::new()).is_err());
    }

    #[test]
    fn zoned_instances_keep_wall_clock() {
        let start = CalTime::zoned(at(2025, 3, 8, 9, 0), "America/New_York");
        let got = expand("FREQ=DAILY;COUNT=2", start, 10);
        assert_eq!(got, vec![at(2025, 3, 8, 9, 0), at(2025, 3, 9, 9, 0)]);
    }

    #[test]
    fn reports_state() {
        let rule: RecurrenceRule = "FREQ=DAILY;COUNT=1".parse().expect("Failed to parse rule");
        let start = CalTime::utc(at(2025, 1, 1, 0, 0));
        let mut iter = RecurrenceIterator::new(&rule, &start, &Environment::new())
            .expect("Failed to build iterator");
        assert_eq!(iter.state(), &IteratorState::Initialized);
        assert_eq!(iter.next(), Some(start.clone()));
        assert_eq!(iter.state(), &IteratorState::Positioned(start));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.state(), &IteratorState::Exhausted);
    }
}
