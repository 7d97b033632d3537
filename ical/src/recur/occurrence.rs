// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Occurrences of a component inside a time range, merged from `DTSTART`,
//! `RRULE` and `RDATE` and filtered by `EXDATE` and `EXRULE`.

use std::collections::{BTreeMap, BTreeSet};

use jiff::Timestamp;
use jiff::civil::Date;

use crate::component::Component;
use crate::environment::Environment;
use crate::error::Error;
use crate::property::{Property, PropertyKind};
use crate::recur::iterator::RecurrenceIterator;
use crate::time::{CalTime, Span};
use crate::value::{Value, ValueDuration, ValuePeriod};

/// One occurrence reported by [`foreach_occurrence_in_range`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    /// The start time of this instance, as a `RECURRENCE-ID` would name it
    pub recurrence_id: CalTime,
    /// Absolute time covered, clipped to the requested range
    pub span: Span,
}

/// Calls `callback` once for every occurrence of `component` overlapping
/// `[range_start, range_end)`, in chronological order.
///
/// `component` may be a VCALENDAR; its first VEVENT, VTODO or VJOURNAL is
/// expanded and passed to the callback. Occurrences come from `DTSTART`
/// (always, even when it does not match the rule), every `RRULE` and every
/// `RDATE`; an instant produced by several sources is reported once.
/// Instances matching an `EXDATE` (a DATE excludes the whole day) or an
/// `EXRULE` are dropped. Each occurrence lasts as long as the base event:
/// its `DURATION`, or the distance from `DTSTART` to `DTEND`/`DUE`, or a
/// whole day for an all-day event. An `RDATE` period carries its own end.
///
/// # Errors
///
/// A rule that cannot be expanded is reported to the environment: with
/// fatal errors it is returned, otherwise the rule is skipped.
pub fn foreach_occurrence_in_range<F>(
    component: &Component,
    range_start: Timestamp,
    range_end: Timestamp,
    env: &Environment,
    mut callback: F,
) -> Result<(), Error>
where
    F: FnMut(&Component, &Occurrence),
{
    let Some(inner) = component.get_inner() else {
        return Ok(());
    };
    let Some(dtstart) = inner.dtstart() else {
        return Ok(());
    };

    let length = base_length(inner, &dtstart, env);
    let is_busy = inner.is_busy();

    let mut starts: BTreeMap<Timestamp, (CalTime, Option<CalTime>)> = BTreeMap::new();
    starts.insert(dtstart.instant(env), (dtstart.clone(), None));

    for prop in inner.properties_of(PropertyKind::RRule) {
        let Some(rule) = prop.value().and_then(Value::as_recur) else {
            continue;
        };
        let iter = match RecurrenceIterator::new(rule, &dtstart, env) {
            Ok(iter) => iter,
            Err(err) => {
                tracing::warn!(rule = %rule, error = %err, "skipping RRULE");
                env.report(err)?;
                continue;
            }
        };
        for time in iter {
            let instant = time.instant(env);
            if instant >= range_end {
                break;
            }
            starts.entry(instant).or_insert((time, None));
        }
    }

    for prop in inner.properties_of(PropertyKind::RDate) {
        if let Some((start, end)) = rdate(prop, env)? {
            starts.entry(start.instant(env)).or_insert((start, end));
        }
    }

    let mut exclusions = ExclusionSet::new(inner, &dtstart, env)?;
    for (instant, (start, end)) in starts {
        if exclusions.excludes(instant, &start, env) {
            tracing::debug!(time = %start, "occurrence excluded");
            continue;
        }
        let end = match end {
            Some(end) => end.instant(env),
            None => start.add_duration(length, env)?.instant(env),
        };
        let span = Span {
            start: instant,
            end: end.max(instant),
            is_busy,
        };
        if span.overlaps(range_start, range_end) {
            let occurrence = Occurrence {
                recurrence_id: start,
                span: span.clip(range_start, range_end),
            };
            callback(inner, &occurrence);
        }
    }
    Ok(())
}

fn base_length(inner: &Component, dtstart: &CalTime, env: &Environment) -> ValueDuration {
    match inner.duration(env) {
        Some(duration) => duration,
        None if dtstart.is_date() => ValueDuration::DateTime {
            positive: true,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        },
        None => ValueDuration::default(),
    }
}

/// Start and, for a period, end of an `RDATE`.
fn rdate(prop: &Property, env: &Environment) -> Result<Option<(CalTime, Option<CalTime>)>, Error> {
    let Some(value) = prop.value() else {
        return Ok(None);
    };
    let Some(start) = CalTime::from_value(value, prop.tzid()) else {
        return Ok(None);
    };
    let end = match value {
        Value::Period(ValuePeriod::Explicit { end, .. }) => {
            CalTime::from_value(&Value::DateTime(*end), prop.tzid())
        }
        Value::Period(ValuePeriod::Duration { duration, .. }) => {
            Some(start.add_duration(*duration, env)?)
        }
        _ => None,
    };
    Ok(Some((start, end)))
}

/// `EXDATE` and `EXRULE` of one component, queried with increasing instants.
struct ExclusionSet {
    dates: BTreeSet<Date>,
    instants: BTreeSet<Timestamp>,
    rules: Vec<(RecurrenceIterator, Option<Timestamp>)>,
}

impl ExclusionSet {
    fn new(inner: &Component, dtstart: &CalTime, env: &Environment) -> Result<Self, Error> {
        let mut dates = BTreeSet::new();
        let mut instants = BTreeSet::new();
        for prop in inner.properties_of(PropertyKind::ExDate) {
            match CalTime::from_property(prop) {
                Some(time) if time.is_date() => {
                    dates.insert(time.civil_date());
                }
                Some(time) => {
                    instants.insert(time.instant(env));
                }
                None => {}
            }
        }

        let mut rules = Vec::new();
        for prop in inner.properties_of(PropertyKind::ExRule) {
            let Some(rule) = prop.value().and_then(Value::as_recur) else {
                continue;
            };
            match RecurrenceIterator::new(rule, dtstart, env) {
                Ok(mut iter) => {
                    let head = iter.next().map(|t| t.instant(env));
                    rules.push((iter, head));
                }
                Err(err) => {
                    tracing::warn!(rule = %rule, error = %err, "skipping EXRULE");
                    env.report(err)?;
                }
            }
        }
        Ok(Self {
            dates,
            instants,
            rules,
        })
    }

    /// Whether the occurrence at `instant` is excluded. Successive calls
    /// must pass non-decreasing instants.
    fn excludes(&mut self, instant: Timestamp, start: &CalTime, env: &Environment) -> bool {
        if self.dates.contains(&start.civil_date()) || self.instants.contains(&instant) {
            return true;
        }
        let mut excluded = false;
        for (iter, head) in &mut self.rules {
            while let Some(next) = *head {
                if next >= instant {
                    break;
                }
                *head = iter.next().map(|t| t.instant(env));
            }
            excluded |= *head == Some(instant);
        }
        excluded
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::datetime;

    use super::*;
    use crate::component::ComponentKind;
    use crate::parameter::Parameter;

    fn utc(y: i16, mo: i8, d: i8, h: i8) -> CalTime {
        CalTime::utc(datetime(y, mo, d, h, 0, 0, 0))
    }

    fn instant(y: i16, mo: i8, d: i8, h: i8) -> Timestamp {
        utc(y, mo, d, h).instant(&Environment::default())
    }

    fn recur(kind: PropertyKind, rule: &str) -> Property {
        let rule = rule.parse::<crate::recur::RecurrenceRule>().expect("Failed to parse rule");
        Property::with_value(kind, rule)
    }

    fn collect(component: &Component, start: Timestamp, end: Timestamp) -> Vec<Occurrence> {
        let env = Environment::default();
        let mut out = Vec::new();
        foreach_occurrence_in_range(component, start, end, &env, |_, o| out.push(o.clone()))
            .expect("Failed to expand occurrences");
        out
    }

    fn daily_event() -> Component {
        let mut event = Component::new(ComponentKind::VEvent);
        event.set_dtstart(&utc(2025, 1, 1, 9));
        event
            .set_dtend(&utc(2025, 1, 1, 10))
            .expect("Failed to set DTEND");
        event.add_property(recur(PropertyKind::RRule, "FREQ=DAILY;COUNT=5"));
        event
    }

    #[test]
    fn merges_and_excludes() {
        let mut event = daily_event();
        event.add_property(Property::with_value(
            PropertyKind::ExDate,
            utc(2025, 1, 2, 9).to_value(),
        ));
        event.add_property(Property::with_value(
            PropertyKind::RDate,
            utc(2025, 1, 10, 15).to_value(),
        ));
        // same instant as the third rule occurrence
        event.add_property(Property::with_value(
            PropertyKind::RDate,
            utc(2025, 1, 3, 9).to_value(),
        ));

        let got = collect(&event, instant(2025, 1, 1, 0), instant(2025, 2, 1, 0));
        let starts: Vec<_> = got.iter().map(|o| o.recurrence_id.civil()).collect();
        assert_eq!(
            starts,
            vec![
                datetime(2025, 1, 1, 9, 0, 0, 0),
                datetime(2025, 1, 3, 9, 0, 0, 0),
                datetime(2025, 1, 4, 9, 0, 0, 0),
                datetime(2025, 1, 5, 9, 0, 0, 0),
                datetime(2025, 1, 10, 15, 0, 0, 0),
            ]
        );
        for o in &got {
            assert_eq!(o.span.start.duration_until(o.span.end).as_hours(), 1);
            assert!(o.span.is_busy);
        }
    }

    #[test]
    fn zoned_exdate_matches_utc_instance() {
        let mut event = daily_event();
        let mut exdate = Property::with_value(
            PropertyKind::ExDate,
            CalTime::floating(datetime(2025, 1, 3, 4, 0, 0, 0)).to_value(),
        );
        exdate.add_parameter(Parameter::Tzid("America/New_York".to_string()));
        event.add_property(exdate);

        let got = collect(&event, instant(2025, 1, 1, 0), instant(2025, 2, 1, 0));
        assert_eq!(got.len(), 4);
        assert!(got.iter().all(|o| o.recurrence_id != utc(2025, 1, 3, 9)));
    }

    #[test]
    fn exrule_removes_instances() {
        let mut event = daily_event();
        event.add_property(recur(PropertyKind::ExRule, "FREQ=DAILY;INTERVAL=2;COUNT=3"));
        let got = collect(&event, instant(2025, 1, 1, 0), instant(2025, 2, 1, 0));
        let days: Vec<i8> = got.iter().map(|o| o.recurrence_id.civil().day()).collect();
        assert_eq!(days, vec![2, 4]);
    }

    #[test]
    fn clips_to_range() {
        let event = daily_event();
        let from = instant(2025, 1, 2, 9) + jiff::SignedDuration::from_mins(30);
        let got = collect(&event, from, instant(2025, 1, 3, 0));
        assert_eq!(got.len(), 1);
        let span = got.first().expect("one occurrence").span;
        assert_eq!(span.start.duration_until(span.end).as_mins(), 30);
    }

    #[test]
    fn all_day_dates() {
        let mut event = Component::new(ComponentKind::VEvent);
        event.set_dtstart(&CalTime::from_date(jiff::civil::date(2025, 1, 1)));
        event.add_property(recur(PropertyKind::RRule, "FREQ=WEEKLY;COUNT=3"));
        event.add_property(Property::with_value(
            PropertyKind::ExDate,
            crate::value::ValueDate {
                year: 2025,
                month: 1,
                day: 8,
            },
        ));

        let got = collect(&event, instant(2024, 12, 1, 0), instant(2025, 2, 1, 0));
        let days: Vec<i8> = got.iter().map(|o| o.recurrence_id.civil().day()).collect();
        assert_eq!(days, vec![1, 15]);
        for o in &got {
            assert_eq!(o.span.start.duration_until(o.span.end).as_hours(), 24);
        }
    }
}
