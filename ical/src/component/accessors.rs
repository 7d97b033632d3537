// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Typed getters and setters for the common properties.
//!
//! They act on [`Component::get_inner`]: called on a VCALENDAR they read and
//! write its first VEVENT, VTODO or VJOURNAL.

use jiff::civil;

use crate::component::{Component, ComponentKind};
use crate::environment::Environment;
use crate::error::Error;
use crate::keyword::{KW_STATUS_CANCELLED, KW_STATUS_TENTATIVE, KW_TRANSP_TRANSPARENT};
use crate::parameter::Parameter;
use crate::property::{Property, PropertyKind};
use crate::time::{CalTime, Span};
use crate::value::{Value, ValueDuration};

impl Component {
    /// `DTSTART`.
    #[must_use]
    pub fn dtstart(&self) -> Option<CalTime> {
        self.inner().time_of(PropertyKind::DtStart)
    }

    /// Replaces `DTSTART`, writing a `TZID` for a zoned time.
    pub fn set_dtstart(&mut self, time: &CalTime) {
        self.inner_mut().set_single(time_property(PropertyKind::DtStart, time));
    }

    /// End of a VEVENT: `DTEND`, else `DTSTART + DURATION`.
    ///
    /// A VEVENT with only a `DTSTART` has no end. Days and weeks of the
    /// duration are nominal, hours, minutes and seconds exact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadArgument`] when the computed end is out of range.
    pub fn dtend(&self, env: &Environment) -> Result<Option<CalTime>, Error> {
        self.inner().end_of(PropertyKind::DtEnd, env)
    }

    /// Sets `DTEND`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] if the component has a `DURATION`;
    /// the caller removes it first.
    pub fn set_dtend(&mut self, time: &CalTime) -> Result<(), Error> {
        let inner = self.inner_mut();
        if inner.first_property(PropertyKind::Duration).is_some() {
            return Err(Error::malformed("DTEND cannot be set next to DURATION"));
        }
        inner.set_single(time_property(PropertyKind::DtEnd, time));
        Ok(())
    }

    /// Due time of a VTODO: `DUE`, else `DTSTART + DURATION`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadArgument`] when the computed time is out of range.
    pub fn due(&self, env: &Environment) -> Result<Option<CalTime>, Error> {
        self.inner().end_of(PropertyKind::Due, env)
    }

    /// Sets the due time. With a `DURATION` present the duration is
    /// recomputed instead, so that `DTSTART + DURATION` lands on `time`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] if a `DURATION` is present without a
    /// `DTSTART` to measure from.
    pub fn set_due(&mut self, time: &CalTime, env: &Environment) -> Result<(), Error> {
        let inner = self.inner_mut();
        if inner.first_property(PropertyKind::Due).is_none()
            && inner.first_property(PropertyKind::Duration).is_some()
        {
            let start = inner
                .dtstart()
                .ok_or_else(|| Error::malformed("DURATION without DTSTART"))?;
            let duration = difference(&start, time, env);
            inner.set_single(Property::with_value(PropertyKind::Duration, duration));
            return Ok(());
        }
        inner.set_single(time_property(PropertyKind::Due, time));
        Ok(())
    }

    /// `DURATION`, or the distance from `DTSTART` to `DTEND`/`DUE`.
    ///
    /// Two DATE values give a nominal number of days, anything else the
    /// exact elapsed time.
    #[must_use]
    pub fn duration(&self, env: &Environment) -> Option<ValueDuration> {
        let inner = self.inner();
        if let Some(duration) = inner
            .first_property(PropertyKind::Duration)
            .and_then(Property::value)
            .and_then(Value::as_duration)
        {
            return Some(duration);
        }
        let start = inner.dtstart()?;
        let end = inner
            .time_of(inner.end_kind())
            .or_else(|| inner.time_of(PropertyKind::DtEnd))?;
        Some(difference(&start, &end, env))
    }

    /// Sets `DURATION`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] if the component has a `DTEND` or
    /// `DUE`; the caller removes it first.
    pub fn set_duration(&mut self, duration: ValueDuration) -> Result<(), Error> {
        let inner = self.inner_mut();
        if inner.first_property(PropertyKind::DtEnd).is_some()
            || inner.first_property(PropertyKind::Due).is_some()
        {
            return Err(Error::malformed("DURATION cannot be set next to DTEND or DUE"));
        }
        inner.set_single(Property::with_value(PropertyKind::Duration, duration));
        Ok(())
    }

    /// `UID`.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.inner().text_of(PropertyKind::Uid)
    }

    /// Replaces `UID`.
    pub fn set_uid(&mut self, uid: impl Into<String>) {
        let prop = Property::with_value(PropertyKind::Uid, Value::Text(uid.into()));
        self.inner_mut().set_single(prop);
    }

    /// `SUMMARY`.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.inner().text_of(PropertyKind::Summary)
    }

    /// Replaces `SUMMARY`.
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        let prop = Property::with_value(PropertyKind::Summary, Value::Text(summary.into()));
        self.inner_mut().set_single(prop);
    }

    /// `SEQUENCE`.
    #[must_use]
    pub fn sequence(&self) -> Option<i32> {
        self.inner()
            .first_property(PropertyKind::Sequence)?
            .value()?
            .as_integer()
    }

    /// Replaces `SEQUENCE`.
    pub fn set_sequence(&mut self, sequence: i32) {
        let prop = Property::with_value(PropertyKind::Sequence, Value::Integer(sequence));
        self.inner_mut().set_single(prop);
    }

    /// `RECURRENCE-ID`.
    #[must_use]
    pub fn recurrence_id(&self) -> Option<CalTime> {
        self.inner().time_of(PropertyKind::RecurrenceId)
    }

    /// Replaces `RECURRENCE-ID`.
    pub fn set_recurrence_id(&mut self, time: &CalTime) {
        self.inner_mut().set_single(time_property(PropertyKind::RecurrenceId, time));
    }

    /// `DTSTAMP`.
    #[must_use]
    pub fn dtstamp(&self) -> Option<CalTime> {
        self.inner().time_of(PropertyKind::DtStamp)
    }

    /// Replaces `DTSTAMP`.
    pub fn set_dtstamp(&mut self, time: &CalTime) {
        self.inner_mut().set_single(time_property(PropertyKind::DtStamp, time));
    }

    /// `STATUS`.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.inner().text_of(PropertyKind::Status)
    }

    /// `RELCALID`, the calendar id a VAGENDA is stored under.
    #[must_use]
    pub fn relcalid(&self) -> Option<&str> {
        self.inner().text_of(PropertyKind::RelCalId)
    }

    /// Replaces `RELCALID`.
    pub fn set_relcalid(&mut self, id: impl Into<String>) {
        let prop = Property::with_value(PropertyKind::RelCalId, Value::Text(id.into()));
        self.inner_mut().set_single(prop);
    }

    /// Whether the component blocks time: not `TRANSP:TRANSPARENT`, and its
    /// `STATUS` neither `CANCELLED` nor `TENTATIVE`.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        let inner = self.inner();
        let transparent = inner
            .text_of(PropertyKind::Transp)
            .is_some_and(|t| t.eq_ignore_ascii_case(KW_TRANSP_TRANSPARENT));
        let tentative = inner.status().is_some_and(|s| {
            s.eq_ignore_ascii_case(KW_STATUS_CANCELLED) || s.eq_ignore_ascii_case(KW_STATUS_TENTATIVE)
        });
        !transparent && !tentative
    }

    /// Absolute time covered by a VEVENT, VTODO, VJOURNAL or VFREEBUSY.
    ///
    /// A DATE start without end covers that whole day. A DATE-TIME start
    /// without end has no span.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadArgument`] when the end is out of range.
    pub fn get_span(&self, env: &Environment) -> Result<Option<Span>, Error> {
        let inner = self.inner();
        if !matches!(
            inner.kind(),
            ComponentKind::VEvent
                | ComponentKind::VTodo
                | ComponentKind::VJournal
                | ComponentKind::VFreeBusy
        ) {
            return Ok(None);
        }
        let Some(start) = inner.dtstart() else {
            return Ok(None);
        };
        let end = match inner.end_of(inner.end_kind(), env)? {
            Some(end) => end,
            None if start.is_date() => start.add_duration(one_day(), env)?,
            None => return Ok(None),
        };
        Ok(Some(Span {
            start: start.instant(env),
            end: end.instant(env),
            is_busy: inner.is_busy(),
        }))
    }

    fn inner(&self) -> &Component {
        self.get_inner().unwrap_or(self)
    }

    fn inner_mut(&mut self) -> &mut Component {
        let index = if self.kind().is_container() {
            self.components.iter().position(|c| c.kind().is_real())
        } else {
            None
        };
        match index {
            #[expect(clippy::indexing_slicing)]
            Some(i) => &mut self.components[i],
            None => self,
        }
    }

    fn end_kind(&self) -> PropertyKind {
        if self.kind() == ComponentKind::VTodo {
            PropertyKind::Due
        } else {
            PropertyKind::DtEnd
        }
    }

    fn time_of(&self, kind: PropertyKind) -> Option<CalTime> {
        CalTime::from_property(self.first_property(kind)?)
    }

    fn text_of(&self, kind: PropertyKind) -> Option<&str> {
        self.first_property(kind)?.text()
    }

    fn end_of(&self, kind: PropertyKind, env: &Environment) -> Result<Option<CalTime>, Error> {
        if let Some(end) = self.time_of(kind) {
            return Ok(Some(end));
        }
        let duration = self
            .first_property(PropertyKind::Duration)
            .and_then(Property::value)
            .and_then(Value::as_duration);
        match (self.dtstart(), duration) {
            (Some(start), Some(duration)) => start.add_duration(duration, env).map(Some),
            _ => Ok(None),
        }
    }

    /// Replaces every property of the kind of `prop` by `prop`, keeping the
    /// position of the first one.
    fn set_single(&mut self, prop: Property) {
        let kind = prop.kind();
        match self.properties.iter().position(|p| p.kind() == kind) {
            Some(index) => {
                #[expect(clippy::indexing_slicing)]
                let slot = &mut self.properties[index];
                *slot = prop;
                let mut i = 0;
                self.properties.retain(|p| {
                    let keep = i == index || p.kind() != kind;
                    i += 1;
                    keep
                });
            }
            None => self.properties.push(prop),
        }
    }
}

/// A date-valued property for `time`, with `TZID` for a zoned time.
pub(crate) fn time_property(kind: PropertyKind, time: &CalTime) -> Property {
    let mut prop = Property::with_value(kind, time.to_value());
    if let Some(tzid) = time.tzid() {
        prop.add_parameter(Parameter::Tzid(tzid.to_string()));
    }
    prop
}

fn difference(start: &CalTime, end: &CalTime, env: &Environment) -> ValueDuration {
    if start.is_date() && end.is_date() {
        let days = days_between(start.civil_date(), end.civil_date());
        return ValueDuration::DateTime {
            positive: days >= 0,
            day: u32::try_from(days.unsigned_abs()).unwrap_or(u32::MAX),
            hour: 0,
            minute: 0,
            second: 0,
        };
    }
    ValueDuration::from_seconds(start.duration_until(end, env).as_secs())
}

fn days_between(from: civil::Date, to: civil::Date) -> i64 {
    from.until(to).map_or(0, |span| i64::from(span.get_days()))
}

const fn one_day() -> ValueDuration {
    ValueDuration::DateTime {
        positive: true,
        day: 1,
        hour: 0,
        minute: 0,
        second: 0,
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, datetime};

    use super::*;
    use crate::value::ValueKind;

    fn duration(text: &str) -> ValueDuration {
        Value::parse(ValueKind::Duration, text)
            .ok()
            .and_then(|v| v.as_duration())
            .expect("Failed to parse duration")
    }

    fn event(start: CalTime, length: &str) -> Component {
        let mut event = Component::new(ComponentKind::VEvent);
        event.set_dtstart(&start);
        event
            .set_duration(duration(length))
            .expect("Failed to set DURATION");
        event
    }

    #[test]
    fn implicit_end_across_dst_end() {
        let env = Environment::default();
        let start = CalTime::zoned(datetime(2022, 11, 5, 23, 0, 0, 0), "America/New_York");

        let nominal = event(start.clone(), "P1D");
        let end = nominal.dtend(&env).expect("Failed to compute DTEND");
        let end = end.expect("DTEND should be implicit");
        assert_eq!(end.civil(), datetime(2022, 11, 6, 23, 0, 0, 0));
        assert_eq!(start.duration_until(&end, &env).as_hours(), 25);

        let exact = event(start.clone(), "PT24H");
        let end = exact
            .dtend(&env)
            .expect("Failed to compute DTEND")
            .expect("DTEND should be implicit");
        assert_eq!(end.civil(), datetime(2022, 11, 6, 22, 0, 0, 0));
        assert_eq!(start.duration_until(&end, &env).as_hours(), 24);
    }

    #[test]
    fn vevent_without_end_has_none() {
        let env = Environment::default();
        let mut event = Component::new(ComponentKind::VEvent);
        event.set_dtstart(&CalTime::utc(datetime(2025, 1, 1, 9, 0, 0, 0)));
        assert_eq!(event.dtend(&env), Ok(None));
        assert_eq!(event.get_span(&env), Ok(None));
        assert_eq!(event.duration(&env), None);
    }

    #[test]
    fn vtodo_due_from_duration() {
        let env = Environment::default();
        let mut todo = Component::new(ComponentKind::VTodo);
        todo.set_dtstart(&CalTime::utc(datetime(2025, 1, 1, 9, 0, 0, 0)));
        todo.set_duration(duration("PT2H")).expect("Failed to set DURATION");
        let due = todo.due(&env).expect("Failed to compute DUE").expect("DUE should exist");
        assert_eq!(due.civil(), datetime(2025, 1, 1, 11, 0, 0, 0));

        let span = todo
            .get_span(&env)
            .expect("Failed to compute span")
            .expect("span should exist");
        assert_eq!(span.start.duration_until(span.end).as_hours(), 2);

        todo.set_due(&CalTime::utc(datetime(2025, 1, 1, 12, 0, 0, 0)), &env)
            .expect("Failed to set DUE");
        assert_eq!(todo.duration(&env), Some(duration("PT3H")));
        assert_eq!(todo.count_properties(PropertyKind::Due), 0);
    }

    #[test]
    fn setters_refuse_conflicts() {
        let mut event = event(CalTime::utc(datetime(2025, 1, 1, 9, 0, 0, 0)), "PT1H");
        assert!(event.set_dtend(&CalTime::utc(datetime(2025, 1, 1, 10, 0, 0, 0))).is_err());
        event.remove_properties(PropertyKind::Duration);
        event
            .set_dtend(&CalTime::utc(datetime(2025, 1, 1, 10, 0, 0, 0)))
            .expect("Failed to set DTEND");
        assert!(event.set_duration(duration("PT1H")).is_err());
    }

    #[test]
    fn accessors_look_through_vcalendar() {
        let env = Environment::default();
        let mut cal = Component::new(ComponentKind::VCalendar);
        cal.add_component(Component::new(ComponentKind::VTimezone));
        cal.add_component(Component::new(ComponentKind::VEvent));

        cal.set_uid("uid-1");
        cal.set_summary("Standup");
        cal.set_sequence(2);
        cal.set_dtstart(&CalTime::from_date(date(2025, 3, 1)));

        let event = cal.first_real_component().expect("Failed to find VEVENT");
        assert_eq!(event.uid(), Some("uid-1"));
        assert_eq!(cal.summary(), Some("Standup"));
        assert_eq!(cal.sequence(), Some(2));
        assert_eq!(cal.count_properties(PropertyKind::Any), 0);

        let span = cal
            .get_span(&env)
            .expect("Failed to compute span")
            .expect("all-day span");
        assert_eq!(span.start.duration_until(span.end).as_hours(), 24);
        assert!(span.is_busy);

        cal.set_summary("Standup (moved)");
        assert_eq!(
            cal.first_real_component()
                .map(|e| e.count_properties(PropertyKind::Summary)),
            Some(1)
        );
    }

    #[test]
    fn busy_follows_transp_and_status() {
        let mut event = Component::new(ComponentKind::VEvent);
        assert!(event.is_busy());
        event.add_property(Property::with_value(
            PropertyKind::Transp,
            Value::Text("TRANSPARENT".to_string()),
        ));
        assert!(!event.is_busy());
    }
}
