// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The RECUR value type of RFC 5545 Section 3.3.10.

use std::fmt::{self, Display};
use std::str::FromStr;

use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;
use jiff::civil::Weekday;

use crate::error::Error;
use crate::keyword::{
    KW_DAY_FR, KW_DAY_MO, KW_DAY_SA, KW_DAY_SU, KW_DAY_TH, KW_DAY_TU, KW_DAY_WE, KW_RECUR,
    KW_RRULE_BYDAY, KW_RRULE_BYHOUR, KW_RRULE_BYMINUTE, KW_RRULE_BYMONTH, KW_RRULE_BYMONTHDAY,
    KW_RRULE_BYSECOND, KW_RRULE_BYSETPOS, KW_RRULE_BYWEEKNO, KW_RRULE_BYYEARDAY, KW_RRULE_COUNT,
    KW_RRULE_FREQ, KW_RRULE_FREQ_DAILY, KW_RRULE_FREQ_HOURLY, KW_RRULE_FREQ_MINUTELY,
    KW_RRULE_FREQ_MONTHLY, KW_RRULE_FREQ_SECONDLY, KW_RRULE_FREQ_WEEKLY, KW_RRULE_FREQ_YEARLY,
    KW_RRULE_INTERVAL, KW_RRULE_UNTIL, KW_RRULE_WKST,
};
use crate::value::{
    ValueDate, ValueDateTime, ValueExpected, parse_complete, sign, value_date, value_date_time,
    value_u32,
};

impl_kind_mapping! {
    /// How often a rule repeats.
    enum Frequency {
        /// Every `INTERVAL` seconds
        Secondly => KW_RRULE_FREQ_SECONDLY,
        /// Every `INTERVAL` minutes
        Minutely => KW_RRULE_FREQ_MINUTELY,
        /// Every `INTERVAL` hours
        Hourly => KW_RRULE_FREQ_HOURLY,
        /// Every `INTERVAL` days
        Daily => KW_RRULE_FREQ_DAILY,
        /// Every `INTERVAL` weeks
        Weekly => KW_RRULE_FREQ_WEEKLY,
        /// Every `INTERVAL` months
        Monthly => KW_RRULE_FREQ_MONTHLY,
        /// Every `INTERVAL` years
        Yearly => KW_RRULE_FREQ_YEARLY,
    }
}

/// Upper bound of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleEnd {
    /// Stop after this many occurrences, counting `DTSTART`
    Count(u32),
    /// Stop after this time, inclusive
    Until(Until),
}

/// The `UNTIL` bound, a date or a date-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Until {
    /// Last date an occurrence may fall on
    Date(ValueDate),
    /// Last date-time an occurrence may start at
    DateTime(ValueDateTime),
}

impl Display for Until {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Until::Date(date) => date.fmt(f),
            Until::DateTime(dt) => dt.fmt(f),
        }
    }
}

/// A `BYDAY` element: a weekday, optionally the n-th of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    /// Day of the week
    pub weekday: Weekday,
    /// Ordinal in the month or year, negative counts from the end
    pub ordinal: Option<i8>,
}

impl WeekdayNum {
    /// Every such weekday.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            weekday,
            ordinal: None,
        }
    }

    /// The `ordinal`-th such weekday.
    #[must_use]
    pub const fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self {
            weekday,
            ordinal: Some(ordinal),
        }
    }
}

impl Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ordinal) = self.ordinal {
            write!(f, "{ordinal}")?;
        }
        f.write_str(weekday_keyword(self.weekday))
    }
}

/// A `BYMONTH` element. The leap flag marks a leap month of a lunisolar
/// calendar (`5L`); such months never occur in the Gregorian calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthNum {
    /// Month, 1-12
    pub month: u8,
    /// Leap month marker
    pub leap: bool,
}

impl From<u8> for MonthNum {
    fn from(month: u8) -> Self {
        Self { month, leap: false }
    }
}

impl Display for MonthNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.month)?;
        if self.leap {
            f.write_str("L")?;
        }
        Ok(())
    }
}

/// Recurrence rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecurrenceRule {
    /// Frequency
    pub freq: Frequency,
    /// Periods between repetitions, at least 1
    pub interval: u32,
    /// `COUNT` or `UNTIL`; the type keeps the two exclusive
    pub end: Option<RuleEnd>,
    /// First day of the week
    pub week_start: Weekday,
    /// Seconds, 0-60
    pub by_second: Vec<u8>,
    /// Minutes, 0-59
    pub by_minute: Vec<u8>,
    /// Hours, 0-23
    pub by_hour: Vec<u8>,
    /// Weekdays with optional ordinals
    pub by_day: Vec<WeekdayNum>,
    /// Days of the month, ±1-31
    pub by_month_day: Vec<i8>,
    /// Days of the year, ±1-366
    pub by_year_day: Vec<i16>,
    /// Week numbers, ±1-53
    pub by_week_no: Vec<i8>,
    /// Months
    pub by_month: Vec<MonthNum>,
    /// Positions within each period's set, ±1-366
    pub by_set_pos: Vec<i16>,
}

impl RecurrenceRule {
    /// An unbounded rule with interval 1 and no BY-rule parts.
    #[must_use]
    pub const fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: 1,
            end: None,
            week_start: Weekday::Monday,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
        }
    }

    /// Occurrence limit, when bounded by `COUNT`.
    #[must_use]
    pub fn count(&self) -> Option<u32> {
        match self.end {
            Some(RuleEnd::Count(count)) => Some(count),
            _ => None,
        }
    }

    /// `UNTIL` bound, when bounded by time.
    #[must_use]
    pub fn until(&self) -> Option<Until> {
        match self.end {
            Some(RuleEnd::Until(until)) => Some(until),
            _ => None,
        }
    }

    /// Whether any BY-rule part other than `BYSETPOS` is present.
    #[must_use]
    pub fn has_by_parts(&self) -> bool {
        !(self.by_second.is_empty()
            && self.by_minute.is_empty()
            && self.by_hour.is_empty()
            && self.by_day.is_empty()
            && self.by_month_day.is_empty()
            && self.by_year_day.is_empty()
            && self.by_week_no.is_empty()
            && self.by_month.is_empty())
    }

    /// Checks the value ranges a parsed rule is guaranteed to satisfy, for
    /// rules built in code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] naming the first offending part.
    pub fn validate(&self) -> Result<(), Error> {
        fn check<T: Copy>(
            part: &str,
            values: &[T],
            ok: impl Fn(T) -> bool,
        ) -> Result<(), Error> {
            match values.iter().all(|v| ok(*v)) {
                true => Ok(()),
                false => Err(Error::malformed(format!("{part} value out of range"))),
            }
        }
        let signed = |max: i16| move |v: i16| v != 0 && v.abs() <= max;

        if self.interval == 0 {
            return Err(Error::malformed("INTERVAL must be positive"));
        }
        if self.count() == Some(0) {
            return Err(Error::malformed("COUNT must be positive"));
        }
        check(KW_RRULE_BYSECOND, &self.by_second, |v| v <= 60)?;
        check(KW_RRULE_BYMINUTE, &self.by_minute, |v| v <= 59)?;
        check(KW_RRULE_BYHOUR, &self.by_hour, |v| v <= 23)?;
        check(KW_RRULE_BYDAY, &self.by_day, |v| {
            v.ordinal.is_none_or(|o| signed(53)(i16::from(o)))
        })?;
        check(KW_RRULE_BYMONTHDAY, &self.by_month_day, |v| signed(31)(i16::from(v)))?;
        check(KW_RRULE_BYYEARDAY, &self.by_year_day, signed(366))?;
        check(KW_RRULE_BYWEEKNO, &self.by_week_no, |v| signed(53)(i16::from(v)))?;
        check(KW_RRULE_BYMONTH, &self.by_month, |v| (1..=12).contains(&v.month))?;
        check(KW_RRULE_BYSETPOS, &self.by_set_pos, signed(366))?;
        Ok(())
    }
}

impl FromStr for RecurrenceRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_complete(value_recur(), s, KW_RECUR)
    }
}

impl Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: Display>(
            f: &mut fmt::Formatter<'_>,
            name: &str,
            values: &[T],
        ) -> fmt::Result {
            if values.is_empty() {
                return Ok(());
            }
            write!(f, ";{name}=")?;
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                v.fmt(f)?;
            }
            Ok(())
        }

        write!(f, "{KW_RRULE_FREQ}={}", self.freq)?;
        match self.end {
            Some(RuleEnd::Until(until)) => write!(f, ";{KW_RRULE_UNTIL}={until}")?,
            Some(RuleEnd::Count(count)) => write!(f, ";{KW_RRULE_COUNT}={count}")?,
            None => {}
        }
        if self.interval != 1 {
            write!(f, ";{KW_RRULE_INTERVAL}={}", self.interval)?;
        }
        list(f, KW_RRULE_BYSECOND, &self.by_second)?;
        list(f, KW_RRULE_BYMINUTE, &self.by_minute)?;
        list(f, KW_RRULE_BYHOUR, &self.by_hour)?;
        list(f, KW_RRULE_BYDAY, &self.by_day)?;
        list(f, KW_RRULE_BYMONTHDAY, &self.by_month_day)?;
        list(f, KW_RRULE_BYYEARDAY, &self.by_year_day)?;
        list(f, KW_RRULE_BYWEEKNO, &self.by_week_no)?;
        list(f, KW_RRULE_BYMONTH, &self.by_month)?;
        list(f, KW_RRULE_BYSETPOS, &self.by_set_pos)?;
        if self.week_start != Weekday::Monday {
            write!(f, ";{KW_RRULE_WKST}={}", weekday_keyword(self.week_start))?;
        }
        Ok(())
    }
}

/// Two-letter RFC 5545 name of a weekday.
#[must_use]
pub fn weekday_keyword(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sunday => KW_DAY_SU,
        Weekday::Monday => KW_DAY_MO,
        Weekday::Tuesday => KW_DAY_TU,
        Weekday::Wednesday => KW_DAY_WE,
        Weekday::Thursday => KW_DAY_TH,
        Weekday::Friday => KW_DAY_FR,
        Weekday::Saturday => KW_DAY_SA,
    }
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// recur           = recur-rule-part *( ";" recur-rule-part )
///                 ;
///                 ; The FREQ rule part is REQUIRED,
///                 ; but MUST NOT occur more than once.
///                 ;
///                 ; The UNTIL or COUNT rule parts are OPTIONAL,
///                 ; but they MUST NOT occur in the same 'recur'.
///                 ;
///                 ; The other rule parts are OPTIONAL,
///                 ; but MUST NOT occur more than once.
/// ```
pub fn value_recur<'src, I, E>() -> impl Parser<'src, I, RecurrenceRule, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    recur_rule_part()
        .separated_by(just(';'))
        .at_least(1)
        .collect()
        .try_map(build_from_parts::<I, E::Error>)
}

#[derive(Debug, Clone)]
enum Part {
    Freq(Frequency),
    Until(Until),
    Count(u32),
    Interval(u32),
    BySecond(Vec<u8>),
    ByMinute(Vec<u8>),
    ByHour(Vec<u8>),
    ByDay(Vec<WeekdayNum>),
    ByMonthDay(Vec<i8>),
    ByYearDay(Vec<i16>),
    ByWeekNo(Vec<i8>),
    ByMonth(Vec<MonthNum>),
    BySetPos(Vec<i16>),
    Wkst(Weekday),
}

fn build_from_parts<'src, I, Err>(parts: Vec<Part>, span: I::Span) -> Result<RecurrenceRule, Err>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    Err: LabelError<'src, I, ValueExpected>,
{
    let fail = |reason| Err::expected_found([reason], None, span);

    let mut freq = None;
    let mut until = None;
    let mut count = None;
    let mut interval = None;
    let mut wkst = None;
    let mut rule = RecurrenceRule::new(Frequency::Yearly);

    macro_rules! set_once {
        ($slot:expr, $value:expr) => {{
            if $slot.is_some() {
                return Err(fail(ValueExpected::RRuleDuplicatePart));
            }
            $slot = Some($value);
        }};
    }
    macro_rules! set_list {
        ($list:expr, $value:expr) => {{
            if !$list.is_empty() {
                return Err(fail(ValueExpected::RRuleDuplicatePart));
            }
            $list = $value;
        }};
    }

    for part in parts {
        match part {
            Part::Freq(v) => set_once!(freq, v),
            Part::Until(v) => set_once!(until, v),
            Part::Count(v) => set_once!(count, v),
            Part::Interval(v) => set_once!(interval, v),
            Part::Wkst(v) => set_once!(wkst, v),
            Part::BySecond(v) => set_list!(rule.by_second, v),
            Part::ByMinute(v) => set_list!(rule.by_minute, v),
            Part::ByHour(v) => set_list!(rule.by_hour, v),
            Part::ByDay(v) => set_list!(rule.by_day, v),
            Part::ByMonthDay(v) => set_list!(rule.by_month_day, v),
            Part::ByYearDay(v) => set_list!(rule.by_year_day, v),
            Part::ByWeekNo(v) => set_list!(rule.by_week_no, v),
            Part::ByMonth(v) => set_list!(rule.by_month, v),
            Part::BySetPos(v) => set_list!(rule.by_set_pos, v),
        }
    }

    rule.freq = freq.ok_or_else(|| fail(ValueExpected::RRuleRequiredFreq))?;
    rule.interval = interval.unwrap_or(1);
    rule.week_start = wkst.unwrap_or(Weekday::Monday);
    rule.end = match (count, until) {
        (Some(_), Some(_)) => return Err(fail(ValueExpected::RRuleCountUntilExclusion)),
        (Some(count), None) => Some(RuleEnd::Count(count)),
        (None, Some(until)) => Some(RuleEnd::Until(until)),
        (None, None) => None,
    };
    Ok(rule)
}

/// ```txt
/// recur-rule-part = ( "FREQ" "=" freq )
///                 / ( "UNTIL" "=" enddate )
///                 / ( "COUNT" "=" 1*DIGIT )
///                 / ( "INTERVAL" "=" 1*DIGIT )
///                 / ( "BYSECOND" "=" byseclist )
///                 / ( "BYMINUTE" "=" byminlist )
///                 / ( "BYHOUR" "=" byhrlist )
///                 / ( "BYDAY" "=" bywdaylist )
///                 / ( "BYMONTHDAY" "=" bymodaylist )
///                 / ( "BYYEARDAY" "=" byyrdaylist )
///                 / ( "BYWEEKNO" "=" bywknolist )
///                 / ( "BYMONTH" "=" bymolist )
///                 / ( "BYSETPOS" "=" bysplist )
///                 / ( "WKST" "=" weekday )
/// ```
fn recur_rule_part<'src, I, E>() -> impl Parser<'src, I, Part, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    let kw = |kw| just(kw).ignore_then(just('='));

    let freq = kw(KW_RRULE_FREQ).ignore_then(freq()).map(Part::Freq);

    let until = kw(KW_RRULE_UNTIL)
        .ignore_then(choice((
            value_date_time().map(Until::DateTime),
            value_date().map(Until::Date),
        )))
        .map(Part::Until);

    let count = kw(KW_RRULE_COUNT)
        .ignore_then(unsigned_in(1, u32::MAX))
        .map(Part::Count);

    let interval = kw(KW_RRULE_INTERVAL)
        .ignore_then(unsigned_in(1, u32::MAX))
        .map(Part::Interval);

    let by_second = kw(KW_RRULE_BYSECOND)
        .ignore_then(list(unsigned_in(0, 60)))
        .map(Part::BySecond);

    let by_minute = kw(KW_RRULE_BYMINUTE)
        .ignore_then(list(unsigned_in(0, 59)))
        .map(Part::ByMinute);

    let by_hour = kw(KW_RRULE_BYHOUR)
        .ignore_then(list(unsigned_in(0, 23)))
        .map(Part::ByHour);

    let by_day = kw(KW_RRULE_BYDAY)
        .ignore_then(list(weekday_num()))
        .map(Part::ByDay);

    let by_month_day = kw(KW_RRULE_BYMONTHDAY)
        .ignore_then(list(signed_in(31)))
        .map(Part::ByMonthDay);

    let by_year_day = kw(KW_RRULE_BYYEARDAY)
        .ignore_then(list(signed_in(366)))
        .map(Part::ByYearDay);

    let by_week_no = kw(KW_RRULE_BYWEEKNO)
        .ignore_then(list(signed_in(53)))
        .map(Part::ByWeekNo);

    let by_month = kw(KW_RRULE_BYMONTH)
        .ignore_then(list(month_num()))
        .map(Part::ByMonth);

    let by_set_pos = kw(KW_RRULE_BYSETPOS)
        .ignore_then(list(signed_in(366)))
        .map(Part::BySetPos);

    let wkst = kw(KW_RRULE_WKST).ignore_then(weekday()).map(Part::Wkst);

    // BYMONTHDAY must be tried before its prefix BYMONTH
    choice((
        freq,
        until,
        count,
        interval,
        by_second,
        by_minute,
        by_hour,
        by_day,
        by_month_day,
        by_year_day,
        by_week_no,
        by_month,
        by_set_pos,
        wkst,
    ))
}

/// ```txt
/// freq        = "SECONDLY" / "MINUTELY" / "HOURLY" / "DAILY"
///             / "WEEKLY" / "MONTHLY" / "YEARLY"
/// ```
fn freq<'src, I, E>() -> impl Parser<'src, I, Frequency, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    choice((
        just(KW_RRULE_FREQ_SECONDLY).to(Frequency::Secondly),
        just(KW_RRULE_FREQ_MINUTELY).to(Frequency::Minutely),
        just(KW_RRULE_FREQ_HOURLY).to(Frequency::Hourly),
        just(KW_RRULE_FREQ_DAILY).to(Frequency::Daily),
        just(KW_RRULE_FREQ_WEEKLY).to(Frequency::Weekly),
        just(KW_RRULE_FREQ_MONTHLY).to(Frequency::Monthly),
        just(KW_RRULE_FREQ_YEARLY).to(Frequency::Yearly),
    ))
}

/// ```txt
/// weekday     = "SU" / "MO" / "TU" / "WE" / "TH" / "FR" / "SA"
/// ```
fn weekday<'src, I, E>() -> impl Parser<'src, I, Weekday, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    choice((
        just(KW_DAY_SU).to(Weekday::Sunday),
        just(KW_DAY_MO).to(Weekday::Monday),
        just(KW_DAY_TU).to(Weekday::Tuesday),
        just(KW_DAY_WE).to(Weekday::Wednesday),
        just(KW_DAY_TH).to(Weekday::Thursday),
        just(KW_DAY_FR).to(Weekday::Friday),
        just(KW_DAY_SA).to(Weekday::Saturday),
    ))
}

/// ```txt
/// weekdaynum  = [[plus / minus] ordwk] weekday
/// ordwk       = 1*2DIGIT       ;1 to 53
/// ```
fn weekday_num<'src, I, E>() -> impl Parser<'src, I, WeekdayNum, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    signed_in::<I, E, i8>(53)
        .or_not()
        .then(weekday())
        .map(|(ordinal, weekday)| WeekdayNum { weekday, ordinal })
}

/// ```txt
/// monthnum    = 1*2DIGIT ["L"]  ;1 to 12, "L" marks a leap month
/// ```
fn month_num<'src, I, E>() -> impl Parser<'src, I, MonthNum, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    unsigned_in(1, 12)
        .then(just('L').or_not())
        .map(|(month, leap)| MonthNum {
            month,
            leap: leap.is_some(),
        })
}

fn list<'src, I, E, T>(
    element: impl Parser<'src, I, T, E> + Clone,
) -> impl Parser<'src, I, Vec<T>, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    element.separated_by(just(',')).at_least(1).collect()
}

/// Unsigned integer in `min..=max`.
fn unsigned_in<'src, I, E, T>(min: u32, max: u32) -> impl Parser<'src, I, T, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
    T: TryFrom<u32>,
{
    value_u32().try_map(move |v, span| {
        (min..=max)
            .contains(&v)
            .then(|| T::try_from(v).ok())
            .flatten()
            .ok_or_else(|| E::Error::expected_found([ValueExpected::RRuleOutOfRange], None, span))
    })
}

/// Non-zero signed integer in `-max..=max`.
fn signed_in<'src, I, E, T>(max: u32) -> impl Parser<'src, I, T, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
    T: TryFrom<i64>,
{
    sign().or_not().then(value_u32()).try_map(move |(sign, v), span| {
        let value = if sign == Some('-') {
            -i64::from(v)
        } else {
            i64::from(v)
        };
        (1..=max)
            .contains(&v)
            .then(|| T::try_from(value).ok())
            .flatten()
            .ok_or_else(|| E::Error::expected_found([ValueExpected::RRuleOutOfRange], None, span))
    })
}

#[cfg(test)]
mod tests {
    #![expect(clippy::indexing_slicing)]

    use super::*;

    fn parse(src: &str) -> Result<RecurrenceRule, Error> {
        src.parse()
    }

    #[test]
    fn parses_simple_rules() {
        let rule = parse("FREQ=DAILY;COUNT=10").expect("Failed to parse rule");
        assert_eq!(rule.freq, Frequency::Daily);
        assert_eq!(rule.count(), Some(10));
        assert_eq!(rule.interval, 1);
        assert_eq!(rule.week_start, Weekday::Monday);

        let rule = parse("FREQ=WEEKLY;UNTIL=19971224T000000Z;WKST=SU;BYDAY=MO,-1FR,+2TU")
            .expect("Failed to parse rule");
        assert!(matches!(rule.until(), Some(Until::DateTime(dt)) if dt.is_utc()));
        assert_eq!(rule.week_start, Weekday::Sunday);
        assert_eq!(rule.by_day.len(), 3);
        assert_eq!(rule.by_day[0], WeekdayNum::every(Weekday::Monday));
        assert_eq!(rule.by_day[1], WeekdayNum::nth(-1, Weekday::Friday));
        assert_eq!(rule.by_day[2], WeekdayNum::nth(2, Weekday::Tuesday));
    }

    #[test]
    fn parses_by_month_before_by_month_day() {
        let rule = parse("FREQ=YEARLY;BYMONTH=1,5L;BYMONTHDAY=-1,15").expect("Failed to parse");
        assert_eq!(rule.by_month, vec![MonthNum::from(1), MonthNum { month: 5, leap: true }]);
        assert_eq!(rule.by_month_day, vec![-1, 15]);
    }

    #[test]
    fn parses_date_until() {
        let rule = parse("FREQ=MONTHLY;UNTIL=20251231").expect("Failed to parse rule");
        assert!(matches!(rule.until(), Some(Until::Date(_))));
    }

    #[test]
    fn rejects_invalid_rules() {
        for src in [
            "",
            "COUNT=3",
            "FREQ=DAILY;FREQ=WEEKLY",
            "FREQ=DAILY;COUNT=3;UNTIL=20250101",
            "FREQ=DAILY;BYHOUR=24",
            "FREQ=MONTHLY;BYMONTHDAY=0",
            "FREQ=MONTHLY;BYMONTHDAY=32",
            "FREQ=YEARLY;BYWEEKNO=54",
            "FREQ=YEARLY;BYMONTH=13",
            "FREQ=WEEKLY;BYDAY=XX",
            "FREQ=DAILY;INTERVAL=0",
            "FREQ=DAILY;COUNT=0",
            "FREQ=DAILY;",
            "FREQ=FORTNIGHTLY",
        ] {
            let err = parse(src).expect_err(&format!("Parse {src:?} should fail"));
            assert_eq!(err.kind(), crate::ErrorKind::MalformedData);
        }
    }

    #[test]
    fn displays_canonical_form() {
        let src = "FREQ=MONTHLY;COUNT=6;INTERVAL=2;BYDAY=-1SU,MO;BYMONTH=3L;BYSETPOS=1,-1;WKST=SU";
        let rule = parse(src).expect("Failed to parse rule");
        assert_eq!(rule.to_string(), src);
        assert_eq!(parse(&rule.to_string()).expect("Failed to reparse"), rule);

        let rule = parse("WKST=MO;INTERVAL=1;FREQ=DAILY").expect("Failed to parse rule");
        assert_eq!(rule.to_string(), "FREQ=DAILY");
    }

    #[test]
    fn validates_rules_built_in_code() {
        let mut rule = RecurrenceRule::new(Frequency::Monthly);
        assert!(rule.validate().is_ok());

        rule.by_month_day = vec![0];
        assert!(rule.validate().is_err());

        rule.by_month_day = vec![-31];
        rule.end = Some(RuleEnd::Count(0));
        assert!(rule.validate().is_err());

        rule.end = Some(RuleEnd::Count(1));
        rule.by_day = vec![WeekdayNum::nth(54, Weekday::Monday)];
        assert!(rule.validate().is_err());
    }
}
