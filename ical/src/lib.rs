// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! iCalendar (RFC 5545) data model: values, parameters, properties and
//! component trees, with a recovering parser, a folding formatter and
//! recurrence expansion.
//!
//! Library-wide policy (error fatality, BY-rule validation, time zone lookup)
//! lives in an [`Environment`] passed by reference; there is no global state.

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::indexing_slicing,
    clippy::pedantic
)]
// Allow certain clippy lints that are too restrictive for this crate
#![allow(
    clippy::option_option,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::match_bool
)]

#[macro_use]
mod macros;

pub mod component;
pub mod environment;
pub mod error;
pub mod formatter;
pub mod keyword;
pub mod parameter;
mod parser;
pub mod property;
pub mod recur;
pub mod syntax;
pub mod time;
pub mod value;

pub use crate::component::{Component, ComponentCursor, ComponentKind, PropertyCursor};
pub use crate::environment::{ByRulePolicy, Environment, SystemTimezones, TimezoneProvider};
pub use crate::error::{Error, ErrorKind};
pub use crate::parameter::{
    CalendarUserType, CompareType, Encoding, FreeBusyType, Parameter, ParameterKind,
    ParticipationRole, ParticipationStatus, RecurrenceIdRange, RelationshipType, TriggerRelated,
};
pub use crate::parser::{Parser, parse_string};
pub use crate::property::{Property, PropertyKind};
pub use crate::recur::{
    Frequency, IteratorState, Occurrence, RecurrenceIterator, RecurrenceRule, WeekdayNum,
    expand_bounded, expand_timestamps, foreach_occurrence_in_range,
};
pub use crate::time::{CalTime, Span, Zone};
pub use crate::value::{
    Comparison, Value, ValueDate, ValueDateTime, ValueDuration, ValueKind, ValuePeriod,
    ValueTime, ValueUtcOffset,
};
