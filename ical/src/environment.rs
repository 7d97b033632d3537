// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Explicit library context: error policy, recurrence validation policy and
//! the injected time zone lookup.

use std::fmt;
use std::sync::Mutex;

use jiff::civil::DateTime;
use jiff::tz::TimeZone;

use crate::error::{Error, ErrorKind};

/// Default number of consecutive empty recurrence periods tolerated before an
/// iterator gives up.
pub const DEFAULT_MAX_IDLE_PERIODS: u32 = 50_000;

/// How a recurrence rule with a BY-rule part that is invalid for its FREQ is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ByRulePolicy {
    /// Refuse to build an iterator for the rule.
    #[default]
    Reject,

    /// Drop the offending part and continue.
    Ignore,
}

/// Time zone lookup service.
///
/// The library never parses zone rule databases itself; it asks this
/// provider to resolve a TZID into a [`TimeZone`].
pub trait TimezoneProvider: fmt::Debug + Send + Sync {
    /// Resolves a TZID, returning `None` when the zone is unknown.
    fn lookup_timezone(&self, tzid: &str) -> Option<TimeZone>;

    /// Offset from UTC in seconds of the wall-clock `time` in zone `tzid`.
    fn utc_offset(&self, tzid: &str, time: DateTime) -> Option<i32> {
        let tz = self.lookup_timezone(tzid)?;
        let zoned = tz.to_ambiguous_zoned(time).compatible().ok()?;
        Some(zoned.offset().seconds())
    }

    /// Converts the wall-clock `time` in zone `from` to the wall-clock time in zone `to`.
    fn convert(&self, time: DateTime, from: &str, to: &str) -> Option<DateTime> {
        let from = self.lookup_timezone(from)?;
        let to = self.lookup_timezone(to)?;
        let zoned = from.to_ambiguous_zoned(time).compatible().ok()?;
        Some(zoned.with_time_zone(to).datetime())
    }
}

/// Resolves zones through jiff's time zone database.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimezones;

impl TimezoneProvider for SystemTimezones {
    fn lookup_timezone(&self, tzid: &str) -> Option<TimeZone> {
        if tzid.eq_ignore_ascii_case("UTC") || tzid.eq_ignore_ascii_case("Z") {
            return Some(TimeZone::UTC);
        }

        // Some producers prefix the database name with a vendor path
        // ("/citadel.org/20250101_1/Europe/Berlin").
        let mut candidate = tzid;
        loop {
            if let Ok(tz) = TimeZone::get(candidate) {
                return Some(tz);
            }
            match candidate.split_once('/') {
                Some((_, rest)) if !rest.is_empty() => candidate = rest,
                _ => return None,
            }
        }
    }
}

/// Library context passed by reference to the functions that need it.
///
/// One instance is usually built at application start; nothing in this
/// crate keeps hidden global state.
pub struct Environment {
    errors_are_fatal: bool,
    by_rule_policy: ByRulePolicy,
    max_idle_periods: u32,
    timezones: Box<dyn TimezoneProvider>,
    last_error: Mutex<Option<ErrorKind>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            errors_are_fatal: false,
            by_rule_policy: ByRulePolicy::default(),
            max_idle_periods: DEFAULT_MAX_IDLE_PERIODS,
            timezones: Box::new(SystemTimezones),
            last_error: Mutex::new(None),
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("errors_are_fatal", &self.errors_are_fatal)
            .field("by_rule_policy", &self.by_rule_policy)
            .field("max_idle_periods", &self.max_idle_periods)
            .field("timezones", &self.timezones)
            .field("last_error", &self.last_error())
            .finish()
    }
}

impl Environment {
    /// Creates an environment with default policies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat malformed data as fatal instead of recording it in place.
    #[must_use]
    pub fn with_errors_are_fatal(mut self, fatal: bool) -> Self {
        self.errors_are_fatal = fatal;
        self
    }

    /// Set the policy for BY-rule parts that are invalid for a rule's FREQ.
    #[must_use]
    pub fn with_by_rule_policy(mut self, policy: ByRulePolicy) -> Self {
        self.by_rule_policy = policy;
        self
    }

    /// Set the number of consecutive empty periods after which recurrence
    /// iteration stops.
    #[must_use]
    pub fn with_max_idle_periods(mut self, periods: u32) -> Self {
        self.max_idle_periods = periods.max(1);
        self
    }

    /// Replace the time zone provider.
    #[must_use]
    pub fn with_timezones(mut self, provider: impl TimezoneProvider + 'static) -> Self {
        self.timezones = Box::new(provider);
        self
    }

    /// Whether malformed data aborts parsing.
    #[must_use]
    pub const fn errors_are_fatal(&self) -> bool {
        self.errors_are_fatal
    }

    /// Policy for invalid BY-rule combinations.
    #[must_use]
    pub const fn by_rule_policy(&self) -> ByRulePolicy {
        self.by_rule_policy
    }

    /// Bound on consecutive empty recurrence periods.
    #[must_use]
    pub const fn max_idle_periods(&self) -> u32 {
        self.max_idle_periods
    }

    /// The injected time zone provider.
    #[must_use]
    pub fn timezones(&self) -> &dyn TimezoneProvider {
        self.timezones.as_ref()
    }

    /// Resolves a TZID through the provider.
    #[must_use]
    pub fn lookup_timezone(&self, tzid: &str) -> Option<TimeZone> {
        self.timezones.lookup_timezone(tzid)
    }

    /// Records `err` as the last error. Fatal policy turns it back into an `Err`.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged when errors are fatal, or when it is an
    /// [`ErrorKind::Internal`] error, which is never recoverable.
    pub fn report(&self, err: Error) -> Result<(), Error> {
        self.record_error(err.kind());
        if self.errors_are_fatal || err.kind() == ErrorKind::Internal {
            return Err(err);
        }
        tracing::warn!(kind = %err.kind(), error = %err, "recovered from malformed data");
        Ok(())
    }

    /// Stores the kind of the most recent error.
    pub fn record_error(&self, kind: ErrorKind) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = Some(kind);
        }
    }

    /// Kind of the most recent recorded error.
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.last_error.lock().ok().and_then(|last| *last)
    }

    /// Clears the recorded error state.
    pub fn clear_error(&self) {
        if let Ok(mut last) = self.last_error.lock() {
            *last = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedZones;

    impl TimezoneProvider for FixedZones {
        fn lookup_timezone(&self, tzid: &str) -> Option<TimeZone> {
            (tzid == "Test/Plus2").then(|| TimeZone::fixed(jiff::tz::offset(2)))
        }
    }

    #[test]
    fn system_timezones_resolve_iana_and_prefixed_names() {
        let zones = SystemTimezones;
        assert!(zones.lookup_timezone("America/New_York").is_some());
        assert!(zones.lookup_timezone("/example.org/2025/Europe/Berlin").is_some());
        assert!(zones.lookup_timezone("Not/AZone").is_none());
        let utc = zones.lookup_timezone("utc").expect("Failed to resolve UTC");
        assert_eq!(utc.iana_name(), Some("UTC"));
    }

    #[test]
    fn provider_default_methods_use_lookup() {
        let env = Environment::new().with_timezones(FixedZones);
        let noon = jiff::civil::datetime(2025, 1, 1, 12, 0, 0, 0);
        assert_eq!(env.timezones().utc_offset("Test/Plus2", noon), Some(7200));
        assert_eq!(env.timezones().utc_offset("Nope", noon), None);
    }

    #[test]
    fn convert_between_zones() {
        let zones = SystemTimezones;
        let noon = jiff::civil::datetime(2025, 7, 1, 12, 0, 0, 0);
        let converted = zones.convert(noon, "UTC", "America/New_York");
        assert_eq!(converted, Some(jiff::civil::datetime(2025, 7, 1, 8, 0, 0, 0)));
    }

    #[test]
    fn report_records_and_respects_policy() {
        let env = Environment::new();
        assert!(env.report(Error::malformed("x")).is_ok());
        assert_eq!(env.last_error(), Some(ErrorKind::MalformedData));
        env.clear_error();
        assert_eq!(env.last_error(), None);

        let strict = Environment::new().with_errors_are_fatal(true);
        assert!(strict.report(Error::malformed("x")).is_err());
        assert!(env.report(Error::Internal("oops".to_string())).is_err());
    }
}
