// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Property kinds and their default value data types.

use std::fmt;
use std::str::FromStr;

use crate::keyword::{
    KW_ACTION, KW_ANY, KW_ATTACH, KW_ATTENDEE, KW_CALSCALE, KW_CATEGORIES, KW_CLASS, KW_COMMENT,
    KW_COMPLETED, KW_CONTACT, KW_CREATED, KW_DESCRIPTION, KW_DTEND, KW_DTSTAMP, KW_DTSTART, KW_DUE,
    KW_DURATION, KW_EXDATE, KW_EXRULE, KW_FREEBUSY, KW_GEO, KW_LAST_MODIFIED, KW_LOCATION,
    KW_METHOD, KW_ORGANIZER, KW_PERCENT_COMPLETE, KW_PRIORITY, KW_PRODID, KW_RDATE,
    KW_RECURRENCE_ID, KW_RELATED_TO, KW_RELCALID, KW_REPEAT, KW_REQUEST_STATUS, KW_RESOURCES,
    KW_RRULE, KW_SEQUENCE, KW_STATUS, KW_SUMMARY, KW_TRANSP, KW_TRIGGER, KW_TZID, KW_TZNAME,
    KW_TZOFFSETFROM, KW_TZOFFSETTO, KW_TZURL, KW_UID, KW_URL, KW_VERSION, KW_X, KW_X_LIC_ERROR,
};
use crate::value::ValueKind;

/// Usage: `property_kind!(Variant => KW => ValueKind, ...)`
macro_rules! property_kind {
    (
        $(
            $(#[$attr:meta])*
            $variant:ident => $kw:ident => $value_kind:ident $(,)?
        )*
    ) => {
        /// Kind of iCalendar property.
        ///
        /// Experimental `X-` and unrecognized properties share the
        /// [`PropertyKind::X`] kind; their name travels with the property.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[expect(missing_docs)]
        pub enum PropertyKind {
            $(
                $(#[$attr])*
                $variant,
            )*
            /// Experimental or unrecognized property
            X,
            /// Wildcard used when searching; never carried by a property
            Any,
        }

        impl PropertyKind {
            /// The value data type used when no `VALUE` parameter is given.
            #[must_use]
            pub const fn default_value_kind(self) -> ValueKind {
                match self {
                    $(PropertyKind::$variant => ValueKind::$value_kind,)*
                    PropertyKind::X | PropertyKind::Any => ValueKind::X,
                }
            }

            /// The property name keyword.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(PropertyKind::$variant => $kw,)*
                    PropertyKind::X => KW_X,
                    PropertyKind::Any => KW_ANY,
                }
            }
        }

        impl FromStr for PropertyKind {
            type Err = ();

            /// Property names are case-insensitive. Only standard names
            /// resolve; everything else is left to the caller.
            fn from_str(name: &str) -> Result<Self, Self::Err> {
                $(
                    if name.eq_ignore_ascii_case($kw) {
                        return Ok(PropertyKind::$variant);
                    }
                )*
                Err(())
            }
        }

        #[cfg(test)]
        const KINDS: &[PropertyKind] = &[
            $(
                PropertyKind::$variant,
            )*
        ];
    };
}

property_kind! {
    // 3.7.1.  Calendar Scale
    CalScale    => KW_CALSCALE  => Text,
    // 3.7.2.  Method
    Method      => KW_METHOD    => Text,
    // 3.7.3.  Product Identifier
    ProdId      => KW_PRODID    => Text,
    // 3.7.4.  Version
    Version     => KW_VERSION   => Text,
    // 3.8.1.1.  Attachment
    Attach      => KW_ATTACH    => Uri,
    // 3.8.1.2.  Categories
    Categories  => KW_CATEGORIES => Text,
    // 3.8.1.3.  Classification
    Class       => KW_CLASS     => Text,
    // 3.8.1.4.  Comment
    Comment     => KW_COMMENT   => Text,
    // 3.8.1.5.  Description
    Description => KW_DESCRIPTION => Text,
    // 3.8.1.6.  Geographic Position, kept raw
    Geo         => KW_GEO       => X,
    // 3.8.1.7.  Location
    Location    => KW_LOCATION  => Text,
    // 3.8.1.8.  Percent Complete
    PercentComplete => KW_PERCENT_COMPLETE => Integer,
    // 3.8.1.9.  Priority
    Priority    => KW_PRIORITY  => Integer,
    // 3.8.1.10.  Resources
    Resources   => KW_RESOURCES => Text,
    // 3.8.1.11.  Status
    Status      => KW_STATUS    => Text,
    // 3.8.1.12.  Summary
    Summary     => KW_SUMMARY   => Text,
    // 3.8.2.1.  Date-Time Completed
    Completed   => KW_COMPLETED => DateTime,
    // 3.8.2.2.  Date-Time End
    DtEnd       => KW_DTEND     => DateTime,
    // 3.8.2.3.  Date-Time Due
    Due         => KW_DUE       => DateTime,
    // 3.8.2.4.  Date-Time Start
    DtStart     => KW_DTSTART   => DateTime,
    // 3.8.2.5.  Duration
    Duration    => KW_DURATION  => Duration,
    // 3.8.2.6.  Free/Busy Time
    FreeBusy    => KW_FREEBUSY  => Period,
    // 3.8.2.7.  Time Transparency
    Transp      => KW_TRANSP    => Text,
    // 3.8.3.1.  Time Zone Identifier
    TzId        => KW_TZID      => Text,
    // 3.8.3.2.  Time Zone Name
    TzName      => KW_TZNAME    => Text,
    // 3.8.3.3.  Time Zone Offset From
    TzOffsetFrom => KW_TZOFFSETFROM => UtcOffset,
    // 3.8.3.4.  Time Zone Offset To
    TzOffsetTo  => KW_TZOFFSETTO => UtcOffset,
    // 3.8.3.5.  Time Zone URL
    TzUrl       => KW_TZURL     => Uri,
    // 3.8.4.1.  Attendee
    Attendee    => KW_ATTENDEE  => CalAddress,
    // 3.8.4.2.  Contact
    Contact     => KW_CONTACT   => Text,
    // 3.8.4.3.  Organizer
    Organizer   => KW_ORGANIZER => CalAddress,
    // 3.8.4.4.  Recurrence ID
    RecurrenceId => KW_RECURRENCE_ID => DateTime,
    // 3.8.4.5.  Related To
    RelatedTo   => KW_RELATED_TO => Text,
    // 3.8.4.6.  Uniform Resource Locator
    Url         => KW_URL       => Uri,
    // 3.8.4.7.  Unique Identifier
    Uid         => KW_UID       => Text,
    // 3.8.5.1.  Exception Date-Times
    ExDate      => KW_EXDATE    => DateTime,
    // RFC 2445 4.8.5.2.  Exception Rule
    ExRule      => KW_EXRULE    => Recur,
    // 3.8.5.2.  Recurrence Date-Times
    RDate       => KW_RDATE     => DateTime,
    // 3.8.5.3.  Recurrence Rule
    RRule       => KW_RRULE     => Recur,
    // 3.8.6.1.  Action
    Action      => KW_ACTION    => Text,
    // 3.8.6.2.  Repeat Count
    Repeat      => KW_REPEAT    => Integer,
    // 3.8.6.3.  Trigger
    Trigger     => KW_TRIGGER   => Duration,
    // 3.8.7.1.  Date-Time Created
    Created     => KW_CREATED   => DateTime,
    // 3.8.7.2.  Date-Time Stamp
    DtStamp     => KW_DTSTAMP   => DateTime,
    // 3.8.7.3.  Last Modified
    LastModified => KW_LAST_MODIFIED => DateTime,
    // 3.8.7.4.  Sequence Number
    Sequence    => KW_SEQUENCE  => Integer,
    // 3.8.8.3.  Request Status, kept raw
    RequestStatus => KW_REQUEST_STATUS => X,
    // Calendar store bookkeeping: id of the calendar a component belongs to
    RelCalId    => KW_RELCALID  => Text,
    // Parse error recorded in place of a malformed line
    XLicError   => KW_X_LIC_ERROR => Text,
}

impl PropertyKind {
    /// Whether a property of this kind matches a search for `wanted`.
    #[must_use]
    pub fn matches(self, wanted: PropertyKind) -> bool {
        wanted == PropertyKind::Any || self == wanted
    }

    /// Whether a line of this kind may hold several comma-separated values
    /// that are split into one property each on parse.
    #[must_use]
    pub const fn is_multi_valued(self) -> bool {
        matches!(
            self,
            PropertyKind::ExDate
                | PropertyKind::RDate
                | PropertyKind::FreeBusy
                | PropertyKind::Categories
                | PropertyKind::Resources
        )
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.name().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_resolves_from_its_name() {
        for kind in KINDS {
            assert_eq!(kind.name().parse::<PropertyKind>(), Ok(*kind));
            assert_eq!(kind.name().to_lowercase().parse::<PropertyKind>(), Ok(*kind));
        }
        assert_eq!("X-WR-CALNAME".parse::<PropertyKind>(), Err(()));
    }

    #[test]
    fn default_value_kinds() {
        assert_eq!(PropertyKind::DtStart.default_value_kind(), ValueKind::DateTime);
        assert_eq!(PropertyKind::RRule.default_value_kind(), ValueKind::Recur);
        assert_eq!(PropertyKind::Attendee.default_value_kind(), ValueKind::CalAddress);
        assert_eq!(PropertyKind::Geo.default_value_kind(), ValueKind::X);
        assert_eq!(PropertyKind::X.default_value_kind(), ValueKind::X);
    }
}
