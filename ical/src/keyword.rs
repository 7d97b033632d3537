// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Keywords defined in iCalendar RFC 5545, plus the `X-LIC-*` extensions.

#![expect(missing_docs)]

pub const KW_BEGIN: &str = "BEGIN";
pub const KW_END: &str = "END";

// Section 3.6 - Calendar Components
pub const KW_VCALENDAR: &str = "VCALENDAR";
pub const KW_VEVENT: &str = "VEVENT";
pub const KW_VTODO: &str = "VTODO";
pub const KW_VJOURNAL: &str = "VJOURNAL";
pub const KW_VFREEBUSY: &str = "VFREEBUSY";
pub const KW_VTIMEZONE: &str = "VTIMEZONE";
pub const KW_VALARM: &str = "VALARM";
pub const KW_STANDARD: &str = "STANDARD";
pub const KW_DAYLIGHT: &str = "DAYLIGHT";
pub const KW_VAGENDA: &str = "VAGENDA";
pub const KW_VQUERY: &str = "VQUERY";
pub const KW_XROOT: &str = "XROOT";
pub const KW_ANY: &str = "ANY";
pub const KW_X: &str = "X";

// Section 3.2 - Property Parameters
pub const KW_ALTREP: &str = "ALTREP";
pub const KW_CN: &str = "CN";
pub const KW_CUTYPE: &str = "CUTYPE";
pub const KW_CUTYPE_INDIVIDUAL: &str = "INDIVIDUAL";
pub const KW_CUTYPE_GROUP: &str = "GROUP";
pub const KW_CUTYPE_RESOURCE: &str = "RESOURCE";
pub const KW_CUTYPE_ROOM: &str = "ROOM";
pub const KW_CUTYPE_UNKNOWN: &str = "UNKNOWN";
pub const KW_DELEGATED_FROM: &str = "DELEGATED-FROM";
pub const KW_DELEGATED_TO: &str = "DELEGATED-TO";
pub const KW_DIR: &str = "DIR";
pub const KW_DISPLAY: &str = "DISPLAY";
pub const KW_ENCODING: &str = "ENCODING";
pub const KW_ENCODING_8BIT: &str = "8BIT";
pub const KW_ENCODING_BASE64: &str = "BASE64";
pub const KW_FBTYPE: &str = "FBTYPE";
pub const KW_FBTYPE_FREE: &str = "FREE";
pub const KW_FBTYPE_BUSY: &str = "BUSY";
pub const KW_FBTYPE_BUSY_UNAVAILABLE: &str = "BUSY-UNAVAILABLE";
pub const KW_FBTYPE_BUSY_TENTATIVE: &str = "BUSY-TENTATIVE";
pub const KW_FMTTYPE: &str = "FMTTYPE";
pub const KW_LANGUAGE: &str = "LANGUAGE";
pub const KW_MEMBER: &str = "MEMBER";
pub const KW_PARTSTAT: &str = "PARTSTAT";
pub const KW_PARTSTAT_NEEDS_ACTION: &str = "NEEDS-ACTION";
pub const KW_PARTSTAT_ACCEPTED: &str = "ACCEPTED";
pub const KW_PARTSTAT_DECLINED: &str = "DECLINED";
pub const KW_PARTSTAT_TENTATIVE: &str = "TENTATIVE";
pub const KW_PARTSTAT_DELEGATED: &str = "DELEGATED";
pub const KW_PARTSTAT_COMPLETED: &str = "COMPLETED";
pub const KW_PARTSTAT_IN_PROCESS: &str = "IN-PROCESS";
pub const KW_RANGE: &str = "RANGE";
pub const KW_RANGE_THISANDFUTURE: &str = "THISANDFUTURE";
pub const KW_RANGE_THISANDPRIOR: &str = "THISANDPRIOR";
pub const KW_RELATED: &str = "RELATED";
pub const KW_RELATED_START: &str = "START";
pub const KW_RELATED_END: &str = "END";
pub const KW_RELTYPE: &str = "RELTYPE";
pub const KW_RELTYPE_PARENT: &str = "PARENT";
pub const KW_RELTYPE_CHILD: &str = "CHILD";
pub const KW_RELTYPE_SIBLING: &str = "SIBLING";
pub const KW_ROLE: &str = "ROLE";
pub const KW_ROLE_CHAIR: &str = "CHAIR";
pub const KW_ROLE_REQ_PARTICIPANT: &str = "REQ-PARTICIPANT";
pub const KW_ROLE_OPT_PARTICIPANT: &str = "OPT-PARTICIPANT";
pub const KW_ROLE_NON_PARTICIPANT: &str = "NON-PARTICIPANT";
pub const KW_RSVP: &str = "RSVP";
pub const KW_SENT_BY: &str = "SENT-BY";
pub const KW_TZID: &str = "TZID";
pub const KW_VALUE: &str = "VALUE";
pub const KW_X_LIC_ERRORTYPE: &str = "X-LIC-ERRORTYPE";
pub const KW_X_LIC_COMPARETYPE: &str = "X-LIC-COMPARETYPE";

// X-LIC-COMPARETYPE values
pub const KW_COMPARE_EQUAL: &str = "EQUAL";
pub const KW_COMPARE_NOTEQUAL: &str = "NOTEQUAL";
pub const KW_COMPARE_LESS: &str = "LESS";
pub const KW_COMPARE_GREATER: &str = "GREATER";
pub const KW_COMPARE_LESSEQUAL: &str = "LESSEQUAL";
pub const KW_COMPARE_GREATEREQUAL: &str = "GREATEREQUAL";
pub const KW_COMPARE_REGEX: &str = "REGEX";
pub const KW_COMPARE_ISNULL: &str = "ISNULL";
pub const KW_COMPARE_ISNOTNULL: &str = "ISNOTNULL";

// X-LIC-ERRORTYPE values
pub const KW_ERROR_COMPONENT_PARSE: &str = "COMPONENT-PARSE-ERROR";
pub const KW_ERROR_PROPERTY_PARSE: &str = "PROPERTY-PARSE-ERROR";
pub const KW_ERROR_PARAMETER_NAME_PARSE: &str = "PARAMETER-NAME-PARSE-ERROR";
pub const KW_ERROR_PARAMETER_VALUE_PARSE: &str = "PARAMETER-VALUE-PARSE-ERROR";
pub const KW_ERROR_VALUE_PARSE: &str = "VALUE-PARSE-ERROR";
pub const KW_ERROR_INVALID_ITIP: &str = "INVALID-ITIP";
pub const KW_ERROR_UNKNOWN_VCAL_PROP: &str = "UNKNOWN-VCAL-PROP-ERROR";
pub const KW_ERROR_MIME_PARSE: &str = "MIME-PARSE-ERROR";

// Section 3.3 - Property Value Data Types
pub const KW_BINARY: &str = "BINARY";
pub const KW_BOOLEAN: &str = "BOOLEAN";
pub const KW_CAL_ADDRESS: &str = "CAL-ADDRESS";
pub const KW_DATE: &str = "DATE";
pub const KW_DATETIME: &str = "DATE-TIME";
pub const KW_DURATION: &str = "DURATION";
pub const KW_FLOAT: &str = "FLOAT";
pub const KW_INTEGER: &str = "INTEGER";
pub const KW_PERIOD: &str = "PERIOD";
pub const KW_RECUR: &str = "RECUR";
pub const KW_TEXT: &str = "TEXT";
pub const KW_TIME: &str = "TIME";
pub const KW_URI: &str = "URI";
pub const KW_UTC_OFFSET: &str = "UTC-OFFSET";
pub const KW_TRUE: &str = "TRUE";
pub const KW_FALSE: &str = "FALSE";

// Section 3.7 - Calendar Properties
pub const KW_CALSCALE: &str = "CALSCALE";
pub const KW_METHOD: &str = "METHOD";
pub const KW_PRODID: &str = "PRODID";
pub const KW_VERSION: &str = "VERSION";

// Section 3.8.1 - Descriptive Component Properties
pub const KW_ATTACH: &str = "ATTACH";
pub const KW_CATEGORIES: &str = "CATEGORIES";
pub const KW_CLASS: &str = "CLASS";
pub const KW_COMMENT: &str = "COMMENT";
pub const KW_DESCRIPTION: &str = "DESCRIPTION";
pub const KW_GEO: &str = "GEO";
pub const KW_LOCATION: &str = "LOCATION";
pub const KW_PERCENT_COMPLETE: &str = "PERCENT-COMPLETE";
pub const KW_PRIORITY: &str = "PRIORITY";
pub const KW_RESOURCES: &str = "RESOURCES";
pub const KW_STATUS: &str = "STATUS";
pub const KW_SUMMARY: &str = "SUMMARY";

// Section 3.8.2 - Date and Time Component Properties
pub const KW_COMPLETED: &str = "COMPLETED";
pub const KW_DTEND: &str = "DTEND";
pub const KW_DUE: &str = "DUE";
pub const KW_DTSTART: &str = "DTSTART";
pub const KW_FREEBUSY: &str = "FREEBUSY";
pub const KW_TRANSP: &str = "TRANSP";

// Section 3.8.3 - Time Zone Component Properties
pub const KW_TZNAME: &str = "TZNAME";
pub const KW_TZOFFSETFROM: &str = "TZOFFSETFROM";
pub const KW_TZOFFSETTO: &str = "TZOFFSETTO";
pub const KW_TZURL: &str = "TZURL";

// Section 3.8.4 - Relationship Component Properties
pub const KW_ATTENDEE: &str = "ATTENDEE";
pub const KW_CONTACT: &str = "CONTACT";
pub const KW_ORGANIZER: &str = "ORGANIZER";
pub const KW_RECURRENCE_ID: &str = "RECURRENCE-ID";
pub const KW_RELATED_TO: &str = "RELATED-TO";
pub const KW_URL: &str = "URL";
pub const KW_UID: &str = "UID";

// Section 3.8.5 - Recurrence Component Properties
pub const KW_EXDATE: &str = "EXDATE";
pub const KW_EXRULE: &str = "EXRULE";
pub const KW_RDATE: &str = "RDATE";
pub const KW_RRULE: &str = "RRULE";

// Section 3.8.6 - Alarm Component Properties
pub const KW_ACTION: &str = "ACTION";
pub const KW_REPEAT: &str = "REPEAT";
pub const KW_TRIGGER: &str = "TRIGGER";

// Section 3.8.7 - Change Management Component Properties
pub const KW_CREATED: &str = "CREATED";
pub const KW_DTSTAMP: &str = "DTSTAMP";
pub const KW_LAST_MODIFIED: &str = "LAST-MODIFIED";
pub const KW_SEQUENCE: &str = "SEQUENCE";

// Section 3.8.8 - Miscellaneous Component Properties
pub const KW_REQUEST_STATUS: &str = "REQUEST-STATUS";

// Store bookkeeping
pub const KW_RELCALID: &str = "RELCALID";
pub const KW_X_LIC_ERROR: &str = "X-LIC-ERROR";

// Section 3.3.10 - Recurrence Rule
pub const KW_RRULE_FREQ: &str = "FREQ";
pub const KW_RRULE_UNTIL: &str = "UNTIL";
pub const KW_RRULE_COUNT: &str = "COUNT";
pub const KW_RRULE_INTERVAL: &str = "INTERVAL";
pub const KW_RRULE_BYSECOND: &str = "BYSECOND";
pub const KW_RRULE_BYMINUTE: &str = "BYMINUTE";
pub const KW_RRULE_BYHOUR: &str = "BYHOUR";
pub const KW_RRULE_BYDAY: &str = "BYDAY";
pub const KW_RRULE_BYMONTHDAY: &str = "BYMONTHDAY";
pub const KW_RRULE_BYYEARDAY: &str = "BYYEARDAY";
pub const KW_RRULE_BYWEEKNO: &str = "BYWEEKNO";
pub const KW_RRULE_BYMONTH: &str = "BYMONTH";
pub const KW_RRULE_BYSETPOS: &str = "BYSETPOS";
pub const KW_RRULE_WKST: &str = "WKST";
pub const KW_RRULE_FREQ_SECONDLY: &str = "SECONDLY";
pub const KW_RRULE_FREQ_MINUTELY: &str = "MINUTELY";
pub const KW_RRULE_FREQ_HOURLY: &str = "HOURLY";
pub const KW_RRULE_FREQ_DAILY: &str = "DAILY";
pub const KW_RRULE_FREQ_WEEKLY: &str = "WEEKLY";
pub const KW_RRULE_FREQ_MONTHLY: &str = "MONTHLY";
pub const KW_RRULE_FREQ_YEARLY: &str = "YEARLY";
pub const KW_DAY_SU: &str = "SU";
pub const KW_DAY_MO: &str = "MO";
pub const KW_DAY_TU: &str = "TU";
pub const KW_DAY_WE: &str = "WE";
pub const KW_DAY_TH: &str = "TH";
pub const KW_DAY_FR: &str = "FR";
pub const KW_DAY_SA: &str = "SA";

// Status and transparency values consulted by span computation
pub const KW_STATUS_CANCELLED: &str = "CANCELLED";
pub const KW_STATUS_TENTATIVE: &str = "TENTATIVE";
pub const KW_TRANSP_TRANSPARENT: &str = "TRANSPARENT";
