// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Property parameters as defined in RFC 5545 Section 3.2, plus the
//! `X-LIC-` parameters used to annotate errors and gauge comparisons.

use crate::error::Error;
use crate::keyword::{
    KW_ALTREP, KW_ANY, KW_CN, KW_COMPARE_EQUAL, KW_COMPARE_GREATER, KW_COMPARE_GREATEREQUAL,
    KW_COMPARE_ISNOTNULL, KW_COMPARE_ISNULL, KW_COMPARE_LESS, KW_COMPARE_LESSEQUAL,
    KW_COMPARE_NOTEQUAL, KW_COMPARE_REGEX, KW_CUTYPE, KW_CUTYPE_GROUP, KW_CUTYPE_INDIVIDUAL,
    KW_CUTYPE_RESOURCE, KW_CUTYPE_ROOM, KW_CUTYPE_UNKNOWN, KW_DELEGATED_FROM, KW_DELEGATED_TO,
    KW_DIR, KW_DISPLAY, KW_ENCODING, KW_ENCODING_8BIT, KW_ENCODING_BASE64, KW_FALSE, KW_FBTYPE,
    KW_FBTYPE_BUSY, KW_FBTYPE_BUSY_TENTATIVE, KW_FBTYPE_BUSY_UNAVAILABLE, KW_FBTYPE_FREE,
    KW_FMTTYPE, KW_LANGUAGE, KW_MEMBER, KW_PARTSTAT, KW_PARTSTAT_ACCEPTED, KW_PARTSTAT_COMPLETED,
    KW_PARTSTAT_DECLINED, KW_PARTSTAT_DELEGATED, KW_PARTSTAT_IN_PROCESS, KW_PARTSTAT_NEEDS_ACTION,
    KW_PARTSTAT_TENTATIVE, KW_RANGE, KW_RANGE_THISANDFUTURE, KW_RANGE_THISANDPRIOR, KW_RELATED,
    KW_RELATED_END, KW_RELATED_START, KW_RELTYPE, KW_RELTYPE_CHILD, KW_RELTYPE_PARENT,
    KW_RELTYPE_SIBLING, KW_ROLE, KW_ROLE_CHAIR, KW_ROLE_NON_PARTICIPANT, KW_ROLE_OPT_PARTICIPANT,
    KW_ROLE_REQ_PARTICIPANT, KW_RSVP, KW_SENT_BY, KW_TRUE, KW_TZID, KW_VALUE, KW_X,
    KW_X_LIC_COMPARETYPE, KW_X_LIC_ERRORTYPE,
};
use crate::value::ValueKind;

impl_kind_mapping! {
    /// Kinds of iCalendar parameters
    enum ParameterKind {
        /// ALTREP
        AltRep => KW_ALTREP,
        /// CN
        Cn => KW_CN,
        /// CUTYPE
        CuType => KW_CUTYPE,
        /// DELEGATED-FROM
        DelegatedFrom => KW_DELEGATED_FROM,
        /// DELEGATED-TO
        DelegatedTo => KW_DELEGATED_TO,
        /// DIR
        Dir => KW_DIR,
        /// DISPLAY (RFC 7986)
        Display => KW_DISPLAY,
        /// ENCODING
        Encoding => KW_ENCODING,
        /// FMTTYPE
        FmtType => KW_FMTTYPE,
        /// FBTYPE
        FbType => KW_FBTYPE,
        /// LANGUAGE
        Language => KW_LANGUAGE,
        /// MEMBER
        Member => KW_MEMBER,
        /// PARTSTAT
        PartStat => KW_PARTSTAT,
        /// RANGE
        Range => KW_RANGE,
        /// RELATED
        Related => KW_RELATED,
        /// RELTYPE
        RelType => KW_RELTYPE,
        /// ROLE
        Role => KW_ROLE,
        /// RSVP
        Rsvp => KW_RSVP,
        /// SENT-BY
        SentBy => KW_SENT_BY,
        /// TZID
        Tzid => KW_TZID,
        /// VALUE
        Value => KW_VALUE,
        /// X-LIC-ERRORTYPE, the category of a recovered parse error
        XLicErrorType => KW_X_LIC_ERRORTYPE,
        /// X-LIC-COMPARETYPE, the operator of a gauge condition
        XLicCompareType => KW_X_LIC_COMPARETYPE,
        /// Any other parameter
        X => KW_X,
        /// Wildcard used when searching; never carried by a parameter
        Any => KW_ANY,
    }
}

impl ParameterKind {
    /// Whether a parameter of this kind matches a search for `wanted`.
    #[must_use]
    pub fn matches(self, wanted: ParameterKind) -> bool {
        wanted == ParameterKind::Any || self == wanted
    }
}

define_param_enum! {
    /// Calendar user type, RFC 5545 Section 3.2.3.
    enum CalendarUserType {
        /// An individual
        Individual => KW_CUTYPE_INDIVIDUAL,
        /// A group of individuals
        Group => KW_CUTYPE_GROUP,
        /// A physical resource
        Resource => KW_CUTYPE_RESOURCE,
        /// A room resource
        Room => KW_CUTYPE_ROOM,
        /// Otherwise not known
        Unknown => KW_CUTYPE_UNKNOWN,
    }
}

define_param_enum! {
    /// Inline encoding, RFC 5545 Section 3.2.7.
    enum Encoding {
        /// 8bit text
        EightBit => KW_ENCODING_8BIT,
        /// Base64 binary
        Base64 => KW_ENCODING_BASE64,
    }
}

define_param_enum! {
    /// Free/busy time type, RFC 5545 Section 3.2.9.
    enum FreeBusyType {
        /// Free for scheduling
        Free => KW_FBTYPE_FREE,
        /// Busy
        Busy => KW_FBTYPE_BUSY,
        /// Busy and unavailable
        BusyUnavailable => KW_FBTYPE_BUSY_UNAVAILABLE,
        /// Tentatively busy
        BusyTentative => KW_FBTYPE_BUSY_TENTATIVE,
    }
}

define_param_enum! {
    /// Participation status, RFC 5545 Section 3.2.12.
    enum ParticipationStatus {
        /// Needs action
        NeedsAction => KW_PARTSTAT_NEEDS_ACTION,
        /// Accepted
        Accepted => KW_PARTSTAT_ACCEPTED,
        /// Declined
        Declined => KW_PARTSTAT_DECLINED,
        /// Tentatively accepted
        Tentative => KW_PARTSTAT_TENTATIVE,
        /// Delegated
        Delegated => KW_PARTSTAT_DELEGATED,
        /// To-do completed
        Completed => KW_PARTSTAT_COMPLETED,
        /// To-do in process
        InProcess => KW_PARTSTAT_IN_PROCESS,
    }
}

define_param_enum! {
    /// Recurrence identifier range, RFC 5545 Section 3.2.13.
    enum RecurrenceIdRange {
        /// This and all later instances
        ThisAndFuture => KW_RANGE_THISANDFUTURE,
        /// This and all earlier instances, deprecated
        ThisAndPrior => KW_RANGE_THISANDPRIOR,
    }
}

define_param_enum! {
    /// Alarm trigger relationship, RFC 5545 Section 3.2.14.
    enum TriggerRelated {
        /// Relative to the start
        Start => KW_RELATED_START,
        /// Relative to the end
        End => KW_RELATED_END,
    }
}

define_param_enum! {
    /// Relationship type, RFC 5545 Section 3.2.15.
    enum RelationshipType {
        /// Parent
        Parent => KW_RELTYPE_PARENT,
        /// Child
        Child => KW_RELTYPE_CHILD,
        /// Sibling
        Sibling => KW_RELTYPE_SIBLING,
    }
}

define_param_enum! {
    /// Participation role, RFC 5545 Section 3.2.16.
    enum ParticipationRole {
        /// Chair
        Chair => KW_ROLE_CHAIR,
        /// Required participant
        ReqParticipant => KW_ROLE_REQ_PARTICIPANT,
        /// Optional participant
        OptParticipant => KW_ROLE_OPT_PARTICIPANT,
        /// For information only
        NonParticipant => KW_ROLE_NON_PARTICIPANT,
    }
}

impl_kind_mapping! {
    /// Comparison operator of a gauge condition.
    enum CompareType {
        /// Equal
        Equal => KW_COMPARE_EQUAL,
        /// Not equal
        NotEqual => KW_COMPARE_NOTEQUAL,
        /// Less than
        Less => KW_COMPARE_LESS,
        /// Greater than
        Greater => KW_COMPARE_GREATER,
        /// Less than or equal
        LessEqual => KW_COMPARE_LESSEQUAL,
        /// Greater than or equal
        GreaterEqual => KW_COMPARE_GREATEREQUAL,
        /// Regular expression match on the value text
        Regex => KW_COMPARE_REGEX,
        /// The property is absent
        IsNull => KW_COMPARE_ISNULL,
        /// The property is present
        IsNotNull => KW_COMPARE_ISNOTNULL,
    }
}

/// A property parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Alternate text representation URI
    AltRep(String),
    /// Common name
    Cn(String),
    /// Calendar user type
    CuType(CalendarUserType),
    /// Delegators
    DelegatedFrom(Vec<String>),
    /// Delegatees
    DelegatedTo(Vec<String>),
    /// Directory entry reference
    Dir(String),
    /// Image display modes
    Display(Vec<String>),
    /// Inline encoding
    Encoding(Encoding),
    /// Media type
    FmtType(String),
    /// Free/busy type
    FbType(FreeBusyType),
    /// Language tag
    Language(String),
    /// Group or list memberships
    Member(Vec<String>),
    /// Participation status
    PartStat(ParticipationStatus),
    /// Recurrence identifier range
    Range(RecurrenceIdRange),
    /// Alarm trigger relationship
    Related(TriggerRelated),
    /// Relationship type
    RelType(RelationshipType),
    /// Participation role
    Role(ParticipationRole),
    /// Reply expected
    Rsvp(bool),
    /// Acting on behalf of
    SentBy(String),
    /// Time zone identifier
    Tzid(String),
    /// Value data type
    Value(ValueKind),
    /// Category of a recovered parse error
    XLicErrorType(String),
    /// Operator of a gauge condition
    XLicCompareType(CompareType),
    /// Experimental or unrecognized parameter
    X {
        /// Parameter name as written
        name: String,
        /// Values, unquoted
        values: Vec<String>,
    },
}

impl Parameter {
    /// Builds a parameter from its name and unquoted values.
    ///
    /// Unknown names and unknown `VALUE=` data types are kept as
    /// [`Parameter::X`], so they survive a round trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] when a known parameter has the wrong
    /// number of values or a value outside its vocabulary.
    pub fn parse(name: &str, mut values: Vec<String>) -> Result<Self, Error> {
        let Ok(kind) = name.parse::<ParameterKind>() else {
            return Ok(Parameter::X {
                name: name.to_string(),
                values,
            });
        };

        let multi = matches!(
            kind,
            ParameterKind::DelegatedFrom
                | ParameterKind::DelegatedTo
                | ParameterKind::Display
                | ParameterKind::Member
        );
        if !multi && values.len() != 1 {
            return Err(Error::malformed(format!(
                "parameter {name} takes exactly one value, got {}",
                values.len()
            )));
        }
        if multi {
            return Ok(match kind {
                ParameterKind::DelegatedFrom => Parameter::DelegatedFrom(values),
                ParameterKind::DelegatedTo => Parameter::DelegatedTo(values),
                ParameterKind::Display => Parameter::Display(values),
                _ => Parameter::Member(values),
            });
        }

        let value = values.pop().unwrap_or_default();
        Ok(match kind {
            ParameterKind::AltRep => Parameter::AltRep(value),
            ParameterKind::Cn => Parameter::Cn(value),
            ParameterKind::CuType => Parameter::CuType(value.as_str().into()),
            ParameterKind::Dir => Parameter::Dir(value),
            ParameterKind::Encoding => Parameter::Encoding(value.as_str().into()),
            ParameterKind::FmtType => Parameter::FmtType(value),
            ParameterKind::FbType => Parameter::FbType(value.as_str().into()),
            ParameterKind::Language => Parameter::Language(value),
            ParameterKind::PartStat => Parameter::PartStat(value.as_str().into()),
            ParameterKind::Range => Parameter::Range(value.as_str().into()),
            ParameterKind::Related => Parameter::Related(value.as_str().into()),
            ParameterKind::RelType => Parameter::RelType(value.as_str().into()),
            ParameterKind::Role => Parameter::Role(value.as_str().into()),
            ParameterKind::Rsvp => match value {
                v if v.eq_ignore_ascii_case(KW_TRUE) => Parameter::Rsvp(true),
                v if v.eq_ignore_ascii_case(KW_FALSE) => Parameter::Rsvp(false),
                v => return Err(Error::malformed(format!("invalid {KW_RSVP} value {v:?}"))),
            },
            ParameterKind::SentBy => Parameter::SentBy(value),
            ParameterKind::Tzid => Parameter::Tzid(value),
            ParameterKind::Value => match value.parse::<ValueKind>() {
                Ok(kind) => Parameter::Value(kind),
                Err(()) => Parameter::X {
                    name: name.to_string(),
                    values: vec![value],
                },
            },
            ParameterKind::XLicErrorType => Parameter::XLicErrorType(value),
            ParameterKind::XLicCompareType => match value.parse::<CompareType>() {
                Ok(op) => Parameter::XLicCompareType(op),
                Err(()) => {
                    return Err(Error::malformed(format!(
                        "invalid {KW_X_LIC_COMPARETYPE} value {value:?}"
                    )));
                }
            },
            ParameterKind::DelegatedFrom
            | ParameterKind::DelegatedTo
            | ParameterKind::Display
            | ParameterKind::Member
            | ParameterKind::X
            | ParameterKind::Any => Parameter::X {
                name: name.to_string(),
                values: vec![value],
            },
        })
    }

    /// The kind of this parameter.
    #[must_use]
    pub fn kind(&self) -> ParameterKind {
        match self {
            Parameter::AltRep(_) => ParameterKind::AltRep,
            Parameter::Cn(_) => ParameterKind::Cn,
            Parameter::CuType(_) => ParameterKind::CuType,
            Parameter::DelegatedFrom(_) => ParameterKind::DelegatedFrom,
            Parameter::DelegatedTo(_) => ParameterKind::DelegatedTo,
            Parameter::Dir(_) => ParameterKind::Dir,
            Parameter::Display(_) => ParameterKind::Display,
            Parameter::Encoding(_) => ParameterKind::Encoding,
            Parameter::FmtType(_) => ParameterKind::FmtType,
            Parameter::FbType(_) => ParameterKind::FbType,
            Parameter::Language(_) => ParameterKind::Language,
            Parameter::Member(_) => ParameterKind::Member,
            Parameter::PartStat(_) => ParameterKind::PartStat,
            Parameter::Range(_) => ParameterKind::Range,
            Parameter::Related(_) => ParameterKind::Related,
            Parameter::RelType(_) => ParameterKind::RelType,
            Parameter::Role(_) => ParameterKind::Role,
            Parameter::Rsvp(_) => ParameterKind::Rsvp,
            Parameter::SentBy(_) => ParameterKind::SentBy,
            Parameter::Tzid(_) => ParameterKind::Tzid,
            Parameter::Value(_) => ParameterKind::Value,
            Parameter::XLicErrorType(_) => ParameterKind::XLicErrorType,
            Parameter::XLicCompareType(_) => ParameterKind::XLicCompareType,
            Parameter::X { .. } => ParameterKind::X,
        }
    }

    /// The name as written in a content line.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Parameter::X { name, .. } => name,
            _ => self.kind().name(),
        }
    }

    /// The values in serialization order, unquoted.
    #[must_use]
    pub fn values(&self) -> Vec<String> {
        match self {
            Parameter::AltRep(v)
            | Parameter::Cn(v)
            | Parameter::Dir(v)
            | Parameter::FmtType(v)
            | Parameter::Language(v)
            | Parameter::SentBy(v)
            | Parameter::Tzid(v)
            | Parameter::XLicErrorType(v) => vec![v.clone()],
            Parameter::DelegatedFrom(vs)
            | Parameter::DelegatedTo(vs)
            | Parameter::Display(vs)
            | Parameter::Member(vs)
            | Parameter::X { values: vs, .. } => vs.clone(),
            Parameter::CuType(v) => vec![v.to_string()],
            Parameter::Encoding(v) => vec![v.to_string()],
            Parameter::FbType(v) => vec![v.to_string()],
            Parameter::PartStat(v) => vec![v.to_string()],
            Parameter::Range(v) => vec![v.to_string()],
            Parameter::Related(v) => vec![v.to_string()],
            Parameter::RelType(v) => vec![v.to_string()],
            Parameter::Role(v) => vec![v.to_string()],
            Parameter::Rsvp(true) => vec![KW_TRUE.to_string()],
            Parameter::Rsvp(false) => vec![KW_FALSE.to_string()],
            Parameter::Value(kind) => vec![kind.name().to_string()],
            Parameter::XLicCompareType(op) => vec![op.name().to_string()],
        }
    }

    /// Whether this parameter has the given name, ignoring case.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str, values: &[&str]) -> Result<Parameter, Error> {
        Parameter::parse(name, values.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn parses_known_parameters() {
        assert_eq!(
            parse("TZID", &["America/New_York"]).expect("Failed to parse TZID"),
            Parameter::Tzid("America/New_York".to_string())
        );
        assert_eq!(
            parse("rsvp", &["true"]).expect("Failed to parse RSVP"),
            Parameter::Rsvp(true)
        );
        assert_eq!(
            parse("VALUE", &["DATE"]).expect("Failed to parse VALUE"),
            Parameter::Value(ValueKind::Date)
        );
        assert_eq!(
            parse("PARTSTAT", &["X-MAYBE"]).expect("Failed to parse PARTSTAT"),
            Parameter::PartStat(ParticipationStatus::X("X-MAYBE".to_string()))
        );
        assert_eq!(
            parse("MEMBER", &["mailto:a@example.com", "mailto:b@example.com"])
                .expect("Failed to parse MEMBER")
                .values()
                .len(),
            2
        );
    }

    #[test]
    fn keeps_unknown_parameters() {
        let param = parse("X-FOO", &["bar", "baz"]).expect("Failed to parse X-FOO");
        assert_eq!(param.kind(), ParameterKind::X);
        assert_eq!(param.name(), "X-FOO");
        assert_eq!(param.values(), vec!["bar", "baz"]);

        let param = parse("VALUE", &["X-CUSTOM"]).expect("Failed to parse VALUE");
        assert_eq!(param.kind(), ParameterKind::X);
        assert!(param.has_name("value"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse("RSVP", &["maybe"]).is_err());
        assert!(parse("TZID", &["a", "b"]).is_err());
        assert!(parse("X-LIC-COMPARETYPE", &["SIMILAR"]).is_err());
    }

    #[test]
    fn wildcard_kind_matches_everything() {
        assert!(ParameterKind::Tzid.matches(ParameterKind::Any));
        assert!(ParameterKind::Tzid.matches(ParameterKind::Tzid));
        assert!(!ParameterKind::Tzid.matches(ParameterKind::Role));
    }
}
