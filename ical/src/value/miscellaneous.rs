// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Parsers for the scalar value types of RFC 5545 Section 3.3, and the
//! helpers shared by every value parser.

use std::borrow::Cow;

use chumsky::Parser;
use chumsky::error::RichPattern;
use chumsky::extra::ParserExtra;
use chumsky::input::Input;
use chumsky::label::LabelError;
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::error::Error;

/// Failure reasons when a specific value type was expected but not found.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueExpected {
    /// A date value was expected
    Date,
    /// A 64-bit floating-point value was expected
    F64,
    /// A 32-bit signed integer value was expected
    I32,
    /// A 32-bit unsigned integer value was expected
    U32,
    /// Period date-times must have consistent timezone (both UTC or both floating)
    MismatchedTimezone,
    /// A recurrence rule part appeared twice
    RRuleDuplicatePart,
    /// A recurrence rule lacks FREQ
    RRuleRequiredFreq,
    /// A recurrence rule carries both COUNT and UNTIL
    RRuleCountUntilExclusion,
    /// A recurrence rule list element is out of range
    RRuleOutOfRange,
}

impl From<ValueExpected> for RichPattern<'_, char> {
    fn from(expected: ValueExpected) -> Self {
        match expected {
            ValueExpected::Date => Self::Label(Cow::Borrowed("invalid date")),
            ValueExpected::F64 => Self::Label(Cow::Borrowed("f64 out of range")),
            ValueExpected::I32 => Self::Label(Cow::Borrowed("i32 out of range")),
            ValueExpected::U32 => Self::Label(Cow::Borrowed("u32 out of range")),
            ValueExpected::MismatchedTimezone => Self::Label(Cow::Borrowed(
                "period date-times must have consistent timezone",
            )),
            ValueExpected::RRuleDuplicatePart => {
                Self::Label(Cow::Borrowed("rule part must not occur more than once"))
            }
            ValueExpected::RRuleRequiredFreq => Self::Label(Cow::Borrowed("FREQ is required")),
            ValueExpected::RRuleCountUntilExclusion => {
                Self::Label(Cow::Borrowed("COUNT and UNTIL are mutually exclusive"))
            }
            ValueExpected::RRuleOutOfRange => {
                Self::Label(Cow::Borrowed("rule part value out of range"))
            }
        }
    }
}

/// Runs `parser` over the whole of `src`, turning chumsky errors into [`Error`].
pub(crate) fn parse_complete<'src, T>(
    parser: impl Parser<'src, &'src str, T, extra::Err<Rich<'src, char>>>,
    src: &'src str,
    what: &str,
) -> Result<T, Error> {
    parser.parse(src).into_result().map_err(|errs| {
        match errs.into_iter().next() {
            Some(err) => {
                let span = err.span();
                Error::malformed_at(
                    format!("invalid {what} value {src:?}: {err}"),
                    span.start..span.end,
                )
            }
            None => Error::malformed(format!("invalid {what} value {src:?}")),
        }
    })
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// binary     = *(4b-char) [b-end]
/// ; A "BASE64" encoded character string, as defined by [RFC4648].
///
/// b-end      = (2b-char "==") / (3b-char "=")
///
/// b-char = ALPHA / DIGIT / "+" / "/"
/// ```
pub fn value_binary<'src, I, E>() -> impl Parser<'src, I, (), E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    let b_char = select! {
        'A'..='Z' => (),
        'a'..='z' => (),
        '0'..='9' => (),
        '+' => (),
        '/' => (),
    };

    let quartet = b_char.repeated().exactly(4).ignored();

    let b_end = b_char
        .repeated()
        .exactly(2)
        .ignored()
        .then_ignore(just('=').then_ignore(just('=')))
        .or(b_char.repeated().exactly(3).ignored().then_ignore(just('=')))
        .ignored();

    quartet
        .repeated()
        .ignore_then(b_end.or_not())
        .ignored()
        .then_ignore(end())
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// boolean    = "TRUE" / "FALSE"
/// ```
///
/// These values are case-insensitive text.
pub fn value_boolean<'src, I, E>() -> impl Parser<'src, I, bool, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    let t = choice((just('T'), just('t')))
        .ignore_then(choice((just('R'), just('r'))))
        .ignore_then(choice((just('U'), just('u'))))
        .ignore_then(choice((just('E'), just('e'))))
        .to(true);

    let f = choice((just('F'), just('f')))
        .ignore_then(choice((just('A'), just('a'))))
        .ignore_then(choice((just('L'), just('l'))))
        .ignore_then(choice((just('S'), just('s'))))
        .ignore_then(choice((just('E'), just('e'))))
        .to(false);

    choice((t, f))
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// integer    = (["+"] / "-") 1*DIGIT
/// ```
pub fn value_integer<'src, I, E>() -> impl Parser<'src, I, i32, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    sign()
        .or_not()
        .then(digits())
        .try_map_with(|(sign, digits), e| {
            let mut s = String::with_capacity(digits.len() + 1);
            if let Some(sign) = sign {
                s.push(sign);
            }
            s.push_str(&digits);
            match lexical::parse::<i32, _>(&s) {
                Ok(v) => Ok(v),
                Err(_) => Err(E::Error::expected_found([ValueExpected::I32], None, e.span())),
            }
        })
}

/// Format Definition:  This value type is defined by the following notation:
///
/// ```txt
/// float      = (["+"] / "-") 1*DIGIT ["." 1*DIGIT]
/// ```
pub fn value_float<'src, I, E>() -> impl Parser<'src, I, f64, E>
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    let fractional_part = just('.').ignore_then(digits());

    sign()
        .or_not()
        .then(digits())
        .then(fractional_part.or_not())
        .try_map_with(|((sign, int_part), frac_part), e| {
            let mut s = String::with_capacity(int_part.len() + 16);
            if let Some(sign) = sign {
                s.push(sign);
            }
            s.push_str(&int_part);
            if let Some(frac) = frac_part {
                s.push('.');
                s.push_str(&frac);
            }

            match lexical::parse::<f64, _>(&s) {
                Ok(f) if f.is_finite() => Ok(f),
                _ => Err(E::Error::expected_found([ValueExpected::F64], None, e.span())),
            }
        })
}

/// Unsigned integer of at most ten digits, as used by durations and rule parts.
pub(crate) fn value_u32<'src, I, E>() -> impl Parser<'src, I, u32, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
    E::Error: LabelError<'src, I, ValueExpected>,
{
    select! { c @ '0'..='9' => c }
        .repeated()
        .at_least(1)
        .at_most(10) // u32 max is 10 digits: 4_294_967_295
        .collect::<String>()
        .try_map_with(|str, e| match lexical::parse_partial::<u32, _>(&str) {
            Ok((v, n)) if n == str.len() => Ok(v),
            _ => Err(E::Error::expected_found([ValueExpected::U32], None, e.span())),
        })
}

pub(crate) fn sign<'src, I, E>() -> impl Parser<'src, I, char, E> + Copy
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    select! { c @ ('+' | '-') => c }
}

fn digits<'src, I, E>() -> impl Parser<'src, I, String, E> + Clone
where
    I: Input<'src, Token = char, Span = SimpleSpan>,
    E: ParserExtra<'src, I>,
{
    select! { c @ '0'..='9' => c }
        .repeated()
        .at_least(1)
        .collect::<String>()
}

macro_rules! define_digit_select {
    ($fname:ident : $ty:ty => { $($ch:literal),+ $(,)? }) => {
        #[allow(trivial_numeric_casts, clippy::cast_lossless, clippy::char_lit_as_u8, clippy::cast_possible_wrap)]
        pub(crate) const fn $fname<'src, I, E>() -> impl Parser<'src, I, $ty, E> + Copy
        where
            I: Input<'src, Token = char, Span = SimpleSpan>,
            E: ParserExtra<'src, I>,
        {
            select! {
                $(
                    $ch => (($ch as u8 - b'0') as $ty),
                )+
            }
        }
    };
}

define_digit_select!(u8_0_1 : u8 => { '0', '1' });
define_digit_select!(u8_0_3 : u8 => { '0', '1', '2', '3' });
define_digit_select!(u8_0_5 : u8 => { '0', '1', '2', '3', '4', '5' });
define_digit_select!(u8_0_9 : u8 => { '0', '1', '2', '3', '4', '5', '6', '7', '8', '9' });
define_digit_select!(i8_0_1 : i8 => { '0', '1' });
define_digit_select!(i8_0_2 : i8 => { '0', '1', '2' });
define_digit_select!(i8_0_9 : i8 => { '0', '1', '2', '3', '4', '5', '6', '7', '8', '9' });
define_digit_select!(i8_1_2 : i8 => { '1', '2' });
define_digit_select!(i8_1_9 : i8 => { '1', '2', '3', '4', '5', '6', '7', '8', '9' });
define_digit_select!(i16_0_9 : i16 => { '0', '1', '2', '3', '4', '5', '6', '7', '8', '9' });

#[cfg(test)]
mod tests {
    use chumsky::input::Stream;

    use super::*;

    #[test]
    fn parses_binary() {
        fn check(src: &str) -> Result<(), Vec<Rich<'_, char>>> {
            let stream = Stream::from_iter(src.chars());
            value_binary::<'_, _, extra::Err<_>>()
                .parse(stream)
                .into_result()
        }

        let success_cases = [
            // example from RFC 5545 Section 3.1.3 (with the errata padding)
            "VGhlIHF1aWNrIGJyb3duIGZveCBqdW1wcyBvdmVyIHRoZSBsYXp5IGRvZy4=",
            "TWFu",
            "TQ==",
            "TWE=",
            "SGVsbG8=",
            "",
        ];
        for src in success_cases {
            assert!(check(src).is_ok(), "Parse {src} should succeed");
        }

        for src in ["TQ===", "TWFu=", "TWFuA", "T@Fu"] {
            assert!(check(src).is_err(), "Parse {src} should fail");
        }
    }

    #[test]
    fn parses_boolean() {
        fn parse(src: &str) -> Result<bool, Vec<Rich<'_, char>>> {
            let stream = Stream::from_iter(src.chars());
            value_boolean::<'_, _, extra::Err<_>>()
                .parse(stream)
                .into_result()
        }

        for (src, expected) in [("TRUE", true), ("true", true), ("False", false)] {
            assert_eq!(parse(src).unwrap(), expected);
        }
        for src in ["True ", "T RUE", "1", "YES", ""] {
            assert!(parse(src).is_err(), "Parse {src} should fail");
        }
    }

    #[test]
    fn parses_integer_and_float() {
        assert_eq!(parse_complete(value_integer(), "-42", "INTEGER"), Ok(-42));
        assert_eq!(parse_complete(value_integer(), "+7", "INTEGER"), Ok(7));
        assert!(parse_complete(value_integer(), "99999999999", "INTEGER").is_err());
        assert!(parse_complete(value_integer(), "4.5", "INTEGER").is_err());

        assert_eq!(parse_complete(value_float(), "1000000.0000001", "FLOAT"), Ok(1_000_000.000_000_1));
        assert_eq!(parse_complete(value_float(), "-1.333", "FLOAT"), Ok(-1.333));
        assert!(parse_complete(value_float(), "1.", "FLOAT").is_err());
    }

    #[test]
    fn parse_complete_reports_span() {
        let err = parse_complete(value_integer(), "12x", "INTEGER").unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedData);
        assert!(err.span().is_some());
    }
}
