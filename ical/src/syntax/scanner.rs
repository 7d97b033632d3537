// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Scanner splitting a content line into group, name, parameters and raw value.
//!
//! ```text
//! contentline = [group "."] name *(";" param) ":" value
//! param       = param-name "=" param-value *("," param-value)
//! ```
//!
//! A broken parameter does not lose the whole line: it is skipped up to the
//! next `;` or `:` and reported in [`ContentLine::errors`]. Only a line
//! without a name or without a value separator is rejected outright.

use std::iter::Peekable;
use std::ops::Range;

use crate::syntax::lexer::{SpannedToken, Token, tokenize};

/// A scanned content line. Parameter values are unquoted, the value is raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// Group prefix, such as `item1` in `item1.URL`
    pub group: Option<String>,
    /// Property name as written
    pub name: String,
    /// Parameters in order of appearance
    pub parameters: Vec<ScannedParameter>,
    /// Everything after the first unquoted colon
    pub value: String,
    /// Byte range of the value in the line
    pub value_span: Range<usize>,
    /// Parameters that could not be scanned and were skipped
    pub errors: Vec<ContentLineError>,
}

/// A parameter as written: name plus comma-separated values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedParameter {
    /// Parameter name as written
    pub name: String,
    /// Values with surrounding double quotes removed
    pub values: Vec<String>,
    /// Byte range of the parameter, without the leading `;`
    pub span: Range<usize>,
}

/// Ways a content line can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentLineError {
    /// The line holds nothing.
    #[error("empty content line")]
    EmptyLine,

    /// The line does not start with a property name.
    #[error("expected property name at {span:?}")]
    MissingName {
        /// Where the name was expected
        span: Range<usize>,
    },

    /// No colon separates the name and parameters from the value.
    #[error("expected ':' at {expected_at:?}, found {}", .found.as_deref().unwrap_or("end of line"))]
    MissingColon {
        /// Where the colon was expected
        expected_at: Range<usize>,
        /// The token found instead
        found: Option<String>,
    },

    /// A parameter is malformed.
    #[error("invalid parameter at {span:?}: {kind}")]
    InvalidParameter {
        /// Location of the parameter
        span: Range<usize>,
        /// What is wrong with it
        kind: ParameterErrorKind,
    },
}

impl ContentLineError {
    /// Byte range of the problem in the line, if there is one.
    #[must_use]
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            Self::EmptyLine => None,
            Self::MissingName { span } | Self::InvalidParameter { span, .. } => Some(span.clone()),
            Self::MissingColon { expected_at, .. } => Some(expected_at.clone()),
        }
    }
}

/// What is wrong with a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParameterErrorKind {
    /// Nothing between `;` and `=`.
    #[error("empty parameter name")]
    EmptyName,

    /// The name is not followed by `=`.
    #[error("missing '=' after parameter name")]
    MissingEquals,

    /// A quoted value runs to the end of the line.
    #[error("unterminated quoted parameter value")]
    UnterminatedQuote,
}

/// Scans one unfolded content line.
///
/// # Errors
///
/// Returns an error when the line is empty, lacks a property name or lacks
/// the colon before the value. A quoted parameter value left open also
/// swallows the colon and is reported as
/// [`ParameterErrorKind::UnterminatedQuote`].
///
/// # Examples
///
/// The error span points into the line, so it can be rendered as a report:
///
/// ```
/// use almanac_ical::syntax::scan_content_line;
/// use ariadne::{Color, Label, Report, ReportKind, Source};
///
/// let line = "DTSTART;TZID=America/New_York 20250101T090000";
/// let err = scan_content_line(line).unwrap_err();
/// let span = err.span().unwrap_or(0..line.len());
/// Report::build(ReportKind::Error, span.clone())
///     .with_config(ariadne::Config::new().with_index_type(ariadne::IndexType::Byte))
///     .with_message(err.to_string())
///     .with_label(
///         Label::new(span)
///             .with_message("content line ends here")
///             .with_color(Color::Red),
///     )
///     .finish()
///     .eprint(Source::from(line))
///     .unwrap();
/// ```
pub fn scan_content_line(line: &str) -> Result<ContentLine, ContentLineError> {
    if line.trim().is_empty() {
        return Err(ContentLineError::EmptyLine);
    }

    let mut tokens = tokenize(line).peekable();
    let (group, name) = scan_name(&mut tokens)?;

    let mut parameters = Vec::new();
    let mut errors = Vec::new();
    loop {
        match tokens.next() {
            Some(SpannedToken(Token::Semicolon, semi)) => {
                match scan_parameter(&mut tokens, semi.end) {
                    Ok(param) => parameters.push(param),
                    Err(err @ ContentLineError::InvalidParameter {
                        kind: ParameterErrorKind::UnterminatedQuote,
                        ..
                    }) => return Err(err),
                    Err(err) => {
                        skip_parameter(&mut tokens);
                        errors.push(err);
                    }
                }
            }
            Some(SpannedToken(Token::Colon, colon)) => {
                #[expect(clippy::indexing_slicing)]
                let value = line[colon.end..].to_string();
                return Ok(ContentLine {
                    group,
                    name,
                    parameters,
                    value,
                    value_span: colon.end..line.len(),
                    errors,
                });
            }
            Some(SpannedToken(token, span)) => {
                return Err(ContentLineError::MissingColon {
                    expected_at: span,
                    found: Some(token.to_string()),
                });
            }
            None => {
                return Err(ContentLineError::MissingColon {
                    expected_at: line.len()..line.len(),
                    found: None,
                });
            }
        }
    }
}

/// Scans `[group "."] name`, where both parts are words.
fn scan_name<'src, I>(
    tokens: &mut Peekable<I>,
) -> Result<(Option<String>, String), ContentLineError>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let first = match tokens.next() {
        Some(SpannedToken(Token::Word(word), _)) => word,
        Some(SpannedToken(_, span)) => return Err(ContentLineError::MissingName { span }),
        None => return Err(ContentLineError::EmptyLine),
    };

    let Some(SpannedToken(Token::Dot, _)) = tokens.peek() else {
        return Ok((None, first.to_string()));
    };
    tokens.next();
    match tokens.next() {
        Some(SpannedToken(Token::Word(name), _)) => Ok((Some(first.to_string()), name.to_string())),
        Some(SpannedToken(_, span)) => Err(ContentLineError::MissingName { span }),
        None => Err(ContentLineError::MissingColon {
            expected_at: 0..0,
            found: None,
        }),
    }
}

/// Scans `name=value[,value]*` after a `;` ending at byte `start`.
fn scan_parameter<'src, I>(
    tokens: &mut Peekable<I>,
    start: usize,
) -> Result<ScannedParameter, ContentLineError>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let invalid = |end: usize, kind| ContentLineError::InvalidParameter {
        span: start..end,
        kind,
    };

    let (name, mut end) = match tokens.peek() {
        Some(SpannedToken(Token::Word(word), span)) => (word.to_string(), span.end),
        Some(SpannedToken(_, span)) => return Err(invalid(span.end, ParameterErrorKind::EmptyName)),
        None => return Err(invalid(start, ParameterErrorKind::EmptyName)),
    };
    tokens.next();

    match tokens.peek() {
        Some(SpannedToken(Token::Equal, span)) => end = span.end,
        _ => return Err(invalid(end, ParameterErrorKind::MissingEquals)),
    }
    tokens.next();

    let mut values = Vec::new();
    loop {
        let (value, value_end) = scan_parameter_value(tokens, end)
            .map_err(|kind| invalid(end, kind))?;
        values.push(value);
        end = value_end;

        match tokens.peek() {
            Some(SpannedToken(Token::Comma, span)) => {
                end = span.end;
                tokens.next();
            }
            _ => break,
        }
    }

    Ok(ScannedParameter {
        name,
        values,
        span: start..end,
    })
}

/// Scans one parameter value, quoted or not, and returns it with its end.
///
/// Text trailing a closing quote is kept, so `"a"b` reads as `ab`.
fn scan_parameter_value<'src, I>(
    tokens: &mut Peekable<I>,
    mut end: usize,
) -> Result<(String, usize), ParameterErrorKind>
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let mut value = String::new();
    if let Some(SpannedToken(Token::DQuote, _)) = tokens.peek() {
        tokens.next();
        loop {
            match tokens.next() {
                Some(SpannedToken(Token::DQuote, span)) => {
                    end = span.end;
                    break;
                }
                Some(SpannedToken(token, _)) => value.push_str(token.text()),
                None => return Err(ParameterErrorKind::UnterminatedQuote),
            }
        }
    }

    while let Some(SpannedToken(token, span)) = tokens.peek() {
        match token {
            Token::Semicolon | Token::Colon | Token::Comma | Token::DQuote => break,
            _ => {
                value.push_str(token.text());
                end = span.end;
                tokens.next();
            }
        }
    }
    Ok((value, end))
}

/// Skips the rest of a broken parameter, up to the next unquoted `;` or `:`.
fn skip_parameter<'src, I>(tokens: &mut Peekable<I>)
where
    I: Iterator<Item = SpannedToken<'src>>,
{
    let mut quoted = false;
    while let Some(SpannedToken(token, _)) = tokens.peek() {
        match token {
            Token::DQuote => quoted = !quoted,
            Token::Semicolon | Token::Colon if !quoted => return,
            _ => {}
        }
        tokens.next();
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::indexing_slicing)]

    use super::*;

    fn scan(line: &str) -> ContentLine {
        scan_content_line(line).expect("Failed to scan content line")
    }

    #[test]
    fn scans_simple_line() {
        let line = scan("SUMMARY:Team meeting: weekly");
        assert_eq!(line.group, None);
        assert_eq!(line.name, "SUMMARY");
        assert!(line.parameters.is_empty());
        assert_eq!(line.value, "Team meeting: weekly");
        assert_eq!(line.value_span, 8..28);
        assert!(line.errors.is_empty());
    }

    #[test]
    fn scans_group_and_parameters() {
        let line = scan("item1.DTSTART;TZID=America/New_York;VALUE=DATE-TIME:20250101T090000");
        assert_eq!(line.group.as_deref(), Some("item1"));
        assert_eq!(line.name, "DTSTART");
        assert_eq!(line.parameters.len(), 2);
        assert_eq!(line.parameters[0].name, "TZID");
        assert_eq!(line.parameters[0].values, vec!["America/New_York"]);
        assert_eq!(line.parameters[1].values, vec!["DATE-TIME"]);
        assert_eq!(line.value, "20250101T090000");
    }

    #[test]
    fn quoted_values_may_hold_separators() {
        let line = scan(
            r#"ATTENDEE;DELEGATED-FROM="mailto:a@example.com","mailto:b@example.com";CN="Doe; J":mailto:c@example.com"#,
        );
        assert_eq!(
            line.parameters[0].values,
            vec!["mailto:a@example.com", "mailto:b@example.com"]
        );
        assert_eq!(line.parameters[1].values, vec!["Doe; J"]);
        assert_eq!(line.value, "mailto:c@example.com");
    }

    #[test]
    fn empty_value_and_empty_parameter_value() {
        let line = scan("X-EMPTY;X-P=:");
        assert_eq!(line.parameters[0].values, vec![""]);
        assert_eq!(line.value, "");
    }

    #[test]
    fn broken_parameter_is_skipped() {
        let line = scan("DESCRIPTION;BROKEN;LANGUAGE=en:Hello");
        assert_eq!(line.parameters.len(), 1);
        assert_eq!(line.parameters[0].name, "LANGUAGE");
        assert_eq!(line.value, "Hello");
        assert!(matches!(
            line.errors.as_slice(),
            [ContentLineError::InvalidParameter {
                kind: ParameterErrorKind::MissingEquals,
                ..
            }]
        ));

        let line = scan("DESCRIPTION;=x:Hello");
        assert!(matches!(
            line.errors.as_slice(),
            [ContentLineError::InvalidParameter {
                kind: ParameterErrorKind::EmptyName,
                ..
            }]
        ));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(scan_content_line("   "), Err(ContentLineError::EmptyLine));
        assert!(matches!(
            scan_content_line("SUMMARY"),
            Err(ContentLineError::MissingColon { found: None, .. })
        ));
        assert!(matches!(
            scan_content_line(":value"),
            Err(ContentLineError::MissingName { .. })
        ));
        assert!(matches!(
            scan_content_line(r#"X-A;P="open:value"#),
            Err(ContentLineError::InvalidParameter {
                kind: ParameterErrorKind::UnterminatedQuote,
                ..
            })
        ));
    }
}
