// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Lexer for one unfolded iCalendar content line as defined in RFC 5545.

use std::fmt::{self, Display};
use std::ops::Range;

use logos::Logos;

/// Tokenizes an unfolded content line.
///
/// Bytes the lexer cannot classify (control characters) come out as
/// [`Token::Error`] so the scanner can decide how to recover.
pub fn tokenize(line: &str) -> impl Iterator<Item = SpannedToken<'_>> {
    Token::lexer(line).spanned().map(|(tok, span)| match tok {
        Ok(tok) => SpannedToken(tok, span),
        Err(()) => SpannedToken(Token::Error, span),
    })
}

/// Token emitted by the content line lexer
#[derive(PartialEq, Eq, Clone, Copy, Logos)]
pub enum Token<'a> {
    /// Double Quote ("), decimal codepoint 22
    #[token(r#"""#)]
    DQuote,

    /// Comma (,), decimal codepoint 44
    #[token(",")]
    Comma,

    /// Colon (:), decimal codepoint 58
    #[token(":")]
    Colon,

    /// Semicolon (;), decimal codepoint 59
    #[token(";")]
    Semicolon,

    /// Equal sign (=), decimal codepoint 61
    #[token("=")]
    Equal,

    /// Full stop (.), separating a group from the property name
    #[token(".")]
    Dot,

    /// Runs of the remaining printable ASCII characters, space and tab
    #[regex(r#"[\t !#$%&'()*+/<>?@\[\\\]\^`\{|\}~]+"#)]
    Symbol(&'a str),

    /// ASCII word characters: 0-9, A-Z, a-z, underscore and hyphen
    #[regex("[0-9A-Za-z_-]+")]
    Word(&'a str),

    /// NON-US-ASCII  = UTF8-2 / UTF8-3 / UTF8-4
    #[regex(r#"[^\x00-\x7F]+"#)]
    UnicodeText(&'a str),

    /// Anything else, such as control characters
    Error,
}

impl Token<'_> {
    /// The source text this token stands for, empty for [`Token::Error`].
    #[must_use]
    pub const fn text(&self) -> &str {
        match self {
            Self::DQuote => "\"",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Equal => "=",
            Self::Dot => ".",
            Self::Symbol(s) | Self::Word(s) | Self::UnicodeText(s) => s,
            Self::Error => "",
        }
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DQuote => write!(f, "DQuote"),
            Self::Comma => write!(f, "Comma"),
            Self::Colon => write!(f, "Colon"),
            Self::Semicolon => write!(f, "Semicolon"),
            Self::Equal => write!(f, "Equal"),
            Self::Dot => write!(f, "Dot"),
            Self::Symbol(s) => write!(f, "Symbol({s})"),
            Self::Word(s) => write!(f, "Word({s})"),
            Self::UnicodeText(s) => write!(f, "UnicodeText({s})"),
            Self::Error => write!(f, "Error"),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A token with its byte range in the line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken<'src>(pub Token<'src>, pub Range<usize>);

impl Display for SpannedToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.0, self.1)
    }
}
