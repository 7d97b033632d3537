// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Content line syntax as defined in RFC 5545 Section 3.1: unfolding,
//! tokenizing and scanning. No value typing happens here.

mod lexer;
mod scanner;

use std::io;
use std::iter::Peekable;

pub use crate::syntax::lexer::{SpannedToken, Token, tokenize};
pub use crate::syntax::scanner::{
    ContentLine, ContentLineError, ParameterErrorKind, ScannedParameter, scan_content_line,
};

/// Joins folded physical lines into logical content lines.
///
/// The source yields physical lines without their terminator, as
/// [`str::lines`] and [`io::BufRead::lines`] do, so both CRLF and bare LF
/// input work. A line starting with a space or a tab continues the previous
/// one; that single whitespace character is dropped.
#[derive(Debug)]
pub struct Unfold<I: Iterator<Item = io::Result<String>>> {
    lines: Peekable<I>,
}

impl<I: Iterator<Item = io::Result<String>>> Unfold<I> {
    /// Wraps a source of physical lines.
    pub fn new(lines: I) -> Self {
        Self {
            lines: lines.peekable(),
        }
    }
}

impl<I: Iterator<Item = io::Result<String>>> Iterator for Unfold<I> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = match self.lines.next()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err)),
        };
        while let Some(Ok(next)) = self.lines.peek() {
            let Some(rest) = next.strip_prefix([' ', '\t']) else {
                break;
            };
            line.push_str(rest);
            self.lines.next();
        }
        Some(Ok(line))
    }
}

/// Unfolds in-memory text.
pub fn unfold(text: &str) -> Unfold<impl Iterator<Item = io::Result<String>> + '_> {
    Unfold::new(text.lines().map(|line| Ok(line.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unfolded(text: &str) -> Vec<String> {
        unfold(text)
            .collect::<io::Result<Vec<_>>>()
            .expect("Failed to unfold")
    }

    #[test]
    fn unfolds_crlf_and_lf() {
        let text = "DESCRIPTION:This is a lo\r\n ng description\r\n\tthat goes on\r\nSUMMARY:x\n y\n";
        assert_eq!(
            unfolded(text),
            vec![
                "DESCRIPTION:This is a long descriptionthat goes on".to_string(),
                "SUMMARY:xy".to_string(),
            ]
        );
    }

    #[test]
    fn keeps_only_one_whitespace_out() {
        assert_eq!(unfolded("A:1\r\n  2"), vec!["A:1 2".to_string()]);
    }

    #[test]
    fn unfold_then_scan() {
        let lines = unfolded("ATTENDEE;CN=\"Doe\r\n , J\":mailto:j@example.com\r\n");
        let line = scan_content_line(lines.first().expect("one line")).expect("Failed to scan");
        assert_eq!(
            line.parameters.first().map(|p| p.values.clone()),
            Some(vec!["Doe, J".to_string()])
        );
    }
}
