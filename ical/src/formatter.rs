// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! iCalendar (RFC 5545) formatter module.
//!
//! Components and properties are written as CRLF-terminated content lines,
//! folded at 75 octets, to any `std::io::Write` implementer.
//!
//! # Example
//!
//! ```
//! use almanac_ical::formatter::format;
//! use almanac_ical::{Component, ComponentKind, Property, PropertyKind, Value};
//!
//! let mut event = Component::new(ComponentKind::VEvent);
//! event.add_property(Property::with_value(
//!     PropertyKind::Summary,
//!     Value::Text("Lunch; with Bob".to_string()),
//! ));
//!
//! let ics = format(&event).unwrap();
//! assert_eq!(ics, "BEGIN:VEVENT\r\nSUMMARY:Lunch\\; with Bob\r\nEND:VEVENT\r\n");
//! ```

mod component;
mod parameter;
mod property;

use std::io::{self, Write};

use crate::component::Component;
use crate::formatter::component::write_component;
use crate::formatter::property::write_property;
use crate::property::Property;

/// Formats a component and its subtree to a `String` with default options.
///
/// # Errors
///
/// Returns an error if writing to the internal buffer fails or if the output
/// contains invalid UTF-8 data.
pub fn format(component: &Component) -> io::Result<String> {
    FormatOptions::default().write_to_string(component)
}

/// Formats a single property as a folded content line ending in CRLF.
///
/// # Errors
///
/// Returns an error if writing to the internal buffer fails or if the output
/// contains invalid UTF-8 data.
pub fn format_property(property: &Property) -> io::Result<String> {
    let mut buffer = Vec::new();
    let mut formatter = Formatter::new(&mut buffer, FormatOptions::default());
    write_property(&mut formatter, property)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Formatting options for the iCalendar formatter.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Maximum line length in octets before folding.
    /// - `None`: no line folding
    /// - `Some(n)`: fold lines longer than n octets
    ///
    /// Default: `Some(75)` for RFC 5545 compliance.
    pub folding: Option<usize>,

    /// Line folding style.
    ///
    /// Default: `FoldingStyle::Space` (CRLF + SPACE).
    pub folding_style: FoldingStyle,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            folding: Some(75),
            folding_style: FoldingStyle::default(),
        }
    }
}

impl FormatOptions {
    /// Set the line folding option.
    #[must_use]
    pub fn folding(mut self, folding: Option<usize>) -> Self {
        self.folding = folding;
        self
    }

    /// Set the line folding style.
    #[must_use]
    pub const fn folding_style(mut self, style: FoldingStyle) -> Self {
        self.folding_style = style;
        self
    }

    /// Writes `component` to any `Write` implementer.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write(&self, component: &Component, w: &mut impl Write) -> io::Result<()> {
        let mut formatter = Formatter::new(w, *self);
        formatter.write_component(component)
    }

    /// Writes `component` to a `String`.
    ///
    /// # Errors
    /// Returns an error if writing fails or if the output contains invalid UTF-8 data.
    pub fn write_to_string(&self, component: &Component) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.write(component, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Line folding style for RFC 5545 formatting.
///
/// RFC 5545 specifies that folded lines should start with CRLF followed by
/// a whitespace character (SPACE or TAB).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FoldingStyle {
    /// CRLF + SPACE (RFC 5545 default)
    #[default]
    Space,
    /// CRLF + TAB
    Tab,
}

impl FoldingStyle {
    /// Get the folding sequence for this style.
    #[must_use]
    pub(crate) const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Space => b"\r\n ",
            Self::Tab => b"\r\n\t",
        }
    }

    /// Get the length of the continuation character after CRLF.
    #[must_use]
    pub(crate) const fn continuation_len() -> usize {
        1 // Both SPACE and TAB are 1 byte
    }
}

/// iCalendar formatter that writes to any `Write` implementer.
///
/// Bytes written through its `Write` implementation are folded; line ends
/// are emitted with [`Formatter::writeln`].
#[derive(Debug)]
pub struct Formatter<W: Write> {
    /// The underlying writer.
    writer: W,
    /// Formatting options.
    options: FormatOptions,
    /// Current line length in bytes (excluding the pending CRLF).
    line_length: usize,
}

impl<W: Write> Formatter<W> {
    /// Create a new formatter with options.
    #[must_use]
    pub fn new(writer: W, options: FormatOptions) -> Self {
        Self {
            writer,
            options,
            line_length: 0,
        }
    }

    /// Get a mutable reference to the underlying writer.
    #[must_use]
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes this formatter, returning the underlying writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Write a component and its subtree.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_component(&mut self, component: &Component) -> io::Result<()> {
        write_component(self, component)
    }

    /// Write one property as a content line.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_property(&mut self, property: &Property) -> io::Result<()> {
        write_property(self, property)
    }

    /// Write a CRLF line ending.
    pub(crate) fn writeln(&mut self) -> io::Result<()> {
        self.writer.write_all(b"\r\n")?;
        self.line_length = 0;
        Ok(())
    }

    /// Insert line folding: CRLF + whitespace.
    fn insert_fold(&mut self) -> io::Result<()> {
        self.writer
            .write_all(self.options.folding_style.as_bytes())?;
        self.line_length = FoldingStyle::continuation_len();
        Ok(())
    }
}

impl<W: Write> Write for Formatter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Some(max_len) = self.options.folding else {
            self.writer.write_all(buf)?;
            self.line_length += buf.len();
            return Ok(buf.len());
        };

        let mut remaining = buf;
        while !remaining.is_empty() {
            let available = max_len.saturating_sub(self.line_length);
            let mut len = find_safe_write_length(remaining, available);
            if len == 0 {
                if self.line_length > FoldingStyle::continuation_len() {
                    self.insert_fold()?;
                    continue;
                }
                // a character wider than the whole line still has to go somewhere
                len = first_char_len(remaining);
            }

            let (head, tail) = remaining.split_at(len);
            self.writer.write_all(head)?;
            self.line_length += len;
            remaining = tail;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Find the maximum number of bytes, at most `max_bytes`, we can write
/// without breaking a UTF-8 sequence.
///
/// UTF-8 continuation bytes look like `10xxxxxx`; a cut must never land
/// right before one.
fn find_safe_write_length(buf: &[u8], max_bytes: usize) -> usize {
    if max_bytes >= buf.len() {
        return buf.len();
    }

    let mut pos = max_bytes;
    while pos > 0 && buf.get(pos).is_some_and(|b| b & 0xC0 == 0x80) {
        pos -= 1;
    }
    pos
}

/// Length of the first UTF-8 sequence in `buf`.
fn first_char_len(buf: &[u8]) -> usize {
    1 + buf
        .iter()
        .skip(1)
        .take_while(|b| *b & 0xC0 == 0x80)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folded(options: FormatOptions, text: &str) -> String {
        let mut formatter = Formatter::new(Vec::new(), options);
        formatter
            .write_all(text.as_bytes())
            .expect("Failed to write");
        formatter.writeln().expect("Failed to write line end");
        String::from_utf8(formatter.into_writer()).expect("Failed to decode")
    }

    #[test]
    fn folds_at_75_octets() {
        let text = "x".repeat(160);
        let out = folded(FormatOptions::default(), &text);
        let lines: Vec<&str> = out.trim_end_matches("\r\n").split("\r\n").collect();
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.len() <= 75));
        assert_eq!(lines.first().map(|l| l.len()), Some(75));
        assert!(lines.iter().skip(1).all(|l| l.starts_with(' ')));
        assert_eq!(out.replace("\r\n ", ""), format!("{text}\r\n"));
    }

    #[test]
    fn never_splits_utf8() {
        let text = format!("{}{}", "a".repeat(74), "é".repeat(40));
        let out = folded(FormatOptions::default(), &text);
        for line in out.split("\r\n") {
            assert!(line.len() <= 75);
        }
        assert_eq!(out.replace("\r\n ", ""), format!("{text}\r\n"));
    }

    #[test]
    fn tab_style_and_disabled_folding() {
        let text = "y".repeat(80);
        let tabbed = folded(FormatOptions::default().folding_style(FoldingStyle::Tab), &text);
        assert!(tabbed.contains("\r\n\t"));

        let flat = folded(FormatOptions::default().folding(None), &text);
        assert_eq!(flat, format!("{text}\r\n"));
    }

    #[test]
    fn oversized_character_on_tiny_lines() {
        let out = folded(FormatOptions::default().folding(Some(2)), "日本");
        assert_eq!(out.replace("\r\n ", ""), "日本\r\n");
    }

    #[test]
    fn helpers() {
        assert_eq!(find_safe_write_length("aé".as_bytes(), 2), 1);
        assert_eq!(find_safe_write_length(b"abc", 10), 3);
        assert_eq!(first_char_len("€x".as_bytes()), 3);
    }
}
