// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! TEXT escaping as defined in RFC 5545 Section 3.3.11.
//!
//! ```txt
//! text       = *(TSAFE-CHAR / ":" / DQUOTE / ESCAPED-CHAR)
//! ESCAPED-CHAR = ("\\" / "\;" / "\," / "\N" / "\n")
//! ```

/// Escapes backslash, semicolon, comma and newline.
#[must_use]
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str(r"\\"),
            ';' => out.push_str(r"\;"),
            ',' => out.push_str(r"\,"),
            '\n' => out.push_str(r"\n"),
            '\r' => {
                // CRLF collapses into one escaped newline
                if chars.peek() != Some(&'\n') {
                    out.push_str(r"\n");
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Resolves escape sequences. Unknown sequences are kept verbatim.
#[must_use]
pub fn unescape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(c @ ('\\' | ';' | ',')) => out.push(c),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Splits a list of TEXT values on commas that are not escaped.
#[must_use]
pub fn split_unescaped(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(s.get(start..i).unwrap_or_default());
            start = i + c.len_utf8();
        }
    }
    parts.push(s.get(start..).unwrap_or_default());
    parts
}
