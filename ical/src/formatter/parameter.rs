// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Parameter formatting as defined in RFC 5545 Section 3.2.

use std::io::{self, Write};

use crate::formatter::Formatter;
use crate::parameter::Parameter;

/// Format all parameters, each prefixed with a semicolon.
pub fn write_parameters<W: Write>(
    f: &mut Formatter<W>,
    parameters: &[Parameter],
) -> io::Result<()> {
    for param in parameters {
        write_parameter(f, param)?;
    }
    Ok(())
}

/// Format a single parameter as `;NAME=value[,value]*`.
fn write_parameter<W: Write>(f: &mut Formatter<W>, param: &Parameter) -> io::Result<()> {
    write!(f, ";{}=", param.name())?;
    for (i, value) in param.values().iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{}", quote_if_needed(value))?;
    }
    Ok(())
}

/// Quotes a parameter value holding `;`, `:` or `,`.
///
/// Parameter values cannot carry a double quote at all, so any is dropped.
fn quote_if_needed(s: &str) -> String {
    let s = s.replace('"', "");
    let needs_quoting = s
        .chars()
        .any(|c| c.is_ascii_control() || c == ';' || c == ':' || c == ',');

    if needs_quoting {
        format!("\"{s}\"")
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::FormatOptions;
    use crate::parameter::ParticipationRole;

    fn written(parameters: &[Parameter]) -> String {
        let mut formatter = Formatter::new(Vec::new(), FormatOptions::default());
        write_parameters(&mut formatter, parameters).expect("Failed to write parameters");
        String::from_utf8(formatter.into_writer()).expect("Failed to decode")
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(quote_if_needed("simple"), "simple");
        assert_eq!(quote_if_needed("with;semicolon"), "\"with;semicolon\"");
        assert_eq!(quote_if_needed("with:colon"), "\"with:colon\"");
        assert_eq!(quote_if_needed("with,comma"), "\"with,comma\"");
        assert_eq!(quote_if_needed("say \"hi\""), "say hi");
    }

    #[test]
    fn writes_single_and_multi_values() {
        let params = [
            Parameter::Role(ParticipationRole::Chair),
            Parameter::Rsvp(true),
            Parameter::DelegatedTo(vec![
                "mailto:a@example.com".to_string(),
                "mailto:b@example.com".to_string(),
            ]),
            Parameter::Cn("Doe, Jane".to_string()),
            Parameter::X {
                name: "X-EXTRA".to_string(),
                values: vec!["a".to_string(), "b".to_string()],
            },
        ];
        assert_eq!(
            written(&params),
            ";ROLE=CHAIR;RSVP=TRUE;DELEGATED-TO=\"mailto:a@example.com\",\"mailto:b@example.com\"\
             ;CN=\"Doe, Jane\";X-EXTRA=a,b"
        );
    }
}
