// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Property formatting as defined in RFC 5545 Section 3.1.

use std::io::{self, Write};

use crate::formatter::Formatter;
use crate::formatter::parameter::write_parameters;
use crate::property::Property;

/// Format a property as `[group.]NAME[;params]:value` followed by CRLF.
///
/// A property without a value is written with an empty value.
pub fn write_property<W: Write>(f: &mut Formatter<W>, prop: &Property) -> io::Result<()> {
    if let Some(group) = prop.group() {
        write!(f, "{group}.")?;
    }
    write!(f, "{}", prop.name())?;
    write_parameters(f, prop.parameters())?;
    write!(f, ":")?;
    if let Some(value) = prop.value_as_string() {
        f.write_all(value.as_bytes())?;
    }
    f.writeln()
}

#[cfg(test)]
mod tests {
    use crate::formatter::format_property;
    use crate::parameter::Parameter;
    use crate::property::{Property, PropertyKind};
    use crate::value::{Value, ValueDate};

    #[test]
    fn writes_group_parameters_and_escaped_value() {
        let mut prop = Property::with_value(
            PropertyKind::Description,
            Value::Text("one, two; three\nfour".to_string()),
        );
        prop.set_group(Some("item1".to_string()));
        prop.add_parameter(Parameter::Language("en".to_string()));

        assert_eq!(
            format_property(&prop).expect("Failed to format"),
            "item1.DESCRIPTION;LANGUAGE=en:one\\, two\\; three\\nfour\r\n"
        );
    }

    #[test]
    fn value_parameter_follows_non_default_kind() {
        let prop = Property::with_value(
            PropertyKind::DtStart,
            ValueDate {
                year: 2025,
                month: 3,
                day: 9,
            },
        );
        assert_eq!(prop.as_text(), "DTSTART;VALUE=DATE:20250309\r\n");
    }

    #[test]
    fn uid_is_written_verbatim() {
        let prop = Property::with_value(PropertyKind::Uid, Value::Text("a,b;c".to_string()));
        assert_eq!(prop.as_text(), "UID:a,b;c\r\n");
    }

    #[test]
    fn empty_property() {
        let prop = Property::new(PropertyKind::Comment);
        assert_eq!(prop.as_text(), "COMMENT:\r\n");
    }

    #[test]
    fn long_lines_fold() {
        let prop = Property::with_value(PropertyKind::Summary, Value::Text("z".repeat(100)));
        let text = prop.as_text();
        assert!(text.contains("\r\n "));
        assert!(text.split("\r\n").all(|line| line.len() <= 75));
    }
}
