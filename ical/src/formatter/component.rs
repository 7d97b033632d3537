// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Component formatting as defined in RFC 5545 Section 3.6.

use std::io::{self, Write};

use crate::component::{Component, ComponentKind};
use crate::formatter::Formatter;
use crate::formatter::property::write_property;
use crate::keyword::{KW_BEGIN, KW_END};

/// Format a component with its properties and children, in order.
///
/// The synthetic XROOT container has no `BEGIN`/`END` lines of its own, so
/// a set of top-level components reads back as written.
pub fn write_component<W: Write>(f: &mut Formatter<W>, component: &Component) -> io::Result<()> {
    if component.kind() == ComponentKind::XRoot {
        return write_content(f, component);
    }
    with_block(f, component.name(), |f| write_content(f, component))
}

fn write_content<W: Write>(f: &mut Formatter<W>, component: &Component) -> io::Result<()> {
    for prop in component.properties() {
        write_property(f, prop)?;
    }
    for child in component.components() {
        write_component(f, child)?;
    }
    Ok(())
}

fn with_block<W: Write, F: FnOnce(&mut Formatter<W>) -> io::Result<()>>(
    f: &mut Formatter<W>,
    name: &str,
    write_content: F,
) -> io::Result<()> {
    write!(f, "{KW_BEGIN}:{name}")?;
    f.writeln()?;

    write_content(f)?;

    write!(f, "{KW_END}:{name}")?;
    f.writeln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::format;
    use crate::property::{Property, PropertyKind};
    use crate::value::Value;

    #[test]
    fn writes_nested_blocks() {
        let mut cal = Component::new(ComponentKind::VCalendar);
        cal.add_property(Property::with_value(
            PropertyKind::Version,
            Value::Text("2.0".to_string()),
        ));
        let mut event = Component::new(ComponentKind::VEvent);
        event.add_property(Property::new_x("X-FOO", "bar"));
        event.add_component(Component::new(ComponentKind::VAlarm));
        cal.add_component(event);

        let text = format(&cal).expect("Failed to format");
        assert_eq!(
            text,
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nX-FOO:bar\r\n\
             BEGIN:VALARM\r\nEND:VALARM\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
        );
    }

    #[test]
    fn xroot_has_no_block() {
        let mut root = Component::new(ComponentKind::XRoot);
        root.add_component(Component::new(ComponentKind::VTodo));
        root.add_component(Component::from_name("X-THING"));

        let text = format(&root).expect("Failed to format");
        assert_eq!(
            text,
            "BEGIN:VTODO\r\nEND:VTODO\r\nBEGIN:X-THING\r\nEND:X-THING\r\n"
        );
    }
}
