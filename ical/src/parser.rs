// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Builds component trees from iCalendar text.
//!
//! Malformed input is recorded in place: the component being built receives
//! an `X-LIC-ERROR` property whose `X-LIC-ERRORTYPE` names the failure, and
//! parsing goes on. With [`Environment::with_errors_are_fatal`] the first
//! malformation is returned as an error instead.

use std::io::BufRead;
use std::ops::Range;

use crate::component::{Component, ComponentKind};
use crate::environment::Environment;
use crate::error::Error;
use crate::keyword::{
    KW_BEGIN, KW_END, KW_ERROR_COMPONENT_PARSE, KW_ERROR_PARAMETER_NAME_PARSE,
    KW_ERROR_PARAMETER_VALUE_PARSE, KW_ERROR_PROPERTY_PARSE, KW_ERROR_VALUE_PARSE,
};
use crate::parameter::Parameter;
use crate::property::Property;
use crate::syntax::{
    ContentLine, ContentLineError, ParameterErrorKind, Unfold, scan_content_line, unfold,
};
use crate::value::split_unescaped;

/// Parses a whole iCalendar text.
///
/// A single top-level component is returned as is. Zero or several are
/// wrapped in an `XROOT` component, which the formatter writes without
/// `BEGIN`/`END` lines.
///
/// # Errors
///
/// Only fails when `env` makes errors fatal; the first malformation is then
/// returned as [`Error::MalformedData`].
///
/// # Examples
///
/// ```
/// # use almanac_ical::{Environment, PropertyKind, parse_string};
/// let src = "\
/// BEGIN:VCALENDAR\r\n\
/// BEGIN:VEVENT\r\n\
/// SUMMARY:Test Event\r\n\
/// DTSTART:2025-01-01\r\n\
/// END:VEVENT\r\n\
/// END:VCALENDAR\r\n\
/// ";
/// let env = Environment::default();
/// let cal = parse_string(src, &env).unwrap();
/// let event = cal.first_real_component().unwrap();
/// assert_eq!(event.summary(), Some("Test Event"));
/// assert!(event.first_property(PropertyKind::DtStart).is_none());
/// assert_eq!(event.count_errors(), 1);
///
/// let strict = Environment::default().with_errors_are_fatal(true);
/// assert!(parse_string(src, &strict).is_err());
/// ```
pub fn parse_string(text: &str, env: &Environment) -> Result<Component, Error> {
    Parser::new(env).parse_lines(unfold(text))
}

/// Streaming parser fed one unfolded content line at a time.
#[derive(Debug)]
pub struct Parser<'env> {
    env: &'env Environment,
    open: Vec<Component>,
    line_no: usize,
}

impl<'env> Parser<'env> {
    /// Creates a parser reporting malformed data to `env`.
    #[must_use]
    pub fn new(env: &'env Environment) -> Self {
        Self {
            env,
            open: Vec::new(),
            line_no: 0,
        }
    }

    /// Whether a component has begun and not yet ended.
    #[must_use]
    pub fn is_inside_component(&self) -> bool {
        !self.open.is_empty()
    }

    /// Feeds one unfolded content line.
    ///
    /// Returns the top-level component completed by this line, if it is the
    /// `END` of one. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] for malformed input when errors are
    /// fatal in the environment.
    pub fn add_line(&mut self, line: &str) -> Result<Option<Component>, Error> {
        self.line_no += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        let content = match scan_content_line(line) {
            Ok(content) => content,
            Err(ContentLineError::EmptyLine) => return Ok(None),
            Err(err @ ContentLineError::InvalidParameter {
                kind: ParameterErrorKind::UnterminatedQuote,
                ..
            }) => {
                let message = format!("{err}: '{line}'");
                self.record(KW_ERROR_PARAMETER_VALUE_PARSE, &message, err.span())?;
                return Ok(None);
            }
            Err(err) => {
                let message = format!("could not find a property name or value: '{line}'");
                self.record(KW_ERROR_PROPERTY_PARSE, &message, err.span())?;
                return Ok(None);
            }
        };

        if content.name.eq_ignore_ascii_case(KW_BEGIN) {
            self.begin(&content)?;
            Ok(None)
        } else if content.name.eq_ignore_ascii_case(KW_END) {
            self.end(&content)
        } else {
            self.property(content)?;
            Ok(None)
        }
    }

    /// Closes every component still open, marking each with a
    /// `COMPONENT-PARSE-ERROR`, and returns the outermost one.
    ///
    /// # Errors
    ///
    /// Fails like [`Parser::add_line`] when errors are fatal.
    pub fn finish(&mut self) -> Result<Option<Component>, Error> {
        while let Some(component) = self.open.pop() {
            let component = self.mark_unclosed(component)?;
            match self.open.last_mut() {
                Some(parent) => parent.add_component(component),
                None => return Ok(Some(component)),
            }
        }
        Ok(None)
    }

    /// Parses all content from `reader`, unfolding its lines.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] when reading fails, or fails like
    /// [`parse_string`].
    pub fn parse_reader<R: BufRead>(&mut self, reader: R) -> Result<Component, Error> {
        self.parse_lines(Unfold::new(reader.lines()))
    }

    fn parse_lines<I>(&mut self, lines: Unfold<I>) -> Result<Component, Error>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let mut roots = Vec::new();
        for line in lines {
            if let Some(component) = self.add_line(&line?)? {
                roots.push(component);
            }
        }
        if let Some(component) = self.finish()? {
            roots.push(component);
        }

        tracing::debug!(lines = self.line_no, components = roots.len(), "parsed text");
        if roots.len() == 1
            && let Some(root) = roots.pop()
        {
            return Ok(root);
        }
        let mut root = Component::new(ComponentKind::XRoot);
        for component in roots {
            root.add_component(component);
        }
        Ok(root)
    }

    fn begin(&mut self, content: &ContentLine) -> Result<(), Error> {
        let name = content.value.trim();
        if name.is_empty() {
            let message = format!("{KW_BEGIN} without a component name");
            return self.record(KW_ERROR_COMPONENT_PARSE, &message, None);
        }
        self.open.push(Component::from_name(name));
        Ok(())
    }

    fn end(&mut self, content: &ContentLine) -> Result<Option<Component>, Error> {
        let name = content.value.trim();
        let Some(depth) = self
            .open
            .iter()
            .rposition(|c| c.name().eq_ignore_ascii_case(name))
        else {
            let message = format!("{KW_END}:{name} without matching {KW_BEGIN}");
            self.record(KW_ERROR_COMPONENT_PARSE, &message, None)?;
            return Ok(None);
        };

        // components opened after the one being ended never saw their END
        while self.open.len() > depth + 1 {
            if let Some(unclosed) = self.open.pop() {
                let unclosed = self.mark_unclosed(unclosed)?;
                if let Some(parent) = self.open.last_mut() {
                    parent.add_component(unclosed);
                }
            }
        }

        let Some(component) = self.open.pop() else {
            return Ok(None);
        };
        match self.open.last_mut() {
            Some(parent) => {
                parent.add_component(component);
                Ok(None)
            }
            None => Ok(Some(component)),
        }
    }

    fn property(&mut self, content: ContentLine) -> Result<(), Error> {
        if self.open.is_empty() {
            let message = format!("property {} outside of any component", content.name);
            return self.record(KW_ERROR_PROPERTY_PARSE, &message, None);
        }

        let mut prop = Property::from_name(&content.name);
        prop.set_group(content.group);

        for err in content.errors {
            let message = format!("{err} in property {}", content.name);
            self.record(KW_ERROR_PARAMETER_NAME_PARSE, &message, err.span())?;
        }
        for scanned in content.parameters {
            match Parameter::parse(&scanned.name, scanned.values) {
                Ok(param) => prop.add_parameter(param),
                Err(err) => {
                    let message = format!("{err} in property {}", content.name);
                    self.record(KW_ERROR_PARAMETER_VALUE_PARSE, &message, Some(scanned.span))?;
                }
            }
        }

        let pieces = if prop.kind().is_multi_valued() {
            split_unescaped(&content.value, ',')
        } else {
            vec![content.value.as_str()]
        };
        for piece in pieces {
            let mut single = prop.clone();
            match single.set_value_from_str(piece) {
                Ok(()) => self.push_property(single),
                Err(err) => {
                    let message = format!(
                        "could not parse value for property {}: '{piece}' ({err})",
                        content.name
                    );
                    let span = Some(content.value_span.clone());
                    self.record(KW_ERROR_VALUE_PARSE, &message, span)?;
                }
            }
        }
        Ok(())
    }

    fn mark_unclosed(&self, mut component: Component) -> Result<Component, Error> {
        let message = format!("line {}: missing {KW_END}:{}", self.line_no, component.name());
        self.env.report(Error::malformed(message.clone()))?;
        component.add_error(KW_ERROR_COMPONENT_PARSE, message);
        Ok(component)
    }

    fn push_property(&mut self, prop: Property) {
        if let Some(component) = self.open.last_mut() {
            component.add_property(prop);
        }
    }

    /// Reports a malformation and records it on the innermost open
    /// component. Outside of any component it is only reported.
    fn record(
        &mut self,
        error_type: &str,
        message: &str,
        span: Option<Range<usize>>,
    ) -> Result<(), Error> {
        let message = format!("line {}: {message}", self.line_no);
        let err = match span {
            Some(span) => Error::malformed_at(message.clone(), span),
            None => Error::malformed(message.clone()),
        };
        self.env.report(err)?;
        match self.open.last_mut() {
            Some(component) => component.add_error(error_type, message),
            None => tracing::warn!(error_type, %message, "dropping error outside of any component"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::indexing_slicing)]

    use super::*;
    use crate::component::ComponentKind;
    use crate::error::ErrorKind;
    use crate::parameter::ParameterKind;
    use crate::property::PropertyKind;
    use crate::value::{Value, ValueKind};

    fn parse(text: &str) -> Component {
        parse_string(text, &Environment::default()).expect("Failed to parse")
    }

    fn error_types(component: &Component) -> Vec<String> {
        component
            .properties_of(PropertyKind::XLicError)
            .filter_map(|p| p.parameter_by_name("X-LIC-ERRORTYPE"))
            .flat_map(Parameter::values)
            .collect()
    }

    #[test]
    fn builds_nested_components() {
        let cal = parse(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1@x\r\nBEGIN:VALARM\r\n\
             ACTION:DISPLAY\r\nEND:VALARM\r\nEND:VEVENT\r\nBEGIN:VTODO\r\nEND:VTODO\r\n\
             END:VCALENDAR\r\n",
        );
        assert_eq!(cal.kind(), ComponentKind::VCalendar);
        assert_eq!(cal.components().len(), 2);
        let event = &cal.components()[0];
        assert_eq!(event.kind(), ComponentKind::VEvent);
        assert_eq!(event.uid(), Some("1@x"));
        assert_eq!(event.count_components(ComponentKind::VAlarm), 1);
        assert_eq!(cal.count_errors(), 0);
    }

    #[test]
    fn several_roots_are_wrapped() {
        let root = parse("BEGIN:VEVENT\nEND:VEVENT\n\nBEGIN:VTODO\nEND:VTODO\n");
        assert_eq!(root.kind(), ComponentKind::XRoot);
        assert_eq!(root.components().len(), 2);

        let empty = parse("");
        assert_eq!(empty.kind(), ComponentKind::XRoot);
        assert!(empty.components().is_empty());
    }

    #[test]
    fn typed_values_and_parameters() {
        let cal = parse(
            "BEGIN:VEVENT\r\nDTSTART;TZID=America/New_York:20250101T090000\r\n\
             DTEND;VALUE=DATE:20250102\r\nX-WR-CALNAME:Work\r\nitem1.URL:http://x\r\n\
             END:VEVENT\r\n",
        );
        let dtstart = cal.first_property(PropertyKind::DtStart).expect("DTSTART");
        assert_eq!(dtstart.tzid(), Some("America/New_York"));
        assert_eq!(dtstart.value_kind(), ValueKind::DateTime);

        let dtend = cal.first_property(PropertyKind::DtEnd).expect("DTEND");
        assert_eq!(dtend.value_kind(), ValueKind::Date);
        assert_eq!(dtend.count_parameters(ParameterKind::Value), 1);

        let x = cal.property_by_name("x-wr-calname").expect("X property");
        assert_eq!(x.value(), Some(&Value::X("Work".to_string())));

        let url = cal.first_property(PropertyKind::Url).expect("URL");
        assert_eq!(url.group(), Some("item1"));
    }

    #[test]
    fn splits_multi_valued_properties() {
        let cal = parse(
            "BEGIN:VEVENT\r\nEXDATE;TZID=Europe/Berlin:20250101T100000,20250102T100000\r\n\
             CATEGORIES:WORK,Travel\\, far\r\nSUMMARY:a,b\r\nEND:VEVENT\r\n",
        );
        let exdates: Vec<_> = cal.properties_of(PropertyKind::ExDate).collect();
        assert_eq!(exdates.len(), 2);
        assert!(exdates.iter().all(|p| p.tzid() == Some("Europe/Berlin")));

        let categories: Vec<_> = cal
            .properties_of(PropertyKind::Categories)
            .filter_map(Property::text)
            .collect();
        assert_eq!(categories, vec!["WORK", "Travel, far"]);
        assert_eq!(cal.summary(), Some("a,b"));
    }

    #[test]
    fn recovers_from_malformed_lines() {
        let cal = parse(
            "BEGIN:VEVENT\r\nDTSTART:not-a-date\r\nTHIS LINE IS BROKEN\r\n\
             ATTENDEE;RSVP=MAYBE:mailto:a@example.com\r\nDESCRIPTION;NOEQUALS:text\r\n\
             END:VEVENT\r\n",
        );
        assert_eq!(
            error_types(&cal),
            vec![
                KW_ERROR_VALUE_PARSE,
                KW_ERROR_PROPERTY_PARSE,
                KW_ERROR_PARAMETER_VALUE_PARSE,
                KW_ERROR_PARAMETER_NAME_PARSE,
            ]
        );
        assert!(cal.first_property(PropertyKind::DtStart).is_none());
        assert_eq!(cal.count_properties(PropertyKind::Attendee), 1);
        let description = cal.first_property(PropertyKind::Description);
        assert_eq!(description.and_then(Property::text), Some("text"));
    }

    #[test]
    fn unbalanced_components() {
        let cal = parse("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nEND:VCALENDAR\r\nEND:VTODO\r\n");
        assert_eq!(cal.kind(), ComponentKind::VCalendar);
        let event = &cal.components()[0];
        assert_eq!(error_types(event), vec![KW_ERROR_COMPONENT_PARSE]);

        let cal = parse("BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nEND:VEVENT\r\nEND:VTODO\r\n");
        assert_eq!(error_types(&cal), Vec::<String>::new());

        let cal = parse("BEGIN:VCALENDAR\r\nEND:VTODO\r\nEND:VCALENDAR\r\n");
        assert_eq!(error_types(&cal), vec![KW_ERROR_COMPONENT_PARSE]);

        let cal = parse("BEGIN:VCALENDAR\r\nSUMMARY:x\r\n");
        assert_eq!(error_types(&cal), vec![KW_ERROR_COMPONENT_PARSE]);
    }

    #[test]
    fn streaming_returns_completed_roots() {
        let env = Environment::default();
        let mut parser = Parser::new(&env);
        for line in ["BEGIN:VCALENDAR", "BEGIN:VEVENT", "UID:a", "END:VEVENT"] {
            assert!(parser.add_line(line).expect("Failed to add line").is_none());
        }
        assert!(parser.is_inside_component());
        let cal = parser
            .add_line("END:VCALENDAR\r\n")
            .expect("Failed to add line")
            .expect("Failed to complete calendar");
        assert_eq!(cal.components().len(), 1);
        assert!(!parser.is_inside_component());
    }

    #[test]
    fn reads_from_buffered_reader() {
        let text = b"BEGIN:VTODO\r\nSUMMARY:Buy\r\n  milk\r\nEND:VTODO\r\n";
        let env = Environment::default();
        let todo = Parser::new(&env)
            .parse_reader(&text[..])
            .expect("Failed to parse reader");
        assert_eq!(todo.kind(), ComponentKind::VTodo);
        assert_eq!(todo.summary(), Some("Buy milk"));
    }

    #[test]
    fn fatal_errors_abort() {
        let env = Environment::default().with_errors_are_fatal(true);
        let err = parse_string("BEGIN:VEVENT\r\nDTSTART:nope\r\nEND:VEVENT\r\n", &env)
            .expect_err("Malformed DTSTART must fail");
        assert_eq!(err.kind(), ErrorKind::MalformedData);
        assert_eq!(env.last_error(), Some(ErrorKind::MalformedData));
    }
}
