// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use almanac_ical::formatter::format;
use almanac_ical::{ComponentKind, Environment, ErrorKind, PropertyKind, Value, parse_string};

const BROKEN: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:broken-1\r\n\
DTSTART:2025-01-01\r\n\
SUMMARY;LANGUAGE=en:Still here\r\n\
NOT A PROPERTY\r\n\
END:VEVENT\r\n\
BEGIN:VTODO\r\n\
SUMMARY:never closed\r\n\
END:VCALENDAR\r\n";

#[test]
fn malformed_input_is_kept_as_errors() {
    let env = Environment::default();
    let cal = parse_string(BROKEN, &env).expect("Failed to parse");

    assert_eq!(cal.kind(), ComponentKind::VCalendar);
    assert_eq!(cal.count_components(ComponentKind::Any), 2);
    assert_eq!(cal.count_errors(), 3);
    assert_eq!(env.last_error(), Some(ErrorKind::MalformedData));

    let event = cal.first_component(ComponentKind::VEvent).expect("No VEVENT");
    assert!(event.dtstart().is_none());
    assert_eq!(event.summary(), Some("Still here"));

    let todo = cal.first_component(ComponentKind::VTodo).expect("No VTODO");
    assert_eq!(todo.count_errors(), 1);
}

#[test]
fn errors_survive_a_round_trip() {
    let env = Environment::default();
    let cal = parse_string(BROKEN, &env).expect("Failed to parse");
    let text = format(&cal).expect("Failed to format");
    assert!(text.contains("X-LIC-ERROR;X-LIC-ERRORTYPE=VALUE-PARSE-ERROR:"));

    env.clear_error();
    let again = parse_string(&text, &env).expect("Failed to parse again");
    assert_eq!(again, cal);
    assert_eq!(env.last_error(), None);
}

#[test]
fn errors_convert_to_request_status() {
    let env = Environment::default();
    let mut cal = parse_string(BROKEN, &env).expect("Failed to parse");
    cal.convert_errors();
    assert_eq!(cal.count_errors(), 0);

    let event = cal.first_component(ComponentKind::VEvent).expect("No VEVENT");
    let codes: Vec<_> = event
        .properties_of(PropertyKind::RequestStatus)
        .filter_map(|p| p.value().and_then(Value::as_str))
        .map(|status| status.split(';').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(codes, vec!["3.1", "3.0"]);

    let todo = cal.first_component(ComponentKind::VTodo).expect("No VTODO");
    assert_eq!(todo.count_properties(PropertyKind::RequestStatus), 1);
}

#[test]
fn strip_removes_every_error() {
    let env = Environment::default();
    let mut cal = parse_string(BROKEN, &env).expect("Failed to parse");
    cal.strip_errors();
    assert_eq!(cal.count_errors(), 0);
    assert!(!format(&cal).expect("Failed to format").contains("X-LIC-ERROR"));
}
