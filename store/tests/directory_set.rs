// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use almanac_ical::{CalTime, Component, ComponentKind, Environment, ErrorKind, parse_string};
use jiff::civil::datetime;
use almanac_store::{Set, SetKind, StoreConfig, StoreError};

fn event(uid: Option<&str>, stamp: &str) -> Component {
    let uid = uid.map(|uid| format!("UID:{uid}\r\n")).unwrap_or_default();
    let text = format!(
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\n{uid}DTSTAMP:{stamp}\r\n\
DTSTART:20300101T000000Z\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
    );
    parse_string(&text, &Environment::default()).expect("Failed to parse event")
}

fn all_uids(set: &mut Set<'_>) -> Vec<String> {
    let mut uids = Vec::new();
    let mut current = set.get_first_component().expect("Failed to iterate").cloned();
    while let Some(component) = current {
        uids.push(component.uid().unwrap_or_default().to_string());
        current = set.get_next_component().expect("Failed to iterate").cloned();
    }
    uids
}

#[test]
fn components_are_bucketed_by_month() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let env = Environment::default();

    let mut set = Set::open_directory(dir.path(), &env).expect("Failed to open set");
    assert_eq!(set.kind(), SetKind::Directory);
    set.add_component(event(Some("mar"), "20250305T120000Z"))
        .expect("Failed to add");
    set.add_component(event(Some("jan-1"), "20250110T120000Z"))
        .expect("Failed to add");

    // switching to January wrote March out
    assert!(dir.path().join("202503.ics").exists());
    assert!(!dir.path().join("202501.ics").exists());

    set.add_component(event(Some("jan-2"), "20250131T235959Z"))
        .expect("Failed to add");
    set.close().expect("Failed to close");
    assert!(dir.path().join("202501.ics").exists());

    let mut set = Set::open_directory(dir.path(), &env).expect("Failed to reopen set");
    assert_eq!(all_uids(&mut set), vec!["jan-1", "jan-2", "mar"]);
    assert_eq!(set.count_components(ComponentKind::VEvent).expect("Failed to count"), 3);
    assert!(set.has_uid("mar").expect("Failed to look up"));
}

#[test]
fn missing_uids_are_generated() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let env = Environment::default();

    let mut set = Set::open_directory(dir.path(), &env).expect("Failed to open set");
    set.add_component(event(None, "20250601T080000Z"))
        .expect("Failed to add");
    let uids = all_uids(&mut set);
    assert_eq!(uids.len(), 1);
    assert_eq!(uids.first().map(String::len), Some(36));
}

#[test]
fn undated_components_are_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let env = Environment::default();

    let mut set = Set::open_directory(dir.path(), &env).expect("Failed to open set");
    let err = set
        .add_component(Component::new(ComponentKind::VJournal))
        .expect_err("Component without a date should be rejected");
    assert!(matches!(err, StoreError::BadArgument(_)));
    assert_eq!(err.kind(), ErrorKind::BadArgument);
    assert!(!set.is_dirty());
}

#[test]
fn removal_searches_every_month() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let env = Environment::default();
    let config = StoreConfig::new(SetKind::Directory, dir.path());

    let mut set = Set::from_config(&config, &env).expect("Failed to open set");
    let april = event(Some("apr"), "20250401T000000Z");
    set.add_component(april.clone()).expect("Failed to add");
    set.add_component(event(Some("may"), "20250501T000000Z"))
        .expect("Failed to add");
    set.commit().expect("Failed to commit");

    assert_eq!(set.remove_component(&april).expect("Failed to remove"), april);
    set.close().expect("Failed to close");

    let mut set = Set::from_config(&config, &env).expect("Failed to reopen set");
    assert_eq!(all_uids(&mut set), vec!["may"]);
}

fn undated_event(uid: &str, start: &str) -> Component {
    let text = format!(
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:{uid}\r\nDTSTART:{start}\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n"
    );
    parse_string(&text, &Environment::default()).expect("Failed to parse event")
}

fn file_uids(path: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(path).expect("Failed to read month file");
    let root = parse_string(&text, &Environment::default()).expect("Failed to parse month file");
    let calendars = match root.kind() {
        ComponentKind::XRoot => root.components().to_vec(),
        _ => vec![root],
    };
    calendars
        .iter()
        .map(|c| c.uid().unwrap_or_default().to_string())
        .collect()
}

#[test]
fn rescheduling_moves_a_component_between_months() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let env = Environment::default();

    let mut set = Set::open_directory(dir.path(), &env).expect("Failed to open set");
    set.add_component(undated_event("stay", "20250110T090000Z"))
        .expect("Failed to add");
    set.add_component(undated_event("move", "20250120T090000Z"))
        .expect("Failed to add");
    set.commit().expect("Failed to commit");
    assert_eq!(file_uids(&dir.path().join("202501.ics")), vec!["stay", "move"]);

    let old = set
        .fetch(ComponentKind::VEvent, "move")
        .expect("Failed to fetch")
        .cloned()
        .expect("Event is missing");
    let mut new = old.clone();
    new.set_dtstart(&CalTime::utc(datetime(2025, 2, 5, 9, 0, 0, 0)));
    set.modify(&old, new).expect("Failed to modify");
    set.close().expect("Failed to close");

    assert_eq!(file_uids(&dir.path().join("202501.ics")), vec!["stay"]);
    assert_eq!(file_uids(&dir.path().join("202502.ics")), vec!["move"]);

    let mut set = Set::open_directory(dir.path(), &env).expect("Failed to reopen set");
    assert_eq!(all_uids(&mut set), vec!["stay", "move"]);
    let moved = set
        .fetch(ComponentKind::VEvent, "move")
        .expect("Failed to fetch")
        .expect("Event is missing");
    assert_eq!(moved.dtstart(), Some(CalTime::utc(datetime(2025, 2, 5, 9, 0, 0, 0))));
}
