//! Calendar export reading.
//!
//! Only the handful of properties the event parser uses are kept; this is not
//! a general iCalendar reader (no recurrence expansion, no TZID database).

use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDateTime};
use regex::Regex;

/// "Расписание ИУ3-45Б" → "ИУ3-45Б"
static RE_CALENDAR_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Расписание\s+(?P<code>.+)").unwrap());

const LOCAL_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Russian weekday names, Monday first.
pub const RU_WEEKDAYS: [&str; 7] = [
    "Понедельник",
    "Вторник",
    "Среда",
    "Четверг",
    "Пятница",
    "Суббота",
    "Воскресенье",
];

/// One VEVENT block, property values unescaped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub location: String,
    pub dtstart: String,
    pub dtend: String,
    pub rrule: String,
}

impl CalendarEvent {
    /// Store a property; returns false for properties that are not kept.
    fn set(&mut self, key: &str, value: String) -> bool {
        let slot = match key {
            "SUMMARY" => &mut self.summary,
            "DESCRIPTION" => &mut self.description,
            "LOCATION" => &mut self.location,
            "DTSTART" => &mut self.dtstart,
            "DTEND" => &mut self.dtend,
            "RRULE" => &mut self.rrule,
            _ => return false,
        };
        *slot = value;
        true
    }
}

/// A whole calendar export: the group it belongs to and its events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFeed {
    /// Group code from X-WR-CALNAME, if the export carries one
    pub group: Option<String>,
    pub events: Vec<CalendarEvent>,
}

pub fn is_calendar(payload: &str) -> bool {
    payload
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .is_some_and(|l| l.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
}

/// Join folded lines: a line starting with a space or tab continues the previous one.
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        match line.strip_prefix([' ', '\t']) {
            Some(rest) => {
                if let Some(last) = lines.last_mut() {
                    last.push_str(rest);
                }
            }
            None => lines.push(line.to_string()),
        }
    }
    lines
}

pub fn read_calendar(text: &str) -> CalendarFeed {
    let mut feed = CalendarFeed::default();
    let mut current: Option<CalendarEvent> = None;

    for line in unfold(text.trim_start_matches('\u{feff}')) {
        let line = line.trim_end();

        if line.starts_with("BEGIN:VEVENT") {
            current = Some(CalendarEvent::default());
            continue;
        }
        if line.starts_with("END:VEVENT") {
            if let Some(event) = current.take() {
                feed.events.push(event);
            }
            continue;
        }

        let Some((key_part, value)) = line.split_once(':') else {
            continue;
        };
        // "DTSTART;TZID=Europe/Moscow" → "DTSTART"
        let key = key_part
            .split(';')
            .next()
            .unwrap_or(key_part)
            .to_ascii_uppercase();

        match current.as_mut() {
            Some(event) => {
                event.set(&key, unescape(value.trim()));
            }
            None if key == "X-WR-CALNAME" && feed.group.is_none() => {
                feed.group = Some(group_code(value.trim()));
            }
            None => {}
        }
    }

    feed
}

/// Group code from a calendar title, or the title itself.
pub fn group_code(title: &str) -> String {
    RE_CALENDAR_TITLE
        .captures(title)
        .and_then(|c| c.name("code"))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| title.trim().to_string())
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Parse a DTSTART/DTEND value into local civil time.
///
/// `YYYYMMDDTHHMMSSZ` is UTC and shifted by `offset`; `YYYYMMDDTHHMMSS` is
/// already local. Date-only values carry no time and yield `None`, as does
/// anything unparseable.
pub fn parse_timestamp(value: &str, offset: FixedOffset) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.len() == 8 {
        return None;
    }
    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, LOCAL_FORMAT).ok()?;
        return Some(naive.and_utc().with_timezone(&offset).naive_local());
    }
    NaiveDateTime::parse_from_str(value, LOCAL_FORMAT).ok()
}
