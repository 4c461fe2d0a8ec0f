//! Event record parsing: one raw payload in, zero or more `Lesson`s out.
//!
//! A payload is either a calendar export or a JSON document from the portal's
//! internal API. Individual events that cannot be used are counted and
//! skipped; only a payload that is neither shape is reported as an error.

use chrono::{Datelike, FixedOffset, NaiveTime};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use timetable_types::{Lesson, LessonEntry, WeekParity};
use tracing::debug;

use crate::calendar::{self, CalendarEvent, RU_WEEKDAYS};
use crate::config::{Config, ParityCodes};
use crate::names::canonicalize;
use crate::subject::extract_subject;
use crate::teachers::extract_teachers;

// ── Field aliases ────────────────────────────────────────────────────────
//
// The group and teacher endpoints name the same things differently. Each
// list is tried in order; the first present, non-empty value wins.

const SUBJECT_KEYS: &[&str] = &["discipline", "subject", "title"];
const ROOM_KEYS: &[&str] = &["room", "auditory", "audience", "audiences"];
const DAY_KEYS: &[&str] = &["date", "day", "dayOfWeek"];
const START_HOUR_KEYS: &[&str] = &["startTimeHourNum", "startHour"];
const START_MINUTE_KEYS: &[&str] = &["startTimeMinNum", "startMinute"];
const END_HOUR_KEYS: &[&str] = &["endTimeHourNum", "endHour"];
const END_MINUTE_KEYS: &[&str] = &["endTimeMinNum", "endMinute"];
const START_TIME_KEYS: &[&str] = &["startTime", "start"];
const END_TIME_KEYS: &[&str] = &["endTime", "end"];
const WEEK_KEYS: &[&str] = &["week"];
const PAIR_KEYS: &[&str] = &["pair", "lessonNumber"];
const TEACHER_KEYS: &[&str] = &["teachers", "teacher"];
const GROUP_KEYS: &[&str] = &["groups"];
const GROUP_HINT_KEYS: &[&str] = &["group", "groupName"];

/// Keys naming a nested object (discipline, room, group).
const OBJECT_NAME_KEYS: &[&str] = &["fullName", "name", "title", "abbr"];
const GROUP_ID_KEYS: &[&str] = &["name", "title", "groupUuid", "uuid"];
const PERSON_PART_KEYS: &[&str] = &["lastName", "firstName", "middleName"];

// ── Stats ────────────────────────────────────────────────────────────────

/// Per-event outcome counts for one or more payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub events_seen: usize,
    /// No subject, start or end time
    pub dropped_malformed: usize,
    pub dropped_no_teacher: usize,
    /// Lessons produced (one per teacher per kept event)
    pub lessons: usize,
}

impl ParseStats {
    pub fn merge(&mut self, other: &ParseStats) {
        self.events_seen += other.events_seen;
        self.dropped_malformed += other.dropped_malformed;
        self.dropped_no_teacher += other.dropped_no_teacher;
        self.lessons += other.lessons;
    }
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("neither a calendar nor JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("JSON payload has no lesson list")]
    NoLessonList,
}

/// Lessons from one payload, with the group the payload belongs to.
#[derive(Debug, Clone, Default)]
pub struct ParsedPayload {
    pub group: String,
    pub lessons: Vec<Lesson>,
    pub stats: ParseStats,
}

// ── Parser ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EventParser {
    offset: FixedOffset,
    parity: ParityCodes,
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl EventParser {
    pub fn new(config: &Config) -> Self {
        EventParser {
            offset: config.utc_offset(),
            parity: config.parity.clone(),
        }
    }

    /// Parse one raw payload fetched from `source`.
    pub fn parse_payload(&self, source: &str, payload: &str) -> Result<ParsedPayload, PayloadError> {
        if calendar::is_calendar(payload) {
            Ok(self.parse_calendar(source, payload))
        } else {
            self.parse_json(source, payload)
        }
    }

    // ── Calendar path ────────────────────────────────────────────────────

    fn parse_calendar(&self, source: &str, payload: &str) -> ParsedPayload {
        let feed = calendar::read_calendar(payload);
        let group = feed.group.unwrap_or_else(|| source.to_string());
        let mut parsed = ParsedPayload {
            group,
            ..Default::default()
        };

        for event in &feed.events {
            parsed.stats.events_seen += 1;
            let lessons = self.calendar_lessons(&parsed.group, event, &mut parsed.stats);
            parsed.lessons.extend(lessons);
        }
        parsed.stats.lessons = parsed.lessons.len();
        parsed
    }

    fn calendar_lessons(
        &self,
        group: &str,
        event: &CalendarEvent,
        stats: &mut ParseStats,
    ) -> Vec<Lesson> {
        let subject = squash(&extract_subject(&event.summary));
        let start = calendar::parse_timestamp(&event.dtstart, self.offset);
        let end = calendar::parse_timestamp(&event.dtend, self.offset);

        let (Some(start), Some(end)) = (start, end) else {
            debug!(summary = %event.summary, "dropped event without start or end time");
            stats.dropped_malformed += 1;
            return Vec::new();
        };
        if subject.is_empty() {
            debug!(summary = %event.summary, "dropped event without subject");
            stats.dropped_malformed += 1;
            return Vec::new();
        }

        let teachers = extract_teachers(&event.description, &event.summary);
        if teachers.is_empty() {
            debug!(summary = %event.summary, "dropped event without teacher");
            stats.dropped_no_teacher += 1;
            return Vec::new();
        }

        let entry = LessonEntry {
            group: squash(group),
            subject,
            day: RU_WEEKDAYS[start.weekday().num_days_from_monday() as usize].to_string(),
            time: format!("{}–{}", start.format("%H:%M"), end.format("%H:%M")),
            room: non_empty(squash(&event.location)),
            week: WeekParity::All,
            pair: None,
        };
        expand(teachers, entry)
    }

    // ── JSON path ────────────────────────────────────────────────────────

    fn parse_json(&self, source: &str, payload: &str) -> Result<ParsedPayload, PayloadError> {
        let root: Value = serde_json::from_str(payload.trim_start_matches('\u{feff}'))?;
        let items = lesson_list(&root).ok_or(PayloadError::NoLessonList)?;

        // Payload-level hints: the teacher endpoint names its teacher once,
        // at the top, rather than on every lesson.
        let meta = root.get("data").filter(|d| d.is_object()).unwrap_or(&root);
        let group_hint = first_text(meta, GROUP_HINT_KEYS);
        let teacher_hint = payload_teacher(meta);

        let mut parsed = ParsedPayload {
            group: group_hint.unwrap_or_else(|| source.to_string()),
            ..Default::default()
        };

        for item in items {
            parsed.stats.events_seen += 1;
            let lessons =
                self.json_lessons(item, &parsed.group, teacher_hint.as_deref(), &mut parsed.stats);
            parsed.lessons.extend(lessons);
        }
        parsed.stats.lessons = parsed.lessons.len();
        Ok(parsed)
    }

    fn json_lessons(
        &self,
        item: &Value,
        fallback_group: &str,
        teacher_hint: Option<&str>,
        stats: &mut ParseStats,
    ) -> Vec<Lesson> {
        if !item.is_object() {
            stats.dropped_malformed += 1;
            return Vec::new();
        }

        let subject = first_text(item, SUBJECT_KEYS).map(|s| squash(&s)).unwrap_or_default();
        let start = clock(item, START_HOUR_KEYS, START_MINUTE_KEYS, START_TIME_KEYS);
        let end = clock(item, END_HOUR_KEYS, END_MINUTE_KEYS, END_TIME_KEYS);

        let (Some(start), Some(end)) = (start, end) else {
            debug!(%subject, "dropped lesson without start or end time");
            stats.dropped_malformed += 1;
            return Vec::new();
        };
        if subject.is_empty() {
            debug!("dropped lesson without subject");
            stats.dropped_malformed += 1;
            return Vec::new();
        }

        let mut teachers = json_teachers(item);
        if teachers.is_empty() {
            teachers.extend(teacher_hint.map(canonicalize));
        }
        if teachers.is_empty() {
            debug!(%subject, "dropped lesson without teacher");
            stats.dropped_no_teacher += 1;
            return Vec::new();
        }

        let groups = json_groups(item);
        let group = if groups.is_empty() {
            fallback_group.to_string()
        } else {
            groups.join(", ")
        };

        let week = first_text(item, WEEK_KEYS)
            .map(|w| self.parity.resolve(&w))
            .unwrap_or_default();
        let pair = first_text(item, PAIR_KEYS)
            .or_else(|| item.get("time").filter(|t| t.is_u64()).map(|t| t.to_string()));

        let entry = LessonEntry {
            group: squash(&group),
            subject,
            day: first_text(item, DAY_KEYS).map(|d| squash(&d)).unwrap_or_default(),
            time: format!("{start}–{end}"),
            room: first_text(item, ROOM_KEYS).and_then(|r| non_empty(squash(&r))),
            week,
            pair,
        };
        expand(teachers, entry)
    }
}

/// One `Lesson` per teacher.
fn expand(teachers: Vec<String>, entry: LessonEntry) -> Vec<Lesson> {
    teachers
        .into_iter()
        .map(|teacher| Lesson {
            teacher,
            entry: entry.clone(),
        })
        .collect()
}

// ── JSON helpers ─────────────────────────────────────────────────────────

/// Find the lesson array: `data.schedule`, `data`, `schedule`, `lessons`, or the root itself.
fn lesson_list(root: &Value) -> Option<&Vec<Value>> {
    if let Some(list) = root.as_array() {
        return Some(list);
    }
    let data = root.get("data");
    [
        data.and_then(|d| d.get("schedule")),
        data,
        root.get("schedule"),
        root.get("lessons"),
    ]
    .into_iter()
    .flatten()
    .find_map(Value::as_array)
}

/// Render a loosely typed value as display text.
fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) => return first_text(value, OBJECT_NAME_KEYS),
        Value::Array(list) => list.iter().filter_map(text).collect::<Vec<_>>().join(", "),
        Value::Null | Value::Bool(_) => return None,
    };
    non_empty(s)
}

fn first_text(item: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| item.get(*k)).find_map(text)
}

fn first_number(item: &Value, keys: &[&str]) -> Option<u32> {
    keys.iter().filter_map(|k| item.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// "HH:MM" from an hour/minute pair, else from an "HH:MM[:SS]" string.
/// A missing hour means no time at all.
fn clock(item: &Value, hour_keys: &[&str], minute_keys: &[&str], text_keys: &[&str]) -> Option<String> {
    if let Some(hour) = first_number(item, hour_keys) {
        let minute = first_number(item, minute_keys).unwrap_or(0);
        return NaiveTime::from_hms_opt(hour, minute, 0).map(|t| t.format("%H:%M").to_string());
    }
    let raw = text_keys
        .iter()
        .filter_map(|k| item.get(*k))
        .find_map(Value::as_str)?
        .trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// "Иванов Иван Иванович" from name parts, else `fullName`/`name`.
fn person_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s.trim().to_string()),
        Value::Object(_) => name_parts(value).or_else(|| first_text(value, &["fullName", "name"])),
        _ => None,
    }
}

fn name_parts(value: &Value) -> Option<String> {
    let parts: Vec<String> = PERSON_PART_KEYS
        .iter()
        .filter_map(|k| value.get(*k))
        .filter_map(text)
        .collect();
    non_empty(parts.join(" "))
}

/// The payload's own teacher: name parts on the payload object or a
/// `teacher` entry. A bare `name` there is a group or schedule title.
fn payload_teacher(meta: &Value) -> Option<String> {
    name_parts(meta).or_else(|| meta.get("teacher").and_then(person_name))
}

/// Canonical teacher names from the item and its stream, first-seen order.
fn json_teachers(item: &Value) -> Vec<String> {
    let stream = item.get("stream");
    let mut names: Vec<String> = Vec::new();
    for holder in [Some(item), stream].into_iter().flatten() {
        for value in TEACHER_KEYS.iter().filter_map(|k| holder.get(*k)) {
            let people: Vec<&Value> = match value {
                Value::Array(list) => list.iter().collect(),
                single => vec![single],
            };
            for name in people.into_iter().filter_map(person_name) {
                let name = canonicalize(&name);
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
        }
    }
    names
}

fn json_groups(item: &Value) -> Vec<String> {
    let stream = item.get("stream");
    let mut groups: Vec<String> = Vec::new();
    for holder in [stream, Some(item)].into_iter().flatten() {
        let Some(list) = first_list(holder, GROUP_KEYS) else {
            continue;
        };
        for group in list {
            let code = match group {
                Value::Object(_) => first_text(group, GROUP_ID_KEYS),
                other => text(other),
            };
            if let Some(code) = code.filter(|c| !groups.contains(c)) {
                groups.push(code);
            }
        }
    }
    groups
}

fn first_list<'a>(item: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().filter_map(|k| item.get(*k)).find_map(Value::as_array)
}

// ── Text helpers ─────────────────────────────────────────────────────────

fn squash(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CALENDAR: &str = "BEGIN:VCALENDAR\n\
X-WR-CALNAME:Расписание ИУ3-45Б\n\
BEGIN:VEVENT\n\
SUMMARY:Математика лек. Иванов И.И.\n\
DTSTART:20240208T071500Z\n\
DTEND:20240208T081500Z\n\
LOCATION:12-301\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
SUMMARY:Физика лаб.\n\
DTSTART:20240208T090000Z\n\
DTEND:20240208T100000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
SUMMARY:Химия сем. Петров П.П.\n\
DTSTART:20240208T090000Z\n\
END:VEVENT\n\
BEGIN:VEVENT\n\
SUMMARY:Экология\n\
DESCRIPTION:Преподаватели: Сидорова А.Б.\\, Орлов В.В.\n\
DTSTART;VALUE=DATE:20240209\n\
DTEND;VALUE=DATE:20240210\n\
END:VEVENT\n\
END:VCALENDAR\n";

    fn parse(source: &str, payload: &str) -> ParsedPayload {
        EventParser::default().parse_payload(source, payload).unwrap()
    }

    #[test]
    fn test_calendar_payload() {
        let parsed = parse("uuid-1", CALENDAR);
        assert_eq!(parsed.group, "ИУ3-45Б");
        assert_eq!(parsed.lessons.len(), 1);

        let lesson = &parsed.lessons[0];
        assert_eq!(lesson.teacher, "Иванов И.И.");
        assert_eq!(lesson.entry.subject, "Математика");
        assert_eq!(lesson.entry.day, "Четверг");
        assert_eq!(lesson.entry.time, "10:15–11:15");
        assert_eq!(lesson.entry.room.as_deref(), Some("12-301"));
        assert_eq!(lesson.entry.group, "ИУ3-45Б");

        assert_eq!(
            parsed.stats,
            ParseStats {
                events_seen: 4,
                dropped_malformed: 2,
                dropped_no_teacher: 1,
                lessons: 1,
            }
        );
    }

    #[test]
    fn test_calendar_without_title_uses_source() {
        let payload = "BEGIN:VCALENDAR\n\
BEGIN:VEVENT\n\
SUMMARY:Математика лек.\n\
DESCRIPTION:Преподаватели: Петров П. П.\\, Сидорова А.Б.\n\
DTSTART:20240212T101500\n\
DTEND:20240212T115000\n\
END:VEVENT\n\
END:VCALENDAR\n";
        let parsed = parse("dump/iu3.ics", payload);
        assert_eq!(parsed.group, "dump/iu3.ics");
        let teachers: Vec<&str> = parsed.lessons.iter().map(|l| l.teacher.as_str()).collect();
        assert_eq!(teachers, vec!["Петров П.П.", "Сидорова А.Б."]);
        assert!(parsed.lessons.iter().all(|l| l.entry.day == "Понедельник"));
        assert!(parsed.lessons.iter().all(|l| l.entry.room.is_none()));
    }

    #[test]
    fn test_group_api_payload() {
        let payload = json!({
            "data": [{
                "date": "2024-02-08",
                "startTimeHourNum": 8,
                "startTimeMinNum": 30,
                "endTimeHourNum": 10,
                "endTimeMinNum": 5,
                "discipline": {"fullName": "Математический  анализ"},
                "auditory": "345Л",
                "stream": {
                    "groups": [{"groupUuid": "g-1", "name": "ИУ3-45Б"}, {"uuid": "g-2"}],
                    "teachers": [{"lastName": "Иванов", "firstName": "И.", "middleName": "И."}]
                },
                "teachers": ["Петров  П. П."]
            }]
        });
        let parsed = parse("g-1", &payload.to_string());
        assert_eq!(parsed.group, "g-1");
        assert_eq!(parsed.lessons.len(), 2);

        let first = &parsed.lessons[0];
        assert_eq!(first.teacher, "Петров П.П.");
        assert_eq!(first.entry.subject, "Математический анализ");
        assert_eq!(first.entry.time, "08:30–10:05");
        assert_eq!(first.entry.day, "2024-02-08");
        assert_eq!(first.entry.room.as_deref(), Some("345Л"));
        assert_eq!(first.entry.group, "ИУ3-45Б, g-2");
        assert_eq!(parsed.lessons[1].teacher, "Иванов И.И.");
    }

    #[test]
    fn test_teacher_api_payload() {
        let payload = json!({
            "data": {
                "lastName": "Сидорова",
                "firstName": "А.",
                "middleName": "Б.",
                "schedule": [
                    {
                        "day": 4, "time": 2, "week": "ch",
                        "startTime": "10:15", "endTime": "11:50:00",
                        "discipline": {"abbr": "ТАУ"},
                        "audiences": [{"name": "501ю"}],
                        "groups": [{"name": "ИУ1-61"}]
                    },
                    {"day": 5, "discipline": "Физика", "startTime": "12:00"}
                ]
            }
        });
        let parsed = parse("teacher-uuid", &payload.to_string());
        assert_eq!(parsed.lessons.len(), 1);
        assert_eq!(parsed.stats.dropped_malformed, 1);

        let lesson = &parsed.lessons[0];
        assert_eq!(lesson.teacher, "Сидорова А.Б.");
        assert_eq!(lesson.entry.day, "4");
        assert_eq!(lesson.entry.time, "10:15–11:50");
        assert_eq!(lesson.entry.week, WeekParity::Odd);
        assert_eq!(lesson.entry.pair.as_deref(), Some("2"));
        assert_eq!(lesson.entry.room.as_deref(), Some("501ю"));
        assert_eq!(lesson.entry.group, "ИУ1-61");
    }

    #[test]
    fn test_missing_hour_drops_lesson() {
        let payload = json!({"schedule": [
            {"day": "Вторник", "subject": "Химия", "endHour": 11, "teachers": ["Орлов В.В."]}
        ]});
        let parsed = parse("s", &payload.to_string());
        assert!(parsed.lessons.is_empty());
        assert_eq!(parsed.stats.dropped_malformed, 1);
    }

    #[test]
    fn test_json_lesson_without_teacher() {
        let payload = json!([
            {"day": "Вторник", "title": "Химия", "startHour": 9, "endHour": 10}
        ]);
        let parsed = parse("s", &payload.to_string());
        assert!(parsed.lessons.is_empty());
        assert_eq!(parsed.stats.dropped_no_teacher, 1);
    }

    #[test]
    fn test_group_name_is_not_a_teacher() {
        let payload = json!({"data": {
            "name": "ИУ3-45Б",
            "schedule": [{"discipline": "Химия", "startHour": 9, "endHour": 10}]
        }});
        let parsed = parse("g", &payload.to_string());
        assert!(parsed.lessons.is_empty());
        assert_eq!(parsed.stats.dropped_no_teacher, 1);

        let payload = json!({"data": {
            "teacher": {"fullName": "Орлов В.В."},
            "schedule": [{"discipline": "Химия", "startHour": 9, "endHour": 10}]
        }});
        let parsed = parse("t", &payload.to_string());
        assert_eq!(parsed.lessons[0].teacher, "Орлов В.В.");
    }

    #[test]
    fn test_unreadable_payloads() {
        let parser = EventParser::default();
        assert!(matches!(
            parser.parse_payload("s", "<html>login</html>"),
            Err(PayloadError::NotJson(_))
        ));
        assert!(matches!(
            parser.parse_payload("s", r#"{"status": "ok"}"#),
            Err(PayloadError::NoLessonList)
        ));
    }

    #[test]
    fn test_stats_merge() {
        let mut total = ParseStats::default();
        total.merge(&ParseStats {
            events_seen: 3,
            dropped_malformed: 1,
            dropped_no_teacher: 1,
            lessons: 1,
        });
        total.merge(&ParseStats {
            events_seen: 2,
            lessons: 4,
            ..Default::default()
        });
        assert_eq!(total.events_seen, 5);
        assert_eq!(total.lessons, 5);
    }
}
