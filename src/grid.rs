//! Time × day × week-parity grid of one teacher's lessons, for display.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use timetable_types::{LessonEntry, WeekParity};

use crate::calendar::RU_WEEKDAYS;

/// Short weekday forms the portal uses in compact views.
const RU_WEEKDAYS_SHORT: [&str; 7] = ["пн", "вт", "ср", "чт", "пт", "сб", "вс"];

/// Row key. Field order gives the display order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
    pub pair: String,
}

impl TimeSlot {
    pub fn label(&self) -> String {
        let range = if self.end.is_empty() {
            self.start.clone()
        } else {
            format!("{}–{}", self.start, self.end)
        };
        if self.pair.is_empty() {
            range
        } else {
            format!("{} пара, {range}", self.pair)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeekBuckets {
    pub all: Vec<LessonEntry>,
    pub odd: Vec<LessonEntry>,
    pub even: Vec<LessonEntry>,
    /// Non-standard parity tags, verbatim
    pub other: BTreeMap<String, Vec<LessonEntry>>,
}

impl WeekBuckets {
    fn push(&mut self, lesson: LessonEntry) {
        let bucket = match &lesson.week {
            WeekParity::All => &mut self.all,
            WeekParity::Odd => &mut self.odd,
            WeekParity::Even => &mut self.even,
            WeekParity::Other(tag) => self.other.entry(tag.clone()).or_default(),
        };
        bucket.push(lesson);
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
            && self.odd.is_empty()
            && self.even.is_empty()
            && self.other.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.all.len()
            + self.odd.len()
            + self.even.len()
            + self.other.values().map(Vec::len).sum::<usize>()
    }

    /// Non-empty buckets with their display labels, standard ones first.
    pub fn labelled(&self) -> Vec<(WeekParity, &[LessonEntry])> {
        let mut out: Vec<(WeekParity, &[LessonEntry])> = vec![
            (WeekParity::All, self.all.as_slice()),
            (WeekParity::Odd, self.odd.as_slice()),
            (WeekParity::Even, self.even.as_slice()),
        ];
        out.extend(
            self.other
                .iter()
                .map(|(tag, lessons)| (WeekParity::Other(tag.clone()), lessons.as_slice())),
        );
        out.retain(|(_, lessons)| !lessons.is_empty());
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridCell {
    /// 1 = Monday … 7 = Sunday
    pub day: u8,
    pub weeks: WeekBuckets,
    pub has_content: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub slot: TimeSlot,
    /// Always seven cells, Monday first.
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimetableGrid {
    pub rows: Vec<GridRow>,
    /// Lessons whose day label names no weekday
    pub unplaced: Vec<LessonEntry>,
}

impl TimetableGrid {
    pub fn lesson_count(&self) -> usize {
        let placed: usize = self
            .rows
            .iter()
            .flat_map(|r| &r.cells)
            .map(|c| c.weeks.len())
            .sum();
        placed + self.unplaced.len()
    }
}

/// Build the grid fresh from a teacher's lessons.
pub fn build_grid(lessons: &[LessonEntry]) -> TimetableGrid {
    let mut slots: BTreeMap<TimeSlot, [WeekBuckets; 7]> = BTreeMap::new();
    let mut unplaced = Vec::new();

    for lesson in lessons {
        let Some(day) = day_number(&lesson.day) else {
            unplaced.push(lesson.clone());
            continue;
        };
        let days = slots.entry(time_slot(lesson)).or_default();
        days[usize::from(day - 1)].push(lesson.clone());
    }

    let rows = slots
        .into_iter()
        .map(|(slot, days)| GridRow {
            slot,
            cells: days
                .into_iter()
                .zip(1u8..)
                .map(|(weeks, day)| GridCell {
                    day,
                    has_content: !weeks.is_empty(),
                    weeks,
                })
                .collect(),
        })
        .collect();

    TimetableGrid { rows, unplaced }
}

/// Row key of a lesson: its time split on the dash, and its pair number.
pub fn time_slot(lesson: &LessonEntry) -> TimeSlot {
    let (start, end) = lesson
        .time
        .split_once(['–', '-'])
        .unwrap_or((lesson.time.as_str(), ""));
    TimeSlot {
        start: start.trim().to_string(),
        end: end.trim().to_string(),
        pair: lesson.pair.clone().unwrap_or_default(),
    }
}

/// Weekday number 1..=7 from a number, a Russian weekday name or an ISO date.
pub fn day_number(day: &str) -> Option<u8> {
    let day = day.trim();
    if let Ok(n) = day.parse::<u8>() {
        return (1..=7).contains(&n).then_some(n);
    }

    let lower = day.to_lowercase();
    let named = RU_WEEKDAYS
        .iter()
        .position(|name| name.to_lowercase() == lower)
        .or_else(|| RU_WEEKDAYS_SHORT.iter().position(|short| *short == lower));
    if let Some(i) = named {
        return Some(i as u8 + 1);
    }

    // "2024-02-08" or "2024-02-08T00:00:00"
    let date = NaiveDate::parse_from_str(day.get(..10)?, "%Y-%m-%d").ok()?;
    Some(date.weekday().number_from_monday() as u8)
}
