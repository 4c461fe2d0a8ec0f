//! Teacher index: canonical teacher name → deduplicated lesson list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use timetable_types::{GroupRecord, Lesson, LessonEntry, TeacherMap};
use tracing::{debug, warn};

use crate::dedup;
use crate::names::canonicalize;
use crate::parser::{EventParser, ParseStats, ParsedPayload};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeacherIndex(TeacherMap);

impl TeacherIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one lesson under its canonical teacher key.
    /// Returns false when the lesson was a duplicate.
    pub fn insert(&mut self, lesson: Lesson) -> bool {
        let key = canonicalize(&lesson.teacher);
        if key.is_empty() {
            return false;
        }
        dedup::accept(self.0.entry(key).or_default(), lesson.entry)
    }

    pub fn get(&self, teacher: &str) -> Option<&[LessonEntry]> {
        self.0.get(teacher).map(Vec::as_slice)
    }

    pub fn contains(&self, teacher: &str) -> bool {
        self.0.contains_key(teacher)
    }

    /// Teacher keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LessonEntry])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn lesson_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Parse and fold raw `(source, payload)` pairs in one pass.
    /// Unreadable payloads are logged and skipped.
    pub fn build<'a, I>(parser: &EventParser, payloads: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = IndexBuilder::default();
        for (source, payload) in payloads {
            match parser.parse_payload(source, payload) {
                Ok(parsed) => builder.add(source, parsed),
                Err(e) => warn!(source, error = %e, "skipping unreadable payload"),
            }
        }
        builder.index
    }
}

impl From<TeacherMap> for TeacherIndex {
    fn from(map: TeacherMap) -> Self {
        TeacherIndex(map)
    }
}

/// Sequential fold of parsed payloads into the index, the raw group dump and
/// the summed parse stats.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    pub index: TeacherIndex,
    pub groups: BTreeMap<String, GroupRecord>,
    pub stats: ParseStats,
}

impl IndexBuilder {
    pub fn add(&mut self, source: &str, parsed: ParsedPayload) {
        self.stats.merge(&parsed.stats);

        let mut added = 0;
        for lesson in &parsed.lessons {
            if self.index.insert(lesson.clone()) {
                added += 1;
            }
        }
        debug!(
            source,
            group = %parsed.group,
            lessons = parsed.lessons.len(),
            added,
            "folded payload"
        );

        let record = self
            .groups
            .entry(parsed.group)
            .or_insert_with(|| GroupRecord {
                source: source.to_string(),
                lessons: Vec::new(),
            });
        record.lessons.extend(parsed.lessons);
    }
}
