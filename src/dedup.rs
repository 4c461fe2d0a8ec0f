use timetable_types::LessonEntry;

/// Identity of a lesson within one teacher's list. Room, week and pair are
/// not part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LessonKey<'a> {
    pub group: &'a str,
    pub subject: &'a str,
    pub day: &'a str,
    pub time: &'a str,
}

impl<'a> From<&'a LessonEntry> for LessonKey<'a> {
    fn from(entry: &'a LessonEntry) -> Self {
        LessonKey {
            group: &entry.group,
            subject: &entry.subject,
            day: &entry.day,
            time: &entry.time,
        }
    }
}

/// Append `entry` unless an equal (group, subject, day, time) is already
/// listed. The first-seen room stays. Returns whether it was added.
pub fn accept(list: &mut Vec<LessonEntry>, entry: LessonEntry) -> bool {
    let key = LessonKey::from(&entry);
    if list.iter().any(|existing| LessonKey::from(existing) == key) {
        return false;
    }
    list.push(entry);
    true
}
