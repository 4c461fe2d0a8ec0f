//! Teacher name extraction from free-text calendar fields.
//!
//! Names are found by an ordered list of independent rules. Each rule reads
//! one field and returns every candidate it sees; the SUMMARY rules are a
//! fallback, consulted only when DESCRIPTION yields nothing.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::names::{CAPITALIZED as NAME, canonicalize, is_capitalized_word};

// ── Patterns ─────────────────────────────────────────────────────────────
//
// Real data examples:
//   DESCRIPTION:
//     Преподаватель: Иванов И.И.
//     Преподаватели: Петров П. П., Сидорова А.Б.
//     Иванов И.И. Петров
//   SUMMARY:
//     Математика лек. 12-301 Иванов И.И.
//     Физика лаб. 345Л Петрова

/// Horizontal whitespace: a name never runs across a line break.
const SP: &str = r"[^\S\r\n]";

/// Optional "Преподаватель...:" label, then a surname with optional
/// initials and an optional following capitalised word.
static RE_LABELLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:Преподавател[а-яё]*[^:\n]*:\s*)?(?P<name>{NAME}(?:{SP}+[А-ЯЁ]\.{SP}*[А-ЯЁ]\.)?(?:{SP}+{NAME})?)"
    ))
    .unwrap()
});

/// Surname followed by one or two double-initial blocks, wherever it stands.
static RE_INITIALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b{NAME}(?:{SP}+[А-ЯЁ]\.{SP}*[А-ЯЁ]\.){{1,2}}"
    ))
    .unwrap()
});

/// Room code ("12-301", "345Л", "7–1") immediately followed by a name.
static RE_AFTER_ROOM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b\d{{1,2}}[-–]?\d{{1,3}}[А-Яа-яA-Za-z]?{SP}+(?P<name>{NAME}(?:{SP}+[А-ЯЁ]\.{SP}*[А-ЯЁ]\.)?)"
    ))
    .unwrap()
});

// ── Rules ────────────────────────────────────────────────────────────────

/// Which pattern produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameRule {
    /// Label-prefixed or bare surname with optional initials
    Labelled,
    /// Surname + double initials
    Initials,
    /// Name right after a room code
    AfterRoom,
}

/// Event field a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Description,
    Summary,
}

/// A matcher returns raw candidate strings, in text order.
pub type Matcher = fn(&str) -> Vec<String>;

pub struct Rule {
    pub kind: NameRule,
    pub field: Field,
    pub matcher: Matcher,
}

/// All rules in priority order.
pub const RULES: &[Rule] = &[
    Rule {
        kind: NameRule::Labelled,
        field: Field::Description,
        matcher: labelled_names,
    },
    Rule {
        kind: NameRule::Initials,
        field: Field::Description,
        matcher: initialled_names,
    },
    Rule {
        kind: NameRule::AfterRoom,
        field: Field::Summary,
        matcher: names_after_room,
    },
    Rule {
        kind: NameRule::Initials,
        field: Field::Summary,
        matcher: initialled_names,
    },
];

pub fn labelled_names(text: &str) -> Vec<String> {
    RE_LABELLED
        .captures_iter(text)
        .filter_map(|c| c.name("name"))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn initialled_names(text: &str) -> Vec<String> {
    RE_INITIALS
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn names_after_room(text: &str) -> Vec<String> {
    RE_AFTER_ROOM
        .captures_iter(text)
        .filter_map(|c| c.name("name"))
        .map(|m| m.as_str().to_string())
        .collect()
}

// ── False positive filtering ─────────────────────────────────────────────

/// Capitalised words that open a candidate but are labels or lesson
/// vocabulary, not surnames.
const STOP_WORDS: &[&str] = &[
    "Преподаватель",
    "Преподаватели",
    "Аудитория",
    "Ауд",
    "Группа",
    "Группы",
    "Поток",
    "Подгруппа",
    "Лекция",
    "Лекции",
    "Семинар",
    "Лабораторная",
    "Практика",
    "Консультация",
    "Экзамен",
    "Зачет",
    "Дистанционно",
    "Онлайн",
];

/// Tidy a raw match into a candidate; `None` for noise.
fn clean_candidate(raw: &str) -> Option<String> {
    let name = canonicalize(raw)
        .trim_matches([',', ';', ':', ' '])
        .to_string();
    if name.chars().count() < 3 {
        return None;
    }

    let mut words = name.split(' ');
    let first = words.next().unwrap_or("");
    if STOP_WORDS.contains(&first) {
        return None;
    }
    // A lone word must at least look like a surname
    if words.next().is_none() && !is_capitalized_word(&name) {
        return None;
    }
    Some(name)
}

// ── Extraction ───────────────────────────────────────────────────────────

fn run_rules(field: Field, text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    RULES
        .iter()
        .filter(|rule| rule.field == field)
        .flat_map(|rule| {
            let found: Vec<String> = (rule.matcher)(text)
                .iter()
                .filter_map(|raw| clean_candidate(raw))
                .collect();
            if !found.is_empty() {
                debug!(rule = ?rule.kind, field = ?field, ?found, "name rule matched");
            }
            found
        })
        .collect()
}

/// Distinct canonical teacher names for one event, first-seen order.
pub fn extract_teachers(description: &str, summary: &str) -> Vec<String> {
    let mut candidates = run_rules(Field::Description, description);
    if candidates.is_empty() {
        candidates = run_rules(Field::Summary, summary);
    }

    let mut seen = HashSet::new();
    candidates.retain(|name| seen.insert(name.clone()));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_rule() {
        assert_eq!(
            labelled_names("Преподаватель: Иванов И. И."),
            vec!["Иванов И. И."]
        );
        assert_eq!(labelled_names("Иванов И.И. Петров"), vec!["Иванов И.И. Петров"]);
        assert!(labelled_names("лекция в 10").is_empty());
    }

    #[test]
    fn test_initials_rule() {
        assert_eq!(
            initialled_names("Математика лек. Иванов И.И."),
            vec!["Иванов И.И."]
        );
        assert_eq!(
            initialled_names("Петров П. П., Сидорова А.Б."),
            vec!["Петров П. П.", "Сидорова А.Б."]
        );
        assert!(initialled_names("Физика лаб.").is_empty());
    }

    #[test]
    fn test_after_room_rule() {
        assert_eq!(
            names_after_room("Математика лек. 12-301 Иванов И.И."),
            vec!["Иванов И.И."]
        );
        assert_eq!(names_after_room("Физика лаб. 345Л Петрова"), vec!["Петрова"]);
        assert!(names_after_room("Физика лаб. Петрова").is_empty());
    }

    #[test]
    fn test_rule_order() {
        let kinds: Vec<(NameRule, Field)> = RULES.iter().map(|r| (r.kind, r.field)).collect();
        assert_eq!(
            kinds,
            vec![
                (NameRule::Labelled, Field::Description),
                (NameRule::Initials, Field::Description),
                (NameRule::AfterRoom, Field::Summary),
                (NameRule::Initials, Field::Summary),
            ]
        );
    }

    #[test]
    fn test_description_first() {
        let found = extract_teachers(
            "Преподаватель: Иванов И.И.",
            "Математика лек. 12-301 Петров П.П.",
        );
        assert_eq!(found, vec!["Иванов И.И."]);
    }

    #[test]
    fn test_summary_fallback() {
        let found = extract_teachers("", "Математика лек. Иванов И. И.");
        assert_eq!(found, vec!["Иванов И.И."]);
    }

    #[test]
    fn test_distinct_in_first_seen_order() {
        let found = extract_teachers("Преподаватели: Петров П. П., Сидорова А.Б.", "");
        assert_eq!(found, vec!["Петров П.П.", "Сидорова А.Б."]);
    }

    #[test]
    fn test_name_stops_at_line_break() {
        assert_eq!(
            labelled_names("Преподаватель: Иванов И.И.\nПоток ИУ3"),
            vec!["Иванов И.И.", "Поток"]
        );
        assert_eq!(
            extract_teachers("Преподаватель: Иванов И.И.\nПоток ИУ3", ""),
            vec!["Иванов И.И."]
        );
    }

    #[test]
    fn test_hyphenated_surname() {
        assert_eq!(
            extract_teachers("Преподаватель: Римский-Корсаков Н.А.", ""),
            vec!["Римский-Корсаков Н.А."]
        );
        assert_eq!(
            extract_teachers("", "Гармония сем. Римский-Корсаков Н. А."),
            vec!["Римский-Корсаков Н.А."]
        );
        assert_eq!(
            names_after_room("Литература сем. 12-301 Салтыков-Щедрин"),
            vec!["Салтыков-Щедрин"]
        );
    }

    #[test]
    fn test_no_teacher() {
        assert!(extract_teachers("", "Физика лаб.").is_empty());
        assert!(extract_teachers("  ", "").is_empty());
    }

    #[test]
    fn test_stop_words_dropped() {
        assert!(clean_candidate("Аудитория").is_none());
        assert!(clean_candidate("Преподаватель Иванов").is_none());
        assert!(clean_candidate("Ив").is_none());
        assert_eq!(clean_candidate("Иванов,").as_deref(), Some("Иванов"));
    }

    #[test]
    fn test_lone_word_must_look_like_surname() {
        assert!(clean_candidate("ИВАНОВ").is_none());
        assert_eq!(clean_candidate("Петрова").as_deref(), Some("Петрова"));
    }
}
