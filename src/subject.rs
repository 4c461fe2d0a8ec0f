use std::sync::LazyLock;

use regex::Regex;

/// Lesson-type markers. In a summary line the subject is everything before
/// the first one, e.g. "Математика лек. Иванов И.И." → "Математика".
pub const LESSON_TYPE_MARKERS: &[&str] = &[
    "лек",     // lecture
    "лаб",     // lab
    "пр",      // practice
    "сем",     // seminar
    "конс",    // consultation
    "экз",     // exam
    "зач",     // credit test
    "курс.пр", // course project
];

/// Characters trimmed off both ends of an extracted subject.
const SEPARATORS: &[char] = &[' ', '\u{a0}', '-', '–', '—', ',', ';', ':', '.'];

static RE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(&build_marker_regex()).unwrap());

/// Subgroup numerals: "Физика I Иванов" / "Физика II Петров"
static RE_ROMAN_SUBGROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+[IVX]+\s+").unwrap());

/// Build a case-insensitive whole-word alternation of the markers.
/// Longest first, so "курс.пр" wins over "пр".
pub fn build_marker_regex() -> String {
    let mut all: Vec<&str> = LESSON_TYPE_MARKERS.to_vec();
    all.sort_by_key(|m| std::cmp::Reverse(m.chars().count()));
    let alts: Vec<String> = all.iter().map(|m| regex::escape(m)).collect();
    format!(r"(?i)\b(?:{})\b", alts.join("|"))
}

/// Pull the subject out of a summary/title line.
pub fn extract_subject(summary: &str) -> String {
    let s = summary.trim();
    let head = match RE_MARKER.find(s) {
        Some(m) => &s[..m.start()],
        None => RE_ROMAN_SUBGROUP.split(s).next().unwrap_or(s),
    };
    head.trim_matches(SEPARATORS).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_before_marker() {
        assert_eq!(extract_subject("Математика лек. Иванов И.И."), "Математика");
        assert_eq!(extract_subject("Физика лаб."), "Физика");
        assert_eq!(
            extract_subject("Теория вероятностей - сем. 12-301"),
            "Теория вероятностей"
        );
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        assert_eq!(extract_subject("Химия ЛЕК Петров П.П."), "Химия");
        assert_eq!(extract_subject("Химия Лаб. Петров П.П."), "Химия");
    }

    #[test]
    fn test_marker_must_be_whole_word() {
        // "пр" inside "Программирование" and "лек" inside "Электроника" are not markers
        assert_eq!(extract_subject("Программирование пр."), "Программирование");
        assert_eq!(extract_subject("Электроника сем."), "Электроника");
    }

    #[test]
    fn test_course_project_marker() {
        assert_eq!(extract_subject("Детали машин курс.пр. Сидоров"), "Детали машин");
    }

    #[test]
    fn test_roman_subgroup_fallback() {
        assert_eq!(extract_subject("Иностранный язык II Петрова"), "Иностранный язык");
        assert_eq!(extract_subject("Физкультура"), "Физкультура");
    }

    #[test]
    fn test_marker_first_gives_empty_subject() {
        assert_eq!(extract_subject("лек. Иванов И.И."), "");
    }

    #[test]
    fn test_marker_regex_longest_first() {
        let re = build_marker_regex();
        assert!(re.starts_with(r"(?i)\b(?:курс\.пр|"));
        assert!(re.ends_with(r"|пр)\b"));
    }
}
