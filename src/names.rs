//! Teacher name canonicalisation.
//!
//! Every name variant the sources produce for one teacher ("Иванов И. И.",
//! "Иванов  И.И.", "Иванов И.И.") must land on the same index key.

use std::sync::LazyLock;

use regex::Regex;

/// Whitespace hugging a period: "И. И." → "И.И."
static RE_PERIOD_SPACING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\.\s*").unwrap());

/// A two-initial block, with whatever spacing precedes it.
static RE_INITIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([А-Я])\.\s*([А-Я])\.").unwrap());

/// A capitalised Cyrillic word; hyphenated parts may be capitalised too
/// ("Салтыков-Щедрин", "Бонч-Бруевич").
pub(crate) const CAPITALIZED: &str = r"[А-ЯЁ][а-яё]+(?:-[А-ЯЁа-яё][а-яё]+)*";

static RE_CAPITALIZED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{CAPITALIZED}$")).unwrap());

/// Map a raw name to its index key.
///
/// Idempotent: `canonicalize(&canonicalize(x)) == canonicalize(x)`.
pub fn canonicalize(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let unified = unify_yo(&collapsed);
    let tight = RE_PERIOD_SPACING.replace_all(&unified, ".");
    let spaced = RE_INITIALS.replace_all(&tight, " ${1}.${2}.");
    spaced.trim().to_string()
}

/// Case-folded canonical form, for matching queries against keys.
pub fn fold(raw: &str) -> String {
    canonicalize(raw).to_lowercase()
}

/// Ё/ё are spelled as Е/е often enough that one teacher would otherwise get two keys.
pub fn unify_yo(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'Ё' => 'Е',
            'ё' => 'е',
            c => c,
        })
        .collect()
}

pub fn is_capitalized_word(s: &str) -> bool {
    RE_CAPITALIZED_WORD.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initials_spacing_collapses() {
        assert_eq!(canonicalize("Иванов И. И."), "Иванов И.И.");
        assert_eq!(canonicalize("  Иванов   И.И. "), "Иванов И.И.");
        assert_eq!(canonicalize("ИвановИ.И."), "Иванов И.И.");
        assert_eq!(canonicalize("Иванов И .И ."), "Иванов И.И.");
    }

    #[test]
    fn test_yo_spelling_merges() {
        assert_eq!(canonicalize("Пётр Семёнов"), canonicalize("Петр Семенов"));
        assert_eq!(canonicalize("Ёлкин Ё.Ё."), "Елкин Е.Е.");
    }

    #[test]
    fn test_plain_names_untouched() {
        assert_eq!(canonicalize("Иванов"), "Иванов");
        assert_eq!(canonicalize("Римский-Корсаков Н.А."), "Римский-Корсаков Н.А.");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn test_leading_initials() {
        assert_eq!(canonicalize("И. И. Иванов"), "И.И.Иванов");
        assert_eq!(canonicalize(&canonicalize("И. И. Иванов")), "И.И.Иванов");
    }

    #[test]
    fn test_fold_is_case_insensitive() {
        assert_eq!(fold("ИВАНОВ"), fold("иванов"));
        assert_eq!(fold("Иванов И. И."), "иванов и.и.");
    }

    #[test]
    fn test_capitalized_word() {
        assert!(is_capitalized_word("Иванов"));
        assert!(is_capitalized_word("Салтыков-Щедрин"));
        assert!(is_capitalized_word("Бонч-бруевич"));
        assert!(!is_capitalized_word("Римский-"));
        assert!(!is_capitalized_word("иванов"));
        assert!(!is_capitalized_word("И.И."));
        assert!(!is_capitalized_word("Иванов И.И."));
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(raw in "[А-Яа-яЁё .\\-\t]{0,40}") {
            let once = canonicalize(&raw);
            prop_assert_eq!(canonicalize(&once), once);
        }

        #[test]
        fn yo_variants_share_a_key(raw in "[А-Яа-яЁё. ]{0,30}") {
            let ye = raw.replace('Ё', "Е").replace('ё', "е");
            prop_assert_eq!(canonicalize(&raw), canonicalize(&ye));
        }
    }
}
