use tracing::debug;

use crate::index::TeacherIndex;
use crate::names::{canonicalize, fold};

/// Outcome of resolving a query to one teacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    NoMatch,
    /// Exactly one teacher: go straight to the schedule
    Unique(String),
    Ambiguous(Vec<String>),
}

/// Teacher keys matching `query`, shortest first, at most `limit`.
///
/// The query is canonicalised like the keys and matched case-insensitively
/// as a substring. When nothing matches, only its first word is tried.
pub fn search(index: &TeacherIndex, query: &str, limit: usize) -> Vec<String> {
    let mut found = ranked(index, query);
    found.truncate(limit);
    found
}

/// Every key matching `query`, in display order.
fn ranked(index: &TeacherIndex, query: &str) -> Vec<String> {
    let needle = fold(query);
    if needle.is_empty() {
        return Vec::new();
    }

    let mut found = matching(index, &needle);
    if found.is_empty() {
        if let Some(first) = needle.split(' ').next().filter(|t| *t != needle) {
            debug!(query, token = first, "no full match, trying first word");
            found = matching(index, first);
        }
    }

    found.sort_by(|a, b| {
        a.chars()
            .count()
            .cmp(&b.chars().count())
            .then_with(|| a.cmp(b))
    });
    found
}

fn matching(index: &TeacherIndex, needle: &str) -> Vec<String> {
    index
        .keys()
        .filter(|key| fold(key).contains(needle))
        .map(str::to_string)
        .collect()
}

/// Resolve a query for the detail view: an exact key or a single search hit
/// is `Unique`. `limit` caps only the `Ambiguous` list.
pub fn resolve(index: &TeacherIndex, query: &str, limit: usize) -> Resolution {
    let exact = canonicalize(query);
    if index.contains(&exact) {
        return Resolution::Unique(exact);
    }

    let mut found = ranked(index, query);
    match found.len() {
        0 => Resolution::NoMatch,
        1 => Resolution::Unique(found.remove(0)),
        _ => {
            found.truncate(limit);
            Resolution::Ambiguous(found)
        }
    }
}
