use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use walkdir::WalkDir;

use crate::config::{FetchConfig, SourceFormat};
use crate::error::Result;

/// `/schedule/<uuid>` anywhere in a link or page.
static RE_SCHEDULE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/schedule/(?P<id>[0-9a-fA-F\-]{36})").unwrap());

static RE_BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{8}-(?:[0-9a-fA-F]{4}-){3}[0-9a-fA-F]{12}$").unwrap());

/// Dump file extensions picked up by a directory scan.
const DUMP_EXTENSIONS: &[&str] = &["ics", "json"];

/// Where a source reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(String),
    Local(PathBuf),
}

/// Schedule UUID carried by a reference, if any.
pub fn schedule_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if RE_BARE_ID.is_match(raw) {
        return Some(raw.to_lowercase());
    }
    if !is_url(raw) {
        return None;
    }
    RE_SCHEDULE_ID
        .captures(raw)
        .and_then(|c| c.name("id"))
        .map(|m| m.as_str().to_lowercase())
}

fn is_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

/// Tidy a list of references: drop query strings and blanks, collapse
/// references to the same schedule, keep first-seen order, cap at `max`.
pub fn normalize_refs<I, S>(refs: I, max: Option<usize>) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in refs {
        let raw = raw.as_ref();
        let trimmed = raw.split('?').next().unwrap_or(raw).trim();
        if trimmed.is_empty() {
            continue;
        }
        let clean = schedule_id(trimmed).unwrap_or_else(|| trimmed.to_string());
        if seen.insert(clean.clone()) {
            out.push(clean);
        }
    }
    if let Some(max) = max {
        out.truncate(max);
    }
    out
}

/// Every distinct schedule UUID linked from a schedule list page, sorted.
pub fn discover_schedule_ids(html: &str) -> Vec<String> {
    RE_SCHEDULE_ID
        .captures_iter(html)
        .filter_map(|c| c.name("id"))
        .map(|m| m.as_str().to_lowercase())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Turn a reference into a URL or a local path.
pub fn resolve_location(raw: &str, config: &FetchConfig) -> Location {
    let raw = raw.trim();
    if let Some(id) = schedule_id(raw) {
        let url = match config.format {
            SourceFormat::Ics => format!("{}/schedule/{id}.ics", config.base_url.trim_end_matches('/')),
            SourceFormat::Json => {
                format!("{}/schedule/group/{id}", config.api_url.trim_end_matches('/'))
            }
        };
        return Location::Remote(url);
    }
    if is_url(raw) {
        let base = raw.split('?').next().unwrap_or(raw).trim_end_matches('/');
        let url = if config.format == SourceFormat::Ics && !base.ends_with(".ics") {
            format!("{base}.ics")
        } else {
            base.to_string()
        };
        return Location::Remote(url);
    }
    Location::Local(PathBuf::from(raw))
}

/// One reference per non-blank line.
pub fn read_urls_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect())
}

/// Every `*.ics` / `*.json` dump below `root`, sorted by path.
pub fn scan_dump_dir(root: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| DUMP_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    found.sort();
    found
}
