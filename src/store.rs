//! JSON files on disk: the teacher index and the raw group dump.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::index::TeacherIndex;

/// Write `data` as pretty JSON, creating parent directories. Returns the byte count.
pub fn save<T: Serialize>(path: &Path, data: &T) -> Result<usize> {
    let json = serde_json::to_string_pretty(data)?;
    let persist = |source| Error::Persist {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(persist)?;
    }
    fs::write(path, &json).map_err(persist)?;
    info!(path = %path.display(), bytes = json.len(), "saved");
    Ok(json.len())
}

pub fn save_index(path: &Path, index: &TeacherIndex) -> Result<usize> {
    save(path, index)
}

pub fn load_index(path: &Path) -> Result<TeacherIndex> {
    let unreadable = |reason: String| Error::IndexUnreadable {
        path: path.to_path_buf(),
        reason,
    };
    let json = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    serde_json::from_str(&json).map_err(|e| unreadable(e.to_string()))
}
