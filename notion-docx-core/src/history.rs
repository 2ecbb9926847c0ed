//! Bounded most-recently-used histories persisted as small JSON files
//! (previously used filters, previously used database ids).

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Only the most recent entries are kept on save.
pub const HISTORY_LIMIT: usize = 3;

/// Read a history file. A missing or unparseable file is an empty history,
/// never an error.
pub fn load_history<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(e) => {
            warn!(
                error = ?e,
                path = %path.display(),
                "History file is not valid JSON, starting with an empty history"
            );
            Vec::new()
        }
    }
}

/// Write the history back, truncated to the [`HISTORY_LIMIT`] most recent
/// entries in their original relative order.
pub fn save_history<T: Serialize>(items: &[T], path: &Path) -> std::io::Result<()> {
    let start = items.len().saturating_sub(HISTORY_LIMIT);
    let bounded = &items[start..];
    let json = serde_json::to_string_pretty(bounded)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)?;
    debug!(count = bounded.len(), path = %path.display(), "Saved history");
    Ok(())
}

/// Append an entry unless it is already present. Returns whether the
/// history changed.
pub fn remember<T: PartialEq>(history: &mut Vec<T>, entry: T) -> bool {
    if history.contains(&entry) {
        return false;
    }
    history.push(entry);
    true
}
