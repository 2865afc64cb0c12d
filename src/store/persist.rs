//! Durable storage of the endpoint map.
//!
//! The file is a JSON object of name → config, pretty printed with two-space
//! indentation. Every write replaces the whole file: the map is written to a
//! sibling temp file which is then renamed over the target.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::store::endpoint::{validate_name, EndpointDraft, Snapshot};
use crate::store::StoreError;

/// Read the persisted map. `Ok(None)` when the file does not exist.
///
/// Entries written before `method` existed are migrated to GET. Entries that
/// no longer pass validation are skipped with a warning rather than failing
/// the whole load.
pub fn read_snapshot(path: &Path) -> Result<Option<Snapshot>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Storage(e)),
    };

    let raw: BTreeMap<String, EndpointDraft> = serde_json::from_str(&content)?;

    let mut snapshot = Snapshot::new();
    for (name, draft) in raw {
        match validate_name(&name).and_then(|_| draft.validate()) {
            Ok(config) => {
                snapshot.insert(name, config);
            }
            Err(e) => {
                tracing::warn!(endpoint = %name, error = %e, "Skipping invalid persisted endpoint");
            }
        }
    }

    Ok(Some(snapshot))
}

/// Replace the persisted file with `snapshot`.
pub fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let content = serde_json::to_string_pretty(snapshot)?;
    let tmp = temp_path(path);

    fs::write(&tmp, content)?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::Storage(e));
    }

    tracing::debug!(path = %path.display(), endpoints = snapshot.len(), "Saved endpoint configurations");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "endpoints.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}
