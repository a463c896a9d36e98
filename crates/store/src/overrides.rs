//! Exact-description override map.
//!
//! Every correction pins its normalised description to the corrected
//! label; a later prediction for the same normalised text answers from
//! this map before consulting the model. Persisted as a single JSON
//! object, rewritten atomically on every change.

use std::collections::HashMap;
use std::path::Path;

use digero_core::CategoryLabel;

use crate::artifacts::StoreError;

/// Load the override map. A missing file is an empty map; an unreadable
/// one is treated the same (the log of corrections remains the source of
/// truth, so nothing is lost beyond the shortcut).
pub async fn load_overrides(path: &Path) -> Result<HashMap<String, CategoryLabel>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_slice(&bytes).unwrap_or_default())
}

/// Rewrite the override map with the same write-then-rename discipline
/// the artifact store uses.
pub async fn save_overrides(
    path: &Path,
    overrides: &HashMap<String, CategoryLabel>,
) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = serde_json::to_vec_pretty(overrides)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_override_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        let mut overrides = HashMap::new();
        overrides.insert("grocery mart".to_string(), CategoryLabel::new("Groceries"));
        save_overrides(&path, &overrides).await.unwrap();

        let loaded = load_overrides(&path).await.unwrap();
        assert_eq!(loaded.get("grocery mart"), Some(&CategoryLabel::new("Groceries")));
    }

    #[tokio::test]
    async fn missing_file_is_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_overrides(&dir.path().join("overrides.json")).await.unwrap();
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn unparseable_file_degrades_to_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.json");
        tokio::fs::write(&path, b"][").await.unwrap();
        let loaded = load_overrides(&path).await.unwrap();
        assert!(loaded.is_empty());
    }
}
