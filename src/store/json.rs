//! JSON persistence for catalogs, annotation maps and spectrum records.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::store::StoreError;

/// Serialize `value` as pretty-printed JSON to `path`, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    log::info!("Saved JSON to {:?}", path);
    Ok(())
}

/// Deserialize a JSON document from `path`.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let json = std::fs::read_to_string(path)?;
    let value = serde_json::from_str(&json)?;
    log::debug!("Loaded JSON from {:?}", path);
    Ok(value)
}
