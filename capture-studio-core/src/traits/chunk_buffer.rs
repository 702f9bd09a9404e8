use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::error::StudioError;

/// One encoded media slice and its position in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRecord {
    pub sequence: u64,
    pub data: Vec<u8>,
}

/// Append-only, crash-safe store for in-flight encoded chunks.
///
/// `append` returns only after the chunk is durable. `read_all` returns
/// chunks in append order. `clear` is called only after a successful handoff.
pub trait ChunkBuffer: Send + Sync {
    fn append(&self, chunk: &[u8]) -> Result<(), StudioError>;

    fn read_all(&self) -> Result<Vec<ChunkRecord>, StudioError>;

    fn clear(&self) -> Result<(), StudioError>;

    fn len(&self) -> Result<usize, StudioError>;

    /// Whether chunks from an unfinished session are waiting.
    fn has_unsaved_data(&self) -> Result<bool, StudioError> {
        Ok(self.len()? > 0)
    }
}

/// A stored setting. Binary payloads and resource handles are kept natively,
/// not squeezed through text.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Json(serde_json::Value),
    Binary(Vec<u8>),
    /// A handle to a local resource, such as the workspace folder.
    Path(PathBuf),
}

/// Generic keyed storage for cross-session state.
pub trait SettingsStore: Send + Sync {
    fn set_setting(&self, key: &str, value: &SettingValue) -> Result<(), StudioError>;

    fn get_setting(&self, key: &str) -> Result<Option<SettingValue>, StudioError>;

    fn remove_setting(&self, key: &str) -> Result<(), StudioError>;
}

/// Store a serializable value as a JSON setting.
pub fn set_json<T: Serialize>(store: &dyn SettingsStore, key: &str, value: &T) -> Result<(), StudioError> {
    let json = serde_json::to_value(value)
        .map_err(|e| StudioError::Storage(format!("failed to serialize setting {}: {}", key, e)))?;
    store.set_setting(key, &SettingValue::Json(json))
}

/// Load a JSON setting. Non-JSON values under `key` read as absent.
pub fn get_json<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Result<Option<T>, StudioError> {
    match store.get_setting(key)? {
        Some(SettingValue::Json(json)) => serde_json::from_value(json)
            .map(Some)
            .map_err(|e| StudioError::Storage(format!("failed to parse setting {}: {}", key, e))),
        _ => Ok(None),
    }
}
