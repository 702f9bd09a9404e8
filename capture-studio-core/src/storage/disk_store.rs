use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::models::error::StudioError;
use crate::traits::chunk_buffer::{ChunkBuffer, ChunkRecord, SettingValue, SettingsStore};

const CHUNK_DIR: &str = "chunks";
const SETTINGS_DIR: &str = "settings";
const CHUNK_EXT: &str = "chunk";

/// File-backed durable chunk buffer and settings store.
///
/// ## Layout
///
/// ```text
/// {root}/
/// ├── chunks/00000000000000000000.chunk   ← one file per encoded slice
/// └── settings/{key}.json | {key}.bin     ← structured or binary settings
/// ```
///
/// Every write goes to a temporary file that is synced and renamed into
/// place, so a crash leaves either the old file or the complete new one.
pub struct DiskStore {
    root: PathBuf,
    next_sequence: Mutex<u64>,
}

/// On-disk form of non-binary settings.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
enum StoredSetting {
    Json(serde_json::Value),
    Path(PathBuf),
}

impl DiskStore {
    /// Open (or create) a store at `root`, resuming the chunk sequence
    /// after any chunks left by a previous process.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StudioError> {
        let root = root.into();
        for dir in [CHUNK_DIR, SETTINGS_DIR] {
            fs::create_dir_all(root.join(dir))
                .map_err(|e| StudioError::storage(format!("failed to create {}: {}", dir, e)))?;
        }
        let store = Self {
            root,
            next_sequence: Mutex::new(0),
        };
        let existing = store.chunk_files()?;
        if let Some((last, _)) = existing.last() {
            *store.next_sequence.lock() = last + 1;
            info!(
                "DiskStore: found {} unsaved chunks in {}",
                existing.len(),
                store.root.display()
            );
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chunk_dir(&self) -> PathBuf {
        self.root.join(CHUNK_DIR)
    }

    fn setting_path(&self, key: &str, ext: &str) -> Result<PathBuf, StudioError> {
        if key.is_empty() {
            return Err(StudioError::storage("setting key must not be empty"));
        }
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        Ok(self.root.join(SETTINGS_DIR).join(format!("{}.{}", name, ext)))
    }

    /// Chunk files sorted by sequence. Temporary and foreign files are skipped.
    fn chunk_files(&self) -> Result<Vec<(u64, PathBuf)>, StudioError> {
        let entries = fs::read_dir(self.chunk_dir())
            .map_err(|e| StudioError::storage(format!("failed to list chunks: {}", e)))?;
        let mut chunks = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StudioError::storage(format!("failed to list chunks: {}", e)))?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some(CHUNK_EXT) {
                continue;
            }
            let sequence = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            match sequence {
                Some(sequence) => chunks.push((sequence, path)),
                None => warn!("DiskStore: ignoring unexpected file {}", path.display()),
            }
        }
        chunks.sort_by_key(|(sequence, _)| *sequence);
        Ok(chunks)
    }
}

impl ChunkBuffer for DiskStore {
    fn append(&self, chunk: &[u8]) -> Result<(), StudioError> {
        // Holding the lock across the write keeps appends in call order.
        let mut next = self.next_sequence.lock();
        let path = self.chunk_dir().join(format!("{:020}.{}", *next, CHUNK_EXT));
        write_atomic(&path, chunk)?;
        debug!("DiskStore: chunk {} durable ({} bytes)", *next, chunk.len());
        *next += 1;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<ChunkRecord>, StudioError> {
        let _guard = self.next_sequence.lock();
        self.chunk_files()?
            .into_iter()
            .map(|(sequence, path)| {
                fs::read(&path)
                    .map(|data| ChunkRecord { sequence, data })
                    .map_err(|e| StudioError::storage(format!("failed to read chunk {}: {}", sequence, e)))
            })
            .collect()
    }

    fn clear(&self) -> Result<(), StudioError> {
        let mut next = self.next_sequence.lock();
        let chunks = self.chunk_files()?;
        let count = chunks.len();
        for (sequence, path) in chunks {
            fs::remove_file(&path)
                .map_err(|e| StudioError::storage(format!("failed to remove chunk {}: {}", sequence, e)))?;
        }
        sync_dir(&self.chunk_dir());
        *next = 0;
        debug!("DiskStore: cleared {} chunks", count);
        Ok(())
    }

    fn len(&self) -> Result<usize, StudioError> {
        Ok(self.chunk_files()?.len())
    }
}

impl SettingsStore for DiskStore {
    fn set_setting(&self, key: &str, value: &SettingValue) -> Result<(), StudioError> {
        let (bytes, path, stale) = match value {
            SettingValue::Binary(bytes) => (bytes.clone(), self.setting_path(key, "bin")?, self.setting_path(key, "json")?),
            SettingValue::Json(json) => (
                encode_setting(key, &StoredSetting::Json(json.clone()))?,
                self.setting_path(key, "json")?,
                self.setting_path(key, "bin")?,
            ),
            SettingValue::Path(path) => (
                encode_setting(key, &StoredSetting::Path(path.clone()))?,
                self.setting_path(key, "json")?,
                self.setting_path(key, "bin")?,
            ),
        };
        write_atomic(&path, &bytes)?;
        remove_if_exists(&stale)?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> Result<Option<SettingValue>, StudioError> {
        let bin = self.setting_path(key, "bin")?;
        if bin.exists() {
            let bytes = fs::read(&bin).map_err(|e| StudioError::storage(format!("failed to read setting {}: {}", key, e)))?;
            return Ok(Some(SettingValue::Binary(bytes)));
        }
        let json = self.setting_path(key, "json")?;
        if !json.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&json).map_err(|e| StudioError::storage(format!("failed to read setting {}: {}", key, e)))?;
        let stored: StoredSetting = serde_json::from_slice(&bytes)
            .map_err(|e| StudioError::storage(format!("failed to parse setting {}: {}", key, e)))?;
        Ok(Some(match stored {
            StoredSetting::Json(value) => SettingValue::Json(value),
            StoredSetting::Path(path) => SettingValue::Path(path),
        }))
    }

    fn remove_setting(&self, key: &str) -> Result<(), StudioError> {
        remove_if_exists(&self.setting_path(key, "bin")?)?;
        remove_if_exists(&self.setting_path(key, "json")?)
    }
}

fn encode_setting(key: &str, stored: &StoredSetting) -> Result<Vec<u8>, StudioError> {
    serde_json::to_vec(stored).map_err(|e| StudioError::storage(format!("failed to serialize setting {}: {}", key, e)))
}

fn remove_if_exists(path: &Path) -> Result<(), StudioError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StudioError::storage(format!("failed to remove {}: {}", path.display(), e))),
    }
}

/// Write `bytes` to `path` durably: temp file, fsync, rename, directory fsync.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StudioError> {
    let parent = path
        .parent()
        .ok_or_else(|| StudioError::storage(format!("no parent directory for {}", path.display())))?;
    fs::create_dir_all(parent).map_err(|e| StudioError::storage(format!("failed to create directory: {}", e)))?;

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let mut file = File::create(&tmp).map_err(|e| StudioError::storage(format!("failed to create file: {}", e)))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|e| StudioError::storage(format!("failed to write {}: {}", tmp.display(), e)))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|e| StudioError::storage(format!("failed to commit {}: {}", path.display(), e)))?;
    sync_dir(parent);
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        warn!("DiskStore: failed to sync {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
