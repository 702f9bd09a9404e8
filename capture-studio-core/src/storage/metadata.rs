use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::artifact::RecordingMetadata;
use crate::models::error::StudioError;

use super::disk_store::write_atomic;

/// Sidecar location for a recording: `{recording_path}.metadata.json`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    let mut name = recording_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".metadata.json");
    recording_path.with_file_name(name)
}

/// Write recording metadata as a JSON sidecar next to the recording.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, StudioError> {
    let path = metadata_path(recording_path);
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| StudioError::storage(format!("failed to serialize metadata: {}", e)))?;
    write_atomic(&path, &json)?;
    Ok(path)
}

/// Read recording metadata from its JSON sidecar.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, StudioError> {
    let path = metadata_path(recording_path);
    let json = fs::read(&path).map_err(|e| StudioError::storage(format!("failed to read metadata: {}", e)))?;
    serde_json::from_slice(&json).map_err(|e| StudioError::storage(format!("failed to parse metadata: {}", e)))
}
