//! Workspace folder persistence.
//!
//! The folder chosen by the user is remembered in the settings store under
//! [`WORKSPACE_FOLDER_KEY`] and reconnected on the next launch if it still
//! exists. Every saved recording gets a `.metadata.json` sidecar.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use parking_lot::{Mutex, RwLock};

use capture_studio_core::models::artifact::{CompletedArtifact, RecordingMetadata};
use capture_studio_core::models::error::StudioError;
use capture_studio_core::storage::disk_store::write_atomic;
use capture_studio_core::storage::metadata::write_metadata;
use capture_studio_core::traits::chunk_buffer::{SettingValue, SettingsStore};
use capture_studio_core::traits::persistence::PersistenceSink;

pub const WORKSPACE_FOLDER_KEY: &str = "workspace_folder";

/// Primary persistence sink writing into a user-chosen local folder.
pub struct WorkspaceFolderSink {
    settings: Arc<dyn SettingsStore>,
    folder: RwLock<Option<PathBuf>>,
    last_saved: Mutex<Option<PathBuf>>,
}

impl WorkspaceFolderSink {
    /// Open the sink, resuming the folder remembered from a previous session.
    ///
    /// A remembered folder that no longer exists is forgotten.
    pub fn open(settings: Arc<dyn SettingsStore>) -> Result<Self, StudioError> {
        let folder = match settings.get_setting(WORKSPACE_FOLDER_KEY)? {
            Some(SettingValue::Path(path)) if path.is_dir() => {
                info!("WorkspaceFolder: resumed {}", path.display());
                Some(path)
            }
            Some(SettingValue::Path(path)) => {
                warn!("WorkspaceFolder: {} is gone, forgetting it", path.display());
                settings.remove_setting(WORKSPACE_FOLDER_KEY)?;
                None
            }
            Some(_) => {
                warn!("WorkspaceFolder: ignoring malformed {} setting", WORKSPACE_FOLDER_KEY);
                None
            }
            None => None,
        };
        Ok(Self {
            settings,
            folder: RwLock::new(folder),
            last_saved: Mutex::new(None),
        })
    }

    pub fn connect(&self, folder: impl Into<PathBuf>) -> Result<(), StudioError> {
        let folder = folder.into();
        if !folder.is_dir() {
            return Err(StudioError::ConfigurationFailed(format!(
                "{} is not a directory",
                folder.display()
            )));
        }
        self.settings
            .set_setting(WORKSPACE_FOLDER_KEY, &SettingValue::Path(folder.clone()))?;
        info!("WorkspaceFolder: connected {}", folder.display());
        *self.folder.write() = Some(folder);
        Ok(())
    }

    pub fn disconnect(&self) -> Result<(), StudioError> {
        self.settings.remove_setting(WORKSPACE_FOLDER_KEY)?;
        if let Some(folder) = self.folder.write().take() {
            info!("WorkspaceFolder: disconnected {}", folder.display());
        }
        Ok(())
    }

    pub fn folder(&self) -> Option<PathBuf> {
        self.folder.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.folder.read().is_some()
    }

    /// Path of the most recent recording written by this sink.
    pub fn last_saved(&self) -> Option<PathBuf> {
        self.last_saved.lock().clone()
    }

    fn write(&self, folder: &Path, artifact: &CompletedArtifact, file_name: &str) -> Result<PathBuf, StudioError> {
        if !folder.is_dir() {
            return Err(StudioError::PersistenceFailure(format!(
                "folder {} is no longer accessible",
                folder.display()
            )));
        }
        let path = folder.join(file_name);
        write_atomic(&path, &artifact.data).map_err(|e| StudioError::PersistenceFailure(e.to_string()))?;

        // The recording is already safe; a missing sidecar is not worth a fallback.
        if let Err(e) = write_metadata(&RecordingMetadata::for_artifact(artifact, file_name), &path) {
            warn!("WorkspaceFolder: metadata for {} not written: {}", file_name, e);
        }
        Ok(path)
    }
}

impl PersistenceSink for WorkspaceFolderSink {
    fn name(&self) -> String {
        self.folder
            .read()
            .as_ref()
            .and_then(|f| f.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace folder".to_string())
    }

    fn persist(&self, artifact: &CompletedArtifact, file_name: &str) -> Result<PathBuf, StudioError> {
        let folder = self
            .folder()
            .ok_or_else(|| StudioError::PersistenceFailure("no workspace folder connected".into()))?;
        let path = self.write(&folder, artifact, file_name)?;
        info!(
            "WorkspaceFolder: saved {} ({} bytes)",
            path.display(),
            artifact.size_bytes()
        );
        *self.last_saved.lock() = Some(path.clone());
        Ok(path)
    }
}
