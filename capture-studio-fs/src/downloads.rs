//! Download fallback: writes the artifact into the user's downloads folder.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use capture_studio_core::models::artifact::CompletedArtifact;
use capture_studio_core::models::error::StudioError;
use capture_studio_core::storage::disk_store::write_atomic;
use capture_studio_core::traits::persistence::PersistenceSink;

/// Fallback sink. Never overwrites: a taken name becomes `name (1).ext`.
#[derive(Debug, Clone)]
pub struct DownloadSink {
    dir: PathBuf,
}

impl DownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Sink for the platform downloads directory.
    pub fn user_downloads() -> Result<Self, StudioError> {
        dirs_next::download_dir()
            .map(Self::new)
            .ok_or_else(|| StudioError::ConfigurationFailed("no downloads directory on this platform".into()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn unique_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let (stem, ext) = match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (file_name, None),
        };
        (1u32..)
            .map(|n| match ext {
                Some(ext) => self.dir.join(format!("{} ({}).{}", stem, n, ext)),
                None => self.dir.join(format!("{} ({})", stem, n)),
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

impl PersistenceSink for DownloadSink {
    fn name(&self) -> String {
        "downloads".to_string()
    }

    fn persist(&self, artifact: &CompletedArtifact, file_name: &str) -> Result<PathBuf, StudioError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            StudioError::PersistenceFailure(format!("cannot create {}: {}", self.dir.display(), e))
        })?;
        let path = self.unique_path(file_name);
        write_atomic(&path, &artifact.data).map_err(|e| StudioError::PersistenceFailure(e.to_string()))?;
        info!("Downloads: wrote {} ({} bytes)", path.display(), artifact.size_bytes());
        Ok(path)
    }
}
