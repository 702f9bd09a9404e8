use std::path::PathBuf;

use crate::models::artifact::CompletedArtifact;
use crate::models::error::StudioError;

/// External collaborator that writes a finished recording somewhere durable.
pub trait PersistenceSink: Send + Sync {
    /// Human-readable destination name, e.g. the workspace folder's name.
    fn name(&self) -> String;

    /// Write `artifact` as `file_name`, returning where it landed.
    fn persist(&self, artifact: &CompletedArtifact, file_name: &str) -> Result<PathBuf, StudioError>;
}

/// Asks the user for a file name before the artifact is written.
pub trait FilenamePrompt: Send + Sync {
    /// Returns the edited name, or `None` to keep the suggestion.
    fn request_file_name(&self, suggested: &str) -> Option<String>;
}
