use thiserror::Error;

use super::source::SourceKind;

/// Errors that can occur anywhere in the capture pipeline.
///
/// Acquisition failures are recoverable (the source just stays inactive),
/// format and start failures are fatal to one start attempt, and
/// persistence failures are reported after the download fallback ran.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StudioError {
    #[error("could not acquire {kind}: {reason}")]
    Acquisition { kind: SourceKind, reason: String },

    #[error("permission denied for {0}")]
    PermissionDenied(SourceKind),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("no supported container/codec")]
    UnsupportedFormat,

    #[error("encoding fault: {0}")]
    EncodingFault(String),

    #[error("persistence failed: {0}")]
    PersistenceFailure(String),

    #[error("{0} ended unexpectedly")]
    UnexpectedSourceTermination(SourceKind),

    #[error("enable screen or camera first")]
    NoActiveSource,

    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("settings are locked while recording")]
    SettingsLocked,

    #[error("{0} chunks from a previous session have not been saved")]
    UnflushedChunks(usize),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl StudioError {
    pub fn acquisition(kind: SourceKind, reason: impl Into<String>) -> Self {
        Self::Acquisition {
            kind,
            reason: reason.into(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// The source this error is attributed to, if any.
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self {
            Self::Acquisition { kind, .. } => Some(*kind),
            Self::PermissionDenied(kind) | Self::UnexpectedSourceTermination(kind) => Some(*kind),
            _ => None,
        }
    }
}
