//! # capture-studio-core
//!
//! Platform-agnostic capture pipeline for a screen/webcam recording studio.
//!
//! Acquires screen, camera and microphone sources, composites them onto an
//! offscreen surface when styling requires it, records the result through a
//! platform encoder, buffers every encoded slice durably, and hands the
//! finished artifact to persistence. Platform backends implement
//! `MediaDevices` and `RecorderBackend` and plug into the generic `Studio`.
//!
//! ## Architecture
//!
//! ```text
//! capture-studio-core (this crate)
//! ├── traits/       ← MediaTrack, MediaDevices, RecorderBackend, ChunkBuffer, PersistenceSink, StudioDelegate
//! ├── models/       ← StudioError, RecordingStatus, StudioConfiguration, presets, composition, artifacts
//! ├── processing/   ← Compositor, capture mode selection, heartbeat clock, bubble geometry
//! ├── session/      ← Studio (orchestrator), SourceManager, RecordingController, CompletionHandoff
//! └── storage/      ← DiskStore (durable chunk buffer + settings), metadata sidecars
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::artifact::{CompletedArtifact, HandoffOutcome, RecordingMetadata};
pub use models::composition::{CompositionSettings, WebcamShape};
pub use models::config::StudioConfiguration;
pub use models::error::StudioError;
pub use models::notification::{Notification, NotificationLevel};
pub use models::presets::{ExportFormat, QualityId};
pub use models::source::{DeviceInfo, DeviceKind, SourceKind, SourceState};
pub use models::state::RecordingStatus;
pub use processing::compositor::Compositor;
pub use processing::mode_selector::CaptureMode;
pub use session::handoff::{CompletionHandoff, HandoffReport};
pub use session::recorder::RecordingController;
pub use session::sources::SourceManager;
pub use session::studio::{PumpOutcome, Studio, StudioServices};
pub use storage::disk_store::DiskStore;
pub use traits::chunk_buffer::{ChunkBuffer, ChunkRecord, SettingValue, SettingsStore};
pub use traits::media_devices::MediaDevices;
pub use traits::media_track::{MediaStream, MediaTrack, VideoFrame};
pub use traits::persistence::{FilenamePrompt, PersistenceSink};
pub use traits::recorder_backend::{RecorderBackend, RecorderHandle};
pub use traits::studio_delegate::StudioDelegate;
