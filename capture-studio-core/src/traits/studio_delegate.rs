use crate::models::artifact::{CompletedArtifact, HandoffOutcome};
use crate::models::notification::Notification;
use crate::models::source::{SourceKind, SourceState};
use crate::models::state::RecordingStatus;

/// Event delegate for studio notifications.
///
/// Status changes caused by encoder faults arrive on the chunk-writer thread;
/// everything else arrives on the thread that called into the studio.
/// Implementations should marshal to the UI thread if needed.
pub trait StudioDelegate: Send + Sync {
    fn on_status_changed(&self, status: &RecordingStatus);

    fn on_source_changed(&self, kind: SourceKind, state: SourceState);

    /// A discrete, dismissible message for the user.
    fn on_notification(&self, notification: &Notification);

    fn on_artifact_ready(&self, artifact: &CompletedArtifact, outcome: &HandoffOutcome);
}
