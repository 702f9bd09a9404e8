use super::error::StudioError;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → initializing → recording ⇄ paused
///                           ↓         ↓
///                         processing → ready
///
/// any → error ──reset──→ idle
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingStatus {
    Idle,
    Initializing,
    Recording,
    Paused,
    Processing,
    Ready,
    Error(StudioError),
}

impl RecordingStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Recording or paused: sources and styling are locked.
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Processing => "processing",
            Self::Ready => "ready",
            Self::Error(_) => "error",
        }
    }
}

impl Default for RecordingStatus {
    fn default() -> Self {
        Self::Idle
    }
}
