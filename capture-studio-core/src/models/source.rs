use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three independent capture sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Screen,
    Camera,
    Microphone,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::Screen, SourceKind::Camera, SourceKind::Microphone];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screen => "screen",
            Self::Camera => "camera",
            Self::Microphone => "microphone",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a capture source.
///
/// ```text
/// inactive → active → inactive            (toggle)
///              ↓
///       ended-externally → active         (toggle re-acquires)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceState {
    Inactive,
    Active,
    EndedExternally,
}

impl SourceState {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Media kind of a single track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Live state of a track as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackReadyState {
    Live,
    Ended,
}

/// Negotiated settings of a track. Video fields are `None` for audio tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    pub device_id: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
}

/// Device category reported by enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    AudioInput,
    VideoInput,
    AudioOutput,
}

/// A device available for capture, as returned by the device inventory.
///
/// `label` is empty until the user granted access to at least one device of
/// the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceInfo {
    /// Label suitable for a picker. Falls back to a generic numbered name
    /// when the platform withheld the real label.
    pub fn display_label(&self, index: usize) -> String {
        if !self.label.trim().is_empty() {
            return self.label.clone();
        }
        let generic = match self.kind {
            DeviceKind::AudioInput => "Microphone",
            DeviceKind::VideoInput => "Camera",
            DeviceKind::AudioOutput => "Speaker",
        };
        format!("{} {}", generic, index + 1)
    }
}
