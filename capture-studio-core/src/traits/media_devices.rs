use crate::models::error::StudioError;
use crate::models::source::DeviceInfo;
use crate::traits::media_track::MediaStream;

/// Cursor visibility requested from display capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorVisibility {
    Always,
    Motion,
    Never,
}

/// Display capture request.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConstraints {
    pub cursor: CursorVisibility,
    /// Frame-rate ceiling, not an exact rate.
    pub max_frame_rate: u32,
    pub audio: bool,
}

impl Default for DisplayConstraints {
    fn default() -> Self {
        Self {
            cursor: CursorVisibility::Always,
            max_frame_rate: 60,
            audio: false,
        }
    }
}

/// Camera capture request. Sizes are ideals, never exact requirements,
/// so that any camera can satisfy them. Video only.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConstraints {
    pub device_id: Option<String>,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub ideal_frame_rate: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            ideal_width: 1280,
            ideal_height: 720,
            ideal_frame_rate: 30,
        }
    }
}

/// Microphone capture request. Voice conditioning is on by default.
#[derive(Debug, Clone, PartialEq)]
pub struct MicrophoneConstraints {
    pub device_id: Option<String>,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for MicrophoneConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Platform capture primitives and device inventory.
///
/// Every call may block on a permission prompt; a denied or timed-out prompt
/// is reported as an error, never as an empty stream.
pub trait MediaDevices: Send + Sync {
    fn get_display_media(&self, constraints: &DisplayConstraints) -> Result<MediaStream, StudioError>;

    fn get_camera_media(&self, constraints: &CameraConstraints) -> Result<MediaStream, StudioError>;

    fn get_microphone_media(&self, constraints: &MicrophoneConstraints) -> Result<MediaStream, StudioError>;

    /// List capture devices. Labels may be empty before a permission grant.
    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, StudioError>;
}
