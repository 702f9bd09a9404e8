use std::fmt;
use std::sync::Arc;

use image::RgbaImage;

use crate::models::source::{TrackKind, TrackReadyState, TrackSettings};

/// Decoded video frame as delivered by a track.
pub type VideoFrame = RgbaImage;

/// Callback fired when a track ends outside of our control
/// (e.g. the user stopped screen sharing from the system UI).
pub type TrackEndedCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// A live media track handle owned by the platform.
///
/// Implemented by platform backends and by the compositor's canvas capture.
/// `stop()` releases the underlying device and does not fire the ended callback.
pub trait MediaTrack: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> TrackKind;

    fn label(&self) -> String;

    /// Negotiated settings (device id, resolution, frame rate).
    fn settings(&self) -> TrackSettings;

    fn ready_state(&self) -> TrackReadyState;

    /// Stop the track and release the device.
    fn stop(&self);

    /// Register the callback fired on external termination. Replaces any previous one.
    fn set_on_ended(&self, callback: TrackEndedCallback);

    /// Most recent frame of a video track, `None` for audio tracks or until
    /// the first frame arrived.
    fn current_frame(&self) -> Option<Arc<VideoFrame>>;
}

/// An ordered set of tracks acquired together.
#[derive(Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks_of(TrackKind::Audio)
    }

    pub fn first_video_track(&self) -> Option<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .find(|t| t.kind() == TrackKind::Video)
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Whether at least one track is still live.
    pub fn is_live(&self) -> bool {
        self.tracks
            .iter()
            .any(|t| t.ready_state() == TrackReadyState::Live)
    }

    /// Stop every track in the stream.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    fn tracks_of(&self, kind: TrackKind) -> Vec<Arc<dyn MediaTrack>> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracks: Vec<_> = self
            .tracks
            .iter()
            .map(|t| format!("{:?}:{}", t.kind(), t.id()))
            .collect();
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &tracks)
            .finish()
    }
}
