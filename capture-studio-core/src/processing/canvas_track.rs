use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::compositor::SharedSurface;
use crate::models::source::{TrackKind, TrackReadyState, TrackSettings};
use crate::traits::media_track::{MediaTrack, TrackEndedCallback, VideoFrame};

/// Video track that captures the compositor surface at a fixed frame rate.
///
/// Read-only view: the compositor remains the only writer of the surface.
pub struct CanvasCaptureTrack {
    id: String,
    surface: SharedSurface,
    frame_rate: u32,
    stopped: AtomicBool,
    on_ended: Mutex<Option<TrackEndedCallback>>,
}

impl CanvasCaptureTrack {
    pub fn new(surface: SharedSurface, frame_rate: u32) -> Self {
        Self {
            id: format!("canvas-{}", uuid::Uuid::new_v4()),
            surface,
            frame_rate,
            stopped: AtomicBool::new(false),
            on_ended: Mutex::new(None),
        }
    }
}

impl MediaTrack for CanvasCaptureTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        TrackKind::Video
    }

    fn label(&self) -> String {
        "Composite".to_string()
    }

    fn settings(&self) -> TrackSettings {
        let (width, height) = self.surface.read().dimensions();
        TrackSettings {
            device_id: None,
            width: Some(width),
            height: Some(height),
            frame_rate: Some(self.frame_rate as f64),
        }
    }

    fn ready_state(&self) -> TrackReadyState {
        if self.stopped.load(Ordering::Acquire) {
            TrackReadyState::Ended
        } else {
            TrackReadyState::Live
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn set_on_ended(&self, callback: TrackEndedCallback) {
        // The surface never ends on its own; kept for the trait contract.
        *self.on_ended.lock() = Some(callback);
    }

    fn current_frame(&self) -> Option<Arc<VideoFrame>> {
        if self.stopped.load(Ordering::Acquire) {
            return None;
        }
        let frame = self.surface.read().clone();
        if frame.width() == 0 || frame.height() == 0 {
            return None;
        }
        Some(frame)
    }
}
