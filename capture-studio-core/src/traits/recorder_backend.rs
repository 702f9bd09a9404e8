use std::sync::mpsc;
use std::time::Duration;

use crate::models::error::StudioError;
use crate::traits::media_track::MediaStream;

/// Events emitted by a running recorder, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    /// One encoded slice of the container.
    DataAvailable(Vec<u8>),
    /// The encoder failed mid-stream.
    Error(String),
    /// Final event after `stop()`; no data follows.
    Stopped,
}

pub type RecorderEventSender = mpsc::Sender<RecorderEvent>;

/// Encoder options negotiated before creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderOptions {
    pub mime_type: String,
    pub video_bits_per_second: u32,
    pub audio_bits_per_second: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Inactive,
    Recording,
    Paused,
}

/// The platform recording primitive.
pub trait RecorderBackend: Send + Sync {
    /// Whether the runtime can produce this container/codec combination.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Create an encoder over `stream`. Events go to `events` until `Stopped`.
    fn create(
        &self,
        stream: MediaStream,
        options: &RecorderOptions,
        events: RecorderEventSender,
    ) -> Result<Box<dyn RecorderHandle>, StudioError>;
}

/// A single encoder instance.
pub trait RecorderHandle: Send {
    /// Begin encoding, emitting a `DataAvailable` slice every `timeslice`.
    fn start(&mut self, timeslice: Duration) -> Result<(), StudioError>;

    fn pause(&mut self) -> Result<(), StudioError>;

    fn resume(&mut self) -> Result<(), StudioError>;

    /// Finalize: flush the last slice, then emit `Stopped`.
    fn stop(&mut self) -> Result<(), StudioError>;

    fn state(&self) -> RecorderState;
}
