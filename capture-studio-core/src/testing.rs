//! In-crate fakes for the platform seams.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use parking_lot::Mutex;

use crate::models::artifact::{CompletedArtifact, HandoffOutcome};
use crate::models::error::StudioError;
use crate::models::notification::Notification;
use crate::models::source::{DeviceInfo, DeviceKind, SourceKind, SourceState, TrackKind, TrackReadyState, TrackSettings};
use crate::models::state::RecordingStatus;
use crate::traits::media_devices::{CameraConstraints, DisplayConstraints, MediaDevices, MicrophoneConstraints};
use crate::traits::media_track::{MediaStream, MediaTrack, TrackEndedCallback, VideoFrame};
use crate::traits::persistence::{FilenamePrompt, PersistenceSink};
use crate::traits::recorder_backend::{
    RecorderBackend, RecorderEvent, RecorderEventSender, RecorderHandle, RecorderOptions, RecorderState,
};
use crate::traits::studio_delegate::StudioDelegate;

pub struct FakeTrack {
    id: String,
    kind: TrackKind,
    settings: TrackSettings,
    ended: AtomicBool,
    stop_calls: AtomicUsize,
    on_ended: Mutex<Option<TrackEndedCallback>>,
    frame: Option<Arc<VideoFrame>>,
}

impl FakeTrack {
    pub fn video(id: &str, width: u32, height: u32, color: [u8; 3]) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind: TrackKind::Video,
            settings: TrackSettings {
                device_id: Some(format!("{}-device", id)),
                width: Some(width),
                height: Some(height),
                frame_rate: Some(30.0),
            },
            ended: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
            on_ended: Mutex::new(None),
            frame: Some(Arc::new(RgbaImage::from_pixel(
                width,
                height,
                Rgba([color[0], color[1], color[2], 255]),
            ))),
        })
    }

    pub fn audio(id: &str, device_id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            kind: TrackKind::Audio,
            settings: TrackSettings {
                device_id: Some(device_id.to_string()),
                ..Default::default()
            },
            ended: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
            on_ended: Mutex::new(None),
            frame: None,
        })
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_calls.load(Ordering::SeqCst) > 0
    }

    /// Simulate the platform ending the track (e.g. "Stop sharing").
    pub fn trigger_ended(&self) {
        self.ended.store(true, Ordering::SeqCst);
        let callback = self.on_ended.lock().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl MediaTrack for FakeTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn label(&self) -> String {
        format!("fake {}", self.id)
    }

    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn ready_state(&self) -> TrackReadyState {
        if self.ended.load(Ordering::SeqCst) {
            TrackReadyState::Ended
        } else {
            TrackReadyState::Live
        }
    }

    fn stop(&self) {
        self.ended.store(true, Ordering::SeqCst);
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn set_on_ended(&self, callback: TrackEndedCallback) {
        *self.on_ended.lock() = Some(callback);
    }

    fn current_frame(&self) -> Option<Arc<VideoFrame>> {
        self.frame.clone()
    }
}

/// Scriptable device layer. Records every track it hands out.
pub struct FakeDevices {
    pub screen_size: (u32, u32),
    pub devices: Vec<DeviceInfo>,
    failures: Mutex<HashMap<SourceKind, StudioError>>,
    issued: Mutex<Vec<(SourceKind, Arc<FakeTrack>)>>,
    counter: AtomicUsize,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        Self::with_screen(1920, 1080)
    }

    pub fn with_screen(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            screen_size: (width, height),
            devices: vec![
                DeviceInfo {
                    device_id: "mic-a".into(),
                    label: String::new(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceInfo {
                    device_id: "mic-b".into(),
                    label: "Studio Mic".into(),
                    kind: DeviceKind::AudioInput,
                },
                DeviceInfo {
                    device_id: "cam-a".into(),
                    label: String::new(),
                    kind: DeviceKind::VideoInput,
                },
            ],
            failures: Mutex::new(HashMap::new()),
            issued: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        })
    }

    pub fn fail_next(&self, kind: SourceKind, err: StudioError) {
        self.failures.lock().insert(kind, err);
    }

    pub fn issued(&self, kind: SourceKind) -> Vec<Arc<FakeTrack>> {
        self.issued
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn last(&self, kind: SourceKind) -> Option<Arc<FakeTrack>> {
        self.issued(kind).pop()
    }

    /// Tracks handed out and never stopped or ended.
    pub fn live_tracks(&self) -> usize {
        self.issued
            .lock()
            .iter()
            .filter(|(_, t)| t.ready_state() == TrackReadyState::Live)
            .count()
    }

    fn issue(&self, kind: SourceKind, track: Arc<FakeTrack>) -> Result<MediaStream, StudioError> {
        if let Some(err) = self.failures.lock().remove(&kind) {
            return Err(err);
        }
        self.issued.lock().push((kind, track.clone()));
        let track: Arc<dyn MediaTrack> = track;
        Ok(MediaStream::new(vec![track]))
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

impl MediaDevices for FakeDevices {
    fn get_display_media(&self, _constraints: &DisplayConstraints) -> Result<MediaStream, StudioError> {
        let (w, h) = self.screen_size;
        self.issue(SourceKind::Screen, FakeTrack::video(&self.next_id("screen"), w, h, [200, 0, 0]))
    }

    fn get_camera_media(&self, _constraints: &CameraConstraints) -> Result<MediaStream, StudioError> {
        self.issue(SourceKind::Camera, FakeTrack::video(&self.next_id("camera"), 640, 480, [0, 200, 0]))
    }

    fn get_microphone_media(&self, constraints: &MicrophoneConstraints) -> Result<MediaStream, StudioError> {
        let device = constraints.device_id.clone().unwrap_or_else(|| "mic-a".to_string());
        self.issue(SourceKind::Microphone, FakeTrack::audio(&self.next_id("mic"), &device))
    }

    fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, StudioError> {
        Ok(self.devices.clone())
    }
}

/// Recorder whose output the test scripts through [`FakeRecorderBackend::emit`].
pub struct FakeRecorderBackend {
    supported: Vec<String>,
    pub created: Mutex<Vec<RecorderOptions>>,
    pub timeslices: Arc<Mutex<Vec<Duration>>>,
    /// Id of the video track each recorder was created over.
    pub video_track_ids: Mutex<Vec<String>>,
    sender: Mutex<Option<RecorderEventSender>>,
    state: Arc<Mutex<RecorderState>>,
    final_chunk: Mutex<Option<Vec<u8>>>,
}

impl FakeRecorderBackend {
    pub fn supporting(mimes: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            supported: mimes.iter().map(|m| m.to_string()).collect(),
            created: Mutex::new(Vec::new()),
            timeslices: Arc::new(Mutex::new(Vec::new())),
            video_track_ids: Mutex::new(Vec::new()),
            sender: Mutex::new(None),
            state: Arc::new(Mutex::new(RecorderState::Inactive)),
            final_chunk: Mutex::new(None),
        })
    }

    pub fn webm() -> Arc<Self> {
        Self::supporting(&["video/webm;codecs=vp9,opus", "video/webm"])
    }

    pub fn emit(&self, data: &[u8]) {
        self.send(RecorderEvent::DataAvailable(data.to_vec()));
    }

    pub fn fault(&self, reason: &str) {
        self.send(RecorderEvent::Error(reason.to_string()));
    }

    /// Bytes flushed as the last slice when the recorder stops.
    pub fn set_final_chunk(&self, data: &[u8]) {
        *self.final_chunk.lock() = Some(data.to_vec());
    }

    pub fn recorder_state(&self) -> RecorderState {
        *self.state.lock()
    }

    fn send(&self, event: RecorderEvent) {
        if let Some(sender) = self.sender.lock().as_ref() {
            let _ = sender.send(event);
        }
    }
}

impl RecorderBackend for FakeRecorderBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|m| m == mime_type)
    }

    fn create(
        &self,
        stream: MediaStream,
        options: &RecorderOptions,
        events: RecorderEventSender,
    ) -> Result<Box<dyn RecorderHandle>, StudioError> {
        let Some(video) = stream.first_video_track() else {
            return Err(StudioError::EncodingFault("stream has no video track".into()));
        };
        self.video_track_ids.lock().push(video.id().to_string());
        self.created.lock().push(options.clone());
        *self.sender.lock() = Some(events.clone());
        *self.state.lock() = RecorderState::Inactive;
        Ok(Box::new(FakeRecorderHandle {
            events,
            state: self.state.clone(),
            timeslices: self.timeslices.clone(),
            final_chunk: self.final_chunk.lock().take(),
        }))
    }
}

struct FakeRecorderHandle {
    events: RecorderEventSender,
    state: Arc<Mutex<RecorderState>>,
    timeslices: Arc<Mutex<Vec<Duration>>>,
    final_chunk: Option<Vec<u8>>,
}

impl RecorderHandle for FakeRecorderHandle {
    fn start(&mut self, timeslice: Duration) -> Result<(), StudioError> {
        self.timeslices.lock().push(timeslice);
        *self.state.lock() = RecorderState::Recording;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), StudioError> {
        *self.state.lock() = RecorderState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), StudioError> {
        *self.state.lock() = RecorderState::Recording;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), StudioError> {
        if let Some(data) = self.final_chunk.take() {
            let _ = self.events.send(RecorderEvent::DataAvailable(data));
        }
        let _ = self.events.send(RecorderEvent::Stopped);
        *self.state.lock() = RecorderState::Inactive;
        Ok(())
    }

    fn state(&self) -> RecorderState {
        *self.state.lock()
    }
}

/// Sink that keeps what it was given.
pub struct MemorySink {
    name: String,
    pub saved: Mutex<Vec<(String, CompletedArtifact)>>,
    fail: AtomicBool,
}

impl MemorySink {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            saved: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        let sink = Self::new(name);
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    pub fn count(&self) -> usize {
        self.saved.lock().len()
    }

    pub fn last(&self) -> Option<(String, CompletedArtifact)> {
        self.saved.lock().last().cloned()
    }
}

impl PersistenceSink for MemorySink {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn persist(&self, artifact: &CompletedArtifact, file_name: &str) -> Result<PathBuf, StudioError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StudioError::PersistenceFailure(format!("{} is not writable", self.name)));
        }
        self.saved.lock().push((file_name.to_string(), artifact.clone()));
        Ok(PathBuf::from(&self.name).join(file_name))
    }
}

pub struct FixedPrompt(pub Option<String>);

impl FilenamePrompt for FixedPrompt {
    fn request_file_name(&self, _suggested: &str) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct RecordingDelegate {
    pub statuses: Mutex<Vec<RecordingStatus>>,
    pub sources: Mutex<Vec<(SourceKind, SourceState)>>,
    pub notifications: Mutex<Vec<Notification>>,
    pub artifacts: Mutex<Vec<(CompletedArtifact, HandoffOutcome)>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn status_names(&self) -> Vec<&'static str> {
        self.statuses.lock().iter().map(|s| s.name()).collect()
    }

    pub fn notification_titles(&self) -> Vec<String> {
        self.notifications.lock().iter().map(|n| n.title.clone()).collect()
    }
}

impl StudioDelegate for RecordingDelegate {
    fn on_status_changed(&self, status: &RecordingStatus) {
        self.statuses.lock().push(status.clone());
    }

    fn on_source_changed(&self, kind: SourceKind, state: SourceState) {
        self.sources.lock().push((kind, state));
    }

    fn on_notification(&self, notification: &Notification) {
        self.notifications.lock().push(notification.clone());
    }

    fn on_artifact_ready(&self, artifact: &CompletedArtifact, outcome: &HandoffOutcome) {
        self.artifacts.lock().push((artifact.clone(), outcome.clone()));
    }
}
