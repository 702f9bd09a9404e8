use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::models::error::StudioError;
use crate::models::source::{DeviceInfo, DeviceKind, SourceKind, SourceState};
use crate::traits::media_devices::{CameraConstraints, DisplayConstraints, MediaDevices, MicrophoneConstraints};
use crate::traits::media_track::{MediaStream, MediaTrack, VideoFrame};

/// Per-call acquisition parameters overriding the manager's defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireParams {
    Display(DisplayConstraints),
    Camera(CameraConstraints),
    Microphone(MicrophoneConstraints),
}

impl AcquireParams {
    fn kind(&self) -> SourceKind {
        match self {
            Self::Display(_) => SourceKind::Screen,
            Self::Camera(_) => SourceKind::Camera,
            Self::Microphone(_) => SourceKind::Microphone,
        }
    }
}

/// Posted from track-ended callbacks, which may run on any thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    Ended { kind: SourceKind, stream_id: String },
}

struct SourceSlot {
    state: SourceState,
    stream: Option<MediaStream>,
}

impl SourceSlot {
    fn inactive() -> Self {
        Self {
            state: SourceState::Inactive,
            stream: None,
        }
    }
}

/// Source Acquisition Layer: owns screen, camera and microphone tracks.
///
/// Each source is toggled independently. Acquisition failures leave the
/// source inactive and are returned to the caller. A source that ends outside
/// our control is reported through [`SourceManager::process_events`].
pub struct SourceManager<D: MediaDevices> {
    devices: Arc<D>,
    screen: SourceSlot,
    camera: SourceSlot,
    microphone: SourceSlot,
    display_constraints: DisplayConstraints,
    selected_camera: Option<String>,
    selected_microphone: Option<String>,
    events_tx: Sender<SourceEvent>,
    events_rx: Receiver<SourceEvent>,
}

impl<D: MediaDevices> SourceManager<D> {
    pub fn new(devices: Arc<D>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            devices,
            screen: SourceSlot::inactive(),
            camera: SourceSlot::inactive(),
            microphone: SourceSlot::inactive(),
            display_constraints: DisplayConstraints::default(),
            selected_camera: None,
            selected_microphone: None,
            events_tx,
            events_rx,
        }
    }

    pub fn set_display_constraints(&mut self, constraints: DisplayConstraints) {
        self.display_constraints = constraints;
    }

    pub fn state(&self, kind: SourceKind) -> SourceState {
        self.slot(kind).state
    }

    pub fn is_active(&self, kind: SourceKind) -> bool {
        self.state(kind).is_active()
    }

    pub fn stream(&self, kind: SourceKind) -> Option<&MediaStream> {
        self.slot(kind).stream.as_ref()
    }

    pub fn selected_microphone(&self) -> Option<&str> {
        self.selected_microphone.as_deref()
    }

    pub fn selected_camera(&self) -> Option<&str> {
        self.selected_camera.as_deref()
    }

    /// Activate an inactive source or deactivate an active one.
    pub fn toggle(&mut self, kind: SourceKind) -> Result<SourceState, StudioError> {
        self.toggle_with(kind, None)
    }

    pub fn toggle_with(&mut self, kind: SourceKind, params: Option<AcquireParams>) -> Result<SourceState, StudioError> {
        if self.is_active(kind) {
            self.deactivate(kind);
        } else {
            self.activate(kind, params)?;
        }
        Ok(self.state(kind))
    }

    /// Stop a source's tracks and mark it inactive. No-op when inactive.
    pub fn deactivate(&mut self, kind: SourceKind) {
        let slot = self.slot_mut(kind);
        if let Some(stream) = slot.stream.take() {
            stream.stop_all();
            info!("SourceManager: {} stopped", kind);
        }
        slot.state = SourceState::Inactive;
    }

    pub fn stop_all(&mut self) {
        for kind in SourceKind::ALL {
            self.deactivate(kind);
        }
    }

    /// Switch the microphone. An active microphone is re-acquired on the new
    /// device, after the old device's track has been released.
    pub fn select_microphone(&mut self, device_id: Option<String>) -> Result<SourceState, StudioError> {
        self.selected_microphone = device_id;
        self.reacquire(SourceKind::Microphone)
    }

    /// Switch the camera, re-acquiring it if active.
    pub fn select_camera(&mut self, device_id: Option<String>) -> Result<SourceState, StudioError> {
        self.selected_camera = device_id;
        self.reacquire(SourceKind::Camera)
    }

    /// Apply pending track-ended notifications. Returns the sources that ended.
    pub fn process_events(&mut self) -> Vec<SourceKind> {
        let mut ended = Vec::new();
        while let Ok(SourceEvent::Ended { kind, stream_id }) = self.events_rx.try_recv() {
            let slot = self.slot_mut(kind);
            let current = slot.stream.as_ref().map(|s| s.id() == stream_id).unwrap_or(false);
            if !current || !slot.state.is_active() {
                debug!("SourceManager: ignoring stale end of {} stream {}", kind, stream_id);
                continue;
            }
            if let Some(stream) = slot.stream.take() {
                stream.stop_all();
            }
            slot.state = SourceState::EndedExternally;
            warn!("SourceManager: {} ended externally", kind);
            if !ended.contains(&kind) {
                ended.push(kind);
            }
        }
        ended
    }

    /// Device inventory with generic labels filled in where the platform
    /// withheld them.
    pub fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, StudioError> {
        let devices = self.devices.enumerate_devices()?;
        let mut counts = [0usize; 3];
        Ok(devices
            .into_iter()
            .map(|device| {
                let slot = match device.kind {
                    DeviceKind::AudioInput => 0,
                    DeviceKind::VideoInput => 1,
                    DeviceKind::AudioOutput => 2,
                };
                let label = device.display_label(counts[slot]);
                counts[slot] += 1;
                DeviceInfo { label, ..device }
            })
            .collect())
    }

    /// Native size of the shared screen, if any.
    pub fn screen_native_resolution(&self) -> Option<(u32, u32)> {
        let track = self.video_track(SourceKind::Screen)?;
        let settings = track.settings();
        match (settings.width, settings.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    pub fn video_track(&self, kind: SourceKind) -> Option<Arc<dyn MediaTrack>> {
        if !self.is_active(kind) {
            return None;
        }
        self.stream(kind)?.first_video_track()
    }

    pub fn current_frame(&self, kind: SourceKind) -> Option<Arc<VideoFrame>> {
        self.video_track(kind)?.current_frame()
    }

    /// Audio track for recording, chosen among already-open tracks: the
    /// selected microphone's track when found, else the first microphone
    /// track, else any other open audio track.
    pub fn resolve_audio_track(&self) -> Option<Arc<dyn MediaTrack>> {
        let mut candidates: Vec<Arc<dyn MediaTrack>> = Vec::new();
        for kind in [SourceKind::Microphone, SourceKind::Screen, SourceKind::Camera] {
            if let (true, Some(stream)) = (self.is_active(kind), self.stream(kind)) {
                candidates.extend(stream.audio_tracks());
            }
        }
        if let Some(selected) = self.selected_microphone.as_deref() {
            let matched = candidates
                .iter()
                .find(|t| t.settings().device_id.as_deref() == Some(selected))
                .cloned();
            if matched.is_some() {
                return matched;
            }
            debug!("SourceManager: selected microphone {} not open, using default track", selected);
        }
        candidates.into_iter().next()
    }

    fn reacquire(&mut self, kind: SourceKind) -> Result<SourceState, StudioError> {
        if self.is_active(kind) {
            // Release first so two handles to the same class of device never coexist.
            self.deactivate(kind);
            self.activate(kind, None)?;
        }
        Ok(self.state(kind))
    }

    fn activate(&mut self, kind: SourceKind, params: Option<AcquireParams>) -> Result<(), StudioError> {
        let params = match params {
            Some(p) if p.kind() != kind => {
                return Err(StudioError::InvalidState(format!(
                    "{:?} parameters given for {}",
                    p.kind(),
                    kind
                )))
            }
            Some(p) => p,
            None => self.default_params(kind),
        };

        let result = match &params {
            AcquireParams::Display(c) => self.devices.get_display_media(c),
            AcquireParams::Camera(c) => self.devices.get_camera_media(c),
            AcquireParams::Microphone(c) => self.devices.get_microphone_media(c),
        };
        let stream = match result {
            Ok(stream) if stream.is_empty() => {
                return Err(StudioError::acquisition(kind, "no tracks were returned"));
            }
            Ok(stream) => stream,
            Err(e) => {
                warn!("SourceManager: failed to acquire {}: {}", kind, e);
                return Err(e);
            }
        };

        for track in stream.tracks() {
            let tx = self.events_tx.clone();
            let stream_id = stream.id().to_string();
            track.set_on_ended(Arc::new(move || {
                let _ = tx.send(SourceEvent::Ended {
                    kind,
                    stream_id: stream_id.clone(),
                });
            }));
        }

        info!("SourceManager: {} active ({:?})", kind, stream);
        let slot = self.slot_mut(kind);
        slot.stream = Some(stream);
        slot.state = SourceState::Active;
        Ok(())
    }

    fn default_params(&self, kind: SourceKind) -> AcquireParams {
        match kind {
            SourceKind::Screen => AcquireParams::Display(self.display_constraints.clone()),
            SourceKind::Camera => AcquireParams::Camera(CameraConstraints {
                device_id: self.selected_camera.clone(),
                ..Default::default()
            }),
            SourceKind::Microphone => AcquireParams::Microphone(MicrophoneConstraints {
                device_id: self.selected_microphone.clone(),
                ..Default::default()
            }),
        }
    }

    fn slot(&self, kind: SourceKind) -> &SourceSlot {
        match kind {
            SourceKind::Screen => &self.screen,
            SourceKind::Camera => &self.camera,
            SourceKind::Microphone => &self.microphone,
        }
    }

    fn slot_mut(&mut self, kind: SourceKind) -> &mut SourceSlot {
        match kind {
            SourceKind::Screen => &mut self.screen,
            SourceKind::Camera => &mut self.camera,
            SourceKind::Microphone => &mut self.microphone,
        }
    }
}

impl<D: MediaDevices> Drop for SourceManager<D> {
    fn drop(&mut self) {
        self.stop_all();
    }
}
