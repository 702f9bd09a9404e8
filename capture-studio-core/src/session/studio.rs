use std::sync::Arc;

use kurbo::{Point, Rect, Size};
use log::{debug, info, warn};

use super::handoff::{CompletionHandoff, HandoffReport};
use super::recorder::{RecordingController, StartRequest};
use super::sources::{AcquireParams, SourceManager};
use crate::models::artifact::HandoffOutcome;
use crate::models::composition::{CompositionSettings, WebcamShape};
use crate::models::config::StudioConfiguration;
use crate::models::error::StudioError;
use crate::models::notification::Notification;
use crate::models::presets::{background_preset, export_format, supported_formats, ExportFormat, QualityId};
use crate::models::source::{DeviceInfo, SourceKind, SourceState};
use crate::models::state::RecordingStatus;
use crate::processing::compositor::{CompositeFrame, Compositor};
use crate::processing::drag::BubbleDrag;
use crate::processing::geometry::{bubble_size, clamp_bubble};
use crate::processing::heartbeat::Heartbeat;
use crate::processing::mode_selector::{select_capture_mode, target_resolution, CaptureMode, ModeInputs};
use crate::storage::disk_store::DiskStore;
use crate::traits::chunk_buffer::{ChunkBuffer, SettingsStore};
use crate::traits::media_devices::{DisplayConstraints, MediaDevices};
use crate::traits::media_track::{MediaStream, VideoFrame};
use crate::traits::persistence::{FilenamePrompt, PersistenceSink};
use crate::traits::recorder_backend::RecorderBackend;
use crate::traits::studio_delegate::StudioDelegate;

/// Injected collaborators of a [`Studio`].
pub struct StudioServices {
    pub buffer: Arc<dyn ChunkBuffer>,
    pub settings: Arc<dyn SettingsStore>,
    /// Download path used when no folder is connected or saving to it fails.
    pub fallback_sink: Arc<dyn PersistenceSink>,
    /// Connected workspace folder, if any.
    pub primary_sink: Option<Arc<dyn PersistenceSink>>,
    pub prompt: Option<Arc<dyn FilenamePrompt>>,
}

/// What one [`Studio::pump`] call did.
#[derive(Debug, Default)]
pub struct PumpOutcome {
    pub frames_rendered: usize,
    /// Sources that ended outside our control since the last pump.
    pub ended: Vec<SourceKind>,
    /// Set when an ended source stopped an active recording.
    pub handoff: Option<HandoffReport>,
    /// Set instead of `handoff` when that stop failed.
    pub error: Option<StudioError>,
}

/// The capture pipeline: sources → compositor (when needed) → recorder →
/// durable buffer → handoff.
///
/// Owned by one thread, which drives rendering and source events through
/// [`Studio::pump`]. The heartbeat clock runs only while a frame actually
/// needs to be drawn.
pub struct Studio<D: MediaDevices, R: RecorderBackend> {
    config: StudioConfiguration,
    sources: SourceManager<D>,
    compositor: Compositor,
    composition: CompositionSettings,
    drag: BubbleDrag,
    heartbeat: Heartbeat,
    recorder: RecordingController<R>,
    handoff: Arc<CompletionHandoff>,
    canvas_stream: Option<MediaStream>,
    recording_mode: Option<CaptureMode>,
    delegate: Option<Arc<dyn StudioDelegate>>,
}

impl<D: MediaDevices, R: RecorderBackend> Studio<D, R> {
    pub fn new(
        config: StudioConfiguration,
        devices: Arc<D>,
        backend: Arc<R>,
        services: StudioServices,
    ) -> Result<Self, StudioError> {
        config.validate().map_err(StudioError::ConfigurationFailed)?;

        let mut handoff = CompletionHandoff::new(services.buffer, services.fallback_sink);
        if let Some(prompt) = services.prompt {
            handoff = handoff.with_prompt(prompt);
        }
        handoff.set_primary(services.primary_sink);
        let handoff = Arc::new(handoff);

        let mut sources = SourceManager::new(devices);
        sources.set_display_constraints(DisplayConstraints {
            max_frame_rate: config.max_capture_frame_rate,
            ..Default::default()
        });

        let heartbeat = Heartbeat::spawn(config.frame_rate)?;
        let recorder = RecordingController::new(backend, handoff.clone(), services.settings);

        info!(
            "Studio: ready (quality {:?}, {} fps, {:?} slices)",
            config.quality, config.frame_rate, config.timeslice
        );
        Ok(Self {
            config,
            sources,
            compositor: Compositor::new(),
            composition: CompositionSettings::default(),
            drag: BubbleDrag::new(),
            heartbeat,
            recorder,
            handoff,
            canvas_stream: None,
            recording_mode: None,
            delegate: None,
        })
    }

    /// Build a studio whose chunk buffer and settings live in a [`DiskStore`]
    /// at the configured storage directory.
    pub fn with_disk_store(
        config: StudioConfiguration,
        devices: Arc<D>,
        backend: Arc<R>,
        fallback_sink: Arc<dyn PersistenceSink>,
    ) -> Result<Self, StudioError> {
        let store = Arc::new(DiskStore::open(&config.storage_directory)?);
        let services = StudioServices {
            buffer: store.clone(),
            settings: store,
            fallback_sink,
            primary_sink: None,
            prompt: None,
        };
        Self::new(config, devices, backend, services)
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn StudioDelegate>) {
        self.recorder.set_delegate(delegate.clone());
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &StudioConfiguration {
        &self.config
    }

    pub fn status(&self) -> RecordingStatus {
        self.recorder.status()
    }

    pub fn composition(&self) -> &CompositionSettings {
        &self.composition
    }

    pub fn source_state(&self, kind: SourceKind) -> SourceState {
        self.sources.state(kind)
    }

    pub fn chunk_count(&self) -> usize {
        self.recorder.chunk_count()
    }

    /// Mode the running recording was started in.
    pub fn recording_mode(&self) -> Option<CaptureMode> {
        self.recording_mode
    }

    pub fn is_clock_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    /// Size of the compositor's backing surface; `(0, 0)` until first used.
    pub fn surface_size(&self) -> (u32, u32) {
        self.compositor.size()
    }

    pub fn surface_resize_count(&self) -> u64 {
        self.compositor.resize_count()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.compositor.frames_rendered()
    }

    /// Latest composite frame, for the live preview.
    pub fn preview_frame(&self) -> Arc<VideoFrame> {
        self.compositor.snapshot()
    }

    /// Export formats the recorder backend can produce.
    pub fn supported_formats(&self) -> Vec<&'static ExportFormat> {
        let backend = self.recorder.backend();
        supported_formats(|mime| backend.is_type_supported(mime))
    }

    // --- sources ---

    pub fn toggle_source(&mut self, kind: SourceKind) -> Result<SourceState, StudioError> {
        self.toggle_source_with(kind, None)
    }

    /// Toggle with per-call constraints overriding the defaults.
    pub fn toggle_source_with(
        &mut self,
        kind: SourceKind,
        params: Option<AcquireParams>,
    ) -> Result<SourceState, StudioError> {
        self.ensure_unlocked()?;
        let result = self.sources.toggle_with(kind, params);
        self.after_source_change(kind, result)
    }

    pub fn select_microphone(&mut self, device_id: Option<String>) -> Result<SourceState, StudioError> {
        self.ensure_unlocked()?;
        let result = self.sources.select_microphone(device_id);
        self.after_source_change(SourceKind::Microphone, result)
    }

    pub fn select_camera(&mut self, device_id: Option<String>) -> Result<SourceState, StudioError> {
        self.ensure_unlocked()?;
        let result = self.sources.select_camera(device_id);
        self.after_source_change(SourceKind::Camera, result)
    }

    pub fn enumerate_devices(&self) -> Result<Vec<DeviceInfo>, StudioError> {
        self.sources.enumerate_devices()
    }

    fn after_source_change(
        &mut self,
        kind: SourceKind,
        result: Result<SourceState, StudioError>,
    ) -> Result<SourceState, StudioError> {
        let state = self.sources.state(kind);
        if let Some(delegate) = &self.delegate {
            delegate.on_source_changed(kind, state);
        }
        // A new screen can shrink the target surface under the bubble.
        self.reclamp_bubble();
        self.refresh_clock();
        if let Err(ref e) = result {
            self.notify(Notification::from(e));
        }
        result
    }

    // --- styling ---

    pub fn set_webcam_shape(&mut self, shape: WebcamShape) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        self.composition.webcam_shape = shape;
        Ok(())
    }

    /// Set the bubble scale and pull the bubble back on-surface if it grew.
    pub fn set_webcam_scale(&mut self, scale: f64) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        ensure_finite("webcam scale", &[scale])?;
        self.composition.webcam_scale =
            scale.clamp(CompositionSettings::MIN_WEBCAM_SCALE, CompositionSettings::MAX_WEBCAM_SCALE);
        self.reclamp_bubble();
        Ok(())
    }

    pub fn set_webcam_position(&mut self, position: Point) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        ensure_finite("webcam position", &[position.x, position.y])?;
        self.composition.webcam_position = position;
        self.reclamp_bubble();
        Ok(())
    }

    pub fn set_background(&mut self, id: &str) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        if background_preset(id).is_none() {
            return Err(StudioError::ConfigurationFailed(format!("unknown background preset: {}", id)));
        }
        self.composition.background = id.to_string();
        self.refresh_clock();
        Ok(())
    }

    pub fn set_screen_scale(&mut self, scale: f64) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        ensure_finite("screen scale", &[scale])?;
        self.composition.screen_scale = scale.clamp(CompositionSettings::MIN_SCREEN_SCALE, 1.0);
        self.refresh_clock();
        Ok(())
    }

    pub fn set_quality(&mut self, quality: QualityId) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        self.config.quality = quality;
        self.reclamp_bubble();
        self.refresh_clock();
        Ok(())
    }

    pub fn set_preferred_format(&mut self, format_id: Option<String>) -> Result<(), StudioError> {
        self.ensure_unlocked()?;
        if let Some(ref id) = format_id {
            if export_format(id).is_none() {
                return Err(StudioError::ConfigurationFailed(format!("unknown export format: {}", id)));
            }
        }
        self.config.preferred_format = format_id;
        Ok(())
    }

    // --- bubble dragging ---

    /// Pointer pressed on the preview element occupying `display`.
    /// Returns whether a bubble drag started.
    pub fn pointer_down(&mut self, client: Point, display: Rect) -> bool {
        if self.is_locked() || !self.sources.is_active(SourceKind::Camera) {
            return false;
        }
        let surface = self.target_size();
        let pointer = BubbleDrag::to_surface(client, display, surface);
        self.drag.pointer_down(
            pointer,
            self.composition.webcam_position,
            self.composition.webcam_scale,
            surface,
        )
    }

    pub fn pointer_move(&mut self, client: Point, display: Rect) -> Option<Point> {
        if self.is_locked() {
            self.drag.pointer_up();
            return None;
        }
        let surface = self.target_size();
        let pointer = BubbleDrag::to_surface(client, display, surface);
        let position = self.drag.pointer_move(pointer, self.composition.webcam_scale, surface)?;
        self.composition.webcam_position = position;
        Some(position)
    }

    pub fn pointer_up(&mut self) {
        self.drag.pointer_up();
    }

    // --- composition ---

    /// Recomputed on every call from the current sources and styling.
    pub fn capture_mode(&self) -> CaptureMode {
        select_capture_mode(&ModeInputs::new(
            self.sources.is_active(SourceKind::Camera),
            &self.composition,
            self.config.quality,
            self.sources.screen_native_resolution(),
        ))
    }

    pub fn target_resolution(&self) -> (u32, u32) {
        target_resolution(self.config.quality, self.sources.screen_native_resolution())
    }

    /// Whether the compositor has anything to draw.
    pub fn needs_rendering(&self) -> bool {
        if self.capture_mode() != CaptureMode::Canvas {
            return false;
        }
        let any_source = SourceKind::ALL.iter().any(|k| self.sources.is_active(*k));
        any_source || self.composition.has_background()
    }

    /// Draw one composite frame if the composition needs one.
    pub fn render_frame(&mut self) -> bool {
        if !self.needs_rendering() {
            return false;
        }
        let (width, height) = self.target_resolution();
        self.compositor.resize(width, height);
        let screen = self.sources.current_frame(SourceKind::Screen);
        let camera = self.sources.current_frame(SourceKind::Camera);
        self.compositor.render(&CompositeFrame {
            screen: screen.as_deref(),
            camera: camera.as_deref(),
            settings: &self.composition,
        });
        true
    }

    /// Process source events and render once if the clock ticked.
    ///
    /// A source ending while recording stops the recording gracefully and
    /// hands off what was captured. A failed stop is reported in the outcome
    /// so the ended sources and the clock are still accounted for.
    pub fn pump(&mut self) -> PumpOutcome {
        let mut outcome = PumpOutcome {
            ended: self.sources.process_events(),
            ..Default::default()
        };

        for kind in outcome.ended.clone() {
            if let Some(delegate) = &self.delegate {
                delegate.on_source_changed(kind, SourceState::EndedExternally);
            }
            let err = StudioError::UnexpectedSourceTermination(kind);
            let stopping = outcome.handoff.is_none() && outcome.error.is_none();
            if self.recorder.has_active_recorder() && stopping {
                warn!("Studio: {} ended during recording, stopping", kind);
                self.notify(Notification::from(&err));
                match self.stop_recording() {
                    Ok(report) => outcome.handoff = Some(report),
                    Err(e) => {
                        warn!("Studio: stop after {} ended failed: {}", kind, e);
                        outcome.error = Some(e);
                    }
                }
            } else {
                info!("Studio: {}", err);
            }
        }
        if !outcome.ended.is_empty() {
            self.reclamp_bubble();
        }
        self.refresh_clock();

        if self.heartbeat.drain() > 0 && self.render_frame() {
            outcome.frames_rendered = 1;
        }
        outcome
    }

    // --- recording ---

    pub fn start_recording(&mut self) -> Result<(), StudioError> {
        if self.is_locked() {
            return Err(StudioError::AlreadyRecording);
        }
        let screen = self.sources.is_active(SourceKind::Screen);
        let camera = self.sources.is_active(SourceKind::Camera);
        if !screen && !camera {
            let err = StudioError::NoActiveSource;
            self.notify(Notification::from(&err));
            return Err(err);
        }

        let mode = self.capture_mode();
        let video_track = match mode {
            CaptureMode::Canvas => {
                // The first frame must exist before the encoder samples the surface.
                self.render_frame();
                let stream = self.compositor.capture_stream(self.config.frame_rate);
                let track = stream.first_video_track();
                self.canvas_stream = Some(stream);
                track
            }
            CaptureMode::Direct => self.sources.video_track(SourceKind::Screen),
        };
        let Some(video_track) = video_track else {
            self.release_canvas_stream();
            return Err(StudioError::NoActiveSource);
        };

        let request = StartRequest {
            video_track,
            audio_track: self.sources.resolve_audio_track(),
            preferred_mime_type: self.config.preferred_mime_type().map(str::to_string),
            video_bitrate: self.config.effective_video_bitrate(),
            audio_bitrate: self.config.audio_bitrate,
            timeslice: self.config.timeslice,
        };
        match self.recorder.start(request) {
            Ok(()) => {
                info!("Studio: recording in {:?} mode", mode);
                self.recording_mode = Some(mode);
                self.refresh_clock();
                Ok(())
            }
            Err(e) => {
                self.release_canvas_stream();
                self.notify(Notification::from(&e));
                Err(e)
            }
        }
    }

    pub fn pause_recording(&mut self) -> Result<(), StudioError> {
        self.recorder.pause()
    }

    pub fn resume_recording(&mut self) -> Result<(), StudioError> {
        self.recorder.resume()
    }

    pub fn stop_recording(&mut self) -> Result<HandoffReport, StudioError> {
        let result = self.recorder.stop();
        self.release_canvas_stream();
        self.recording_mode = None;
        self.refresh_clock();
        match &result {
            Ok(report) => self.notify_outcome(&report.outcome),
            Err(e) => self.notify(Notification::from(e)),
        }
        result
    }

    /// Full teardown: discard the session, release every source, restore
    /// default styling and stop the clock.
    pub fn reset(&mut self) -> Result<(), StudioError> {
        let result = self.recorder.reset();
        self.release_canvas_stream();
        self.recording_mode = None;
        for kind in SourceKind::ALL {
            let was = self.sources.state(kind);
            self.sources.deactivate(kind);
            if was != SourceState::Inactive {
                if let Some(delegate) = &self.delegate {
                    delegate.on_source_changed(kind, SourceState::Inactive);
                }
            }
        }
        self.composition = CompositionSettings::default();
        self.drag = BubbleDrag::new();
        self.heartbeat.stop();
        info!("Studio: reset");
        result
    }

    // --- persistence ---

    pub fn set_primary_sink(&mut self, sink: Option<Arc<dyn PersistenceSink>>) {
        self.handoff.set_primary(sink);
    }

    pub fn has_unsaved_data(&self) -> Result<bool, StudioError> {
        self.handoff.buffer().has_unsaved_data()
    }

    /// Hand off chunks left by a previous session that never finished.
    pub fn recover_unsaved(&mut self) -> Result<HandoffReport, StudioError> {
        let result = self.recorder.recover_unsaved();
        match &result {
            Ok(report) => self.notify_outcome(&report.outcome),
            Err(e) => self.notify(Notification::from(e)),
        }
        result
    }

    pub fn discard_unsaved(&mut self) -> Result<(), StudioError> {
        self.recorder.discard_unsaved()
    }

    // --- internals ---

    /// Styling and sources are frozen while a recorder is live, including
    /// one that faulted and is waiting for `stop`.
    fn is_locked(&self) -> bool {
        self.status().is_capturing() || self.recorder.has_active_recorder()
    }

    fn ensure_unlocked(&self) -> Result<(), StudioError> {
        if self.is_locked() {
            return Err(StudioError::SettingsLocked);
        }
        Ok(())
    }

    fn target_size(&self) -> Size {
        let (w, h) = self.target_resolution();
        Size::new(w as f64, h as f64)
    }

    fn reclamp_bubble(&mut self) {
        let surface = self.target_size();
        let size = bubble_size(surface, self.composition.webcam_scale);
        self.composition.webcam_position = clamp_bubble(self.composition.webcam_position, size, surface);
    }

    /// Run the clock exactly while there is something to draw.
    fn refresh_clock(&mut self) {
        if self.needs_rendering() {
            self.heartbeat.set_fps(self.config.frame_rate);
            self.heartbeat.start();
        } else if self.heartbeat.is_running() {
            self.heartbeat.stop();
        }
    }

    fn release_canvas_stream(&mut self) {
        if let Some(stream) = self.canvas_stream.take() {
            stream.stop_all();
        }
    }

    fn notify_outcome(&self, outcome: &HandoffOutcome) {
        let notification = match outcome {
            HandoffOutcome::Saved { location, file_name } => Notification::success(
                "Recording saved",
                format!("{} saved to {}", file_name, location.display()),
            ),
            HandoffOutcome::Downloaded {
                reason: Some(_), ..
            } => Notification::error("Direct save failed", "Download triggered as fallback"),
            HandoffOutcome::Downloaded { location, .. } => {
                Notification::info("Recording downloaded", format!("Saved to {}", location.display()))
            }
            HandoffOutcome::Skipped => Notification::info("Nothing recorded", "No data was captured"),
        };
        self.notify(notification);
    }

    fn notify(&self, notification: Notification) {
        debug!("Studio: notify {:?}: {}", notification.level, notification.title);
        if let Some(delegate) = &self.delegate {
            delegate.on_notification(&notification);
        }
    }
}

fn ensure_finite(what: &str, values: &[f64]) -> Result<(), StudioError> {
    if values.iter().all(|v| v.is_finite()) {
        return Ok(());
    }
    Err(StudioError::ConfigurationFailed(format!("{} must be finite", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDevices, FakeRecorderBackend, MemorySink, RecordingDelegate};
    use crate::traits::media_track::MediaTrack;
    use std::time::Duration;

    struct Rig {
        _dir: tempfile::TempDir,
        devices: Arc<FakeDevices>,
        backend: Arc<FakeRecorderBackend>,
        downloads: Arc<MemorySink>,
        delegate: Arc<RecordingDelegate>,
        studio: Studio<FakeDevices, FakeRecorderBackend>,
    }

    fn rig_with(config: StudioConfiguration, devices: Arc<FakeDevices>) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let backend = FakeRecorderBackend::webm();
        let downloads = MemorySink::new("downloads");
        let delegate = RecordingDelegate::new();
        let config = StudioConfiguration {
            storage_directory: dir.path().to_path_buf(),
            frame_rate: 120,
            ..config
        };
        let mut studio = Studio::with_disk_store(config, devices.clone(), backend.clone(), downloads.clone()).unwrap();
        studio.set_delegate(delegate.clone());
        Rig {
            _dir: dir,
            devices,
            backend,
            downloads,
            delegate,
            studio,
        }
    }

    fn rig() -> Rig {
        rig_with(StudioConfiguration::default(), FakeDevices::new())
    }

    #[test]
    fn start_without_video_source_is_refused() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Microphone).unwrap();
        assert_eq!(r.studio.start_recording(), Err(StudioError::NoActiveSource));
        assert!(r.studio.status().is_idle());
        assert!(r.delegate.notification_titles().contains(&"Recording error".to_string()));
    }

    #[test]
    fn screen_only_native_records_directly_without_a_surface() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.toggle_source(SourceKind::Microphone).unwrap();
        assert_eq!(r.studio.capture_mode(), CaptureMode::Direct);
        assert!(!r.studio.is_clock_running());

        r.studio.start_recording().unwrap();
        assert_eq!(r.studio.recording_mode(), Some(CaptureMode::Direct));
        let screen_track = r.devices.last(SourceKind::Screen).unwrap();
        assert_eq!(r.backend.video_track_ids.lock()[0], screen_track.id());

        for chunk in [b"one".as_slice(), b"two", b"three"] {
            r.backend.emit(chunk);
        }
        let report = r.studio.stop_recording().unwrap();
        let artifact = report.artifact.unwrap();
        assert_eq!(artifact.mime_type, "video/webm;codecs=vp9,opus");
        assert!(artifact.file_name.ends_with(".webm"));
        assert_eq!(artifact.chunk_count, 3);
        assert_eq!(&artifact.data[..], b"onetwothree");
        assert_eq!(r.downloads.count(), 1);

        assert_eq!(r.studio.surface_size(), (0, 0));
        assert_eq!(r.studio.surface_resize_count(), 0);
        assert_eq!(r.studio.frames_rendered(), 0);
    }

    #[test]
    fn styled_session_records_the_composite_in_one_artifact() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.toggle_source(SourceKind::Camera).unwrap();
        r.studio.set_background("midnight").unwrap();
        assert_eq!(r.studio.capture_mode(), CaptureMode::Canvas);
        assert!(r.studio.is_clock_running());

        r.studio.start_recording().unwrap();
        assert_eq!(r.studio.recording_mode(), Some(CaptureMode::Canvas));
        assert!(r.backend.video_track_ids.lock()[0].starts_with("canvas-"));
        assert!(r.studio.frames_rendered() >= 1);

        r.backend.emit(b"a");
        r.studio.pause_recording().unwrap();
        assert!(r.studio.status().is_paused());
        r.studio.resume_recording().unwrap();
        r.backend.emit(b"b");
        let report = r.studio.stop_recording().unwrap();

        assert_eq!(&report.artifact.unwrap().data[..], b"ab");
        assert_eq!(r.downloads.count(), 1);
        assert_eq!(r.delegate.artifacts.lock().len(), 1);
        assert_eq!(r.studio.status(), RecordingStatus::Ready);
    }

    #[test]
    fn quality_preset_sets_the_canvas_size() {
        let mut r = rig();
        r.studio.set_quality(QualityId::P1080).unwrap();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.toggle_source(SourceKind::Camera).unwrap();
        assert!(r.studio.render_frame());
        assert_eq!(r.studio.surface_size(), (1920, 1080));
        assert_eq!(r.studio.preview_frame().dimensions(), (1920, 1080));
    }

    #[test]
    fn quality_mismatch_alone_forces_canvas() {
        let mut r = rig_with(StudioConfiguration::default(), FakeDevices::with_screen(2560, 1440));
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        assert_eq!(r.studio.capture_mode(), CaptureMode::Direct);
        r.studio.set_quality(QualityId::P720).unwrap();
        assert_eq!(r.studio.capture_mode(), CaptureMode::Canvas);
        assert_eq!(r.studio.target_resolution(), (1280, 720));
    }

    #[test]
    fn idle_compositor_does_not_tick() {
        let mut r = rig();
        assert!(!r.studio.needs_rendering());
        assert!(!r.studio.render_frame());
        r.studio.set_background("aurora").unwrap();
        assert!(r.studio.needs_rendering());
        assert!(r.studio.is_clock_running());
        r.studio.set_background("none").unwrap();
        assert!(!r.studio.is_clock_running());
    }

    #[test]
    fn pump_renders_on_clock_ticks() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Camera).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while r.studio.frames_rendered() == 0 {
            assert!(std::time::Instant::now() < deadline, "no frame rendered");
            r.studio.pump();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(r.studio.surface_size(), (1280, 720));
    }

    #[test]
    fn styling_and_sources_are_locked_while_recording() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.start_recording().unwrap();
        assert_eq!(r.studio.set_background("sunset"), Err(StudioError::SettingsLocked));
        assert_eq!(r.studio.set_screen_scale(0.8), Err(StudioError::SettingsLocked));
        assert_eq!(r.studio.toggle_source(SourceKind::Screen), Err(StudioError::SettingsLocked));
        assert!(r.studio.source_state(SourceKind::Screen).is_active());
        assert_eq!(r.studio.start_recording(), Err(StudioError::AlreadyRecording));
        r.studio.stop_recording().unwrap();
        r.studio.set_background("sunset").unwrap();
    }

    #[test]
    fn screen_share_ending_mid_recording_stops_gracefully() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.start_recording().unwrap();
        r.backend.emit(b"captured");
        r.devices.last(SourceKind::Screen).unwrap().trigger_ended();

        let outcome = r.studio.pump();
        assert_eq!(outcome.ended, vec![SourceKind::Screen]);
        assert!(outcome.error.is_none());
        let report = outcome.handoff.unwrap();
        assert_eq!(&report.artifact.unwrap().data[..], b"captured");
        assert_eq!(r.studio.status(), RecordingStatus::Ready);
        assert_eq!(r.studio.source_state(SourceKind::Screen), SourceState::EndedExternally);
        assert!(r.delegate.notification_titles().contains(&"Screen stopped".to_string()));
    }

    #[test]
    fn acquisition_failure_is_notified_and_leaves_source_off() {
        let mut r = rig();
        r.devices
            .fail_next(SourceKind::Camera, StudioError::acquisition(SourceKind::Camera, "device busy"));
        assert!(r.studio.toggle_source(SourceKind::Camera).is_err());
        assert_eq!(r.studio.source_state(SourceKind::Camera), SourceState::Inactive);
        assert!(r
            .delegate
            .notification_titles()
            .contains(&"Could not acquire camera".to_string()));
    }

    #[test]
    fn toggle_with_mismatched_constraints_is_refused() {
        let mut r = rig();
        let params = AcquireParams::Display(DisplayConstraints::default());
        let err = r.studio.toggle_source_with(SourceKind::Camera, Some(params)).unwrap_err();
        assert!(matches!(err, StudioError::InvalidState(_)));
        assert_eq!(r.studio.source_state(SourceKind::Camera), SourceState::Inactive);
    }

    #[test]
    fn reset_tears_everything_down() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.toggle_source(SourceKind::Camera).unwrap();
        r.studio.set_webcam_shape(WebcamShape::Square).unwrap();
        r.studio.set_screen_scale(0.7).unwrap();
        r.studio.start_recording().unwrap();
        r.backend.emit(b"discarded");

        r.studio.reset().unwrap();
        assert!(r.studio.status().is_idle());
        assert_eq!(r.devices.live_tracks(), 0);
        assert_eq!(r.studio.composition(), &CompositionSettings::default());
        assert!(!r.studio.is_clock_running());
        assert!(!r.studio.has_unsaved_data().unwrap());
        assert_eq!(r.downloads.count(), 0);
    }

    #[test]
    fn growing_the_bubble_keeps_it_on_canvas() {
        let mut r = rig();
        r.studio.set_webcam_position(Point::new(1200.0, 700.0)).unwrap();
        r.studio.set_webcam_scale(0.9).unwrap();
        let p = r.studio.composition().webcam_position;
        let size = 720.0 * 0.9;
        assert!(p.x + size <= 1280.0 && p.y + size <= 720.0);
        assert!(p.x >= 0.0 && p.y >= 0.0);
    }

    #[test]
    fn dragging_the_bubble_moves_it() {
        let mut r = rig();
        r.studio.toggle_source(SourceKind::Camera).unwrap();
        // Preview shown at half size.
        let display = Rect::new(0.0, 0.0, 640.0, 360.0);
        assert!(r.studio.pointer_down(Point::new(20.0, 215.0), display));
        let moved = r.studio.pointer_move(Point::new(120.0, 115.0), display).unwrap();
        assert_eq!(moved, Point::new(220.0, 210.0));
        r.studio.pointer_up();
        assert_eq!(r.studio.composition().webcam_position, Point::new(220.0, 210.0));
        assert!(r.studio.pointer_move(Point::new(0.0, 0.0), display).is_none());
    }

    #[test]
    fn folder_save_failure_falls_back_and_notifies() {
        let mut r = rig();
        r.studio.set_primary_sink(Some(MemorySink::failing("Videos")));
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.start_recording().unwrap();
        r.backend.emit(b"x");
        let report = r.studio.stop_recording().unwrap();
        assert!(matches!(report.outcome, HandoffOutcome::Downloaded { reason: Some(_), .. }));
        assert!(r
            .delegate
            .notification_titles()
            .contains(&"Direct save failed".to_string()));
    }

    #[test]
    fn unsaved_chunks_can_be_recovered_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = DiskStore::open(dir.path()).unwrap();
            store.append(b"from-").unwrap();
            store.append(b"crash").unwrap();
        }
        let config = StudioConfiguration {
            storage_directory: dir.path().to_path_buf(),
            ..Default::default()
        };
        let downloads = MemorySink::new("downloads");
        let mut studio = Studio::with_disk_store(
            config,
            FakeDevices::new(),
            FakeRecorderBackend::webm(),
            downloads.clone(),
        )
        .unwrap();
        assert!(studio.has_unsaved_data().unwrap());
        studio.toggle_source(SourceKind::Screen).unwrap();
        assert_eq!(studio.start_recording(), Err(StudioError::UnflushedChunks(2)));

        let report = studio.recover_unsaved().unwrap();
        assert_eq!(&report.artifact.unwrap().data[..], b"from-crash");
        assert!(!studio.has_unsaved_data().unwrap());
        studio.start_recording().unwrap();
        studio.stop_recording().unwrap();
    }

    #[test]
    fn lists_only_supported_formats() {
        let r = rig();
        let ids: Vec<_> = r.studio.supported_formats().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["webm-vp9"]);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = StudioConfiguration {
            frame_rate: 0,
            storage_directory: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = Studio::with_disk_store(
            config,
            FakeDevices::new(),
            FakeRecorderBackend::webm(),
            MemorySink::new("downloads"),
        );
        assert!(matches!(result, Err(StudioError::ConfigurationFailed(_))));
    }

    #[test]
    fn smaller_screen_pulls_the_bubble_back_on_canvas() {
        let mut r = rig_with(StudioConfiguration::default(), FakeDevices::with_screen(800, 600));
        r.studio.set_webcam_position(Point::new(950.0, 400.0)).unwrap();
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        assert_eq!(r.studio.target_resolution(), (800, 600));

        let p = r.studio.composition().webcam_position;
        let size = bubble_size(Size::new(800.0, 600.0), r.studio.composition().webcam_scale);
        assert!(p.x >= 0.0 && p.y >= 0.0);
        assert!(p.x + size <= 800.0 && p.y + size <= 600.0);
    }

    #[test]
    fn ended_screen_reclamps_against_the_fallback_surface() {
        let mut r = rig_with(StudioConfiguration::default(), FakeDevices::with_screen(2560, 1440));
        r.studio.toggle_source(SourceKind::Screen).unwrap();
        r.studio.set_webcam_position(Point::new(2000.0, 1000.0)).unwrap();
        r.devices.last(SourceKind::Screen).unwrap().trigger_ended();

        let outcome = r.studio.pump();
        assert_eq!(outcome.ended, vec![SourceKind::Screen]);
        let (w, h) = r.studio.target_resolution();
        let p = r.studio.composition().webcam_position;
        let size = bubble_size(Size::new(w as f64, h as f64), r.studio.composition().webcam_scale);
        assert!(p.x + size <= w as f64 && p.y + size <= h as f64);
    }

    #[test]
    fn failed_stop_in_pump_still_reports_ended_sources() {
        let dir = tempfile::tempdir().unwrap();
        let config = StudioConfiguration {
            storage_directory: dir.path().to_path_buf(),
            ..Default::default()
        };
        let devices = FakeDevices::new();
        let backend = FakeRecorderBackend::webm();
        let mut studio =
            Studio::with_disk_store(config, devices.clone(), backend.clone(), MemorySink::failing("downloads")).unwrap();
        studio.toggle_source(SourceKind::Screen).unwrap();
        studio.toggle_source(SourceKind::Camera).unwrap();
        studio.start_recording().unwrap();
        backend.emit(b"kept");
        devices.last(SourceKind::Screen).unwrap().trigger_ended();
        devices.last(SourceKind::Camera).unwrap().trigger_ended();

        let outcome = studio.pump();
        assert_eq!(outcome.ended.len(), 2);
        assert!(outcome.ended.contains(&SourceKind::Screen) && outcome.ended.contains(&SourceKind::Camera));
        assert!(outcome.handoff.is_none());
        assert!(matches!(outcome.error, Some(StudioError::PersistenceFailure(_))));
        assert!(studio.status().is_error());
        assert!(studio.has_unsaved_data().unwrap());
        // No source left to draw, so the clock was refreshed off.
        assert!(!studio.is_clock_running());
    }

    #[test]
    fn non_finite_styling_is_rejected() {
        let mut r = rig();
        let before = r.studio.composition().clone();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(r.studio.set_webcam_scale(bad), Err(StudioError::ConfigurationFailed(_))));
            assert!(matches!(r.studio.set_screen_scale(bad), Err(StudioError::ConfigurationFailed(_))));
            assert!(matches!(
                r.studio.set_webcam_position(Point::new(bad, 10.0)),
                Err(StudioError::ConfigurationFailed(_))
            ));
            assert!(matches!(
                r.studio.set_webcam_position(Point::new(10.0, bad)),
                Err(StudioError::ConfigurationFailed(_))
            ));
        }
        assert_eq!(r.studio.composition(), &before);
    }
}
