use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::handoff::{CompletionHandoff, HandoffReport};
use crate::models::artifact::HandoffOutcome;
use crate::models::error::StudioError;
use crate::models::notification::Notification;
use crate::models::presets::FALLBACK_MIME_TYPES;
use crate::models::source::TrackKind;
use crate::models::state::RecordingStatus;
use crate::traits::chunk_buffer::{get_json, set_json, ChunkBuffer, SettingsStore};
use crate::traits::media_track::{MediaStream, MediaTrack};
use crate::traits::recorder_backend::{RecorderBackend, RecorderEvent, RecorderHandle, RecorderOptions};
use crate::traits::studio_delegate::StudioDelegate;

/// Settings key holding the [`PendingSession`] of an unfinished recording.
pub const PENDING_SESSION_KEY: &str = "pending_session";

/// How long `stop` waits on the chunk writer when the encoder failed to
/// acknowledge the stop.
const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Mime type used to recover chunks whose session record was lost.
const RECOVERY_MIME_TYPE: &str = "video/webm";

/// Recorded at start so chunks left by a crash can be recovered with the
/// right container type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSession {
    pub mime_type: String,
    pub started_at: String,
}

/// Everything needed to start one recording.
#[derive(Clone)]
pub struct StartRequest {
    pub video_track: Arc<dyn MediaTrack>,
    pub audio_track: Option<Arc<dyn MediaTrack>>,
    pub preferred_mime_type: Option<String>,
    pub video_bitrate: u32,
    pub audio_bitrate: u32,
    pub timeslice: Duration,
}

struct ControllerShared {
    status: RecordingStatus,
    chunk_count: usize,
    fault: Option<StudioError>,
}

/// Encoder/Recorder Controller.
///
/// ```text
/// idle → initializing → recording ⇄ paused → processing → ready
///                 ↘          ↓          ↓          ↓
///                            error ───────────→ (reset) → idle
/// ```
///
/// Encoded slices are appended to the chunk buffer by a dedicated writer
/// thread, strictly in emission order. A mid-stream encoder fault moves the
/// controller to `error` but keeps the recorder alive, so a later `stop`
/// still hands off every chunk that reached the buffer.
pub struct RecordingController<R: RecorderBackend> {
    backend: Arc<R>,
    handoff: Arc<CompletionHandoff>,
    settings: Arc<dyn SettingsStore>,
    delegate: Option<Arc<dyn StudioDelegate>>,
    shared: Arc<Mutex<ControllerShared>>,
    handle: Option<Box<dyn RecorderHandle>>,
    writer: Option<thread::JoinHandle<()>>,
    writer_done: Option<Receiver<()>>,
    drain_timeout: Duration,
    mime_type: Option<String>,
}

impl<R: RecorderBackend> RecordingController<R> {
    pub fn new(backend: Arc<R>, handoff: Arc<CompletionHandoff>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            backend,
            handoff,
            settings,
            delegate: None,
            shared: Arc::new(Mutex::new(ControllerShared {
                status: RecordingStatus::Idle,
                chunk_count: 0,
                fault: None,
            })),
            handle: None,
            writer: None,
            writer_done: None,
            drain_timeout: STOP_DRAIN_TIMEOUT,
            mime_type: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn StudioDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn status(&self) -> RecordingStatus {
        self.shared.lock().status.clone()
    }

    /// Chunks appended during the current session.
    pub fn chunk_count(&self) -> usize {
        self.shared.lock().chunk_count
    }

    /// Mid-stream fault of the current session, if any.
    pub fn fault(&self) -> Option<StudioError> {
        self.shared.lock().fault.clone()
    }

    /// Negotiated mime type of the current or last session.
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// An encoder or a still-draining chunk writer is attached.
    pub fn has_active_recorder(&self) -> bool {
        self.handle.is_some() || self.writer.is_some()
    }

    pub fn set_drain_timeout(&mut self, timeout: Duration) {
        self.drain_timeout = timeout;
    }

    pub fn backend(&self) -> &Arc<R> {
        &self.backend
    }

    /// First supported type: the preferred one, then the fixed fallback chain.
    pub fn negotiate_mime_type(&self, preferred: Option<&str>) -> Result<String, StudioError> {
        let chosen = preferred
            .into_iter()
            .chain(FALLBACK_MIME_TYPES.iter().copied())
            .find(|mime| self.backend.is_type_supported(mime));
        match chosen {
            Some(mime) => {
                if preferred.is_some() && preferred != Some(mime) {
                    warn!("Recorder: preferred format {:?} unsupported, using {}", preferred, mime);
                }
                Ok(mime.to_string())
            }
            None => Err(StudioError::UnsupportedFormat),
        }
    }

    pub fn start(&mut self, request: StartRequest) -> Result<(), StudioError> {
        {
            let s = self.shared.lock();
            let busy = matches!(
                s.status,
                RecordingStatus::Initializing
                    | RecordingStatus::Recording
                    | RecordingStatus::Paused
                    | RecordingStatus::Processing
            );
            if busy || self.has_active_recorder() {
                warn!("Recorder: start refused, already {}", s.status.name());
                return Err(StudioError::AlreadyRecording);
            }
        }

        let stale = self.handoff.buffer().len()?;
        if stale > 0 {
            warn!("Recorder: start refused, {} unsaved chunks in buffer", stale);
            return Err(StudioError::UnflushedChunks(stale));
        }

        self.set_status(RecordingStatus::Initializing);
        match self.begin(request) {
            Ok(()) => {
                self.set_status(RecordingStatus::Recording);
                Ok(())
            }
            Err(e) => {
                error!("Recorder: start failed: {}", e);
                self.set_status(RecordingStatus::Error(e.clone()));
                Err(e)
            }
        }
    }

    fn begin(&mut self, request: StartRequest) -> Result<(), StudioError> {
        let mime_type = self.negotiate_mime_type(request.preferred_mime_type.as_deref())?;

        if request.video_track.kind() != TrackKind::Video {
            return Err(StudioError::InvalidState("no video track to record".into()));
        }
        let mut tracks = vec![request.video_track];
        tracks.extend(request.audio_track.filter(|t| t.kind() == TrackKind::Audio));
        let stream = MediaStream::new(tracks);

        let options = RecorderOptions {
            mime_type: mime_type.clone(),
            video_bits_per_second: request.video_bitrate,
            audio_bits_per_second: request.audio_bitrate,
        };
        info!(
            "Recorder: starting {} at {} bps video / {} bps audio, {:?} slices",
            mime_type, options.video_bits_per_second, options.audio_bits_per_second, request.timeslice
        );

        let (events_tx, events_rx) = mpsc::channel();
        let mut handle = self.backend.create(stream, &options, events_tx)?;
        handle.start(request.timeslice)?;

        {
            let mut s = self.shared.lock();
            s.chunk_count = 0;
            s.fault = None;
        }

        let (done_tx, done_rx) = mpsc::channel();
        let buffer = Arc::clone(self.handoff.buffer());
        let shared = Arc::clone(&self.shared);
        let delegate = self.delegate.clone();
        let writer = thread::Builder::new()
            .name("chunk-writer".into())
            .spawn(move || run_writer(events_rx, buffer, shared, delegate, done_tx));
        let writer = match writer {
            Ok(w) => w,
            Err(e) => {
                let _ = handle.stop();
                return Err(StudioError::InvalidState(format!("failed to spawn chunk writer: {}", e)));
            }
        };

        let pending = PendingSession {
            mime_type: mime_type.clone(),
            started_at: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = set_json(self.settings.as_ref(), PENDING_SESSION_KEY, &pending) {
            warn!("Recorder: failed to record pending session: {}", e);
        }

        self.handle = Some(handle);
        self.writer = Some(writer);
        self.writer_done = Some(done_rx);
        self.mime_type = Some(mime_type);
        Ok(())
    }

    /// Pause encoding. No-op unless recording.
    pub fn pause(&mut self) -> Result<(), StudioError> {
        if !self.status().is_recording() {
            debug!("Recorder: pause ignored in {}", self.status().name());
            return Ok(());
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.pause()?;
            self.set_status(RecordingStatus::Paused);
        }
        Ok(())
    }

    /// Resume encoding. No-op unless paused.
    pub fn resume(&mut self) -> Result<(), StudioError> {
        if !self.status().is_paused() {
            debug!("Recorder: resume ignored in {}", self.status().name());
            return Ok(());
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.resume()?;
            self.set_status(RecordingStatus::Recording);
        }
        Ok(())
    }

    /// Finalize the encoder and hand off everything buffered.
    ///
    /// Safe from any state. With no recorder and nothing salvageable the
    /// report is `Skipped`. A session that faulted mid-stream still hands
    /// off the chunks it managed to buffer.
    pub fn stop(&mut self) -> Result<HandoffReport, StudioError> {
        let had_recorder = self.has_active_recorder();
        if !had_recorder {
            let salvage = self.status().is_error() && self.handoff.buffer().len()? > 0;
            if !salvage {
                debug!("Recorder: stop with nothing to finalize");
                return Ok(HandoffReport {
                    artifact: None,
                    outcome: HandoffOutcome::Skipped,
                });
            }
        }

        self.set_status(RecordingStatus::Processing);
        if let Err(e) = self.finish_recorder() {
            self.set_status(RecordingStatus::Error(e.clone()));
            return Err(e);
        }

        let mime_type = self.session_mime_type();
        self.hand_off(&mime_type)
    }

    /// Forceful teardown: stop without handoff, discard buffered chunks,
    /// return to idle. Works from any state, including `error`.
    pub fn reset(&mut self) -> Result<(), StudioError> {
        if self.has_active_recorder() {
            info!("Recorder: reset while active, discarding session");
        }
        if let Err(e) = self.finish_recorder() {
            warn!("Recorder: {}, detaching", e);
            self.writer = None;
            self.writer_done = None;
        }
        let cleared = self.handoff.buffer().clear();
        let forgotten = self.settings.remove_setting(PENDING_SESSION_KEY);
        {
            let mut s = self.shared.lock();
            s.chunk_count = 0;
            s.fault = None;
        }
        self.mime_type = None;
        self.set_status(RecordingStatus::Idle);
        cleared?;
        forgotten
    }

    /// Hand off chunks left behind by a previous process.
    pub fn recover_unsaved(&mut self) -> Result<HandoffReport, StudioError> {
        if self.has_active_recorder() {
            return Err(StudioError::AlreadyRecording);
        }
        let pending = self.handoff.buffer().len()?;
        if pending == 0 {
            return Ok(HandoffReport {
                artifact: None,
                outcome: HandoffOutcome::Skipped,
            });
        }
        info!("Recorder: recovering {} unsaved chunks", pending);
        self.shared.lock().chunk_count = pending;
        self.set_status(RecordingStatus::Processing);
        let mime_type = self.session_mime_type();
        self.hand_off(&mime_type)
    }

    /// Drop chunks left behind by a previous process.
    pub fn discard_unsaved(&mut self) -> Result<(), StudioError> {
        if self.has_active_recorder() {
            return Err(StudioError::AlreadyRecording);
        }
        self.handoff.buffer().clear()?;
        self.settings.remove_setting(PENDING_SESSION_KEY)
    }

    fn session_mime_type(&self) -> String {
        if let Some(mime) = &self.mime_type {
            return mime.clone();
        }
        match get_json::<PendingSession>(self.settings.as_ref(), PENDING_SESSION_KEY) {
            Ok(Some(pending)) => pending.mime_type,
            Ok(None) => RECOVERY_MIME_TYPE.to_string(),
            Err(e) => {
                warn!("Recorder: unreadable pending session: {}", e);
                RECOVERY_MIME_TYPE.to_string()
            }
        }
    }

    fn hand_off(&mut self, mime_type: &str) -> Result<HandoffReport, StudioError> {
        match self.handoff.complete(mime_type) {
            Ok(report) => {
                if let Err(e) = self.settings.remove_setting(PENDING_SESSION_KEY) {
                    warn!("Recorder: failed to clear pending session: {}", e);
                }
                self.set_status(RecordingStatus::Ready);
                if let (Some(delegate), Some(artifact)) = (&self.delegate, &report.artifact) {
                    delegate.on_artifact_ready(artifact, &report.outcome);
                }
                Ok(report)
            }
            Err(e) => {
                error!("Recorder: handoff failed, chunks kept for recovery: {}", e);
                self.set_status(RecordingStatus::Error(e.clone()));
                Err(e)
            }
        }
    }

    /// Stop the encoder and wait for the writer to drain its final slices.
    ///
    /// An encoder that acknowledged the stop always delivers `Stopped` after
    /// its last slice, so that wait has no deadline. Otherwise the writer gets
    /// `drain_timeout`; a writer still busy after that stays attached and the
    /// call fails, leaving its chunks for a later `stop` or recovery.
    fn finish_recorder(&mut self) -> Result<(), StudioError> {
        let mut acknowledged = false;
        if let Some(mut handle) = self.handle.take() {
            match handle.stop() {
                Ok(()) => acknowledged = true,
                Err(e) => warn!("Recorder: encoder stop failed: {}", e),
            }
            // Releases the handle's event sender.
            drop(handle);
        }
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        let busy = match self.writer_done.as_ref() {
            None => false,
            Some(rx) if acknowledged => {
                let _ = rx.recv();
                false
            }
            Some(rx) => matches!(rx.recv_timeout(self.drain_timeout), Err(RecvTimeoutError::Timeout)),
        };
        if busy {
            self.writer = Some(writer);
            return Err(StudioError::EncodingFault(format!(
                "chunk writer still draining after {:?}",
                self.drain_timeout
            )));
        }
        self.writer_done = None;
        if writer.join().is_err() {
            error!("Recorder: chunk writer panicked");
        }
        Ok(())
    }

    fn set_status(&self, status: RecordingStatus) {
        {
            let mut s = self.shared.lock();
            s.status = status.clone();
        }
        debug!("Recorder: status -> {}", status.name());
        if let Some(ref delegate) = self.delegate {
            delegate.on_status_changed(&status);
        }
    }
}

impl<R: RecorderBackend> Drop for RecordingController<R> {
    fn drop(&mut self) {
        // Chunks already written stay in the buffer for recovery.
        if let Err(e) = self.finish_recorder() {
            warn!("Recorder: {}, detaching", e);
        }
    }
}

fn run_writer(
    events: Receiver<RecorderEvent>,
    buffer: Arc<dyn ChunkBuffer>,
    shared: Arc<Mutex<ControllerShared>>,
    delegate: Option<Arc<dyn StudioDelegate>>,
    done: Sender<()>,
) {
    let mut broken = false;
    for event in events.iter() {
        match event {
            RecorderEvent::DataAvailable(data) => {
                if data.is_empty() || broken {
                    continue;
                }
                match buffer.append(&data) {
                    Ok(()) => shared.lock().chunk_count += 1,
                    Err(e) => {
                        // A gap would corrupt the container; keep what is already durable.
                        broken = true;
                        report_fault(&shared, delegate.as_deref(), e);
                    }
                }
            }
            RecorderEvent::Error(reason) => {
                report_fault(&shared, delegate.as_deref(), StudioError::EncodingFault(reason));
            }
            RecorderEvent::Stopped => break,
        }
    }
    debug!("Recorder: chunk writer exiting");
    let _ = done.send(());
}

fn report_fault(shared: &Mutex<ControllerShared>, delegate: Option<&dyn StudioDelegate>, err: StudioError) {
    error!("Recorder: {}", err);
    let status = {
        let mut s = shared.lock();
        s.fault = Some(err.clone());
        if s.status.is_capturing() {
            s.status = RecordingStatus::Error(err.clone());
            Some(s.status.clone())
        } else {
            None
        }
    };
    if let Some(delegate) = delegate {
        if let Some(status) = status {
            delegate.on_status_changed(&status);
        }
        delegate.on_notification(&Notification::from(&err));
    }
}
