use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::models::config::RecorderConfig;
use crate::models::error::{ConfigError, MediaError, RecordingError};
use crate::models::recorded_audio::RecordedAudio;
use crate::models::state::{RecordingPhase, StopReason};
use crate::processing::capture_buffer::CaptureBuffer;
use crate::session::events::{EventQueue, Stamped};
use crate::session::resources::{CadenceGuard, DeviceLease, PreviewGuard};
use crate::traits::capture_backend::{CaptureBackend, RecordingEvent};
use crate::traits::observers::RecordingDelegate;

/// Time-boxed microphone recording.
///
/// Drives one take at a time through
/// `idle → acquiring → recording → stopped → (discard | complete) → idle`.
/// The microphone lease, the cadence timer and the preview player are held
/// in scoped guards; stop, discard, failure, [`reset`](Self::reset) and drop
/// all release them, each exactly once.
///
/// The permission prompt is the only suspension point: `start_recording`
/// returns in `Acquiring` and the answer is applied by
/// [`process_events`](Self::process_events).
pub struct RecordingSession<B: CaptureBackend> {
    backend: B,
    config: RecorderConfig,
    phase: RecordingPhase,
    elapsed_secs: u32,
    buffer: CaptureBuffer,
    result: Option<RecordedAudio>,
    last_error: Option<MediaError>,
    lease: Option<DeviceLease>,
    cadence: Option<CadenceGuard>,
    preview: Option<PreviewGuard>,
    is_previewing: bool,
    queue: EventQueue<RecordingEvent>,
    delegate: Option<Arc<dyn RecordingDelegate>>,
}

impl<B: CaptureBackend> RecordingSession<B> {
    pub fn new(backend: B) -> Self {
        Self::build(backend, RecorderConfig::default())
    }

    pub fn with_config(backend: B, config: RecorderConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError)?;
        Ok(Self::build(backend, config))
    }

    fn build(backend: B, config: RecorderConfig) -> Self {
        Self {
            backend,
            config,
            phase: RecordingPhase::Idle,
            elapsed_secs: 0,
            buffer: CaptureBuffer::new(),
            result: None,
            last_error: None,
            lease: None,
            cadence: None,
            preview: None,
            is_previewing: false,
            queue: EventQueue::new(),
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecordingDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn phase(&self) -> RecordingPhase {
        self.phase
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.config.max_duration_secs.saturating_sub(self.elapsed_secs)
    }

    pub fn capture_buffer(&self) -> &CaptureBuffer {
        &self.buffer
    }

    /// The finished take, present only while `Stopped`.
    pub fn result(&self) -> Option<&RecordedAudio> {
        self.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&MediaError> {
        self.last_error.as_ref()
    }

    /// Whether the session currently holds the microphone.
    pub fn holds_device(&self) -> bool {
        self.lease.is_some()
    }

    pub fn is_previewing(&self) -> bool {
        self.is_previewing
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Request the microphone for a new take.
    ///
    /// Valid from `Idle` and `Error`. Returns once the request is issued; the
    /// session sits in `Acquiring` until the answer is processed. A second
    /// call while the prompt is pending is refused.
    pub fn start_recording(&mut self) -> Result<(), RecordingError> {
        match self.phase {
            RecordingPhase::Idle | RecordingPhase::Error => {}
            RecordingPhase::Acquiring => return Err(RecordingError::AcquisitionPending),
            phase => {
                return Err(RecordingError::InvalidPhase {
                    operation: "start recording",
                    phase,
                })
            }
        }

        self.last_error = None;
        self.buffer.clear();
        self.elapsed_secs = 0;

        let events = self.queue.advance();
        info!("Requesting microphone (take {})", events.generation());
        self.set_phase(RecordingPhase::Acquiring);
        self.backend.request_microphone(events);
        Ok(())
    }

    /// Stop the take and seal it for preview. No-op unless `Recording`;
    /// returns whether a take was stopped.
    ///
    /// Fragments and ticks already delivered but not yet processed are
    /// applied first, so the sealed take holds everything captured up to the
    /// stop. Those ticks may hit the ceiling, in which case the take ends as
    /// `CeilingReached`.
    pub fn stop_recording(&mut self) -> bool {
        if self.phase != RecordingPhase::Recording {
            debug!("Stop ignored while {:?}", self.phase);
            return false;
        }
        self.process_events();
        match self.phase {
            RecordingPhase::Recording => {
                self.finish(StopReason::Requested);
                true
            }
            RecordingPhase::Stopped => true,
            phase => {
                debug!("Take ended as {:?} before the stop applied", phase);
                false
            }
        }
    }

    /// Throw the finished take away and go back to `Idle`.
    pub fn discard_recording(&mut self) -> Result<(), RecordingError> {
        self.expect_stopped("discard recording")?;
        self.release_preview();
        self.result = None;
        self.elapsed_secs = 0;
        self.queue.advance();
        info!("Recording discarded");
        self.set_phase(RecordingPhase::Idle);
        Ok(())
    }

    /// Hand the finished take over for upload. The session keeps nothing of
    /// it and returns to `Idle`.
    pub fn complete_recording(&mut self) -> Result<RecordedAudio, RecordingError> {
        self.expect_stopped("complete recording")?;
        let Some(audio) = self.result.take() else {
            return Err(RecordingError::InvalidPhase {
                operation: "complete recording",
                phase: self.phase,
            });
        };
        self.release_preview();
        self.elapsed_secs = 0;
        self.queue.advance();
        info!(
            "Recording {} handed off ({}s, {} bytes)",
            audio.id,
            audio.duration_secs,
            audio.len()
        );
        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_complete(&audio);
        }
        self.set_phase(RecordingPhase::Idle);
        Ok(audio)
    }

    /// Play or pause the finished take. Returns whether it is now playing.
    pub fn toggle_preview(&mut self) -> Result<bool, RecordingError> {
        self.expect_stopped("preview recording")?;

        if self.is_previewing {
            if let Some(preview) = self.preview.as_mut() {
                preview.pause();
            }
            self.is_previewing = false;
            return Ok(false);
        }

        if self.preview.is_none() {
            let Some(audio) = self.result.as_ref() else {
                return Err(RecordingError::InvalidPhase {
                    operation: "preview recording",
                    phase: self.phase,
                });
            };
            let player = self.backend.create_preview(audio, self.queue.sink())?;
            self.preview = Some(PreviewGuard::new(player));
        }

        if let Some(preview) = self.preview.as_mut() {
            preview.play()?;
        }
        self.is_previewing = true;
        Ok(true)
    }

    /// Abandon whatever is in progress and return to `Idle`, releasing every
    /// resource the session holds. Used when the owning screen goes away.
    pub fn reset(&mut self) {
        if self.phase != RecordingPhase::Idle {
            info!("Resetting recording session from {:?}", self.phase);
        }
        self.release_capture();
        self.release_preview();
        self.buffer.clear();
        self.result = None;
        self.elapsed_secs = 0;
        self.queue.advance();
        self.set_phase(RecordingPhase::Idle);
    }

    /// Apply every event the platform has delivered so far, in order.
    /// Returns the number of events consumed (stale ones included).
    pub fn process_events(&mut self) -> usize {
        let mut consumed = 0;
        while let Some(event) = self.queue.try_next() {
            self.handle_event(event);
            consumed += 1;
        }
        consumed
    }

    fn handle_event(&mut self, event: Stamped<RecordingEvent>) {
        if !self.queue.is_current(&event) {
            // A stale grant releases its lease when dropped here.
            debug!("Dropping stale event from take {}: {:?}", event.generation, event.kind);
            return;
        }

        match event.kind {
            RecordingEvent::AccessGranted(lease) => self.on_access_granted(lease),
            RecordingEvent::AccessDenied(err) => {
                if self.phase == RecordingPhase::Acquiring {
                    self.fail(err);
                }
            }
            RecordingEvent::Fragment(fragment) => {
                if self.phase == RecordingPhase::Recording {
                    self.buffer.append(fragment);
                } else {
                    debug!("Dropping {}-byte fragment while {:?}", fragment.len(), self.phase);
                }
            }
            RecordingEvent::Tick => self.on_tick(),
            RecordingEvent::PreviewEnded => {
                self.is_previewing = false;
            }
            RecordingEvent::DeviceFailed(err) => {
                if self.phase.owns_device() {
                    self.fail(err);
                }
            }
        }
    }

    fn on_access_granted(&mut self, mut lease: DeviceLease) {
        if self.phase != RecordingPhase::Acquiring {
            debug!("Unexpected microphone grant while {:?}", self.phase);
            return;
        }

        if let Err(err) = lease.start(self.config.timeslice(), self.queue.sink()) {
            lease.release();
            self.fail(err);
            return;
        }
        info!("Recording from {}", lease.label());
        self.lease = Some(lease);

        let timer = self
            .backend
            .start_cadence(self.config.cadence(), self.queue.sink());
        self.cadence = Some(CadenceGuard::new(timer));
        self.set_phase(RecordingPhase::Recording);
    }

    fn on_tick(&mut self) {
        if self.phase != RecordingPhase::Recording {
            return;
        }
        let max = self.config.max_duration_secs;
        self.elapsed_secs = (self.elapsed_secs + 1).min(max);
        if let Some(ref delegate) = self.delegate {
            delegate.on_elapsed(self.elapsed_secs, max);
        }
        if self.elapsed_secs >= max {
            info!("Reached the {}s ceiling", max);
            self.finish(StopReason::CeilingReached);
        }
    }

    /// Recording → Stopped: release capture first so nothing more is
    /// buffered, then seal the buffer.
    fn finish(&mut self, reason: StopReason) {
        self.release_capture();
        if reason == StopReason::Requested {
            self.collect_final_fragments();
        }
        let audio = self
            .buffer
            .finalize(&self.config.mime_type, self.elapsed_secs, reason);
        info!(
            "Recording stopped ({:?}): {}s, {} fragments, {} bytes",
            reason,
            audio.duration_secs,
            audio.fragment_count,
            audio.len()
        );
        // Preview events for this take are issued on a fresh generation.
        self.queue.advance();
        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_stopped(&audio);
        }
        self.result = Some(audio);
        self.set_phase(RecordingPhase::Stopped);
    }

    /// Pick up what the stream flushed while stopping. Nothing else of the
    /// take counts any more: elapsed time is frozen.
    fn collect_final_fragments(&mut self) {
        while let Some(event) = self.queue.try_next() {
            if !self.queue.is_current(&event) {
                continue;
            }
            match event.kind {
                RecordingEvent::Fragment(fragment) => {
                    debug!("Final {}-byte fragment after stop", fragment.len());
                    self.buffer.append(fragment);
                }
                other => debug!("Ignoring {:?} after stop", other),
            }
        }
    }

    fn fail(&mut self, err: MediaError) {
        match err {
            MediaError::DeviceAccessDenied => warn!("Microphone access denied"),
            ref other => error!("Error accessing microphone: {}", other),
        }
        self.release_capture();
        self.buffer.clear();
        self.elapsed_secs = 0;
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&err);
        }
        self.last_error = Some(err);
        self.set_phase(RecordingPhase::Error);
    }

    fn release_capture(&mut self) {
        if let Some(cadence) = self.cadence.take() {
            cadence.cancel();
        }
        if let Some(lease) = self.lease.take() {
            lease.release();
        }
    }

    fn release_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            preview.revoke();
        }
        self.is_previewing = false;
    }

    fn expect_stopped(&self, operation: &'static str) -> Result<(), RecordingError> {
        if self.phase == RecordingPhase::Stopped {
            Ok(())
        } else {
            Err(RecordingError::InvalidPhase {
                operation,
                phase: self.phase,
            })
        }
    }

    fn set_phase(&mut self, phase: RecordingPhase) {
        if self.phase != phase {
            debug!("Recording phase {:?} → {:?}", self.phase, phase);
        }
        self.phase = phase;
        if let Some(ref delegate) = self.delegate {
            delegate.on_phase_changed(phase);
        }
    }
}

impl<B: CaptureBackend> Drop for RecordingSession<B> {
    fn drop(&mut self) {
        self.release_capture();
        self.release_preview();
    }
}
