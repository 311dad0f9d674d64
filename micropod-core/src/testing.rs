//! Scripted platform doubles for tests.
//!
//! Both mocks are cheap `Clone` handles over shared state: keep one clone in
//! the test, move the other into the session, then drive the platform side
//! (grants, fragments, ticks, media events) from the test.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::MediaError;
use crate::models::recorded_audio::RecordedAudio;
use crate::processing::capture_buffer::CaptureFragment;
use crate::session::resources::DeviceLease;
use crate::traits::capture_backend::{
    CadenceTimer, CaptureBackend, MicrophoneStream, PreviewPlayer, RecordingEvent, RecordingEventSink,
};
use crate::traits::playback_resource::{PlaybackEvent, PlaybackEventSink, PlaybackResource};

/// How the mock answers the next microphone request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessScript {
    /// Grant immediately.
    Grant,
    /// Refuse immediately.
    Deny(MediaError),
    /// Leave the prompt open until [`MockCaptureBackend::resolve_pending`].
    Defer,
    /// Grant, but fail when capture starts.
    FailStart(MediaError),
}

/// Resource accounting of the mock capture platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceCounters {
    pub access_requests: usize,
    pub acquisitions: usize,
    pub releases: usize,
    pub double_releases: usize,
    pub cadences_started: usize,
    pub cadences_cancelled: usize,
    pub previews_created: usize,
    pub previews_revoked: usize,
}

#[derive(Default)]
struct CaptureInner {
    counters: DeviceCounters,
    scripts: VecDeque<AccessScript>,
    pending: Option<RecordingEventSink>,
    last_events: Option<RecordingEventSink>,
    stream_events: Option<RecordingEventSink>,
    cadence_events: Option<RecordingEventSink>,
    preview_events: Option<RecordingEventSink>,
    preview_failure: Option<MediaError>,
    stop_flush: Option<Vec<u8>>,
}

/// Counting microphone/timer/preview platform.
#[derive(Clone, Default)]
pub struct MockCaptureBackend {
    inner: Arc<Mutex<CaptureInner>>,
}

impl MockCaptureBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer for a future microphone request. Requests without a
    /// queued answer are granted.
    pub fn script(&self, answer: AccessScript) {
        self.inner.lock().scripts.push_back(answer);
    }

    pub fn counters(&self) -> DeviceCounters {
        self.inner.lock().counters.clone()
    }

    /// The sink handed over with the most recent microphone request.
    pub fn last_events(&self) -> Option<RecordingEventSink> {
        self.inner.lock().last_events.clone()
    }

    /// Answer a deferred prompt.
    pub fn resolve_pending(&self, answer: AccessScript) {
        let pending = self.inner.lock().pending.take();
        if let Some(events) = pending {
            self.answer(events, answer);
        }
    }

    /// Deliver a fragment from the running stream, if any.
    pub fn emit_fragment(&self, data: Vec<u8>) {
        let events = self.inner.lock().stream_events.clone();
        if let Some(events) = events {
            let _ = events.send(RecordingEvent::Fragment(CaptureFragment::new(data)));
        }
    }

    /// Fire the cadence timer, if it is running.
    pub fn tick(&self) {
        let events = self.inner.lock().cadence_events.clone();
        if let Some(events) = events {
            let _ = events.send(RecordingEvent::Tick);
        }
    }

    pub fn fail_device(&self, err: MediaError) {
        let events = self.inner.lock().stream_events.clone();
        if let Some(events) = events {
            let _ = events.send(RecordingEvent::DeviceFailed(err));
        }
    }

    pub fn end_preview(&self) {
        let events = self.inner.lock().preview_events.clone();
        if let Some(events) = events {
            let _ = events.send(RecordingEvent::PreviewEnded);
        }
    }

    /// Have the stream deliver one last fragment while it is being stopped,
    /// as a chunked recorder flushes its tail.
    pub fn flush_on_stop(&self, data: Vec<u8>) {
        self.inner.lock().stop_flush = Some(data);
    }

    /// Make every following preview creation fail.
    pub fn fail_previews(&self, err: MediaError) {
        self.inner.lock().preview_failure = Some(err);
    }

    fn answer(&self, events: RecordingEventSink, answer: AccessScript) {
        match answer {
            AccessScript::Grant => self.grant(events, None),
            AccessScript::FailStart(err) => self.grant(events, Some(err)),
            AccessScript::Deny(err) => {
                let _ = events.send(RecordingEvent::AccessDenied(err));
            }
            AccessScript::Defer => {
                self.inner.lock().pending = Some(events);
            }
        }
    }

    fn grant(&self, events: RecordingEventSink, start_failure: Option<MediaError>) {
        self.inner.lock().counters.acquisitions += 1;
        let lease = DeviceLease::new(Box::new(MockMicrophone {
            inner: Arc::clone(&self.inner),
            start_failure,
            stopped: false,
        }));
        // If the session is gone the event comes back and the lease is
        // released as it drops.
        let _ = events.send(RecordingEvent::AccessGranted(lease));
    }
}

impl CaptureBackend for MockCaptureBackend {
    fn request_microphone(&mut self, events: RecordingEventSink) {
        let answer = {
            let mut inner = self.inner.lock();
            inner.counters.access_requests += 1;
            inner.last_events = Some(events.clone());
            inner.scripts.pop_front().unwrap_or(AccessScript::Grant)
        };
        self.answer(events, answer);
    }

    fn start_cadence(&mut self, _period: Duration, events: RecordingEventSink) -> Box<dyn CadenceTimer> {
        let mut inner = self.inner.lock();
        inner.counters.cadences_started += 1;
        inner.cadence_events = Some(events);
        Box::new(MockCadence {
            inner: Arc::clone(&self.inner),
            cancelled: false,
        })
    }

    fn create_preview(
        &mut self,
        _audio: &RecordedAudio,
        events: RecordingEventSink,
    ) -> Result<Box<dyn PreviewPlayer>, MediaError> {
        let mut inner = self.inner.lock();
        if let Some(err) = inner.preview_failure.clone() {
            return Err(err);
        }
        inner.counters.previews_created += 1;
        inner.preview_events = Some(events);
        Ok(Box::new(MockPreview {
            inner: Arc::clone(&self.inner),
            revoked: false,
        }))
    }
}

struct MockMicrophone {
    inner: Arc<Mutex<CaptureInner>>,
    start_failure: Option<MediaError>,
    stopped: bool,
}

impl MicrophoneStream for MockMicrophone {
    fn start(&mut self, _timeslice: Duration, events: RecordingEventSink) -> Result<(), MediaError> {
        if let Some(err) = self.start_failure.take() {
            return Err(err);
        }
        self.inner.lock().stream_events = Some(events);
        Ok(())
    }

    fn stop(&mut self) {
        let flush = {
            let mut inner = self.inner.lock();
            if self.stopped {
                inner.counters.double_releases += 1;
                return;
            }
            self.stopped = true;
            inner.counters.releases += 1;
            let events = inner.stream_events.take();
            events.zip(inner.stop_flush.take())
        };
        if let Some((events, data)) = flush {
            let _ = events.send(RecordingEvent::Fragment(CaptureFragment::new(data)));
        }
    }

    fn label(&self) -> String {
        "mock microphone".into()
    }
}

struct MockCadence {
    inner: Arc<Mutex<CaptureInner>>,
    cancelled: bool,
}

impl CadenceTimer for MockCadence {
    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        let mut inner = self.inner.lock();
        inner.counters.cadences_cancelled += 1;
        inner.cadence_events = None;
    }
}

struct MockPreview {
    inner: Arc<Mutex<CaptureInner>>,
    revoked: bool,
}

impl PreviewPlayer for MockPreview {
    fn play(&mut self) -> Result<(), MediaError> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn revoke(&mut self) {
        if self.revoked {
            return;
        }
        self.revoked = true;
        let mut inner = self.inner.lock();
        inner.counters.previews_revoked += 1;
        inner.preview_events = None;
    }
}

#[derive(Default)]
struct PlaybackInner {
    sources: Vec<String>,
    sinks: Vec<PlaybackEventSink>,
    load_calls: usize,
    play_calls: usize,
    pause_calls: usize,
    seeks: Vec<f64>,
    reject_next: Option<MediaError>,
    manual_ack: bool,
}

/// Recording playback element. Acknowledges every `play()` with
/// `PlaybackStarted` unless told to reject it.
#[derive(Clone, Default)]
pub struct MockPlaybackResource {
    inner: Arc<Mutex<PlaybackInner>>,
}

impl MockPlaybackResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource that never answers `play()` on its own.
    pub fn manual_ack() -> Self {
        let resource = Self::default();
        resource.inner.lock().manual_ack = true;
        resource
    }

    pub fn sources(&self) -> Vec<String> {
        self.inner.lock().sources.clone()
    }

    pub fn load_calls(&self) -> usize {
        self.inner.lock().load_calls
    }

    pub fn play_calls(&self) -> usize {
        self.inner.lock().play_calls
    }

    pub fn pause_calls(&self) -> usize {
        self.inner.lock().pause_calls
    }

    pub fn seeks(&self) -> Vec<f64> {
        self.inner.lock().seeks.clone()
    }

    pub fn reject_next_play(&self, err: MediaError) {
        self.inner.lock().reject_next = Some(err);
    }

    /// Sink handed over with the `index`-th `set_source` call.
    pub fn sink_for_load(&self, index: usize) -> Option<PlaybackEventSink> {
        self.inner.lock().sinks.get(index).cloned()
    }

    /// Raise an event for the current source.
    pub fn emit(&self, event: PlaybackEvent) {
        let sink = self.inner.lock().sinks.last().cloned();
        if let Some(sink) = sink {
            let _ = sink.send(event);
        }
    }
}

impl PlaybackResource for MockPlaybackResource {
    fn set_source(&mut self, source: &str, events: PlaybackEventSink) {
        let mut inner = self.inner.lock();
        inner.sources.push(source.to_string());
        inner.sinks.push(events);
    }

    fn load(&mut self) {
        self.inner.lock().load_calls += 1;
    }

    fn play(&mut self) {
        let answer = {
            let mut inner = self.inner.lock();
            inner.play_calls += 1;
            if inner.manual_ack {
                None
            } else {
                let outcome = match inner.reject_next.take() {
                    Some(err) => PlaybackEvent::PlaybackRejected(err),
                    None => PlaybackEvent::PlaybackStarted,
                };
                inner.sinks.last().cloned().map(|sink| (sink, outcome))
            }
        };
        if let Some((sink, outcome)) = answer {
            let _ = sink.send(outcome);
        }
    }

    fn pause(&mut self) {
        self.inner.lock().pause_calls += 1;
    }

    fn seek(&mut self, position_secs: f64) {
        self.inner.lock().seeks.push(position_secs);
    }
}
