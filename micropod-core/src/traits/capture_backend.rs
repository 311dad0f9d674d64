use std::time::Duration;

use crate::models::error::MediaError;
use crate::models::recorded_audio::RecordedAudio;
use crate::processing::capture_buffer::CaptureFragment;
use crate::session::events::EventSink;
use crate::session::resources::DeviceLease;

/// Events raised by the capture platform during a take.
#[derive(Debug)]
pub enum RecordingEvent {
    /// The permission prompt was accepted. The lease owns the microphone.
    AccessGranted(DeviceLease),
    /// The permission prompt was refused or no device could be opened.
    AccessDenied(MediaError),
    /// One chunk of encoded audio.
    Fragment(CaptureFragment),
    /// One period of the cadence timer elapsed.
    Tick,
    /// The preview of the finished take reached its end.
    PreviewEnded,
    /// The device failed mid-take.
    DeviceFailed(MediaError),
}

pub type RecordingEventSink = EventSink<RecordingEvent>;

/// Platform capabilities needed by the recording session.
pub trait CaptureBackend {
    /// Ask for microphone access. May suspend on a user prompt; the answer
    /// arrives on `events` as `AccessGranted` or `AccessDenied`.
    fn request_microphone(&mut self, events: RecordingEventSink);

    /// Start a repeating timer delivering `Tick` every `period` until the
    /// returned timer is cancelled.
    fn start_cadence(&mut self, period: Duration, events: RecordingEventSink) -> Box<dyn CadenceTimer>;

    /// Create a playable preview of a finished take (an object URL plus a
    /// media element in a browser). `PreviewEnded` goes to `events`.
    fn create_preview(
        &mut self,
        audio: &RecordedAudio,
        events: RecordingEventSink,
    ) -> Result<Box<dyn PreviewPlayer>, MediaError>;
}

/// An open microphone stream. Wrapped in a [`DeviceLease`] as soon as it is
/// granted so it is stopped exactly once.
pub trait MicrophoneStream: Send {
    /// Begin chunked capture, emitting a `Fragment` every `timeslice`.
    fn start(&mut self, timeslice: Duration, events: RecordingEventSink) -> Result<(), MediaError>;

    /// Stop capture and every hardware track behind the stream.
    fn stop(&mut self);

    fn label(&self) -> String {
        "microphone".into()
    }
}

pub trait CadenceTimer {
    fn cancel(&mut self);
}

pub trait PreviewPlayer {
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    /// Release the underlying preview resource (revoke the object URL).
    fn revoke(&mut self);
}
