use crate::models::error::MediaError;
use crate::session::events::EventSink;

/// Events raised by the playback resource for one load.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// Metadata is available; carries the authoritative duration.
    MetadataLoaded { duration_secs: f64 },
    /// The playhead moved.
    TimeAdvanced { position_secs: f64 },
    /// The end of the media was reached.
    Ended,
    /// A `play()` request was acknowledged.
    PlaybackStarted,
    /// A `play()` request was refused (autoplay policy, decode failure, ...).
    PlaybackRejected(MediaError),
    /// The source could not be loaded.
    LoadFailed(MediaError),
}

pub type PlaybackEventSink = EventSink<PlaybackEvent>;

/// The single platform media element driven by the playback session.
///
/// Implementations report everything asynchronous through the sink handed
/// to `set_source`, including the outcome of every `play()` call.
pub trait PlaybackResource {
    /// Point the element at a new source. Events for this source go to `events`.
    fn set_source(&mut self, source: &str, events: PlaybackEventSink);

    /// Begin loading the current source.
    fn load(&mut self);

    /// Request playback. Answered later with `PlaybackStarted` or `PlaybackRejected`.
    fn play(&mut self);

    fn pause(&mut self);

    /// Move the playhead. Out-of-range values are the platform's to clamp.
    fn seek(&mut self, position_secs: f64);
}
