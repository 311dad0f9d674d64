//! # micropod-core
//!
//! Platform-agnostic media core for a micro-podcast app.
//!
//! Owns the two state machines that talk to media hardware: a single shared
//! playback session and a bounded (two minute) recording session. The
//! platform (microphone, timers, the playback element) plugs in through the
//! capability traits and talks back through generation-stamped event sinks,
//! so callbacks from superseded loads or abandoned takes are dropped instead
//! of corrupting state. Backend collaborators (auth, object storage, the
//! episode table, live feed) are traits as well; `micropod-local` provides a
//! filesystem implementation.
//!
//! ## Architecture
//!
//! ```text
//! micropod-core (this crate)
//! ├── traits/       ← PlaybackResource, CaptureBackend, observers, collaborators
//! ├── models/       ← Episode, PlaybackState, RecordingPhase, errors, configs
//! ├── processing/   ← CaptureBuffer, Waveform, clock formatting
//! ├── session/      ← PlaybackSession, RecordingSession, event sinks, RAII guards
//! └── publish/      ← EpisodePublisher, EpisodeFeed
//! ```

pub mod models;
pub mod processing;
pub mod publish;
pub mod session;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::{PlayerConfig, RecorderConfig, MAX_RECORDING_SECS};
pub use models::episode::{Episode, EpisodeId, EpisodeRecord, NewEpisode, User, UserId};
pub use models::error::{ConfigError, MediaError, RecordingError, StoreError};
pub use models::recorded_audio::{RecordedAudio, RecordingMetadata};
pub use models::state::{LoadStatus, PlaybackState, RecordingPhase, StopReason};
pub use processing::capture_buffer::{CaptureBuffer, CaptureFragment};
pub use processing::clock::format_clock;
pub use processing::waveform::Waveform;
pub use publish::feed::{EpisodeFeed, FeedInbox};
pub use publish::publisher::{require_user, validate_title, EpisodePublisher, MAX_TITLE_CHARS};
pub use session::events::{EventSink, Generation};
pub use session::playback::PlaybackSession;
pub use session::recording::RecordingSession;
pub use session::resources::DeviceLease;
pub use traits::capture_backend::{CadenceTimer, CaptureBackend, MicrophoneStream, PreviewPlayer, RecordingEvent, RecordingEventSink};
pub use traits::collaborators::{AuthProvider, EpisodeRepository, FeedObserver, FeedSource, MediaStore, SubscriptionId};
pub use traits::observers::{PlaybackObserver, RecordingDelegate};
pub use traits::playback_resource::{PlaybackEvent, PlaybackEventSink, PlaybackResource};
