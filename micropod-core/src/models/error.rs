use thiserror::Error;

use super::state::RecordingPhase;

/// Failures reported by the platform media primitives.
///
/// These never escape a session as a crash: each one is caught where it
/// originates and folded into session state (an `Error` recording phase, or
/// a playback that stays paused).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("microphone access denied")]
    DeviceAccessDenied,

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("failed to load media: {0}")]
    LoadFailure(String),

    #[error("media load timed out")]
    LoadTimedOut,
}

/// Misuse of the recording session API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("cannot {operation} while {phase:?}")]
    InvalidPhase {
        operation: &'static str,
        phase: RecordingPhase,
    },

    #[error("a microphone request is already pending")]
    AcquisitionPending,

    #[error(transparent)]
    Media(#[from] MediaError),
}

/// Errors returned by the backend collaborators (auth, storage, episode table).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("invalid title: {0}")]
    InvalidTitle(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// Rejected configuration values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid configuration: {0}")]
pub struct ConfigError(pub String);
