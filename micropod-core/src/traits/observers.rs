use crate::models::error::MediaError;
use crate::models::recorded_audio::RecordedAudio;
use crate::models::state::{PlaybackState, RecordingPhase};

/// Notifications from the playback session. All methods default to no-ops.
pub trait PlaybackObserver: Send + Sync {
    fn on_state_changed(&self, _state: &PlaybackState) {}

    /// A playback failure was absorbed; playback stays paused.
    fn on_error(&self, _error: &MediaError) {}
}

/// Notifications from the recording session. All methods default to no-ops.
pub trait RecordingDelegate: Send + Sync {
    fn on_phase_changed(&self, _phase: RecordingPhase) {}

    /// Called once per cadence tick while recording.
    fn on_elapsed(&self, _elapsed_secs: u32, _max_secs: u32) {}

    fn on_error(&self, _error: &MediaError) {}

    /// The take stopped and was finalized; it is now available for preview.
    fn on_recording_stopped(&self, _audio: &RecordedAudio) {}

    /// The take was handed off for upload.
    fn on_recording_complete(&self, _audio: &RecordedAudio) {}
}
