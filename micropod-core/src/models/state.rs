use serde::{Deserialize, Serialize};

use super::episode::{Episode, EpisodeId};
use super::error::MediaError;

/// Load lifecycle of the shared playback resource.
///
/// ```text
/// no-episode → loading → ready ─(ended)→ ready
///                  ↓
///               failed
/// any ─(play different episode)→ loading
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadStatus {
    #[default]
    NoEpisode,
    Loading,
    Ready,
    Failed(MediaError),
}

/// Observable state of the playback session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackState {
    pub current_episode: Option<Episode>,
    pub status: LoadStatus,
    pub is_playing: bool,
    /// Seconds, from the resource metadata. 0 until loaded.
    pub duration_secs: f64,
    /// Seconds, kept within `[0, duration_secs]` once the duration is known.
    pub current_time_secs: f64,
}

impl PlaybackState {
    pub fn current_id(&self) -> Option<&EpisodeId> {
        self.current_episode.as_ref().map(|e| &e.id)
    }

    pub fn is_current(&self, id: &EpisodeId) -> bool {
        self.current_id() == Some(id)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading)
    }

    /// Fraction of the episode already played, in `[0, 1]`.
    pub fn progress_fraction(&self) -> f64 {
        if self.duration_secs > 0.0 && self.duration_secs.is_finite() {
            (self.current_time_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Clamp a position into the known duration.
    pub(crate) fn clamp_position(&self, position_secs: f64) -> f64 {
        let position = position_secs.max(0.0);
        if self.duration_secs > 0.0 {
            position.min(self.duration_secs)
        } else {
            position
        }
    }
}

/// Recording session phases.
///
/// ```text
/// idle → acquiring → recording → stopped ─(discard/complete)→ idle
///            ↓           ↓
///          error       error
/// error ─(start)→ acquiring
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingPhase {
    Idle,
    Acquiring,
    Recording,
    Stopped,
    Error,
}

impl RecordingPhase {
    /// Phases from which a new take may be started.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Error)
    }

    /// Phases during which the session may own the microphone.
    pub fn owns_device(&self) -> bool {
        matches!(self, Self::Acquiring | Self::Recording)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

/// Why a take ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The user pressed stop.
    Requested,
    /// The time box ran out.
    CeilingReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_zero_without_duration() {
        let state = PlaybackState {
            current_time_secs: 12.0,
            ..Default::default()
        };
        assert_eq!(state.progress_fraction(), 0.0);
    }

    #[test]
    fn progress_is_clamped() {
        let state = PlaybackState {
            duration_secs: 10.0,
            current_time_secs: 15.0,
            ..Default::default()
        };
        assert_eq!(state.progress_fraction(), 1.0);
    }

    #[test]
    fn clamp_position_respects_known_duration() {
        let mut state = PlaybackState::default();
        assert_eq!(state.clamp_position(-3.0), 0.0);
        assert_eq!(state.clamp_position(500.0), 500.0);

        state.duration_secs = 90.0;
        assert_eq!(state.clamp_position(500.0), 90.0);
    }

    #[test]
    fn phase_predicates() {
        assert!(RecordingPhase::Idle.can_start());
        assert!(RecordingPhase::Error.can_start());
        assert!(!RecordingPhase::Stopped.can_start());
        assert!(!RecordingPhase::Acquiring.can_start());

        assert!(RecordingPhase::Acquiring.owns_device());
        assert!(RecordingPhase::Recording.owns_device());
        assert!(!RecordingPhase::Stopped.owns_device());
    }
}
