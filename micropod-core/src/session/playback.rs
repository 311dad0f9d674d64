use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::models::config::PlayerConfig;
use crate::models::episode::{Episode, EpisodeId};
use crate::models::error::{ConfigError, MediaError};
use crate::models::state::{LoadStatus, PlaybackState};
use crate::processing::waveform::Waveform;
use crate::session::events::{EventQueue, Stamped};
use crate::traits::observers::PlaybackObserver;
use crate::traits::playback_resource::{PlaybackEvent, PlaybackResource};

/// The application's one audio player.
///
/// Owns the single platform playback resource for the lifetime of the
/// process and decides which episode is current. Construct it once and pass
/// it (or a handle to whatever owns it) to the views that need it; there is
/// no global lookup.
///
/// State moves only on explicit commands and on the resource's events,
/// drained with [`process_events`](Self::process_events):
/// ```text
/// [platform element] → EventSink → (queue) → process_events() → PlaybackState
/// ```
pub struct PlaybackSession<R: PlaybackResource> {
    resource: R,
    config: PlayerConfig,
    state: PlaybackState,
    queue: EventQueue<PlaybackEvent>,
    observer: Option<Arc<dyn PlaybackObserver>>,
    waveform: Waveform,
    load_started: Option<Instant>,
    load_count: u64,
}

impl<R: PlaybackResource> PlaybackSession<R> {
    pub fn new(resource: R) -> Self {
        Self::build(resource, PlayerConfig::default())
    }

    pub fn with_config(resource: R, config: PlayerConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError)?;
        Ok(Self::build(resource, config))
    }

    fn build(resource: R, config: PlayerConfig) -> Self {
        Self {
            resource,
            config,
            state: PlaybackState::default(),
            queue: EventQueue::new(),
            observer: None,
            waveform: Waveform::default(),
            load_started: None,
            load_count: 0,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn PlaybackObserver>) {
        self.observer = Some(observer);
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.state.current_episode.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn duration_secs(&self) -> f64 {
        self.state.duration_secs
    }

    pub fn current_time_secs(&self) -> f64 {
        self.state.current_time_secs
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    /// Number of source loads performed so far.
    pub fn load_count(&self) -> u64 {
        self.load_count
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Whether `id` is the current episode and is playing.
    pub fn is_episode_playing(&self, id: &EpisodeId) -> bool {
        self.state.is_current(id) && self.state.is_playing
    }

    /// Play `episode`.
    ///
    /// The current episode is resumed in place. Any other episode replaces
    /// it: the resource gets the new source, loads it and is asked to play;
    /// `is_playing` flips once the platform acknowledges.
    pub fn play_episode(&mut self, episode: &Episode) {
        let resumable = self.state.is_current(&episode.id)
            && !matches!(self.state.status, LoadStatus::Failed(_));
        if resumable {
            debug!("Resuming episode {}", episode.id);
            self.resource.play();
            self.state.is_playing = true;
            self.notify();
            return;
        }
        self.begin_load(episode.clone());
    }

    /// Pause the current episode. No-op when nothing is current.
    pub fn pause_episode(&mut self) {
        if self.state.current_episode.is_none() {
            return;
        }
        self.resource.pause();
        if self.state.is_playing {
            debug!("Paused at {:.1}s", self.state.current_time_secs);
        }
        self.state.is_playing = false;
        self.notify();
    }

    /// Flip between playing and paused. No-op when nothing is current.
    pub fn toggle_play_pause(&mut self) {
        let Some(episode) = self.state.current_episode.clone() else {
            return;
        };
        if self.state.is_playing {
            self.pause_episode();
        } else {
            self.play_episode(&episode);
        }
    }

    /// Episode-card behaviour: pause `episode` if it is the one playing,
    /// otherwise play it.
    pub fn toggle_episode(&mut self, episode: &Episode) {
        if self.is_episode_playing(&episode.id) {
            self.pause_episode();
        } else {
            self.play_episode(episode);
        }
    }

    /// Move the playhead. The raw value goes to the resource, which clamps
    /// it; the locally reported position is kept within the known duration.
    pub fn seek(&mut self, position_secs: f64) {
        if self.state.current_episode.is_none() {
            return;
        }
        self.resource.seek(position_secs);
        if position_secs.is_finite() {
            self.state.current_time_secs = self.state.clamp_position(position_secs);
            self.notify();
        } else {
            warn!("Ignoring non-finite seek position {}", position_secs);
        }
    }

    /// Seek to a fraction of the duration, as a click on the progress bar does.
    pub fn seek_to_fraction(&mut self, fraction: f64) {
        if !fraction.is_finite() {
            return;
        }
        self.seek(fraction.clamp(0.0, 1.0) * self.state.duration_secs);
    }

    /// Apply every event the resource has delivered so far, in order.
    /// Returns the number of events consumed (stale ones included).
    pub fn process_events(&mut self) -> usize {
        let mut consumed = 0;
        while let Some(event) = self.queue.try_next() {
            self.handle_event(event);
            consumed += 1;
        }
        consumed
    }

    /// Fail the current load if it has been waiting for metadata longer than
    /// the configured timeout. Returns whether it was failed.
    pub fn expire_stalled_load(&mut self, now: Instant) -> bool {
        let (Some(timeout), Some(started)) = (self.config.load_timeout(), self.load_started) else {
            return false;
        };
        if !self.state.is_loading() || now.saturating_duration_since(started) < timeout {
            return false;
        }

        warn!("Load stalled for more than {:?}, giving up", timeout);
        self.resource.pause();
        // Anything the abandoned load still reports is stale from here on.
        self.queue.advance();
        self.fail_load(MediaError::LoadTimedOut);
        true
    }

    fn begin_load(&mut self, episode: Episode) {
        let events = self.queue.advance();
        self.load_count += 1;
        info!(
            "Loading episode {} ({}) [load #{}]",
            episode.id, episode.title, self.load_count
        );

        self.resource.set_source(&episode.audio_url, events);
        self.resource.load();
        self.resource.play();

        self.state = PlaybackState {
            current_episode: Some(episode),
            status: LoadStatus::Loading,
            is_playing: false,
            duration_secs: 0.0,
            current_time_secs: 0.0,
        };
        self.waveform = Waveform::random(&self.config);
        self.load_started = Some(Instant::now());
        self.notify();
    }

    fn handle_event(&mut self, event: Stamped<PlaybackEvent>) {
        if !self.queue.is_current(&event) {
            debug!(
                "Dropping stale event from load generation {}: {:?}",
                event.generation, event.kind
            );
            return;
        }

        match event.kind {
            PlaybackEvent::MetadataLoaded { duration_secs } => {
                if matches!(self.state.status, LoadStatus::Failed(_)) {
                    return;
                }
                let duration = if duration_secs.is_finite() && duration_secs > 0.0 {
                    duration_secs
                } else {
                    0.0
                };
                debug!("Metadata loaded, duration {:.1}s", duration);
                self.state.duration_secs = duration;
                self.state.status = LoadStatus::Ready;
                self.state.current_time_secs = self.state.clamp_position(self.state.current_time_secs);
                self.load_started = None;
            }
            PlaybackEvent::TimeAdvanced { position_secs } => {
                if self.state.status != LoadStatus::Ready {
                    debug!("Ignoring time update before metadata");
                    return;
                }
                if !position_secs.is_finite() {
                    return;
                }
                self.state.current_time_secs = self.state.clamp_position(position_secs);
            }
            PlaybackEvent::Ended => {
                debug!("Playback ended");
                self.state.is_playing = false;
                self.state.current_time_secs = 0.0;
            }
            PlaybackEvent::PlaybackStarted => {
                if matches!(self.state.status, LoadStatus::Failed(_)) {
                    return;
                }
                self.state.is_playing = true;
            }
            PlaybackEvent::PlaybackRejected(err) => {
                warn!("Error playing audio: {}", err);
                self.state.is_playing = false;
                self.report(&err);
            }
            PlaybackEvent::LoadFailed(err) => {
                self.fail_load(err);
                return;
            }
        }
        self.notify();
    }

    fn fail_load(&mut self, err: MediaError) {
        error!("Error loading audio: {}", err);
        self.state.status = LoadStatus::Failed(err.clone());
        self.state.is_playing = false;
        self.load_started = None;
        self.report(&err);
        self.notify();
    }

    fn report(&self, err: &MediaError) {
        if let Some(ref observer) = self.observer {
            observer.on_error(err);
        }
    }

    fn notify(&self) {
        if let Some(ref observer) = self.observer {
            observer.on_state_changed(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;
    use parking_lot::Mutex;

    use super::*;
    use crate::testing::MockPlaybackResource;

    fn episode(id: &str) -> Episode {
        Episode::new(id, format!("Episode {}", id), format!("https://cdn.test/{}.webm", id), 90.0, "owner")
    }

    fn session() -> (PlaybackSession<MockPlaybackResource>, MockPlaybackResource) {
        let resource = MockPlaybackResource::new();
        (PlaybackSession::new(resource.clone()), resource)
    }

    #[test]
    fn starts_with_nothing_current() {
        let (session, _) = session();
        assert!(session.current_episode().is_none());
        assert!(!session.is_playing());
        assert_eq!(session.state().status, LoadStatus::NoEpisode);
    }

    #[test]
    fn play_loads_and_starts_after_ack() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));

        assert_eq!(session.state().status, LoadStatus::Loading);
        assert!(!session.is_playing(), "playing flips only on acknowledgment");
        assert_eq!(resource.sources(), vec!["https://cdn.test/A.webm"]);
        assert_eq!(resource.load_calls(), 1);

        session.process_events();
        assert!(session.is_playing());

        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 90.0 });
        session.process_events();
        assert_eq!(session.state().status, LoadStatus::Ready);
        assert_abs_diff_eq!(session.duration_secs(), 90.0);
    }

    #[test]
    fn unacknowledged_play_stays_paused() {
        let resource = MockPlaybackResource::manual_ack();
        let mut session = PlaybackSession::new(resource.clone());
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 45.0 });
        session.process_events();
        assert!(!session.is_playing());

        resource.emit(PlaybackEvent::PlaybackStarted);
        session.process_events();
        assert!(session.is_playing());
    }

    #[test]
    fn replaying_current_episode_resumes_without_reload() {
        let (mut session, resource) = session();
        let a = episode("A");
        session.play_episode(&a);
        session.process_events();
        session.pause_episode();

        session.play_episode(&a);
        session.play_episode(&a);

        assert_eq!(resource.sources().len(), 1);
        assert_eq!(session.load_count(), 1);
        assert!(session.is_playing());
    }

    #[test]
    fn a_then_b_then_a_loads_three_times() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        session.play_episode(&episode("B"));
        session.play_episode(&episode("A"));
        session.process_events();

        assert_eq!(
            resource.sources(),
            vec![
                "https://cdn.test/A.webm",
                "https://cdn.test/B.webm",
                "https://cdn.test/A.webm"
            ]
        );
        assert_eq!(session.load_count(), 3);
        assert_eq!(session.current_episode().unwrap().id.as_str(), "A");
    }

    #[test]
    fn rejected_playback_stays_paused() {
        let (mut session, resource) = session();
        resource.reject_next_play(MediaError::PlaybackRejected("no user gesture".into()));

        session.play_episode(&episode("A"));
        session.process_events();

        assert!(!session.is_playing());
        assert_eq!(session.current_episode().unwrap().id.as_str(), "A");
    }

    #[test]
    fn rejected_resume_reverts_playing_flag() {
        let (mut session, resource) = session();
        let a = episode("A");
        session.play_episode(&a);
        session.process_events();
        session.pause_episode();

        resource.reject_next_play(MediaError::PlaybackRejected("interrupted".into()));
        session.play_episode(&a);
        assert!(session.is_playing());
        session.process_events();
        assert!(!session.is_playing());
    }

    #[test]
    fn pause_without_episode_is_noop() {
        let (mut session, resource) = session();
        session.pause_episode();
        assert_eq!(resource.pause_calls(), 0);
    }

    #[test]
    fn toggle_flips_and_double_toggle_restores() {
        let (mut session, _) = session();
        session.play_episode(&episode("A"));
        session.process_events();
        assert!(session.is_playing());

        session.toggle_play_pause();
        assert!(!session.is_playing());
        session.toggle_play_pause();
        session.process_events();
        assert!(session.is_playing());
    }

    #[test]
    fn toggle_without_episode_is_noop() {
        let (mut session, resource) = session();
        session.toggle_play_pause();
        assert!(!session.is_playing());
        assert_eq!(resource.play_calls(), 0);
    }

    #[test]
    fn toggle_episode_pauses_only_the_playing_one() {
        let (mut session, _) = session();
        let a = episode("A");
        let b = episode("B");
        session.play_episode(&a);
        session.process_events();

        session.toggle_episode(&a);
        assert!(!session.is_playing());

        session.toggle_episode(&b);
        session.process_events();
        assert!(session.is_episode_playing(&b.id));
        assert!(!session.is_episode_playing(&a.id));
    }

    #[test]
    fn time_updates_are_clamped_to_duration() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 30.0 });
        resource.emit(PlaybackEvent::TimeAdvanced { position_secs: 12.5 });
        session.process_events();
        assert_abs_diff_eq!(session.current_time_secs(), 12.5);

        resource.emit(PlaybackEvent::TimeAdvanced { position_secs: 31.0 });
        session.process_events();
        assert_abs_diff_eq!(session.current_time_secs(), 30.0);
    }

    #[test]
    fn time_update_before_metadata_is_ignored() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::TimeAdvanced { position_secs: 5.0 });
        session.process_events();
        assert_eq!(session.current_time_secs(), 0.0);
    }

    #[test]
    fn unknown_duration_reads_as_zero() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::MetadataLoaded {
            duration_secs: f64::INFINITY,
        });
        resource.emit(PlaybackEvent::TimeAdvanced { position_secs: 42.0 });
        session.process_events();

        assert_eq!(session.state().status, LoadStatus::Ready);
        assert_eq!(session.duration_secs(), 0.0);
        // Position still tracks the resource; only the upper clamp is off.
        assert_abs_diff_eq!(session.current_time_secs(), 42.0);
        assert_eq!(session.state().progress_fraction(), 0.0);

        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: f64::NAN });
        session.process_events();
        assert_eq!(session.duration_secs(), 0.0);
    }

    #[test]
    fn ended_resets_position_and_stops() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 10.0 });
        resource.emit(PlaybackEvent::TimeAdvanced { position_secs: 10.0 });
        resource.emit(PlaybackEvent::Ended);
        session.process_events();

        assert!(!session.is_playing());
        assert_eq!(session.current_time_secs(), 0.0);
        assert_eq!(session.state().status, LoadStatus::Ready);
    }

    #[test]
    fn stale_events_from_previous_load_are_dropped() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        let first_load = resource.sink_for_load(0).unwrap();
        session.play_episode(&episode("B"));
        session.process_events();

        first_load
            .send(PlaybackEvent::MetadataLoaded { duration_secs: 999.0 })
            .unwrap();
        first_load.send(PlaybackEvent::Ended).unwrap();
        session.process_events();

        assert_eq!(session.duration_secs(), 0.0);
        assert!(session.is_playing());
        assert_eq!(session.current_episode().unwrap().id.as_str(), "B");
    }

    #[test]
    fn load_failure_is_absorbed() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::LoadFailed(MediaError::LoadFailure("404".into())));
        session.process_events();

        assert!(!session.is_playing());
        assert_eq!(
            session.state().status,
            LoadStatus::Failed(MediaError::LoadFailure("404".into()))
        );
    }

    #[test]
    fn replaying_after_load_failure_reloads() {
        let (mut session, resource) = session();
        let a = episode("A");
        session.play_episode(&a);
        resource.emit(PlaybackEvent::LoadFailed(MediaError::LoadFailure("reset".into())));
        session.process_events();

        session.play_episode(&a);
        assert_eq!(resource.sources().len(), 2);
        assert_eq!(session.state().status, LoadStatus::Loading);
    }

    #[test]
    fn seek_passes_raw_value_and_clamps_locally() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 60.0 });
        session.process_events();

        session.seek(75.0);
        assert_eq!(resource.seeks(), vec![75.0]);
        assert_abs_diff_eq!(session.current_time_secs(), 60.0);

        session.seek(-5.0);
        assert_eq!(session.current_time_secs(), 0.0);

        session.seek(f64::NAN);
        assert_eq!(resource.seeks().len(), 3);
        assert_eq!(session.current_time_secs(), 0.0);
    }

    #[test]
    fn seek_without_episode_is_noop() {
        let (mut session, resource) = session();
        session.seek(10.0);
        assert!(resource.seeks().is_empty());
    }

    #[test]
    fn seek_to_fraction_uses_duration() {
        let (mut session, resource) = session();
        session.play_episode(&episode("A"));
        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 80.0 });
        session.process_events();

        session.seek_to_fraction(0.25);
        assert_abs_diff_eq!(session.current_time_secs(), 20.0);
        assert_abs_diff_eq!(session.state().progress_fraction(), 0.25);
    }

    #[test]
    fn waveform_regenerates_per_episode() {
        let (mut session, _) = session();
        assert!(session.waveform().is_empty());
        session.play_episode(&episode("A"));
        assert_eq!(session.waveform().len(), 50);
    }

    #[test]
    fn stalled_load_expires_when_timeout_configured() {
        let resource = MockPlaybackResource::new();
        let config = PlayerConfig {
            load_timeout_ms: Some(5_000),
            ..Default::default()
        };
        let mut session = PlaybackSession::with_config(resource.clone(), config).unwrap();
        session.play_episode(&episode("A"));
        session.process_events();

        let start = Instant::now();
        assert!(!session.expire_stalled_load(start));
        assert!(session.expire_stalled_load(start + Duration::from_secs(6)));
        assert_eq!(session.state().status, LoadStatus::Failed(MediaError::LoadTimedOut));
        assert!(!session.is_playing());

        // A metadata event from the abandoned load arrives too late.
        resource.emit(PlaybackEvent::MetadataLoaded { duration_secs: 40.0 });
        session.process_events();
        assert_eq!(session.duration_secs(), 0.0);
    }

    #[test]
    fn stalled_load_waits_forever_by_default() {
        let (mut session, _) = session();
        session.play_episode(&episode("A"));
        assert!(!session.expire_stalled_load(Instant::now() + Duration::from_secs(3600)));
        assert!(session.state().is_loading());
    }

    #[test]
    fn observer_sees_transitions_and_errors() {
        #[derive(Default)]
        struct Recorder {
            playing: Mutex<Vec<bool>>,
            errors: Mutex<Vec<MediaError>>,
        }

        impl PlaybackObserver for Recorder {
            fn on_state_changed(&self, state: &PlaybackState) {
                self.playing.lock().push(state.is_playing);
            }

            fn on_error(&self, error: &MediaError) {
                self.errors.lock().push(error.clone());
            }
        }

        let (mut session, resource) = session();
        let recorder = Arc::new(Recorder::default());
        session.set_observer(recorder.clone());

        resource.reject_next_play(MediaError::PlaybackRejected("autoplay".into()));
        session.play_episode(&episode("A"));
        session.process_events();

        assert_eq!(recorder.playing.lock().as_slice(), &[false, false]);
        assert_eq!(
            recorder.errors.lock().as_slice(),
            &[MediaError::PlaybackRejected("autoplay".into())]
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = PlayerConfig {
            load_timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(PlaybackSession::with_config(MockPlaybackResource::new(), config).is_err());
    }
}
