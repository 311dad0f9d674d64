use std::sync::Arc;

use crate::models::episode::{EpisodeRecord, NewEpisode, User, UserId};
use crate::models::error::StoreError;
use crate::models::recorded_audio::RecordedAudio;

/// Session management. The media core only ever asks who is signed in.
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;

    fn sign_in(&self, username: &str) -> Result<User, StoreError>;

    fn sign_out(&self);
}

/// Object storage for finished takes.
pub trait MediaStore: Send + Sync {
    /// Store `audio` under `file_name` and return a durable locator (URI).
    fn upload(&self, owner: &UserId, audio: &RecordedAudio, file_name: &str) -> Result<String, StoreError>;
}

/// The episode table.
pub trait EpisodeRepository: Send + Sync {
    fn create_episode(&self, episode: NewEpisode) -> Result<EpisodeRecord, StoreError>;
}

/// Receives live-insert notifications from a [`FeedSource`].
pub trait FeedObserver: Send + Sync {
    fn on_episode_inserted(&self, record: &EpisodeRecord);
}

/// Handle returned by [`FeedSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Ordered episode listings plus live-insert notifications.
pub trait FeedSource: Send + Sync {
    /// All episodes, newest first.
    fn latest(&self) -> Result<Vec<EpisodeRecord>, StoreError>;

    /// One owner's episodes, newest first.
    fn by_owner(&self, owner: &UserId) -> Result<Vec<EpisodeRecord>, StoreError>;

    fn subscribe(&self, observer: Arc<dyn FeedObserver>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
