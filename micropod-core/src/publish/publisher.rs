use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info};

use crate::models::episode::{EpisodeRecord, NewEpisode, User, UserId};
use crate::models::error::StoreError;
use crate::models::recorded_audio::RecordedAudio;
use crate::traits::collaborators::{AuthProvider, EpisodeRepository, MediaStore};

/// Longest accepted episode title, in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// The signed-in user, or `NotSignedIn`. Recording and publishing are both
/// gated on this.
pub fn require_user(auth: &dyn AuthProvider) -> Result<User, StoreError> {
    auth.current_user().ok_or(StoreError::NotSignedIn)
}

/// Trim and check an episode title.
pub fn validate_title(title: &str) -> Result<String, StoreError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidTitle("title is required".into()));
    }
    let chars = trimmed.chars().count();
    if chars > MAX_TITLE_CHARS {
        return Err(StoreError::InvalidTitle(format!(
            "title is {} characters, at most {} allowed",
            chars, MAX_TITLE_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

/// Object name for an upload: `{owner}/{unix_millis}.{extension}`.
pub fn suggested_file_name(owner: &UserId, at: DateTime<Utc>, extension: &str) -> String {
    format!("{}/{}.{}", owner, at.timestamp_millis(), extension)
}

/// Takes a finished recording from hand-off to a persisted episode.
pub struct EpisodePublisher {
    auth: Arc<dyn AuthProvider>,
    media: Arc<dyn MediaStore>,
    episodes: Arc<dyn EpisodeRepository>,
    file_extension: String,
}

impl EpisodePublisher {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        media: Arc<dyn MediaStore>,
        episodes: Arc<dyn EpisodeRepository>,
    ) -> Self {
        Self {
            auth,
            media,
            episodes,
            file_extension: "webm".into(),
        }
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into();
        self
    }

    /// Upload `audio` and create its episode row.
    ///
    /// Nothing is written to the episode table unless the upload succeeded.
    pub fn publish(&self, title: &str, audio: &RecordedAudio) -> Result<EpisodeRecord, StoreError> {
        let user = require_user(self.auth.as_ref())?;
        let title = validate_title(title)?;

        let file_name = suggested_file_name(&user.id, Utc::now(), &self.file_extension);
        let locator = self
            .media
            .upload(&user.id, audio, &file_name)
            .map_err(|e| {
                error!("Error uploading podcast {}: {}", file_name, e);
                e
            })?;

        let record = self.episodes.create_episode(NewEpisode {
            title,
            owner: user.id.clone(),
            audio_url: locator,
            duration_secs: audio.duration_secs,
        })?;

        info!(
            "Published episode {} for {} ({}s)",
            record.id, user.username, record.duration_secs
        );
        Ok(record)
    }
}
