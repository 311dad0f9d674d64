use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, unique episode identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EpisodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque user identifier issued by the auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// The playback-relevant projection of an episode.
///
/// Built by the feed side and handed to the player as a value; the playback
/// session never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub title: String,
    pub audio_url: String,
    pub duration_secs: f64,
    pub owner: UserId,
}

impl Episode {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        audio_url: impl Into<String>,
        duration_secs: f64,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            id: EpisodeId::new(id),
            title: title.into(),
            audio_url: audio_url.into(),
            duration_secs,
            owner: UserId::new(owner),
        }
    }
}

/// A persisted episode row as returned by the episode table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub id: EpisodeId,
    pub title: String,
    pub owner: UserId,
    pub audio_url: String,
    pub duration_secs: u32,
    pub created_at: DateTime<Utc>,
}

impl EpisodeRecord {
    pub fn to_episode(&self) -> Episode {
        Episode {
            id: self.id.clone(),
            title: self.title.clone(),
            audio_url: self.audio_url.clone(),
            duration_secs: f64::from(self.duration_secs),
            owner: self.owner.clone(),
        }
    }
}

/// Insert payload for a new episode row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEpisode {
    pub title: String,
    pub owner: UserId,
    pub audio_url: String,
    pub duration_secs: u32,
}
