//! # micropod-local
//!
//! Filesystem backend for the `micropod-core` collaborator traits.
//!
//! ```text
//! {root}/
//! ├── episodes.json                          ← episode table
//! └── {bucket}/{public_prefix}/{owner}/      ← uploaded takes + .metadata.json sidecars
//! ```

pub mod auth;
pub mod config;
pub mod episode_store;
pub mod media_store;

use std::sync::Arc;

use micropod_core::{AuthProvider, EpisodePublisher, StoreError};

pub use auth::MemoryAuth;
pub use config::LocalStoreConfig;
pub use episode_store::LocalEpisodeRepository;
pub use media_store::{LocalMediaStore, ObjectMetadata};

/// All local collaborators over one data root.
pub struct LocalBackend {
    pub auth: Arc<MemoryAuth>,
    pub media: Arc<LocalMediaStore>,
    pub episodes: Arc<LocalEpisodeRepository>,
}

impl LocalBackend {
    pub fn open(config: LocalStoreConfig) -> Result<Self, StoreError> {
        let episodes = LocalEpisodeRepository::open(&config)?;
        let media = LocalMediaStore::new(config)?;
        Ok(Self {
            auth: Arc::new(MemoryAuth::new()),
            media: Arc::new(media),
            episodes: Arc::new(episodes),
        })
    }

    pub fn publisher(&self) -> EpisodePublisher {
        EpisodePublisher::new(self.auth.clone(), self.media.clone(), self.episodes.clone())
    }

    /// Whether a user is present. Hosts check this before opening the
    /// recorder.
    pub fn can_record(&self) -> bool {
        self.auth.current_user().is_some()
    }
}
