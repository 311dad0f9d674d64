use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use uuid::Uuid;

use micropod_core::{
    validate_title, EpisodeId, EpisodeRecord, EpisodeRepository, FeedObserver, FeedSource, NewEpisode, StoreError,
    SubscriptionId, UserId, MAX_RECORDING_SECS,
};

use crate::config::LocalStoreConfig;

#[derive(Default)]
struct TableInner {
    /// Newest first.
    records: Vec<EpisodeRecord>,
    observers: Vec<(SubscriptionId, Arc<dyn FeedObserver>)>,
    next_subscription: u64,
}

/// The episode table, kept in memory and optionally mirrored to a JSON file.
///
/// Inserts notify subscribed [`FeedObserver`]s synchronously, after the
/// table lock has been released.
pub struct LocalEpisodeRepository {
    path: Option<PathBuf>,
    max_duration_secs: u32,
    inner: Mutex<TableInner>,
}

impl LocalEpisodeRepository {
    /// A table that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            max_duration_secs: MAX_RECORDING_SECS,
            inner: Mutex::new(TableInner::default()),
        }
    }

    /// Open (or create) the table at `config.episodes_path()`.
    pub fn open(config: &LocalStoreConfig) -> Result<Self, StoreError> {
        config.validate().map_err(StoreError::Validation)?;
        Self::open_file(config.episodes_path())
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = if path.exists() {
            load_records(&path)?
        } else {
            Vec::new()
        };
        info!("Opened episode table {} ({} rows)", path.display(), records.len());
        Ok(Self {
            path: Some(path),
            max_duration_secs: MAX_RECORDING_SECS,
            inner: Mutex::new(TableInner {
                records,
                ..TableInner::default()
            }),
        })
    }

    pub fn with_max_duration(mut self, secs: u32) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().records.is_empty()
    }

    pub fn get(&self, id: &EpisodeId) -> Result<EpisodeRecord, StoreError> {
        self.inner
            .lock()
            .records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("episode {}", id)))
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().observers.len()
    }

    fn validate(&self, episode: &NewEpisode) -> Result<String, StoreError> {
        let title = validate_title(&episode.title)?;
        if episode.audio_url.trim().is_empty() {
            return Err(StoreError::Validation("audio_url is required".into()));
        }
        if episode.duration_secs > self.max_duration_secs {
            return Err(StoreError::Validation(format!(
                "duration {}s exceeds the {}s limit",
                episode.duration_secs, self.max_duration_secs
            )));
        }
        Ok(title)
    }
}

impl EpisodeRepository for LocalEpisodeRepository {
    fn create_episode(&self, episode: NewEpisode) -> Result<EpisodeRecord, StoreError> {
        let title = self.validate(&episode)?;
        let record = EpisodeRecord {
            id: EpisodeId::new(Uuid::new_v4().to_string()),
            title,
            owner: episode.owner,
            audio_url: episode.audio_url,
            duration_secs: episode.duration_secs,
            created_at: Utc::now(),
        };

        let observers = {
            let mut inner = self.inner.lock();
            inner.records.insert(0, record.clone());
            if let Some(path) = &self.path {
                if let Err(e) = save_records(path, &inner.records) {
                    inner.records.remove(0);
                    return Err(e);
                }
            }
            inner
                .observers
                .iter()
                .map(|(_, observer)| Arc::clone(observer))
                .collect::<Vec<_>>()
        };

        debug!("Inserted episode {} for {}", record.id, record.owner);
        for observer in observers {
            observer.on_episode_inserted(&record);
        }
        Ok(record)
    }
}

impl FeedSource for LocalEpisodeRepository {
    fn latest(&self) -> Result<Vec<EpisodeRecord>, StoreError> {
        Ok(self.inner.lock().records.clone())
    }

    fn by_owner(&self, owner: &UserId) -> Result<Vec<EpisodeRecord>, StoreError> {
        Ok(self
            .inner
            .lock()
            .records
            .iter()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect())
    }

    fn subscribe(&self, observer: Arc<dyn FeedObserver>) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        inner.observers.push((id, observer));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.inner.lock();
        let before = inner.observers.len();
        inner.observers.retain(|(sub, _)| *sub != id);
        if inner.observers.len() == before {
            warn!("Unsubscribe for unknown subscription {:?}", id);
        }
    }
}

fn load_records(path: &Path) -> Result<Vec<EpisodeRecord>, StoreError> {
    let json = fs::read_to_string(path)
        .map_err(|e| StoreError::Storage(format!("failed to read {}: {}", path.display(), e)))?;
    let mut records: Vec<EpisodeRecord> = serde_json::from_str(&json)
        .map_err(|e| StoreError::Storage(format!("failed to parse {}: {}", path.display(), e)))?;
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(records)
}

/// Replace the table file via a temporary sibling and a rename.
fn save_records(path: &Path, records: &[EpisodeRecord]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StoreError::Storage(format!("failed to create directory: {}", e)))?;
    }
    let json = serde_json::to_string_pretty(records)
        .map_err(|e| StoreError::Storage(format!("failed to serialize episodes: {}", e)))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StoreError::Storage(format!("failed to write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::Storage(format!("failed to replace {}: {}", path.display(), e)))
}
