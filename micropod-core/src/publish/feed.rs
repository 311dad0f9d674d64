use crossbeam_channel::{unbounded, Receiver, Sender};
use log::debug;

use crate::models::episode::{Episode, EpisodeId, EpisodeRecord, UserId};
use crate::models::error::StoreError;
use crate::traits::collaborators::{FeedObserver, FeedSource};

/// Newest-first episode listing with live inserts merged in.
#[derive(Debug, Clone, Default)]
pub struct EpisodeFeed {
    records: Vec<EpisodeRecord>,
}

impl EpisodeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(mut records: Vec<EpisodeRecord>) -> Self {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { records }
    }

    /// Replace the listing with a fresh fetch.
    pub fn refresh(&mut self, source: &dyn FeedSource) -> Result<usize, StoreError> {
        *self = Self::from_records(source.latest()?);
        Ok(self.records.len())
    }

    /// Merge one inserted row. Returns `false` for a row already listed.
    pub fn apply_insert(&mut self, record: EpisodeRecord) -> bool {
        if self.records.iter().any(|r| r.id == record.id) {
            debug!("Ignoring duplicate insert for episode {}", record.id);
            return false;
        }
        let at = self
            .records
            .iter()
            .position(|r| r.created_at <= record.created_at)
            .unwrap_or(self.records.len());
        self.records.insert(at, record);
        true
    }

    pub fn records(&self) -> &[EpisodeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &EpisodeId) -> Option<&EpisodeRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Playback projections, in listing order.
    pub fn episodes(&self) -> Vec<Episode> {
        self.records.iter().map(EpisodeRecord::to_episode).collect()
    }

    pub fn for_owner(&self, owner: &UserId) -> Vec<&EpisodeRecord> {
        self.records.iter().filter(|r| &r.owner == owner).collect()
    }
}

/// Buffers insert notifications until the host merges them on its own
/// thread.
pub struct FeedInbox {
    tx: Sender<EpisodeRecord>,
    rx: Receiver<EpisodeRecord>,
}

impl FeedInbox {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Merge everything received so far. Returns how many rows were new.
    pub fn drain_into(&self, feed: &mut EpisodeFeed) -> usize {
        let mut merged = 0;
        for record in self.rx.try_iter() {
            if feed.apply_insert(record) {
                merged += 1;
            }
        }
        merged
    }
}

impl Default for FeedInbox {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedObserver for FeedInbox {
    fn on_episode_inserted(&self, record: &EpisodeRecord) {
        let _ = self.tx.send(record.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::traits::collaborators::SubscriptionId;

    fn record(id: &str, owner: &str, minutes: i64) -> EpisodeRecord {
        EpisodeRecord {
            id: EpisodeId::new(id),
            title: format!("Episode {}", id),
            owner: UserId::new(owner),
            audio_url: format!("mem://{}.webm", id),
            duration_secs: 60,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes),
        }
    }

    fn ids(feed: &EpisodeFeed) -> Vec<&str> {
        feed.records().iter().map(|r| r.id.as_str()).collect()
    }

    struct StaticSource(Vec<EpisodeRecord>);

    impl FeedSource for StaticSource {
        fn latest(&self) -> Result<Vec<EpisodeRecord>, StoreError> {
            Ok(self.0.clone())
        }

        fn by_owner(&self, owner: &UserId) -> Result<Vec<EpisodeRecord>, StoreError> {
            Ok(self.0.iter().filter(|r| &r.owner == owner).cloned().collect())
        }

        fn subscribe(&self, _observer: Arc<dyn FeedObserver>) -> SubscriptionId {
            SubscriptionId(0)
        }

        fn unsubscribe(&self, _id: SubscriptionId) {}
    }

    #[test]
    fn listing_is_newest_first() {
        let feed = EpisodeFeed::from_records(vec![record("a", "u1", 0), record("c", "u1", 20), record("b", "u2", 10)]);
        assert_eq!(ids(&feed), vec!["c", "b", "a"]);
    }

    #[test]
    fn insert_keeps_order_and_dedupes() {
        let mut feed = EpisodeFeed::from_records(vec![record("a", "u1", 0), record("c", "u1", 20)]);

        assert!(feed.apply_insert(record("b", "u2", 10)));
        assert!(feed.apply_insert(record("d", "u2", 30)));
        assert!(!feed.apply_insert(record("b", "u2", 10)));

        assert_eq!(ids(&feed), vec!["d", "c", "b", "a"]);
    }

    #[test]
    fn refresh_replaces_listing() {
        let mut feed = EpisodeFeed::from_records(vec![record("old", "u1", 0)]);
        let source = StaticSource(vec![record("x", "u1", 5), record("y", "u2", 6)]);

        assert_eq!(feed.refresh(&source).unwrap(), 2);
        assert_eq!(ids(&feed), vec!["y", "x"]);
        assert!(feed.get(&EpisodeId::new("old")).is_none());
    }

    #[test]
    fn owner_filter_and_projection() {
        let feed = EpisodeFeed::from_records(vec![record("a", "u1", 0), record("b", "u2", 1), record("c", "u1", 2)]);

        let mine: Vec<_> = feed.for_owner(&UserId::new("u1")).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(mine, vec!["c", "a"]);

        let episodes = feed.episodes();
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].audio_url, "mem://c.webm");
        assert_eq!(episodes[0].duration_secs, 60.0);
    }

    #[test]
    fn inbox_buffers_until_drained() {
        let inbox = FeedInbox::new();
        let mut feed = EpisodeFeed::new();

        inbox.on_episode_inserted(&record("a", "u1", 0));
        inbox.on_episode_inserted(&record("b", "u1", 1));
        inbox.on_episode_inserted(&record("a", "u1", 0));
        assert_eq!(inbox.pending(), 3);
        assert!(feed.is_empty());

        assert_eq!(inbox.drain_into(&mut feed), 2);
        assert_eq!(ids(&feed), vec!["b", "a"]);
        assert_eq!(inbox.pending(), 0);
    }
}
