use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::state::StopReason;

/// A finished take: the capture buffer sealed into one immutable blob.
#[derive(Clone, PartialEq)]
pub struct RecordedAudio {
    pub id: String,
    bytes: Arc<[u8]>,
    pub mime_type: String,
    /// Whole seconds elapsed when the take stopped.
    pub duration_secs: u32,
    pub fragment_count: usize,
    /// SHA-256 of `bytes`, lowercase hex.
    pub checksum: String,
    pub created_at: DateTime<Utc>,
    pub stop_reason: StopReason,
}

impl RecordedAudio {
    pub fn new(
        bytes: Vec<u8>,
        mime_type: &str,
        duration_secs: u32,
        fragment_count: usize,
        stop_reason: StopReason,
    ) -> Self {
        let checksum = sha256_hex(&bytes);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            bytes: Arc::from(bytes),
            mime_type: mime_type.to_string(),
            duration_secs,
            fragment_count,
            checksum,
            created_at: Utc::now(),
            stop_reason,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn metadata(&self) -> RecordingMetadata {
        RecordingMetadata {
            id: self.id.clone(),
            mime_type: self.mime_type.clone(),
            duration_secs: self.duration_secs,
            size_bytes: self.bytes.len() as u64,
            fragment_count: self.fragment_count,
            checksum: self.checksum.clone(),
            created_at: self.created_at.to_rfc3339(),
            stop_reason: self.stop_reason,
        }
    }
}

impl fmt::Debug for RecordedAudio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordedAudio")
            .field("id", &self.id)
            .field("mime_type", &self.mime_type)
            .field("duration_secs", &self.duration_secs)
            .field("size_bytes", &self.bytes.len())
            .field("fragment_count", &self.fragment_count)
            .field("stop_reason", &self.stop_reason)
            .finish()
    }
}

/// Serializable description of a take, without the audio bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub mime_type: String,
    pub duration_secs: u32,
    pub size_bytes: u64,
    pub fragment_count: usize,
    pub checksum: String,
    pub created_at: String,
    pub stop_reason: StopReason,
}

/// SHA-256 hex digest.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn metadata_mirrors_audio() {
        let audio = RecordedAudio::new(vec![1, 2, 3], "audio/webm", 42, 3, StopReason::Requested);
        let meta = audio.metadata();

        assert_eq!(meta.id, audio.id);
        assert_eq!(meta.size_bytes, 3);
        assert_eq!(meta.duration_secs, 42);
        assert_eq!(meta.checksum, audio.checksum);

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["stop_reason"], "requested");
    }

    #[test]
    fn debug_omits_bytes() {
        let audio = RecordedAudio::new(vec![0xAB; 4096], "audio/webm", 1, 1, StopReason::Requested);
        let rendered = format!("{:?}", audio);
        assert!(rendered.contains("size_bytes: 4096"));
        assert!(rendered.len() < 400);
    }
}
