use crate::models::recorded_audio::RecordedAudio;
use crate::models::state::StopReason;

/// One chunk of encoded audio delivered while recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFragment {
    data: Vec<u8>,
}

impl CaptureFragment {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Append-only list of fragments for the take in progress.
///
/// Sealed into a single [`RecordedAudio`] when the take stops.
#[derive(Debug, Default)]
pub struct CaptureBuffer {
    fragments: Vec<CaptureFragment>,
    total_bytes: usize,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Empty fragments carry no audio and are skipped.
    pub fn append(&mut self, fragment: CaptureFragment) -> bool {
        if fragment.is_empty() {
            return false;
        }
        self.total_bytes += fragment.len();
        self.fragments.push(fragment);
        true
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn clear(&mut self) {
        self.fragments.clear();
        self.total_bytes = 0;
    }

    /// Concatenate every fragment, in order, into one immutable blob and
    /// leave the buffer empty.
    pub fn finalize(&mut self, mime_type: &str, duration_secs: u32, stop_reason: StopReason) -> RecordedAudio {
        let fragment_count = self.fragments.len();
        let mut bytes = Vec::with_capacity(self.total_bytes);
        for fragment in self.fragments.drain(..) {
            bytes.extend_from_slice(fragment.as_bytes());
        }
        self.total_bytes = 0;
        RecordedAudio::new(bytes, mime_type, duration_secs, fragment_count, stop_reason)
    }
}
