use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard ceiling for one take, in seconds.
pub const MAX_RECORDING_SECS: u32 = 120;

/// Configuration for a recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Maximum take length in seconds (default: 120).
    pub max_duration_secs: u32,

    /// Period of the elapsed-seconds counter, in milliseconds (default: 1000).
    pub cadence_ms: u64,

    /// Fragment delivery interval requested from the capture stream (default: 100).
    pub timeslice_ms: u64,

    /// Mime type the finalized audio is tagged with (default: `audio/webm`).
    pub mime_type: String,

    /// Extension used when suggesting an upload file name (default: `webm`).
    pub file_extension: String,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_duration_secs == 0 {
            return Err("max duration must be positive".into());
        }
        if self.max_duration_secs > MAX_RECORDING_SECS {
            return Err(format!(
                "max duration {}s exceeds the {}s ceiling",
                self.max_duration_secs, MAX_RECORDING_SECS
            ));
        }
        if self.cadence_ms == 0 {
            return Err("cadence must be positive".into());
        }
        if self.timeslice_ms == 0 {
            return Err("timeslice must be positive".into());
        }
        if self.mime_type.trim().is_empty() {
            return Err("mime type must not be empty".into());
        }
        Ok(())
    }

    pub fn cadence(&self) -> Duration {
        Duration::from_millis(self.cadence_ms)
    }

    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: MAX_RECORDING_SECS,
            cadence_ms: 1000,
            timeslice_ms: 100,
            mime_type: "audio/webm".into(),
            file_extension: "webm".into(),
        }
    }
}

/// Configuration for the playback session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Give up on a load that has not produced metadata after this long.
    /// `None` waits forever.
    pub load_timeout_ms: Option<u64>,

    /// Number of decorative waveform bars (default: 50).
    pub waveform_bars: usize,

    /// Lowest bar height (inclusive).
    pub waveform_min_height: u32,

    /// Highest bar height (exclusive).
    pub waveform_max_height: u32,
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.load_timeout_ms == Some(0) {
            return Err("load timeout must be positive when set".into());
        }
        if self.waveform_min_height >= self.waveform_max_height {
            return Err(format!(
                "waveform height range {}..{} is empty",
                self.waveform_min_height, self.waveform_max_height
            ));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Option<Duration> {
        self.load_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: None,
            waveform_bars: 50,
            waveform_min_height: 5,
            waveform_max_height: 45,
        }
    }
}
