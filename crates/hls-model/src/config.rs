use std::time::Duration;

use serde::Deserialize;

/// Top-level recorder configuration. Loaded from an optional TOML file and
/// overridable by CLI flags; every field has a sensible default so a bare
/// `RecorderConfig::default()` is already runnable.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Number of segments processed before the client is told playback may
    /// begin.
    pub buffering_threshold: u64,
    /// Consecutive playlist-fetch failures before forcing a master reload.
    pub max_playlist_failures: u32,
    /// Consecutive empty playlists before forcing a master reload.
    pub max_empty_playlists: u32,
    /// Consecutive segment failures before terminating the recording.
    pub max_segment_failures: u32,
    pub playlist_timeout: DurationSecs,
    pub key_timeout: DurationSecs,
    pub segment_timeout: DurationSecs,
    pub segment_max_attempts: u32,
    pub probe_timeout: DurationSecs,
    pub muxer_drain_timeout: DurationSecs,
    /// Previous-section segment count below which a short filler section
    /// triggers bumper insertion instead of an ordinary section cut.
    pub bumper_threshold_segments: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffering_threshold: 3,
            max_playlist_failures: 5,
            max_empty_playlists: 10,
            max_segment_failures: 5,
            playlist_timeout: DurationSecs(10),
            key_timeout: DurationSecs(10),
            segment_timeout: DurationSecs(5),
            segment_max_attempts: 10,
            probe_timeout: DurationSecs(10),
            muxer_drain_timeout: DurationSecs(5),
            bumper_threshold_segments: 3,
        }
    }
}

/// A `Duration` that deserializes from a plain integer number of seconds in
/// TOML, rather than requiring a nested table.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(transparent)]
pub struct DurationSecs(u64);

impl DurationSecs {
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}
