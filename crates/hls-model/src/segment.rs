use crate::key::EncryptionInfo;

/// One entry emitted by the playlist processor: an absolute segment URI plus
/// everything the segment processor needs to download, decrypt and place it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDescriptor {
    /// Absolute URI, resolved against the playlist's own URL.
    pub uri: String,
    /// Position in the `#EXT-X-MEDIA-SEQUENCE` numbering.
    pub media_sequence: u64,
    pub encryption: EncryptionInfo,
    /// Duration in 90 kHz ticks, rounded from the `#EXTINF` float.
    pub duration_ticks: u64,
    /// Whether an `#EXT-X-DISCONTINUITY` tag immediately preceded this
    /// segment in the playlist.
    pub discontinuity: bool,
}

impl SegmentDescriptor {
    /// Converts an `#EXTINF` duration in seconds to 90 kHz ticks.
    pub fn ticks_from_seconds(seconds: f64) -> u64 {
        (seconds * 90_000.0).round() as u64
    }
}
