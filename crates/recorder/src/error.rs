use thiserror::Error;

/// Top-level error for the recorder crate. Each collaborator's error type
/// is wrapped via `#[from]` so the recorder loop can match on one enum to
/// decide the terminal `stop` disposition.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error(transparent)]
    Playlist(#[from] hls_playlist::PlaylistError),
    #[error(transparent)]
    Crypto(#[from] hls_crypto::CryptoError),
    #[error(transparent)]
    Ts(#[from] ts::TsError),
    #[error("content is DRM-protected")]
    DrmProtected,
    #[error("segment has no parseable PTS")]
    MissingPts,
    #[error("muxer process failed: {0}")]
    Muxer(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0} consecutive segment failures")]
    SegmentFailureThreshold(u32),
}

impl RecorderError {
    /// Fatal errors end the recording immediately, bypassing the
    /// consecutive-failure thresholds the recorder loop otherwise applies.
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecorderError::DrmProtected | RecorderError::MissingPts)
    }

    /// The `error_id` published in the terminal `stop` event.
    pub fn error_id(&self) -> &'static str {
        match self {
            RecorderError::DrmProtected => "drm_protected",
            _ => "failure",
        }
    }
}
