use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("invalid playlist URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to fetch playlist {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("playlist {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to parse playlist at {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("master playlist at {url} has no variants")]
    NoVariants { url: String },
    #[error("master playlist at {url} is DRM-protected")]
    DrmProtected { url: String },
}
