use std::time::Duration;

use url::Url;

use crate::error::PlaylistError;

/// Fetches and resolves HLS master/media playlists over HTTP.
pub struct PlaylistFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl PlaylistFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Resolves `url` to a media playlist URL. If `url` already names a
    /// media playlist it is returned unchanged (after following redirects);
    /// if it names a master playlist the highest-bandwidth variant is
    /// selected and resolved against the final URL. Fails fatally if the
    /// master playlist body carries a DRM signature.
    pub async fn resolve_master(&self, url: &str) -> Result<String, PlaylistError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| PlaylistError::Fetch {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(PlaylistError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let final_url = response.url().clone();
        let body = response.text().await.map_err(|source| PlaylistError::Fetch {
            url: url.to_string(),
            source,
        })?;

        match m3u8_rs::parse_playlist_res(body.as_bytes()) {
            Ok(m3u8_rs::Playlist::MediaPlaylist(_)) => Ok(final_url.to_string()),
            Ok(m3u8_rs::Playlist::MasterPlaylist(master)) => {
                if drm::detect_in_content(&body, "m3u8").has_drm() {
                    return Err(PlaylistError::DrmProtected {
                        url: url.to_string(),
                    });
                }
                let variant = master
                    .variants
                    .iter()
                    .max_by_key(|v| v.bandwidth)
                    .ok_or_else(|| PlaylistError::NoVariants {
                        url: url.to_string(),
                    })?;
                let resolved = final_url
                    .join(&variant.uri)
                    .map_err(|source| PlaylistError::InvalidUrl {
                        url: variant.uri.clone(),
                        source,
                    })?;
                Ok(resolved.to_string())
            }
            Err(e) => Err(PlaylistError::Parse {
                url: url.to_string(),
                reason: format!("{e:?}"),
            }),
        }
    }

    /// Fetches a media playlist's text body verbatim.
    pub async fn fetch_media(&self, url: &str) -> Result<String, PlaylistError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| PlaylistError::Fetch {
                url: url.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(PlaylistError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().await.map_err(|source| PlaylistError::Fetch {
            url: url.to_string(),
            source,
        })
    }
}

/// True if the directory portion of `a`'s and `b`'s URL paths differ.
/// The host is deliberately ignored; a missing/unparseable URL on either
/// side counts as "differs".
pub fn directory_differs(a: &str, b: &str) -> bool {
    let dir = |s: &str| -> Option<String> {
        let parsed = Url::parse(s).ok()?;
        let path = parsed.path();
        let cut = path.rfind('/')?;
        Some(path[..cut].to_string())
    };
    match (dir(a), dir(b)) {
        (Some(da), Some(db)) => da != db,
        _ => true,
    }
}
