use url::Url;

use hls_model::key::{EncryptionInfo, EncryptionMethod};
use hls_model::{PlaylistState, SegmentDescriptor};

/// Incrementally parses HLS media playlists into deduplicated segment
/// descriptors, tracking sequence/discontinuity/endlist/target-duration
/// state across refreshes.
pub struct PlaylistProcessor {
    state: PlaylistState,
}

impl Default for PlaylistProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistProcessor {
    pub fn new() -> Self {
        Self {
            state: PlaylistState::new(),
        }
    }

    pub fn state(&self) -> &PlaylistState {
        &self.state
    }

    /// Processes one playlist refresh, returning newly emitted segment
    /// descriptors in playlist order. Already-seen URIs (per the dedup
    /// window) are silently dropped, except immediately after a reset event
    /// clears the window.
    pub fn process(&mut self, playlist: &m3u8_rs::MediaPlaylist, playlist_url: &Url) -> Vec<SegmentDescriptor> {
        let media_sequence = playlist.media_sequence;
        let discontinuity_sequence = playlist.discontinuity_sequence;
        let target_duration = playlist.target_duration.round().max(0.0) as u64;
        let playlist_type = playlist.playlist_type.map(|t| format!("{t:?}"));
        let endlist = playlist.end_list;

        if self.is_reset_event(
            media_sequence,
            discontinuity_sequence,
            target_duration,
            &playlist_type,
            endlist,
        ) {
            tracing::info!(media_sequence, discontinuity_sequence, "playlist reset event, clearing dedup window");
            self.state.clear_window();
        }
        self.state.resize_window(playlist.segments.len());

        let mut current_key = self.state.current_key.clone();
        let mut out = Vec::with_capacity(playlist.segments.len());

        for (idx, segment) in playlist.segments.iter().enumerate() {
            if let Some(key) = segment.key.as_ref() {
                current_key = key_to_encryption_info(key, playlist_url);
            }

            let absolute_uri = match playlist_url.join(&segment.uri) {
                Ok(u) => u.to_string(),
                Err(e) => {
                    tracing::warn!(uri = segment.uri.as_str(), error = %e, "failed to resolve segment URI, skipping");
                    continue;
                }
            };

            if self.state.contains(&absolute_uri) {
                continue;
            }
            self.state.record(absolute_uri.clone());

            out.push(SegmentDescriptor {
                uri: absolute_uri,
                media_sequence: media_sequence + idx as u64,
                encryption: current_key.clone(),
                duration_ticks: SegmentDescriptor::ticks_from_seconds(segment.duration as f64),
                discontinuity: segment.discontinuity,
            });
        }

        self.state.current_key = current_key;
        self.state.media_sequence = Some(media_sequence);
        self.state.discontinuity_sequence = Some(discontinuity_sequence);
        self.state.playlist_type = playlist_type;
        self.state.endlist_seen = endlist;
        self.state.target_duration = Some(target_duration);

        out
    }

    fn is_reset_event(
        &self,
        media_sequence: u64,
        discontinuity_sequence: u64,
        target_duration: u64,
        playlist_type: &Option<String>,
        endlist: bool,
    ) -> bool {
        if let Some(prev) = self.state.media_sequence {
            if media_sequence < prev {
                return true;
            }
            let jump_limit = target_duration.saturating_mul(3).max(15);
            if media_sequence.saturating_sub(prev) > jump_limit {
                return true;
            }
        }
        if let Some(prev) = self.state.discontinuity_sequence {
            if discontinuity_sequence < prev {
                return true;
            }
            if discontinuity_sequence.saturating_sub(prev) > 5 {
                return true;
            }
        }
        if let Some(prev) = &self.state.playlist_type {
            if Some(prev) != playlist_type.as_ref() {
                return true;
            }
        }
        if self.state.endlist_seen && !endlist {
            return true;
        }
        if let Some(prev) = self.state.target_duration {
            if prev != target_duration {
                return true;
            }
        }
        false
    }
}

fn key_to_encryption_info(key: &m3u8_rs::Key, base_url: &Url) -> EncryptionInfo {
    let method = match key.method {
        m3u8_rs::KeyMethod::None => EncryptionMethod::None,
        m3u8_rs::KeyMethod::AES128 => EncryptionMethod::Aes128,
        _ => EncryptionMethod::Unsupported,
    };
    if matches!(method, EncryptionMethod::None) {
        return EncryptionInfo::none();
    }
    let key_uri = key
        .uri
        .as_deref()
        .and_then(|u| base_url.join(u).ok())
        .map(|u| u.to_string())
        .or_else(|| key.uri.clone());
    let iv = key.iv.as_deref().and_then(parse_iv_hex);
    EncryptionInfo {
        method,
        key_uri,
        iv,
    }
}

/// Parses a `0x`/`0X`-prefixed 32-hex-digit IV attribute into 16 bytes.
fn parse_iv_hex(s: &str) -> Option<[u8; 16]> {
    let stripped = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(stripped).ok()?;
    if bytes.len() != 16 {
        return None;
    }
    let mut iv = [0u8; 16];
    iv.copy_from_slice(&bytes);
    Some(iv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> m3u8_rs::MediaPlaylist {
        match m3u8_rs::parse_playlist_res(text.as_bytes()) {
            Ok(m3u8_rs::Playlist::MediaPlaylist(pl)) => pl,
            other => panic!("expected media playlist, got {other:?}"),
        }
    }

    fn base() -> Url {
        Url::parse("https://cdn.example.com/live/playlist.m3u8").unwrap()
    }

    #[test]
    fn appending_one_uri_emits_exactly_that_uri() {
        let mut proc = PlaylistProcessor::new();
        let p1 = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:6.0,\nseg0.ts\n",
        );
        let first = proc.process(&p1, &base());
        assert_eq!(first.len(), 1);

        let p2 = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:6.0,\nseg0.ts\n#EXTINF:6.0,\nseg1.ts\n",
        );
        let second = proc.process(&p2, &base());
        assert_eq!(second.len(), 1);
        assert!(second[0].uri.ends_with("seg1.ts"));
    }

    #[test]
    fn media_sequence_decrease_triggers_reset_and_reemits() {
        let mut proc = PlaylistProcessor::new();
        let p1 = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:100\n#EXTINF:6.0,\nseg0.ts\n",
        );
        proc.process(&p1, &base());

        let p2 = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:6.0,\nseg0.ts\n",
        );
        let second = proc.process(&p2, &base());
        assert_eq!(second.len(), 1, "reset must allow seg0 to be re-emitted");
    }

    #[test]
    fn window_capacity_tracks_extinf_count() {
        let mut proc = PlaylistProcessor::new();
        let p = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:6.0,\nseg0.ts\n#EXTINF:6.0,\nseg1.ts\n#EXTINF:6.0,\nseg2.ts\n",
        );
        proc.process(&p, &base());
        assert_eq!(proc.state().window_cap(), 3);
    }

    #[test]
    fn discontinuity_tag_alone_does_not_reset_window() {
        let mut proc = PlaylistProcessor::new();
        let p1 = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:6.0,\nseg0.ts\n",
        );
        proc.process(&p1, &base());

        let p2 = parse(
            "#EXTM3U\n#EXT-X-TARGETDURATION:6\n#EXT-X-MEDIA-SEQUENCE:0\n#EXTINF:6.0,\nseg0.ts\n#EXT-X-DISCONTINUITY\n#EXTINF:6.0,\nseg1.ts\n",
        );
        let second = proc.process(&p2, &base());
        assert_eq!(second.len(), 1);
        assert!(second[0].discontinuity);
    }

    #[test]
    fn parses_hex_iv_with_0x_prefix() {
        let iv = parse_iv_hex("0x00000000000000000000000000000001").unwrap();
        assert_eq!(iv[15], 1);
    }
}
