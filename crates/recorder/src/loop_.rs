use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use hls_model::{LifecycleEvent, RecorderConfig, RecorderId, StopReason};
use hls_playlist::{PlaylistFetcher, PlaylistProcessor};
use pipeline_common::CancellationToken;
use url::Url;

use crate::error::RecorderError;
use crate::events::EventBus;
use crate::segment::SegmentProcessor;

enum Terminal {
    Complete,
    Cancelled,
}

/// Drives one recording to completion: resolves the master playlist,
/// refreshes the media playlist on a cadence, feeds new segments to a
/// [`SegmentProcessor`], and reloads the master when recovery thresholds
/// are exceeded. Publishes `ready`/`start`/`stop` on the shared event bus.
pub struct RecorderLoop {
    fetcher: PlaylistFetcher,
    client: reqwest::Client,
    config: RecorderConfig,
    events: Arc<EventBus>,
    recorder_id: RecorderId,
    rec_dir: PathBuf,
}

impl RecorderLoop {
    pub fn new(
        client: reqwest::Client,
        config: RecorderConfig,
        events: Arc<EventBus>,
        recorder_id: RecorderId,
        rec_dir: PathBuf,
    ) -> Self {
        let fetcher = PlaylistFetcher::new(client.clone(), config.playlist_timeout.as_duration());
        Self {
            fetcher,
            client,
            config,
            events,
            recorder_id,
            rec_dir,
        }
    }

    /// `hls_live` recordings keep reloading the master across ENDLIST
    /// blips; every other recorder id treats ENDLIST as normal completion.
    fn is_live(&self) -> bool {
        matches!(self.recorder_id, RecorderId::HlsLive)
    }

    fn publish_stop(&self, reason: StopReason, error_id: Option<&str>, msg: Option<String>) {
        self.events.publish(LifecycleEvent::stop(
            reason,
            error_id.map(str::to_string),
            msg,
            self.recorder_id,
        ));
    }

    pub async fn run(&self, channel_url: &str, token: CancellationToken) -> Result<(), RecorderError> {
        self.events.publish(LifecycleEvent::Ready {});

        let mut media_url = self.fetcher.resolve_master(channel_url).await?;
        let mut playlist = PlaylistProcessor::new();
        let mut segments = self.new_segment_processor(-1);

        let mut reload_master = false;
        let mut failed_playlists: u32 = 0;
        let mut empty_playlists: u32 = 0;
        let mut failed_segments: u32 = 0;
        let mut last_sequence: Option<u64> = None;

        let outcome: Result<Terminal, RecorderError> = 'rec: loop {
            if token.is_cancelled() {
                break Ok(Terminal::Cancelled);
            }

            if reload_master {
                media_url = match self.fetcher.resolve_master(channel_url).await {
                    Ok(u) => u,
                    Err(e) => break Err(e.into()),
                };
                playlist = PlaylistProcessor::new();
                let last_section_index = segments.state().section_index;
                segments = self.new_segment_processor(last_section_index);
                last_sequence = None;
                reload_master = false;
            }

            let text = match self.fetcher.fetch_media(&media_url).await {
                Ok(t) => t,
                Err(e) => {
                    failed_playlists += 1;
                    tracing::warn!(error = %e, failed_playlists, "playlist fetch failed");
                    if failed_playlists >= self.config.max_playlist_failures {
                        reload_master = true;
                        failed_playlists = 0;
                        continue 'rec;
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue 'rec;
                }
            };
            failed_playlists = 0;

            let playlist_url = match Url::parse(&media_url) {
                Ok(u) => u,
                Err(e) => break Err(RecorderError::Muxer(format!("invalid media playlist url: {e}"))),
            };

            let media = match m3u8_rs::parse_playlist_res(text.as_bytes()) {
                Ok(m3u8_rs::Playlist::MediaPlaylist(pl)) => pl,
                Ok(m3u8_rs::Playlist::MasterPlaylist(_)) => {
                    reload_master = true;
                    continue 'rec;
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "playlist parse failed, will retry");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue 'rec;
                }
            };

            if media.end_list && self.is_live() {
                reload_master = true;
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue 'rec;
            }

            let target = if media.target_duration > 0.0 {
                media.target_duration as f64
            } else {
                6.0
            };

            let new_segments = playlist.process(&media, &playlist_url);

            if new_segments.is_empty() {
                empty_playlists += 1;
                if empty_playlists >= self.config.max_empty_playlists {
                    reload_master = true;
                    empty_playlists = 0;
                    continue 'rec;
                }
                tokio::time::sleep(Duration::from_secs_f64((target / 2.0).min(3.0))).await;
                continue 'rec;
            }
            empty_playlists = 0;

            for seg in &new_segments {
                if token.is_cancelled() {
                    break;
                }
                if !self.is_live()
                    && let Some(last) = last_sequence
                    && seg.media_sequence <= last
                {
                    continue;
                }

                match segments.process(seg).await {
                    Ok(()) => failed_segments = 0,
                    Err(e) if e.is_fatal() => break 'rec Err(e),
                    Err(e) => {
                        failed_segments += 1;
                        tracing::warn!(error = %e, failed_segments, uri = seg.uri.as_str(), "segment failed");
                        if failed_segments >= self.config.max_segment_failures {
                            break 'rec Err(RecorderError::SegmentFailureThreshold(failed_segments));
                        }
                    }
                }
                last_sequence = Some(seg.media_sequence);
            }

            if media.end_list && !self.is_live() {
                break Ok(Terminal::Complete);
            }

            tokio::time::sleep(Duration::from_secs_f64((target / 2.0).min(3.0))).await;
        };

        segments.shutdown().await?;

        match outcome {
            Ok(Terminal::Complete) => {
                self.publish_stop(StopReason::Complete, None, None);
                Ok(())
            }
            Ok(Terminal::Cancelled) => {
                self.publish_stop(StopReason::Cancel, None, None);
                Ok(())
            }
            Err(e) => {
                self.publish_stop(StopReason::Error, Some(e.error_id()), Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// `initial_section_index` carries the previous processor's last
    /// `section_index` forward across a master-playlist reload, so section
    /// numbering stays monotonic instead of restarting at -1.
    fn new_segment_processor(&self, initial_section_index: i64) -> SegmentProcessor {
        SegmentProcessor::new(
            self.rec_dir.clone(),
            self.recorder_id,
            self.client.clone(),
            self.config.clone(),
            self.events.clone(),
            initial_section_index,
        )
    }
}
