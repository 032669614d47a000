use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hls_model::key::EncryptionMethod;
use hls_model::{LifecycleEvent, RecorderConfig, RecorderId, RecorderState, SegmentDescriptor};

use crate::error::RecorderError;
use crate::events::EventBus;
use crate::muxer::{self, MuxerSink};

/// Bundled filler clip spliced in when a short filler section is about to
/// be replaced by a new section. Looked up relative to the working
/// directory; a missing or unreadable asset degrades to an empty section
/// rather than failing the recording.
const BUMPER_ASSET_PATH: &str = "assets/bumper.ts";

/// Sentinel carried as the `url` of a bumper `start` event, in place of a
/// real segment URI.
const BUMPER_URL: &str = "bumper-file";

/// Per-recording segment processor: download, decrypt, validate, probe,
/// section-boundary detection, timestamp/CC rewriting and write-out.
///
/// Exclusively owns [`RecorderState`]; nothing else mutates it.
pub struct SegmentProcessor {
    rec_dir: PathBuf,
    recorder_id: RecorderId,
    client: reqwest::Client,
    key_fetcher: hls_crypto::KeyFetcher,
    key_cache: HashMap<String, [u8; 16]>,
    config: RecorderConfig,
    events: Arc<EventBus>,
    state: RecorderState,
    sink: Option<MuxerSink>,
}

impl SegmentProcessor {
    /// `initial_section_index` seeds `RecorderState::section_index` so that,
    /// after a master-playlist reload, section numbering continues from
    /// where the previous processor left off instead of restarting at -1.
    pub fn new(
        rec_dir: PathBuf,
        recorder_id: RecorderId,
        client: reqwest::Client,
        config: RecorderConfig,
        events: Arc<EventBus>,
        initial_section_index: i64,
    ) -> Self {
        let key_fetcher = hls_crypto::KeyFetcher::new(client.clone(), config.key_timeout.as_duration());
        let mut state = RecorderState::new();
        state.section_index = initial_section_index;
        Self {
            rec_dir,
            recorder_id,
            client,
            key_fetcher,
            key_cache: HashMap::new(),
            config,
            events,
            state,
            sink: None,
        }
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Closes any open muxer sink. Called on recorder stop.
    pub async fn shutdown(&mut self) -> Result<(), RecorderError> {
        if let Some(sink) = self.sink.take() {
            sink.close(self.config.muxer_drain_timeout.as_duration()).await?;
        }
        Ok(())
    }

    /// Processes one segment descriptor end to end. `Err` with
    /// [`RecorderError::is_fatal`] true must terminate the whole recording;
    /// any other `Err` should just count against the segment-failure
    /// threshold.
    pub async fn process(&mut self, seg: &SegmentDescriptor) -> Result<(), RecorderError> {
        let raw = self.download(seg).await?;
        let data = self.decrypt(seg, raw).await?;

        if !ts::is_valid_ts(&data) {
            if drm_indicated(seg) {
                return Err(RecorderError::DrmProtected);
            }
            return Err(RecorderError::Muxer("segment failed TS validation".into()));
        }

        let probe = ts::probe(&data)?;
        let current_pts = probe.start_pts.ok_or(RecorderError::MissingPts)?;
        let duration_ticks = probe
            .duration_ticks
            .unwrap_or(seg.duration_ticks.max(1));

        let filler = hls_model::is_filler_uri(&seg.uri);
        let is_new_section = self.is_section_boundary(&seg.uri, probe.resolution, filler);

        if is_new_section {
            self.transition_section(seg, current_pts, filler).await?;
        }

        let my_segment_index = self.state.segment_index;

        if my_segment_index > 0 {
            self.state.continuous_pts += self.state.previous_duration_ticks as i64;
        }
        self.state.offset = self.state.continuous_pts - current_pts;

        let mut out = data;
        if filler {
            out = ts::shift_segment(&out, self.state.offset)?;
            out = ts::update_continuity_counters(&out, &mut self.state.cc_map);
        }
        if seg.discontinuity {
            out = ts::set_discontinuity_indicator(&out);
        }

        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| RecorderError::Muxer("no open section sink".into()))?;
        sink.write(&Bytes::from(out)).await?;

        if !self.state.buffering_completed && my_segment_index == self.config.buffering_threshold {
            self.publish_start(seg.uri.clone());
            self.state.buffering_completed = true;
        }

        self.state.previous_uri = Some(seg.uri.clone());
        self.state.previous_resolution = probe.resolution.or(self.state.previous_resolution);
        self.state.previous_filler = filler;
        self.state.previous_pts = Some(current_pts);
        self.state.previous_duration_ticks = duration_ticks;
        self.state.segment_index += 1;

        Ok(())
    }

    /// Retries a failing GET up to `config.segment_max_attempts` times, 1s
    /// apart. A DRM indicator on the URL or response short-circuits the
    /// retry loop immediately, since retrying won't change the outcome.
    async fn download(&self, seg: &SegmentDescriptor) -> Result<Bytes, RecorderError> {
        let attempts = self.config.segment_max_attempts.max(1);
        let mut last_err = String::new();

        for attempt in 0..attempts {
            let response = self
                .client
                .get(&seg.uri)
                .timeout(self.config.segment_timeout.as_duration())
                .send()
                .await;

            match response {
                Ok(r) if r.status().is_success() => {
                    return r
                        .bytes()
                        .await
                        .map_err(|e| RecorderError::Muxer(format!("segment body read failed: {e}")));
                }
                Ok(r) => {
                    if drm_indicated(seg) {
                        return Err(RecorderError::DrmProtected);
                    }
                    last_err = format!("segment fetch {} returned HTTP {}", seg.uri, r.status());
                }
                Err(e) => {
                    if drm_indicated(seg) {
                        return Err(RecorderError::DrmProtected);
                    }
                    last_err = format!("segment fetch {} failed: {e}", seg.uri);
                }
            }

            if attempt + 1 < attempts {
                tracing::debug!(uri = seg.uri.as_str(), attempt = attempt + 1, "segment download failed, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }

        Err(RecorderError::Muxer(last_err))
    }

    async fn decrypt(&mut self, seg: &SegmentDescriptor, raw: Bytes) -> Result<Bytes, RecorderError> {
        if !seg.encryption.is_encrypted() {
            return Ok(raw);
        }
        if matches!(seg.encryption.method, EncryptionMethod::Unsupported) {
            return Err(RecorderError::DrmProtected);
        }
        let key_uri = seg
            .encryption
            .key_uri
            .clone()
            .ok_or_else(|| RecorderError::Muxer("AES-128 key method with no URI".into()))?;

        let key = if let Some(k) = self.key_cache.get(&key_uri) {
            *k
        } else {
            let k = self.key_fetcher.fetch_key(&key_uri).await?;
            self.key_cache.insert(key_uri.clone(), k);
            k
        };

        hls_crypto::decrypt(raw, &key, &seg.encryption, seg.media_sequence).map_err(RecorderError::from)
    }

    fn is_section_boundary(
        &self,
        uri: &str,
        resolution: Option<(u32, u32)>,
        filler: bool,
    ) -> bool {
        let Some(prev_uri) = &self.state.previous_uri else {
            return true;
        };
        if !hls_playlist::directory_differs(prev_uri, uri) {
            return false;
        }
        let resolution_changed = resolution.is_some()
            && resolution != self.state.previous_resolution
            && self.state.previous_resolution.is_some();
        let filler_changed = filler != self.state.previous_filler;
        resolution_changed || filler_changed
    }

    async fn transition_section(
        &mut self,
        seg: &SegmentDescriptor,
        current_pts: i64,
        filler: bool,
    ) -> Result<(), RecorderError> {
        let bumper = self.should_insert_bumper(filler);

        if let Some(sink) = self.sink.take() {
            sink.close(self.config.muxer_drain_timeout.as_duration()).await?;
        }

        if bumper {
            self.insert_bumper().await?;
        }

        let section_file = muxer::section_path(&self.rec_dir, self.state.section_index + 1);
        self.state.start_section(current_pts, section_file.clone());

        self.sink = Some(if filler {
            MuxerSink::open_direct(&section_file).await?
        } else {
            MuxerSink::open_multiplexer(&section_file).await?
        });

        if self.state.buffering_completed {
            self.publish_start(seg.uri.clone());
        }
        Ok(())
    }

    /// Writes the bundled bumper clip into the just-closed (still
    /// previous-indexed) section file in place, and announces it with a
    /// `start` event naming it explicitly rather than a real segment URI.
    /// Called before `state.start_section` advances the indices, so
    /// `self.state` here still names the section being replaced.
    async fn insert_bumper(&mut self) -> Result<(), RecorderError> {
        let Some(section_file) = self.state.current_section_file.clone() else {
            return Ok(());
        };
        let bumper_data = load_bumper_asset().await;
        tracing::info!(bytes = bumper_data.len(), path = %section_file.display(), "inserting bumper file");
        tokio::fs::write(&section_file, &bumper_data).await?;
        self.publish_start(BUMPER_URL);
        Ok(())
    }

    /// Previous section ended with fewer than `bumper_threshold_segments`
    /// filler segments and buffering was already completed: replace it with
    /// a bumper instead of opening a third short-lived file.
    fn should_insert_bumper(&self, _incoming_filler: bool) -> bool {
        self.state.buffering_completed
            && self.state.previous_filler
            && self.state.segment_index < self.config.bumper_threshold_segments
            && self.state.section_index >= 0
    }

    fn publish_start(&self, url: impl Into<String>) {
        let file = self
            .state
            .current_section_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.events.publish(LifecycleEvent::start(
            url.into(),
            file,
            self.state.section_index,
            self.state.segment_index,
            self.recorder_id,
        ));
    }
}

/// Reads the bundled bumper clip. Missing or unreadable asset degrades to
/// an empty section rather than failing the recording.
async fn load_bumper_asset() -> Vec<u8> {
    match tokio::fs::read(BUMPER_ASSET_PATH).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(path = BUMPER_ASSET_PATH, error = %e, "failed to read bumper asset");
            Vec::new()
        }
    }
}

fn drm_indicated(seg: &SegmentDescriptor) -> bool {
    if drm::detect_in_url(&seg.uri).has_drm() {
        return true;
    }
    if let Some(key_uri) = &seg.encryption.key_uri {
        if matches!(seg.encryption.method, EncryptionMethod::Unsupported) {
            return true;
        }
        if drm::detect_in_url(key_uri).has_drm() {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_model::key::EncryptionInfo;

    fn processor() -> SegmentProcessor {
        SegmentProcessor::new(
            PathBuf::from("/tmp/rec"),
            RecorderId::HlsLive,
            reqwest::Client::new(),
            RecorderConfig::default(),
            Arc::new(EventBus::default()),
            -1,
        )
    }

    fn seg(uri: &str) -> SegmentDescriptor {
        SegmentDescriptor {
            uri: uri.to_string(),
            media_sequence: 0,
            encryption: EncryptionInfo::none(),
            duration_ticks: 540_000,
            discontinuity: false,
        }
    }

    #[test]
    fn first_segment_is_always_a_section_boundary() {
        let p = processor();
        assert!(p.is_section_boundary("https://cdn.example.com/live/seg0.ts", Some((1280, 720)), false));
    }

    #[test]
    fn same_directory_same_resolution_same_filler_state_is_not_a_boundary() {
        let mut p = processor();
        p.state.previous_uri = Some("https://cdn.example.com/live/seg0.ts".to_string());
        p.state.previous_resolution = Some((1280, 720));
        p.state.previous_filler = false;
        assert!(!p.is_section_boundary("https://cdn.example.com/live/seg1.ts", Some((1280, 720)), false));
    }

    #[test]
    fn directory_change_alone_without_resolution_or_filler_change_is_not_a_boundary() {
        let mut p = processor();
        p.state.previous_uri = Some("https://cdn.example.com/live/seg0.ts".to_string());
        p.state.previous_resolution = Some((1280, 720));
        p.state.previous_filler = false;
        assert!(!p.is_section_boundary("https://cdn.example.com/other/seg1.ts", Some((1280, 720)), false));
    }

    #[test]
    fn directory_change_plus_filler_transition_is_a_boundary() {
        let mut p = processor();
        p.state.previous_uri = Some("https://cdn.example.com/content/seg0.ts".to_string());
        p.state.previous_resolution = Some((1280, 720));
        p.state.previous_filler = false;
        assert!(p.is_section_boundary(
            "https://cdn.example.com/filler/_ad_bumper_0.ts",
            Some((1280, 720)),
            true
        ));
    }

    #[test]
    fn bumper_inserted_only_when_buffering_done_and_short_filler_section() {
        let mut p = processor();
        p.state.buffering_completed = true;
        p.state.previous_filler = true;
        p.state.segment_index = 2;
        p.state.section_index = 0;
        assert!(p.should_insert_bumper(false));

        p.state.segment_index = 3;
        assert!(!p.should_insert_bumper(false));
    }

    #[test]
    fn bumper_not_inserted_before_buffering_completes() {
        let mut p = processor();
        p.state.buffering_completed = false;
        p.state.previous_filler = true;
        p.state.segment_index = 1;
        p.state.section_index = 0;
        assert!(!p.should_insert_bumper(false));
    }

    #[test]
    fn initial_section_index_seeds_state() {
        let p = SegmentProcessor::new(
            PathBuf::from("/tmp/rec"),
            RecorderId::HlsLive,
            reqwest::Client::new(),
            RecorderConfig::default(),
            Arc::new(EventBus::default()),
            4,
        );
        assert_eq!(p.state().section_index, 4);
    }

    #[tokio::test]
    async fn bumper_writes_asset_into_old_section_file_and_announces_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = SegmentProcessor::new(
            dir.path().to_path_buf(),
            RecorderId::HlsLive,
            reqwest::Client::new(),
            RecorderConfig::default(),
            Arc::new(EventBus::default()),
            -1,
        );

        let old_file = dir.path().join("stream_0.ts");
        std::fs::write(&old_file, b"old content").unwrap();
        p.state.section_index = 0;
        p.state.segment_index = 2;
        p.state.current_section_file = Some(old_file.clone());
        p.state.buffering_completed = true;
        p.state.previous_filler = true;

        let mut rx = p.events.subscribe();
        p.insert_bumper().await.unwrap();

        // no bundled asset in the test environment, so the old file ends up
        // truncated rather than left with its previous section content.
        let contents = std::fs::read(&old_file).unwrap();
        assert!(contents.is_empty());

        match rx.try_recv().unwrap() {
            LifecycleEvent::Start {
                url,
                section_index,
                segment_index,
                ..
            } => {
                assert_eq!(url, BUMPER_URL);
                assert_eq!(section_index, 0);
                assert_eq!(segment_index, 2);
            }
            other => panic!("expected Start event, got {other:?}"),
        }
    }

    #[test]
    fn drm_indicated_true_for_widevine_key_uri() {
        let mut s = seg("https://cdn.example.com/content/seg0.ts");
        s.encryption = EncryptionInfo {
            method: EncryptionMethod::Unsupported,
            key_uri: Some("https://drm.example.com/widevine/license".to_string()),
            iv: None,
        };
        assert!(drm_indicated(&s));
    }

    #[test]
    fn drm_not_indicated_for_plain_segment() {
        let s = seg("https://cdn.example.com/content/seg0.ts");
        assert!(!drm_indicated(&s));
    }
}
