use std::collections::VecDeque;

use crate::key::EncryptionInfo;

/// Carries everything the playlist processor must remember between
/// successive refreshes of the same media playlist.
#[derive(Debug, Clone)]
pub struct PlaylistState {
    pub media_sequence: Option<u64>,
    pub discontinuity_sequence: Option<u64>,
    pub playlist_type: Option<String>,
    pub endlist_seen: bool,
    pub target_duration: Option<u64>,
    /// Last `#EXT-X-KEY` seen, carried across refreshes until superseded.
    pub current_key: EncryptionInfo,
    /// Ordered, deduplicated window of recently emitted URIs. Bounded to
    /// `min(#EXTINF, 500)`; only grows/shrinks via [`PlaylistState::resize_window`].
    window: VecDeque<String>,
    window_cap: usize,
}

impl Default for PlaylistState {
    fn default() -> Self {
        Self {
            media_sequence: None,
            discontinuity_sequence: None,
            playlist_type: None,
            endlist_seen: false,
            target_duration: None,
            current_key: EncryptionInfo::none(),
            window: VecDeque::new(),
            window_cap: 0,
        }
    }
}

impl PlaylistState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes the dedup window's capacity, preserving existing entries in
    /// order and trimming from the front only when the new capacity is
    /// smaller than the current occupancy.
    pub fn resize_window(&mut self, extinf_count: usize) {
        self.window_cap = extinf_count.min(500);
        while self.window.len() > self.window_cap {
            self.window.pop_front();
        }
    }

    pub fn window_cap(&self) -> usize {
        self.window_cap
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.window.iter().any(|u| u == uri)
    }

    /// Records `uri` as emitted, evicting the oldest entry if the window is
    /// at capacity.
    pub fn record(&mut self, uri: String) {
        if self.window_cap == 0 {
            return;
        }
        if self.window.len() >= self.window_cap {
            self.window.pop_front();
        }
        self.window.push_back(uri);
    }

    pub fn clear_window(&mut self) {
        self.window.clear();
    }
}
