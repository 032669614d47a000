use std::collections::HashMap;
use std::path::PathBuf;

/// Tag identifying which pipeline variant is driving a recording. This spec
/// fully covers `HlsBasic` and `HlsLive`; the others are external
/// collaborators recognized only so events can carry the right tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecorderId {
    HlsBasic,
    HlsLive,
    HlsM4s,
    Mp4,
}

impl RecorderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderId::HlsBasic => "hls_basic",
            RecorderId::HlsLive => "hls_live",
            RecorderId::HlsM4s => "hls_m4s",
            RecorderId::Mp4 => "mp4",
        }
    }
}

/// Mutable state exclusively owned by the segment processor for the
/// duration of one recording.
#[derive(Debug, Clone)]
pub struct RecorderState {
    pub section_index: i64,
    pub segment_index: u64,
    pub continuous_pts: i64,
    pub offset: i64,
    pub cc_map: HashMap<u16, u8>,
    pub previous_uri: Option<String>,
    pub previous_resolution: Option<(u32, u32)>,
    pub previous_filler: bool,
    pub previous_pts: Option<i64>,
    pub previous_duration_ticks: u64,
    pub buffering_completed: bool,
    pub current_section_file: Option<PathBuf>,
}

impl Default for RecorderState {
    fn default() -> Self {
        Self {
            section_index: -1,
            segment_index: 0,
            continuous_pts: 0,
            offset: 0,
            cc_map: HashMap::new(),
            previous_uri: None,
            previous_resolution: None,
            previous_filler: false,
            previous_pts: None,
            previous_duration_ticks: 0,
            buffering_completed: false,
            current_section_file: None,
        }
    }
}

impl RecorderState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins a new section: bumps `section_index`, resets per-section
    /// bookkeeping. `continuous_pts` starts at `current_pts` of the first
    /// segment of the new section.
    pub fn start_section(&mut self, current_pts: i64, section_file: PathBuf) {
        self.section_index += 1;
        self.segment_index = 0;
        self.continuous_pts = current_pts;
        self.offset = 0;
        self.cc_map.clear();
        self.current_section_file = Some(section_file);
    }
}
