use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Live/VOD HLS recording engine.
#[derive(Debug, Parser)]
#[command(name = "hls-recorder", version, about)]
pub struct Args {
    /// Master or media playlist URL to record.
    pub channel_url: String,

    /// Directory to write section files and the stream log into. Created if
    /// it does not already exist.
    #[arg(long, default_value = "recording")]
    pub rec_dir: PathBuf,

    /// Optional TOML config file overriding the built-in defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Recorder variant tag carried on published lifecycle events.
    #[arg(long, value_enum, default_value = "hls-live")]
    pub recorder_id: RecorderIdArg,

    /// Segments processed before the client is told playback may begin.
    /// Overrides the value from `--config`.
    #[arg(long)]
    pub buffering_threshold: Option<u64>,

    /// Directory for the rotating operator debug log (separate from
    /// `stream.log` in `--rec-dir`).
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,

    #[arg(short, long)]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RecorderIdArg {
    HlsBasic,
    HlsLive,
    HlsM4s,
    Mp4,
}

impl From<RecorderIdArg> for hls_model::RecorderId {
    fn from(value: RecorderIdArg) -> Self {
        match value {
            RecorderIdArg::HlsBasic => hls_model::RecorderId::HlsBasic,
            RecorderIdArg::HlsLive => hls_model::RecorderId::HlsLive,
            RecorderIdArg::HlsM4s => hls_model::RecorderId::HlsM4s,
            RecorderIdArg::Mp4 => hls_model::RecorderId::Mp4,
        }
    }
}
