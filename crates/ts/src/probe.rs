//! External-tool probing of a raw segment, mirroring the read-side
//! introspection spec asks of the TS codec: resolution, duration, start PTS,
//! and the PID lists of the elementary streams it contains.

use std::io::Write;
use std::process::Stdio;

use process_utils::std_command;
use serde::Deserialize;
use tracing::warn;

use crate::error::TsError;
use crate::Result;

/// Name of the external probing executable. A real deployment expects an
/// ffprobe-compatible binary on `PATH`.
pub const PROBE_TOOL: &str = "ffprobe";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeResult {
    pub resolution: Option<(u32, u32)>,
    pub duration_ticks: Option<u64>,
    pub start_pts: Option<i64>,
    pub video_pids: Vec<u16>,
    pub audio_pids: Vec<u16>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    start_pts: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Spawn the external probe tool against a temporary copy of `segment` and
/// parse its JSON report into a [`ProbeResult`].
pub fn probe(segment: &[u8]) -> Result<ProbeResult> {
    let mut tmp = tempfile::Builder::new()
        .prefix("segment-probe-")
        .suffix(".ts")
        .tempfile()
        .map_err(|e| TsError::ProbeFailed(e.to_string()))?;
    tmp.write_all(segment)
        .map_err(|e| TsError::ProbeFailed(e.to_string()))?;
    tmp.flush().map_err(|e| TsError::ProbeFailed(e.to_string()))?;

    let output = std_command(PROBE_TOOL)
        .args([
            "-v",
            "error",
            "-show_entries",
            "stream=codec_type,width,height,start_pts",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(tmp.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| TsError::ProbeFailed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TsError::ProbeFailed(stderr.trim().to_string()));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
        warn!("probe: failed to parse ffprobe output: {e}");
        TsError::ProbeParse(e.to_string())
    })?;

    let mut resolution = None;
    let mut video_pids = Vec::new();
    let mut audio_pids = Vec::new();
    let mut start_pts = None;

    for (index, stream) in parsed.streams.iter().enumerate() {
        match stream.codec_type.as_deref() {
            Some("video") => {
                video_pids.push(index as u16);
                if resolution.is_none()
                    && let (Some(w), Some(h)) = (stream.width, stream.height)
                {
                    resolution = Some((w, h));
                }
                if start_pts.is_none() {
                    start_pts = stream.start_pts;
                }
            }
            Some("audio") => audio_pids.push(index as u16),
            _ => {}
        }
    }

    let duration_ticks = parsed
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .map(|seconds| (seconds * 90_000.0).round() as u64);

    Ok(ProbeResult {
        resolution,
        duration_ticks,
        start_pts,
        video_pids,
        audio_pids,
    })
}
