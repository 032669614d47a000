use serde::Serialize;

use crate::recorder_state::RecorderId;

/// Why a recording's terminal `stop` event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Complete,
    Error,
    Cancel,
}

/// Events published on the client event bus. Ordering contract: `Start`
/// always precedes the recording's terminal `Stop`; exactly one terminal
/// `Stop` is ever emitted per recording.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Ready {},
    Start {
        url: String,
        rec_file: String,
        section_index: i64,
        segment_index: u64,
        recorder_id: &'static str,
    },
    Stop {
        reason: StopReason,
        error_id: Option<String>,
        msg: Option<String>,
        recorder_id: &'static str,
    },
}

impl LifecycleEvent {
    pub fn start(
        url: impl Into<String>,
        rec_file: impl Into<String>,
        section_index: i64,
        segment_index: u64,
        recorder_id: RecorderId,
    ) -> Self {
        LifecycleEvent::Start {
            url: url.into(),
            rec_file: rec_file.into(),
            section_index,
            segment_index,
            recorder_id: recorder_id.as_str(),
        }
    }

    pub fn stop(
        reason: StopReason,
        error_id: Option<String>,
        msg: Option<String>,
        recorder_id: RecorderId,
    ) -> Self {
        LifecycleEvent::Stop {
            reason,
            error_id,
            msg,
            recorder_id: recorder_id.as_str(),
        }
    }

    /// Length-prefixed JSON framing: a 4-byte big-endian length followed by
    /// that many bytes of UTF-8 JSON. Returns `None` if the encoded payload
    /// would exceed 100 MiB (never expected for these small events, but the
    /// limit is part of the contract for any transport).
    pub fn frame(&self) -> Option<Vec<u8>> {
        let body = serde_json::to_vec(self).ok()?;
        if body.len() > 100 * 1024 * 1024 {
            return None;
        }
        let mut framed = Vec::with_capacity(4 + body.len());
        framed.extend_from_slice(&(body.len() as u32).to_be_bytes());
        framed.extend_from_slice(&body);
        Some(framed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_roundtrips_length_prefix() {
        let ev = LifecycleEvent::Ready {};
        let framed = ev.frame().unwrap();
        let len = u32::from_be_bytes(framed[0..4].try_into().unwrap()) as usize;
        assert_eq!(len, framed.len() - 4);
    }
}
