//! Writes `stream.log`: one line per lifecycle event, in the fixed format
//! `HH:MM:SS.mmm <ID> <section:03d>/<segment:03d>: <uri> - <event_tag>`,
//! with `---` standing in for indices that don't apply to an event.

use std::path::PathBuf;

use hls_model::{LifecycleEvent, StopReason};
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

fn index03(value: i64) -> String {
    if value < 0 {
        "---".to_string()
    } else {
        format!("{value:03}")
    }
}

fn format_line(event: &LifecycleEvent) -> String {
    let now = chrono::Local::now().format("%H:%M:%S%.3f");
    let (id, indices, uri, tag) = match event {
        LifecycleEvent::Ready {} => ("-", "---/---".to_string(), "-".to_string(), "ready".to_string()),
        LifecycleEvent::Start {
            url,
            rec_file,
            section_index,
            segment_index,
            recorder_id,
        } => (
            recorder_id.as_str(),
            format!("{}/{:03}", index03(*section_index), segment_index),
            format!("{url} -> {rec_file}"),
            "start".to_string(),
        ),
        LifecycleEvent::Stop {
            reason,
            error_id,
            msg,
            recorder_id,
        } => {
            let tag = match (reason, error_id) {
                (StopReason::Error, Some(id)) => format!("stop:error:{id}"),
                (reason, _) => format!("stop:{reason:?}").to_lowercase(),
            };
            (
                recorder_id.as_str(),
                "---/---".to_string(),
                msg.clone().unwrap_or_else(|| "-".to_string()),
                tag,
            )
        }
    };
    format!("{now} {id} {indices}: {uri} - {tag}\n")
}

/// Drains lifecycle events from `rx` into `<rec_dir>/stream.log` until the
/// channel is closed. Intended to be spawned as its own task for the
/// lifetime of one recording.
pub async fn run(mut rx: broadcast::Receiver<LifecycleEvent>, rec_dir: PathBuf) -> std::io::Result<()> {
    let path = rec_dir.join("stream.log");
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;

    loop {
        match rx.recv().await {
            Ok(event) => {
                file.write_all(format_line(&event).as_bytes()).await?;
                file.flush().await?;
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_model::RecorderId;

    #[test]
    fn ready_event_uses_placeholder_indices() {
        let line = format_line(&LifecycleEvent::Ready {});
        assert!(line.contains("---/---: - - ready"));
    }

    #[test]
    fn start_event_formats_zero_padded_indices() {
        let ev = LifecycleEvent::start("https://cdn/live.m3u8", "stream_0.ts", 0, 7, RecorderId::HlsLive);
        let line = format_line(&ev);
        assert!(line.contains("000/007:"));
        assert!(line.contains("hls_live"));
    }

    #[test]
    fn stop_error_event_includes_error_id() {
        let ev = LifecycleEvent::stop(
            StopReason::Error,
            Some("drm_protected".to_string()),
            Some("widevine detected".to_string()),
            RecorderId::HlsLive,
        );
        let line = format_line(&ev);
        assert!(line.contains("stop:error:drm_protected"));
        assert!(line.contains("widevine detected"));
    }
}
