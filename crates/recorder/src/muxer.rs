use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};

use crate::error::RecorderError;

/// External TS remultiplexer binary. Repairs stream continuity (PAT/PMT,
/// PCR cadence) for content segments; filler segments bypass it entirely.
pub const MUXER_TOOL: &str = "ffmpeg";

/// A write-only sink to the current section file: either a direct append
/// (filler path) or a pipe through an external remultiplexer (content
/// path). Both variants flush after every write.
pub enum MuxerSink {
    Direct { file: File },
    Multiplexer { child: Child, stdin: ChildStdin },
}

impl MuxerSink {
    pub async fn open_direct(path: &Path) -> Result<Self, RecorderError> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(MuxerSink::Direct { file })
    }

    /// Spawns the remultiplexer writing MPEG-TS to `output_path`: raw TS on
    /// stdin, audio+video copy, corrupt packets discarded, timestamps
    /// regenerated, immediate flush.
    pub async fn open_multiplexer(output_path: &Path) -> Result<Self, RecorderError> {
        let mut cmd = process_utils::tokio_command(MUXER_TOOL);
        cmd.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-fflags",
            "+discardcorrupt+genpts+igndts+ignidx+nofillin",
            "-f",
            "mpegts",
            "-i",
            "pipe:0",
            "-c",
            "copy",
            "-map",
            "0:v?",
            "-map",
            "0:a?",
            "-f",
            "mpegts",
            "-y",
        ]);
        cmd.arg(output_path);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| RecorderError::Muxer(format!("failed to spawn {MUXER_TOOL}: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| RecorderError::Muxer("multiplexer stdin unavailable".into()))?;

        Ok(MuxerSink::Multiplexer { child, stdin })
    }

    pub async fn write(&mut self, data: &Bytes) -> Result<(), RecorderError> {
        match self {
            MuxerSink::Direct { file } => {
                file.write_all(data).await?;
                file.flush().await?;
            }
            MuxerSink::Multiplexer { stdin, .. } => {
                stdin.write_all(data).await?;
                stdin.flush().await?;
            }
        }
        Ok(())
    }

    /// Shuts the sink down. For the multiplexer variant, closes stdin and
    /// waits up to `drain_timeout` for a clean exit; a child that doesn't
    /// exit in time is killed.
    pub async fn close(self, drain_timeout: Duration) -> Result<(), RecorderError> {
        match self {
            MuxerSink::Direct { mut file } => {
                file.flush().await?;
                Ok(())
            }
            MuxerSink::Multiplexer { mut child, stdin } => {
                drop(stdin);
                match tokio::time::timeout(drain_timeout, child.wait()).await {
                    Ok(Ok(_status)) => Ok(()),
                    Ok(Err(e)) => Err(RecorderError::Muxer(format!("multiplexer wait failed: {e}"))),
                    Err(_timeout) => {
                        tracing::warn!("multiplexer did not exit within {:?}, killing", drain_timeout);
                        let _ = child.kill().await;
                        Ok(())
                    }
                }
            }
        }
    }
}

/// Builds the path for a numbered section file in `rec_dir`.
pub fn section_path(rec_dir: &Path, section_index: i64) -> PathBuf {
    rec_dir.join(format!("stream_{section_index}.ts"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_append_writes_bytes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = section_path(dir.path(), 0);
        let mut sink = MuxerSink::open_direct(&path).await.unwrap();
        sink.write(&Bytes::from_static(b"hello")).await.unwrap();
        sink.write(&Bytes::from_static(b"world")).await.unwrap();
        sink.close(Duration::from_secs(1)).await.unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, b"helloworld");
    }

    #[test]
    fn section_path_is_numbered() {
        let dir = Path::new("/tmp/rec");
        assert_eq!(section_path(dir, 3), Path::new("/tmp/rec/stream_3.ts"));
    }
}
