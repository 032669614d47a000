//! Operator-facing logging: stderr for interactive use, a daily-rotating
//! debug file under `log_dir` for post-mortem. Distinct from the
//! per-recording `stream.log` in [`crate::stream_log`], which follows its
//! own fixed line format rather than `tracing`'s layout.

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global `tracing` subscriber. The returned guard must be
/// held for the process lifetime; dropping it stops the non-blocking file
/// writer from flushing.
pub fn init_logging(log_dir: &std::path::Path, verbose: bool, quiet: bool) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "hls-recorder.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_level(true))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}
