mod cli;
mod config;
mod logging;
mod stream_log;

use std::sync::Arc;

use clap::Parser;
use pipeline_common::CancellationToken;
use recorder::{EventBus, RecorderLoop};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let _log_guard = logging::init_logging(&args.log_dir, args.verbose, args.quiet)?;

    if let Err(e) = run(args).await {
        tracing::error!(error = %e, "recording failed");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: cli::Args) -> anyhow::Result<()> {
    std::fs::create_dir_all(&args.rec_dir)?;

    let recorder_config = config::load(&args)?;
    let recorder_id = hls_model::RecorderId::from(args.recorder_id);
    let client = reqwest::Client::builder().build()?;
    let events = Arc::new(EventBus::default());

    let stream_log_task = tokio::spawn(stream_log::run(events.subscribe(), args.rec_dir.clone()));

    let token = CancellationToken::new();
    let cancel_token = token.clone();
    let signal_task = tokio::spawn(async move {
        wait_for_shutdown().await;
        tracing::info!("shutdown signal received, cancelling recording");
        cancel_token.cancel();
    });

    let recorder_loop = RecorderLoop::new(client, recorder_config, events.clone(), recorder_id, args.rec_dir.clone());
    let result = recorder_loop.run(&args.channel_url, token).await;

    signal_task.abort();
    drop(recorder_loop);
    drop(events);
    let _ = stream_log_task.await;

    result?;
    Ok(())
}

async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
