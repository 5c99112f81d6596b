use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use riptide::{
    FanoutSink, JsonFileSource, LogSink, PollingScheduler, RedpandaSink, Settings, SnapshotStore,
    WhaleActivityDetector,
};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .context("Failed to initialize logger")?;

    // Invalid thresholds abort here, before any detection runs
    let settings = Settings::new()
        .context("Failed to load config.yaml. Please ensure it exists and is valid")?;

    let store = Arc::new(SnapshotStore::new());
    let detector = WhaleActivityDetector::new(&settings.detector, store)
        .context("Invalid detector settings")?;

    let source = JsonFileSource::new(&settings.source.snapshot_dir);
    info!("Reading pool snapshots from {}", source.dir().display());

    let mut sink = FanoutSink::new().with(Arc::new(LogSink));
    if let Some(redpanda) = settings.redpanda.as_ref().and_then(RedpandaSink::new) {
        sink = sink.with(Arc::new(redpanda));
    }
    info!("Whale events fan out to {} sinks", sink.len());

    let scheduler = PollingScheduler::new(
        detector,
        Arc::new(source),
        Arc::new(sink),
        settings.polling.clone(),
    )
    .context("Invalid polling settings")?;

    let cancellation_token = CancellationToken::new();

    let scheduler_token = cancellation_token.child_token();
    let scheduler_handle = tokio::spawn(async move {
        if let Err(e) = scheduler.run(scheduler_token).await {
            error!("Polling scheduler failed: {:#}", e);
        }
    });

    info!(
        "Watching {} pools for whale activity (every {}s)",
        settings.polling.pools.len(),
        settings.polling.interval_secs
    );

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Detector running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
            _ = sigterm_stream.recv() => {
                info!("Received SIGTERM, exiting gracefully...");
            },
        };
    }

    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            },
        };
    }

    cancellation_token.cancel();

    info!("Waiting for polling scheduler to stop...");
    let _ = scheduler_handle.await;

    info!("Shutdown complete");
    Ok(())
}
