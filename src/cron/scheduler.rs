//! Polling scheduler for recurring detection cycles.
//!
//! Every tick fetches a fresh snapshot for each configured pool and runs it
//! through the detector. Pools are processed concurrently; a pool whose
//! source is unavailable is parked for `failure_backoff_secs`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use log::{info, warn};
use moka::future::Cache;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;

use crate::config::PollingSettings;
use crate::detector::WhaleActivityDetector;
use crate::errors::{ConfigurationError, DetectionError};
use crate::sink::EventSink;
use crate::source::PoolSnapshotSource;

use super::jobs::detection_cycle::{self, CycleOutcome};

/// Drives fetch + detection cycles across the configured pool set.
#[derive(Clone)]
pub struct PollingScheduler {
    detector: WhaleActivityDetector,
    source: Arc<dyn PoolSnapshotSource>,
    sink: Arc<dyn EventSink>,
    settings: Arc<PollingSettings>,
    /// Pools whose source recently failed; entries expire after the backoff period
    backoff: Cache<String, ()>,
}

impl PollingScheduler {
    pub fn new(
        detector: WhaleActivityDetector,
        source: Arc<dyn PoolSnapshotSource>,
        sink: Arc<dyn EventSink>,
        settings: PollingSettings,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        let backoff = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(Duration::from_secs(settings.failure_backoff_secs.max(1)))
            .build();

        Ok(Self {
            detector,
            source,
            sink,
            settings: Arc::new(settings),
            backoff,
        })
    }

    /// Starts polling and runs until cancellation.
    ///
    /// One cycle runs immediately so every pool has a baseline before the
    /// first scheduled tick.
    pub async fn run(&self, cancellation_token: CancellationToken) -> Result<()> {
        let mut scheduler = JobScheduler::new().await?;
        self.register_poll_job(&scheduler, cancellation_token.clone())
            .await?;

        self.poll_once(&cancellation_token).await;

        scheduler.start().await?;
        info!(
            "Polling scheduler started for {} pools",
            self.settings.pools.len()
        );

        cancellation_token.cancelled().await;
        info!("Polling scheduler shutting down...");

        scheduler.shutdown().await?;
        Ok(())
    }

    async fn register_poll_job(
        &self,
        scheduler: &JobScheduler,
        cancellation_token: CancellationToken,
    ) -> Result<()> {
        let interval = self.settings.interval_secs;
        let poller = self.clone();

        let job = Job::new_repeated_async(Duration::from_secs(interval), move |_uuid, _lock| {
            let poller = poller.clone();
            let token = cancellation_token.clone();
            Box::pin(async move {
                poller.poll_once(&token).await;
            })
        })?;

        scheduler.add(job).await?;
        info!("Registered pool polling job (every {}s)", interval);
        Ok(())
    }

    /// Run one cycle for every configured pool, concurrently.
    ///
    /// Returns each pool's outcome in configuration order.
    pub async fn poll_once(
        &self,
        cancellation_token: &CancellationToken,
    ) -> Vec<(String, CycleOutcome)> {
        let start = std::time::Instant::now();
        let fetch_timeout = Duration::from_millis(self.settings.fetch_timeout_ms);

        let cycles = self.settings.pools.iter().map(|pool| async move {
            if self.backoff.contains_key(pool) {
                return (pool.clone(), CycleOutcome::BackedOff);
            }

            let outcome = detection_cycle::run(
                &self.detector,
                self.source.as_ref(),
                self.sink.as_ref(),
                pool,
                fetch_timeout,
                cancellation_token,
            )
            .await;

            if outcome.should_back_off() && self.settings.failure_backoff_secs > 0 {
                self.backoff.insert(pool.clone(), ()).await;
            }

            (pool.clone(), outcome)
        });

        let outcomes = join_all(cycles).await;
        log_summary(&outcomes, start.elapsed());
        outcomes
    }
}

fn log_summary(outcomes: &[(String, CycleOutcome)], elapsed: Duration) {
    let mut emitted = 0;
    let mut quiet = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for (_, outcome) in outcomes {
        match outcome {
            CycleOutcome::Emitted { .. } => emitted += 1,
            CycleOutcome::Quiet => quiet += 1,
            CycleOutcome::BackedOff
            | CycleOutcome::Cancelled
            | CycleOutcome::Rejected(DetectionError::OutOfOrderSnapshot { .. }) => skipped += 1,
            _ => failed += 1,
        }
    }

    if failed > 0 {
        warn!(
            "Polled {} pools in {:?}: {} events, {} quiet, {} failed, {} skipped",
            outcomes.len(),
            elapsed,
            emitted,
            quiet,
            failed,
            skipped
        );
    } else {
        info!(
            "Polled {} pools in {:?}: {} events, {} quiet, {} skipped",
            outcomes.len(),
            elapsed,
            emitted,
            quiet,
            skipped
        );
    }
}
