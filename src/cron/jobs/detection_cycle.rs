//! One fetch → compare → store cycle for a single pool.
//!
//! The only suspension points are the snapshot fetch and the hand-off to the
//! sink. Once a snapshot is in hand, detection runs synchronously under the
//! pool's baseline lock.

use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::detector::WhaleActivityDetector;
use crate::errors::{DetectionError, SourceError};
use crate::models::{PoolSnapshot, RiskLevel};
use crate::sink::EventSink;
use crate::source::PoolSnapshotSource;

/// What happened to one pool in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Baseline seeded or advanced without a significant change
    Quiet,
    Emitted { event_id: Uuid, risk_level: RiskLevel },
    Rejected(DetectionError),
    SourceFailed(SourceError),
    TimedOut,
    Cancelled,
    /// Skipped while the pool's source is backing off
    BackedOff,
}

impl CycleOutcome {
    /// Whether the pool's source should be parked for a while.
    pub fn should_back_off(&self) -> bool {
        matches!(
            self,
            CycleOutcome::TimedOut | CycleOutcome::SourceFailed(SourceError::Unavailable { .. })
        )
    }
}

/// Fetch a fresh snapshot of `pool_address` and run detection on it.
///
/// A fetch that times out or is cancelled never reaches the detector, so the
/// pool's baseline is untouched.
pub async fn run(
    detector: &WhaleActivityDetector,
    source: &dyn PoolSnapshotSource,
    sink: &dyn EventSink,
    pool_address: &str,
    fetch_timeout: Duration,
    cancellation_token: &CancellationToken,
) -> CycleOutcome {
    let fetched = tokio::select! {
        _ = cancellation_token.cancelled() => return CycleOutcome::Cancelled,
        res = tokio::time::timeout(fetch_timeout, source.fetch_snapshot(pool_address)) => res,
    };

    let snapshot = match fetched {
        Ok(Ok(snapshot)) => snapshot,
        Ok(Err(e)) => {
            warn!("{}", e);
            return CycleOutcome::SourceFailed(e);
        },
        Err(_) => {
            warn!(
                "Snapshot fetch for pool {} timed out after {:?}",
                pool_address, fetch_timeout
            );
            return CycleOutcome::TimedOut;
        },
    };

    if cancellation_token.is_cancelled() {
        return CycleOutcome::Cancelled;
    }

    process_snapshot(detector, sink, snapshot).await
}

/// Run detection on an already obtained snapshot and emit any resulting event.
pub async fn process_snapshot(
    detector: &WhaleActivityDetector,
    sink: &dyn EventSink,
    snapshot: PoolSnapshot,
) -> CycleOutcome {
    match detector.detect(snapshot) {
        Ok(Some(event)) => {
            let outcome = CycleOutcome::Emitted {
                event_id: event.id,
                risk_level: event.risk_level,
            };
            sink.emit(event).await;
            outcome
        },
        Ok(None) => CycleOutcome::Quiet,
        Err(e @ DetectionError::OutOfOrderSnapshot { .. }) => {
            debug!("{}", e);
            CycleOutcome::Rejected(e)
        },
        Err(e) => {
            warn!("{}", e);
            CycleOutcome::Rejected(e)
        },
    }
}
