//! Push-based ingestion path.
//!
//! Whatever subscribes to on-chain pool updates forwards fresh snapshots into
//! the listener's channel; each one runs through the shared detector tagged
//! as `eventListener`.
//!
//! This is library API for embedders that own such a subscription. The
//! `riptide` binary only polls, since it ships no push-based snapshot feed.

use std::sync::Arc;

use log::info;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cron::jobs::detection_cycle::{self, CycleOutcome};
use crate::detector::WhaleActivityDetector;
use crate::models::{DetectionMethod, PoolSnapshot};
use crate::sink::EventSink;

pub struct SnapshotListener {
    detector: WhaleActivityDetector,
    sink: Arc<dyn EventSink>,
    rx: mpsc::Receiver<PoolSnapshot>,
}

impl SnapshotListener {
    /// Create a listener and the sender feeding it.
    ///
    /// The listener shares `detector`'s store, so pushed and polled snapshots
    /// of the same pool are ordered against one baseline.
    pub fn channel(
        detector: &WhaleActivityDetector,
        sink: Arc<dyn EventSink>,
        capacity: usize,
    ) -> (mpsc::Sender<PoolSnapshot>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        let listener = Self {
            detector: detector.with_method(DetectionMethod::EventListener),
            sink,
            rx,
        };
        (tx, listener)
    }

    /// Process snapshots until every sender is dropped or the token is cancelled.
    ///
    /// Returns the number of events emitted.
    pub async fn run(mut self, cancellation_token: CancellationToken) -> usize {
        let mut emitted = 0;

        loop {
            let snapshot = tokio::select! {
                _ = cancellation_token.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };

            let outcome =
                detection_cycle::process_snapshot(&self.detector, self.sink.as_ref(), snapshot)
                    .await;
            if matches!(outcome, CycleOutcome::Emitted { .. }) {
                emitted += 1;
            }
        }

        info!("Snapshot listener stopped after emitting {} events", emitted);
        emitted
    }
}
