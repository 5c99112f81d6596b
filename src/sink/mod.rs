//! Consumers of whale activity events.
//!
//! Emission is fire-and-forget: a sink owns delivery guarantees and must not
//! push failures back into the detection cycle.

mod redpanda;

use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use tokio::sync::mpsc;

use crate::models::WhaleActivityEvent;

pub use redpanda::RedpandaSink;

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: WhaleActivityEvent);
}

/// Writes a one-line summary of every event to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn emit(&self, event: WhaleActivityEvent) {
        let top = event
            .top_changes
            .first()
            .map(|c| {
                format!(
                    "{:?} {} USD at [{}, {}]",
                    c.change_type, c.amount, c.bin_range.lower, c.bin_range.upper
                )
            })
            .unwrap_or_else(|| "none".to_string());

        info!(
            "[{}] Whale activity on {} ({}): {} USD ({}%), concentration {:.3} -> {:.3}, top change {}, via {}",
            event.risk_level,
            event.pool_name,
            event.pool_address,
            event.total_change_amount,
            event.total_change_percent,
            event.concentration_before,
            event.concentration_after,
            top,
            event.detection_method,
        );
    }
}

/// Forwards events into a tokio channel, e.g. for an API layer or a store writer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<WhaleActivityEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<WhaleActivityEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: WhaleActivityEvent) {
        let id = event.id;
        if self.tx.send(event).await.is_err() {
            warn!("Event channel closed, dropping whale event {}", id);
        }
    }
}

/// Delivers each event to every inner sink in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for FanoutSink {
    async fn emit(&self, event: WhaleActivityEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}
