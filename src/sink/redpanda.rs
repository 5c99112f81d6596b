//! Redpanda (Kafka-compatible) alert stream.
//!
//! Publishes whale events for downstream alerting and storage consumers.
//! Uses fire-and-forget semantics so a slow broker never stalls detection.

use std::time::Duration;

use async_trait::async_trait;
use log::{error, info, warn};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};

use crate::config::RedpandaSettings;
use crate::models::WhaleActivityEvent;
use crate::sink::EventSink;

/// Publishes every event to `{topic_prefix}.whale_events`, keyed by pool
/// address so one pool's events stay ordered within a partition.
pub struct RedpandaSink {
    producer: FutureProducer,
    topic: String,
}

impl RedpandaSink {
    /// Create a new Redpanda sink.
    ///
    /// Returns None if Redpanda is disabled in settings or the producer cannot be created.
    pub fn new(settings: &RedpandaSettings) -> Option<Self> {
        if !settings.enabled {
            info!("Redpanda publishing is disabled");
            return None;
        }

        info!("Connecting to Redpanda brokers: {}", settings.brokers);

        let producer: FutureProducer = match ClientConfig::new()
            .set("bootstrap.servers", &settings.brokers)
            .set("message.timeout.ms", "5000")
            .set("queue.buffering.max.messages", "10000")
            .set("linger.ms", "5")
            .create()
        {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to create Redpanda producer: {}", e);
                return None;
            },
        };

        let topic = topic_name(&settings.topic_prefix);
        info!("Redpanda sink publishing whale events to {}", topic);

        Some(Self { producer, topic })
    }

    /// Flush any pending messages (call on shutdown).
    pub fn flush(&self) {
        self.producer.flush(Duration::from_secs(5)).ok();
    }
}

fn topic_name(prefix: &str) -> String {
    format!("{}.whale_events", prefix)
}

#[async_trait]
impl EventSink for RedpandaSink {
    async fn emit(&self, event: WhaleActivityEvent) {
        let payload = match serde_json::to_string(&event) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize whale event {}: {}", event.id, e);
                return;
            },
        };

        let record = FutureRecord::to(&self.topic)
            .key(&event.pool_address)
            .payload(&payload);

        if let Err((e, _)) = self.producer.send(record, Duration::from_millis(100)).await {
            warn!(
                "Failed to publish whale event {} to {}: {}",
                event.id, self.topic, e
            );
        }
    }
}

impl Drop for RedpandaSink {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_settings_yield_no_sink() {
        let settings = RedpandaSettings {
            enabled: false,
            brokers: "localhost:9092".to_string(),
            topic_prefix: "riptide".to_string(),
        };
        assert!(RedpandaSink::new(&settings).is_none());
    }

    #[test]
    fn test_topic_name() {
        assert_eq!(topic_name("riptide"), "riptide.whale_events");
    }
}
