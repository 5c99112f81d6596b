pub mod config;
pub mod cron;
pub mod detector;
pub mod errors;
pub mod listener;
pub mod models;
pub mod sink;
pub mod source;
pub mod utils;

pub use self::config::Settings;
pub use cron::{CycleOutcome, PollingScheduler};
pub use detector::{SnapshotStore, WhaleActivityDetector};
pub use errors::{ConfigurationError, DetectionError, SourceError};
pub use listener::SnapshotListener;
pub use models::{PoolSnapshot, WhaleActivityEvent};
pub use sink::{EventSink, FanoutSink, LogSink, RedpandaSink};
pub use source::{JsonFileSource, PoolSnapshotSource};
