//! Whale activity detection engine.
//!
//! - [`store`] - Per-pool baseline storage with keyed exclusive access
//! - [`delta`] - Price-range reconciliation of two snapshots
//! - [`ranker`] - Largest single-bucket changes
//! - [`risk`] - Risk level classification
//! - [`detector`] - Per-pool state machine tying the above together

pub mod delta;
#[allow(clippy::module_inception)]
mod detector;
pub mod ranker;
pub mod risk;
pub mod store;

pub use delta::{BinDelta, BinDeltaAnalyzer, DeltaReport};
pub use detector::{PoolState, WhaleActivityDetector};
pub use ranker::TopChangeRanker;
pub use risk::RiskClassifier;
pub use store::SnapshotStore;
