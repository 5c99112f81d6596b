//! Recurring background work.
//!
//! - [`scheduler`] - Polling scheduler registering the detection job
//! - [`jobs`] - The per-pool detection cycle

pub mod jobs;
mod scheduler;

pub use jobs::detection_cycle::CycleOutcome;
pub use scheduler::PollingScheduler;
