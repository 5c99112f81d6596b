//! Error types for the detection engine, snapshot sources and configuration.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while evaluating a snapshot against a pool's baseline.
///
/// Both variants are recovered locally: the cycle is aborted and the stored
/// baseline is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("Invalid snapshot for pool {pool}: {reason}")]
    Validation { pool: String, reason: String },

    #[error("Out-of-order snapshot for pool {pool}: received {received}, baseline is {baseline}")]
    OutOfOrderSnapshot {
        pool: String,
        baseline: DateTime<Utc>,
        received: DateTime<Utc>,
    },
}

impl DetectionError {
    pub(crate) fn validation(pool: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            pool: pool.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by a [`crate::source::PoolSnapshotSource`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Snapshot source unavailable for pool {pool}: {reason}")]
    Unavailable { pool: String, reason: String },

    #[error("Malformed snapshot data for pool {pool}: {reason}")]
    MalformedData { pool: String, reason: String },
}

/// Invalid settings detected at startup. Fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("{name} must be a finite, non-negative number (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("{lower} ({lower_value}) must not exceed {upper} ({upper_value})")]
    InvertedThresholds {
        lower: &'static str,
        lower_value: f64,
        upper: &'static str,
        upper_value: f64,
    },

    #[error("{name} must be within (0, 1] (got {value})")]
    InvalidConcentrationDelta { name: &'static str, value: f64 },

    #[error("top_change_count must be at least 1")]
    InvalidTopChangeCount,

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Duplicate pool address in polling.pools: {0}")]
    DuplicatePool(String),
}
