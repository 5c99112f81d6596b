//! Snapshot sources.
//!
//! The engine never talks to a chain or an RPC node itself; whatever reads
//! pool state implements [`PoolSnapshotSource`].

mod json_file;

use async_trait::async_trait;

use crate::errors::SourceError;
use crate::models::PoolSnapshot;

pub use json_file::JsonFileSource;

/// Supplies point-in-time liquidity distributions for pools.
#[async_trait]
pub trait PoolSnapshotSource: Send + Sync {
    /// Fetch the current snapshot of `pool_address`.
    async fn fetch_snapshot(&self, pool_address: &str) -> Result<PoolSnapshot, SourceError>;
}
