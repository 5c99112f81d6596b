use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::errors::SourceError;
use crate::models::PoolSnapshot;
use crate::source::PoolSnapshotSource;

/// Reads `<dir>/<pool_address>.json`, as written by an upstream pool reader.
///
/// Decimal fields are JSON strings, e.g.
/// `{"lower_price": "100.5", "upper_price": "101", "liquidity_usd": "25000"}`.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, pool_address: &str) -> PathBuf {
        self.dir.join(format!("{}.json", pool_address))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PoolSnapshotSource for JsonFileSource {
    async fn fetch_snapshot(&self, pool_address: &str) -> Result<PoolSnapshot, SourceError> {
        let path = self.path_for(pool_address);

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::NotFound => format!("{} does not exist", path.display()),
                _ => format!("failed to read {}: {}", path.display(), e),
            };
            SourceError::Unavailable {
                pool: pool_address.to_string(),
                reason,
            }
        })?;

        let snapshot: PoolSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| SourceError::MalformedData {
                pool: pool_address.to_string(),
                reason: e.to_string(),
            })?;

        if snapshot.pool_address != pool_address {
            return Err(SourceError::MalformedData {
                pool: pool_address.to_string(),
                reason: format!("file describes pool {}", snapshot.pool_address),
            });
        }

        Ok(snapshot)
    }
}
