use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DetectionError;
use crate::models::LiquidityBin;
use crate::utils::{is_negative, sum};

/// Point-in-time capture of one pool's bin distribution.
///
/// Population: produced by a snapshot source on every poll or pushed event,
/// then moved into the detector and finally into the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    // Identifiers
    pub pool_address: String,
    #[serde(default)]
    pub pool_name: String,
    pub timestamp: DateTime<Utc>,

    // Price state
    pub current_price: BigDecimal,

    // Liquidity state, sorted by lower_price
    #[serde(default)]
    pub bins: Vec<LiquidityBin>,
}

impl PoolSnapshot {
    pub fn new(
        pool_address: String,
        pool_name: String,
        timestamp: DateTime<Utc>,
        current_price: BigDecimal,
        bins: Vec<LiquidityBin>,
    ) -> Self {
        Self {
            pool_address,
            pool_name,
            timestamp,
            current_price,
            bins,
        }
    }

    /// Exact sum of liquidity across all bins.
    pub fn total_liquidity(&self) -> BigDecimal {
        sum(self.bins.iter().map(|bin| &bin.liquidity_usd))
    }

    /// Check the structural invariants a detector relies on.
    ///
    /// Rejects an empty pool address, a negative price, negative liquidity,
    /// empty or inverted bin bounds, and bins that are unsorted or overlap.
    pub fn validate(&self) -> Result<(), DetectionError> {
        let pool = self.pool_address.as_str();

        if pool.trim().is_empty() {
            return Err(DetectionError::validation(pool, "missing pool address"));
        }

        if is_negative(&self.current_price) {
            return Err(DetectionError::validation(
                pool,
                format!("negative current price {}", self.current_price),
            ));
        }

        for (i, bin) in self.bins.iter().enumerate() {
            if is_negative(&bin.liquidity_usd) {
                return Err(DetectionError::validation(
                    pool,
                    format!("bin {} has negative liquidity {}", i, bin.liquidity_usd),
                ));
            }
            if bin.lower_price >= bin.upper_price {
                return Err(DetectionError::validation(
                    pool,
                    format!(
                        "bin {} has inverted bounds [{}, {}]",
                        i, bin.lower_price, bin.upper_price
                    ),
                ));
            }
        }

        for (i, pair) in self.bins.windows(2).enumerate() {
            if pair[1].lower_price < pair[0].upper_price {
                return Err(DetectionError::validation(
                    pool,
                    format!("bins {} and {} overlap or are out of order", i, i + 1),
                ));
            }
        }

        Ok(())
    }
}
