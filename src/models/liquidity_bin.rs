use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// One price-range bucket of a pool's liquidity curve.
///
/// `liquidity_usd` is the value resident in `[lower_price, upper_price)` at
/// snapshot time, denominated in USD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityBin {
    pub lower_price: BigDecimal,
    pub upper_price: BigDecimal,
    pub liquidity_usd: BigDecimal,
}

impl LiquidityBin {
    pub fn new(lower_price: BigDecimal, upper_price: BigDecimal, liquidity_usd: BigDecimal) -> Self {
        Self {
            lower_price,
            upper_price,
            liquidity_usd,
        }
    }

    /// Width of the bin's price range.
    pub fn width(&self) -> BigDecimal {
        &self.upper_price - &self.lower_price
    }
}
