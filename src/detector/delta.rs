//! Bin-level reconciliation of two snapshots of the same pool.
//!
//! Bins are matched by price range, never by position: the edges of both
//! snapshots are merged into one sorted set of elementary buckets, and each
//! snapshot's liquidity is allocated to those buckets pro-rata by width.
//! A bucket therefore lies entirely inside one bin of a snapshot or entirely
//! in a gap, which keeps the allocation exact whenever partitions agree.

use bigdecimal::BigDecimal;
use num_traits::{One, Zero};

use crate::models::{ChangeType, LiquidityBin, PoolSnapshot};
use crate::utils::{exact_percent, sum, ALLOCATION_SCALE};

/// Net liquidity change within one price bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinDelta {
    pub lower: BigDecimal,
    pub upper: BigDecimal,
    /// `after - before`, never zero
    pub amount: BigDecimal,
}

impl BinDelta {
    pub fn change_type(&self) -> ChangeType {
        if self.amount > BigDecimal::zero() {
            ChangeType::Add
        } else {
            ChangeType::Remove
        }
    }
}

/// Result of comparing two snapshots.
///
/// Percentages and concentrations are unrounded so threshold checks see the
/// true values.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaReport {
    pub deltas: Vec<BinDelta>,
    pub total_liquidity_before: BigDecimal,
    pub total_liquidity_after: BigDecimal,
    pub total_change_amount: BigDecimal,
    pub total_change_percent: BigDecimal,
    pub concentration_before: BigDecimal,
    pub concentration_after: BigDecimal,
}

/// Stateless comparator for chronologically ordered snapshot pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinDeltaAnalyzer;

impl BinDeltaAnalyzer {
    pub fn analyze(&self, before: &PoolSnapshot, after: &PoolSnapshot) -> DeltaReport {
        let total_liquidity_before = before.total_liquidity();
        let total_liquidity_after = after.total_liquidity();
        let total_change_amount = &total_liquidity_after - &total_liquidity_before;
        let total_change_percent = exact_percent(&total_change_amount, &total_liquidity_before);

        DeltaReport {
            deltas: bucket_deltas(&before.bins, &after.bins),
            concentration_before: concentration(&before.bins, &total_liquidity_before),
            concentration_after: concentration(&after.bins, &total_liquidity_after),
            total_liquidity_before,
            total_liquidity_after,
            total_change_amount,
            total_change_percent,
        }
    }
}

/// Herfindahl concentration: Σ(lᵢ²) / (Σlᵢ)².
///
/// 1 when every unit of liquidity sits in one bin, 0 for an empty pool.
pub fn concentration(bins: &[LiquidityBin], total: &BigDecimal) -> BigDecimal {
    if total.is_zero() {
        return BigDecimal::zero();
    }
    let squares: Vec<BigDecimal> = bins
        .iter()
        .map(|bin| &bin.liquidity_usd * &bin.liquidity_usd)
        .collect();
    let hhi = sum(squares.iter()) / (total * total);
    hhi.min(BigDecimal::one())
}

fn bucket_deltas(before: &[LiquidityBin], after: &[LiquidityBin]) -> Vec<BinDelta> {
    let mut edges: Vec<&BigDecimal> = before
        .iter()
        .chain(after.iter())
        .flat_map(|bin| [&bin.lower_price, &bin.upper_price])
        .collect();
    edges.sort();
    edges.dedup();

    let mut before_cursor = 0;
    let mut after_cursor = 0;
    let mut deltas = Vec::new();

    for bucket in edges.windows(2) {
        let (lower, upper) = (bucket[0], bucket[1]);
        let liquidity_before = allocate(before, &mut before_cursor, lower, upper);
        let liquidity_after = allocate(after, &mut after_cursor, lower, upper);
        let amount = liquidity_after - liquidity_before;

        if !amount.is_zero() {
            deltas.push(BinDelta {
                lower: lower.clone(),
                upper: upper.clone(),
                amount,
            });
        }
    }

    deltas
}

/// Liquidity of `bins` falling inside `[lower, upper)`.
///
/// Buckets are visited in ascending order, so `cursor` only moves forward.
fn allocate(
    bins: &[LiquidityBin],
    cursor: &mut usize,
    lower: &BigDecimal,
    upper: &BigDecimal,
) -> BigDecimal {
    while *cursor < bins.len() && bins[*cursor].upper_price <= *lower {
        *cursor += 1;
    }

    match bins.get(*cursor) {
        Some(bin) if bin.lower_price < *upper => {
            if bin.lower_price == *lower && bin.upper_price == *upper {
                bin.liquidity_usd.clone()
            } else {
                let width = upper - lower;
                (&bin.liquidity_usd * &width / bin.width()).round(ALLOCATION_SCALE)
            }
        },
        _ => BigDecimal::zero(),
    }
}
