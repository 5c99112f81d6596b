use std::cmp::Ordering;

use bigdecimal::BigDecimal;

use crate::detector::delta::BinDelta;
use crate::models::{BinRange, TopChange};
use crate::utils::{midpoint, percent_of};

/// Picks the largest single-bucket changes of a detection.
#[derive(Debug, Clone, Copy)]
pub struct TopChangeRanker {
    limit: usize,
}

impl TopChangeRanker {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Rank `deltas` by absolute amount, largest first.
    ///
    /// Equal magnitudes are ordered by the higher lower bound first so the
    /// result is reproducible. Returns at most `limit` entries, never padded.
    pub fn rank(&self, deltas: &[BinDelta], total_liquidity_after: &BigDecimal) -> Vec<TopChange> {
        let mut ranked: Vec<&BinDelta> = deltas.iter().collect();
        ranked.sort_by(|a, b| compare(a, b));

        ranked
            .into_iter()
            .take(self.limit)
            .map(|delta| TopChange {
                bin_range: BinRange {
                    lower: delta.lower.clone(),
                    upper: delta.upper.clone(),
                },
                amount: delta.amount.clone(),
                percent: percent_of(&delta.amount, total_liquidity_after),
                price_point: midpoint(&delta.lower, &delta.upper),
                change_type: delta.change_type(),
            })
            .collect()
    }
}

fn compare(a: &BinDelta, b: &BinDelta) -> Ordering {
    b.amount
        .abs()
        .cmp(&a.amount.abs())
        .then_with(|| b.lower.cmp(&a.lower))
}
