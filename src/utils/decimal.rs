//! Decimal helpers for currency and percentage arithmetic.
//!
//! Every USD amount in the engine is a [`BigDecimal`] so cumulative totals
//! reconcile exactly. Threshold checks run on unrounded values; rounding and
//! the float form of concentration only apply to what an event reports.

use bigdecimal::BigDecimal;
use num_bigint::Sign;
use num_traits::Zero;
use once_cell::sync::Lazy;
use std::str::FromStr;

// ============================================
// Constants
// ============================================

/// Decimal places kept on percentages.
pub const PERCENT_SCALE: i64 = 6;

/// Decimal places kept on pro-rata liquidity allocations.
pub const ALLOCATION_SCALE: i64 = 8;

static HUNDRED: Lazy<BigDecimal> = Lazy::new(|| BigDecimal::from(100));

static TWO: Lazy<BigDecimal> = Lazy::new(|| BigDecimal::from(2));

// ============================================
// Conversions
// ============================================

/// Convert a configuration float into a decimal.
///
/// Goes through the shortest round-trip string form so `0.3` becomes exactly
/// `0.3` rather than its binary expansion. Returns `None` for NaN/infinity.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

// ============================================
// Arithmetic
// ============================================

/// `part / whole * 100` without rounding. Zero when `whole` is zero.
pub fn exact_percent(part: &BigDecimal, whole: &BigDecimal) -> BigDecimal {
    if whole.is_zero() {
        return BigDecimal::zero();
    }
    part * &*HUNDRED / whole
}

/// [`exact_percent`] rounded to [`PERCENT_SCALE`], for reporting.
pub fn percent_of(part: &BigDecimal, whole: &BigDecimal) -> BigDecimal {
    exact_percent(part, whole).round(PERCENT_SCALE)
}

/// Arithmetic midpoint of a price range.
pub fn midpoint(lower: &BigDecimal, upper: &BigDecimal) -> BigDecimal {
    (lower + upper) / &*TWO
}

#[inline]
pub fn is_negative(value: &BigDecimal) -> bool {
    value.sign() == Sign::Minus
}

/// Sum a sequence of decimals without intermediate rounding.
pub fn sum<'a>(values: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    values
        .into_iter()
        .fold(BigDecimal::zero(), |acc, value| acc + value)
}
