//! Utility functions for the Riptide engine.
//!
//! - [`decimal`] - Decimal conversions and percentage arithmetic

mod decimal;

// ============================================
// Re-exports
// ============================================

pub use decimal::{
    decimal_from_f64, exact_percent, is_negative, midpoint, percent_of, sum, ALLOCATION_SCALE,
    PERCENT_SCALE,
};
