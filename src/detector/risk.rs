use bigdecimal::BigDecimal;

use crate::config::RiskThresholds;
use crate::errors::ConfigurationError;
use crate::models::RiskLevel;
use crate::utils::decimal_from_f64;

/// Maps change magnitude and concentration shift to a [`RiskLevel`].
///
/// Large aggregate swings and sudden concentration spikes are independent
/// triggers: either one alone is enough to raise the level.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    high_change_pct: BigDecimal,
    medium_change_pct: BigDecimal,
    high_concentration_delta: BigDecimal,
    medium_concentration_delta: BigDecimal,
}

impl RiskClassifier {
    pub fn new(thresholds: &RiskThresholds) -> Result<Self, ConfigurationError> {
        thresholds.validate()?;

        Ok(Self {
            high_change_pct: threshold("high_change_pct", thresholds.high_change_pct)?,
            medium_change_pct: threshold("medium_change_pct", thresholds.medium_change_pct)?,
            high_concentration_delta: threshold(
                "high_concentration_delta",
                thresholds.high_concentration_delta,
            )?,
            medium_concentration_delta: threshold(
                "medium_concentration_delta",
                thresholds.medium_concentration_delta,
            )?,
        })
    }

    /// Inputs are expected unrounded; every threshold is inclusive.
    pub fn classify(
        &self,
        total_change_percent: &BigDecimal,
        concentration_before: &BigDecimal,
        concentration_after: &BigDecimal,
    ) -> RiskLevel {
        let change = total_change_percent.abs();
        let concentration_increase = concentration_after - concentration_before;

        if change >= self.high_change_pct || concentration_increase >= self.high_concentration_delta
        {
            RiskLevel::High
        } else if change >= self.medium_change_pct
            || concentration_increase >= self.medium_concentration_delta
        {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

pub(crate) fn threshold(name: &'static str, value: f64) -> Result<BigDecimal, ConfigurationError> {
    decimal_from_f64(value).ok_or(ConfigurationError::InvalidThreshold { name, value })
}
