use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity assigned to a detected liquidity movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Direction of a single bucket's liquidity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Remove,
}

/// Ingestion path that produced the snapshot behind an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectionMethod {
    #[default]
    Polling,
    EventListener,
}

impl std::fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionMethod::Polling => write!(f, "polling"),
            DetectionMethod::EventListener => write!(f, "eventListener"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinRange {
    pub lower: BigDecimal,
    pub upper: BigDecimal,
}

/// One of the largest single-bucket changes in a detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopChange {
    pub bin_range: BinRange,
    /// Signed USD amount
    pub amount: BigDecimal,
    /// Share of the pool's liquidity after the change, in percent
    pub percent: BigDecimal,
    /// Midpoint of the bin range
    pub price_point: BigDecimal,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
}

/// Structured description of a significant liquidity movement in one pool.
///
/// Created once per significant delta between two consecutive snapshots and
/// handed off to an event sink; the engine keeps no reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleActivityEvent {
    // Identity
    pub id: Uuid,
    pub pool_address: String,
    pub pool_name: String,
    pub timestamp: DateTime<Utc>,

    // Aggregates
    pub total_liquidity_before: BigDecimal,
    pub total_liquidity_after: BigDecimal,
    pub total_change_amount: BigDecimal,
    pub total_change_percent: BigDecimal,

    pub top_changes: Vec<TopChange>,

    // Distribution shape
    pub concentration_before: f64,
    pub concentration_after: f64,

    pub current_price: BigDecimal,
    pub risk_level: RiskLevel,
    pub detection_method: DetectionMethod,
    pub detection_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
        assert_eq!(serde_json::to_string(&ChangeType::Remove).unwrap(), "\"remove\"");
        assert_eq!(
            serde_json::to_string(&DetectionMethod::EventListener).unwrap(),
            "\"eventListener\""
        );
        let method: DetectionMethod = serde_json::from_str("\"polling\"").unwrap();
        assert_eq!(method, DetectionMethod::Polling);
    }

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
