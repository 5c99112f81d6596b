use std::collections::HashSet;

use anyhow::Context;
use config::{Config, File, FileFormat};
use serde::Deserialize;

use crate::errors::ConfigurationError;
use crate::models::DetectionMethod;

/// Risk classification thresholds.
///
/// Percentages apply to the absolute total change; concentration deltas apply
/// to the increase of the Herfindahl concentration between two snapshots.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RiskThresholds {
    #[serde(default = "default_high_change_pct")]
    pub high_change_pct: f64,
    #[serde(default = "default_medium_change_pct")]
    pub medium_change_pct: f64,
    #[serde(default = "default_high_concentration_delta")]
    pub high_concentration_delta: f64,
    #[serde(default = "default_medium_concentration_delta")]
    pub medium_concentration_delta: f64,
}

fn default_high_change_pct() -> f64 {
    30.0
}

fn default_medium_change_pct() -> f64 {
    10.0
}

fn default_high_concentration_delta() -> f64 {
    0.3
}

fn default_medium_concentration_delta() -> f64 {
    0.1
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            high_change_pct: default_high_change_pct(),
            medium_change_pct: default_medium_change_pct(),
            high_concentration_delta: default_high_concentration_delta(),
            medium_concentration_delta: default_medium_concentration_delta(),
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("high_change_pct", self.high_change_pct),
            ("medium_change_pct", self.medium_change_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidThreshold { name, value });
            }
        }
        for (name, value) in [
            ("high_concentration_delta", self.high_concentration_delta),
            ("medium_concentration_delta", self.medium_concentration_delta),
        ] {
            if !value.is_finite() || value <= 0.0 || value > 1.0 {
                return Err(ConfigurationError::InvalidConcentrationDelta { name, value });
            }
        }
        if self.medium_change_pct > self.high_change_pct {
            return Err(ConfigurationError::InvertedThresholds {
                lower: "medium_change_pct",
                lower_value: self.medium_change_pct,
                upper: "high_change_pct",
                upper_value: self.high_change_pct,
            });
        }
        if self.medium_concentration_delta > self.high_concentration_delta {
            return Err(ConfigurationError::InvertedThresholds {
                lower: "medium_concentration_delta",
                lower_value: self.medium_concentration_delta,
                upper: "high_concentration_delta",
                upper_value: self.high_concentration_delta,
            });
        }
        Ok(())
    }
}

/// Whale detection tuning.
///
/// A delta is significant when the absolute total change reaches
/// `significance_floor_pct`, or when any single ranked change reaches
/// `per_change_floor_pct` of the pool's liquidity after the change.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DetectorSettings {
    #[serde(default = "default_significance_floor_pct")]
    pub significance_floor_pct: f64,
    #[serde(default = "default_per_change_floor_pct")]
    pub per_change_floor_pct: f64,
    #[serde(default = "default_top_change_count")]
    pub top_change_count: usize,
    #[serde(default)]
    pub risk_thresholds: RiskThresholds,
    /// Tag applied to events from the polling path
    #[serde(default)]
    pub detection_method: DetectionMethod,
}

fn default_significance_floor_pct() -> f64 {
    1.0
}

fn default_per_change_floor_pct() -> f64 {
    5.0
}

fn default_top_change_count() -> usize {
    3
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            significance_floor_pct: default_significance_floor_pct(),
            per_change_floor_pct: default_per_change_floor_pct(),
            top_change_count: default_top_change_count(),
            risk_thresholds: RiskThresholds::default(),
            detection_method: DetectionMethod::default(),
        }
    }
}

impl DetectorSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("significance_floor_pct", self.significance_floor_pct),
            ("per_change_floor_pct", self.per_change_floor_pct),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidThreshold { name, value });
            }
        }
        if self.top_change_count == 0 {
            return Err(ConfigurationError::InvalidTopChangeCount);
        }
        self.risk_thresholds.validate()
    }
}

/// Polling cadence and the pool set to watch.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PollingSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound for a single snapshot fetch
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    /// How long a pool is skipped after its source reported unavailable
    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,
    #[serde(default)]
    pub pools: Vec<String>,
}

fn default_interval_secs() -> u64 {
    30
}

fn default_fetch_timeout_ms() -> u64 {
    5_000
}

fn default_failure_backoff_secs() -> u64 {
    60
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            failure_backoff_secs: default_failure_backoff_secs(),
            pools: Vec::new(),
        }
    }
}

impl PollingSettings {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.interval_secs == 0 {
            return Err(ConfigurationError::ZeroInterval("polling.interval_secs"));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(ConfigurationError::ZeroInterval("polling.fetch_timeout_ms"));
        }
        let mut seen = HashSet::new();
        for pool in &self.pools {
            if !seen.insert(pool.as_str()) {
                return Err(ConfigurationError::DuplicatePool(pool.clone()));
            }
        }
        Ok(())
    }
}

/// Location of JSON snapshots written by the upstream pool reader.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SourceSettings {
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: String,
}

fn default_snapshot_dir() -> String {
    "snapshots".to_string()
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

/// Redpanda (Kafka-compatible) alert stream configuration.
///
/// When enabled, every whale event is published to `{topic_prefix}.whale_events`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RedpandaSettings {
    /// Enable/disable Redpanda publishing
    #[serde(default)]
    pub enabled: bool,
    /// Comma-separated list of broker addresses (e.g., "localhost:9092")
    #[serde(default = "default_redpanda_brokers")]
    pub brokers: String,
    #[serde(default = "default_redpanda_topic_prefix")]
    pub topic_prefix: String,
}

fn default_redpanda_brokers() -> String {
    "localhost:9092".to_string()
}

fn default_redpanda_topic_prefix() -> String {
    "riptide".to_string()
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup and validated before any detection runs.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub detector: DetectorSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub redpanda: Option<RedpandaSettings>,
}

impl Settings {
    pub fn new() -> anyhow::Result<Self> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()
            .context("Failed to read config")?;

        Self::finish(s)
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let s = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .context("Failed to parse config")?;

        Self::finish(s)
    }

    fn finish(s: Config) -> anyhow::Result<Self> {
        let settings: Settings = s
            .try_deserialize()
            .context("Failed to deserialize settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.detector.validate()?;
        self.polling.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.detector.significance_floor_pct, 1.0);
        assert_eq!(settings.detector.top_change_count, 3);
        assert_eq!(settings.detector.risk_thresholds.high_change_pct, 30.0);
        assert_eq!(settings.detector.detection_method, DetectionMethod::Polling);
    }

    #[test]
    fn test_yaml_overrides_and_defaults() {
        let settings = Settings::from_yaml_str(
            r#"
detector:
  significance_floor_pct: 2.5
  risk_thresholds:
    high_change_pct: 40
polling:
  interval_secs: 10
  pools:
    - pool-a
    - pool-b
redpanda:
  enabled: true
"#,
        )
        .unwrap();

        assert_eq!(settings.detector.significance_floor_pct, 2.5);
        assert_eq!(settings.detector.per_change_floor_pct, 5.0);
        assert_eq!(settings.detector.risk_thresholds.high_change_pct, 40.0);
        assert_eq!(settings.detector.risk_thresholds.medium_change_pct, 10.0);
        assert_eq!(settings.polling.interval_secs, 10);
        assert_eq!(settings.polling.fetch_timeout_ms, 5_000);
        assert_eq!(settings.polling.pools, vec!["pool-a", "pool-b"]);
        let redpanda = settings.redpanda.unwrap();
        assert!(redpanda.enabled);
        assert_eq!(redpanda.topic_prefix, "riptide");
    }

    #[test]
    fn test_inverted_risk_thresholds_fail_fast() {
        let result = Settings::from_yaml_str(
            r#"
detector:
  risk_thresholds:
    high_change_pct: 5
    medium_change_pct: 10
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_concentration_delta() {
        let thresholds = RiskThresholds {
            high_concentration_delta: 1.5,
            ..RiskThresholds::default()
        };
        assert!(matches!(
            thresholds.validate(),
            Err(ConfigurationError::InvalidConcentrationDelta { .. })
        ));
    }

    #[test]
    fn test_negative_floor_rejected() {
        let detector = DetectorSettings {
            significance_floor_pct: -1.0,
            ..DetectorSettings::default()
        };
        assert!(detector.validate().is_err());
    }

    #[test]
    fn test_zero_top_change_count_rejected() {
        let detector = DetectorSettings {
            top_change_count: 0,
            ..DetectorSettings::default()
        };
        assert_eq!(
            detector.validate(),
            Err(ConfigurationError::InvalidTopChangeCount)
        );
    }

    #[test]
    fn test_duplicate_pools_rejected() {
        let polling = PollingSettings {
            pools: vec!["a".to_string(), "a".to_string()],
            ..PollingSettings::default()
        };
        assert_eq!(
            polling.validate(),
            Err(ConfigurationError::DuplicatePool("a".to_string()))
        );
    }
}
