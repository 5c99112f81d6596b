use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use log::debug;
use num_traits::ToPrimitive;
use uuid::Uuid;

use crate::config::DetectorSettings;
use crate::detector::delta::{BinDeltaAnalyzer, DeltaReport};
use crate::detector::ranker::TopChangeRanker;
use crate::detector::risk::{threshold, RiskClassifier};
use crate::detector::store::SnapshotStore;
use crate::errors::{ConfigurationError, DetectionError};
use crate::models::{DetectionMethod, PoolSnapshot, TopChange, WhaleActivityEvent};
use crate::utils::{exact_percent, PERCENT_SCALE};

/// Where a pool stands in the detection lifecycle.
///
/// `Evaluating` only exists while a pool's baseline lock is held and is never
/// observable from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Uninitialized,
    Baseline { since: DateTime<Utc> },
}

/// Compares each new snapshot of a pool with its stored baseline and emits a
/// [`WhaleActivityEvent`] when the movement is significant.
///
/// Handles are cheap to clone and share one [`SnapshotStore`]; use
/// [`WhaleActivityDetector::with_method`] to derive a handle for another
/// ingestion path.
#[derive(Clone)]
pub struct WhaleActivityDetector {
    store: Arc<SnapshotStore>,
    analyzer: BinDeltaAnalyzer,
    ranker: TopChangeRanker,
    classifier: RiskClassifier,
    significance_floor_pct: BigDecimal,
    per_change_floor_pct: BigDecimal,
    method: DetectionMethod,
}

impl WhaleActivityDetector {
    pub fn new(
        settings: &DetectorSettings,
        store: Arc<SnapshotStore>,
    ) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        Ok(Self {
            store,
            analyzer: BinDeltaAnalyzer,
            ranker: TopChangeRanker::new(settings.top_change_count),
            classifier: RiskClassifier::new(&settings.risk_thresholds)?,
            significance_floor_pct: threshold(
                "significance_floor_pct",
                settings.significance_floor_pct,
            )?,
            per_change_floor_pct: threshold("per_change_floor_pct", settings.per_change_floor_pct)?,
            method: settings.detection_method,
        })
    }

    /// A handle sharing this detector's store whose events carry `method`.
    pub fn with_method(&self, method: DetectionMethod) -> Self {
        Self {
            method,
            ..self.clone()
        }
    }

    pub fn method(&self) -> DetectionMethod {
        self.method
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn state(&self, pool_address: &str) -> PoolState {
        match self.store.get(pool_address) {
            Some(baseline) => PoolState::Baseline {
                since: baseline.timestamp,
            },
            None => PoolState::Uninitialized,
        }
    }

    /// Run one detection cycle for `snapshot`'s pool.
    ///
    /// Returns `Ok(None)` for a first observation or a sub-threshold change.
    /// On success the snapshot becomes the pool's new baseline whether or not
    /// an event was produced. On error the baseline is left untouched.
    pub fn detect(
        &self,
        snapshot: PoolSnapshot,
    ) -> Result<Option<WhaleActivityEvent>, DetectionError> {
        snapshot.validate()?;

        let pool_address = snapshot.pool_address.clone();
        self.store.with_baseline(&pool_address, |baseline| {
            let Some(prior) = baseline.as_ref() else {
                debug!(
                    "Seeding baseline for pool {} at {}",
                    pool_address, snapshot.timestamp
                );
                *baseline = Some(snapshot);
                return Ok(None);
            };

            if snapshot.timestamp <= prior.timestamp {
                return Err(DetectionError::OutOfOrderSnapshot {
                    pool: pool_address.clone(),
                    baseline: prior.timestamp,
                    received: snapshot.timestamp,
                });
            }

            let event = self.evaluate(prior, &snapshot);
            if event.is_none() {
                debug!(
                    "No significant liquidity change for pool {} at {}",
                    pool_address, snapshot.timestamp
                );
            }

            *baseline = Some(snapshot);
            Ok(event)
        })
    }

    fn evaluate(&self, before: &PoolSnapshot, after: &PoolSnapshot) -> Option<WhaleActivityEvent> {
        let report = self.analyzer.analyze(before, after);
        let top_changes = self
            .ranker
            .rank(&report.deltas, &report.total_liquidity_after);

        if !self.is_significant(&report, &top_changes) {
            return None;
        }

        let risk_level = self.classifier.classify(
            &report.total_change_percent,
            &report.concentration_before,
            &report.concentration_after,
        );

        Some(WhaleActivityEvent {
            id: Uuid::new_v4(),
            pool_address: after.pool_address.clone(),
            pool_name: after.pool_name.clone(),
            timestamp: after.timestamp,
            total_liquidity_before: report.total_liquidity_before,
            total_liquidity_after: report.total_liquidity_after,
            total_change_amount: report.total_change_amount,
            total_change_percent: report.total_change_percent.round(PERCENT_SCALE),
            top_changes,
            concentration_before: ratio(&report.concentration_before),
            concentration_after: ratio(&report.concentration_after),
            current_price: after.current_price.clone(),
            risk_level,
            detection_method: self.method,
            detection_time: Utc::now(),
        })
    }

    /// Floors compare against unrounded percentages; `TopChange::percent` is
    /// already rounded for reporting, so the per-change share is recomputed
    /// from the exact amount.
    fn is_significant(&self, report: &DeltaReport, top_changes: &[TopChange]) -> bool {
        report.total_change_percent.abs() >= self.significance_floor_pct
            || top_changes.iter().any(|change| {
                exact_percent(&change.amount, &report.total_liquidity_after).abs()
                    >= self.per_change_floor_pct
            })
    }
}

fn ratio(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or(0.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskThresholds;
    use crate::models::{ChangeType, LiquidityBin, RiskLevel};
    use chrono::TimeZone;
    use std::str::FromStr;
    use std::sync::Barrier;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn bin(lower: &str, upper: &str, liquidity: &str) -> LiquidityBin {
        LiquidityBin::new(dec(lower), dec(upper), dec(liquidity))
    }

    fn snapshot(secs: i64, bins: Vec<LiquidityBin>) -> PoolSnapshot {
        PoolSnapshot::new(
            "pool-1".to_string(),
            "SOL-USDC".to_string(),
            Utc.timestamp_opt(secs, 0).unwrap(),
            dec("101.5"),
            bins,
        )
    }

    fn detector() -> WhaleActivityDetector {
        WhaleActivityDetector::new(&DetectorSettings::default(), Arc::new(SnapshotStore::new()))
            .unwrap()
    }

    fn whale_before(secs: i64) -> PoolSnapshot {
        snapshot(
            secs,
            vec![bin("100", "101", "500000"), bin("101", "102", "500000")],
        )
    }

    fn whale_after(secs: i64) -> PoolSnapshot {
        snapshot(
            secs,
            vec![
                bin("100", "101", "500000"),
                bin("101", "102", "200000"),
                bin("102", "103", "600000"),
            ],
        )
    }

    #[test]
    fn test_first_observation_seeds_without_event() {
        let d = detector();
        assert_eq!(d.state("pool-1"), PoolState::Uninitialized);

        let result = d.detect(whale_before(10)).unwrap();

        assert!(result.is_none());
        assert_eq!(
            d.state("pool-1"),
            PoolState::Baseline {
                since: Utc.timestamp_opt(10, 0).unwrap()
            }
        );
    }

    #[test]
    fn test_whale_event_scenario() {
        let d = detector();
        d.detect(whale_before(10)).unwrap();

        let event = d.detect(whale_after(20)).unwrap().expect("event");

        assert_eq!(event.pool_address, "pool-1");
        assert_eq!(event.pool_name, "SOL-USDC");
        assert_eq!(event.timestamp, Utc.timestamp_opt(20, 0).unwrap());
        assert_eq!(event.total_liquidity_before, dec("1000000"));
        assert_eq!(event.total_liquidity_after, dec("1300000"));
        assert_eq!(event.total_change_amount, dec("300000"));
        assert_eq!(event.total_change_percent, dec("30"));
        assert_eq!(event.concentration_before, 0.5);
        assert_eq!(event.risk_level, RiskLevel::High);
        assert_eq!(event.detection_method, DetectionMethod::Polling);
        assert_eq!(event.current_price, dec("101.5"));

        assert_eq!(event.top_changes.len(), 2);
        let top = &event.top_changes[0];
        assert_eq!(top.bin_range.lower, dec("102"));
        assert_eq!(top.bin_range.upper, dec("103"));
        assert_eq!(top.amount, dec("600000"));
        assert_eq!(top.change_type, ChangeType::Add);
        assert_eq!(top.price_point, dec("102.5"));
        assert_eq!(top.percent, dec("46.153846"));
        assert_eq!(event.top_changes[1].amount, dec("-300000"));

        // The new snapshot is the baseline now
        assert_eq!(d.store().get("pool-1").unwrap(), whale_after(20));
    }

    #[test]
    fn test_sub_threshold_change_advances_baseline_silently() {
        let d = detector();
        let before = snapshot(
            10,
            vec![bin("100", "101", "500000"), bin("101", "102", "500000")],
        );
        let after = snapshot(
            20,
            vec![bin("100", "101", "505000"), bin("101", "102", "500000")],
        );
        d.detect(before).unwrap();

        assert!(d.detect(after.clone()).unwrap().is_none());
        assert_eq!(d.store().get("pool-1").unwrap(), after);
    }

    #[test]
    fn test_gradual_drift_is_measured_against_moving_baseline() {
        let d = detector();
        d.detect(snapshot(1, vec![bin("1", "2", "1000000")])).unwrap();

        // Each step is +0.5%; against the first snapshot the third step would be 1.5%
        for (secs, liquidity) in [(2, "1005000"), (3, "1010025"), (4, "1015075.125")] {
            let result = d.detect(snapshot(secs, vec![bin("1", "2", liquidity)])).unwrap();
            assert!(result.is_none());
        }
    }

    #[test]
    fn test_large_single_bin_move_with_flat_total_is_significant() {
        let d = detector();
        d.detect(snapshot(
            1,
            vec![bin("100", "101", "500000"), bin("101", "102", "500000")],
        ))
        .unwrap();

        // Liquidity pulled from one band into another: total unchanged
        let event = d
            .detect(snapshot(
                2,
                vec![bin("100", "101", "900000"), bin("101", "102", "100000")],
            ))
            .unwrap()
            .expect("event");

        assert!(event.total_change_amount == BigDecimal::from(0));
        assert_eq!(event.top_changes.len(), 2);
        // 0.5 -> 0.82: concentration up 0.32
        assert_eq!(event.risk_level, RiskLevel::High);
    }

    fn uniform_bins(count: u32, liquidity: &str) -> Vec<LiquidityBin> {
        (0..count)
            .map(|i| bin(&(100 + i).to_string(), &(101 + i).to_string(), liquidity))
            .collect()
    }

    #[test]
    fn test_change_just_below_floor_is_not_rounded_up() {
        let d = detector();
        d.detect(snapshot(1, uniform_bins(20, "500000"))).unwrap();

        // +99,999.96 on 10M is 0.9999996%, reported as 1.000000 once rounded
        let mut bins = uniform_bins(20, "500000");
        bins[7].liquidity_usd = dec("599999.96");
        let after = snapshot(2, bins);

        assert!(d.detect(after.clone()).unwrap().is_none());
        assert_eq!(d.store().get("pool-1").unwrap(), after);
    }

    #[test]
    fn test_change_just_below_high_threshold_stays_medium() {
        let d = detector();
        d.detect(snapshot(1, uniform_bins(10, "100000"))).unwrap();

        // 29.9999996% in total, spread evenly so concentration holds at 0.1
        let event = d
            .detect(snapshot(2, uniform_bins(10, "129999.9996")))
            .unwrap()
            .expect("event");

        assert_eq!(event.risk_level, RiskLevel::Medium);
        assert_eq!(event.total_change_percent, dec("30"));
    }

    #[test]
    fn test_concentration_increase_of_exactly_medium_delta() {
        let d = detector();
        d.detect(snapshot(1, uniform_bins(5, "2"))).unwrap();

        let mut bins = uniform_bins(5, "0");
        for (bin, liquidity) in bins.iter_mut().zip(["4", "3", "2", "1", "0"]) {
            bin.liquidity_usd = dec(liquidity);
        }
        let event = d.detect(snapshot(2, bins)).unwrap().expect("event");

        assert!(event.total_change_amount == BigDecimal::from(0));
        assert!((event.concentration_before - 0.2).abs() < 1e-12);
        assert!((event.concentration_after - 0.3).abs() < 1e-12);
        assert_eq!(event.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_out_of_order_snapshot_rejected() {
        let d = detector();
        d.detect(whale_before(20)).unwrap();

        let err = d.detect(whale_after(10)).unwrap_err();
        assert!(matches!(err, DetectionError::OutOfOrderSnapshot { .. }));

        let duplicate = d.detect(whale_after(20)).unwrap_err();
        assert!(matches!(duplicate, DetectionError::OutOfOrderSnapshot { .. }));

        assert_eq!(d.store().get("pool-1").unwrap(), whale_before(20));
    }

    #[test]
    fn test_malformed_snapshot_preserves_baseline() {
        let d = detector();
        d.detect(whale_before(10)).unwrap();

        let malformed = snapshot(20, vec![bin("101", "100", "5")]);
        let err = d.detect(malformed).unwrap_err();

        assert!(matches!(err, DetectionError::Validation { .. }));
        assert_eq!(d.store().get("pool-1").unwrap(), whale_before(10));
    }

    #[test]
    fn test_malformed_first_snapshot_does_not_seed() {
        let d = detector();
        let err = d.detect(snapshot(10, vec![bin("100", "101", "-1")]));
        assert!(err.is_err());
        assert_eq!(d.state("pool-1"), PoolState::Uninitialized);
    }

    #[test]
    fn test_with_method_shares_store() {
        let polling = detector();
        let listener = polling.with_method(DetectionMethod::EventListener);
        assert_eq!(listener.method(), DetectionMethod::EventListener);

        polling.detect(whale_before(10)).unwrap();
        let event = listener.detect(whale_after(20)).unwrap().expect("event");

        assert_eq!(event.detection_method, DetectionMethod::EventListener);
        // Baseline advanced for both handles
        assert!(polling.detect(whale_after(20)).is_err());
    }

    #[test]
    fn test_top_change_count_is_configurable() {
        let settings = DetectorSettings {
            top_change_count: 1,
            ..DetectorSettings::default()
        };
        let d = WhaleActivityDetector::new(&settings, Arc::new(SnapshotStore::new())).unwrap();
        d.detect(whale_before(1)).unwrap();

        let event = d.detect(whale_after(2)).unwrap().unwrap();
        assert_eq!(event.top_changes.len(), 1);
    }

    #[test]
    fn test_invalid_settings_fail_fast() {
        let settings = DetectorSettings {
            risk_thresholds: RiskThresholds {
                medium_change_pct: 50.0,
                ..RiskThresholds::default()
            },
            ..DetectorSettings::default()
        };
        assert!(WhaleActivityDetector::new(&settings, Arc::new(SnapshotStore::new())).is_err());
    }

    #[test]
    fn test_concurrent_cycles_on_same_pool_count_delta_once() {
        let d = detector();
        d.detect(whale_before(10)).unwrap();

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let d = d.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    d.detect(whale_after(20))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let events = results.iter().filter(|r| matches!(r, Ok(Some(_)))).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(DetectionError::OutOfOrderSnapshot { .. })))
            .count();

        assert_eq!(events, 1);
        assert_eq!(rejected, 7);
    }

    #[test]
    fn test_distinct_pools_are_independent() {
        let d = detector();
        let mut other = whale_before(50);
        other.pool_address = "pool-2".to_string();

        d.detect(whale_before(10)).unwrap();
        d.detect(other).unwrap();

        // pool-2's later timestamp does not affect pool-1 ordering
        assert!(d.detect(whale_after(20)).unwrap().is_some());
        assert_eq!(d.store().len(), 2);
    }
}
