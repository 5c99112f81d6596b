//! Latest-snapshot baseline per pool.

use std::sync::{Arc, Mutex, PoisonError};

use rustc_hash::FxHashMap;

use crate::models::PoolSnapshot;

type Slot = Arc<Mutex<Option<PoolSnapshot>>>;

/// Holds the most recent snapshot of every observed pool.
///
/// Each pool owns its own lock. The outer map is only held while a slot is
/// looked up or created, so cycles for different pools never wait on each
/// other while cycles for the same pool are serialized.
///
/// Slots are kept until [`SnapshotStore::remove`] is called, so the map grows
/// with the number of distinct pools ever observed.
#[derive(Default)]
pub struct SnapshotStore {
    slots: Mutex<FxHashMap<String, Slot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, pool_address: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(pool_address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Run `f` with exclusive access to the pool's baseline.
    ///
    /// `f` may read and replace the baseline; no other caller can observe or
    /// modify the same pool's baseline until it returns.
    pub fn with_baseline<R>(
        &self,
        pool_address: &str,
        f: impl FnOnce(&mut Option<PoolSnapshot>) -> R,
    ) -> R {
        let slot = self.slot(pool_address);
        let mut baseline = slot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut baseline)
    }

    pub fn get(&self, pool_address: &str) -> Option<PoolSnapshot> {
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.get(pool_address).cloned()
        }?;
        let baseline = slot.lock().unwrap_or_else(PoisonError::into_inner);
        baseline.clone()
    }

    /// Replace the pool's baseline unconditionally.
    pub fn put(&self, snapshot: PoolSnapshot) {
        let pool_address = snapshot.pool_address.clone();
        self.with_baseline(&pool_address, |baseline| *baseline = Some(snapshot));
    }

    /// Forget a pool, returning its last baseline.
    ///
    /// A cycle already holding the old slot finishes against it; the next
    /// cycle for the pool starts from a fresh slot and seeds a new baseline.
    pub fn remove(&self, pool_address: &str) -> Option<PoolSnapshot> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.remove(pool_address)
        }?;
        let mut baseline = slot.lock().unwrap_or_else(PoisonError::into_inner);
        baseline.take()
    }

    /// Number of pools with a stored baseline.
    pub fn len(&self) -> usize {
        self.pools().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Addresses of pools with a stored baseline, sorted.
    pub fn pools(&self) -> Vec<String> {
        let slots: Vec<(String, Slot)> = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots
                .iter()
                .map(|(address, slot)| (address.clone(), slot.clone()))
                .collect()
        };

        let mut pools: Vec<String> = slots
            .into_iter()
            .filter(|(_, slot)| {
                slot.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .is_some()
            })
            .map(|(address, _)| address)
            .collect();
        pools.sort();
        pools
    }
}
