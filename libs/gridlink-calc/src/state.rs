//! Persisted integration totals
//!
//! An integrator seeds its running total from the store once, when it is
//! registered, and writes the total back after every successful update so a
//! restart resumes instead of starting over from zero.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::StoreResult;

/// Durable storage for accumulated totals
///
/// Calls are synchronous and made while the integrator's lock is held, so
/// implementations should be quick (an in-memory map, a small file write).
pub trait TotalStore: Send + Sync {
    /// Previously persisted total for `key`, if any
    fn load_persisted_total(&self, key: &str) -> StoreResult<Option<f64>>;

    /// Record the latest total for `key`
    fn persist_total(&self, key: &str, total: f64) -> StoreResult<()>;
}

/// In-memory total store for testing and embedding
#[derive(Debug, Default)]
pub struct MemoryTotalStore {
    totals: RwLock<HashMap<String, f64>>,
}

impl MemoryTotalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with totals, e.g. from a previous run
    pub fn with_totals<K: Into<String>>(totals: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            totals: RwLock::new(totals.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.totals.read().get(key).copied()
    }

    /// Copy of every stored total
    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.totals.read().clone()
    }
}

impl TotalStore for MemoryTotalStore {
    fn load_persisted_total(&self, key: &str) -> StoreResult<Option<f64>> {
        Ok(self.get(key))
    }

    fn persist_total(&self, key: &str, total: f64) -> StoreResult<()> {
        self.totals.write().insert(key.to_string(), total);
        Ok(())
    }
}

/// Null total store - nothing survives a restart
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTotalStore;

impl TotalStore for NullTotalStore {
    fn load_persisted_total(&self, _key: &str) -> StoreResult<Option<f64>> {
        Ok(None)
    }

    fn persist_total(&self, _key: &str, _total: f64) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryTotalStore::new();
        assert_eq!(store.load_persisted_total("pv1_energy_total").unwrap(), None);

        store.persist_total("pv1_energy_total", 12.34).unwrap();
        assert_eq!(
            store.load_persisted_total("pv1_energy_total").unwrap(),
            Some(12.34)
        );
    }

    #[test]
    fn test_memory_store_seeded() {
        let store = MemoryTotalStore::with_totals([("load_power_total", 10.0)]);
        assert_eq!(store.get("load_power_total"), Some(10.0));
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_null_store_forgets() {
        let store = NullTotalStore;
        store.persist_total("k", 1.0).unwrap();
        assert_eq!(store.load_persisted_total("k").unwrap(), None);
    }
}
