//! Integrator registry
//!
//! One mutex-guarded [`Integrator`] per integration key. Updates to the same
//! key are serialized; different keys proceed independently.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gridlink_registers::{IntegrationDescriptor, Unavailable};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

use crate::error::{CalcError, Result};
use crate::integrator::{IntegrationUpdate, Integrator};
use crate::state::TotalStore;

/// Live energy totals for one device
pub struct EnergyIntegrators<S: TotalStore> {
    store: Arc<S>,
    integrators: DashMap<String, Arc<Mutex<Integrator>>>,
}

impl<S: TotalStore> EnergyIntegrators<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            integrators: DashMap::new(),
        }
    }

    /// Create the integrator for an integration entry
    ///
    /// The persisted total is loaded exactly once, here.
    ///
    /// # Returns
    /// The seeded total
    pub fn register(&self, descriptor: &IntegrationDescriptor) -> Result<f64> {
        if self.integrators.contains_key(&descriptor.key) {
            return Err(CalcError::already_registered(&descriptor.key));
        }

        let seed = self.store.load_persisted_total(&descriptor.key)?;
        let integrator = Integrator::new(descriptor, seed);
        let total = integrator.total();

        info!(
            key = %descriptor.key,
            source = %descriptor.source,
            total = total,
            resumed = seed.is_some(),
            "integration registered"
        );

        self.integrators
            .insert(descriptor.key.clone(), Arc::new(Mutex::new(integrator)));
        Ok(total)
    }

    /// Feed one sample into the integrator bound to `key`
    ///
    /// # Arguments
    /// * `key` - Integration key
    /// * `value` - Source reading, `None` when unavailable this cycle
    /// * `timestamp` - Poll timestamp
    ///
    /// # Returns
    /// * `Ok(update)` - Total after the update
    /// * `Err(Unavailable::UnknownMeasurement)` - No integrator for `key`
    pub fn integrate(
        &self,
        key: &str,
        value: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<IntegrationUpdate, Unavailable> {
        // Clone the handle so the map shard is not held while integrating
        let integrator = self
            .integrators
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Unavailable::UnknownMeasurement(key.to_string()))?;

        let mut integrator = integrator.lock();
        Ok(integrator.update(value, timestamp, self.store.as_ref()))
    }

    /// Current total for `key`
    pub fn total(&self, key: &str) -> Option<f64> {
        self.integrators.get(key).map(|entry| entry.value().lock().total())
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.integrators.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.integrators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrators.is_empty()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}
