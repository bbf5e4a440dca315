//! Poll-cycle pipeline
//!
//! Binds a resolved model to its energy integrators. Each cycle decodes and
//! validates every register-backed entity against one immutable snapshot,
//! then feeds each integration with its source's result. A rejected or
//! missing source is a skipped sample, never a zero.

use chrono::{DateTime, Utc};
use gridlink_registers::{
    read_entity, EntityDescriptor, RegisterSource, RegisterWords, ResolvedModel, Unavailable,
    Value,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::integrator::IntegrationUpdate;
use crate::registry::EnergyIntegrators;
use crate::state::TotalStore;

/// Outcome for one entity in one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reading {
    /// Decoded and validated register value
    Value { value: Value },
    /// Integration total after this cycle's update
    Total { update: IntegrationUpdate },
    /// No value this cycle
    Unavailable { reason: String },
}

impl Reading {
    fn from_result(result: std::result::Result<Value, Unavailable>) -> Self {
        match result {
            Ok(value) => Self::Value { value },
            Err(reason) => Self::unavailable(&reason),
        }
    }

    fn unavailable(reason: &Unavailable) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable { .. })
    }
}

/// Everything one poll cycle produced, in catalog order
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub readings: Vec<(String, Reading)>,
}

impl CycleReport {
    pub fn get(&self, key: &str) -> Option<&Reading> {
        self.readings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, reading)| reading)
    }

    /// Numeric value or total for `key`, if available
    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Reading::Value { value } => value.as_f64(),
            Reading::Total { update } => Some(update.total),
            Reading::Unavailable { .. } => None,
        }
    }

    pub fn available_count(&self) -> usize {
        self.readings.iter().filter(|(_, r)| r.is_available()).count()
    }

    pub fn unavailable_count(&self) -> usize {
        self.readings.len() - self.available_count()
    }

    /// Integrations whose current total is not yet in the store
    pub fn persist_failures(&self) -> Vec<&str> {
        self.readings
            .iter()
            .filter_map(|(key, reading)| match reading {
                Reading::Total { update } if !update.persisted => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Decode-validate-integrate pipeline for one device
pub struct InverterPipeline<S: TotalStore> {
    model: Arc<ResolvedModel>,
    integrators: EnergyIntegrators<S>,
    addresses: BTreeSet<u16>,
}

impl<S: TotalStore> InverterPipeline<S> {
    /// Register an integrator for every integration in the model
    pub fn new(model: Arc<ResolvedModel>, store: Arc<S>) -> Result<Self> {
        let integrators = EnergyIntegrators::new(store);
        for integration in model.integrations() {
            integrators.register(integration)?;
        }
        let addresses = model.required_addresses();

        Ok(Self {
            model,
            integrators,
            addresses,
        })
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn integrators(&self) -> &EnergyIntegrators<S> {
        &self.integrators
    }

    /// Addresses a poll must read for this model
    pub fn required_addresses(&self) -> &BTreeSet<u16> {
        &self.addresses
    }

    /// Read the model's words from `source` and process them
    pub fn poll<R: RegisterSource + ?Sized>(
        &self,
        source: &R,
        timestamp: DateTime<Utc>,
    ) -> CycleReport {
        let words = source.read_words(&self.addresses);
        self.process(&words, timestamp)
    }

    /// Decode one snapshot and advance every integration
    pub fn process(&self, words: &RegisterWords, timestamp: DateTime<Utc>) -> CycleReport {
        let decoded: HashMap<&str, std::result::Result<Value, Unavailable>> = self
            .model
            .entities()
            .iter()
            .filter_map(|entity| read_entity(entity, words).map(|result| (entity.key(), result)))
            .collect();

        let readings: Vec<(String, Reading)> = self
            .model
            .entities()
            .iter()
            .map(|entity| {
                let reading = match entity {
                    EntityDescriptor::Integration(d) => {
                        let sample = decoded
                            .get(d.source.as_str())
                            .and_then(|result| result.as_ref().ok())
                            .and_then(Value::as_f64);
                        match self.integrators.integrate(&d.key, sample, timestamp) {
                            Ok(update) => Reading::Total { update },
                            Err(reason) => Reading::unavailable(&reason),
                        }
                    },
                    _ => match decoded.get(entity.key()) {
                        Some(result) => Reading::from_result(result.clone()),
                        None => Reading::unavailable(&Unavailable::UnknownMeasurement(
                            entity.key().to_string(),
                        )),
                    },
                };
                (entity.key().to_string(), reading)
            })
            .collect();

        let report = CycleReport {
            timestamp,
            readings,
        };

        debug!(
            model = %self.model.name(),
            words = words.len(),
            available = report.available_count(),
            unavailable = report.unavailable_count(),
            "poll cycle processed"
        );

        report
    }
}
