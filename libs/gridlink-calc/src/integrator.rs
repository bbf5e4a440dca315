//! Energy integrator
//!
//! Converts a stream of instantaneous power samples into a running energy
//! total. With the default `left` method each interval is charged at the
//! power of the sample that opened it, so a step change in power shows up
//! in the following interval:
//!
//! ```text
//! increment = previous_value * elapsed / unit_time
//! total     = round(total + increment, round_digits)
//! ```
//!
//! An unavailable sample is skipped without touching the last good sample,
//! so the next valid sample integrates over the whole gap at the old power.

use chrono::{DateTime, Utc};
use gridlink_registers::{IntegrationDescriptor, IntegrationMethod, TimeUnit};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::TotalStore;

/// One accepted instantaneous reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub time: DateTime<Utc>,
}

/// What an update did to the integrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// First sample; stored as the baseline, nothing to integrate yet
    Baseline,
    /// Interval integrated and the sample stored
    Integrated,
    /// Source unavailable this cycle; state untouched
    Unavailable,
    /// Timestamp not after the last sample; state untouched
    NonMonotonic,
}

/// Result of one integrator update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationUpdate {
    /// Accumulated total after the update
    pub total: f64,
    pub outcome: UpdateOutcome,
    /// Whether the store holds the current total
    pub persisted: bool,
}

impl IntegrationUpdate {
    /// Whether the sample was accepted as the new last sample
    pub fn advanced(&self) -> bool {
        matches!(
            self.outcome,
            UpdateOutcome::Baseline | UpdateOutcome::Integrated
        )
    }
}

/// Running total for one derived energy measurement
#[derive(Debug, Clone)]
pub struct Integrator {
    key: String,
    method: IntegrationMethod,
    unit_time: TimeUnit,
    round_digits: u32,
    total: f64,
    last: Option<Sample>,
    persist_pending: bool,
}

impl Integrator {
    /// Create an integrator, seeding the total from a persisted value
    ///
    /// # Arguments
    /// * `descriptor` - Integration entry from the catalog
    /// * `seed` - Previously persisted total, `None` starts at zero
    pub fn new(descriptor: &IntegrationDescriptor, seed: Option<f64>) -> Self {
        let total = seed.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0);
        Self {
            key: descriptor.key.clone(),
            method: descriptor.method,
            unit_time: descriptor.unit_time,
            round_digits: descriptor.round_digits,
            total,
            last: None,
            persist_pending: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn last_sample(&self) -> Option<Sample> {
        self.last
    }

    /// Whether the last persistence attempt failed
    pub fn persist_pending(&self) -> bool {
        self.persist_pending
    }

    /// Feed one sample and persist the result
    ///
    /// # Arguments
    /// * `value` - Source reading, `None` when unavailable this cycle
    /// * `time` - Poll timestamp
    /// * `store` - Where the updated total is written
    ///
    /// # Returns
    /// The total after the update and what happened to it
    pub fn update<S: TotalStore + ?Sized>(
        &mut self,
        value: Option<f64>,
        time: DateTime<Utc>,
        store: &S,
    ) -> IntegrationUpdate {
        let outcome = self.advance(value, time);

        let should_persist = match outcome {
            UpdateOutcome::Integrated => true,
            UpdateOutcome::Baseline => self.persist_pending,
            UpdateOutcome::Unavailable | UpdateOutcome::NonMonotonic => false,
        };
        if should_persist {
            self.persist(store);
        }

        IntegrationUpdate {
            total: self.total,
            outcome,
            persisted: !self.persist_pending,
        }
    }

    /// State transition without persistence
    pub fn advance(&mut self, value: Option<f64>, time: DateTime<Utc>) -> UpdateOutcome {
        let Some(value) = value.filter(|v| v.is_finite()) else {
            debug!(key = %self.key, "integration sample unavailable, skipped");
            return UpdateOutcome::Unavailable;
        };

        let Some(last) = self.last else {
            self.last = Some(Sample { value, time });
            return UpdateOutcome::Baseline;
        };

        let elapsed_secs = (time - last.time).num_milliseconds() as f64 / 1000.0;
        if elapsed_secs <= 0.0 {
            debug!(
                key = %self.key,
                elapsed_secs = elapsed_secs,
                "non-monotonic sample ignored"
            );
            return UpdateOutcome::NonMonotonic;
        }

        let rate = match self.method {
            IntegrationMethod::Left => last.value,
            IntegrationMethod::Right => value,
            IntegrationMethod::Trapezoidal => (last.value + value) / 2.0,
        };
        let mut increment = rate * elapsed_secs / self.unit_time.seconds();
        if increment < 0.0 {
            debug!(
                key = %self.key,
                increment = increment,
                "negative increment clamped to zero"
            );
            increment = 0.0;
        }

        self.total = round(self.total + increment, self.round_digits);
        self.last = Some(Sample { value, time });

        debug!(
            key = %self.key,
            value = rate,
            elapsed_secs = elapsed_secs,
            increment = increment,
            total = self.total,
            "integrate"
        );

        UpdateOutcome::Integrated
    }

    fn persist<S: TotalStore + ?Sized>(&mut self, store: &S) {
        match store.persist_total(&self.key, self.total) {
            Ok(()) => {
                if self.persist_pending {
                    debug!(key = %self.key, total = self.total, "persisted total after retry");
                }
                self.persist_pending = false;
            },
            Err(e) => {
                warn!(key = %self.key, total = self.total, "Failed to persist total: {}", e);
                self.persist_pending = true;
            },
        }
    }
}

/// Round to `decimals` places
pub fn round(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::error::{StoreError, StoreResult};
    use crate::state::MemoryTotalStore;
    use chrono::{Duration, TimeZone};
    use gridlink_registers::Presentation;
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    fn descriptor(method: IntegrationMethod) -> IntegrationDescriptor {
        IntegrationDescriptor {
            key: "pv1_energy_total".to_string(),
            source: "pv1_power".to_string(),
            round_digits: 2,
            unit_time: TimeUnit::Hours,
            method,
            presentation: Presentation {
                name: "PV1 Power Total".to_string(),
                unit: Some("kWh".to_string()),
                device_class: None,
                state_class: None,
                icon: None,
            },
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn hours(h: i64) -> DateTime<Utc> {
        t0() + Duration::hours(h)
    }

    /// Fails the first `failures` writes
    struct FlakyStore {
        failures: Mutex<u32>,
        inner: MemoryTotalStore,
    }

    impl TotalStore for FlakyStore {
        fn load_persisted_total(&self, key: &str) -> StoreResult<Option<f64>> {
            self.inner.load_persisted_total(key)
        }

        fn persist_total(&self, key: &str, total: f64) -> StoreResult<()> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(StoreError::io("disk full"));
            }
            self.inner.persist_total(key, total)
        }
    }

    #[test]
    fn test_left_riemann_scenario() {
        let store = MemoryTotalStore::new();
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), None);

        let first = integrator.update(Some(2.0), hours(0), &store);
        assert_eq!(first.total, 0.0);
        assert_eq!(first.outcome, UpdateOutcome::Baseline);

        let second = integrator.update(Some(4.0), hours(1), &store);
        assert_eq!(second.total, 2.0);

        let third = integrator.update(Some(0.0), hours(2), &store);
        assert_eq!(third.total, 6.0);
        assert_eq!(store.get("pv1_energy_total"), Some(6.0));
    }

    #[test]
    fn test_right_and_trapezoidal() {
        let store = MemoryTotalStore::new();
        let mut right = Integrator::new(&descriptor(IntegrationMethod::Right), None);
        right.update(Some(2.0), hours(0), &store);
        assert_eq!(right.update(Some(4.0), hours(1), &store).total, 4.0);

        let mut trapezoid = Integrator::new(&descriptor(IntegrationMethod::Trapezoidal), None);
        trapezoid.update(Some(2.0), hours(0), &store);
        assert_eq!(trapezoid.update(Some(4.0), hours(1), &store).total, 3.0);
    }

    #[test]
    fn test_resume_from_persisted_total() {
        let store = MemoryTotalStore::new();
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), Some(10.0));

        let baseline = integrator.update(Some(3.0), hours(5), &store);
        assert_eq!(baseline.total, 10.0);
        assert_eq!(integrator.update(Some(3.0), hours(6), &store).total, 13.0);
    }

    #[test]
    fn test_unavailable_sample_keeps_last_good_point() {
        let store = MemoryTotalStore::new();
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), None);
        integrator.update(Some(2.0), hours(0), &store);

        let skipped = integrator.update(None, hours(1), &store);
        assert_eq!(skipped.outcome, UpdateOutcome::Unavailable);
        assert_eq!(skipped.total, 0.0);
        assert_eq!(integrator.last_sample().unwrap().time, hours(0));

        // Integrates the full two hours at the last good value
        assert_eq!(integrator.update(Some(1.0), hours(2), &store).total, 4.0);
    }

    #[test]
    fn test_non_monotonic_time_is_ignored() {
        let store = MemoryTotalStore::new();
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), None);
        integrator.update(Some(2.0), hours(0), &store);
        integrator.update(Some(4.0), hours(1), &store);

        let duplicate = integrator.update(Some(100.0), hours(1), &store);
        assert_eq!(duplicate.outcome, UpdateOutcome::NonMonotonic);
        assert_eq!(duplicate.total, 2.0);

        let earlier = integrator.update(Some(100.0), hours(0), &store);
        assert_eq!(earlier.total, 2.0);
        assert_eq!(integrator.last_sample().unwrap().value, 4.0);
    }

    #[test]
    fn test_total_rounded_each_update() {
        let store = MemoryTotalStore::new();
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), None);
        integrator.update(Some(1.0), t0(), &store);
        // 1 kW for 10 s = 0.002777 kWh
        let update = integrator.update(Some(1.0), t0() + Duration::seconds(10), &store);
        assert_eq!(update.total, 0.0);
        let update = integrator.update(Some(1.0), t0() + Duration::seconds(30), &store);
        assert_eq!(update.total, 0.01);
    }

    #[test]
    fn test_negative_power_never_decreases_total() {
        let store = MemoryTotalStore::new();
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), Some(5.0));
        integrator.update(Some(-0.2), hours(0), &store);
        assert_eq!(integrator.update(Some(1.0), hours(1), &store).total, 5.0);
    }

    #[test]
    fn test_time_units() {
        let store = MemoryTotalStore::new();
        let mut d = descriptor(IntegrationMethod::Left);
        d.unit_time = TimeUnit::Minutes;
        let mut integrator = Integrator::new(&d, None);
        integrator.update(Some(2.0), hours(0), &store);
        assert_eq!(integrator.update(Some(2.0), hours(1), &store).total, 120.0);
    }

    #[test]
    #[traced_test]
    fn test_persistence_failure_retried_on_next_update() {
        let store = FlakyStore {
            failures: Mutex::new(1),
            inner: MemoryTotalStore::new(),
        };
        let mut integrator = Integrator::new(&descriptor(IntegrationMethod::Left), None);
        integrator.update(Some(2.0), hours(0), &store);

        let failed = integrator.update(Some(2.0), hours(1), &store);
        assert_eq!(failed.total, 2.0);
        assert!(!failed.persisted);
        assert!(integrator.persist_pending());
        assert_eq!(store.inner.get("pv1_energy_total"), None);
        assert!(logs_contain("Failed to persist total"));

        // Unavailable samples do not retry
        assert!(!integrator.update(None, hours(2), &store).persisted);

        let retried = integrator.update(Some(2.0), hours(2), &store);
        assert_eq!(retried.total, 4.0);
        assert!(retried.persisted);
        assert_eq!(store.inner.get("pv1_energy_total"), Some(4.0));
    }

    #[test]
    fn test_invalid_seed_starts_at_zero() {
        let integrator = Integrator::new(&descriptor(IntegrationMethod::Left), Some(f64::NAN));
        assert_eq!(integrator.total(), 0.0);
    }

    #[test]
    fn test_round() {
        assert_eq!(round(3.14159, 2), 3.14);
        assert_eq!(round(2.5, 0), 3.0);
        assert_eq!(round(-1.005, 1), -1.0);
    }
}
