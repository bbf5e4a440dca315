//! gridlink-calc - Energy integration for GridLink inverters
//!
//! Derives accumulated energy totals from instantaneous power readings and
//! runs the per-cycle decode, validate and integrate pipeline.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use gridlink_calc::{InverterPipeline, MemoryTotalStore};
//! use gridlink_registers::{Catalog, RegisterWords};
//! use std::sync::Arc;
//!
//! let catalog = Catalog::from_yaml_str(r#"
//! families:
//!   pv:
//!     - { kind: sensor, key: pv1_power, addresses: [11002], name: PV1 Power, scale: 0.5 }
//!     - { kind: integration, key: pv1_energy_total, source: pv1_power, name: PV1 Power Total }
//! models:
//!   H1: [pv]
//! "#).unwrap();
//!
//! let store = Arc::new(MemoryTotalStore::new());
//! let pipeline = InverterPipeline::new(catalog.model("H1").unwrap(), store).unwrap();
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
//! let words: RegisterWords = [(11002, 4)].into_iter().collect();
//! pipeline.process(&words, t0);
//! let report = pipeline.process(&words, t0 + Duration::hours(1));
//! assert_eq!(report.number("pv1_energy_total"), Some(2.0));
//! ```
//!
//! # Integration methods
//!
//! | Method | Interval value |
//! |--------|----------------|
//! | `left` | previous sample (default) |
//! | `right` | new sample |
//! | `trapezoidal` | mean of both |

pub mod error;
pub mod integrator;
pub mod pipeline;
pub mod registry;
pub mod state;

// Re-exports for convenience
pub use error::{CalcError, Result, StoreError, StoreResult};
pub use integrator::{round, IntegrationUpdate, Integrator, Sample, UpdateOutcome};
pub use pipeline::{CycleReport, InverterPipeline, Reading};
pub use registry::EnergyIntegrators;
pub use state::{MemoryTotalStore, NullTotalStore, TotalStore};
