//! gridlink-registers - Register decoding for GridLink inverters
//!
//! Turns raw 16-bit register words into typed, validated measurements.
//!
//! # Features
//!
//! - **Descriptors**: declarative sensor/select/number/integration entries
//! - **Decoder**: word combination, two's-complement, scaling, transforms
//! - **Validator**: `min` / `range` rules, failures reported as unavailable
//! - **Encoder**: the inverse path used for writes
//! - **Catalog**: families and models loaded from YAML or JSON
//!
//! # Example
//!
//! ```rust
//! use gridlink_registers::{decode, EntityDescriptor, RegisterWords, Value};
//!
//! let entity: EntityDescriptor = serde_yaml::from_str(
//!     "{ kind: sensor, key: pv1_energy, addresses: [11070, 11069], name: PV1 Energy, scale: 0.1, signed: false }",
//! )
//! .unwrap();
//! let EntityDescriptor::Sensor(sensor) = entity else { unreachable!() };
//!
//! let words: RegisterWords = [(11070, 1), (11069, 0)].into_iter().collect();
//! let value = decode(&sensor, &words).unwrap();
//! assert!((value.as_f64().unwrap() - 6553.6).abs() < 1e-9);
//! ```
//!
//! # Transforms
//!
//! | Name | Result |
//! |------|--------|
//! | `identity` | scaled value |
//! | `positive_part` | `v` if `v > 0`, else 0 |
//! | `negative_part_abs` | `abs(v)` if `v < 0`, else 0 |
//! | `bool_from_word` | `v != 0` |
//! | `packed_time` | `hh:mm` from high/low byte |

pub mod catalog;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod serde_defaults;
pub mod transform;
pub mod validation;
pub mod value;
pub mod words;

// Re-exports for convenience
pub use catalog::{Catalog, CatalogDocument, ResolvedModel};
pub use decoder::{decode, decode_number, decode_select, read_entity, read_sensor};
pub use descriptor::{
    DeviceClass, EntityDescriptor, IntegrationDescriptor, IntegrationMethod, NumberDescriptor,
    Presentation, SelectDescriptor, SelectOption, SensorDescriptor, StateClass, TimeUnit,
    ValidationRule, WordLayout,
};
pub use encoder::{encode, EncodedWords};
pub use error::{CatalogError, EncodeError, Result, Unavailable};
pub use transform::Transform;
pub use validation::validate;
pub use value::Value;
pub use words::{RegisterSource, RegisterWords};
