//! Value descriptors
//!
//! Declarative description of how one logical measurement maps onto one or
//! two raw register words, how it is scaled and post-processed, which bounds
//! it must respect, and how it is presented.
//!
//! Catalog entries are tagged by `kind`:
//!
//! ```yaml
//! - kind: sensor
//!   key: pv1_current
//!   addresses: [11001]
//!   name: PV1 Current
//!   device_class: current
//!   state_class: measurement
//!   unit: A
//!   scale: 0.1
//!   validate: [{ range: [0, 100] }]
//! ```

use crate::error::{CatalogError, Result};
use crate::serde_defaults::{bool_true, round_digits, scale_one, step_one};
use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Validation rules
// ============================================================================

/// Constraint on a decoded numeric value
///
/// Serialized as `{ min: 0 }` or `{ range: [0, 100] }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    /// Fails if value < bound
    Min(f64),
    /// Fails if value < low or value > high (both ends inclusive)
    Range(f64, f64),
}

impl ValidationRule {
    /// Whether `value` satisfies this rule
    pub fn accepts(&self, value: f64) -> bool {
        match *self {
            Self::Min(bound) => value >= bound,
            Self::Range(low, high) => value >= low && value <= high,
        }
    }

    fn check(&self, key: &str) -> Result<()> {
        match *self {
            Self::Min(bound) if !bound.is_finite() => {
                Err(CatalogError::invalid(key, "min bound must be finite"))
            },
            Self::Range(low, high) if !low.is_finite() || !high.is_finite() => {
                Err(CatalogError::invalid(key, "range bounds must be finite"))
            },
            Self::Range(low, high) if low > high => Err(CatalogError::invalid(
                key,
                format!("range low {} is above high {}", low, high),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min(bound) => write!(f, "min({})", bound),
            Self::Range(low, high) => write!(f, "range({}, {})", low, high),
        }
    }
}

// ============================================================================
// Presentation metadata
// ============================================================================

/// Numeric display class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// Instantaneous reading
    Measurement,
    /// Cumulative total that may be reset or decrease
    Total,
    /// Cumulative total that only ever grows
    TotalIncreasing,
}

/// Physical quantity a measurement represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Voltage,
    Current,
    Power,
    Energy,
    Battery,
    Temperature,
    Frequency,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voltage => "voltage",
            Self::Current => "current",
            Self::Power => "power",
            Self::Energy => "energy",
            Self::Battery => "battery",
            Self::Temperature => "temperature",
            Self::Frequency => "frequency",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata shared by every entity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    /// Human readable name
    pub name: String,
    /// Unit of measurement (e.g. "kW", "°C")
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub device_class: Option<DeviceClass>,
    #[serde(default)]
    pub state_class: Option<StateClass>,
    #[serde(default)]
    pub icon: Option<String>,
}

// ============================================================================
// Register layout
// ============================================================================

/// Word-level view shared by everything that decodes from registers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordLayout<'a> {
    /// One or two addresses, high word first
    pub addresses: &'a [u16],
    pub scale: f64,
    pub signed: bool,
}

impl WordLayout<'_> {
    /// Register width in bits (16 or 32)
    pub fn bits(&self) -> u32 {
        if self.addresses.len() == 2 {
            32
        } else {
            16
        }
    }

    fn check(&self, key: &str) -> Result<()> {
        match self.addresses {
            [_] => {},
            [high, low] => {
                if high.abs_diff(*low) != 1 {
                    return Err(CatalogError::invalid(
                        key,
                        format!("addresses {} and {} are not adjacent words", high, low),
                    ));
                }
            },
            _ => {
                return Err(CatalogError::invalid(
                    key,
                    format!("expected 1 or 2 addresses, got {}", self.addresses.len()),
                ))
            },
        }

        if self.scale == 0.0 || !self.scale.is_finite() {
            return Err(CatalogError::invalid(
                key,
                format!("scale must be finite and non-zero, got {}", self.scale),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Entity descriptors
// ============================================================================

/// Read-only measurement decoded from one or two register words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Stable identifier, unique within a model
    pub key: String,
    /// One or two register addresses, high word first
    pub addresses: Vec<u16>,
    /// Multiplier applied to the raw integer
    #[serde(default = "scale_one")]
    pub scale: f64,
    /// Reinterpret the combined word(s) as two's-complement
    #[serde(default = "bool_true")]
    pub signed: bool,
    /// Applied to the scaled value
    #[serde(default)]
    pub post_process: Option<Transform>,
    /// All rules must pass for the value to be reported
    #[serde(default)]
    pub validate: Vec<ValidationRule>,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl SensorDescriptor {
    pub fn layout(&self) -> WordLayout<'_> {
        WordLayout {
            addresses: &self.addresses,
            scale: self.scale,
            signed: self.signed,
        }
    }

    /// Transform actually applied by the decoder
    pub fn transform(&self) -> Transform {
        self.post_process.unwrap_or(Transform::Identity)
    }

    /// Whether this sensor decodes to a number
    pub fn is_numeric(&self) -> bool {
        self.transform().is_numeric()
    }

    /// Check structural invariants
    pub fn check(&self) -> Result<()> {
        check_key(&self.key)?;
        self.layout().check(&self.key)?;
        check_rules(&self.key, &self.validate, self.is_numeric())?;

        if self.presentation.state_class == Some(StateClass::TotalIncreasing) {
            let transform = self.transform();
            if !transform.is_numeric() {
                return Err(CatalogError::invalid(
                    &self.key,
                    "total_increasing requires a numeric value",
                ));
            }
            if transform.may_yield_negative(self.signed) && !rejects_negative(&self.validate) {
                return Err(CatalogError::invalid(
                    &self.key,
                    format!(
                        "total_increasing value may go negative (transform '{}', signed: {}) \
                         and no rule bounds it at zero",
                        transform, self.signed
                    ),
                ));
            }
        }

        Ok(())
    }
}

/// Unit of the time axis when integrating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Seconds,
    Minutes,
    #[default]
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in seconds
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds => 1.0,
            Self::Minutes => 60.0,
            Self::Hours => 3600.0,
            Self::Days => 86400.0,
        }
    }
}

/// Which sample value stands for an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Previous sample (left-rectangle Riemann sum)
    #[default]
    Left,
    /// New sample
    Right,
    /// Mean of previous and new sample
    Trapezoidal,
}

/// Derived total accumulated from a numeric source measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationDescriptor {
    pub key: String,
    /// Key of the numeric measurement being integrated
    pub source: String,
    /// Decimal places the running total is rounded to
    #[serde(default = "round_digits")]
    pub round_digits: u32,
    #[serde(default)]
    pub unit_time: TimeUnit,
    #[serde(default)]
    pub method: IntegrationMethod,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl IntegrationDescriptor {
    /// Display class, `total` unless the catalog says otherwise
    pub fn state_class(&self) -> StateClass {
        self.presentation.state_class.unwrap_or(StateClass::Total)
    }

    pub fn check(&self) -> Result<()> {
        check_key(&self.key)?;
        if self.source.is_empty() {
            return Err(CatalogError::invalid(&self.key, "source key is empty"));
        }
        if self.source == self.key {
            return Err(CatalogError::invalid(&self.key, "integration cannot source itself"));
        }
        if self.round_digits > 12 {
            return Err(CatalogError::invalid(
                &self.key,
                format!("round_digits {} exceeds 12", self.round_digits),
            ));
        }
        Ok(())
    }
}

/// One labelled value of a select
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: u16,
    pub label: String,
}

/// Single word mapped through a table of labelled options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectDescriptor {
    pub key: String,
    pub address: u16,
    pub options: Vec<SelectOption>,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl SelectDescriptor {
    pub fn layout(&self) -> WordLayout<'_> {
        WordLayout {
            addresses: std::slice::from_ref(&self.address),
            scale: 1.0,
            signed: false,
        }
    }

    /// Raw value for a label, if any
    pub fn value_of(&self, label: &str) -> Option<u16> {
        self.options
            .iter()
            .find(|option| option.label == label)
            .map(|option| option.value)
    }

    /// Label for a raw value, if any
    pub fn label_of(&self, value: u16) -> Option<&str> {
        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.label.as_str())
    }

    pub fn check(&self) -> Result<()> {
        check_key(&self.key)?;
        if self.options.is_empty() {
            return Err(CatalogError::invalid(&self.key, "select has no options"));
        }
        let mut seen = BTreeSet::new();
        for option in &self.options {
            if !seen.insert(option.value) {
                return Err(CatalogError::invalid(
                    &self.key,
                    format!("option value {} listed twice", option.value),
                ));
            }
        }
        Ok(())
    }
}

/// Writable single-word setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberDescriptor {
    pub key: String,
    pub address: u16,
    #[serde(default = "scale_one")]
    pub scale: f64,
    #[serde(default = "bool_true")]
    pub signed: bool,
    /// Lowest value that may be written
    pub min: f64,
    /// Highest value that may be written
    pub max: f64,
    #[serde(default = "step_one")]
    pub step: f64,
    #[serde(default)]
    pub validate: Vec<ValidationRule>,
    #[serde(flatten)]
    pub presentation: Presentation,
}

impl NumberDescriptor {
    pub fn layout(&self) -> WordLayout<'_> {
        WordLayout {
            addresses: std::slice::from_ref(&self.address),
            scale: self.scale,
            signed: self.signed,
        }
    }

    pub fn check(&self) -> Result<()> {
        check_key(&self.key)?;
        self.layout().check(&self.key)?;
        check_rules(&self.key, &self.validate, true)?;
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(CatalogError::invalid(
                &self.key,
                format!("invalid bounds [{}, {}]", self.min, self.max),
            ));
        }
        if self.step <= 0.0 || !self.step.is_finite() {
            return Err(CatalogError::invalid(
                &self.key,
                format!("step must be positive, got {}", self.step),
            ));
        }
        Ok(())
    }
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityDescriptor {
    Sensor(SensorDescriptor),
    Integration(IntegrationDescriptor),
    Select(SelectDescriptor),
    Number(NumberDescriptor),
}

impl EntityDescriptor {
    pub fn key(&self) -> &str {
        match self {
            Self::Sensor(d) => &d.key,
            Self::Integration(d) => &d.key,
            Self::Select(d) => &d.key,
            Self::Number(d) => &d.key,
        }
    }

    pub fn presentation(&self) -> &Presentation {
        match self {
            Self::Sensor(d) => &d.presentation,
            Self::Integration(d) => &d.presentation,
            Self::Select(d) => &d.presentation,
            Self::Number(d) => &d.presentation,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Sensor(_) => "sensor",
            Self::Integration(_) => "integration",
            Self::Select(_) => "select",
            Self::Number(_) => "number",
        }
    }

    /// Register layout, `None` for derived entities
    pub fn layout(&self) -> Option<WordLayout<'_>> {
        match self {
            Self::Sensor(d) => Some(d.layout()),
            Self::Integration(_) => None,
            Self::Select(d) => Some(d.layout()),
            Self::Number(d) => Some(d.layout()),
        }
    }

    /// Whether the entity decodes to a number usable as an integration source
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Sensor(d) => d.is_numeric(),
            Self::Integration(_) | Self::Number(_) => true,
            Self::Select(_) => false,
        }
    }

    pub fn check(&self) -> Result<()> {
        match self {
            Self::Sensor(d) => d.check(),
            Self::Integration(d) => d.check(),
            Self::Select(d) => d.check(),
            Self::Number(d) => d.check(),
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CatalogError::invalid(key, "key cannot be empty"));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CatalogError::invalid(
            key,
            "key can only contain letters, numbers, underscores and hyphens",
        ));
    }
    Ok(())
}

/// Whether some rule rejects every negative value
fn rejects_negative(rules: &[ValidationRule]) -> bool {
    rules.iter().any(|rule| match *rule {
        ValidationRule::Min(bound) => bound >= 0.0,
        ValidationRule::Range(low, _) => low >= 0.0,
    })
}

fn check_rules(key: &str, rules: &[ValidationRule], numeric: bool) -> Result<()> {
    if !rules.is_empty() && !numeric {
        return Err(CatalogError::invalid(
            key,
            "validation rules require a numeric value",
        ));
    }
    rules.iter().try_for_each(|rule| rule.check(key))
}
