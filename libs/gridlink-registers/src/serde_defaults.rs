//! Serde default value functions for descriptor fields
//!
//! Used through `#[serde(default = "...")]` so catalog files only spell out
//! what differs from the common case.

/// Default value: true
///
/// Register values are two's-complement unless a descriptor opts out.
pub fn bool_true() -> bool {
    true
}

/// Default scale factor: 1.0 (raw integer is already the physical value)
pub fn scale_one() -> f64 {
    1.0
}

/// Default step value: 1.0
///
/// Used for writable number settings.
pub fn step_one() -> f64 {
    1.0
}

/// Default rounding for integrated totals: 2 decimal places
pub fn round_digits() -> u32 {
    2
}
