//! Register decoder
//!
//! Turns one or two raw 16-bit words plus a descriptor into a typed value:
//!
//! 1. look up the word(s); a missing word means the measurement is unavailable
//! 2. combine two words as `(high << 16) | low`
//! 3. reinterpret as two's-complement when the descriptor is signed
//! 4. multiply by the scale
//! 5. apply the post-process transform to the scaled value
//!
//! Decoding is a pure function of the descriptor and the snapshot.

use crate::descriptor::{
    EntityDescriptor, NumberDescriptor, SelectDescriptor, SensorDescriptor, WordLayout,
};
use crate::error::Unavailable;
use crate::validation::validate;
use crate::value::Value;
use crate::words::RegisterWords;
use tracing::debug;

/// Combined raw integer for a layout (steps 1-3)
pub fn read_raw(layout: &WordLayout<'_>, words: &RegisterWords) -> Result<i64, Unavailable> {
    let word = |address: u16| words.get(address).ok_or(Unavailable::MissingWord(address));

    match *layout.addresses {
        [address] => {
            let w = word(address)?;
            Ok(if layout.signed {
                i64::from(w as i16)
            } else {
                i64::from(w)
            })
        },
        [high, low] => {
            let combined = (u32::from(word(high)?) << 16) | u32::from(word(low)?);
            Ok(if layout.signed {
                i64::from(combined as i32)
            } else {
                i64::from(combined)
            })
        },
        // Catalog loading rejects any other address count
        _ => Err(Unavailable::InvalidLayout(layout.addresses.len())),
    }
}

/// Raw integer multiplied by the layout's scale (step 4)
pub fn read_scaled(layout: &WordLayout<'_>, words: &RegisterWords) -> Result<f64, Unavailable> {
    read_raw(layout, words).map(|raw| raw as f64 * layout.scale)
}

/// Decode a sensor without applying validation rules
pub fn decode(descriptor: &SensorDescriptor, words: &RegisterWords) -> Result<Value, Unavailable> {
    let scaled = read_scaled(&descriptor.layout(), words)?;
    descriptor.transform().apply(scaled)
}

/// Decode a select into its option label
pub fn decode_select(
    descriptor: &SelectDescriptor,
    words: &RegisterWords,
) -> Result<Value, Unavailable> {
    let raw = read_raw(&descriptor.layout(), words)?;
    u16::try_from(raw)
        .ok()
        .and_then(|value| descriptor.label_of(value))
        .map(|label| Value::Label(label.to_string()))
        .ok_or(Unavailable::UnknownOption(raw))
}

/// Decode a number setting without applying validation rules
pub fn decode_number(
    descriptor: &NumberDescriptor,
    words: &RegisterWords,
) -> Result<Value, Unavailable> {
    read_scaled(&descriptor.layout(), words).map(Value::Number)
}

/// Decode and validate a sensor
///
/// A value that fails validation is reported as unavailable, never clamped.
pub fn read_sensor(
    descriptor: &SensorDescriptor,
    words: &RegisterWords,
) -> Result<Value, Unavailable> {
    let value = decode(descriptor, words)?;
    checked(&descriptor.key, value, &descriptor.validate)
}

/// Decode and validate any register-backed entity
///
/// Returns `None` for derived entities (integrations), which have no words.
pub fn read_entity(
    entity: &EntityDescriptor,
    words: &RegisterWords,
) -> Option<Result<Value, Unavailable>> {
    match entity {
        EntityDescriptor::Sensor(d) => Some(read_sensor(d, words)),
        EntityDescriptor::Select(d) => Some(decode_select(d, words)),
        EntityDescriptor::Number(d) => {
            Some(decode_number(d, words).and_then(|value| checked(&d.key, value, &d.validate)))
        },
        EntityDescriptor::Integration(_) => None,
    }
}

fn checked(
    key: &str,
    value: Value,
    rules: &[crate::descriptor::ValidationRule],
) -> Result<Value, Unavailable> {
    match validate(key, &value, rules) {
        Ok(()) => Ok(value),
        Err(reason) => {
            debug!(key = key, value = %value, reason = %reason, "validation rejected value");
            Err(reason)
        },
    }
}
