//! Register encoder
//!
//! Inverse of the decoder: turns a physical value back into the word(s) a
//! write would send. Divides by the scale, rounds to the nearest integer,
//! checks the register domain and splits 32-bit values high word first.

use crate::descriptor::{
    EntityDescriptor, NumberDescriptor, SelectDescriptor, SensorDescriptor, WordLayout,
};
use crate::error::EncodeError;
use crate::transform::Transform;
use crate::validation::accepts;
use crate::value::Value;

/// `(address, word)` pairs in write order
pub type EncodedWords = Vec<(u16, u16)>;

/// Encode a value for any writable entity
///
/// # Arguments
/// * `entity` - Target descriptor
/// * `value` - A number for sensors and numbers, a label for selects
///
/// # Returns
/// * `Ok(words)` - Words to write, high word first
/// * `Err(EncodeError)` - The entity is derived, or the value does not fit
pub fn encode(entity: &EntityDescriptor, value: &Value) -> Result<EncodedWords, EncodeError> {
    match (entity, value) {
        (EntityDescriptor::Integration(d), _) => Err(EncodeError::NotWritable(d.key.clone())),
        (EntityDescriptor::Select(d), Value::Label(label)) => encode_select(d, label),
        (EntityDescriptor::Sensor(d), Value::Number(n)) => encode_sensor(d, *n),
        (EntityDescriptor::Number(d), Value::Number(n)) => encode_number(d, *n),
        _ => Err(EncodeError::WrongType(entity.key().to_string())),
    }
}

/// Encode a plain scaled sensor
///
/// Only sensors without a post-process transform can be inverted.
pub fn encode_sensor(
    descriptor: &SensorDescriptor,
    value: f64,
) -> Result<EncodedWords, EncodeError> {
    if descriptor.transform() != Transform::Identity {
        return Err(EncodeError::NotWritable(descriptor.key.clone()));
    }
    encode_layout(&descriptor.key, &descriptor.layout(), value)
}

/// Encode a setting after checking its bounds, step and validation rules
pub fn encode_number(
    descriptor: &NumberDescriptor,
    value: f64,
) -> Result<EncodedWords, EncodeError> {
    if !(descriptor.min..=descriptor.max).contains(&value) {
        return Err(EncodeError::OutOfBounds {
            key: descriptor.key.clone(),
            value,
            min: descriptor.min,
            max: descriptor.max,
        });
    }
    if !on_step(value, descriptor.min, descriptor.step) {
        return Err(EncodeError::OffStep {
            key: descriptor.key.clone(),
            value,
            min: descriptor.min,
            step: descriptor.step,
        });
    }
    if !accepts(value, &descriptor.validate) {
        return Err(EncodeError::Rejected {
            key: descriptor.key.clone(),
            value,
        });
    }
    encode_layout(&descriptor.key, &descriptor.layout(), value)
}

/// Whether `value` lies on the `min + k * step` grid
fn on_step(value: f64, min: f64, step: f64) -> bool {
    let steps = (value - min) / step;
    (steps - steps.round()).abs() <= STEP_TOLERANCE
}

/// Fraction of a step absorbed as float noise (e.g. 0.1 + 0.2)
const STEP_TOLERANCE: f64 = 1e-6;

/// Encode a select label to its raw option value
pub fn encode_select(
    descriptor: &SelectDescriptor,
    label: &str,
) -> Result<EncodedWords, EncodeError> {
    let raw = descriptor
        .value_of(label)
        .ok_or_else(|| EncodeError::UnknownLabel {
            key: descriptor.key.clone(),
            label: label.to_string(),
        })?;
    Ok(vec![(descriptor.address, raw)])
}

/// Scale, round and split a value according to a word layout
pub fn encode_layout(
    key: &str,
    layout: &WordLayout<'_>,
    value: f64,
) -> Result<EncodedWords, EncodeError> {
    let out_of_domain = || EncodeError::OutOfDomain {
        key: key.to_string(),
        value,
        bits: layout.bits(),
        signed: layout.signed,
    };

    let scaled = (value / layout.scale).round();
    if !scaled.is_finite() {
        return Err(out_of_domain());
    }

    let (low_limit, high_limit) = match (layout.bits(), layout.signed) {
        (16, true) => (f64::from(i16::MIN), f64::from(i16::MAX)),
        (16, false) => (0.0, f64::from(u16::MAX)),
        (_, true) => (f64::from(i32::MIN), f64::from(i32::MAX)),
        (_, false) => (0.0, f64::from(u32::MAX)),
    };
    if scaled < low_limit || scaled > high_limit {
        return Err(out_of_domain());
    }

    let raw = scaled as i64;
    match *layout.addresses {
        [address] => Ok(vec![(address, raw as u16)]),
        [high, low] => {
            let bits = raw as u32;
            Ok(vec![(high, (bits >> 16) as u16), (low, (bits & 0xFFFF) as u16)])
        },
        _ => Err(EncodeError::NotWritable(key.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::descriptor::{Presentation, SelectOption, ValidationRule};

    fn presentation() -> Presentation {
        Presentation {
            name: "Test".to_string(),
            unit: None,
            device_class: None,
            state_class: None,
            icon: None,
        }
    }

    fn min_soc() -> NumberDescriptor {
        NumberDescriptor {
            key: "min_soc".to_string(),
            address: 41009,
            scale: 1.0,
            signed: true,
            min: 10.0,
            max: 100.0,
            step: 1.0,
            validate: vec![ValidationRule::Range(0.0, 100.0)],
            presentation: presentation(),
        }
    }

    fn layout(addresses: &[u16], scale: f64, signed: bool) -> WordLayout<'_> {
        WordLayout {
            addresses,
            scale,
            signed,
        }
    }

    #[test]
    fn test_two_word_split_high_first() {
        let words = encode_layout("k", &layout(&[11070, 11069], 0.1, false), 6553.6).unwrap();
        assert_eq!(words, vec![(11070, 1), (11069, 0)]);
    }

    #[test]
    fn test_negative_two_word() {
        let words = encode_layout("k", &layout(&[1, 2], 1.0, true), -1.0).unwrap();
        assert_eq!(words, vec![(1, 0xFFFF), (2, 0xFFFF)]);
    }

    #[test]
    fn test_negative_single_word() {
        let words = encode_layout("k", &layout(&[11008], 0.001, true), -0.5).unwrap();
        assert_eq!(words, vec![(11008, (-500_i16) as u16)]);
    }

    #[test]
    fn test_domain_checks() {
        assert!(encode_layout("k", &layout(&[1], 1.0, false), -1.0).is_err());
        assert!(encode_layout("k", &layout(&[1], 1.0, false), 65536.0).is_err());
        assert!(encode_layout("k", &layout(&[1], 1.0, true), 32768.0).is_err());
        assert!(encode_layout("k", &layout(&[1], 1.0, true), f64::NAN).is_err());
        assert!(encode_layout("k", &layout(&[1, 2], 1.0, false), 4294967295.0).is_ok());
    }

    #[test]
    fn test_number_bounds_and_rules() {
        let d = min_soc();
        assert_eq!(encode_number(&d, 20.0).unwrap(), vec![(41009, 20)]);
        assert!(matches!(
            encode_number(&d, 5.0).unwrap_err(),
            EncodeError::OutOfBounds { .. }
        ));

        let mut narrow = min_soc();
        narrow.validate = vec![ValidationRule::Min(50.0)];
        assert!(matches!(
            encode_number(&narrow, 20.0).unwrap_err(),
            EncodeError::Rejected { .. }
        ));
    }

    #[test]
    fn test_number_step() {
        let d = min_soc();
        assert!(matches!(
            encode_number(&d, 20.5).unwrap_err(),
            EncodeError::OffStep { .. }
        ));
        assert_eq!(encode_number(&d, 100.0).unwrap(), vec![(41009, 100)]);

        let mut fine = min_soc();
        fine.step = 0.1;
        fine.scale = 0.1;
        assert_eq!(encode_number(&fine, 20.3).unwrap(), vec![(41009, 203)]);
        assert!(encode_number(&fine, 20.35).is_err());
    }

    #[test]
    fn test_select_label() {
        let d = SelectDescriptor {
            key: "work_mode".to_string(),
            address: 41000,
            options: vec![
                SelectOption {
                    value: 0,
                    label: "Self Use".to_string(),
                },
                SelectOption {
                    value: 2,
                    label: "Back-up".to_string(),
                },
            ],
            presentation: presentation(),
        };
        assert_eq!(encode_select(&d, "Back-up").unwrap(), vec![(41000, 2)]);
        assert!(encode_select(&d, "Off").is_err());

        let entity = EntityDescriptor::Select(d);
        assert!(matches!(
            encode(&entity, &Value::Number(2.0)).unwrap_err(),
            EncodeError::WrongType(_)
        ));
    }

    #[test]
    fn test_transformed_sensor_not_writable() {
        let d = SensorDescriptor {
            key: "battery_charge".to_string(),
            addresses: vec![11008],
            scale: 0.001,
            signed: true,
            post_process: Some(Transform::NegativePartAbs),
            validate: vec![],
            presentation: presentation(),
        };
        assert_eq!(
            encode_sensor(&d, 0.5).unwrap_err(),
            EncodeError::NotWritable("battery_charge".to_string())
        );
    }
}
