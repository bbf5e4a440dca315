//! Decode / encode properties over the raw word domain

#![allow(clippy::disallowed_methods)] // Integration test - unwrap is acceptable

use gridlink_registers::encoder::encode_layout;
use gridlink_registers::{
    decode, Presentation, RegisterWords, SensorDescriptor, ValidationRule, Value,
};

const SCALES: [f64; 5] = [1.0, 0.1, 0.01, 0.001, 10.0];

fn sensor(addresses: Vec<u16>, scale: f64, signed: bool) -> SensorDescriptor {
    SensorDescriptor {
        key: "prop".to_string(),
        addresses,
        scale,
        signed,
        post_process: None,
        validate: vec![],
        presentation: Presentation {
            name: "Property".to_string(),
            unit: None,
            device_class: None,
            state_class: None,
            icon: None,
        },
    }
}

/// Every 16-bit word, stepped, plus the edges
fn single_words() -> Vec<u16> {
    let mut words: Vec<u16> = (0..=u16::MAX).step_by(97).collect();
    words.extend([0, 1, 0x7FFF, 0x8000, 0xFFFE, 0xFFFF]);
    words
}

fn double_words() -> Vec<(u16, u16)> {
    let edges = [0u16, 1, 0x7FFF, 0x8000, 0xFFFE, 0xFFFF, 0x1234];
    let mut pairs = Vec::new();
    for high in edges {
        for low in edges {
            pairs.push((high, low));
        }
    }
    pairs
}

#[test]
fn test_single_word_reencodes_to_same_word() {
    for signed in [true, false] {
        for scale in SCALES {
            let d = sensor(vec![100], scale, signed);
            for word in single_words() {
                let words: RegisterWords = [(100, word)].into_iter().collect();
                let value = decode(&d, &words).unwrap().as_f64().unwrap();
                let encoded = encode_layout(&d.key, &d.layout(), value).unwrap();
                assert_eq!(
                    encoded,
                    vec![(100, word)],
                    "word {:#06x} scale {} signed {}",
                    word,
                    scale,
                    signed
                );
            }
        }
    }
}

#[test]
fn test_double_word_reencodes_to_same_words() {
    for signed in [true, false] {
        for scale in SCALES {
            let d = sensor(vec![11070, 11069], scale, signed);
            for (high, low) in double_words() {
                let words: RegisterWords = [(11070, high), (11069, low)].into_iter().collect();
                let value = decode(&d, &words).unwrap().as_f64().unwrap();
                let encoded = encode_layout(&d.key, &d.layout(), value).unwrap();
                assert_eq!(encoded, vec![(11070, high), (11069, low)]);
            }
        }
    }
}

#[test]
fn test_reference_values() {
    let unsigned = sensor(vec![11070, 11069], 0.1, false);
    let words: RegisterWords = [(11070, 1), (11069, 0)].into_iter().collect();
    let value = decode(&unsigned, &words).unwrap().as_f64().unwrap();
    assert!((value - 6553.6).abs() < 1e-9);

    let signed = sensor(vec![11070, 11069], 1.0, true);
    let words: RegisterWords = [(11070, 0xFFFF), (11069, 0xFFFF)].into_iter().collect();
    assert_eq!(decode(&signed, &words).unwrap(), Value::Number(-1.0));
}

#[test]
fn test_signedness_changes_only_high_half() {
    let signed = sensor(vec![1], 1.0, true);
    let unsigned = sensor(vec![1], 1.0, false);
    for word in single_words() {
        let words: RegisterWords = [(1, word)].into_iter().collect();
        let s = decode(&signed, &words).unwrap().as_f64().unwrap();
        let u = decode(&unsigned, &words).unwrap().as_f64().unwrap();
        if word < 0x8000 {
            assert_eq!(s, u);
        } else {
            assert_eq!(u - s, 65536.0);
        }
    }
}

#[test]
fn test_range_rule_boundaries() {
    let rule = ValidationRule::Range(0.0, 100.0);
    assert!(!rule.accepts(-1.0));
    assert!(!rule.accepts(101.0));
    assert!(rule.accepts(0.0));
    assert!(rule.accepts(100.0));
}
