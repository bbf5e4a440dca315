//! Value validation
//!
//! Devices intermittently report transient garbage (momentary negative power
//! on disconnect, 0xFFFF on a busy bus). Rules catch that so the value is
//! reported as unavailable instead of leaking into downstream totals.

use crate::descriptor::ValidationRule;
use crate::error::Unavailable;
use crate::value::Value;

/// Check `value` against every rule
///
/// All rules are evaluated; the error lists every rule that failed.
///
/// # Arguments
/// * `key` - Measurement key, used when the value is not numeric
/// * `value` - Decoded value
/// * `rules` - Validation rules from the descriptor
///
/// # Returns
/// * `Ok(())` - No rules, or all rules passed
/// * `Err(Unavailable)` - At least one rule failed
pub fn validate(key: &str, value: &Value, rules: &[ValidationRule]) -> Result<(), Unavailable> {
    if rules.is_empty() {
        return Ok(());
    }

    let number = value
        .as_f64()
        .ok_or_else(|| Unavailable::NotNumeric(key.to_string()))?;

    let failed: Vec<ValidationRule> = rules
        .iter()
        .filter(|rule| !rule.accepts(number))
        .copied()
        .collect();

    if failed.is_empty() {
        Ok(())
    } else {
        Err(Unavailable::Rejected {
            value: number,
            failed,
        })
    }
}

/// Numeric shortcut for [`validate`]
pub fn accepts(value: f64, rules: &[ValidationRule]) -> bool {
    rules.iter().all(|rule| rule.accepts(value))
}
