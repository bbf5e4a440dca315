//! Post-processing transforms
//!
//! A closed set of named transforms applied to the already-scaled value.
//! Adding one means adding a variant here; catalogs cannot inject code.

use crate::error::Unavailable;
use crate::value::Value;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Post-processing applied after scaling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Scaled value as-is
    Identity,
    /// `v` if `v > 0`, else 0 (e.g. discharge power, feed-in)
    PositivePart,
    /// `|v|` if `v < 0`, else 0 (e.g. charge power, grid consumption)
    NegativePartAbs,
    /// Non-zero word is true
    BoolFromWord,
    /// High byte is the hour, low byte the minute
    PackedTime,
}

impl Transform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::PositivePart => "positive_part",
            Self::NegativePartAbs => "negative_part_abs",
            Self::BoolFromWord => "bool_from_word",
            Self::PackedTime => "packed_time",
        }
    }

    /// Whether the output is a number
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Identity | Self::PositivePart | Self::NegativePartAbs
        )
    }

    /// Whether the output can be below zero for a register of this signedness
    pub fn may_yield_negative(&self, signed: bool) -> bool {
        match self {
            Self::Identity => signed,
            Self::PositivePart | Self::NegativePartAbs => false,
            Self::BoolFromWord | Self::PackedTime => false,
        }
    }

    /// Apply to an already-scaled value
    pub fn apply(&self, scaled: f64) -> Result<Value, Unavailable> {
        match self {
            Self::Identity => Ok(Value::Number(scaled)),
            Self::PositivePart => Ok(Value::Number(if scaled > 0.0 { scaled } else { 0.0 })),
            Self::NegativePartAbs => Ok(Value::Number(if scaled < 0.0 {
                scaled.abs()
            } else {
                0.0
            })),
            Self::BoolFromWord => Ok(Value::Bool(scaled != 0.0)),
            Self::PackedTime => unpack_time(scaled).map(Value::Time),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Self::Identity),
            "positive_part" => Ok(Self::PositivePart),
            "negative_part_abs" => Ok(Self::NegativePartAbs),
            "bool_from_word" => Ok(Self::BoolFromWord),
            "packed_time" => Ok(Self::PackedTime),
            _ => Err(format!("Unknown transform: '{}'", s)),
        }
    }
}

/// `0x0A1E` -> 10:30
fn unpack_time(value: f64) -> Result<NaiveTime, Unavailable> {
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u16::MAX) {
        return Err(Unavailable::InvalidTime(value));
    }
    let word = value as u32;
    NaiveTime::from_hms_opt(word / 256, word % 256, 0).ok_or(Unavailable::InvalidTime(value))
}
