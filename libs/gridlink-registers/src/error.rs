//! Error types for gridlink-registers

use crate::descriptor::ValidationRule;
use thiserror::Error;

/// Result type for catalog loading
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Fatal configuration errors, detected while a catalog is loaded
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// Descriptor violates a structural invariant
    #[error("Invalid descriptor '{key}': {reason}")]
    InvalidDescriptor { key: String, reason: String },

    /// Same key appears twice within one model
    #[error("Duplicate key '{key}' in model '{model}'")]
    DuplicateKey { model: String, key: String },

    /// Model references a family that is not defined
    #[error("Model '{model}' references unknown family '{family}'")]
    UnknownFamily { model: String, family: String },

    /// Requested model does not exist
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Catalog document could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl CatalogError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(err: serde_yaml::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err.to_string())
    }
}

/// Why a measurement has no value for the current poll cycle
///
/// These are expected runtime states, never fatal. The host reports the
/// measurement as unavailable instead of showing a stale or clamped number.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Unavailable {
    /// Transport did not supply this register in the current cycle
    #[error("Register {0} not present in this poll")]
    MissingWord(u16),

    /// Layout spans neither one nor two registers
    #[error("Layout has {0} addresses, expected 1 or 2")]
    InvalidLayout(usize),

    /// Decoded value failed one or more validation rules
    #[error("Value {value} rejected ({} rule(s) failed)", .failed.len())]
    Rejected {
        value: f64,
        failed: Vec<ValidationRule>,
    },

    /// Packed hour/minute word does not form a time of day
    #[error("Word {0} is not a valid packed time of day")]
    InvalidTime(f64),

    /// Select word has no label in the options table
    #[error("Raw value {0} has no option label")]
    UnknownOption(i64),

    /// A number was required but the measurement decodes to something else
    #[error("Measurement '{0}' is not numeric")]
    NotNumeric(String),

    /// No integrator is bound to this key
    #[error("Unknown measurement: {0}")]
    UnknownMeasurement(String),
}

/// Errors raised when turning a physical value back into register words
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    /// Descriptor cannot be written (derived value or non-invertible transform)
    #[error("Measurement '{0}' cannot be encoded")]
    NotWritable(String),

    /// Scaled value does not fit in the register width
    #[error("Value {value} for '{key}' does not fit in a {bits}-bit register (signed: {signed})")]
    OutOfDomain {
        key: String,
        value: f64,
        bits: u32,
        signed: bool,
    },

    /// Value outside the setting's configured min/max
    #[error("Value {value} for '{key}' outside [{min}, {max}]")]
    OutOfBounds {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is not `min` plus a whole number of steps
    #[error("Value {value} for '{key}' is not on a step of {step} from {min}")]
    OffStep {
        key: String,
        value: f64,
        min: f64,
        step: f64,
    },

    /// Value failed the descriptor's validation rules
    #[error("Value {value} for '{key}' rejected by validation")]
    Rejected { key: String, value: f64 },

    /// Label not present in a select's options
    #[error("Unknown option '{label}' for '{key}'")]
    UnknownLabel { key: String, label: String },

    /// Value type does not match the descriptor
    #[error("Value for '{0}' has the wrong type")]
    WrongType(String),
}
