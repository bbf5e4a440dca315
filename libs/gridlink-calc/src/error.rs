//! Error types for gridlink-calc

use gridlink_registers::CatalogError;
use thiserror::Error;

/// Failure to read or write a persisted total
///
/// Never fatal for an update: the in-memory total survives and the write is
/// retried on the next successful update.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(String),

    #[error("Store serialization error: {0}")]
    Serialization(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Integration setup errors
#[derive(Debug, Error)]
pub enum CalcError {
    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Integration already registered: {0}")]
    AlreadyRegistered(String),
}

impl CalcError {
    pub fn already_registered(key: impl Into<String>) -> Self {
        Self::AlreadyRegistered(key.into())
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;

/// Result type for state store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
