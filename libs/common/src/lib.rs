//! GridLink basic library
//!
//! Provides functions shared by the GridLink tools:
//! - logging bootstrap (console + optional daily file)
//! - layered configuration loading

pub mod config_loader;
pub mod error;
pub mod logging;

pub use config_loader::load_layered;
pub use error::{Error, Result};
pub use logging::{init_with_config, LogConfig};
