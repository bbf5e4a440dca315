//! gridctl library
//!
//! Configuration, sample loading, the JSON state file and the command
//! implementations behind the `gridctl` binary.

pub mod commands;
pub mod config;
pub mod samples;
pub mod state_file;

pub use commands::{ModelSummary, ReplaySummary};
pub use config::GridctlConfig;
pub use samples::Snapshot;
pub use state_file::JsonFileTotalStore;
