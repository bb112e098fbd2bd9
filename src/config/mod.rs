//! Dataset Builder Configuration
//!
//! File-backed defaults for input locations, CSV layout, boundary policies
//! and the output destination.
//!
//! ## Loading Order
//!
//! 1. `AREPA_DATASET_CONFIG` environment variable (path to TOML file)
//! 2. `arepa_dataset.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The configuration is an explicit value handed to the binary's run; there
//! is no process-wide instance.

mod dataset_config;
pub mod defaults;
pub mod validation;

pub use dataset_config::*;
