//! Configuration loading
//!
//! Utilities for loading the application configuration from `BRIGADE_*`
//! environment variables or from a config file.

pub mod loader;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, probe_config_paths};
