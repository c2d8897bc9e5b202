//! # Brigade Domain
//!
//! Business domain types and models for the Brigade POS sync subsystem.
//!
//! This crate contains:
//! - Sync vocabulary (ConnectivityState, JobKey, SyncOutcome, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Brigade crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
