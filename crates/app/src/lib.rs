//! # Brigade App
//!
//! Application layer - composition root and entry point.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - Main entry point and setup
//!
//! ## Architecture
//! - Depends on `brigade-domain` and `brigade-infra`
//! - Wires the connectivity monitor, HTTP client, sync job and scheduler
//!   into one owned object with a single shutdown path

pub mod context;

// Re-export for convenience
pub use context::AppContext;
