//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! sync subsystem.

// Sync contract constants
pub const RETRY_CEILING: u32 = 3;
pub const PERIODIC_SYNC_INTERVAL_SECS: u64 = 900; // 15 minutes
pub const CONNECT_TIMEOUT_SECS: u64 = 15;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

// Scheduler tuning
pub const RETRY_BACKOFF_BASE_MS: u64 = 10_000;
pub const FLUSH_BATCH_SIZE: usize = 50;

// Connectivity probing
pub const PROBE_INTERVAL_SECS: u64 = 15;
pub const PROBE_TIMEOUT_SECS: u64 = 5;

// Backend endpoints, relative to the configured base URL
pub const FLUSH_PATH: &str = "/sync/operations";
pub const CATALOG_PATH: &str = "/sync/catalog";
pub const HEALTH_PATH: &str = "/health";
