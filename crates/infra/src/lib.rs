//! # Brigade Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - The backend HTTP client (reqwest)
//! - Connectivity monitoring (health probes, state fan-out)
//! - Sync job and scheduler (pending-op flush, catalog refresh)
//! - Configuration loading (environment and files)
//!
//! ## Architecture
//! - Implements traits defined in `brigade-core`
//! - Depends on `brigade-domain` and `brigade-core`
//! - Contains all "impure" code (I/O, timers, network)

pub mod config;
pub mod connectivity;
pub mod http;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use connectivity::{ConnectivityMonitor, ConnectivityMonitorConfig, HttpProbeSource};
pub use http::{HttpClient, HttpClientBuilder, HttpClientConfig, HttpError};
pub use scheduling::{SyncScheduler, SyncSchedulerConfig};
pub use sync::{MemoryCacheStore, MemoryPendingQueue, PosSyncJob, SessionTokens, SyncJobConfig};
