//! Scheduling infrastructure for background sync execution
//!
//! The sync scheduler owns both job keys (connectivity-driven one-shot and
//! the periodic refresh) and serializes every scheduling decision through a
//! single event loop. All schedulers here follow the same runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Structured tracing on every transition

pub mod error;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
