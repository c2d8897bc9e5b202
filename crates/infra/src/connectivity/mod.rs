//! Connectivity monitoring
//!
//! The monitor polls a [`ConnectivitySource`](brigade_core::ConnectivitySource)
//! and publishes de-duplicated state transitions over a watch channel.
//! Consumers subscribe once and see `Available`/`Unavailable` edges only;
//! repeated observations of the same state are suppressed at the source.

pub mod monitor;
pub mod probe;

// Re-export commonly used items
pub use monitor::{ConnectivityMonitor, ConnectivityMonitorConfig, MonitorError};
pub use probe::{HttpProbeSource, ManualSource};
