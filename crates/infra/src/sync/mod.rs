//! Sync infrastructure for Brigade
//!
//! This module provides the pieces the scheduler composes into sync runs:
//! - `PosSyncJob`: one sync execution (flush pending writes, refresh catalog)
//! - `MemoryPendingQueue`: in-memory queue of unsent local writes
//! - `MemoryCacheStore`: in-memory catalog cache
//! - `SessionTokens`: bearer credentials shared with the session layer

pub mod cache;
pub mod job;
pub mod queue;
pub mod session;

pub use cache::MemoryCacheStore;
pub use job::{PosSyncJob, SyncJobConfig};
pub use queue::MemoryPendingQueue;
pub use session::SessionTokens;
