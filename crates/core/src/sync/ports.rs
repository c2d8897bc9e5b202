//! Port interfaces for sync operations

use async_trait::async_trait;
use brigade_domain::{CatalogSnapshot, ConnectivityState, PendingOp, Result, SyncOutcome};
use uuid::Uuid;

/// Trait for raw reachability observations
///
/// Implementations answer "can the backend be reached right now". The
/// connectivity monitor owns polling and de-duplication; a source only
/// reports what it sees.
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
    /// Observe current reachability
    async fn check(&self) -> ConnectivityState;
}

/// Trait for bearer credential access
///
/// The token is read fresh on every outgoing request so a session refresh
/// takes effect without rebuilding the HTTP client.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token, or `None` when unauthenticated
    async fn bearer_token(&self) -> Option<String>;
}

/// Trait for the queue of local writes awaiting delivery
#[async_trait]
pub trait PendingQueue: Send + Sync {
    /// Read up to `limit` queued ops, oldest first, without removing them
    async fn pending_batch(&self, limit: usize) -> Result<Vec<PendingOp>>;

    /// Acknowledge delivery; acknowledged ops leave the queue
    async fn mark_synced(&self, ids: &[Uuid]) -> Result<()>;
}

/// Trait for the local cache of backend reference data
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Replace cached data with the contents of a snapshot
    async fn apply_snapshot(&self, snapshot: CatalogSnapshot) -> Result<()>;

    /// Version of the last applied snapshot, if any
    async fn snapshot_version(&self) -> Option<i64>;
}

/// Trait for a unit of sync work dispatched by the scheduler
#[async_trait]
pub trait SyncJob: Send + Sync {
    /// Run one execution
    ///
    /// `attempt` is 1-based within the current job lifetime. Implementations
    /// never panic on failure; every error is classified into the returned
    /// outcome. Executions must be safe to re-invoke after a `Retry`.
    async fn execute(&self, attempt: u32) -> SyncOutcome;
}
