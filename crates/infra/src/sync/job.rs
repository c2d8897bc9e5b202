//! The sync job: flush pending writes, then refresh the catalog
//!
//! One execution pushes queued local writes to the backend and pulls a
//! fresh catalog snapshot. Both halves are idempotent: unacknowledged ops
//! stay queued and are re-sent under the same idempotency keys, and the
//! catalog is replaced wholesale. Re-invoking after a transient failure
//! never duplicates server-side work.

use std::sync::Arc;

use async_trait::async_trait;
use brigade_core::{classify_failure, CacheStore, PendingQueue, SyncJob};
use brigade_domain::constants::{CATALOG_PATH, FLUSH_BATCH_SIZE, FLUSH_PATH, RETRY_CEILING};
use brigade_domain::{BrigadeError, CatalogSnapshot, ErrorClass, PendingOp, SyncOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::http::{HttpClient, HttpError};

#[derive(Debug, Error)]
enum JobError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Local(#[from] BrigadeError),
}

impl JobError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Http(err) => err.class(),
            // Local storage failures will not heal by re-running.
            Self::Local(_) => ErrorClass::Permanent,
        }
    }
}

/// Configuration for sync executions
#[derive(Debug, Clone)]
pub struct SyncJobConfig {
    /// Most ops flushed per execution.
    pub flush_batch_size: usize,
    /// Transient failures tolerated per job lifetime.
    pub retry_ceiling: u32,
    pub flush_path: String,
    pub catalog_path: String,
}

impl Default for SyncJobConfig {
    fn default() -> Self {
        Self {
            flush_batch_size: FLUSH_BATCH_SIZE,
            retry_ceiling: RETRY_CEILING,
            flush_path: FLUSH_PATH.to_string(),
            catalog_path: CATALOG_PATH.to_string(),
        }
    }
}

/// Wire format for one flushed operation.
#[derive(Debug, Serialize)]
struct FlushItem {
    id: Uuid,
    idempotency_key: Uuid,
    resource: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl From<&PendingOp> for FlushItem {
    fn from(op: &PendingOp) -> Self {
        Self {
            id: op.id,
            idempotency_key: op.idempotency_key,
            resource: op.resource.clone(),
            payload: op.payload.clone(),
            created_at: op.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct FlushRequest {
    operations: Vec<FlushItem>,
}

/// Backend acknowledgement; lenient like every other decode.
#[derive(Debug, Default, Deserialize)]
struct FlushReceipt {
    #[serde(default)]
    accepted: Vec<Uuid>,
}

/// The POS sync job.
pub struct PosSyncJob {
    client: Arc<HttpClient>,
    queue: Arc<dyn PendingQueue>,
    cache: Arc<dyn CacheStore>,
    config: SyncJobConfig,
}

impl PosSyncJob {
    #[must_use]
    pub fn new(
        client: Arc<HttpClient>,
        queue: Arc<dyn PendingQueue>,
        cache: Arc<dyn CacheStore>,
        config: SyncJobConfig,
    ) -> Self {
        Self {
            client,
            queue,
            cache,
            config,
        }
    }

    async fn run(&self) -> Result<(), JobError> {
        self.flush_pending().await?;
        self.refresh_catalog().await?;
        Ok(())
    }

    async fn flush_pending(&self) -> Result<(), JobError> {
        let ops = self.queue.pending_batch(self.config.flush_batch_size).await?;
        if ops.is_empty() {
            debug!("No pending operations to flush");
            return Ok(());
        }

        let request = FlushRequest {
            operations: ops.iter().map(FlushItem::from).collect(),
        };
        let receipt: FlushReceipt = self.client.post(&self.config.flush_path, &request).await?;

        if !receipt.accepted.is_empty() {
            self.queue.mark_synced(&receipt.accepted).await?;
        }

        let unacknowledged = ops
            .iter()
            .filter(|op| !receipt.accepted.contains(&op.id))
            .count();
        if unacknowledged > 0 {
            // Left queued; the next run re-sends them under the same
            // idempotency keys.
            warn!(unacknowledged, "Backend did not acknowledge every operation");
        }
        info!(
            flushed = receipt.accepted.len(),
            pending = ops.len(),
            "Pending operations flushed"
        );
        Ok(())
    }

    async fn refresh_catalog(&self) -> Result<(), JobError> {
        let snapshot: CatalogSnapshot = self.client.get(&self.config.catalog_path).await?;
        let version = snapshot.version;
        self.cache.apply_snapshot(snapshot).await?;
        debug!(version, "Catalog refreshed");
        Ok(())
    }
}

#[async_trait]
impl SyncJob for PosSyncJob {
    #[instrument(skip(self))]
    async fn execute(&self, attempt: u32) -> SyncOutcome {
        debug!("Starting sync execution");
        match self.run().await {
            Ok(()) => {
                info!("Sync execution completed");
                SyncOutcome::Success
            }
            Err(err) => {
                let outcome =
                    classify_failure(err.class(), attempt, self.config.retry_ceiling, err.to_string());
                match &outcome {
                    SyncOutcome::Retry { .. } => {
                        warn!(error = %err, "Sync execution failed; transient")
                    }
                    SyncOutcome::Failure { reason } => {
                        warn!(reason = %reason, "Sync execution failed; permanent")
                    }
                    SyncOutcome::Success => {}
                }
                outcome
            }
        }
    }
}
