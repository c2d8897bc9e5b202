//! In-memory pending operation queue

use async_trait::async_trait;
use brigade_core::PendingQueue;
use brigade_domain::{PendingOp, Result};
use parking_lot::Mutex;
use uuid::Uuid;

/// FIFO queue of local writes awaiting delivery.
///
/// Reads are non-destructive: `pending_batch` leaves ops in place and only
/// `mark_synced` removes them, so a sync that fails after sending can
/// safely send the same batch again under the same idempotency keys.
#[derive(Default)]
pub struct MemoryPendingQueue {
    ops: Mutex<Vec<PendingOp>>,
}

impl MemoryPendingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a local write for the next sync run.
    pub fn enqueue(&self, op: PendingOp) {
        self.ops.lock().push(op);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }
}

#[async_trait]
impl PendingQueue for MemoryPendingQueue {
    async fn pending_batch(&self, limit: usize) -> Result<Vec<PendingOp>> {
        let ops = self.ops.lock();
        Ok(ops.iter().take(limit).cloned().collect())
    }

    async fn mark_synced(&self, ids: &[Uuid]) -> Result<()> {
        let mut ops = self.ops.lock();
        ops.retain(|op| !ids.contains(&op.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_batch_read_is_non_destructive() {
        let queue = MemoryPendingQueue::new();
        queue.enqueue(PendingOp::new("orders", json!({"table": 1})));
        queue.enqueue(PendingOp::new("orders", json!({"table": 2})));

        let batch = queue.pending_batch(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_respects_limit_in_fifo_order() {
        let queue = MemoryPendingQueue::new();
        let first = PendingOp::new("orders", json!({"n": 1}));
        let first_id = first.id;
        queue.enqueue(first);
        queue.enqueue(PendingOp::new("orders", json!({"n": 2})));

        let batch = queue.pending_batch(1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, first_id);
    }

    #[tokio::test]
    async fn test_mark_synced_removes_only_acknowledged_ops() {
        let queue = MemoryPendingQueue::new();
        let keep = PendingOp::new("orders", json!({"n": 1}));
        let remove = PendingOp::new("orders", json!({"n": 2}));
        let remove_id = remove.id;
        queue.enqueue(keep.clone());
        queue.enqueue(remove);

        queue.mark_synced(&[remove_id]).await.unwrap();
        assert_eq!(queue.len(), 1);
        let remaining = queue.pending_batch(10).await.unwrap();
        assert_eq!(remaining[0].id, keep.id);
    }
}
