//! In-memory catalog cache

use std::collections::HashMap;

use async_trait::async_trait;
use brigade_core::CacheStore;
use brigade_domain::{CatalogRecord, CatalogSnapshot, Result};
use parking_lot::RwLock;
use tracing::debug;

#[derive(Default)]
struct CacheInner {
    version: Option<i64>,
    records: HashMap<String, Vec<CatalogRecord>>,
}

/// Catalog data kept in memory, replaced wholesale on each refresh.
///
/// Records are grouped by resource so the POS read path can fetch, say,
/// the menu without touching other resources.
#[derive(Default)]
pub struct MemoryCacheStore {
    inner: RwLock<CacheInner>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached records for one resource, if any.
    #[must_use]
    pub fn records_for(&self, resource: &str) -> Vec<CatalogRecord> {
        self.inner
            .read()
            .records
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn apply_snapshot(&self, snapshot: CatalogSnapshot) -> Result<()> {
        let mut grouped: HashMap<String, Vec<CatalogRecord>> = HashMap::new();
        for record in snapshot.records {
            grouped.entry(record.resource.clone()).or_default().push(record);
        }

        let mut inner = self.inner.write();
        inner.version = Some(snapshot.version);
        inner.records = grouped;
        debug!(version = snapshot.version, "Catalog snapshot applied");
        Ok(())
    }

    async fn snapshot_version(&self) -> Option<i64> {
        self.inner.read().version
    }
}
