use crate::Result;
use crate::models::MappedRecord;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Destination for mapped records.
///
/// `upsert` inserts a row keyed by `MappedRecord::key` or, when the key already
/// exists, overwrites every column except the key and `created_date`.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn upsert(&self, record: &MappedRecord) -> Result<()>;

    /// Cheap liveness probe used by `jira-sync check`.
    async fn ping(&self) -> Result<()>;
}

/// In-memory `IssueStore` for unit tests and dry runs.
#[derive(Clone, Default)]
pub struct MemoryIssueStore {
    rows: Arc<Mutex<BTreeMap<String, MappedRecord>>>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<MappedRecord> {
        self.rows.lock().await.get(key).cloned()
    }

    /// Snapshot of all rows ordered by key (primarily for tests).
    pub async fn rows(&self) -> Vec<MappedRecord> {
        self.rows.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    async fn upsert(&self, record: &MappedRecord) -> Result<()> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(&record.key) {
            Some(existing) => {
                let created_date = existing.created_date;
                *existing = record.clone();
                existing.created_date = created_date;
            }
            None => {
                rows.insert(record.key.clone(), record.clone());
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
