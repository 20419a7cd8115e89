use crate::Result;
use crate::config::SyncConfig;
use crate::extract::extract_description;
use crate::fetch::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, SearchApi, fetch_all};
use crate::mapper::map_record;
use crate::models::RawRecord;
use crate::query::ChangeWindow;
use crate::store::IssueStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// What happened to one fetched record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Written,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    pub key: String,
    pub reason: String,
}

/// Result of one sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub run_id: Uuid,
    pub jql: String,
    pub fetched: usize,
    pub written: usize,
    pub failed: Vec<FailedRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncSummary {
    pub fn failed_keys(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.key.as_str()).collect()
    }
}

/// Drives query -> fetch -> extract -> map -> upsert, one record at a time.
pub struct SyncEngine {
    search: Arc<dyn SearchApi>,
    store: Arc<dyn IssueStore>,
    project_key: String,
    lookback_days: u32,
    page_size: u64,
}

impl SyncEngine {
    #[tracing::instrument(level = "debug", skip(search, store))]
    pub fn new(
        search: Arc<dyn SearchApi>,
        store: Arc<dyn IssueStore>,
        project_key: &str,
        lookback_days: u32,
    ) -> Self {
        Self {
            search,
            store,
            project_key: project_key.to_string(),
            lookback_days,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn from_config(
        cfg: &SyncConfig,
        search: Arc<dyn SearchApi>,
        store: Arc<dyn IssueStore>,
    ) -> Self {
        Self::new(
            search,
            store,
            &cfg.tracker.project_key,
            cfg.tracker.lookback_days,
        )
        .with_page_size(cfg.tracker.page_size)
    }

    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn window(&self, today: NaiveDate) -> ChangeWindow {
        ChangeWindow::trailing(&self.project_key, today, self.lookback_days)
    }

    /// One pass against the current UTC date.
    pub async fn run(&self) -> Result<SyncSummary> {
        self.run_once(Utc::now().date_naive()).await
    }

    /// One full pass for the window ending at `today`.
    ///
    /// A fetch failure aborts the pass before anything is written. Write failures are
    /// recorded per record and never stop the pass.
    #[tracing::instrument(level = "info", skip(self), fields(project = %self.project_key))]
    pub async fn run_once(&self, today: NaiveDate) -> Result<SyncSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let jql = self.window(today).to_jql();

        let records = fetch_all(self.search.as_ref(), &jql, self.page_size).await?;
        tracing::info!(%run_id, total = records.len(), "fetched issues");

        let mut written = 0usize;
        let mut failed = Vec::new();
        for record in &records {
            match self.sync_record(record).await {
                RecordOutcome::Written => written += 1,
                RecordOutcome::Failed { reason } => failed.push(FailedRecord {
                    key: record.key.clone(),
                    reason,
                }),
            }
        }

        let summary = SyncSummary {
            run_id,
            jql,
            fetched: records.len(),
            written,
            failed,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            %run_id,
            fetched = summary.fetched,
            written = summary.written,
            failed = summary.failed.len(),
            "sync pass finished"
        );
        Ok(summary)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(key = %record.key))]
    async fn sync_record(&self, record: &RawRecord) -> RecordOutcome {
        let description = extract_description(record.fields.description.as_ref());
        let mapped = map_record(record, description.as_ref());
        match self.store.upsert(&mapped).await {
            Ok(()) => {
                tracing::debug!(key = %record.key, "issue written");
                RecordOutcome::Written
            }
            Err(e) => {
                let reason = e.chain_message();
                tracing::error!(key = %record.key, error = %reason, "failed to write issue");
                RecordOutcome::Failed { reason }
            }
        }
    }

    /// Zero-size search for the current window; returns the server-reported total.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn check_tracker(&self, today: NaiveDate) -> Result<u64> {
        let jql = self.window(today).to_jql();
        let page = self.search.search(&jql, 0, 0).await?;
        Ok(page.total)
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn check_store(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::store::MemoryIssueStore;
    use crate::test_support::{FlakyStore, ScriptedSearch, raw_issue};
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    fn monitor_issue(key: &str, status: &str) -> RawRecord {
        raw_issue(
            key,
            json!({
                "summary": format!("{key} is down"),
                "status": {"name": status},
                "created": "2024-03-03T14:15:00.000+0000",
                "updated": "2024-03-03T15:00:00.000+0000",
                "components": [{"name": "Core"}, {"name": "API"}],
                "customfield_10900": {"value": "SRE"},
                "description": "Display Name: checkout-api\nDown since: March 3, 2024, 2:15 PM UTC\nReason: timeout"
            }),
        )
    }

    #[tokio::test]
    async fn writes_every_fetched_record() {
        let search = Arc::new(ScriptedSearch::with_records(vec![
            monitor_issue("CSI-1", "Open"),
            monitor_issue("CSI-2", "Open"),
        ]));
        let store = MemoryIssueStore::new();
        let engine = SyncEngine::new(search, Arc::new(store.clone()), "CSI", 1);

        let summary = engine.run_once(today()).await.unwrap();
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.written, 2);
        assert!(summary.failed.is_empty());
        assert_eq!(
            summary.jql,
            "project = 'CSI' AND (created >= '2024-03-03' OR updated >= '2024-03-03')"
        );

        let row = store.get("CSI-1").await.unwrap();
        assert_eq!(row.display_name.as_deref(), Some("checkout-api"));
        assert_eq!(row.reason.as_deref(), Some("timeout"));
        assert_eq!(row.team, "SRE");
        assert_eq!(row.components, "Core, API");
        assert_eq!(
            row.down_since.map(|d| d.to_string()),
            Some("2024-03-03 14:15:00".to_string())
        );
    }

    #[tokio::test]
    async fn failed_write_does_not_block_later_records() {
        let search = Arc::new(ScriptedSearch::with_records(vec![
            monitor_issue("CSI-1", "Open"),
            monitor_issue("CSI-2", "Open"),
            monitor_issue("CSI-3", "Open"),
        ]));
        let store = FlakyStore::failing_on(&["CSI-2"]);
        let engine = SyncEngine::new(search, Arc::new(store.clone()), "CSI", 1);

        let summary = engine.run_once(today()).await.unwrap();
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failed_keys(), vec!["CSI-2"]);
        assert!(summary.failed[0].reason.contains("connection refused"));
        assert!(store.inner.get("CSI-3").await.is_some());
        assert!(store.inner.get("CSI-2").await.is_none());
    }

    #[tokio::test]
    async fn second_pass_overwrites_instead_of_duplicating() {
        let store = MemoryIssueStore::new();

        let first = SyncEngine::new(
            Arc::new(ScriptedSearch::with_records(vec![monitor_issue("CSI-1", "Open")])),
            Arc::new(store.clone()),
            "CSI",
            1,
        );
        first.run_once(today()).await.unwrap();

        let second = SyncEngine::new(
            Arc::new(ScriptedSearch::with_records(vec![monitor_issue(
                "CSI-1", "Resolved",
            )])),
            Arc::new(store.clone()),
            "CSI",
            1,
        );
        second.run_once(today()).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("CSI-1").await.unwrap().status, "Resolved");
    }

    #[tokio::test]
    async fn fetch_failure_writes_nothing() {
        let search = Arc::new(ScriptedSearch::with_total(250).failing_at(100));
        let store = MemoryIssueStore::new();
        let engine = SyncEngine::new(search, Arc::new(store.clone()), "CSI", 1);

        let err = engine.run_once(today()).await.unwrap_err();
        assert!(matches!(err, Error::Transport { status: 500, .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn record_without_description_still_written() {
        let search = Arc::new(ScriptedSearch::with_records(vec![raw_issue(
            "CSI-9",
            json!({"summary": "bare", "status": {"name": "Open"}}),
        )]));
        let store = MemoryIssueStore::new();
        let engine = SyncEngine::new(search, Arc::new(store.clone()), "CSI", 1);

        let summary = engine.run_once(today()).await.unwrap();
        assert_eq!(summary.written, 1);
        let row = store.get("CSI-9").await.unwrap();
        assert_eq!(row.display_name, None);
        assert_eq!(row.team, "");
    }

    #[tokio::test]
    async fn check_issues_zero_size_search() {
        let search = Arc::new(ScriptedSearch::with_total(5));
        let engine = SyncEngine::new(search.clone(), Arc::new(MemoryIssueStore::new()), "CSI", 1);
        assert_eq!(engine.check_tracker(today()).await.unwrap(), 5);
        assert_eq!(search.calls().await, vec![0]);
        engine.check_store().await.unwrap();
    }
}
