#![cfg(test)]

use crate::fetch::SearchApi;
use crate::models::{MappedRecord, RawRecord, SearchPage};
use crate::store::{IssueStore, MemoryIssueStore};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) fn raw_issue(key: &str, fields: serde_json::Value) -> RawRecord {
    serde_json::from_value(serde_json::json!({"key": key, "fields": fields}))
        .expect("valid raw issue")
}

pub(crate) fn sample_mapped(key: &str) -> MappedRecord {
    MappedRecord {
        key: key.to_string(),
        summary: "Monitor down".into(),
        status: "Open".into(),
        created_date: Some(Utc.with_ymd_and_hms(2024, 1, 5, 10, 0, 0).unwrap()),
        updated_date: Some(Utc.with_ymd_and_hms(2024, 1, 5, 11, 0, 0).unwrap()),
        reporter: Some("Alerts Bot".into()),
        priority: Some("High".into()),
        display_name: Some("checkout-api".into()),
        monitor_groups: None,
        monitor_type: Some("URL".into()),
        monitor_status: Some("Down".into()),
        down_since: None,
        failed_locations: None,
        reason: Some("timeout".into()),
        permfix: String::new(),
        team: "SRE".into(),
        rca: String::new(),
        components: "Core, API".into(),
        product: String::new(),
        team_resp: String::new(),
    }
}

/// Search backend serving `CSI-0..CSI-{n}` in pages, recording each `start_at`.
pub(crate) struct ScriptedSearch {
    records: Vec<RawRecord>,
    reported_total: u64,
    fail_at: Option<u64>,
    max_page: Option<u64>,
    calls: Mutex<Vec<u64>>,
}

impl ScriptedSearch {
    pub(crate) fn with_total(n: u64) -> Self {
        Self::with_records(
            (0..n)
                .map(|i| raw_issue(&format!("CSI-{i}"), serde_json::json!({})))
                .collect(),
        )
    }

    pub(crate) fn with_records(records: Vec<RawRecord>) -> Self {
        Self {
            reported_total: records.len() as u64,
            records,
            fail_at: None,
            max_page: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn reporting_total(mut self, total: u64) -> Self {
        self.reported_total = total;
        self
    }

    pub(crate) fn failing_at(mut self, start_at: u64) -> Self {
        self.fail_at = Some(start_at);
        self
    }

    /// Truncate every page to `max`, the way the tracker enforces its own page limit.
    pub(crate) fn capped_at(mut self, max: u64) -> Self {
        self.max_page = Some(max);
        self
    }

    pub(crate) async fn calls(&self) -> Vec<u64> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl SearchApi for ScriptedSearch {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn search(&self, _jql: &str, start_at: u64, max_results: u64) -> Result<SearchPage> {
        self.calls.lock().await.push(start_at);
        if self.fail_at == Some(start_at) {
            return Err(Error::Transport {
                status: 500,
                body: "boom".to_string(),
            });
        }
        let max_results = self.max_page.map_or(max_results, |m| max_results.min(m));
        let issues = self
            .records
            .iter()
            .skip(start_at as usize)
            .take(max_results as usize)
            .cloned()
            .collect();
        Ok(SearchPage {
            issues,
            total: self.reported_total,
        })
    }
}

/// `IssueStore` that rejects a fixed set of keys and delegates the rest.
#[derive(Clone, Default)]
pub(crate) struct FlakyStore {
    pub(crate) inner: MemoryIssueStore,
    failing: Arc<HashSet<String>>,
}

impl FlakyStore {
    pub(crate) fn failing_on(keys: &[&str]) -> Self {
        Self {
            inner: MemoryIssueStore::new(),
            failing: Arc::new(keys.iter().map(|k| k.to_string()).collect()),
        }
    }
}

#[async_trait]
impl IssueStore for FlakyStore {
    async fn upsert(&self, record: &MappedRecord) -> Result<()> {
        if self.failing.contains(&record.key) {
            return Err(Error::backend(
                "connect postgres",
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            ));
        }
        self.inner.upsert(record).await
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
