//! Jira issue sync: pull recently changed issues and upsert them into PostgreSQL.

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod mapper;
pub mod models;
pub mod o11y;
pub mod postgres;
pub mod query;
pub mod store;

#[cfg(test)]
mod test_support;

pub use config::{StoreConfig, SyncConfig, TrackerConfig};
pub use engine::{FailedRecord, RecordOutcome, SyncEngine, SyncSummary};
pub use error::{Error, Result};
pub use extract::{extract_description, extract_fields};
pub use fetch::{SearchApi, fetch_all};
pub use mapper::{CustomSlot, NULL_TEXT, map_record};
pub use models::{CustomValue, DescriptionFields, MappedRecord, RawRecord, SearchPage};
pub use postgres::PgIssueStore;
pub use query::ChangeWindow;
pub use store::{IssueStore, MemoryIssueStore};
