//! Tracker connectors implementing the `jira_sync_core::SearchApi` trait.

pub mod connectors;

#[cfg(feature = "jira")]
pub use connectors::jira::JiraSearchClient;
