//! Search connectors, one module per tracker.

#[cfg(feature = "jira")]
pub mod jira;
