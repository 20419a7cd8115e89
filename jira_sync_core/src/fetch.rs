//! Paginated retrieval of search results.

use crate::Result;
use crate::models::{RawRecord, SearchPage};
use async_trait::async_trait;

/// Page size used by the sync (the tracker's maximum for the search endpoint).
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// Largest page the tracker serves; larger requests are silently truncated to this.
pub const MAX_PAGE_SIZE: u64 = DEFAULT_PAGE_SIZE;

/// One call to the tracker search endpoint.
///
/// Implementations return `Error::Transport` for non-success responses.
#[async_trait]
pub trait SearchApi: Send + Sync {
    fn id(&self) -> &'static str;

    async fn search(&self, jql: &str, start_at: u64, max_results: u64) -> Result<SearchPage>;
}

/// Fetch every record matching `jql`, in server order.
///
/// Stops once `start_at + page_size` reaches the server-reported total, or when a
/// page comes back short. `page_size` is clamped to `1..=MAX_PAGE_SIZE` so a truncated
/// page is never mistaken for the last one. Any failed request aborts the whole fetch.
#[tracing::instrument(level = "info", skip(api), fields(connector = api.id()))]
pub async fn fetch_all(api: &dyn SearchApi, jql: &str, page_size: u64) -> Result<Vec<RawRecord>> {
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let mut start_at = 0u64;
    let mut records = Vec::new();

    loop {
        let page = api.search(jql, start_at, page_size).await?;
        let received = page.issues.len() as u64;
        records.extend(page.issues);

        tracing::info!(
            fetched = records.len(),
            total = page.total,
            start_at,
            "fetched page"
        );

        if start_at + page_size >= page.total || received < page_size {
            break;
        }
        start_at += page_size;
    }

    Ok(records)
}
