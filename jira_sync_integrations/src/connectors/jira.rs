//! Jira search connector.
//!
//! Calls the v2 issue search endpoint with basic auth (account name plus API token)
//! and returns pages as `SearchPage`. Payload fields stay as the tracker sends them;
//! interpretation happens in `jira_sync_core::mapper`.

use async_trait::async_trait;
use jira_sync_core::config::TrackerConfig;
use jira_sync_core::models::SearchPage;
use jira_sync_core::{Error, Result, SearchApi};
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::instrument;

pub const SEARCH_PATH: &str = "/rest/api/2/search";

#[derive(Clone)]
pub struct JiraSearchClient {
    client: Client,
    api_base: String,
    username: String,
    token: String,
}

impl std::fmt::Debug for JiraSearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraSearchClient")
            .field("api_base", &self.api_base)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl JiraSearchClient {
    pub fn new(
        api_base: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::backend_reqwest)?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            username: username.into(),
            token: token.into(),
        })
    }

    pub fn from_config(cfg: &TrackerConfig) -> Result<Self> {
        Self::new(&cfg.base_url, &cfg.username, &cfg.api_token, cfg.timeout)
    }

    pub fn search_url(&self) -> String {
        format!("{}{SEARCH_PATH}", self.api_base)
    }
}

#[async_trait]
impl SearchApi for JiraSearchClient {
    fn id(&self) -> &'static str {
        "jira"
    }

    #[instrument(level = "debug", skip(self))]
    async fn search(&self, jql: &str, start_at: u64, max_results: u64) -> Result<SearchPage> {
        let resp = self
            .client
            .get(self.search_url())
            .basic_auth(&self.username, Some(&self.token))
            .header(ACCEPT, "application/json")
            .query(&[("jql", jql)])
            .query(&[("startAt", start_at), ("maxResults", max_results)])
            .send()
            .await
            .map_err(Error::backend_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "jira search failed");
            return Err(Error::Transport {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<SearchPage>()
            .await
            .map_err(Error::backend_reqwest)
    }
}
