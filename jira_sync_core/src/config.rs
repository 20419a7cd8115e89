use crate::fetch::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::{Error, Result};
use std::time::Duration;

pub const DEFAULT_PROJECT_KEY: &str = "CSI";
pub const DEFAULT_TABLE: &str = "camproj";

#[derive(Clone)]
pub struct TrackerConfig {
    /// Tracker base URL, e.g. `https://example.atlassian.net`.
    pub base_url: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
    /// Trailing window, in days, of created/updated issues to sync.
    pub lookback_days: u32,
    pub page_size: u64,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub table: String,
    pub connect_timeout: Duration,
    /// Create the table on startup when it does not exist.
    pub ensure_schema: bool,
}

/// Everything a sync run needs, resolved once at startup.
#[derive(Clone)]
pub struct SyncConfig {
    pub tracker: TrackerConfig,
    pub store: StoreConfig,
}

impl SyncConfig {
    #[tracing::instrument(level = "debug")]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source (the process environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::InvalidInput(format!("{name} is required")))
        };
        let parsed = |name: &str| -> Result<Option<u64>> {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                None => Ok(None),
                Some(v) => v.trim().parse::<u64>().map(Some).map_err(|_| {
                    Error::InvalidInput(format!("{name} must be a non-negative integer, got {v:?}"))
                }),
            }
        };

        let lookback_days = parsed("JIRA_SYNC_LOOKBACK_DAYS")?.unwrap_or(1);
        let port = parsed("DB_PORT")?.unwrap_or(5432);

        let cfg = Self {
            tracker: TrackerConfig {
                base_url: required("JIRA_URL")?.trim_end_matches('/').to_string(),
                username: required("JIRA_USERNAME")?,
                api_token: required("JIRA_API_TOKEN")?,
                project_key: lookup("JIRA_PROJECT")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_PROJECT_KEY.to_string()),
                lookback_days: u32::try_from(lookback_days).map_err(|_| {
                    Error::InvalidInput("JIRA_SYNC_LOOKBACK_DAYS is out of range".to_string())
                })?,
                page_size: parsed("JIRA_SYNC_PAGE_SIZE")?.unwrap_or(DEFAULT_PAGE_SIZE),
                timeout: Duration::from_millis(parsed("JIRA_HTTP_TIMEOUT_MS")?.unwrap_or(30_000)),
            },
            store: StoreConfig {
                host: required("DB_HOST")?,
                port: u16::try_from(port)
                    .map_err(|_| Error::InvalidInput(format!("DB_PORT {port} is out of range")))?,
                database: required("DB_NAME")?,
                user: required("DB_USER")?,
                password: required("DB_PASSWORD")?,
                table: lookup("JIRA_SYNC_TABLE")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
                connect_timeout: Duration::from_millis(
                    parsed("DB_CONNECT_TIMEOUT_MS")?.unwrap_or(10_000),
                ),
                ensure_schema: lookup("JIRA_SYNC_ENSURE_SCHEMA")
                    .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
                    .unwrap_or(false),
            },
        };

        cfg.validate()?;
        Ok(cfg)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn validate(&self) -> Result<()> {
        let t = &self.tracker;
        if !(t.base_url.starts_with("http://") || t.base_url.starts_with("https://")) {
            return Err(Error::InvalidInput(
                "tracker.base_url must start with http:// or https://".to_string(),
            ));
        }
        if t.project_key.trim().is_empty() {
            return Err(Error::InvalidInput("tracker.project_key is empty".to_string()));
        }
        if t.page_size == 0 || t.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidInput(format!(
                "tracker.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                t.page_size
            )));
        }
        if t.timeout.is_zero() {
            return Err(Error::InvalidInput(
                "tracker.timeout must be > 0".to_string(),
            ));
        }

        let s = &self.store;
        if s.port == 0 {
            return Err(Error::InvalidInput("store.port must be > 0".to_string()));
        }
        if !is_sql_identifier(&s.table) {
            return Err(Error::InvalidInput(format!(
                "store.table {:?} is not a plain SQL identifier",
                s.table
            )));
        }
        if s.connect_timeout.is_zero() {
            return Err(Error::InvalidInput(
                "store.connect_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective settings with secrets masked, for display.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "tracker": {
                "base_url": self.tracker.base_url,
                "username": self.tracker.username,
                "api_token": redact(&self.tracker.api_token),
                "project_key": self.tracker.project_key,
                "lookback_days": self.tracker.lookback_days,
                "page_size": self.tracker.page_size,
                "timeout_ms": self.tracker.timeout.as_millis() as u64,
            },
            "store": {
                "host": self.store.host,
                "port": self.store.port,
                "database": self.store.database,
                "user": self.store.user,
                "password": redact(&self.store.password),
                "table": self.store.table,
                "connect_timeout_ms": self.store.connect_timeout.as_millis() as u64,
                "ensure_schema": self.store.ensure_schema,
            },
        })
    }
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SyncConfig({})", self.redacted())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_sql_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn redact(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}
