//! PostgreSQL `IssueStore`: one connection and one transaction per record.

use crate::config::{StoreConfig, is_sql_identifier};
use crate::models::MappedRecord;
use crate::store::IssueStore;
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use std::time::Duration;

/// Columns written by the upsert, in bind order.
pub const COLUMNS: [&str; 20] = [
    "key",
    "summary",
    "status",
    "created_date",
    "updated_date",
    "reporter",
    "priority",
    "display_name",
    "monitor_groups",
    "monitor_type",
    "monitor_status",
    "down_since",
    "failed_locations",
    "reason",
    "permfix",
    "team",
    "rca",
    "components",
    "product",
    "team_resp",
];

/// Columns never overwritten on conflict.
const INSERT_ONLY: [&str; 2] = ["key", "created_date"];

pub fn upsert_sql(table: &str) -> String {
    let placeholders: Vec<String> = (1..=COLUMNS.len()).map(|i| format!("${i}")).collect();
    let updates: Vec<String> = COLUMNS
        .iter()
        .filter(|c| !INSERT_ONLY.contains(c))
        .map(|c| format!("  {c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "INSERT INTO {table} ({})\nVALUES ({})\nON CONFLICT (key) DO UPDATE SET\n{}",
        COLUMNS.join(", "),
        placeholders.join(", "),
        updates.join(",\n")
    )
}

pub fn create_table_sql(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
  key TEXT PRIMARY KEY,
  summary TEXT,
  status TEXT,
  created_date TIMESTAMPTZ,
  updated_date TIMESTAMPTZ,
  reporter TEXT,
  priority TEXT,
  display_name TEXT,
  monitor_groups TEXT,
  monitor_type TEXT,
  monitor_status TEXT,
  down_since TIMESTAMP,
  failed_locations TEXT,
  reason TEXT,
  permfix TEXT,
  team TEXT,
  rca TEXT,
  components TEXT,
  product TEXT,
  team_resp TEXT
)
"#
    )
}

#[derive(Clone)]
pub struct PgIssueStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
    table: String,
    upsert_sql: String,
}

impl PgIssueStore {
    #[tracing::instrument(level = "debug", skip(cfg), fields(host = %cfg.host, table = %cfg.table))]
    pub fn new(cfg: &StoreConfig) -> Result<Self> {
        let options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .database(&cfg.database)
            .username(&cfg.user)
            .password(&cfg.password);
        Self::with_options(options, &cfg.table, cfg.connect_timeout)
    }

    pub fn with_options(
        options: PgConnectOptions,
        table: &str,
        connect_timeout: Duration,
    ) -> Result<Self> {
        if !is_sql_identifier(table) {
            return Err(Error::InvalidInput(format!(
                "table {table:?} is not a plain SQL identifier"
            )));
        }
        Ok(Self {
            options,
            connect_timeout,
            table: table.to_string(),
            upsert_sql: upsert_sql(table),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn connect(&self) -> Result<PgConnection> {
        tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&self.options))
            .await
            .map_err(|_| {
                Error::BackendMessage(format!(
                    "connect postgres: timed out after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| Error::backend("connect postgres", e))
    }

    /// Close a connection opened by `connect`. Close failures are only logged.
    async fn release(conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!(error = %e, "failed to close postgres connection");
        }
    }

    /// Create the sync table if it does not exist.
    #[tracing::instrument(level = "info", skip(self), fields(table = %self.table))]
    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = create_table_sql(&self.table);
        let mut conn = self.connect().await?;
        let result = sqlx::query(&ddl)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| Error::backend("create sync table", e));
        Self::release(conn).await;
        result
    }
}

async fn write_record(conn: &mut PgConnection, sql: &str, r: &MappedRecord) -> Result<()> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| Error::backend("begin transaction", e))?;

    sqlx::query(sql)
        .bind(&r.key)
        .bind(&r.summary)
        .bind(&r.status)
        .bind(r.created_date)
        .bind(r.updated_date)
        .bind(&r.reporter)
        .bind(&r.priority)
        .bind(&r.display_name)
        .bind(&r.monitor_groups)
        .bind(&r.monitor_type)
        .bind(&r.monitor_status)
        .bind(r.down_since)
        .bind(&r.failed_locations)
        .bind(&r.reason)
        .bind(&r.permfix)
        .bind(&r.team)
        .bind(&r.rca)
        .bind(&r.components)
        .bind(&r.product)
        .bind(&r.team_resp)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::backend("upsert issue", e))?;

    // Dropping an uncommitted transaction rolls it back.
    tx.commit()
        .await
        .map_err(|e| Error::backend("commit upsert", e))
}

#[async_trait]
impl IssueStore for PgIssueStore {
    #[tracing::instrument(level = "debug", skip_all, fields(key = %record.key))]
    async fn upsert(&self, record: &MappedRecord) -> Result<()> {
        // A failed connect has nothing to release.
        let mut conn = self.connect().await?;
        let result = write_record(&mut conn, &self.upsert_sql, record).await;
        Self::release(conn).await;
        result
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn ping(&self) -> Result<()> {
        let mut conn = self.connect().await?;
        let result = sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| Error::backend("postgres ping", e));
        Self::release(conn).await;
        result
    }
}
