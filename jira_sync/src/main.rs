use clap::Parser;
use jira_sync::cli::{Cli, Commands};
use jira_sync_core::{PgIssueStore, SyncConfig, SyncEngine, SyncSummary};
use jira_sync_integrations::JiraSearchClient;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    jira_sync_core::o11y::init_tracing_from_env()?;
    let cmd = Cli::parse().command_or_default();

    let cfg = SyncConfig::from_env()?;
    let store = PgIssueStore::new(&cfg.store)?;
    let search = JiraSearchClient::from_config(&cfg.tracker)?;
    let engine = SyncEngine::from_config(&cfg, Arc::new(search), Arc::new(store.clone()));

    match cmd {
        Commands::Sync => {
            if cfg.store.ensure_schema {
                store.ensure_schema().await?;
            }
            let summary = engine.run().await?;
            log_summary(&summary);
        }
        Commands::Watch { interval_secs } => {
            if cfg.store.ensure_schema {
                store.ensure_schema().await?;
            }
            watch(&engine, Duration::from_secs(interval_secs.max(1))).await;
        }
        Commands::Check => {
            let today = chrono::Utc::now().date_naive();
            match engine.check_tracker(today).await {
                Ok(total) => println!("jira: ok ({total} matching issues)"),
                Err(e) => println!("jira: error ({})", e.chain_message()),
            }
            match engine.check_store().await {
                Ok(()) => println!("postgres: ok"),
                Err(e) => println!("postgres: error ({})", e.chain_message()),
            }
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&cfg.redacted())?);
        }
    }

    Ok(())
}

/// Repeated passes; a failed pass is logged and the loop keeps going.
async fn watch(engine: &SyncEngine, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.run().await {
                    Ok(summary) => log_summary(&summary),
                    Err(e) => tracing::error!(error = %e.chain_message(), "sync pass failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted; stopping");
                return;
            }
        }
    }
}

fn log_summary(summary: &SyncSummary) {
    if summary.failed.is_empty() {
        tracing::info!(
            run_id = %summary.run_id,
            fetched = summary.fetched,
            written = summary.written,
            "sync complete"
        );
    } else {
        tracing::warn!(
            run_id = %summary.run_id,
            fetched = summary.fetched,
            written = summary.written,
            failed_keys = ?summary.failed_keys(),
            "sync complete with failed records"
        );
    }
}
