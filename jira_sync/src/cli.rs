use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "jira-sync",
    version,
    about = "Sync recently changed Jira issues into PostgreSQL"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Commands {
    /// Run one sync pass and exit (default if no subcommand given).
    Sync,

    /// Run sync passes on a fixed interval until interrupted.
    Watch {
        #[arg(long, env = "JIRA_SYNC_INTERVAL_SECS", default_value_t = 3600)]
        interval_secs: u64,
    },

    /// Check that the tracker and the database are reachable.
    Check,

    /// Print current configuration (redacted secrets).
    Config,
}

impl Cli {
    pub fn command_or_default(self) -> Commands {
        self.command.unwrap_or(Commands::Sync)
    }
}
