//! CLI for pgward backup and maintenance operations.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pgward_core::backup::BackupOrchestrator;
use pgward_core::config::{self, ConnectionConfig};
use pgward_core::control::CancelToken;
use pgward_core::paths::AppPaths;
use pgward_core::pool::PgPool;
use std::sync::Arc;
use std::time::Duration;

use commands::{run_backup, run_delete, run_optimize, run_purge, run_restore, run_status};

/// Top-level CLI for pgward.
#[derive(Debug, Parser)]
#[command(name = "pgward")]
#[command(about = "pgward: PostgreSQL backup and maintenance with retry-hardened access", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Create a timestamp-keyed backup of the configured database.
    Backup,

    /// Restore a backup by its key.
    Restore {
        /// Backup key (UTC timestamp, e.g. 20260806143000).
        key: String,
    },

    /// Delete a backup by its key.
    Delete {
        /// Backup key.
        key: String,
    },

    /// Empty the named tables, resetting identity sequences and
    /// cascading to dependents.
    Purge {
        /// Table names to truncate.
        #[arg(required = true)]
        tables: Vec<String>,
    },

    /// Run VACUUM ANALYZE on the configured database.
    Optimize,

    /// List backups currently on disk.
    Status,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let settings = config::load_or_init()?;
        tracing::debug!("loaded settings: {:?}", settings);

        let conn = ConnectionConfig::from_env()?;
        let paths = AppPaths::resolve()?;
        let connect_timeout = Duration::from_secs(settings.connect_timeout_secs);

        // Ctrl-C cancels in-flight retries and kills running tools.
        let cancel = CancelToken::new();
        let ctrlc = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                ctrlc.cancel();
            }
        });

        let pool = Arc::new(PgPool::new(conn.clone(), connect_timeout, 8));
        let orchestrator = BackupOrchestrator::new(conn.clone(), &settings, &paths, pool.clone());

        match cli.command {
            CliCommand::Backup => run_backup(&orchestrator, &cancel).await?,
            CliCommand::Restore { key } => run_restore(&orchestrator, &key, &cancel).await?,
            CliCommand::Delete { key } => run_delete(&orchestrator, &key).await?,
            CliCommand::Purge { tables } => {
                run_purge(&orchestrator, &conn, connect_timeout, &tables, &cancel).await?
            }
            CliCommand::Optimize => run_optimize(&conn, connect_timeout, &cancel).await?,
            CliCommand::Status => run_status(&orchestrator).await?,
        }

        Ok(())
    }
}
