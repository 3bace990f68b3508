//! `pgward purge <tables…>` – truncate the named tables.

use anyhow::Result;
use pgward_core::backup::BackupOrchestrator;
use pgward_core::config::ConnectionConfig;
use pgward_core::control::CancelToken;
use pgward_core::session::Session;
use std::time::Duration;

pub async fn run_purge(
    orchestrator: &BackupOrchestrator,
    conn: &ConnectionConfig,
    connect_timeout: Duration,
    tables: &[String],
    cancel: &CancelToken,
) -> Result<()> {
    let session = Session::connect(conn, connect_timeout, cancel.clone()).await?;
    orchestrator.purge(&session, tables).await?;
    println!("Purged {} table(s)", tables.len());
    Ok(())
}
