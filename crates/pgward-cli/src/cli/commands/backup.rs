//! `pgward backup` – create a timestamp-keyed dump.

use anyhow::Result;
use pgward_core::backup::BackupOrchestrator;
use pgward_core::control::CancelToken;

pub async fn run_backup(orchestrator: &BackupOrchestrator, cancel: &CancelToken) -> Result<()> {
    let key = orchestrator.create_backup(cancel).await?;
    println!("Backup created with key {key}");
    Ok(())
}
