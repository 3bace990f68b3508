//! `pgward delete <key>` – delete a dump by key.

use anyhow::Result;
use pgward_core::backup::{BackupKey, BackupOrchestrator};

pub async fn run_delete(orchestrator: &BackupOrchestrator, key: &str) -> Result<()> {
    let key = BackupKey::parse(key)?;
    orchestrator.delete_backup(&key).await?;
    println!("Deleted backup {key}");
    Ok(())
}
