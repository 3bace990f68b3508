//! `pgward restore <key>` – restore a dump by key.

use anyhow::Result;
use pgward_core::backup::{BackupKey, BackupOrchestrator};
use pgward_core::control::CancelToken;

pub async fn run_restore(
    orchestrator: &BackupOrchestrator,
    key: &str,
    cancel: &CancelToken,
) -> Result<()> {
    let key = BackupKey::parse(key)?;
    orchestrator.restore_backup(&key, cancel).await?;
    println!("Restore finished for key {key}");
    Ok(())
}
