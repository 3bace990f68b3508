//! `pgward status` – list dumps currently on disk.

use anyhow::Result;
use pgward_core::backup::BackupOrchestrator;

pub async fn run_status(orchestrator: &BackupOrchestrator) -> Result<()> {
    let backups = orchestrator.list_backups().await?;
    if backups.is_empty() {
        println!("No backups on disk.");
    } else {
        println!("{:<40} {}", "FILE", "BYTES");
        for (name, size) in backups {
            println!("{name:<40} {size}");
        }
    }
    Ok(())
}
