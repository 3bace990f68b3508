//! `pgward optimize` – run VACUUM ANALYZE.

use anyhow::Result;
use pgward_core::config::ConnectionConfig;
use pgward_core::control::CancelToken;
use pgward_core::maintenance;
use pgward_core::session::Session;
use std::time::Duration;

pub async fn run_optimize(
    conn: &ConnectionConfig,
    connect_timeout: Duration,
    cancel: &CancelToken,
) -> Result<()> {
    let session = Session::connect(conn, connect_timeout, cancel.clone()).await?;
    maintenance::optimize(&session).await?;
    println!("Database optimized");
    Ok(())
}
