//! Maintenance entry points invoked by an external scheduler or operator.

use anyhow::{Context, Result};

use crate::pool::PoolControl;
use crate::session::Session;

/// Periodic optimize pass. Goes through the session's command retry path
/// like any other statement.
pub async fn optimize(session: &Session) -> Result<()> {
    session
        .batch_execute("VACUUM ANALYZE")
        .await
        .context("VACUUM ANALYZE")?;
    tracing::info!("postgres database optimized");
    Ok(())
}

/// Shutdown hook: discard all pooled connections.
pub async fn shutdown(pool: &dyn PoolControl) {
    pool.drain_all().await;
    tracing::info!("postgres connection pools cleared on shutdown");
}
