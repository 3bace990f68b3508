//! Process-wide connection pooling with an explicit drain capability.
//!
//! The pool is deliberately a capability object, not an ambient
//! singleton: `restore_backup` drains it as a prerequisite, and that
//! dependency stays visible and fakeable through [`PoolControl`].

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::{Client, NoTls};

use crate::config::ConnectionConfig;
use crate::retry::DbError;

/// Control surface shared by the real pool and test fakes.
#[async_trait]
pub trait PoolControl: Send + Sync {
    /// Close and discard every pooled connection. Nothing may assume
    /// pool membership survives this call.
    async fn drain_all(&self);
}

/// A pooled connection. Returns its client to the pool on drop.
pub struct PooledConnection {
    client: Option<Client>,
    idle: Arc<Mutex<Vec<Client>>>,
    max_idle: usize,
}

impl PooledConnection {
    pub fn client(&self) -> &Client {
        // Only `Drop` ever takes the client out.
        self.client.as_ref().expect("client present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if client.is_closed() {
                return;
            }
            // try_lock: blocking in Drop on an async mutex could deadlock
            // the runtime; a contended pool just drops the connection.
            if let Ok(mut idle) = self.idle.try_lock() {
                if idle.len() < self.max_idle {
                    idle.push(client);
                }
            }
        }
    }
}

/// Small acquire/release pool over tokio-postgres clients.
///
/// Connections are opened lazily on acquire and parked on release, up to
/// `max_idle`. Each client's connection task runs detached and logs its
/// own termination.
pub struct PgPool {
    config: ConnectionConfig,
    connect_timeout: Duration,
    max_idle: usize,
    idle: Arc<Mutex<Vec<Client>>>,
}

impl PgPool {
    pub fn new(config: ConnectionConfig, connect_timeout: Duration, max_idle: usize) -> Self {
        Self {
            config,
            connect_timeout,
            max_idle,
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Hand out an idle connection, or open a new one.
    pub async fn acquire(&self) -> Result<PooledConnection, DbError> {
        loop {
            let reused = self.idle.lock().await.pop();
            match reused {
                Some(client) if client.is_closed() => continue,
                Some(client) => {
                    return Ok(self.wrap(client));
                }
                None => break,
            }
        }
        let client = self.connect().await?;
        Ok(self.wrap(client))
    }

    /// Idle connections currently parked.
    pub async fn idle_count(&self) -> usize {
        self.idle.lock().await.len()
    }

    fn wrap(&self, client: Client) -> PooledConnection {
        PooledConnection {
            client: Some(client),
            idle: Arc::clone(&self.idle),
            max_idle: self.max_idle,
        }
    }

    async fn connect(&self) -> Result<Client, DbError> {
        let (client, connection) = self
            .config
            .pg_config(self.connect_timeout)
            .connect(NoTls)
            .await
            .map_err(DbError::from_pg)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("postgres connection task ended: {}", e);
            }
        });
        Ok(client)
    }
}

#[async_trait]
impl PoolControl for PgPool {
    async fn drain_all(&self) {
        let dropped = {
            let mut idle = self.idle.lock().await;
            let n = idle.len();
            idle.clear();
            n
        };
        tracing::info!("connection pool drained ({} idle connections closed)", dropped);
    }
}
