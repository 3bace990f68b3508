//! Session adapter: the four wrapped database operations.
//!
//! Every statement the application issues goes through one of these thin
//! adapters over the shared retry runner; the adapters substitute the
//! retry loop's result for the caller's own execution. Re-issuing a
//! failed statement must be safe on the caller's side — a failed attempt
//! is assumed to have left nothing committed.

use std::time::Duration;

use tokio_postgres::types::{FromSql, ToSql};
use tokio_postgres::{Client, NoTls, Row};

use crate::config::ConnectionConfig;
use crate::control::CancelToken;
use crate::retry::{run_async, DbError, OperationKind};

/// Transaction isolation levels callers may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Isolation {
    fn begin_sql(self) -> &'static str {
        match self {
            Isolation::ReadCommitted => "BEGIN ISOLATION LEVEL READ COMMITTED",
            Isolation::RepeatableRead => "BEGIN ISOLATION LEVEL REPEATABLE READ",
            Isolation::Serializable => "BEGIN ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// One database connection with retry-wrapped operations.
pub struct Session {
    client: Client,
    cancel: CancelToken,
}

impl Session {
    /// Open a connection described by `config`. The driver's connection
    /// task runs detached; its termination is logged, not surfaced.
    pub async fn connect(
        config: &ConnectionConfig,
        connect_timeout: Duration,
        cancel: CancelToken,
    ) -> Result<Self, DbError> {
        let (client, connection) = config
            .pg_config(connect_timeout)
            .connect(NoTls)
            .await
            .map_err(DbError::from_pg)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!("postgres connection task ended: {}", e);
            }
        });
        tracing::info!(
            "connected to postgres at {}:{}, database {}, user {}",
            config.host,
            config.port,
            config.database,
            config.user
        );
        Ok(Self { client, cancel })
    }

    /// Wrap an already-connected client (pooled connections, tests).
    pub fn from_client(client: Client, cancel: CancelToken) -> Self {
        Self { client, cancel }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Execute a non-query statement, returning the affected row count.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, DbError> {
        let client = &self.client;
        run_async(OperationKind::Command, &self.cancel, move || async move {
            client.execute(sql, params).await.map_err(DbError::from_pg)
        })
        .await
    }

    /// Execute a script of one or more statements via the simple
    /// protocol (used for maintenance statements and purge batches).
    pub async fn batch_execute(&self, sql: &str) -> Result<(), DbError> {
        let client = &self.client;
        run_async(OperationKind::Command, &self.cancel, move || async move {
            client.batch_execute(sql).await.map_err(DbError::from_pg)
        })
        .await
    }

    /// Execute a query expected to produce exactly one value.
    pub async fn query_scalar<T>(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<T, DbError>
    where
        T: for<'a> FromSql<'a>,
    {
        let client = &self.client;
        run_async(OperationKind::Command, &self.cancel, move || async move {
            let row = client.query_one(sql, params).await.map_err(DbError::from_pg)?;
            row.try_get(0).map_err(DbError::from_pg)
        })
        .await
    }

    /// Open a row set. The retry loop wraps the open, not row iteration.
    pub async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Vec<Row>, DbError> {
        let client = &self.client;
        run_async(OperationKind::Command, &self.cancel, move || async move {
            client.query(sql, params).await.map_err(DbError::from_pg)
        })
        .await
    }

    /// Begin a transaction at the given isolation level.
    ///
    /// Uses the transaction-start policy: short fixed backoff and a
    /// retryable set without deadlock/serialization codes, since a failed
    /// BEGIN produced no transaction and is always safe to re-issue.
    pub async fn begin(&self, isolation: Isolation) -> Result<Tx<'_>, DbError> {
        let client = &self.client;
        run_async(
            OperationKind::TransactionBegin,
            &self.cancel,
            move || async move {
                client
                    .batch_execute(isolation.begin_sql())
                    .await
                    .map_err(DbError::from_pg)
            },
        )
        .await?;
        Ok(Tx {
            session: self,
            done: false,
        })
    }
}

/// An open transaction on a session. Statements issued through the
/// session while this handle is alive run inside the transaction.
#[must_use = "a transaction must be committed or rolled back"]
pub struct Tx<'a> {
    session: &'a Session,
    done: bool,
}

impl Tx<'_> {
    pub async fn commit(mut self) -> Result<(), DbError> {
        self.session
            .client
            .batch_execute("COMMIT")
            .await
            .map_err(DbError::from_pg)?;
        self.done = true;
        Ok(())
    }

    pub async fn rollback(mut self) -> Result<(), DbError> {
        self.session
            .client
            .batch_execute("ROLLBACK")
            .await
            .map_err(DbError::from_pg)?;
        self.done = true;
        Ok(())
    }
}

impl Drop for Tx<'_> {
    fn drop(&mut self) {
        if !self.done {
            // Drop cannot await a ROLLBACK; the server aborts the
            // transaction when the connection goes away or the next
            // statement fails.
            tracing::warn!("transaction dropped without commit or rollback");
        }
    }
}
