//! Retry loops: run an operation until it succeeds, fails fatally, or
//! the backoff schedule is exhausted.

use std::future::Future;

use crate::control::CancelToken;
use crate::retry::classify::{is_retryable, OperationKind};
use crate::retry::error::DbError;
use crate::retry::schedule::BackoffSchedule;

fn schedule_for(kind: OperationKind) -> BackoffSchedule {
    match kind {
        OperationKind::Command => BackoffSchedule::command(),
        OperationKind::TransactionBegin => BackoffSchedule::transaction(),
    }
}

fn log_retry(kind: OperationKind, retry_no: usize, delay_ms: u128, err: &DbError) {
    match kind {
        OperationKind::Command => tracing::warn!(
            "postgres operation failed, retry {} in {}ms: {}",
            retry_no,
            delay_ms,
            err
        ),
        OperationKind::TransactionBegin => tracing::warn!(
            "postgres transaction start failed, retry {} in {}ms: {}",
            retry_no,
            delay_ms,
            err
        ),
    }
}

fn log_exhausted(kind: OperationKind, retries: usize, err: &DbError) {
    // Transaction start keeps warning severity: a failed BEGIN produced no
    // transaction and the per-retry warnings already tell the whole story.
    if kind == OperationKind::Command {
        tracing::error!("postgres operation failed after {} retries: {}", retries, err);
    }
}

/// Runs `op` on the caller's thread, sleeping between attempts.
///
/// At most `schedule length + 1` attempts. A non-retryable error
/// propagates immediately without consuming a schedule step. The cancel
/// token is observed before each attempt and after each backoff sleep.
/// Re-issuing a failed statement must be safe on the caller's side.
pub fn run_blocking<T, F>(kind: OperationKind, cancel: &CancelToken, mut op: F) -> Result<T, DbError>
where
    F: FnMut() -> Result<T, DbError>,
{
    let mut schedule = schedule_for(kind);
    let mut retry_no = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        match op() {
            Ok(v) => return Ok(v),
            Err(err) => {
                if !is_retryable(&err, kind) {
                    return Err(err);
                }
                let Some(wait) = schedule.next_wait() else {
                    log_exhausted(kind, retry_no, &err);
                    return Err(err);
                };
                retry_no += 1;
                log_retry(kind, retry_no, wait.delay.as_millis(), &err);
                std::thread::sleep(wait.delay);
            }
        }
    }
}

/// Cooperative variant of [`run_blocking`] with identical classification,
/// schedule consumption, and logging; only the waiting differs. A cancel
/// fired during a backoff sleep or during the round trip itself aborts
/// the loop mid-wait.
pub async fn run_async<T, F, Fut>(
    kind: OperationKind,
    cancel: &CancelToken,
    mut op: F,
) -> Result<T, DbError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let mut schedule = schedule_for(kind);
    let mut retry_no = 0usize;
    loop {
        if cancel.is_cancelled() {
            return Err(DbError::Cancelled);
        }
        let result = tokio::select! {
            r = op() => r,
            _ = cancel.cancelled() => return Err(DbError::Cancelled),
        };
        match result {
            Ok(v) => return Ok(v),
            Err(err) => {
                if !is_retryable(&err, kind) {
                    return Err(err);
                }
                let Some(wait) = schedule.next_wait() else {
                    log_exhausted(kind, retry_no, &err);
                    return Err(err);
                };
                retry_no += 1;
                log_retry(kind, retry_no, wait.delay.as_millis(), &err);
                tokio::select! {
                    _ = tokio::time::sleep(wait.delay) => {}
                    _ = cancel.cancelled() => return Err(DbError::Cancelled),
                }
            }
        }
    }
}
