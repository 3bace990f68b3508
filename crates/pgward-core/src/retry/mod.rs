//! Retry and backoff policy for database operations.
//!
//! This module encapsulates error classification (SQLSTATE tables for
//! command execution vs transaction start) and backoff scheduling so that
//! the session adapter and any other caller share a consistent policy.

mod classify;
mod error;
mod run;
mod schedule;

pub use classify::{is_retryable, OperationKind};
pub use error::DbError;
pub use run::{run_async, run_blocking};
pub use schedule::{BackoffSchedule, Wait};
