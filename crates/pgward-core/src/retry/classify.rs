//! Classify SQLSTATE codes into retryable vs fatal.

use crate::retry::error::DbError;

/// Which kind of database operation is being wrapped.
///
/// The safe-to-retry set differs by kind: deadlocks and serialization
/// failures cannot occur before a transaction exists, so the
/// transaction-begin table omits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Non-query execute, scalar, or row-set open.
    Command,
    /// `BEGIN` at a given isolation level.
    TransactionBegin,
}

/// SQLSTATEs that are transient for general command execution.
const RETRYABLE_COMMAND: &[&str] = &[
    "40P01", // deadlock_detected
    "40001", // serialization_failure
    "53300", // too_many_connections
    "08003", // connection_does_not_exist
    "08006", // connection_failure
    "08001", // sqlclient_unable_to_establish_sqlconnection
    "08004", // sqlserver_rejected_establishment_of_sqlconnection
];

/// SQLSTATEs that are transient when starting a transaction. No deadlock
/// or serialization entries: a failed BEGIN produced no transaction.
const RETRYABLE_TX_BEGIN: &[&str] = &[
    "53300", // too_many_connections
    "08003", // connection_does_not_exist
    "08006", // connection_failure
    "08001", // sqlclient_unable_to_establish_sqlconnection
    "08004", // sqlserver_rejected_establishment_of_sqlconnection
];

/// Whether `err` is safe to retry for the given operation kind.
///
/// Errors without a SQLSTATE (driver faults, cancellation) are never
/// retried; blindly re-running unknown failures could mask real bugs.
pub fn is_retryable(err: &DbError, kind: OperationKind) -> bool {
    let Some(code) = err.sqlstate() else {
        return false;
    };
    let table = match kind {
        OperationKind::Command => RETRYABLE_COMMAND,
        OperationKind::TransactionBegin => RETRYABLE_TX_BEGIN,
    };
    table.contains(&code)
}
