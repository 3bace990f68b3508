//! CLI command handlers. Each command is in its own file.

mod backup;
mod delete;
mod optimize;
mod purge;
mod restore;
mod status;

pub use backup::run_backup;
pub use delete::run_delete;
pub use optimize::run_optimize;
pub use purge::run_purge;
pub use restore::run_restore;
pub use status::run_status;
