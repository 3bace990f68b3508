//! Backup orchestration: timestamp-keyed dumps via `pg_dump`, restores
//! via `psql`, keyed deletes, and full-table purges.
//!
//! These operations run out-of-band and never pass through the retry
//! policies; a dump is a one-shot subprocess, not a pooled SQL command.
//! The credential reaches the tools only through the child process
//! environment (`PGPASSWORD`), never argv.

mod key;

pub use key::{BackupKey, InvalidKey};

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::config::{ConnectionConfig, PgwardConfig};
use crate::control::CancelToken;
use crate::paths::AppPaths;
use crate::pool::PoolControl;
use crate::session::Session;

pub struct BackupOrchestrator {
    conn: ConnectionConfig,
    backup_dir: PathBuf,
    dump_tool: String,
    restore_tool: String,
    pool: Arc<dyn PoolControl>,
}

impl BackupOrchestrator {
    pub fn new(
        conn: ConnectionConfig,
        settings: &PgwardConfig,
        paths: &AppPaths,
        pool: Arc<dyn PoolControl>,
    ) -> Self {
        let backup_dir = settings
            .backup_dir
            .clone()
            .unwrap_or_else(|| paths.backup_dir());
        Self {
            conn,
            backup_dir,
            dump_tool: settings.dump_tool.clone(),
            restore_tool: settings.restore_tool.clone(),
            pool,
        }
    }

    /// Dump the database to `<backup-dir>/<key>_<database>.sql` and return
    /// the key.
    ///
    /// Keys are second-precision timestamps: a second backup started
    /// within the same second resolves to the same file and overwrites
    /// the first. A crash between subprocess exit and the caller
    /// recording the key can leave an orphaned file; neither case is
    /// guarded here.
    pub async fn create_backup(&self, cancel: &CancelToken) -> Result<BackupKey> {
        self.create_backup_with_key(BackupKey::now(), cancel).await
    }

    async fn create_backup_with_key(
        &self,
        key: BackupKey,
        cancel: &CancelToken,
    ) -> Result<BackupKey> {
        tokio::fs::create_dir_all(&self.backup_dir)
            .await
            .with_context(|| format!("create backup dir {}", self.backup_dir.display()))?;
        let backup_file = self.backup_path(&key);

        tracing::info!("starting postgres backup: {}", backup_file.display());

        // --clean --if-exists makes the emitted script drop and recreate
        // conflicting objects so a later restore is idempotent.
        let mut args = self.conn_args();
        args.push(format!("--file={}", backup_file.display()));
        args.push("--no-password".to_string());
        args.push("--verbose".to_string());
        args.push("--clean".to_string());
        args.push("--if-exists".to_string());
        self.run_tool(&self.dump_tool, &args, cancel).await?;

        tracing::info!("postgres backup completed: {}", backup_file.display());
        Ok(key)
    }

    /// Restore the dump named by `key`, draining pooled connections
    /// first. A key with no file is logged and returns without error and
    /// without spawning the restore tool.
    pub async fn restore_backup(&self, key: &BackupKey, cancel: &CancelToken) -> Result<()> {
        // An in-flight pool would hold stale state across the restore.
        self.pool.drain_all().await;

        let backup_file = self.backup_path(key);
        if tokio::fs::metadata(&backup_file).await.is_err() {
            tracing::error!("tried to restore a backup that does not exist: {}", key);
            return Ok(());
        }

        tracing::info!("starting postgres restore from: {}", backup_file.display());

        let mut args = self.conn_args();
        args.push(format!("--file={}", backup_file.display()));
        args.push("--no-password".to_string());
        args.push("--quiet".to_string());
        self.run_tool(&self.restore_tool, &args, cancel).await?;

        tracing::info!("postgres restore completed from: {}", backup_file.display());
        Ok(())
    }

    /// Delete the dump named by `key`. A missing file is a logged no-op.
    pub async fn delete_backup(&self, key: &BackupKey) -> Result<()> {
        let backup_file = self.backup_path(key);
        if tokio::fs::metadata(&backup_file).await.is_err() {
            tracing::error!("tried to delete a backup that does not exist: {}", key);
            return Ok(());
        }
        tokio::fs::remove_file(&backup_file)
            .await
            .with_context(|| format!("delete {}", backup_file.display()))?;
        tracing::info!("deleted backup file: {}", backup_file.display());
        Ok(())
    }

    /// Empty every named table in one batched statement, resetting
    /// identity sequences and cascading to dependents. Issued through the
    /// caller's session, so it inherits the caller's retry context.
    pub async fn purge(&self, session: &Session, tables: &[String]) -> Result<()> {
        if tables.is_empty() {
            bail!("purge requires at least one table name");
        }
        let script = truncate_script(tables);
        session.batch_execute(&script).await.context("purge tables")?;
        tracing::info!("postgres tables purged: {}", tables.join(", "));
        Ok(())
    }

    /// Dump files currently on disk, newest-first keys with sizes.
    pub async fn list_backups(&self) -> Result<Vec<(String, u64)>> {
        let mut entries = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(d) => d,
            Err(_) => return Ok(entries),
        };
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_file() {
                entries.push((entry.file_name().to_string_lossy().into_owned(), meta.len()));
            }
        }
        entries.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(entries)
    }

    fn backup_path(&self, key: &BackupKey) -> PathBuf {
        self.backup_dir.join(self.conn.backup_file_name(key))
    }

    fn conn_args(&self) -> Vec<String> {
        vec![
            format!("--host={}", self.conn.host),
            format!("--port={}", self.conn.port),
            format!("--username={}", self.conn.user),
            format!("--dbname={}", self.conn.database),
        ]
    }

    /// Run an external tool to completion, credential via child-scoped
    /// env only. Non-zero exit fails with the captured stderr; a fired
    /// cancel token kills the child.
    async fn run_tool(&self, tool: &str, args: &[String], cancel: &CancelToken) -> Result<()> {
        let mut cmd = Command::new(tool);
        cmd.args(args)
            .env("PGPASSWORD", self.conn.password())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let run = cmd.output();
        let output = tokio::select! {
            out = run => out.with_context(|| format!("failed to run {tool}"))?,
            _ = cancel.cancelled() => bail!("{tool} cancelled"),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("{} failed with {}: {}", tool, output.status, stderr.trim());
            bail!("{tool} failed with {}: {}", output.status, stderr.trim());
        }
        Ok(())
    }
}

fn truncate_script(tables: &[String]) -> String {
    tables
        .iter()
        .map(|t| format!("TRUNCATE TABLE \"{t}\" RESTART IDENTITY CASCADE;"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolControl;
    use async_trait::async_trait;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct FakePool {
        drains: AtomicU32,
    }

    #[async_trait]
    impl PoolControl for FakePool {
        async fn drain_all(&self) {
            self.drains.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Stub tool: records its argv one line per invocation, creates the
    /// `--file=` target (as pg_dump would), exits 0.
    fn write_stub_tool(dir: &Path, name: &str, record: &Path) -> String {
        let path = dir.join(name);
        let script = format!(
            "#!/bin/sh\necho \"$@\" >> {record}\nfor arg in \"$@\"; do\n  case \"$arg\" in\n    --file=*) printf 'dump' > \"${{arg#--file=}}\" ;;\n  esac\ndone\nexit 0\n",
            record = record.display()
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn write_failing_tool(dir: &Path, name: &str) -> String {
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\necho 'connection refused' >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn orchestrator(
        dir: &Path,
        dump_tool: String,
        restore_tool: String,
        pool: Arc<FakePool>,
    ) -> BackupOrchestrator {
        let conn = ConnectionConfig::from_parts("db1", 5432, "catalog", "svc", "secret");
        let settings = PgwardConfig {
            backup_dir: Some(dir.join("backups")),
            dump_tool,
            restore_tool,
            ..PgwardConfig::default()
        };
        let paths = AppPaths::at(dir);
        BackupOrchestrator::new(conn, &settings, &paths, pool)
    }

    #[tokio::test]
    async fn create_backup_with_same_key_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("dump_args.log");
        let dump = write_stub_tool(dir.path(), "fake_pg_dump", &record);
        let orch = orchestrator(dir.path(), dump, "true".into(), Arc::default());

        let key = BackupKey::parse("20260806120000").unwrap();
        let cancel = CancelToken::new();
        orch.create_backup_with_key(key.clone(), &cancel).await.unwrap();
        orch.create_backup_with_key(key.clone(), &cancel).await.unwrap();

        // One file, two invocations: the second dump overwrote the first.
        let invocations = std::fs::read_to_string(&record).unwrap();
        assert_eq!(invocations.lines().count(), 2);
        let files: Vec<_> = std::fs::read_dir(dir.path().join("backups"))
            .unwrap()
            .collect();
        assert_eq!(files.len(), 1);
    }

    #[tokio::test]
    async fn failed_dump_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let dump = write_failing_tool(dir.path(), "fake_pg_dump");
        let orch = orchestrator(dir.path(), dump, "true".into(), Arc::default());

        let err = orch
            .create_backup(&CancelToken::new())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("connection refused"), "{err}");
    }

    #[tokio::test]
    async fn restore_drains_the_pool_before_running() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("args.log");
        let tool = write_stub_tool(dir.path(), "fake_tool", &record);
        let pool = Arc::new(FakePool::default());
        let orch = orchestrator(dir.path(), tool.clone(), tool, Arc::clone(&pool));

        let key = orch.create_backup(&CancelToken::new()).await.unwrap();
        orch.restore_backup(&key, &CancelToken::new()).await.unwrap();
        assert_eq!(pool.drains.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn restore_of_missing_key_is_a_noop_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("args.log");
        let tool = write_stub_tool(dir.path(), "fake_tool", &record);
        let orch = orchestrator(dir.path(), tool.clone(), tool, Arc::default());

        let key = BackupKey::parse("19990101000000").unwrap();
        orch.restore_backup(&key, &CancelToken::new()).await.unwrap();
        assert!(!record.exists(), "restore tool must not have been invoked");
    }

    #[tokio::test]
    async fn delete_removes_exactly_the_named_backup() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("args.log");
        let tool = write_stub_tool(dir.path(), "fake_tool", &record);
        let orch = orchestrator(dir.path(), tool.clone(), tool, Arc::default());
        let cancel = CancelToken::new();

        let a = BackupKey::parse("20260806120000").unwrap();
        let b = BackupKey::parse("20260806120001").unwrap();
        orch.create_backup_with_key(a.clone(), &cancel).await.unwrap();
        orch.create_backup_with_key(b.clone(), &cancel).await.unwrap();

        orch.delete_backup(&a).await.unwrap();
        let backups = dir.path().join("backups");
        assert!(!backups.join(a.file_name("catalog")).exists());
        assert!(backups.join(b.file_name("catalog")).exists());

        // Deleting again is a logged no-op.
        orch.delete_backup(&a).await.unwrap();
    }

    #[test]
    fn truncate_script_batches_all_tables() {
        let script = truncate_script(&["users".into(), "orders".into()]);
        assert_eq!(
            script,
            "TRUNCATE TABLE \"users\" RESTART IDENTITY CASCADE;\n\
             TRUNCATE TABLE \"orders\" RESTART IDENTITY CASCADE;"
        );
    }
}
