//! Integration test: full backup lifecycle against stub dump/restore tools.
//!
//! Creates a backup, asserts the timestamp-keyed file appears, restores it
//! (checking the restore tool sees the same file path), then deletes it.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pgward_core::backup::{BackupKey, BackupOrchestrator};
use pgward_core::config::{ConnectionConfig, PgwardConfig};
use pgward_core::control::CancelToken;
use pgward_core::paths::AppPaths;
use pgward_core::pool::PoolControl;

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

/// Stub tool: records its argv, creates the `--file=` target the way
/// pg_dump would, exits 0.
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

#[tokio::test]
async fn create_restore_delete_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dump_record = dir.path().join("dump_args.log");
    let restore_record = dir.path().join("restore_args.log");
    let dump_tool = write_stub_tool(dir.path(), "fake_pg_dump", &dump_record);
    let restore_tool = write_stub_tool(dir.path(), "fake_psql", &restore_record);

    let conn = ConnectionConfig::from_parts("db1", 5432, "catalog", "svc", "secret");
    let settings = PgwardConfig {
        dump_tool,
        restore_tool,
        ..PgwardConfig::default()
    };
    let paths = AppPaths::at(dir.path());
    let pool = Arc::new(FakePool::default());
    let orchestrator =
        BackupOrchestrator::new(conn, &settings, &paths, Arc::clone(&pool) as Arc<dyn PoolControl>);
    let cancel = CancelToken::new();

    // Create: a <YYYYMMDDHHMMSS>_catalog.sql file keyed by the returned key.
    let key = orchestrator.create_backup(&cancel).await.unwrap();
    assert_eq!(key.as_str().len(), 14);
    let backup_file = paths.backup_dir().join(key.file_name("catalog"));
    assert!(backup_file.exists(), "{} missing", backup_file.display());

    let dump_args = std::fs::read_to_string(&dump_record).unwrap();
    assert!(dump_args.contains("--host=db1"));
    assert!(dump_args.contains("--port=5432"));
    assert!(dump_args.contains("--username=svc"));
    assert!(dump_args.contains("--dbname=catalog"));
    assert!(dump_args.contains("--clean"));
    assert!(dump_args.contains("--if-exists"));
    // The credential travels via PGPASSWORD, never argv.
    assert!(!dump_args.contains("secret"));

    // Restore: pool drained, tool invoked with the same file path.
    orchestrator.restore_backup(&key, &cancel).await.unwrap();
    assert_eq!(pool.drains.load(Ordering::SeqCst), 1);
    let restore_args = std::fs::read_to_string(&restore_record).unwrap();
    assert!(restore_args.contains(&format!("--file={}", backup_file.display())));
    assert!(restore_args.contains("--quiet"));

    // Delete: exactly that file goes away.
    orchestrator.delete_backup(&key).await.unwrap();
    assert!(!backup_file.exists());

    // Restoring the deleted key is a logged no-op and spawns nothing.
    let lines_before = restore_args.lines().count();
    orchestrator.restore_backup(&key, &cancel).await.unwrap();
    let restore_args = std::fs::read_to_string(&restore_record).unwrap();
    assert_eq!(restore_args.lines().count(), lines_before);
}

#[tokio::test]
async fn restore_by_parsed_operator_key() {
    let dir = tempfile::tempdir().unwrap();
    let record = dir.path().join("args.log");
    let tool = write_stub_tool(dir.path(), "fake_tool", &record);

    let conn = ConnectionConfig::from_parts("db1", 5432, "catalog", "svc", "secret");
    let settings = PgwardConfig {
        dump_tool: tool.clone(),
        restore_tool: tool,
        ..PgwardConfig::default()
    };
    let paths = AppPaths::at(dir.path());
    let orchestrator =
        BackupOrchestrator::new(conn, &settings, &paths, Arc::new(FakePool::default()));
    let cancel = CancelToken::new();

    let created = orchestrator.create_backup(&cancel).await.unwrap();
    // Operators pass keys as strings; the round trip must address the
    // same file.
    let parsed = BackupKey::parse(created.as_str()).unwrap();
    assert_eq!(parsed, created);
    orchestrator.restore_backup(&parsed, &cancel).await.unwrap();
}
