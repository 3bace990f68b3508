//! Application paths: data root and the backup directory under it.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Where pgward keeps its on-disk state. Backups land in
/// `<data-root>/backups`.
#[derive(Debug, Clone)]
pub struct AppPaths {
    data_root: PathBuf,
}

impl AppPaths {
    /// Resolve the data root from XDG (`~/.local/share/pgward`).
    pub fn resolve() -> Result<Self> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("pgward")?;
        Ok(Self {
            data_root: xdg_dirs.get_data_home(),
        })
    }

    /// Use an explicit data root (tests, embedding hosts).
    pub fn at(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_root.join("backups")
    }
}
