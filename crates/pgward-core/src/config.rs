//! Connection settings from the environment, plus the operational
//! settings file under `~/.config/pgward/config.toml`.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::backup::BackupKey;

const ENV_HOST: &str = "POSTGRES_HOST";
const ENV_PORT: &str = "POSTGRES_PORT";
const ENV_DATABASE: &str = "POSTGRES_DB";
const ENV_USER: &str = "POSTGRES_USER";
const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";

/// Immutable connection descriptor, resolved once and never mutated.
///
/// Pooling itself lives in [`crate::pool::PgPool`]; this only describes
/// how to reach the server.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    password: String,
    /// Reported to the server so connections are attributable, e.g.
    /// `pgward+0.1.0`.
    pub application_name: String,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl ConnectionConfig {
    /// Resolve from `POSTGRES_*` environment variables.
    ///
    /// Host, port, database, and user fall back to
    /// `localhost`/`5432`/`postgres`/`postgres`; the password has no
    /// default and its absence fails resolution immediately.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var(ENV_HOST).unwrap_or_else(|_| "localhost".to_string());
        let port = match std::env::var(ENV_PORT) {
            Ok(p) => p
                .parse::<u16>()
                .with_context(|| format!("{ENV_PORT} is not a valid port: {p:?}"))?,
            Err(_) => 5432,
        };
        let database = std::env::var(ENV_DATABASE).unwrap_or_else(|_| "postgres".to_string());
        let user = std::env::var(ENV_USER).unwrap_or_else(|_| "postgres".to_string());
        let Ok(password) = std::env::var(ENV_PASSWORD) else {
            bail!("postgres password must be provided via {ENV_PASSWORD}");
        };
        Ok(Self::from_parts(host, port, database, user, password))
    }

    /// Build a descriptor directly, bypassing the environment.
    pub fn from_parts(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            user: user.into(),
            password: password.into(),
            application_name: format!("pgward+{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// The credential. Only ever handed to the driver config or a child
    /// process environment, never to argv or logs.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Driver configuration for new connections.
    pub fn pg_config(&self, connect_timeout: Duration) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .password(&self.password)
            .application_name(&self.application_name)
            .connect_timeout(connect_timeout);
        config
    }

    /// File name a backup with this key is stored under.
    pub fn backup_file_name(&self, key: &BackupKey) -> String {
        key.file_name(&self.database)
    }
}

fn default_dump_tool() -> String {
    "pg_dump".to_string()
}

fn default_restore_tool() -> String {
    "psql".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Operational settings loaded from `~/.config/pgward/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgwardConfig {
    /// Override for the backup directory; `None` means
    /// `<data-root>/backups`.
    #[serde(default)]
    pub backup_dir: Option<PathBuf>,
    /// External dump tool invoked by `create_backup`.
    #[serde(default = "default_dump_tool")]
    pub dump_tool: String,
    /// External restore tool invoked by `restore_backup`.
    #[serde(default = "default_restore_tool")]
    pub restore_tool: String,
    /// Connect timeout in seconds for new driver connections.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for PgwardConfig {
    fn default() -> Self {
        Self {
            backup_dir: None,
            dump_tool: default_dump_tool(),
            restore_tool: default_restore_tool(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pgward")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load settings from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PgwardConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PgwardConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PgwardConfig = toml::from_str(&data)?;
    Ok(cfg)
}
