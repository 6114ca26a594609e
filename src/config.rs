use crate::error::{Result, TasklineError};
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "taskline";
const DB_FILE: &str = "tasks.db";
const FALLBACK_DIR: &str = ".taskline";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

/// Runtime configuration.
///
/// Read from environment variables, all optional:
///   TASKLINE_DB               database file path
///   TASKLINE_MAX_CONNECTIONS  pool size, defaults to 5
///   TASKLINE_BUSY_TIMEOUT_MS  how long SQLite waits on a locked database
///   TASKLINE_LOCK_TIMEOUT_MS  how long a writer waits for its owner lock
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub max_connections: u32,
    pub busy_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_path(default_db_path())
    }
}

impl Config {
    /// Defaults for everything except the database location.
    pub fn for_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("TASKLINE_DB") {
            Ok(path) if !path.trim().is_empty() => Self::for_path(path),
            _ => Self::default(),
        };

        if let Some(n) = env_number("TASKLINE_MAX_CONNECTIONS")? {
            config.max_connections = u32::try_from(n)
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    TasklineError::InvalidInput(
                        "TASKLINE_MAX_CONNECTIONS must be between 1 and 4294967295".into(),
                    )
                })?;
        }

        if let Some(ms) = env_number("TASKLINE_BUSY_TIMEOUT_MS")? {
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = env_number("TASKLINE_LOCK_TIMEOUT_MS")? {
            config.lock_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<u64>().map(Some).map_err(|_| {
            TasklineError::InvalidInput(format!("{} must be a non-negative integer, got '{}'", key, raw))
        }),
        Err(_) => Ok(None),
    }
}

/// Platform data directory, or a dot-directory under the working directory
/// when the platform has none.
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR))
        .join(DB_FILE)
}
