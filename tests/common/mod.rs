//! Common utilities for integration tests

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use taskline::config::Config;
use taskline::context::AppContext;
use tempfile::TempDir;

/// Get the path to the `tl` binary
///
/// Prefers `CARGO_BIN_EXE_tl` (set by cargo for integration tests, and
/// correct under a custom target directory) and falls back to `cargo_bin`.
#[allow(deprecated)]
#[allow(dead_code)]
pub fn tl_binary() -> PathBuf {
    std::env::var("CARGO_BIN_EXE_tl")
        .map(PathBuf::from)
        .unwrap_or_else(|_| assert_cmd::cargo::cargo_bin("tl"))
}

/// A `tl` command bound to `db_path` and `owner`, isolated from the
/// caller's environment.
#[allow(dead_code)]
pub fn tl_command(db_path: &Path, owner: &str) -> Command {
    let mut cmd = Command::new(tl_binary());
    cmd.env_remove("TASKLINE_LOG_FILE")
        .env_remove("RUST_LOG")
        .env("TASKLINE_DB", db_path)
        .env("TASKLINE_OWNER", owner);
    cmd
}

/// Temporary database plus an open context on it
#[allow(dead_code)]
pub struct TestEnv {
    pub ctx: AppContext,
    pub db_path: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestEnv {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("tasks.db");
        let mut config = Config::for_path(&db_path);
        adjust(&mut config);

        let ctx = AppContext::open(config).await.unwrap();

        Self {
            ctx,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    /// Active priorities of `owner` in creation order
    pub async fn active_priorities(&self, owner: &str) -> Vec<i64> {
        sqlx::query_scalar(
            "SELECT priority FROM tasks WHERE owner = ? AND deleted = 0 AND completed = 0 ORDER BY created_at ASC, id ASC",
        )
        .bind(owner)
        .fetch_all(&self.ctx.pool)
        .await
        .unwrap()
    }

    /// Assert no two active tasks of `owner` share a priority
    pub async fn assert_distinct(&self, owner: &str) {
        let mut priorities = self.active_priorities(owner).await;
        let len = priorities.len();
        priorities.sort_unstable();
        priorities.dedup();
        assert_eq!(
            priorities.len(),
            len,
            "duplicate active priorities for {}",
            owner
        );
    }
}
