#[cfg(test)]
pub mod test_helpers {
    use crate::config::Config;
    use crate::db::{create_pool, run_migrations};
    use chrono::Utc;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    pub struct TestContext {
        pub pool: SqlitePool,
        pub _temp_dir: TempDir,
    }

    impl TestContext {
        pub async fn new() -> Self {
            let temp_dir = TempDir::new().unwrap();
            let config = Config::for_path(temp_dir.path().join("tasks.db"));

            let pool = create_pool(&config).await.unwrap();
            run_migrations(&pool).await.unwrap();

            Self {
                pool,
                _temp_dir: temp_dir,
            }
        }

        pub fn pool(&self) -> &SqlitePool {
            &self.pool
        }

        /// Insert a task row directly, bypassing validation and reconcile.
        ///
        /// Used to build states (duplicates included) the public API would
        /// never leave behind.
        pub async fn insert_raw(
            &self,
            owner: &str,
            priority: i64,
            completed: bool,
            deleted: bool,
        ) -> i64 {
            let now = Utc::now();
            sqlx::query(
                "INSERT INTO owners (name, created_at, last_claimed_at) VALUES (?, ?, ?) ON CONFLICT(name) DO NOTHING",
            )
            .bind(owner)
            .bind(now)
            .bind(now)
            .execute(&self.pool)
            .await
            .unwrap();

            sqlx::query(
                "INSERT INTO tasks (owner, title, description, priority, completed, deleted, created_at) VALUES (?, ?, '', ?, ?, ?, ?)",
            )
            .bind(owner)
            .bind(format!("Raw task at {}", priority))
            .bind(priority)
            .bind(completed)
            .bind(deleted)
            .bind(now)
            .execute(&self.pool)
            .await
            .unwrap()
            .last_insert_rowid()
        }

        pub async fn priority_of(&self, id: i64) -> i64 {
            sqlx::query_scalar("SELECT priority FROM tasks WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .unwrap()
        }

        /// Active priorities of `owner` in creation order.
        pub async fn active_priorities(&self, owner: &str) -> Vec<i64> {
            sqlx::query_scalar(
                "SELECT priority FROM tasks WHERE owner = ? AND deleted = 0 AND completed = 0 ORDER BY created_at ASC, id ASC",
            )
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .unwrap()
        }
    }
}
