use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::error::Result;
use crate::reconciler::PriorityReconciler;
use crate::tasks::TaskManager;
use sqlx::SqlitePool;

/// Everything a command needs: the resolved configuration, an open pool
/// with the schema in place, and the process-wide reconciler.
#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub pool: SqlitePool,
    pub reconciler: PriorityReconciler,
}

impl AppContext {
    /// Open (creating if needed) the database described by `config`.
    pub async fn open(config: Config) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool = create_pool(&config).await?;
        run_migrations(&pool).await?;

        tracing::debug!(db = %config.db_path.display(), "Database ready");

        let reconciler = PriorityReconciler::from_config(&config);

        Ok(Self {
            config,
            pool,
            reconciler,
        })
    }

    pub fn task_manager(&self) -> TaskManager<'_> {
        TaskManager::with_reconciler(&self.pool, self.reconciler.clone())
    }
}
