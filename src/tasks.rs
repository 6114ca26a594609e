use crate::db::gateway::claim_owner;
use crate::db::models::{NewTask, PaginatedTasks, Task, TaskCounts, TaskListKind};
use crate::error::{Result, TasklineError};
use crate::priority::Priority;
use crate::reconciler::PriorityReconciler;
use crate::sql_constants::{
    ACTIVE_PREDICATE, COUNT_TASKS_BY_STATE, SELECT_OWNED_TASK, SELECT_TASK_FULL,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Partial update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub priority: Option<i64>,
    pub completed: Option<bool>,
}

impl TaskUpdate<'_> {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
    }
}

pub struct TaskManager<'a> {
    pool: &'a SqlitePool,
    reconciler: PriorityReconciler,
}

impl<'a> TaskManager<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self::with_reconciler(pool, PriorityReconciler::default())
    }

    /// Share a reconciler (and so its owner locks) with other managers.
    pub fn with_reconciler(pool: &'a SqlitePool, reconciler: PriorityReconciler) -> Self {
        Self { pool, reconciler }
    }

    pub fn reconciler(&self) -> &PriorityReconciler {
        &self.reconciler
    }

    /// Add a new task and restore priority uniqueness in the same transaction.
    ///
    /// If the requested priority is taken, the existing (older) task keeps it
    /// and the new task moves up; the returned task carries its final value.
    pub async fn add_task(&self, owner: &str, new_task: NewTask<'_>) -> Result<Task> {
        let owner = validate_owner(owner)?;
        let title = normalize_title(new_task.title)?;
        let priority = Priority::new(new_task.priority)?;

        let guard = self.reconciler.lock_owner(owner).await?;
        let mut tx = self.pool.begin().await?;
        claim_owner(&mut tx, owner).await?;

        let id = sqlx::query(
            r#"
            INSERT INTO tasks (owner, title, description, priority, completed, deleted, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(owner)
        .bind(&title)
        .bind(new_task.description)
        .bind(priority.get())
        .bind(new_task.completed)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        self.reconciler
            .reconcile_in(&mut tx, &guard, priority)
            .await?;

        let task = fetch_owned(&mut tx, owner, id).await?;
        tx.commit()
            .await
            .map_err(|e| TasklineError::from(e).for_owner(owner))?;

        tracing::info!(owner, id, priority = task.priority, "Task created");
        Ok(task)
    }

    /// Get a non-deleted task of `owner`
    pub async fn get_task(&self, owner: &str, id: i64) -> Result<Task> {
        let owner = validate_owner(owner)?;
        let task = sqlx::query_as::<_, Task>(SELECT_OWNED_TASK)
            .bind(id)
            .bind(owner)
            .fetch_optional(self.pool)
            .await?
            .ok_or(TasklineError::TaskNotFound(id))?;

        Ok(task)
    }

    /// Update a task.
    ///
    /// When the update sets a priority or brings a completed task back into
    /// the active set, the owner's priorities are reconciled before commit.
    pub async fn update_task(&self, owner: &str, id: i64, update: TaskUpdate<'_>) -> Result<Task> {
        let owner = validate_owner(owner)?;
        let title = update.title.map(normalize_title).transpose()?;
        let priority = update.priority.map(Priority::new).transpose()?;

        if update.is_empty() {
            return self.get_task(owner, id).await;
        }

        let guard = self.reconciler.lock_owner(owner).await?;
        let mut tx = self.pool.begin().await?;
        claim_owner(&mut tx, owner).await?;

        let before = fetch_owned(&mut tx, owner, id).await?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tasks SET ");
        let mut fields = builder.separated(", ");

        if let Some(t) = &title {
            fields.push("title = ").push_bind_unseparated(t.as_str());
        }

        if let Some(d) = update.description {
            fields.push("description = ").push_bind_unseparated(d);
        }

        if let Some(p) = priority {
            fields.push("priority = ").push_bind_unseparated(p.get());
        }

        if let Some(c) = update.completed {
            fields.push("completed = ").push_bind_unseparated(c);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND owner = ")
            .push_bind(owner);
        builder.build().execute(&mut *tx).await?;

        let after = fetch_owned(&mut tx, owner, id).await?;
        let reactivated = before.completed && !after.completed;

        if after.is_active() && (priority.is_some() || reactivated) {
            self.reconciler
                .reconcile_in(&mut tx, &guard, Priority::new(after.priority)?)
                .await?;
        }

        let task = fetch_owned(&mut tx, owner, id).await?;
        tx.commit()
            .await
            .map_err(|e| TasklineError::from(e).for_owner(owner))?;

        tracing::info!(owner, id, priority = task.priority, "Task updated");
        Ok(task)
    }

    /// Mark a task completed. It leaves the active set, so nothing is renumbered.
    pub async fn complete_task(&self, owner: &str, id: i64) -> Result<Task> {
        let owner = validate_owner(owner)?;
        let result = sqlx::query(
            "UPDATE tasks SET completed = 1 WHERE id = ? AND owner = ? AND deleted = 0",
        )
        .bind(id)
        .bind(owner)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TasklineError::TaskNotFound(id));
        }

        tracing::info!(owner, id, "Task completed");
        self.get_task(owner, id).await
    }

    /// Soft-delete a task. Deleted tasks are never returned again.
    pub async fn delete_task(&self, owner: &str, id: i64) -> Result<()> {
        let owner = validate_owner(owner)?;
        let result =
            sqlx::query("UPDATE tasks SET deleted = 1 WHERE id = ? AND owner = ? AND deleted = 0")
                .bind(id)
                .bind(owner)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(TasklineError::TaskNotFound(id));
        }

        tracing::info!(owner, id, "Task deleted");
        Ok(())
    }

    /// List tasks of one kind ordered by priority, with optional title search
    /// and pagination
    pub async fn list_tasks(
        &self,
        owner: &str,
        kind: TaskListKind,
        search: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<PaginatedTasks> {
        let owner = validate_owner(owner)?;
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = offset.unwrap_or(0);

        if limit < 0 || offset < 0 {
            return Err(TasklineError::InvalidInput(
                "limit and offset must not be negative".to_string(),
            ));
        }

        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let mut count_q: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) FROM tasks WHERE owner = ");
        count_q.push_bind(owner);
        push_filters(&mut count_q, kind, search);
        let total_count = count_q
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let mut q: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_TASK_FULL);
        q.push(" WHERE owner = ").push_bind(owner);
        push_filters(&mut q, kind, search);
        q.push(" ORDER BY priority ASC, created_at ASC, id ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let tasks = q.build_query_as::<Task>().fetch_all(self.pool).await?;

        let has_more = offset + (tasks.len() as i64) < total_count;

        Ok(PaginatedTasks {
            tasks,
            total_count,
            has_more,
            limit,
            offset,
        })
    }

    pub async fn list_active(
        &self,
        owner: &str,
        search: Option<&str>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<PaginatedTasks> {
        self.list_tasks(owner, TaskListKind::Active, search, limit, offset)
            .await
    }

    pub async fn list_completed(
        &self,
        owner: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<PaginatedTasks> {
        self.list_tasks(owner, TaskListKind::Completed, None, limit, offset)
            .await
    }

    pub async fn list_all(
        &self,
        owner: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<PaginatedTasks> {
        self.list_tasks(owner, TaskListKind::All, None, limit, offset)
            .await
    }

    /// Counts using SQL aggregation (no data loading)
    pub async fn counts(&self, owner: &str) -> Result<TaskCounts> {
        let owner = validate_owner(owner)?;
        let row = sqlx::query_as::<_, (i64, i64, i64)>(COUNT_TASKS_BY_STATE)
            .bind(owner)
            .fetch_one(self.pool)
            .await?;

        Ok(TaskCounts {
            active: row.0,
            completed: row.1,
            total: row.2,
        })
    }
}

async fn fetch_owned(conn: &mut SqliteConnection, owner: &str, id: i64) -> Result<Task> {
    sqlx::query_as::<_, Task>(SELECT_OWNED_TASK)
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TasklineError::TaskNotFound(id))
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, kind: TaskListKind, search: Option<&str>) {
    match kind {
        TaskListKind::Active => {
            builder.push(" AND ").push(ACTIVE_PREDICATE);
        },
        TaskListKind::Completed => {
            builder.push(" AND deleted = 0 AND completed = 1");
        },
        TaskListKind::All => {
            builder.push(" AND deleted = 0");
        },
    }

    if let Some(term) = search {
        builder
            .push(" AND title LIKE ")
            .push_bind(format!("%{}%", escape_like(term)))
            .push(" ESCAPE '\\'");
    }
}

/// LIKE is case-insensitive for ASCII in SQLite; only wildcards need escaping.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn validate_owner(owner: &str) -> Result<&str> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(TasklineError::InvalidInput("Owner must not be empty".to_string()));
    }
    Ok(owner)
}

/// Trim, check length, and capitalize (first character upper case, the rest
/// lower case).
pub fn normalize_title(title: &str) -> Result<String> {
    let title = title.trim();
    let len = title.chars().count();

    if len < TITLE_MIN_CHARS {
        return Err(TasklineError::InvalidInput(format!(
            "Title too short, must be at least {} characters",
            TITLE_MIN_CHARS
        )));
    }
    if len > TITLE_MAX_CHARS {
        return Err(TasklineError::InvalidInput(format!(
            "Title too long, must be at most {} characters",
            TITLE_MAX_CHARS
        )));
    }

    let mut chars = title.chars();
    let capitalized = match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    };

    Ok(capitalized)
}
