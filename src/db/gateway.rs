//! Storage operations the priority reconciler is built on.
//!
//! Each function runs on a connection that is already inside a transaction;
//! none of them commit. The caller decides whether the whole unit lands.

use crate::error::{Result, TasklineError};
use crate::priority::{PriorityCandidate, PriorityShift};
use crate::sql_constants::{CLAIM_OWNER, SELECT_RECONCILE_CANDIDATES};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

/// Shifts per UPDATE statement; each shift binds three parameters.
const SHIFT_BATCH_SIZE: usize = 1000;

/// Register `owner` and take the database write lock for this transaction.
///
/// SQLite has no `SELECT ... FOR UPDATE`. Making the first statement of the
/// transaction a write takes the lock before the candidate set is read, so
/// the read and the following update see the same rows. A writer that cannot
/// get the lock within the busy timeout surfaces as `LockContention`.
pub async fn claim_owner(conn: &mut SqliteConnection, owner: &str) -> Result<()> {
    let now = Utc::now();

    sqlx::query(CLAIM_OWNER)
        .bind(owner)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| TasklineError::from(e).for_owner(owner))?;

    Ok(())
}

/// Active tasks of `owner` with `priority >= min_priority`, ordered by
/// priority, then creation time.
pub async fn list_active_for_owner_from(
    conn: &mut SqliteConnection,
    owner: &str,
    min_priority: i64,
) -> Result<Vec<PriorityCandidate>> {
    let candidates = sqlx::query_as::<_, PriorityCandidate>(SELECT_RECONCILE_CANDIDATES)
        .bind(owner)
        .bind(min_priority)
        .fetch_all(&mut *conn)
        .await?;

    Ok(candidates)
}

/// Apply `shifts` to tasks of `owner`.
///
/// Every shifted row must exist and belong to `owner`; a short row count is a
/// `StorageFailure` and the caller's transaction must not commit.
pub async fn bulk_update_priorities(
    conn: &mut SqliteConnection,
    owner: &str,
    shifts: &[PriorityShift],
) -> Result<u64> {
    let mut updated = 0;

    for batch in shifts.chunks(SHIFT_BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE tasks SET priority = CASE id");
        for shift in batch {
            builder
                .push(" WHEN ")
                .push_bind(shift.task_id)
                .push(" THEN ")
                .push_bind(shift.to);
        }
        builder.push(" END WHERE owner = ").push_bind(owner);
        builder.push(" AND id IN (");
        let mut ids = builder.separated(", ");
        for shift in batch {
            ids.push_bind(shift.task_id);
        }
        ids.push_unseparated(")");

        let result = builder.build().execute(&mut *conn).await?;
        updated += result.rows_affected();
    }

    if updated != shifts.len() as u64 {
        return Err(TasklineError::StorageFailure(format!(
            "expected to update {} priorities for owner '{}', updated {}",
            shifts.len(),
            owner,
            updated
        )));
    }

    Ok(updated)
}
