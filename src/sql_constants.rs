//! SQL query constants and fragments
//!
//! Frequently used task queries live here so the column list and the
//! active-set predicate are spelled exactly once.
//!
//! Note: dynamic WHERE clauses (search, list kind) are still built inline.

// ============================================================================
// Task Queries
// ============================================================================

/// Standard column list for task queries
pub const TASK_COLUMNS: &str =
    "id, owner, title, description, priority, completed, deleted, created_at";

/// Base SELECT query for tasks. Add WHERE clauses as needed.
pub const SELECT_TASK_FULL: &str = const_format::formatcp!("SELECT {} FROM tasks", TASK_COLUMNS);

/// Fetch one non-deleted task within its owner's scope
pub const SELECT_OWNED_TASK: &str =
    const_format::formatcp!("{} WHERE id = ? AND owner = ? AND deleted = 0", SELECT_TASK_FULL);

/// Predicate selecting the active set
pub const ACTIVE_PREDICATE: &str = "deleted = 0 AND completed = 0";

// ============================================================================
// Reconciler Queries
// ============================================================================

/// Candidate set for a reconcile pass.
///
/// Ordered by priority, then creation time, then id so the earliest-created
/// holder of a duplicated value sorts first and keeps it.
pub const SELECT_RECONCILE_CANDIDATES: &str = const_format::formatcp!(
    "SELECT id, priority, created_at FROM tasks WHERE owner = ? AND {} AND priority >= ? ORDER BY priority ASC, created_at ASC, id ASC",
    ACTIVE_PREDICATE
);

/// Register the owner and stamp the reconcile time.
///
/// Being a write, this takes the database write lock for the enclosing
/// transaction before anything is read.
pub const CLAIM_OWNER: &str = r#"
    INSERT INTO owners (name, created_at, last_claimed_at)
    VALUES (?, ?, ?)
    ON CONFLICT(name) DO UPDATE SET last_claimed_at = excluded.last_claimed_at
"#;

// ============================================================================
// Counts
// ============================================================================

/// Active, completed and total (non-deleted) counts for one owner
pub const COUNT_TASKS_BY_STATE: &str = r#"
    SELECT
        COALESCE(SUM(CASE WHEN completed = 0 THEN 1 ELSE 0 END), 0),
        COALESCE(SUM(CASE WHEN completed = 1 THEN 1 ELSE 0 END), 0),
        COUNT(*)
    FROM tasks
    WHERE owner = ? AND deleted = 0
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_owned_task_shape() {
        assert!(SELECT_OWNED_TASK.starts_with("SELECT id, owner, title"));
        assert!(SELECT_OWNED_TASK.ends_with("deleted = 0"));
    }

    #[test]
    fn test_candidate_query_orders_by_priority_then_creation() {
        let order = SELECT_RECONCILE_CANDIDATES
            .split("ORDER BY")
            .nth(1)
            .unwrap()
            .trim();
        assert_eq!(order, "priority ASC, created_at ASC, id ASC");
        assert!(SELECT_RECONCILE_CANDIDATES.contains("deleted = 0 AND completed = 0"));
    }
}
