use crate::config::{Config, DEFAULT_LOCK_TIMEOUT_MS};
use crate::db::gateway::{bulk_update_priorities, claim_owner, list_active_for_owner_from};
use crate::error::{Result, TasklineError};
use crate::owner_lock::{OwnerGuard, OwnerLocks};
use crate::priority::{plan_shifts, Priority, PriorityShift};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;

/// What one reconcile pass saw and changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub owner: String,
    pub from_priority: i64,
    /// Size of the candidate set
    pub examined: usize,
    pub shifts: Vec<PriorityShift>,
}

impl ReconcileOutcome {
    pub fn is_noop(&self) -> bool {
        self.shifts.is_empty()
    }
}

/// Restores "no two active tasks of one owner share a priority".
///
/// Clones share one lock registry, so every writer in the process that goes
/// through the same reconciler (or a clone of it) is serialized per owner.
#[derive(Debug, Clone)]
pub struct PriorityReconciler {
    locks: OwnerLocks,
    lock_timeout: Duration,
}

impl Default for PriorityReconciler {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS))
    }
}

impl PriorityReconciler {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            locks: OwnerLocks::new(),
            lock_timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.lock_timeout)
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Take the owner's write lock. Hold the guard until the transaction that
    /// changes the owner's priorities has committed or rolled back.
    pub async fn lock_owner(&self, owner: &str) -> Result<OwnerGuard> {
        self.locks.acquire(owner, self.lock_timeout).await
    }

    /// Reconcile `owner` from `from_priority` in a transaction of its own.
    #[tracing::instrument(skip(self, pool), fields(from = from_priority.get()))]
    pub async fn reconcile(
        &self,
        pool: &SqlitePool,
        owner: &str,
        from_priority: Priority,
    ) -> Result<ReconcileOutcome> {
        let guard = self.lock_owner(owner).await?;

        let mut tx = pool.begin().await?;
        claim_owner(&mut tx, owner).await?;

        let outcome = self.reconcile_in(&mut tx, &guard, from_priority).await?;

        tx.commit()
            .await
            .map_err(|e| TasklineError::from(e).for_owner(owner))?;

        Ok(outcome)
    }

    /// The locked read, plan and write steps.
    ///
    /// The caller holds `guard` and has an open transaction on `conn` whose
    /// first statement was `claim_owner`. Nothing is committed here; if the
    /// caller's transaction rolls back, so do the shifts.
    pub async fn reconcile_in(
        &self,
        conn: &mut SqliteConnection,
        guard: &OwnerGuard,
        from_priority: Priority,
    ) -> Result<ReconcileOutcome> {
        let owner = guard.owner();

        let candidates = list_active_for_owner_from(conn, owner, from_priority.get()).await?;
        let shifts = plan_shifts(&candidates)?;

        if !shifts.is_empty() {
            bulk_update_priorities(conn, owner, &shifts).await?;
            tracing::info!(
                owner,
                from = from_priority.get(),
                examined = candidates.len(),
                shifted = shifts.len(),
                "Shifted colliding priorities"
            );
        } else {
            tracing::debug!(
                owner,
                from = from_priority.get(),
                examined = candidates.len(),
                "Priorities already distinct"
            );
        }

        Ok(ReconcileOutcome {
            owner: owner.to_string(),
            from_priority: from_priority.get(),
            examined: candidates.len(),
            shifts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_helpers::TestContext;

    fn p(value: i64) -> Priority {
        Priority::new(value).unwrap()
    }

    #[tokio::test]
    async fn test_chained_collision() {
        let ctx = TestContext::new().await;
        for _ in 0..4 {
            ctx.insert_raw("alice", 5, false, false).await;
        }

        let reconciler = PriorityReconciler::default();
        let outcome = reconciler
            .reconcile(ctx.pool(), "alice", p(5))
            .await
            .unwrap();

        assert_eq!(outcome.examined, 4);
        assert_eq!(outcome.shifts.len(), 3);
        assert_eq!(ctx.active_priorities("alice").await, vec![5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_single_holder_is_noop() {
        let ctx = TestContext::new().await;
        ctx.insert_raw("alice", 2, false, false).await;
        ctx.insert_raw("alice", 3, false, false).await;

        let outcome = PriorityReconciler::default()
            .reconcile(ctx.pool(), "alice", p(2))
            .await
            .unwrap();

        assert!(outcome.is_noop());
        assert_eq!(ctx.active_priorities("alice").await, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_unheld_priority_is_noop() {
        let ctx = TestContext::new().await;
        ctx.insert_raw("alice", 1, false, false).await;

        let outcome = PriorityReconciler::default()
            .reconcile(ctx.pool(), "alice", p(50))
            .await
            .unwrap();

        assert!(outcome.is_noop());
        assert_eq!(outcome.examined, 0);
    }

    #[tokio::test]
    async fn test_earliest_created_keeps_value() {
        let ctx = TestContext::new().await;
        let older = ctx.insert_raw("alice", 3, false, false).await;
        let newer = ctx.insert_raw("alice", 3, false, false).await;

        PriorityReconciler::default()
            .reconcile(ctx.pool(), "alice", p(3))
            .await
            .unwrap();

        assert_eq!(ctx.priority_of(older).await, 3);
        assert_eq!(ctx.priority_of(newer).await, 4);
    }

    #[tokio::test]
    async fn test_lower_priorities_untouched() {
        let ctx = TestContext::new().await;
        let low_a = ctx.insert_raw("alice", 1, false, false).await;
        let low_b = ctx.insert_raw("alice", 1, false, false).await;
        ctx.insert_raw("alice", 4, false, false).await;
        ctx.insert_raw("alice", 4, false, false).await;

        PriorityReconciler::default()
            .reconcile(ctx.pool(), "alice", p(4))
            .await
            .unwrap();

        // Below the starting point nothing is read or written
        assert_eq!(ctx.priority_of(low_a).await, 1);
        assert_eq!(ctx.priority_of(low_b).await, 1);
        assert_eq!(ctx.active_priorities("alice").await, vec![1, 1, 4, 5]);
    }

    #[tokio::test]
    async fn test_inactive_tasks_neither_move_nor_block() {
        let ctx = TestContext::new().await;
        let done = ctx.insert_raw("alice", 5, true, false).await;
        let gone = ctx.insert_raw("alice", 6, false, true).await;
        ctx.insert_raw("alice", 5, false, false).await;
        ctx.insert_raw("alice", 5, false, false).await;

        PriorityReconciler::default()
            .reconcile(ctx.pool(), "alice", p(5))
            .await
            .unwrap();

        assert_eq!(ctx.priority_of(done).await, 5);
        assert_eq!(ctx.priority_of(gone).await, 6);
        assert_eq!(ctx.active_priorities("alice").await, vec![5, 6]);
    }

    #[tokio::test]
    async fn test_owners_are_isolated() {
        let ctx = TestContext::new().await;
        let bob_a = ctx.insert_raw("bob", 2, false, false).await;
        let bob_b = ctx.insert_raw("bob", 2, false, false).await;
        ctx.insert_raw("alice", 2, false, false).await;
        ctx.insert_raw("alice", 2, false, false).await;

        let outcome = PriorityReconciler::default()
            .reconcile(ctx.pool(), "alice", p(2))
            .await
            .unwrap();

        assert_eq!(outcome.examined, 2);
        assert_eq!(ctx.active_priorities("alice").await, vec![2, 3]);
        assert_eq!(ctx.priority_of(bob_a).await, 2);
        assert_eq!(ctx.priority_of(bob_b).await, 2);
    }

    #[tokio::test]
    async fn test_held_owner_lock_reports_contention() {
        let ctx = TestContext::new().await;
        let reconciler = PriorityReconciler::new(Duration::from_millis(50));

        let _guard = reconciler.lock_owner("alice").await.unwrap();
        let result = reconciler.reconcile(ctx.pool(), "alice", p(1)).await;

        match result {
            Err(err @ TasklineError::LockContention(_)) => assert!(err.is_retryable()),
            other => panic!("expected lock contention, got {:?}", other),
        }

        // Other owners proceed while alice is held
        assert!(reconciler.reconcile(ctx.pool(), "bob", p(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_uncommitted_shifts_are_discarded() {
        let ctx = TestContext::new().await;
        ctx.insert_raw("alice", 7, false, false).await;
        ctx.insert_raw("alice", 7, false, false).await;

        let reconciler = PriorityReconciler::default();
        {
            let guard = reconciler.lock_owner("alice").await.unwrap();
            let mut tx = ctx.pool().begin().await.unwrap();
            claim_owner(&mut tx, "alice").await.unwrap();
            let outcome = reconciler.reconcile_in(&mut tx, &guard, p(7)).await.unwrap();
            assert_eq!(outcome.shifts.len(), 1);
            // Dropped without commit
        }

        assert_eq!(ctx.active_priorities("alice").await, vec![7, 7]);
    }

    #[tokio::test]
    async fn test_second_reconcile_is_noop() {
        let ctx = TestContext::new().await;
        for _ in 0..3 {
            ctx.insert_raw("alice", 3, false, false).await;
        }
        let reconciler = PriorityReconciler::default();

        reconciler.reconcile(ctx.pool(), "alice", p(3)).await.unwrap();
        let again = reconciler.reconcile(ctx.pool(), "alice", p(3)).await.unwrap();

        assert!(again.is_noop());
        assert_eq!(ctx.active_priorities("alice").await, vec![3, 4, 5]);
    }
}
